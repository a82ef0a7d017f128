// ============================================================================
// Mutation Catalogue
// ============================================================================
//
// Each mutation describes its request, the provisional patches it applies
// and how the server's answer is normalized into the authoritative item.
//
// ============================================================================

pub mod chain;
pub mod comment;

pub use chain::{CreateChainPost, DeleteChainPost, VoteChainPost};
pub use comment::{CreateComment, DeleteComment, VoteComment};

use crate::core::{CacheItem, QueryKey, Result};
use crate::executor::MutationRequest;
use crate::optimistic::Patch;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of mutation; the dependency map is keyed on it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    CreateComment,
    DeleteComment,
    VoteComment,
    CreateChainPost,
    DeleteChainPost,
    VoteChainPost,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::CreateComment => "create_comment",
            MutationKind::DeleteComment => "delete_comment",
            MutationKind::VoteComment => "vote_comment",
            MutationKind::CreateChainPost => "create_chain_post",
            MutationKind::DeleteChainPost => "delete_chain_post",
            MutationKind::VoteChainPost => "vote_chain_post",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifiers a mutation touches; used to resolve dependent cache keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationScope {
    pub project_id: Option<String>,
    pub chain_id: Option<String>,
    pub user_id: Option<String>,
}

impl MutationScope {
    pub fn project(project_id: &str) -> Self {
        Self {
            project_id: Some(project_id.to_string()),
            ..Self::default()
        }
    }

    pub fn chain(chain_id: &str) -> Self {
        Self {
            chain_id: Some(chain_id.to_string()),
            ..Self::default()
        }
    }

    pub fn user(mut self, user_id: Option<&str>) -> Self {
        self.user_id = user_id.map(str::to_string);
        self
    }
}

/// Vote direction for comments and chain posts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    /// Wire value expected by the vote endpoints
    pub fn as_wire(&self) -> &'static str {
        match self {
            VoteDirection::Up => "upvote",
            VoteDirection::Down => "downvote",
        }
    }

    /// Counter field the vote increments
    pub fn counter(&self) -> &'static str {
        match self {
            VoteDirection::Up => "upvotes",
            VoteDirection::Down => "downvotes",
        }
    }
}

/// A write against the backend with an optimistic cache effect.
pub trait Mutation: Send + Sync {
    fn kind(&self) -> MutationKind;

    fn scope(&self) -> MutationScope;

    fn request(&self) -> MutationRequest;

    /// Provisional changes, primary key first
    fn optimistic_patches(&self) -> Vec<(QueryKey, Patch)>;

    /// Normalize the response `data`; `Ok(None)` when the server returns
    /// nothing usable for the cache (e.g. a delete).
    fn authoritative(&self, data: &Value) -> Result<Option<CacheItem>>;
}

/// Pick the object a vote endpoint returned, which is either the voted
/// entity itself or a vote record wrapping it.
pub(crate) fn voted_entity<'a>(data: &'a Value, wrapper: &str, id: &str) -> Option<&'a Value> {
    if let Some(inner) = data.get(wrapper).filter(|inner| inner.is_object()) {
        return Some(inner);
    }
    let same_id = ["id", "_id"].iter().any(|name| {
        data.get(*name).is_some_and(|found| match found {
            Value::String(text) => text == id,
            Value::Number(number) => number.to_string() == id,
            _ => false,
        })
    });
    same_id.then_some(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scope_builders() {
        let scope = MutationScope::project("p1").user(Some("u1"));
        assert_eq!(scope.project_id.as_deref(), Some("p1"));
        assert_eq!(scope.user_id.as_deref(), Some("u1"));
        assert!(scope.chain_id.is_none());
    }

    #[test]
    fn test_voted_entity_shapes() {
        let wrapped = json!({"vote_type": "upvote", "comment": {"id": "c1"}});
        assert_eq!(voted_entity(&wrapped, "comment", "c1"), Some(&json!({"id": "c1"})));

        let direct = json!({"id": "c1", "upvotes": 3});
        assert_eq!(voted_entity(&direct, "comment", "c1"), Some(&direct));

        let vote_record = json!({"id": "v7", "comment_id": "c1"});
        assert_eq!(voted_entity(&vote_record, "comment", "c1"), None);
    }

    #[test]
    fn test_vote_direction() {
        assert_eq!(VoteDirection::Up.as_wire(), "upvote");
        assert_eq!(VoteDirection::Down.counter(), "downvotes");
    }
}
