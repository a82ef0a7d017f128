use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of backend resource a cached query holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Comments attached to a project
    Comments,
    /// A single project with its aggregate counters
    Project,
    /// Posts in a chain (community forum)
    ChainPosts,
    /// A single chain with its aggregate counters
    Chain,
    /// Comments written by one user
    UserComments,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Comments => "comments",
            EntityKind::Project => "project",
            EntityKind::ChainPosts => "chain_posts",
            EntityKind::Chain => "chain",
            EntityKind::UserComments => "user_comments",
        }
    }

    /// Whether the query resolves to a list rather than a single record
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            EntityKind::Comments | EntityKind::ChainPosts | EntityKind::UserComments
        )
    }

    /// Name of the parameter that identifies the query
    pub fn id_param(&self) -> &'static str {
        match self {
            EntityKind::Comments | EntityKind::Project => "project_id",
            EntityKind::ChainPosts | EntityKind::Chain => "chain_id",
            EntityKind::UserComments => "user_id",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite cache key: entity kind plus its identifying parameters.
///
/// Parameters are kept sorted by name so two keys built in a different order
/// compare and hash the same.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    entity: EntityKind,
    params: Vec<(String, String)>,
}

impl QueryKey {
    pub fn new(entity: EntityKind) -> Self {
        Self {
            entity,
            params: Vec::new(),
        }
    }

    /// Add or replace a parameter
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.params.binary_search_by(|(existing, _)| existing.cmp(&name)) {
            Ok(pos) => self.params[pos].1 = value,
            Err(pos) => self.params.insert(pos, (name, value)),
        }
        self
    }

    pub fn comments(project_id: &str) -> Self {
        Self::new(EntityKind::Comments).param("project_id", project_id)
    }

    pub fn project(project_id: &str) -> Self {
        Self::new(EntityKind::Project).param("project_id", project_id)
    }

    pub fn chain_posts(chain_id: &str) -> Self {
        Self::new(EntityKind::ChainPosts).param("chain_id", chain_id)
    }

    pub fn chain(chain_id: &str) -> Self {
        Self::new(EntityKind::Chain).param("chain_id", chain_id)
    }

    pub fn user_comments(user_id: &str) -> Self {
        Self::new(EntityKind::UserComments).param("user_id", user_id)
    }

    pub fn entity(&self) -> EntityKind {
        self.entity
    }

    pub fn get_param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// REST path the query is fetched from, `None` when the identifying
    /// parameter is missing.
    pub fn path(&self) -> Option<String> {
        let id = self.get_param(self.entity.id_param())?;
        let path = match self.entity {
            EntityKind::Comments => format!("/projects/{}/comments", id),
            EntityKind::Project => format!("/projects/{}", id),
            EntityKind::ChainPosts => format!("/chains/{}/posts", id),
            EntityKind::Chain => format!("/chains/{}", id),
            EntityKind::UserComments => format!("/users/{}/comments", id),
        };
        Some(path)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.entity)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self
                .params
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect();
            write!(f, "[{}]", params.join(","))?;
        }
        Ok(())
    }
}
