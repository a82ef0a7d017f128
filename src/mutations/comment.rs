use super::{Mutation, MutationKind, MutationScope, VoteDirection, voted_entity};
use crate::core::{CacheItem, QueryKey, Result};
use crate::domain::Comment;
use crate::executor::MutationRequest;
use crate::optimistic::Patch;
use serde_json::{Value, json};

/// Post a new comment on a project
#[derive(Debug, Clone)]
pub struct CreateComment {
    pub project_id: String,
    pub content: String,
    pub author_id: Option<String>,
}

impl CreateComment {
    pub fn new(project_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            content: content.into(),
            author_id: None,
        }
    }

    pub fn author(mut self, author_id: impl Into<String>) -> Self {
        self.author_id = Some(author_id.into());
        self
    }
}

impl Mutation for CreateComment {
    fn kind(&self) -> MutationKind {
        MutationKind::CreateComment
    }

    fn scope(&self) -> MutationScope {
        MutationScope::project(&self.project_id).user(self.author_id.as_deref())
    }

    fn request(&self) -> MutationRequest {
        MutationRequest::post(
            "/comments",
            json!({ "content": self.content, "project_id": self.project_id }),
        )
    }

    fn optimistic_patches(&self) -> Vec<(QueryKey, Patch)> {
        let draft = Comment::draft(&self.content, &self.project_id, self.author_id.as_deref());
        let mut patches = vec![
            (QueryKey::comments(&self.project_id), Patch::prepend(draft.clone())),
            (
                QueryKey::project(&self.project_id),
                Patch::increment(&self.project_id, "comment_count", 1),
            ),
        ];
        if let Some(author_id) = &self.author_id {
            patches.push((QueryKey::user_comments(author_id), Patch::prepend(draft)));
        }
        patches
    }

    fn authoritative(&self, data: &Value) -> Result<Option<CacheItem>> {
        if data.is_null() {
            return Ok(None);
        }
        Comment::normalize(data).map(|comment| Some(comment.into_item()))
    }
}

/// Delete a comment
#[derive(Debug, Clone)]
pub struct DeleteComment {
    pub project_id: String,
    pub comment_id: String,
    pub author_id: Option<String>,
}

impl DeleteComment {
    pub fn new(project_id: impl Into<String>, comment_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            comment_id: comment_id.into(),
            author_id: None,
        }
    }

    pub fn author(mut self, author_id: impl Into<String>) -> Self {
        self.author_id = Some(author_id.into());
        self
    }
}

impl Mutation for DeleteComment {
    fn kind(&self) -> MutationKind {
        MutationKind::DeleteComment
    }

    fn scope(&self) -> MutationScope {
        MutationScope::project(&self.project_id).user(self.author_id.as_deref())
    }

    fn request(&self) -> MutationRequest {
        MutationRequest::delete(format!("/comments/{}", self.comment_id))
    }

    fn optimistic_patches(&self) -> Vec<(QueryKey, Patch)> {
        let mut patches = vec![
            (QueryKey::comments(&self.project_id), Patch::remove(&self.comment_id)),
            (
                QueryKey::project(&self.project_id),
                Patch::increment(&self.project_id, "comment_count", -1),
            ),
        ];
        if let Some(author_id) = &self.author_id {
            patches.push((QueryKey::user_comments(author_id), Patch::remove(&self.comment_id)));
        }
        patches
    }

    fn authoritative(&self, _data: &Value) -> Result<Option<CacheItem>> {
        Ok(None)
    }
}

/// Up- or downvote a comment
#[derive(Debug, Clone)]
pub struct VoteComment {
    pub project_id: String,
    pub comment_id: String,
    pub direction: VoteDirection,
}

impl VoteComment {
    pub fn new(
        project_id: impl Into<String>,
        comment_id: impl Into<String>,
        direction: VoteDirection,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            comment_id: comment_id.into(),
            direction,
        }
    }
}

impl Mutation for VoteComment {
    fn kind(&self) -> MutationKind {
        MutationKind::VoteComment
    }

    fn scope(&self) -> MutationScope {
        MutationScope::project(&self.project_id)
    }

    fn request(&self) -> MutationRequest {
        MutationRequest::post(
            format!("/comments/{}/vote", self.comment_id),
            json!({ "vote_type": self.direction.as_wire() }),
        )
    }

    fn optimistic_patches(&self) -> Vec<(QueryKey, Patch)> {
        vec![(
            QueryKey::comments(&self.project_id),
            Patch::increment(&self.comment_id, self.direction.counter(), 1),
        )]
    }

    fn authoritative(&self, data: &Value) -> Result<Option<CacheItem>> {
        match voted_entity(data, "comment", &self.comment_id) {
            Some(entity) => Comment::normalize(entity).map(|comment| Some(comment.into_item())),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;

    #[test]
    fn test_create_comment_request_and_patches() {
        let mutation = CreateComment::new("p1", "hello").author("u1");
        let request = mutation.request();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "/comments");
        assert_eq!(
            request.payload,
            Some(json!({"content": "hello", "project_id": "p1"}))
        );

        let keys: Vec<QueryKey> = mutation
            .optimistic_patches()
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        assert_eq!(
            keys,
            vec![
                QueryKey::comments("p1"),
                QueryKey::project("p1"),
                QueryKey::user_comments("u1")
            ]
        );
    }

    #[test]
    fn test_create_comment_authoritative() {
        let mutation = CreateComment::new("p1", "hello");
        let item = mutation
            .authoritative(&json!({"id": "c1", "content": "hello"}))
            .unwrap()
            .unwrap();
        assert_eq!(item.id, "c1");
        assert!(mutation.authoritative(&Value::Null).unwrap().is_none());
        assert!(mutation.authoritative(&json!({"content": "no id"})).is_err());
    }

    #[test]
    fn test_delete_comment_patches() {
        let mutation = DeleteComment::new("p1", "c1");
        assert_eq!(mutation.request().path, "/comments/c1");
        let patches = mutation.optimistic_patches();
        assert_eq!(patches.len(), 2);
        assert_eq!(patches[0].1, Patch::remove("c1"));
        assert_eq!(patches[1].1, Patch::increment("p1", "comment_count", -1));
    }

    #[test]
    fn test_vote_authoritative_ignores_vote_records() {
        let mutation = VoteComment::new("p1", "c1", VoteDirection::Up);
        assert_eq!(
            mutation.request().payload,
            Some(json!({"vote_type": "upvote"}))
        );
        assert!(mutation
            .authoritative(&json!({"id": "v1", "comment_id": "c1"}))
            .unwrap()
            .is_none());
        let item = mutation
            .authoritative(&json!({"id": "c1", "upvotes": 5}))
            .unwrap()
            .unwrap();
        assert_eq!(item.field_i64("upvotes"), Some(5));
    }
}
