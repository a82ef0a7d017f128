use super::{Mutation, MutationKind, MutationScope, VoteDirection, voted_entity};
use crate::core::{CacheItem, QueryKey, Result};
use crate::domain::ChainPost;
use crate::executor::MutationRequest;
use crate::optimistic::Patch;
use serde_json::{Value, json};

/// Publish a post in a chain
#[derive(Debug, Clone)]
pub struct CreateChainPost {
    pub chain_id: String,
    pub title: String,
    pub content: String,
    pub author_id: Option<String>,
}

impl CreateChainPost {
    pub fn new(
        chain_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            title: title.into(),
            content: content.into(),
            author_id: None,
        }
    }

    pub fn author(mut self, author_id: impl Into<String>) -> Self {
        self.author_id = Some(author_id.into());
        self
    }
}

impl Mutation for CreateChainPost {
    fn kind(&self) -> MutationKind {
        MutationKind::CreateChainPost
    }

    fn scope(&self) -> MutationScope {
        MutationScope::chain(&self.chain_id).user(self.author_id.as_deref())
    }

    fn request(&self) -> MutationRequest {
        MutationRequest::post(
            format!("/chains/{}/posts", self.chain_id),
            json!({ "title": self.title, "content": self.content }),
        )
    }

    fn optimistic_patches(&self) -> Vec<(QueryKey, Patch)> {
        let draft = ChainPost::draft(
            &self.chain_id,
            &self.title,
            &self.content,
            self.author_id.as_deref(),
        );
        vec![
            (QueryKey::chain_posts(&self.chain_id), Patch::prepend(draft)),
            (
                QueryKey::chain(&self.chain_id),
                Patch::increment(&self.chain_id, "post_count", 1),
            ),
        ]
    }

    fn authoritative(&self, data: &Value) -> Result<Option<CacheItem>> {
        if data.is_null() {
            return Ok(None);
        }
        ChainPost::normalize(data).map(|post| Some(post.into_item()))
    }
}

/// Remove a post from a chain
#[derive(Debug, Clone)]
pub struct DeleteChainPost {
    pub chain_id: String,
    pub post_id: String,
}

impl DeleteChainPost {
    pub fn new(chain_id: impl Into<String>, post_id: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            post_id: post_id.into(),
        }
    }
}

impl Mutation for DeleteChainPost {
    fn kind(&self) -> MutationKind {
        MutationKind::DeleteChainPost
    }

    fn scope(&self) -> MutationScope {
        MutationScope::chain(&self.chain_id)
    }

    fn request(&self) -> MutationRequest {
        MutationRequest::delete(format!("/chains/{}/posts/{}", self.chain_id, self.post_id))
    }

    fn optimistic_patches(&self) -> Vec<(QueryKey, Patch)> {
        vec![
            (QueryKey::chain_posts(&self.chain_id), Patch::remove(&self.post_id)),
            (
                QueryKey::chain(&self.chain_id),
                Patch::increment(&self.chain_id, "post_count", -1),
            ),
        ]
    }

    fn authoritative(&self, _data: &Value) -> Result<Option<CacheItem>> {
        Ok(None)
    }
}

/// Up- or downvote a chain post
#[derive(Debug, Clone)]
pub struct VoteChainPost {
    pub chain_id: String,
    pub post_id: String,
    pub direction: VoteDirection,
}

impl VoteChainPost {
    pub fn new(
        chain_id: impl Into<String>,
        post_id: impl Into<String>,
        direction: VoteDirection,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            post_id: post_id.into(),
            direction,
        }
    }
}

impl Mutation for VoteChainPost {
    fn kind(&self) -> MutationKind {
        MutationKind::VoteChainPost
    }

    fn scope(&self) -> MutationScope {
        MutationScope::chain(&self.chain_id)
    }

    fn request(&self) -> MutationRequest {
        MutationRequest::post(
            format!("/chains/{}/posts/{}/vote", self.chain_id, self.post_id),
            json!({ "vote_type": self.direction.as_wire() }),
        )
    }

    fn optimistic_patches(&self) -> Vec<(QueryKey, Patch)> {
        vec![(
            QueryKey::chain_posts(&self.chain_id),
            Patch::increment(&self.post_id, self.direction.counter(), 1),
        )]
    }

    fn authoritative(&self, data: &Value) -> Result<Option<CacheItem>> {
        match voted_entity(data, "post", &self.post_id) {
            Some(entity) => ChainPost::normalize(entity).map(|post| Some(post.into_item())),
            None => Ok(None),
        }
    }
}
