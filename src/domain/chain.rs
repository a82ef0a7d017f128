use super::{pick_count, pick_string, require_id, unwrap_entity};
use crate::core::{CacheItem, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Chain (community forum) with its aggregate counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    pub id: String,
    pub name: String,
    pub post_count: i64,
    pub member_count: i64,
}

impl Chain {
    pub fn normalize(value: &Value) -> Result<Self> {
        let value = unwrap_entity(value, &["chain"]);
        let id = require_id("chain", value, &["id", "_id", "chain_id", "chainId"])?;
        Ok(Self {
            id,
            name: pick_string(value, &["name", "title"]).unwrap_or_default(),
            post_count: pick_count(
                "chain",
                value,
                &["post_count", "postCount", "posts_count", "_count.posts"],
            )?,
            member_count: pick_count(
                "chain",
                value,
                &["member_count", "memberCount", "members_count", "_count.members"],
            )?,
        })
    }

    pub fn into_item(self) -> CacheItem {
        let data = json!({
            "id": self.id,
            "name": self.name,
            "post_count": self.post_count,
            "member_count": self.member_count,
        });
        CacheItem::new(self.id, data)
    }
}

/// Post inside a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainPost {
    pub id: String,
    pub chain_id: Option<String>,
    pub title: String,
    pub content: String,
    pub author_id: Option<String>,
    pub upvotes: i64,
    pub downvotes: i64,
}

impl ChainPost {
    pub fn normalize(value: &Value) -> Result<Self> {
        let value = unwrap_entity(value, &["post"]);
        let id = require_id("chain post", value, &["id", "_id", "post_id", "postId"])?;
        Ok(Self {
            id,
            chain_id: pick_string(value, &["chain_id", "chainId", "chain.id"]),
            title: pick_string(value, &["title", "subject"]).unwrap_or_default(),
            content: pick_string(value, &["content", "body", "text"]).unwrap_or_default(),
            author_id: pick_string(value, &["author_id", "user_id", "userId", "author.id"]),
            upvotes: pick_count("chain post", value, &["upvotes", "upvote_count", "likes"])?,
            downvotes: pick_count("chain post", value, &["downvotes", "downvote_count"])?,
        })
    }

    pub fn draft(chain_id: &str, title: &str, content: &str, author_id: Option<&str>) -> Value {
        json!({
            "chain_id": chain_id,
            "title": title,
            "content": content,
            "author_id": author_id,
            "upvotes": 0,
            "downvotes": 0,
        })
    }

    pub fn into_item(self) -> CacheItem {
        let data = json!({
            "id": self.id,
            "chain_id": self.chain_id,
            "title": self.title,
            "content": self.content,
            "author_id": self.author_id,
            "upvotes": self.upvotes,
            "downvotes": self.downvotes,
        });
        CacheItem::new(self.id, data)
    }
}
