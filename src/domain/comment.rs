use super::{pick, pick_count, pick_string, require_id, unwrap_entity};
use crate::core::{CacheItem, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

const ID: &[&str] = &["id", "_id", "comment_id", "commentId"];
const CONTENT: &[&str] = &["content", "body", "text", "comment"];
const PROJECT: &[&str] = &["project_id", "projectId", "project.id", "project"];
const AUTHOR: &[&str] = &["author_id", "user_id", "userId", "author.id", "user.id"];
const UPVOTES: &[&str] = &["upvotes", "upvote_count", "up_votes", "likes"];
const DOWNVOTES: &[&str] = &["downvotes", "downvote_count", "down_votes", "dislikes"];
const CREATED: &[&str] = &["created_at", "createdAt"];

/// Comment on a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub project_id: Option<String>,
    pub author_id: Option<String>,
    pub upvotes: i64,
    pub downvotes: i64,
    pub created_at: Option<String>,
}

impl Comment {
    pub fn normalize(value: &Value) -> Result<Self> {
        let value = unwrap_entity(value, &["comment", "data"]);
        let id = require_id("comment", value, ID)?;
        Ok(Self {
            id,
            content: pick_string(value, CONTENT).unwrap_or_default(),
            project_id: pick_string(value, PROJECT),
            author_id: pick_string(value, AUTHOR),
            upvotes: pick_count("comment", value, UPVOTES)?,
            downvotes: pick_count("comment", value, DOWNVOTES)?,
            created_at: pick(value, CREATED).map(|created| match created {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            }),
        })
    }

    /// Provisional payload for a comment not yet accepted by the server
    pub fn draft(content: &str, project_id: &str, author_id: Option<&str>) -> Value {
        json!({
            "content": content,
            "project_id": project_id,
            "author_id": author_id,
            "upvotes": 0,
            "downvotes": 0,
            "created_at": chrono::Utc::now().to_rfc3339(),
        })
    }

    pub fn into_item(self) -> CacheItem {
        let data = json!({
            "id": self.id,
            "content": self.content,
            "project_id": self.project_id,
            "author_id": self.author_id,
            "upvotes": self.upvotes,
            "downvotes": self.downvotes,
            "created_at": self.created_at,
        });
        CacheItem::new(self.id, data)
    }
}
