use super::{pick_count, pick_string, require_id, unwrap_entity};
use crate::core::{CacheItem, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Travel project with its aggregate counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub comment_count: i64,
    pub like_count: i64,
}

impl Project {
    pub fn normalize(value: &Value) -> Result<Self> {
        let value = unwrap_entity(value, &["project"]);
        let id = require_id("project", value, &["id", "_id", "project_id", "projectId"])?;
        Ok(Self {
            id,
            title: pick_string(value, &["title", "name"]).unwrap_or_default(),
            comment_count: pick_count(
                "project",
                value,
                &["comment_count", "commentCount", "comments_count", "_count.comments"],
            )?,
            like_count: pick_count("project", value, &["like_count", "likeCount", "likes"])?,
        })
    }

    pub fn into_item(self) -> CacheItem {
        let data = json!({
            "id": self.id,
            "title": self.title,
            "comment_count": self.comment_count,
            "like_count": self.like_count,
        });
        CacheItem::new(self.id, data)
    }
}
