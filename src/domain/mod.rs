//! Canonical domain types and payload normalization.
//!
//! The backend is not consistent about field names (`id` vs `_id`,
//! `content` vs `body`, flat ids vs nested objects). Each entity type has a
//! single normalization function that maps every known variant onto one
//! canonical struct before anything reaches the cache.

pub mod chain;
pub mod comment;
pub mod project;

pub use chain::{Chain, ChainPost};
pub use comment::Comment;
pub use project::Project;

use crate::core::{CacheError, CacheItem, CacheValue, EntityKind, Result};
use serde_json::Value;

/// Normalize one object of the given entity kind
pub fn normalize_item(entity: EntityKind, value: &Value) -> Result<CacheItem> {
    match entity {
        EntityKind::Comments | EntityKind::UserComments => {
            Comment::normalize(value).map(Comment::into_item)
        }
        EntityKind::Project => Project::normalize(value).map(Project::into_item),
        EntityKind::ChainPosts => ChainPost::normalize(value).map(ChainPost::into_item),
        EntityKind::Chain => Chain::normalize(value).map(Chain::into_item),
    }
}

/// Normalize the `data` of a read response into the value cached for a query
pub fn normalize_value(entity: EntityKind, data: &Value) -> Result<CacheValue> {
    if !entity.is_collection() {
        return normalize_item(entity, data).map(CacheValue::record);
    }

    let rows = list_rows(data).ok_or_else(|| {
        CacheError::normalize(entity.as_str(), format!("expected a list, got {}", kind_of(data)))
    })?;
    let items = rows
        .iter()
        .map(|row| normalize_item(entity, row))
        .collect::<Result<Vec<_>>>()?;
    Ok(CacheValue::list(items))
}

fn list_rows(data: &Value) -> Option<&Vec<Value>> {
    match data {
        Value::Array(rows) => Some(rows),
        Value::Object(_) => ["items", "results", "comments", "posts", "rows"]
            .iter()
            .find_map(|name| data.get(*name).and_then(Value::as_array)),
        _ => None,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Resolve a dotted path such as `author.id`
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.get(segment))
        .filter(|found| !found.is_null())
}

/// First non-null value among candidate field names
pub(crate) fn pick<'a>(value: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| lookup(value, name))
}

pub(crate) fn pick_string(value: &Value, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| match lookup(value, name)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

/// Counter field, `0` when absent. A number that is not whole is malformed
/// rather than truncated.
pub(crate) fn pick_count(entity: &'static str, value: &Value, names: &[&str]) -> Result<i64> {
    names
        .iter()
        .find_map(|name| {
            let found = lookup(value, name)?;
            let count = match found {
                Value::Number(number) => whole(number),
                Value::String(text) => text.trim().parse().ok(),
                _ => return None,
            };
            Some(count.ok_or_else(|| {
                CacheError::normalize(entity, format!("'{}' is not a whole number: {}", name, found))
            }))
        })
        .unwrap_or(Ok(0))
}

fn whole(number: &serde_json::Number) -> Option<i64> {
    number.as_i64().or_else(|| {
        number
            .as_f64()
            .filter(|float| float.fract() == 0.0 && float.abs() < i64::MAX as f64)
            .map(|float| float as i64)
    })
}

/// Unwrap `{ "<wrapper>": { ... } }` payloads
pub(crate) fn unwrap_entity<'a>(value: &'a Value, wrappers: &[&str]) -> &'a Value {
    wrappers
        .iter()
        .find_map(|name| value.get(*name).filter(|inner| inner.is_object()))
        .unwrap_or(value)
}

pub(crate) fn require_id(entity: &'static str, value: &Value, names: &[&str]) -> Result<String> {
    if !value.is_object() {
        return Err(CacheError::normalize(
            entity,
            format!("expected an object, got {}", kind_of(value)),
        ));
    }
    pick_string(value, names)
        .ok_or_else(|| CacheError::normalize(entity, "missing identifier"))
}
