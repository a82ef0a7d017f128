use im::Vector;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

/// Prefix of identifiers assigned to provisional items before the server
/// hands out the real one.
pub const TEMP_ID_PREFIX: &str = "tmp-";

static NEXT_MUTATION_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier of one mutation instance; doubles as the marker carried
/// by the provisional items that mutation writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MutationId(pub u64);

impl MutationId {
    pub fn new() -> Self {
        MutationId(NEXT_MUTATION_ID.fetch_add(1, Ordering::SeqCst))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for MutationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MutationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "mut_{}", self.0)
    }
}

/// One domain object held in the cache.
///
/// `provisional` is set while the object reflects an unconfirmed mutation;
/// the marker is the id of that mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheItem {
    pub id: String,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisional: Option<MutationId>,
}

impl CacheItem {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
            provisional: None,
        }
    }

    /// Placeholder for an object the server has not created yet
    pub fn placeholder(marker: MutationId, mut data: Value) -> Self {
        let id = format!("{}{}", TEMP_ID_PREFIX, uuid::Uuid::new_v4());
        if let Value::Object(fields) = &mut data {
            fields.insert("id".to_string(), Value::String(id.clone()));
        }
        Self {
            id,
            data,
            provisional: Some(marker),
        }
    }

    pub fn is_provisional(&self) -> bool {
        self.provisional.is_some()
    }

    pub fn is_marked_by(&self, marker: MutationId) -> bool {
        self.provisional == Some(marker)
    }

    /// Whether the item only exists locally (inserted, not just edited)
    pub fn is_placeholder(&self) -> bool {
        self.id.starts_with(TEMP_ID_PREFIX)
    }

    pub fn marked(mut self, marker: MutationId) -> Self {
        self.provisional = Some(marker);
        self
    }

    pub fn confirmed(mut self) -> Self {
        self.provisional = None;
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    pub fn field_i64(&self, name: &str) -> Option<i64> {
        self.data.get(name).and_then(Value::as_i64)
    }

    /// Set a field on object data; non-object data is left untouched
    pub fn set_field(&mut self, name: &str, value: Value) {
        if let Value::Object(fields) = &mut self.data {
            fields.insert(name.to_string(), value);
        }
    }
}

/// Value stored under one cache key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CacheValue {
    List(Vector<CacheItem>),
    Record(CacheItem),
}

impl CacheValue {
    pub fn list(items: impl IntoIterator<Item = CacheItem>) -> Self {
        CacheValue::List(items.into_iter().collect())
    }

    pub fn record(item: CacheItem) -> Self {
        CacheValue::Record(item)
    }

    pub fn as_list(&self) -> Option<&Vector<CacheItem>> {
        match self {
            CacheValue::List(items) => Some(items),
            CacheValue::Record(_) => None,
        }
    }

    pub fn as_record(&self) -> Option<&CacheItem> {
        match self {
            CacheValue::Record(item) => Some(item),
            CacheValue::List(_) => None,
        }
    }

    /// Number of items; a record counts as one
    pub fn len(&self) -> usize {
        match self {
            CacheValue::List(items) => items.len(),
            CacheValue::Record(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn items(&self) -> Box<dyn Iterator<Item = &CacheItem> + '_> {
        match self {
            CacheValue::List(items) => Box::new(items.iter()),
            CacheValue::Record(item) => Box::new(std::iter::once(item)),
        }
    }

    pub fn find(&self, id: &str) -> Option<&CacheItem> {
        self.items().find(|item| item.id == id)
    }

    pub fn contains_marker(&self, marker: MutationId) -> bool {
        self.items().any(|item| item.is_marked_by(marker))
    }

    pub fn has_provisional(&self) -> bool {
        self.items().any(CacheItem::is_provisional)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.items().map(|item| item.id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mutation_id_generation() {
        let first = MutationId::new();
        let second = MutationId::new();
        assert!(second.as_u64() > first.as_u64());
        assert!(first.to_string().starts_with("mut_"));
    }

    #[test]
    fn test_placeholder_carries_temp_id() {
        let marker = MutationId::new();
        let item = CacheItem::placeholder(marker, json!({"content": "hello"}));
        assert!(item.is_placeholder());
        assert!(item.is_marked_by(marker));
        assert_eq!(item.field("id").and_then(Value::as_str), Some(item.id.as_str()));
    }

    #[test]
    fn test_confirmed_clears_marker() {
        let marker = MutationId::new();
        let item = CacheItem::new("c1", json!({"upvotes": 1})).marked(marker);
        assert!(item.is_provisional());
        let item = item.confirmed();
        assert!(!item.is_provisional());
        assert_eq!(item.field_i64("upvotes"), Some(1));
    }

    #[test]
    fn test_value_lookup() {
        let marker = MutationId::new();
        let value = CacheValue::list(vec![
            CacheItem::new("c1", json!({})),
            CacheItem::new("c2", json!({})).marked(marker),
        ]);
        assert_eq!(value.len(), 2);
        assert!(value.find("c2").is_some());
        assert!(value.contains_marker(marker));
        assert_eq!(value.ids(), vec!["c1", "c2"]);

        let record = CacheValue::record(CacheItem::new("p1", json!({})));
        assert_eq!(record.len(), 1);
        assert!(!record.has_provisional());
    }
}
