use crate::core::{CacheItem, CacheValue, MutationId};
use log::warn;
use serde_json::Value;

/// Change applied to one field of a cached item
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEdit {
    Set(String, Value),
    /// Counter adjustment; counters never drop below zero
    Add(String, i64),
}

impl FieldEdit {
    pub fn apply(&self, item: &mut CacheItem) {
        match self {
            FieldEdit::Set(field, value) => item.set_field(field, value.clone()),
            FieldEdit::Add(field, delta) => {
                let current = item.field_i64(field).unwrap_or(0);
                let next = current.saturating_add(*delta).max(0);
                item.set_field(field, Value::from(next));
            }
        }
    }
}

/// How reconciliation folds the authoritative result back in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeRule {
    /// New object: placeholder replaced, or authoritative item merged in
    Insert,
    /// Existing object edited in place
    Update { id: String },
    /// Existing object removed
    Remove { id: String },
}

/// Provisional change to the value under one key.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    /// Insert a placeholder at the head of a list
    Prepend(Value),
    /// Insert a placeholder at the tail of a list
    Append(Value),
    /// Edit the item with `id`, in a list or as the record itself
    Update { id: String, edits: Vec<FieldEdit> },
    /// Drop the item with `id` from a list
    Remove { id: String },
}

impl Patch {
    pub fn prepend(data: Value) -> Self {
        Patch::Prepend(data)
    }

    pub fn update(id: impl Into<String>, edits: Vec<FieldEdit>) -> Self {
        Patch::Update {
            id: id.into(),
            edits,
        }
    }

    pub fn increment(id: impl Into<String>, field: impl Into<String>, delta: i64) -> Self {
        Self::update(id, vec![FieldEdit::Add(field.into(), delta)])
    }

    pub fn remove(id: impl Into<String>) -> Self {
        Patch::Remove { id: id.into() }
    }

    pub fn merge_rule(&self) -> MergeRule {
        match self {
            Patch::Prepend(_) | Patch::Append(_) => MergeRule::Insert,
            Patch::Update { id, .. } => MergeRule::Update { id: id.clone() },
            Patch::Remove { id } => MergeRule::Remove { id: id.clone() },
        }
    }

    /// Compute the provisional value, or `None` when the key stays as is.
    ///
    /// A cache miss only produces a value for inserts: a list holding just
    /// the placeholder.
    pub fn apply(&self, current: Option<&CacheValue>, marker: MutationId) -> Option<CacheValue> {
        match self {
            Patch::Prepend(data) | Patch::Append(data) => {
                let placeholder = CacheItem::placeholder(marker, data.clone());
                match current {
                    None => Some(CacheValue::list(vec![placeholder])),
                    Some(CacheValue::List(items)) => {
                        let mut items = items.clone();
                        if matches!(self, Patch::Prepend(_)) {
                            items.push_front(placeholder);
                        } else {
                            items.push_back(placeholder);
                        }
                        Some(CacheValue::List(items))
                    }
                    Some(CacheValue::Record(record)) => {
                        warn!("cannot insert into record '{}'", record.id);
                        None
                    }
                }
            }
            Patch::Update { id, edits } => match current {
                Some(CacheValue::List(items)) => {
                    let pos = items.iter().position(|item| &item.id == id)?;
                    let mut items = items.clone();
                    let edited = edit(&items[pos], edits, marker);
                    items.set(pos, edited);
                    Some(CacheValue::List(items))
                }
                Some(CacheValue::Record(record)) if &record.id == id => {
                    Some(CacheValue::Record(edit(record, edits, marker)))
                }
                _ => None,
            },
            Patch::Remove { id } => match current {
                Some(CacheValue::List(items)) => {
                    let pos = items.iter().position(|item| &item.id == id)?;
                    let mut items = items.clone();
                    items.remove(pos);
                    Some(CacheValue::List(items))
                }
                _ => None,
            },
        }
    }
}

fn edit(item: &CacheItem, edits: &[FieldEdit], marker: MutationId) -> CacheItem {
    let mut edited = item.clone();
    for field_edit in edits {
        field_edit.apply(&mut edited);
    }
    edited.marked(marker)
}
