use crate::core::{CacheItem, CacheValue, MutationId};
use crate::optimistic::MergeRule;
use im::Vector;

/// Fold the authoritative result of mutation `marker` into one cached value.
///
/// Returns the replacement value, or `None` when nothing changes. Whatever
/// the branch taken, no item carrying `marker` survives: placeholders are
/// replaced or dropped and edited items lose the marker.
pub(crate) fn reconcile_value(
    current: Option<&CacheValue>,
    marker: MutationId,
    rule: &MergeRule,
    authoritative: Option<&CacheItem>,
) -> Option<CacheValue> {
    let next = match current {
        None => match (rule, authoritative) {
            (MergeRule::Insert, Some(item)) => CacheValue::list(vec![item.clone()]),
            _ => return None,
        },
        Some(CacheValue::List(items)) => {
            CacheValue::List(reconcile_list(items, marker, rule, authoritative))
        }
        Some(CacheValue::Record(record)) => {
            CacheValue::Record(reconcile_record(record, marker, rule, authoritative))
        }
    };

    match current {
        Some(current) if *current == next => None,
        _ => Some(next),
    }
}

fn reconcile_list(
    items: &Vector<CacheItem>,
    marker: MutationId,
    rule: &MergeRule,
    authoritative: Option<&CacheItem>,
) -> Vector<CacheItem> {
    let mut items = items.clone();

    match rule {
        MergeRule::Insert => {
            if let Some(item) = authoritative {
                let placeholder = items
                    .iter()
                    .position(|existing| existing.is_marked_by(marker) && existing.is_placeholder());
                let existing = items.iter().position(|existing| existing.id == item.id);
                match (placeholder, existing) {
                    // a refetch already brought the real item in
                    (_, Some(pos)) => {
                        items.set(pos, item.clone());
                    }
                    (Some(pos), None) => {
                        items.set(pos, item.clone());
                    }
                    (None, None) => items.push_front(item.clone()),
                }
            }
        }
        MergeRule::Update { id } => {
            if let Some(item) = authoritative.filter(|item| &item.id == id) {
                if let Some(pos) = items.iter().position(|existing| &existing.id == id) {
                    items.set(pos, item.clone());
                }
            }
        }
        MergeRule::Remove { id } => {
            if let Some(pos) = items.iter().position(|existing| &existing.id == id) {
                items.remove(pos);
            }
        }
    }

    strip_marker(items, marker)
}

fn reconcile_record(
    record: &CacheItem,
    marker: MutationId,
    rule: &MergeRule,
    authoritative: Option<&CacheItem>,
) -> CacheItem {
    if let (MergeRule::Update { id }, Some(item)) = (rule, authoritative) {
        if &record.id == id && &item.id == id {
            return item.clone();
        }
    }
    if record.is_marked_by(marker) {
        record.clone().confirmed()
    } else {
        record.clone()
    }
}

fn strip_marker(items: Vector<CacheItem>, marker: MutationId) -> Vector<CacheItem> {
    if !items.iter().any(|item| item.is_marked_by(marker)) {
        return items;
    }
    items
        .into_iter()
        .filter(|item| !(item.is_marked_by(marker) && item.is_placeholder()))
        .map(|item| {
            if item.is_marked_by(marker) {
                item.confirmed()
            } else {
                item
            }
        })
        .collect()
}
