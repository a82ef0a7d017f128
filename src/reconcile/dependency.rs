use crate::core::{EntityKind, QueryKey};
use crate::mutations::{MutationKind, MutationScope};
use std::collections::HashMap;

/// Which cached queries go stale when a mutation kind commits.
///
/// Entries name entity kinds; the concrete keys come from the mutation's
/// scope, so a template whose identifier is missing from the scope is
/// skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyMap {
    table: HashMap<MutationKind, Vec<EntityKind>>,
}

impl DependencyMap {
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    pub fn standard() -> Self {
        Self::empty()
            .with(MutationKind::CreateComment, EntityKind::Comments)
            .with(MutationKind::CreateComment, EntityKind::Project)
            .with(MutationKind::CreateComment, EntityKind::UserComments)
            .with(MutationKind::DeleteComment, EntityKind::Comments)
            .with(MutationKind::DeleteComment, EntityKind::Project)
            .with(MutationKind::DeleteComment, EntityKind::UserComments)
            .with(MutationKind::VoteComment, EntityKind::Comments)
            .with(MutationKind::CreateChainPost, EntityKind::ChainPosts)
            .with(MutationKind::CreateChainPost, EntityKind::Chain)
            .with(MutationKind::DeleteChainPost, EntityKind::ChainPosts)
            .with(MutationKind::DeleteChainPost, EntityKind::Chain)
            .with(MutationKind::VoteChainPost, EntityKind::ChainPosts)
    }

    pub fn with(mut self, kind: MutationKind, entity: EntityKind) -> Self {
        let entities = self.table.entry(kind).or_default();
        if !entities.contains(&entity) {
            entities.push(entity);
        }
        self
    }

    pub fn entities(&self, kind: MutationKind) -> &[EntityKind] {
        self.table.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Concrete keys to invalidate for a committed mutation
    pub fn keys_for(&self, kind: MutationKind, scope: &MutationScope) -> Vec<QueryKey> {
        self.entities(kind)
            .iter()
            .filter_map(|entity| resolve_key(*entity, scope))
            .collect()
    }
}

impl Default for DependencyMap {
    fn default() -> Self {
        Self::standard()
    }
}

/// Build the key of `entity` from the identifiers in `scope`
pub fn resolve_key(entity: EntityKind, scope: &MutationScope) -> Option<QueryKey> {
    let id = match entity {
        EntityKind::Comments | EntityKind::Project => scope.project_id.as_deref(),
        EntityKind::ChainPosts | EntityKind::Chain => scope.chain_id.as_deref(),
        EntityKind::UserComments => scope.user_id.as_deref(),
    }?;
    Some(QueryKey::new(entity).param(entity.id_param(), id))
}
