use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use serde_json::Value;

use kanban_storage::StorageError;

use crate::error::{EntityKind, ServiceError};

/// How a relationship field appeared in a patch document. Presence is
/// decided from the raw patch, not the merged candidate: a field the
/// patch never mentioned must leave the stored set untouched even though
/// the merged document still carries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationshipPatch<I> {
    /// The key was absent; the existing set is kept as is.
    Untouched,
    /// The key was explicitly null; the set becomes empty.
    Cleared,
    /// The key carried an id array; the set is rebuilt from it.
    Replace(Vec<I>),
}

/// Read one relationship key out of a patch document.
pub fn relationship_patch<I: DeserializeOwned>(
    patch: &Value,
    key: &str,
) -> Result<RelationshipPatch<I>, ServiceError> {
    match patch.get(key) {
        None => Ok(RelationshipPatch::Untouched),
        Some(Value::Null) => Ok(RelationshipPatch::Cleared),
        Some(value) => {
            let ids: Vec<I> = serde_json::from_value(value.clone())
                .map_err(|e| ServiceError::MalformedPatch(format!("{key}: {e}")))?;
            Ok(RelationshipPatch::Replace(ids))
        }
    }
}

/// Rebuild a relationship set from proposed references, resolving every id
/// against authoritative records. Full replacement, never incremental: the
/// first unresolvable id aborts the whole reconciliation, and nothing
/// partial is ever handed back to the caller.
pub fn reconcile_references<I>(
    proposed: &[I],
    kind: EntityKind,
    mut exists: impl FnMut(I) -> Result<bool, StorageError>,
) -> Result<BTreeSet<I>, ServiceError>
where
    I: Copy + Ord + Into<i64>,
{
    let mut resolved = BTreeSet::new();
    for &id in proposed {
        if !exists(id)? {
            return Err(ServiceError::NotFound {
                kind,
                id: id.into(),
            });
        }
        resolved.insert(id);
    }
    Ok(resolved)
}

/// Apply one relationship patch against the existing set.
pub fn apply_relationship_patch<I>(
    existing: &BTreeSet<I>,
    patch: &RelationshipPatch<I>,
    kind: EntityKind,
    exists: impl FnMut(I) -> Result<bool, StorageError>,
) -> Result<BTreeSet<I>, ServiceError>
where
    I: Copy + Ord + Into<i64>,
{
    match patch {
        RelationshipPatch::Untouched => Ok(existing.clone()),
        RelationshipPatch::Cleared => Ok(BTreeSet::new()),
        RelationshipPatch::Replace(ids) => reconcile_references(ids, kind, exists),
    }
}
