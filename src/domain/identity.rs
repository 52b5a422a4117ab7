//! Identity reconciliation between runs.
//!
//! A skill keeps its identifier as long as its code does not change. The
//! previous run's `code -> id` associations are loaded into an
//! [`IdentitySnapshot`] that the builder only reads.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::SkillsTree;

/// One persisted `code -> id` association.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityMapping {
    pub id: Uuid,
    pub code: String,
}

impl IdentityMapping {
    pub fn new(id: Uuid, code: impl Into<String>) -> Self {
        Self {
            id,
            code: code.into(),
        }
    }
}

/// Read-only view of the identity mappings known before a run.
#[derive(Debug, Clone, Default)]
pub struct IdentitySnapshot {
    by_code: HashMap<String, Uuid>,
    known_ids: HashSet<Uuid>,
}

impl IdentitySnapshot {
    pub fn new(by_code: HashMap<String, Uuid>) -> Self {
        let known_ids = by_code.values().copied().collect();
        Self { by_code, known_ids }
    }

    pub fn get(&self, code: &str) -> Option<Uuid> {
        self.by_code.get(code).copied()
    }

    /// Whether any code in the snapshot already owns this identifier.
    pub fn knows_id(&self, id: &Uuid) -> bool {
        self.known_ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Uuid)> {
        self.by_code.iter()
    }
}

impl FromIterator<IdentityMapping> for IdentitySnapshot {
    fn from_iter<I: IntoIterator<Item = IdentityMapping>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|m| (m.code, m.id)).collect())
    }
}

/// Outcome of resolving a code against the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The code was known; its previous identifier is reused.
    Known(Uuid),
    /// The code is new; a fresh identifier was generated.
    Generated(Uuid),
}

impl Resolution {
    pub fn id(self) -> Uuid {
        match self {
            Resolution::Known(id) | Resolution::Generated(id) => id,
        }
    }

    pub fn is_known(self) -> bool {
        matches!(self, Resolution::Known(_))
    }
}

/// Look up `code`, generating a random identifier on a miss.
pub fn resolve(code: &str, snapshot: &IdentitySnapshot) -> Resolution {
    resolve_with(code, snapshot, Uuid::new_v4)
}

/// Like [`resolve`] with an explicit generator.
///
/// Generated identifiers that already belong to another code in the
/// snapshot are discarded and regenerated.
pub fn resolve_with<F>(code: &str, snapshot: &IdentitySnapshot, mut generate: F) -> Resolution
where
    F: FnMut() -> Uuid,
{
    if let Some(id) = snapshot.get(code) {
        return Resolution::Known(id);
    }
    loop {
        let id = generate();
        if !snapshot.knows_id(&id) {
            return Resolution::Generated(id);
        }
    }
}

/// Mappings of `tree` that are new or differ from the snapshot, sorted by code.
pub fn changed_mappings(tree: &SkillsTree, snapshot: &IdentitySnapshot) -> Vec<IdentityMapping> {
    tree.identity_mappings()
        .into_iter()
        .filter(|mapping| snapshot.get(&mapping.code) != Some(mapping.id))
        .collect()
}
