//! In-memory store used for dry runs and tests

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;

use crate::application::ApplicationResult;
use crate::domain::{IdentityMapping, IdentitySnapshot, UserSkill};
use crate::infrastructure::traits::{IdentityStore, ProgressStore, RevisionStore};

/// Keeps all state in process memory; nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    mappings: RefCell<HashMap<String, Uuid>>,
    revision: RefCell<Option<String>>,
    progress: RefCell<HashMap<String, BTreeMap<Uuid, u32>>>,
    saves: RefCell<usize>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with mappings, e.g. from a previous run.
    pub fn with_mappings(mappings: impl IntoIterator<Item = IdentityMapping>) -> Self {
        let store = Self::new();
        store
            .mappings
            .borrow_mut()
            .extend(mappings.into_iter().map(|m| (m.code, m.id)));
        store
    }

    /// Number of `save` calls received so far.
    pub fn save_count(&self) -> usize {
        *self.saves.borrow()
    }
}

impl IdentityStore for InMemoryStore {
    fn load_all(&self) -> ApplicationResult<IdentitySnapshot> {
        Ok(IdentitySnapshot::new(self.mappings.borrow().clone()))
    }

    fn save(&self, id: Uuid, code: &str) -> ApplicationResult<()> {
        *self.saves.borrow_mut() += 1;
        self.mappings.borrow_mut().insert(code.to_string(), id);
        Ok(())
    }
}

impl RevisionStore for InMemoryStore {
    fn save_revision(&self, revision: &str) -> ApplicationResult<()> {
        *self.revision.borrow_mut() = Some(revision.to_string());
        Ok(())
    }

    fn load_revision(&self) -> ApplicationResult<Option<String>> {
        Ok(self.revision.borrow().clone())
    }
}

impl ProgressStore for InMemoryStore {
    fn user_skills(&self, user_id: &str) -> ApplicationResult<Vec<UserSkill>> {
        Ok(self
            .progress
            .borrow()
            .get(user_id)
            .map(|levels| {
                levels
                    .iter()
                    .map(|(skill_id, level)| UserSkill::new(*skill_id, *level))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn update_user_skills(&self, user_id: &str, skills: &[UserSkill]) -> ApplicationResult<()> {
        let mut progress = self.progress.borrow_mut();
        let levels = progress.entry(user_id.to_string()).or_default();
        for skill in skills {
            levels.insert(skill.skill_id, skill.level);
        }
        Ok(())
    }
}
