//! User progress service
//!
//! Records which skills a user has obtained, and at which level. Progress can
//! only be recorded for skills that have a persisted identity.

use std::rc::Rc;

use tracing::debug;
use uuid::Uuid;

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::UserSkill;
use crate::infrastructure::traits::{IdentityStore, ProgressStore};

/// A progress record joined with the skill's code, when still known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEntry {
    pub skill: UserSkill,
    pub code: Option<String>,
}

pub struct ProgressService {
    identities: Rc<dyn IdentityStore>,
    progress: Rc<dyn ProgressStore>,
}

impl ProgressService {
    pub fn new(identities: Rc<dyn IdentityStore>, progress: Rc<dyn ProgressStore>) -> Self {
        Self {
            identities,
            progress,
        }
    }

    /// Progress of `user_id`, sorted by code; records of removed skills come last.
    pub fn show(&self, user_id: &str) -> ApplicationResult<Vec<ProgressEntry>> {
        let snapshot = self.identities.load_all()?;
        let mut entries: Vec<ProgressEntry> = self
            .progress
            .user_skills(user_id)?
            .into_iter()
            .map(|skill| ProgressEntry {
                code: snapshot
                    .iter()
                    .find(|(_, id)| **id == skill.skill_id)
                    .map(|(code, _)| code.clone()),
                skill,
            })
            .collect();
        entries.sort_by(|a, b| match (&a.code, &b.code) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.skill.skill_id.cmp(&b.skill.skill_id),
        });
        Ok(entries)
    }

    /// Set `user_id`'s level for one skill.
    pub fn record(&self, user_id: &str, skill_id: Uuid, level: u32) -> ApplicationResult<()> {
        let snapshot = self.identities.load_all()?;
        if !snapshot.knows_id(&skill_id) {
            return Err(ApplicationError::UnknownSkill(skill_id));
        }
        debug!("recording {} at level {} for {}", skill_id, level, user_id);
        self.progress
            .update_user_skills(user_id, &[UserSkill::new(skill_id, level)])
    }
}
