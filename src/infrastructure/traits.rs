//! Collaborator boundary traits
//!
//! The tree pipeline only talks to storage and publishing through these
//! traits, so services can be tested with in-memory implementations.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{IdentitySnapshot, UserSkill};

/// Persisted `code -> id` associations.
pub trait IdentityStore {
    /// Load every known mapping.
    fn load_all(&self) -> ApplicationResult<IdentitySnapshot>;

    /// Upsert one association: update the id when the code exists with a
    /// different id, insert otherwise.
    fn save(&self, id: Uuid, code: &str) -> ApplicationResult<()>;
}

/// Marker of the last processed source revision.
pub trait RevisionStore {
    fn save_revision(&self, revision: &str) -> ApplicationResult<()>;

    fn load_revision(&self) -> ApplicationResult<Option<String>>;
}

/// Per-user skill progress.
pub trait ProgressStore {
    fn user_skills(&self, user_id: &str) -> ApplicationResult<Vec<UserSkill>>;

    /// Upsert each record on `(user_id, skill_id)`.
    fn update_user_skills(&self, user_id: &str, skills: &[UserSkill]) -> ApplicationResult<()>;
}

/// Receiver of finished chart JSON documents, one call per skill area.
pub trait Publisher {
    fn publish(&self, root_code: &str, json: &str) -> ApplicationResult<()>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Writes each skill area to `<output_dir>/<area>.json`.
#[derive(Debug, Clone)]
pub struct DirectoryPublisher {
    output_dir: PathBuf,
}

impl DirectoryPublisher {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Target file for a root code: its first path segment plus `.json`.
    pub fn target_path(&self, root_code: &str) -> ApplicationResult<PathBuf> {
        let area = root_code
            .split('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| ApplicationError::Publish {
                code: root_code.to_string(),
                message: "root code has no area segment".to_string(),
            })?;
        Ok(self.output_dir.join(format!("{area}.json")))
    }
}

impl Publisher for DirectoryPublisher {
    fn publish(&self, root_code: &str, json: &str) -> ApplicationResult<()> {
        std::fs::create_dir_all(&self.output_dir)
            .with_path_context("create output directory", &self.output_dir)?;
        let target = self.target_path(root_code)?;
        std::fs::write(&target, json).with_path_context("write skills tree", &target)?;
        info!("published {} to {}", root_code, target.display());
        Ok(())
    }
}

/// Prints each document as one line on stdout.
#[derive(Debug, Default)]
pub struct StdoutPublisher;

impl Publisher for StdoutPublisher {
    fn publish(&self, root_code: &str, json: &str) -> ApplicationResult<()> {
        debug!("printing {}", root_code);
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{json}").map_err(|e| ApplicationError::Publish {
            code: root_code.to_string(),
            message: e.to_string(),
        })
    }
}
