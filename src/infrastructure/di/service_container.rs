//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::rc::Rc;

use tracing::debug;

use crate::application::services::{ProgressService, SkillsUpdater, UpdateOptions};
use crate::config::Settings;
use crate::infrastructure::error::InfraResult;
use crate::infrastructure::memory::InMemoryStore;
use crate::infrastructure::sqlite::SqliteStore;
use crate::infrastructure::traits::{
    DirectoryPublisher, IdentityStore, ProgressStore, Publisher, RevisionStore, StdoutPublisher,
};

/// Container holding the collaborators shared by all services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Rc<Settings>,

    pub identities: Rc<dyn IdentityStore>,
    pub revisions: Rc<dyn RevisionStore>,
    pub progress: Rc<dyn ProgressStore>,
    pub publisher: Rc<dyn Publisher>,
}

impl ServiceContainer {
    /// Create a container backed by the SQLite database and output directory
    /// named in `settings`.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        debug!("opening database {}", settings.database_path.display());
        let store = Rc::new(SqliteStore::open(&settings.database_path)?);
        let publisher = Rc::new(DirectoryPublisher::new(settings.output_dir.clone()));
        Ok(Self::with_deps(
            settings,
            store.clone(),
            store.clone(),
            store,
            publisher,
        ))
    }

    /// Create a container that persists nothing and prints JSON to stdout.
    pub fn dry_run(settings: Settings) -> Self {
        let store = Rc::new(InMemoryStore::new());
        Self::with_deps(
            settings,
            store.clone(),
            store.clone(),
            store,
            Rc::new(StdoutPublisher),
        )
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        identities: Rc<dyn IdentityStore>,
        revisions: Rc<dyn RevisionStore>,
        progress: Rc<dyn ProgressStore>,
        publisher: Rc<dyn Publisher>,
    ) -> Self {
        Self {
            settings: Rc::new(settings),
            identities,
            revisions,
            progress,
            publisher,
        }
    }

    pub fn updater(&self) -> SkillsUpdater {
        SkillsUpdater::new(
            self.identities.clone(),
            self.revisions.clone(),
            self.publisher.clone(),
            UpdateOptions::from(self.settings.as_ref()),
        )
    }

    pub fn progress_service(&self) -> ProgressService {
        ProgressService::new(self.identities.clone(), self.progress.clone())
    }
}
