//! Skills update orchestration
//!
//! One run: load the previous identity mappings, build a tree per skill
//! area, publish each tree as chart JSON, persist the new mappings and
//! finally record the processed revision.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, error, info, instrument, warn};

use crate::application::presentation;
use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;
use crate::domain::{changed_mappings, IdentitySnapshot, SkillsTree, TreeBuilder};
use crate::infrastructure::traits::{IdentityStore, Publisher, RevisionStore};

/// Knobs of a run, usually taken from [`Settings`].
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    pub ignore: Vec<String>,
    pub fail_fast: bool,
    pub pretty_json: bool,
}

impl From<&Settings> for UpdateOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            ignore: settings.ignore.clone(),
            fail_fast: settings.fail_fast,
            pretty_json: settings.pretty_json,
        }
    }
}

/// A skill area that was published successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedTree {
    pub root_code: String,
    pub skills: usize,
    pub new_mappings: usize,
}

/// A skill area that was skipped because of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedTree {
    pub dir: PathBuf,
    pub error: String,
}

/// Summary of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub published: Vec<PublishedTree>,
    pub failed: Vec<FailedTree>,
    /// Revision recorded at the end of the run, if any
    pub revision: Option<String>,
}

impl UpdateReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Orchestrates a full skills update against its collaborators.
pub struct SkillsUpdater {
    identities: Rc<dyn IdentityStore>,
    revisions: Rc<dyn RevisionStore>,
    publisher: Rc<dyn Publisher>,
    options: UpdateOptions,
}

impl SkillsUpdater {
    pub fn new(
        identities: Rc<dyn IdentityStore>,
        revisions: Rc<dyn RevisionStore>,
        publisher: Rc<dyn Publisher>,
        options: UpdateOptions,
    ) -> Self {
        Self {
            identities,
            revisions,
            publisher,
            options,
        }
    }

    /// Load the mappings persisted by previous runs.
    pub fn pull_persisted_skills(&self) -> ApplicationResult<IdentitySnapshot> {
        let snapshot = self.identities.load_all()?;
        debug!("previously persisted skills: {}", snapshot.len());
        Ok(snapshot)
    }

    /// Build one tree per skill area, keyed by root code.
    ///
    /// Broken areas are collected as failures unless `fail_fast` is set.
    pub fn retrieve_skills_trees(
        &self,
        skills_dir: &Path,
        snapshot: &IdentitySnapshot,
    ) -> ApplicationResult<(BTreeMap<String, SkillsTree>, Vec<FailedTree>)> {
        let builder = TreeBuilder::new(snapshot);
        let mut trees = BTreeMap::new();
        let mut failed = Vec::new();

        for entry in builder.build_forest(skills_dir, &self.options.ignore)? {
            match entry.result {
                Ok(tree) => {
                    info!(
                        "parsed skill area {} ({} skills)",
                        tree.root_skill().code,
                        tree.len()
                    );
                    trees.insert(tree.root_skill().code.clone(), tree);
                }
                Err(e) if self.options.fail_fast => return Err(e.into()),
                Err(e) => {
                    error!("skipping skill area {}: {}", entry.dir.display(), e);
                    failed.push(FailedTree {
                        dir: entry.dir,
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok((trees, failed))
    }

    /// Publish one tree and persist its new or changed mappings.
    pub fn update_skills(
        &self,
        tree: &SkillsTree,
        snapshot: &IdentitySnapshot,
    ) -> ApplicationResult<PublishedTree> {
        let root_code = tree.root_skill().code.clone();
        let chart = presentation::transform(tree)?;
        let rendered = if self.options.pretty_json {
            chart.to_json_pretty()
        } else {
            chart.to_json()
        };
        let json = rendered.map_err(|source| ApplicationError::Serialization {
            code: root_code.clone(),
            source,
        })?;
        self.publisher.publish(&root_code, &json)?;

        let mappings = changed_mappings(tree, snapshot);
        for mapping in &mappings {
            self.identities.save(mapping.id, &mapping.code)?;
        }
        info!(
            "skills to id mappings of {} have been persisted ({} new or changed)",
            root_code,
            mappings.len()
        );

        Ok(PublishedTree {
            root_code,
            skills: tree.len(),
            new_mappings: mappings.len(),
        })
    }

    /// Run the full pipeline.
    ///
    /// The revision marker is only advanced when every skill area succeeded,
    /// so a partially failed run is retried from the same revision.
    #[instrument(level = "debug", skip(self))]
    pub fn run(&self, skills_dir: &Path, revision: Option<&str>) -> ApplicationResult<UpdateReport> {
        let snapshot = self.pull_persisted_skills()?;
        let (trees, mut failed) = self.retrieve_skills_trees(skills_dir, &snapshot)?;

        let mut report = UpdateReport::default();
        for (root_code, tree) in &trees {
            match self.update_skills(tree, &snapshot) {
                Ok(published) => report.published.push(published),
                Err(e) if self.options.fail_fast => return Err(e),
                Err(e) => {
                    error!("cannot update skill area {}: {}", root_code, e);
                    failed.push(FailedTree {
                        dir: skills_dir.join(area_of(root_code)),
                        error: e.to_string(),
                    });
                }
            }
        }
        report.failed = failed;

        match revision {
            Some(revision) if report.is_success() => {
                self.revisions.save_revision(revision)?;
                info!("recorded revision {}", revision);
                report.revision = Some(revision.to_string());
            }
            Some(revision) => warn!(
                "not recording revision {}: {} skill area(s) failed",
                revision,
                report.failed.len()
            ),
            None => debug!("no revision supplied"),
        }

        Ok(report)
    }
}

fn area_of(root_code: &str) -> &str {
    root_code.split('/').next().unwrap_or(root_code)
}
