//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on collaborator traits (IdentityStore, Publisher, etc.)
//! but are themselves concrete structs, not traits.

mod progress;
mod updater;

pub use progress::{ProgressEntry, ProgressService};
pub use updater::{FailedTree, PublishedTree, SkillsUpdater, UpdateOptions, UpdateReport};
