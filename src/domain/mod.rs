//! Domain layer: skill entities, identity reconciliation and tree building
//!
//! Nothing in this layer knows about persistence, publishing or the CLI.

pub mod builder;
pub mod entities;
pub mod error;
pub mod identity;

pub use builder::{is_yaml_file_name, join_code, ForestEntry, TreeBuilder, TreeResult};
pub use entities::{PreOrderIter, Skill, SkillDefinition, SkillsTree, UserSkill};
pub use error::DomainError;
pub use identity::{
    changed_mappings, resolve, resolve_with, IdentityMapping, IdentitySnapshot, Resolution,
};
