//! skilltree: stable-identity skill trees built from YAML definitions
//!
//! Layers, innermost first: `domain` (entities, identity reconciliation,
//! tree building), `application` (presentation and services),
//! `infrastructure` (storage, publishing, wiring) and `cli`.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod tree_traits;
pub mod util;
