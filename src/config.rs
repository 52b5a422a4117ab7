//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/skilltree/skilltree.toml`
//! 3. Local config: `<skills_dir>/.skilltree.toml` (inside the mirrored skills tree)
//! 4. Environment variables: `SKILLTREE_*` prefix
//! 5. Explicit skills directory passed on the command line

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;

const APP_NAME: &str = "skilltree";
const LOCAL_CONFIG_NAME: &str = ".skilltree.toml";

/// Raw settings for intermediate parsing (fields are Option to detect "not specified").
///
/// Used during layered config merging to distinguish between:
/// - `None` → field not specified, inherit from base
/// - `Some([])` → explicit empty array
/// - `Some([...])` → explicit values to merge
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub skills_dir: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub ignore: Option<Vec<String>>,
    pub fail_fast: Option<bool>,
    pub pretty_json: Option<bool>,
}

/// Unified configuration for skilltree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Root directory holding one subdirectory per skill area
    pub skills_dir: PathBuf,
    /// SQLite database with identity mappings, revision marker and progress
    pub database_path: PathBuf,
    /// Directory receiving one JSON document per skill area
    pub output_dir: PathBuf,
    /// Top-level names that are never treated as skill areas
    pub ignore: Vec<String>,
    /// Abort the whole run on the first failing skill area
    pub fail_fast: bool,
    /// Pretty-print published JSON
    pub pretty_json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            skills_dir: data_dir.join("skills"),
            database_path: data_dir.join("skilltree.db"),
            output_dir: data_dir.join("site"),
            ignore: vec![".git".into(), ".gitignore".into()],
            fail_fast: false,
            pretty_json: false,
        }
    }
}

/// Get the default data directory (~/.local/share/skilltree on Linux).
fn default_data_dir() -> PathBuf {
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.skilltree"))
}

/// Get the XDG config directory for skilltree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("skilltree.toml"))
}

/// Get the path to the local config file in a skills directory.
pub fn local_config_path(skills_dir: &Path) -> PathBuf {
    skills_dir.join(LOCAL_CONFIG_NAME)
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Expand environment variables and `~` in a path string.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    shellexpand::full(raw.as_ref())
        .map(|s| PathBuf::from(s.into_owned()))
        .unwrap_or_else(|_| path.to_path_buf())
}

impl Settings {
    /// Merge arrays with union semantics and negation support.
    ///
    /// - Items from overlay are added to base
    /// - Items prefixed with `!` remove the corresponding item from the result
    /// - Duplicates are de-duplicated
    ///
    /// # Examples
    /// ```ignore
    /// merge_array(&["a", "b"], &["c"])       // → ["a", "b", "c"]
    /// merge_array(&["a", "b"], &["!a", "c"]) // → ["b", "c"]
    /// ```
    pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
        let mut result: HashSet<String> = base.iter().cloned().collect();

        for pattern in overlay {
            if let Some(negated) = pattern.strip_prefix('!') {
                result.remove(negated);
            } else {
                result.insert(pattern.clone());
            }
        }

        // Convert to sorted Vec for deterministic output
        let mut vec: Vec<String> = result.into_iter().collect();
        vec.sort();
        vec
    }

    /// Expand shell variables and tilde in path fields.
    fn expand_paths(&mut self) {
        self.skills_dir = expand_path(&self.skills_dir);
        self.database_path = expand_path(&self.database_path);
        self.output_dir = expand_path(&self.output_dir);
    }

    /// Apply global config onto defaults with REPLACE semantics for arrays.
    fn apply_global(&self, global: &RawSettings) -> Self {
        Self {
            skills_dir: global
                .skills_dir
                .clone()
                .unwrap_or_else(|| self.skills_dir.clone()),
            database_path: global
                .database_path
                .clone()
                .unwrap_or_else(|| self.database_path.clone()),
            output_dir: global
                .output_dir
                .clone()
                .unwrap_or_else(|| self.output_dir.clone()),
            ignore: global.ignore.clone().unwrap_or_else(|| self.ignore.clone()),
            fail_fast: global.fail_fast.unwrap_or(self.fail_fast),
            pretty_json: global.pretty_json.unwrap_or(self.pretty_json),
        }
    }

    /// Merge a local config onto self with union semantics for arrays.
    ///
    /// The skills directory is not taken from the local file, which lives
    /// inside that directory.
    fn merge_with(&self, local: &RawSettings) -> Self {
        Self {
            skills_dir: self.skills_dir.clone(),
            database_path: local
                .database_path
                .clone()
                .unwrap_or_else(|| self.database_path.clone()),
            output_dir: local
                .output_dir
                .clone()
                .unwrap_or_else(|| self.output_dir.clone()),
            ignore: local
                .ignore
                .as_ref()
                .map(|o| Self::merge_array(&self.ignore, o))
                .unwrap_or_else(|| self.ignore.clone()),
            fail_fast: local.fail_fast.unwrap_or(self.fail_fast),
            pretty_json: local.pretty_json.unwrap_or(self.pretty_json),
        }
    }

    /// Load settings with layered precedence from the default global location.
    pub fn load(skills_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_from(global_config_path().as_deref(), skills_dir)
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `global_path` - Global config file, skipped when missing
    /// * `skills_dir` - Explicit skills directory, wins over every layer
    ///
    /// # Array Merge Semantics
    /// - Defaults → Global: REPLACE (global defines the real baseline)
    /// - Global → Local: UNION with negation support
    /// - Any → Env vars: REPLACE (explicit user override)
    pub fn load_from(
        global_path: Option<&Path>,
        skills_dir: Option<&Path>,
    ) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config (REPLACES defaults)
        if let Some(global_path) = global_path {
            if global_path.exists() {
                debug!("loading global config {}", global_path.display());
                let raw = load_raw_settings(global_path)?;
                current = current.apply_global(&raw);
            }
        }

        // The local config lives in the skills directory, which env vars and
        // the explicit argument may relocate.
        let resolved_dir = Self::resolve_skills_dir(current.clone(), skills_dir)?;
        current.skills_dir = resolved_dir.clone();

        // 3. Local config (UNION with global)
        let local_path = local_config_path(&resolved_dir);
        if local_path.exists() {
            debug!("loading local config {}", local_path.display());
            let raw = load_raw_settings(&local_path)?;
            current = current.merge_with(&raw);
        }

        // 4. Environment variables (replace - explicit override)
        current = Self::apply_env_overrides(current)?;

        // 5. Explicit skills directory
        if let Some(dir) = skills_dir {
            current.skills_dir = dir.to_path_buf();
        }

        current.expand_paths();
        Ok(current)
    }

    fn resolve_skills_dir(
        settings: Self,
        skills_dir: Option<&Path>,
    ) -> Result<PathBuf, ApplicationError> {
        let dir = match skills_dir {
            Some(dir) => dir.to_path_buf(),
            None => Self::apply_env_overrides(settings)?.skills_dir,
        };
        Ok(expand_path(&dir))
    }

    /// Apply SKILLTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("SKILLTREE")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("ignore")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("skills_dir") {
            settings.skills_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("database_path") {
            settings.database_path = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("output_dir") {
            settings.output_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get::<Vec<String>>("ignore") {
            settings.ignore = val;
        }
        if let Ok(val) = config.get_bool("fail_fast") {
            settings.fail_fast = val;
        }
        if let Ok(val) = config.get_bool("pretty_json") {
            settings.pretty_json = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# skilltree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/skilltree/skilltree.toml  (defines your baseline)
#   Local:  <skills_dir>/.skilltree.toml        (per skills tree additions)
#   Env:    SKILLTREE_* environment variables    (explicit overrides)
#
# Array Merge Semantics:
#   Global config REPLACES compiled defaults.
#   Local config UNIONS with global. Use "!name" to remove an inherited item:
#     ignore = ["drafts", "!.gitignore"]

# Directory with one subdirectory per skill area
# skills_dir = "~/.local/share/skilltree/skills"

# SQLite database for identity mappings and user progress
# database_path = "~/.local/share/skilltree/skilltree.db"

# Where published chart JSON files are written
# output_dir = "~/.local/share/skilltree/site"

# Top-level entries that are not skill areas
# ignore = [".git", ".gitignore"]

# Abort the run on the first broken skill area instead of skipping it
# fail_fast = false

# Pretty-print published JSON
# pretty_json = false
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_default_settings_when_created_then_ignores_git_entries() {
        let settings = Settings::default();
        assert!(settings.ignore.contains(&".git".to_string()));
        assert!(settings.ignore.contains(&".gitignore".to_string()));
        assert!(!settings.fail_fast);
    }

    #[test]
    fn given_tilde_in_paths_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            skills_dir: PathBuf::from("~/skills"),
            database_path: PathBuf::from("$HOME/skilltree.db"),
            output_dir: PathBuf::from("${HOME}/site"),
            ..Settings::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        assert!(settings.skills_dir.to_string_lossy().starts_with(&home));
        assert!(settings.database_path.to_string_lossy().starts_with(&home));
        assert!(settings.output_dir.to_string_lossy().starts_with(&home));
    }

    #[test]
    fn test_merge_array_union() {
        let base = vec!["a".to_string(), "b".to_string()];
        let overlay = vec!["c".to_string()];
        let result = Settings::merge_array(&base, &overlay);

        assert_eq!(result, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_merge_array_negation() {
        let base = vec!["a".to_string(), "b".to_string()];
        let overlay = vec!["!a".to_string(), "c".to_string()];
        let result = Settings::merge_array(&base, &overlay);

        assert_eq!(result, vec!["b", "c"]);
    }

    #[test]
    fn test_apply_global_replaces_ignore() {
        let base = Settings::default();
        let global = RawSettings {
            ignore: Some(vec!["drafts".to_string()]),
            fail_fast: Some(true),
            ..RawSettings::default()
        };

        let result = base.apply_global(&global);

        assert_eq!(result.ignore, vec!["drafts".to_string()]);
        assert!(result.fail_fast);
        assert_eq!(result.skills_dir, base.skills_dir);
    }

    #[test]
    fn test_merge_with_unions_ignore_and_keeps_skills_dir() {
        let base = Settings::default();
        let local = RawSettings {
            skills_dir: Some(PathBuf::from("/elsewhere")),
            ignore: Some(vec!["drafts".to_string(), "!.gitignore".to_string()]),
            ..RawSettings::default()
        };

        let result = base.merge_with(&local);

        assert_eq!(result.ignore, vec![".git".to_string(), "drafts".to_string()]);
        assert_eq!(result.skills_dir, base.skills_dir);
    }

    #[test]
    fn given_settings_when_serializing_then_round_trips_through_toml() {
        let settings = Settings::default();

        let toml = settings.to_toml().unwrap();
        let parsed: Settings = toml::from_str(&toml).unwrap();

        assert_eq!(parsed, settings);
    }
}
