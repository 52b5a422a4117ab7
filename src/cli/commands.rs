//! Command dispatch: maps parsed arguments onto services

use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::CommandFactory;
use clap_complete::generate;
use itertools::Itertools;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::application::presentation;
use crate::application::services::{ProgressEntry, ProgressService, UpdateReport};
use crate::application::{ApplicationError, IoResultExt};
use crate::cli::args::{Cli, Commands, ConfigCommands, ProgressCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{IdentitySnapshot, SkillsTree, TreeBuilder};
use crate::infrastructure::traits::{IdentityStore, RevisionStore};
use crate::infrastructure::{ServiceContainer, SqliteStore};
use crate::tree_traits::TreeDisplay;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, see --help".to_string(),
        ));
    };

    // Completion does not need settings
    if let Commands::Completion { shell } = command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let settings = Settings::load(cli.skills_dir.as_deref())?;
    debug!("effective settings: {:?}", settings);

    match command {
        Commands::Update { revision, dry_run } => {
            cmd_update(settings, revision.as_deref(), *dry_run)
        }
        Commands::Build { dir, pretty } => cmd_build(&settings, dir, *pretty),
        Commands::Tree { dir } => cmd_tree(&settings, dir),
        Commands::Mappings => cmd_mappings(&settings),
        Commands::Revision => cmd_revision(&settings),
        Commands::Progress { command } => match command {
            ProgressCommands::Show { user } => cmd_progress_show(&settings, user),
            ProgressCommands::Set { user, skill, level } => {
                cmd_progress_set(settings, user, *skill, *level)
            }
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show => cmd_config_show(&settings),
            ConfigCommands::Init { global } => cmd_config_init(&settings, *global),
            ConfigCommands::Path => cmd_config_path(&settings),
        },
        Commands::Completion { .. } => Ok(()),
    }
}

// ============================================================
// Update
// ============================================================

#[instrument(level = "debug", skip(settings))]
fn cmd_update(settings: Settings, revision: Option<&str>, dry_run: bool) -> CliResult<()> {
    let skills_dir = settings.skills_dir.clone();
    let container = if dry_run {
        ServiceContainer::dry_run(settings)
    } else {
        ServiceContainer::new(settings)?
    };

    let report = container.updater().run(&skills_dir, revision)?;

    // Dry runs print the JSON documents on stdout, keep it clean
    if dry_run {
        for failed in &report.failed {
            output::warning(&format!("{}: {}", failed.dir.display(), failed.error));
        }
    } else {
        print_report(&report, &container.settings.output_dir);
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::PartialUpdate {
            failed: report.failed.len(),
        })
    }
}

fn print_report(report: &UpdateReport, output_dir: &Path) {
    output::header(&format!("Published to {}", output_dir.display()));
    for tree in &report.published {
        output::success(&format!(
            "{} ({} skills, {} new mappings)",
            tree.root_code, tree.skills, tree.new_mappings
        ));
    }
    for failed in &report.failed {
        output::failure(&format!("{}: {}", failed.dir.display(), failed.error));
    }
    if let Some(revision) = &report.revision {
        output::action("Revision", revision);
    }
}

// ============================================================
// Single area inspection
// ============================================================

/// The database, if a previous run created it. Read-only commands never
/// create it.
fn existing_store(settings: &Settings) -> CliResult<Option<Rc<SqliteStore>>> {
    if !settings.database_path.exists() {
        debug!("no database at {}", settings.database_path.display());
        return Ok(None);
    }
    Ok(Some(Rc::new(SqliteStore::open(&settings.database_path)?)))
}

/// Identities persisted so far; an absent database means none.
fn persisted_snapshot(settings: &Settings) -> CliResult<IdentitySnapshot> {
    match existing_store(settings)? {
        Some(store) => Ok(store.load_all()?),
        None => Ok(IdentitySnapshot::default()),
    }
}

fn build_area(settings: &Settings, dir: &Path) -> CliResult<SkillsTree> {
    let snapshot = persisted_snapshot(settings)?;
    Ok(TreeBuilder::new(&snapshot).build_from_directory(dir)?)
}

#[instrument(level = "debug", skip(settings))]
fn cmd_build(settings: &Settings, dir: &Path, pretty: bool) -> CliResult<()> {
    let tree = build_area(settings, dir)?;
    let chart = presentation::transform(&tree)?;
    let rendered = if pretty || settings.pretty_json {
        chart.to_json_pretty()
    } else {
        chart.to_json()
    };
    let json = rendered.map_err(|source| ApplicationError::Serialization {
        code: tree.root_skill().code.clone(),
        source,
    })?;
    output::info(&json);
    Ok(())
}

#[instrument(level = "debug", skip(settings))]
fn cmd_tree(settings: &Settings, dir: &Path) -> CliResult<()> {
    let tree = build_area(settings, dir)?;
    output::info(&tree.to_tree_string());
    Ok(())
}

// ============================================================
// Persisted state
// ============================================================

fn cmd_mappings(settings: &Settings) -> CliResult<()> {
    let snapshot = persisted_snapshot(settings)?;
    if snapshot.is_empty() {
        output::warning("no identity mappings persisted yet");
        return Ok(());
    }
    for (code, id) in snapshot.iter().sorted() {
        output::info(&format!("{id}  {code}"));
    }
    Ok(())
}

fn cmd_revision(settings: &Settings) -> CliResult<()> {
    let revision = match existing_store(settings)? {
        Some(store) => store.load_revision()?,
        None => None,
    };
    match revision {
        Some(revision) => output::info(&revision),
        None => output::warning("no revision recorded yet"),
    }
    Ok(())
}

fn progress_of(settings: &Settings, user: &str) -> CliResult<Vec<ProgressEntry>> {
    match existing_store(settings)? {
        Some(store) => Ok(ProgressService::new(store.clone(), store).show(user)?),
        None => Ok(Vec::new()),
    }
}

fn cmd_progress_show(settings: &Settings, user: &str) -> CliResult<()> {
    let entries = progress_of(settings, user)?;
    if entries.is_empty() {
        output::warning(&format!("no progress recorded for {user}"));
        return Ok(());
    }
    output::header(&format!("Progress of {user}"));
    for entry in entries {
        let code = entry.code.as_deref().unwrap_or("<removed>");
        output::detail(&format!(
            "{code}  level {}  ({})",
            entry.skill.level, entry.skill.skill_id
        ));
    }
    Ok(())
}

fn cmd_progress_set(settings: Settings, user: &str, skill: Uuid, level: u32) -> CliResult<()> {
    let container = ServiceContainer::new(settings)?;
    container.progress_service().record(user, skill, level)?;
    output::success(&format!("{user}: {skill} at level {level}"));
    Ok(())
}

// ============================================================
// Config
// ============================================================

fn cmd_config_show(settings: &Settings) -> CliResult<()> {
    output::info(&settings.to_toml()?);
    Ok(())
}

fn cmd_config_init(settings: &Settings, global: bool) -> CliResult<()> {
    let path: PathBuf = if global {
        global_config_path().ok_or_else(|| {
            CliError::Usage("cannot determine global config directory".to_string())
        })?
    } else {
        local_config_path(&settings.skills_dir)
    };

    if path.exists() {
        return Err(CliError::Usage(format!(
            "config already exists: {}",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_path_context("create config directory", parent)?;
    }
    std::fs::write(&path, Settings::template()).with_path_context("write config", &path)?;
    output::action("Created", &path.display());
    Ok(())
}

fn cmd_config_path(settings: &Settings) -> CliResult<()> {
    match global_config_path() {
        Some(path) => {
            let marker = if path.exists() { "" } else { " (not found)" };
            output::info(&format!("global: {}{marker}", path.display()));
        }
        None => output::info("global: <unavailable>"),
    }
    let local = local_config_path(&settings.skills_dir);
    let marker = if local.exists() { "" } else { " (not found)" };
    output::info(&format!("local:  {}{marker}", local.display()));
    Ok(())
}
