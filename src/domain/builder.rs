//! Tree builder for scanning skill directories and building skill hierarchies.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, trace};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::domain::entities::{Skill, SkillDefinition, SkillsTree};
use crate::domain::error::DomainError;
use crate::domain::identity::{resolve_with, IdentitySnapshot, Resolution};

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, DomainError>;

const YAML_EXTENSIONS: [&str; 2] = [".yaml", ".yml"];

/// Whether a file name carries a recognized YAML extension.
pub fn is_yaml_file_name(name: &str) -> bool {
    YAML_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Join a code prefix and a path segment, omitting the separator for an empty prefix.
pub fn join_code(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}/{segment}")
    }
}

/// Build outcome for one top-level directory of a skills root.
#[derive(Debug)]
pub struct ForestEntry {
    pub dir: PathBuf,
    pub result: TreeResult<SkillsTree>,
}

/// A skill area waiting for its entries to be processed.
struct Frame {
    dir: PathBuf,
    prefix: String,
    definition: String,
    skill: Skill,
}

/// Constructs skill trees from directories of YAML definitions.
///
/// Identifiers are resolved against a borrowed snapshot of the previous
/// run's mappings; the snapshot is never modified.
pub struct TreeBuilder<'a> {
    snapshot: &'a IdentitySnapshot,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(snapshot: &'a IdentitySnapshot) -> Self {
        Self { snapshot }
    }

    /// Build one tree per top-level directory of `skills_root`.
    ///
    /// Entries named in `ignore` and plain files are skipped. A failure in one
    /// directory is reported in its entry and does not stop the others.
    #[instrument(level = "debug", skip(self, ignore))]
    pub fn build_forest(&self, skills_root: &Path, ignore: &[String]) -> TreeResult<Vec<ForestEntry>> {
        ensure_directory(skills_root)?;

        let mut forest = Vec::new();
        for entry in list_entries(skills_root)? {
            let name = entry_name(&entry)?;
            if ignore.iter().any(|ignored| ignored == &name) {
                trace!("ignoring {}", entry.display());
                continue;
            }
            if !entry.is_dir() {
                trace!("skipping top-level file {}", entry.display());
                continue;
            }
            debug!("parsing base directory for a root skill: {}", name);
            let result = self.build_from_directory(&entry);
            forest.push(ForestEntry { dir: entry, result });
        }
        Ok(forest)
    }

    /// Build the tree rooted at one skill directory.
    ///
    /// Directories are processed from an explicit work stack, so nesting depth
    /// does not grow the call stack. Any error discards the whole tree.
    #[instrument(level = "debug", skip(self))]
    pub fn build_from_directory(&self, directory_path: &Path) -> TreeResult<SkillsTree> {
        ensure_directory(directory_path)?;

        let mut skills = HashMap::new();
        let mut assigned: HashMap<Uuid, String> = HashMap::new();
        let mut stack = Vec::new();

        let root_frame = self.area_frame(directory_path, "", &mut assigned)?;
        let root = self.expand_frame(root_frame, &mut stack, &mut skills, &mut assigned)?;
        while let Some(frame) = stack.pop() {
            let area = self.expand_frame(frame, &mut stack, &mut skills, &mut assigned)?;
            skills.insert(area.id, area);
        }

        debug!("built tree {} with {} skills", root.code, skills.len() + 1);
        Ok(SkillsTree::new(root, skills))
    }

    /// Link the entries of one skill area to its skill and return it.
    ///
    /// Leaves are registered in `skills` directly, sub-areas are queued on
    /// `stack` and registered once they are expanded themselves.
    fn expand_frame(
        &self,
        frame: Frame,
        stack: &mut Vec<Frame>,
        skills: &mut HashMap<Uuid, Skill>,
        assigned: &mut HashMap<Uuid, String>,
    ) -> TreeResult<Skill> {
        let Frame {
            dir,
            prefix,
            definition,
            mut skill,
        } = frame;
        let dir_name = entry_name(&dir)?;
        let child_prefix = join_code(&prefix, &dir_name);

        for entry in list_entries(&dir)? {
            let name = entry_name(&entry)?;
            if name == definition || name.starts_with(&dir_name) {
                continue;
            }

            if entry.is_dir() {
                let child = self.area_frame(&entry, &child_prefix, assigned)?;
                skill.add_child(child.skill.id);
                stack.push(child);
            } else if is_yaml_file_name(&name) {
                let code = format!("{child_prefix}/{name}");
                let leaf = self.parse_skill(&entry, code, assigned)?;
                skill.add_child(leaf.id);
                skills.insert(leaf.id, leaf);
            } else {
                trace!("skipping non-yaml file {}", entry.display());
            }
        }
        Ok(skill)
    }

    /// Parse the definition file of a skill area and resolve its identity.
    fn area_frame(
        &self,
        dir: &Path,
        prefix: &str,
        assigned: &mut HashMap<Uuid, String>,
    ) -> TreeResult<Frame> {
        let dir_name = entry_name(dir)?;
        let definition = find_definition(dir, &dir_name)?;
        let code = format!("{}/{}", join_code(prefix, &dir_name), definition);
        let skill = self.parse_skill(&dir.join(&definition), code, assigned)?;
        Ok(Frame {
            dir: dir.to_path_buf(),
            prefix: prefix.to_string(),
            definition,
            skill,
        })
    }

    fn parse_skill(
        &self,
        path: &Path,
        code: String,
        assigned: &mut HashMap<Uuid, String>,
    ) -> TreeResult<Skill> {
        let content = std::fs::read_to_string(path).map_err(|e| DomainError::Unreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let definition =
            SkillDefinition::parse(&content).map_err(|e| DomainError::InvalidDefinition {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let resolution = resolve_with(&code, self.snapshot, || loop {
            let id = Uuid::new_v4();
            if !assigned.contains_key(&id) {
                break id;
            }
        });
        let id = resolution.id();
        if let Some(first) = assigned.get(&id) {
            return Err(DomainError::DuplicateIdentifier {
                id,
                first: first.clone(),
                second: code,
            });
        }
        match resolution {
            Resolution::Known(_) => trace!("reusing {} for {}", id, code),
            Resolution::Generated(_) => debug!("new skill {} gets {}", code, id),
        }
        assigned.insert(id, code.clone());

        Ok(Skill::from_definition(definition, id, code))
    }
}

fn ensure_directory(path: &Path) -> TreeResult<()> {
    if !path.exists() {
        return Err(DomainError::FileNotFound(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(DomainError::NotADirectory(path.to_path_buf()));
    }
    Ok(())
}

/// Direct entries of `dir`, sorted by file name.
fn list_entries(dir: &Path) -> TreeResult<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| DomainError::Unreadable {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        entries.push(entry.into_path());
    }
    Ok(entries)
}

fn entry_name(path: &Path) -> TreeResult<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| DomainError::Unreadable {
            path: path.to_path_buf(),
            message: "file name is not valid UTF-8".to_string(),
        })
}

/// Locate the definition file of a skill area: a YAML file whose name starts
/// with the lowercase directory name. An exact stem match breaks ties.
fn find_definition(dir: &Path, dir_name: &str) -> TreeResult<String> {
    let lower = dir_name.to_lowercase();
    let mut candidates = Vec::new();
    for entry in list_entries(dir)? {
        let name = entry_name(&entry)?;
        if entry.is_file() && name.starts_with(&lower) && is_yaml_file_name(&name) {
            candidates.push(name);
        }
    }

    match candidates.len() {
        0 => Err(DomainError::MissingDefinition(dir.to_path_buf())),
        1 => Ok(candidates.remove(0)),
        _ => {
            let exact = candidates.iter().position(|name| {
                YAML_EXTENSIONS
                    .iter()
                    .any(|ext| name.strip_suffix(ext) == Some(lower.as_str()))
            });
            match exact {
                Some(idx) => Ok(candidates.remove(idx)),
                None => Err(DomainError::AmbiguousDefinition {
                    dir: dir.to_path_buf(),
                    candidates,
                }),
            }
        }
    }
}
