//! Domain entities: core data structures

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Deserialize;
use uuid::Uuid;

use crate::domain::identity::IdentityMapping;

/// Raw contents of a skill's YAML definition file.
///
/// `code` may be present in hand-written files but is always replaced by
/// the path-derived code. Unknown keys are ignored.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SkillDefinition {
    #[serde(default)]
    pub code: Option<String>,
    pub name: String,
    #[serde(default, rename = "full-name")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl SkillDefinition {
    /// Parse a YAML document into a definition.
    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }
}

/// One node of a skills tree, either a skill area or a leaf skill.
///
/// Equality and hashing only look at `name`, `description` and `children`,
/// so two skills with the same content compare equal even when their
/// identifiers or codes differ.
#[derive(Debug, Clone)]
pub struct Skill {
    /// Stable identifier, reused across imports of the same code
    pub id: Uuid,
    /// Path-derived key, e.g. `areaA/subareaB/leaf.yaml`
    pub code: String,
    pub name: String,
    pub full_name: Option<String>,
    pub description: Option<String>,
    /// Child identifiers in directory listing order
    pub children: Vec<Uuid>,
}

impl Skill {
    pub fn from_definition(definition: SkillDefinition, id: Uuid, code: String) -> Self {
        Self {
            id,
            code,
            name: definition.name,
            full_name: definition.full_name,
            description: definition.description,
            children: Vec::new(),
        }
    }

    pub fn add_child(&mut self, id: Uuid) {
        self.children.push(id);
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

impl PartialEq for Skill {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.description == other.description
            && self.children == other.children
    }
}

impl Eq for Skill {}

impl Hash for Skill {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.description.hash(state);
        self.children.hash(state);
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

/// A complete skill area: one root plus a flat lookup of every node.
///
/// Built once per run and not mutated afterwards.
#[derive(Debug, Clone)]
pub struct SkillsTree {
    root_skill: Skill,
    skills: HashMap<Uuid, Skill>,
}

impl SkillsTree {
    /// Assemble a tree. The root is registered in the lookup if it is not
    /// there already.
    pub fn new(root_skill: Skill, mut skills: HashMap<Uuid, Skill>) -> Self {
        skills
            .entry(root_skill.id)
            .or_insert_with(|| root_skill.clone());
        Self { root_skill, skills }
    }

    pub fn root_skill(&self) -> &Skill {
        &self.root_skill
    }

    pub fn skills(&self) -> &HashMap<Uuid, Skill> {
        &self.skills
    }

    pub fn get(&self, id: &Uuid) -> Option<&Skill> {
        self.skills.get(id)
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// Depth-first, pre-order walk following each skill's `children` order.
    pub fn iter(&self) -> PreOrderIter<'_> {
        PreOrderIter::new(self)
    }

    /// Number of levels, counting the root as one.
    pub fn depth(&self) -> usize {
        self.calculate_depth(&self.root_skill.id)
    }

    fn calculate_depth(&self, id: &Uuid) -> usize {
        match self.get(id) {
            Some(skill) => {
                1 + skill
                    .children
                    .iter()
                    .map(|child| self.calculate_depth(child))
                    .max()
                    .unwrap_or(0)
            }
            None => 0,
        }
    }

    /// Codes of all skills without children, in traversal order.
    pub fn leaf_codes(&self) -> Vec<String> {
        self.iter()
            .filter(|skill| skill.is_leaf())
            .map(|skill| skill.code.clone())
            .collect()
    }

    /// Child references that point outside the lookup, as `(parent code, child id)`.
    pub fn dangling_children(&self) -> Vec<(String, Uuid)> {
        let mut dangling = Vec::new();
        for skill in self.skills.values() {
            for child in &skill.children {
                if !self.skills.contains_key(child) {
                    dangling.push((skill.code.clone(), *child));
                }
            }
        }
        dangling.sort();
        dangling
    }

    /// `code -> id` association for every node, sorted by code.
    pub fn identity_mappings(&self) -> Vec<IdentityMapping> {
        let mut mappings: Vec<IdentityMapping> = self
            .skills
            .values()
            .map(|skill| IdentityMapping::new(skill.id, skill.code.clone()))
            .collect();
        mappings.sort_by(|a, b| a.code.cmp(&b.code));
        mappings
    }

    /// Compare two trees by content only, ignoring identifiers and codes.
    ///
    /// Children are compared pairwise in order, recursively.
    pub fn same_content(&self, other: &SkillsTree) -> bool {
        self.same_node(&self.root_skill.id, other, &other.root_skill.id)
    }

    fn same_node(&self, id: &Uuid, other: &SkillsTree, other_id: &Uuid) -> bool {
        let (Some(left), Some(right)) = (self.get(id), other.get(other_id)) else {
            return false;
        };
        left.name == right.name
            && left.description == right.description
            && left.children.len() == right.children.len()
            && left
                .children
                .iter()
                .zip(&right.children)
                .all(|(l, r)| self.same_node(l, other, r))
    }
}

/// Pre-order iterator over a [`SkillsTree`]. Dangling child ids are skipped.
pub struct PreOrderIter<'a> {
    tree: &'a SkillsTree,
    stack: Vec<Uuid>,
}

impl<'a> PreOrderIter<'a> {
    fn new(tree: &'a SkillsTree) -> Self {
        Self {
            tree,
            stack: vec![tree.root_skill.id],
        }
    }
}

impl<'a> Iterator for PreOrderIter<'a> {
    type Item = &'a Skill;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(skill) = self.tree.get(&current) {
                // Push children in reverse order for left-to-right traversal
                for child in skill.children.iter().rev() {
                    self.stack.push(*child);
                }
                return Some(skill);
            }
        }
        None
    }
}

/// A user's progress on one skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserSkill {
    pub skill_id: Uuid,
    pub level: u32,
}

impl UserSkill {
    pub fn new(skill_id: Uuid, level: u32) -> Self {
        Self { skill_id, level }
    }
}
