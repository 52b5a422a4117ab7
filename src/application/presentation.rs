//! Chart-widget projection of a skills tree.
//!
//! The types here only describe what the front-end renders. They are built
//! from a [`SkillsTree`] by [`transform`] and never flow back into the domain.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{Skill, SkillsTree};

pub const CHART_CONTAINER: &str = "#skills-tree";
pub const ROOT_ORIENTATION: &str = "WEST";
pub const CONNECTOR_TYPE: &str = "bCurve";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillsTreeJson {
    pub chart: Chart,
    pub node_structure: NodeStructure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub container: String,
    pub root_orientation: String,
    pub hide_root_node: bool,
    pub connectors: Connectors,
}

impl Default for Chart {
    fn default() -> Self {
        Self {
            container: CHART_CONTAINER.to_string(),
            root_orientation: ROOT_ORIENTATION.to_string(),
            hide_root_node: true,
            connectors: Connectors {
                r#type: CONNECTOR_TYPE.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connectors {
    pub r#type: String,
}

/// One rendered node. Unset optional fields are left out of the JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStructure {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub text: Option<NodeText>,
    #[serde(rename = "innerHTML", skip_serializing_if = "Option::is_none", default)]
    pub inner_html: Option<String>,
    #[serde(rename = "HTMLclass", skip_serializing_if = "Option::is_none", default)]
    pub html_class: Option<String>,
    #[serde(rename = "HTMLid", skip_serializing_if = "Option::is_none", default)]
    pub html_id: Option<String>,
    #[serde(default)]
    pub children: Vec<NodeStructure>,
}

impl NodeStructure {
    /// Number of nodes in this subtree, including itself.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(NodeStructure::count).sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeText {
    pub name: String,
}

impl SkillsTreeJson {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Project `tree` into the chart structure.
///
/// The root carries only its name; every descendant carries its identifier
/// as `HTMLid` and a clickable label as `innerHTML`, in the same order as
/// the skills' `children`. A child id missing from the lookup is an error.
#[instrument(level = "debug", skip(tree), fields(root = %tree.root_skill().code))]
pub fn transform(tree: &SkillsTree) -> ApplicationResult<SkillsTreeJson> {
    let root = tree.root_skill();
    let mut node_structure = NodeStructure {
        text: Some(NodeText {
            name: root.name.clone(),
        }),
        ..NodeStructure::default()
    };
    node_structure.children = child_nodes(root, tree)?;

    Ok(SkillsTreeJson {
        chart: Chart::default(),
        node_structure,
    })
}

/// Project `tree` and serialize it to a compact JSON string.
pub fn transform_to_string(tree: &SkillsTree) -> ApplicationResult<String> {
    let json = transform(tree)?
        .to_json()
        .map_err(|source| ApplicationError::Serialization {
            code: tree.root_skill().code.clone(),
            source,
        })?;
    debug!("skills tree is transformed to json: {}", json);
    Ok(json)
}

fn child_nodes(parent: &Skill, tree: &SkillsTree) -> ApplicationResult<Vec<NodeStructure>> {
    parent
        .children
        .iter()
        .map(|id| {
            let skill = tree.get(id).ok_or_else(|| ApplicationError::DanglingChild {
                parent: parent.code.clone(),
                child: *id,
            })?;
            Ok(NodeStructure {
                html_id: Some(skill.id.to_string()),
                inner_html: Some(skill_label(skill)),
                children: child_nodes(skill, tree)?,
                ..NodeStructure::default()
            })
        })
        .collect()
}

/// Clickable label of a node. The name is HTML-escaped, so `&`, `<`, `>`,
/// `"` and `'` appear as entities in the published markup.
fn skill_label(skill: &Skill) -> String {
    format!(
        "<div onclick='obtainSkill(\"{}\", 1)'>{}</div>",
        skill.id,
        escape_html(&skill.name)
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use uuid::Uuid;

    use crate::domain::SkillDefinition;

    fn skill(name: &str, code: &str) -> Skill {
        let definition = SkillDefinition {
            code: None,
            name: name.to_string(),
            full_name: None,
            description: None,
        };
        Skill::from_definition(definition, Uuid::new_v4(), code.to_string())
    }

    #[test]
    fn given_root_only_when_transforming_then_emits_chart_and_name() {
        let tree = SkillsTree::new(skill("Area", "area/area.yaml"), HashMap::new());

        let json = transform_to_string(&tree).unwrap();

        assert_eq!(
            json,
            r##"{"chart":{"container":"#skills-tree","rootOrientation":"WEST","hideRootNode":true,"connectors":{"type":"bCurve"}},"nodeStructure":{"text":{"name":"Area"},"children":[]}}"##
        );
    }

    #[test]
    fn given_child_when_transforming_then_label_embeds_identifier() {
        let mut root = skill("Area", "area/area.yaml");
        let leaf = skill("Leaf", "area/leaf.yaml");
        root.add_child(leaf.id);
        let leaf_id = leaf.id;
        let tree = SkillsTree::new(root, HashMap::from([(leaf.id, leaf)]));

        let json = transform(&tree).unwrap();

        let child = &json.node_structure.children[0];
        assert_eq!(child.html_id, Some(leaf_id.to_string()));
        assert_eq!(
            child.inner_html.as_deref(),
            Some(format!("<div onclick='obtainSkill(\"{leaf_id}\", 1)'>Leaf</div>").as_str())
        );
        assert!(child.text.is_none());
        assert!(child.html_class.is_none());
    }

    #[test]
    fn given_markup_in_name_when_transforming_then_escapes_label() {
        let mut root = skill("Area", "area/area.yaml");
        let leaf = skill("C<T> & 'traits'", "area/leaf.yaml");
        root.add_child(leaf.id);
        let tree = SkillsTree::new(root, HashMap::from([(leaf.id, leaf)]));

        let json = transform(&tree).unwrap();

        let label = json.node_structure.children[0].inner_html.clone().unwrap();
        assert!(label.ends_with(">C&lt;T&gt; &amp; &#39;traits&#39;</div>"));
    }

    #[test]
    fn given_dangling_child_when_transforming_then_errors() {
        let mut root = skill("Area", "area/area.yaml");
        root.add_child(Uuid::new_v4());
        let tree = SkillsTree::new(root, HashMap::new());

        let result = transform(&tree);

        assert!(matches!(result, Err(ApplicationError::DanglingChild { .. })));
    }
}
