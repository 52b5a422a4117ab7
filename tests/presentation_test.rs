//! Tests for the chart JSON projection of built trees

use std::path::Path;

use serde_json::Value;
use tempfile::TempDir;

use skilltree::application::presentation::{self, SkillsTreeJson};
use skilltree::domain::{IdentitySnapshot, SkillsTree, TreeBuilder};

fn create_skill_file(root: &Path, relative: &str, name: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, format!("name: \"{name}\"\n")).unwrap();
}

fn build(root: &Path, area: &str) -> SkillsTree {
    TreeBuilder::new(&IdentitySnapshot::default())
        .build_from_directory(&root.join(area))
        .unwrap()
}

fn escaped(name: &str) -> String {
    name.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Walk a node and its descendants, checking each against the skill with the same position.
fn assert_mirrors(tree: &SkillsTree, skill_id: &uuid::Uuid, node: &Value) {
    let skill = tree.get(skill_id).unwrap();
    let children = node["children"].as_array().unwrap();
    assert_eq!(children.len(), skill.children.len(), "{}", skill.code);

    for (child_id, child_node) in skill.children.iter().zip(children) {
        let child = tree.get(child_id).unwrap();
        assert_eq!(child_node["HTMLid"], Value::String(child.id.to_string()));
        let label = child_node["innerHTML"].as_str().unwrap();
        assert!(label.contains(&escaped(&child.name)), "{label}");
        assert!(label.contains(&child.id.to_string()));
        assert!(child_node.get("text").is_none());
        assert_mirrors(tree, child_id, child_node);
    }
}

#[test]
fn given_area_with_leaf_when_transforming_then_json_names_root_and_links_leaf() {
    // Arrange
    let temp = TempDir::new().unwrap();
    create_skill_file(temp.path(), "areaA/areaa.yaml", "Area A");
    create_skill_file(temp.path(), "areaA/leaf1.yaml", "Leaf One");
    let tree = build(temp.path(), "areaA");
    let leaf_id = tree.root_skill().children[0];

    // Act
    let json = presentation::transform_to_string(&tree).unwrap();

    // Assert
    let value: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["nodeStructure"]["text"]["name"], "Area A");
    let children = value["nodeStructure"]["children"].as_array().unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0]["HTMLid"], Value::String(leaf_id.to_string()));
    assert!(children[0]["innerHTML"]
        .as_str()
        .unwrap()
        .contains("Leaf One"));
}

#[test]
fn given_built_tree_when_transforming_then_chart_settings_are_fixed() {
    let temp = TempDir::new().unwrap();
    create_skill_file(temp.path(), "areaA/areaa.yaml", "Area A");
    let tree = build(temp.path(), "areaA");

    let value: Value =
        serde_json::from_str(&presentation::transform_to_string(&tree).unwrap()).unwrap();

    assert_eq!(value["chart"]["container"], "#skills-tree");
    assert_eq!(value["chart"]["rootOrientation"], "WEST");
    assert_eq!(value["chart"]["hideRootNode"], true);
    assert_eq!(value["chart"]["connectors"]["type"], "bCurve");
    assert!(value["nodeStructure"].get("HTMLid").is_none());
    assert!(value["nodeStructure"].get("innerHTML").is_none());
}

#[test]
fn given_nested_tree_when_transforming_then_json_mirrors_structure() {
    // Arrange
    let temp = TempDir::new().unwrap();
    create_skill_file(temp.path(), "lang/lang.yaml", "Languages");
    create_skill_file(temp.path(), "lang/rust/rust.yaml", "Rust");
    create_skill_file(temp.path(), "lang/rust/ownership.yaml", "Ownership");
    create_skill_file(temp.path(), "lang/rust/traits.yaml", "Traits");
    create_skill_file(temp.path(), "lang/go/go.yaml", "Go");
    create_skill_file(temp.path(), "lang/go/channels.yaml", "Channels");
    create_skill_file(temp.path(), "lang/sql.yaml", "SQL");
    create_skill_file(temp.path(), "lang/web/web.yaml", "HTML & <CSS>");
    create_skill_file(temp.path(), "lang/web/quotes.yaml", "'single' and \\\"double\\\"");
    let tree = build(temp.path(), "lang");

    // Act
    let chart = presentation::transform(&tree).unwrap();

    // Assert
    assert_eq!(chart.node_structure.count(), tree.len());
    let value = serde_json::to_value(&chart).unwrap();
    assert_mirrors(&tree, &tree.root_skill().id, &value["nodeStructure"]);
}

#[test]
fn given_published_json_when_parsing_back_then_equals_projection() {
    let temp = TempDir::new().unwrap();
    create_skill_file(temp.path(), "areaA/areaa.yaml", "Area A");
    create_skill_file(temp.path(), "areaA/sub/sub.yaml", "Sub");
    create_skill_file(temp.path(), "areaA/sub/leaf.yaml", "Leaf");
    let tree = build(temp.path(), "areaA");
    let chart = presentation::transform(&tree).unwrap();

    let parsed: SkillsTreeJson = serde_json::from_str(&chart.to_json_pretty().unwrap()).unwrap();

    assert_eq!(parsed, chart);
}
