//! Terminal rendering of skills trees.

use termtree::Tree;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::SkillsTree;

pub trait TreeDisplay {
    fn to_tree_string(&self) -> Tree<String>;
}

impl TreeDisplay for SkillsTree {
    #[instrument(level = "debug", skip(self))]
    fn to_tree_string(&self) -> Tree<String> {
        fn build_tree(tree: &SkillsTree, id: &Uuid) -> Tree<String> {
            match tree.get(id) {
                Some(skill) => {
                    let leaves: Vec<_> = skill
                        .children
                        .iter()
                        .map(|child| build_tree(tree, child))
                        .collect();
                    Tree::new(format!("{} [{}]", skill.name, skill.code)).with_leaves(leaves)
                }
                None => Tree::new(format!("<missing {id}>")),
            }
        }

        build_tree(self, &self.root_skill().id)
    }
}
