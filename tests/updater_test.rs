//! Integration tests for the skills update pipeline
//!
//! Uses the in-memory store and a recording publisher so every side effect
//! of a run can be inspected.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use serde_json::Value;
use tempfile::TempDir;

use skilltree::application::services::{SkillsUpdater, UpdateOptions};
use skilltree::application::{ApplicationError, ApplicationResult};
use skilltree::domain::DomainError;
use skilltree::infrastructure::traits::{IdentityStore, Publisher, RevisionStore};
use skilltree::infrastructure::{InMemoryStore, SqliteStore};
use skilltree::util::testing;

#[derive(Default)]
struct RecordingPublisher {
    documents: RefCell<BTreeMap<String, String>>,
}

impl RecordingPublisher {
    fn document(&self, root_code: &str) -> Value {
        let documents = self.documents.borrow();
        serde_json::from_str(&documents[root_code]).unwrap()
    }

    fn count(&self) -> usize {
        self.documents.borrow().len()
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&self, root_code: &str, json: &str) -> ApplicationResult<()> {
        self.documents
            .borrow_mut()
            .insert(root_code.to_string(), json.to_string());
        Ok(())
    }
}

/// Rejects one area, accepts the rest.
struct RejectingPublisher {
    reject: &'static str,
}

impl Publisher for RejectingPublisher {
    fn publish(&self, root_code: &str, _json: &str) -> ApplicationResult<()> {
        if root_code.starts_with(self.reject) {
            return Err(ApplicationError::Publish {
                code: root_code.to_string(),
                message: "remote refused".to_string(),
            });
        }
        Ok(())
    }
}

fn create_skill_file(root: &Path, relative: &str, name: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, format!("name: \"{name}\"\n")).unwrap();
}

fn skills_root() -> TempDir {
    let temp = TempDir::new().unwrap();
    create_skill_file(temp.path(), "areaA/areaa.yaml", "Area A");
    create_skill_file(temp.path(), "areaA/leaf1.yaml", "Leaf One");
    create_skill_file(temp.path(), "areaB/areab.yaml", "Area B");
    create_skill_file(temp.path(), "areaB/sub/sub.yaml", "Sub");
    create_skill_file(temp.path(), "areaB/sub/leaf.yaml", "Leaf");
    temp
}

fn updater(
    store: &Rc<InMemoryStore>,
    publisher: Rc<dyn Publisher>,
    options: UpdateOptions,
) -> SkillsUpdater {
    SkillsUpdater::new(store.clone(), store.clone(), publisher, options)
}

#[test]
fn given_fresh_store_when_running_then_publishes_and_persists_all_mappings() {
    testing::init_test_setup();
    // Arrange
    let temp = skills_root();
    let store = Rc::new(InMemoryStore::new());
    let publisher = Rc::new(RecordingPublisher::default());
    let updater = updater(&store, publisher.clone(), UpdateOptions::default());

    // Act
    let report = updater.run(temp.path(), Some("rev-1")).unwrap();

    // Assert
    assert!(report.is_success());
    let roots: Vec<_> = report.published.iter().map(|p| p.root_code.as_str()).collect();
    assert_eq!(roots, vec!["areaA/areaa.yaml", "areaB/areab.yaml"]);
    assert_eq!(publisher.count(), 2);
    assert_eq!(
        publisher.document("areaA/areaa.yaml")["nodeStructure"]["text"]["name"],
        "Area A"
    );

    let snapshot = store.load_all().unwrap();
    assert_eq!(snapshot.len(), 5);
    assert!(snapshot.get("areaB/sub/leaf.yaml").is_some());
    assert_eq!(store.load_revision().unwrap().as_deref(), Some("rev-1"));
    assert_eq!(report.revision.as_deref(), Some("rev-1"));
}

#[test]
fn given_unchanged_tree_when_running_twice_then_identifiers_are_stable() {
    // Arrange
    let temp = skills_root();
    let store = Rc::new(InMemoryStore::new());
    let first_publisher = Rc::new(RecordingPublisher::default());
    updater(&store, first_publisher.clone(), UpdateOptions::default())
        .run(temp.path(), None)
        .unwrap();
    let saves_after_first = store.save_count();

    // Act
    let second_publisher = Rc::new(RecordingPublisher::default());
    let report = updater(&store, second_publisher.clone(), UpdateOptions::default())
        .run(temp.path(), None)
        .unwrap();

    // Assert: same documents, nothing new to persist
    assert!(report.published.iter().all(|p| p.new_mappings == 0));
    assert_eq!(store.save_count(), saves_after_first);
    assert_eq!(
        first_publisher.documents.borrow().clone(),
        second_publisher.documents.borrow().clone()
    );
}

#[test]
fn given_added_skill_when_rerunning_then_only_new_skill_gets_new_identifier() {
    // Arrange
    let temp = skills_root();
    let store = Rc::new(InMemoryStore::new());
    let publisher = Rc::new(RecordingPublisher::default());
    updater(&store, publisher.clone(), UpdateOptions::default())
        .run(temp.path(), None)
        .unwrap();
    let before = store.load_all().unwrap();

    // Act
    create_skill_file(temp.path(), "areaA/leaf2.yaml", "Leaf Two");
    let report = updater(&store, publisher.clone(), UpdateOptions::default())
        .run(temp.path(), None)
        .unwrap();

    // Assert
    let after = store.load_all().unwrap();
    let area_a = &report.published[0];
    assert_eq!(area_a.root_code, "areaA/areaa.yaml");
    assert_eq!(area_a.new_mappings, 1);
    for (code, id) in before.iter() {
        assert_eq!(after.get(code), Some(*id), "{code} kept its identifier");
    }
    let new_id = after.get("areaA/leaf2.yaml").unwrap();
    assert!(!before.knows_id(&new_id));

    let children = publisher.document("areaA/areaa.yaml")["nodeStructure"]["children"]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(children.len(), 2);
    assert_eq!(children[1]["HTMLid"], Value::String(new_id.to_string()));
}

#[test]
fn given_removed_skill_when_rerunning_then_old_mapping_is_kept() {
    // Arrange
    let temp = skills_root();
    let store = Rc::new(InMemoryStore::new());
    let publisher = Rc::new(RecordingPublisher::default());
    updater(&store, publisher.clone(), UpdateOptions::default())
        .run(temp.path(), None)
        .unwrap();
    let old_id = store.load_all().unwrap().get("areaA/leaf1.yaml").unwrap();

    // Act
    std::fs::remove_file(temp.path().join("areaA/leaf1.yaml")).unwrap();
    updater(&store, publisher.clone(), UpdateOptions::default())
        .run(temp.path(), None)
        .unwrap();

    // Assert
    assert_eq!(
        store.load_all().unwrap().get("areaA/leaf1.yaml"),
        Some(old_id)
    );
    assert!(publisher.document("areaA/areaa.yaml")["nodeStructure"]["children"]
        .as_array()
        .unwrap()
        .is_empty());
}

#[test]
fn given_broken_area_when_isolating_failures_then_others_publish_and_revision_stays() {
    // Arrange
    let temp = skills_root();
    create_skill_file(temp.path(), "broken/leaf.yaml", "No definition");
    let store = Rc::new(InMemoryStore::new());
    store.save_revision("rev-0").unwrap();
    let publisher = Rc::new(RecordingPublisher::default());
    let updater = updater(&store, publisher.clone(), UpdateOptions::default());

    // Act
    let report = updater.run(temp.path(), Some("rev-1")).unwrap();

    // Assert
    assert!(!report.is_success());
    assert_eq!(report.published.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].dir.ends_with("broken"));
    assert_eq!(report.revision, None);
    assert_eq!(store.load_revision().unwrap().as_deref(), Some("rev-0"));
}

#[test]
fn given_broken_area_when_failing_fast_then_run_aborts_before_publishing() {
    // Arrange
    let temp = skills_root();
    create_skill_file(temp.path(), "broken/leaf.yaml", "No definition");
    let store = Rc::new(InMemoryStore::new());
    let publisher = Rc::new(RecordingPublisher::default());
    let options = UpdateOptions {
        fail_fast: true,
        ..UpdateOptions::default()
    };

    // Act
    let result = updater(&store, publisher.clone(), options).run(temp.path(), Some("rev-1"));

    // Assert
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::MissingDefinition(_)))
    ));
    assert_eq!(publisher.count(), 0);
    assert_eq!(store.save_count(), 0);
    assert_eq!(store.load_revision().unwrap(), None);
}

#[test]
fn given_publish_failure_when_running_then_mappings_of_that_area_are_not_saved() {
    // Arrange
    let temp = skills_root();
    let store = Rc::new(InMemoryStore::new());
    let publisher = Rc::new(RejectingPublisher { reject: "areaB" });

    // Act
    let report = updater(&store, publisher, UpdateOptions::default())
        .run(temp.path(), Some("rev-1"))
        .unwrap();

    // Assert
    assert_eq!(report.published.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].dir.ends_with("areaB"));
    let snapshot = store.load_all().unwrap();
    assert!(snapshot.get("areaA/leaf1.yaml").is_some());
    assert!(snapshot.get("areaB/areab.yaml").is_none());
    assert_eq!(store.load_revision().unwrap(), None);
}

#[test]
fn given_missing_skills_root_when_running_then_errors() {
    let temp = TempDir::new().unwrap();
    let store = Rc::new(InMemoryStore::new());
    let publisher = Rc::new(RecordingPublisher::default());

    let result = updater(&store, publisher, UpdateOptions::default())
        .run(&temp.path().join("missing"), None);

    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::FileNotFound(_)))
    ));
}

#[test]
fn given_sqlite_store_when_reopened_then_identifiers_survive_the_process() {
    // Arrange
    let temp = skills_root();
    let db_dir = TempDir::new().unwrap();
    let db_path = db_dir.path().join("skilltree.db");
    let first_publisher = Rc::new(RecordingPublisher::default());
    {
        let store = Rc::new(SqliteStore::open(&db_path).unwrap());
        SkillsUpdater::new(
            store.clone(),
            store,
            first_publisher.clone(),
            UpdateOptions::default(),
        )
        .run(temp.path(), Some("rev-1"))
        .unwrap();
    }

    // Act
    let store = Rc::new(SqliteStore::open(&db_path).unwrap());
    let second_publisher = Rc::new(RecordingPublisher::default());
    let report = SkillsUpdater::new(
        store.clone(),
        store.clone(),
        second_publisher.clone(),
        UpdateOptions::default(),
    )
    .run(temp.path(), Some("rev-2"))
    .unwrap();

    // Assert
    assert!(report.published.iter().all(|p| p.new_mappings == 0));
    assert_eq!(
        first_publisher.documents.borrow().clone(),
        second_publisher.documents.borrow().clone()
    );
    assert_eq!(store.load_revision().unwrap().as_deref(), Some("rev-2"));
}
