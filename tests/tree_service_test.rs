//! Integration tests for TreeService: export/import, auto-save and restore.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tempfile::TempDir;

use cfgtree::application::services::{CancelFlag, TreeService};
use cfgtree::application::ApplicationError;
use cfgtree::config::Settings;
use cfgtree::domain::{DomainError, ResolveArgs, TreeChange, FORMAT_VERSION};
use cfgtree::infrastructure::di::ServiceContainer;
use cfgtree::infrastructure::traits::{FileStateStore, FileSystem, RealFileSystem, StateStore};
use cfgtree::util::testing;

fn service_in(dir: &TempDir) -> TreeService {
    testing::init_test_setup();
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let state = Arc::new(FileStateStore::new(
        dir.path().join("state.json"),
        Arc::clone(&fs),
    ));
    TreeService::new(fs, state, "treeState")
}

/// Environment → {Development → {port=3000, host=localhost}, Staging}, version=2
fn populate(svc: &TreeService) {
    let env = svc.add_root_item("Environment").unwrap();
    let dev = svc.add_child_to_item(env, "Development", None).unwrap();
    svc.add_child_to_item(dev, "port", Some("3000".into()))
        .unwrap();
    svc.add_child_to_item(dev, "host", Some("localhost".into()))
        .unwrap();
    svc.add_child_to_item(env, "Staging", None).unwrap();
    let version = svc.add_root_item("version").unwrap();
    svc.set_item_value(version, 2_u32.into()).unwrap();
}

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("write fixture");
    path
}

fn resolve(svc: &TreeService, path: &str) -> Result<String, ApplicationError> {
    svc.resolve(&ResolveArgs { path: path.into() })
}

// ============================================================
// Export
// ============================================================

#[test]
fn given_tree_when_exporting_then_envelope_written() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let svc = service_in(&temp);
    populate(&svc);
    let target = temp.path().join("nested/dir/export.json");

    // Act
    svc.export_to_file(&target, &CancelFlag::new()).unwrap();

    // Assert
    let raw: Value = serde_json::from_str(&std::fs::read_to_string(&target).unwrap()).unwrap();
    assert_eq!(raw["version"], FORMAT_VERSION);
    let exported_at = raw["exportedAt"].as_str().unwrap();
    assert!(exported_at.ends_with('Z'), "not UTC: {exported_at}");
    assert!(exported_at.contains('.'), "no millis: {exported_at}");
    assert_eq!(raw["treeState"][0]["label"], "Environment");
    assert_eq!(raw["treeState"][0]["children"][0]["children"][0]["value"], "3000");
    assert!(raw["treeState"][0]["children"][1].get("children").is_none());
    assert_eq!(raw["treeState"][1]["value"], "2");
}

#[test]
fn given_exported_tree_when_importing_into_other_service_then_identical() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let source = service_in(&temp);
    populate(&source);
    let file = temp.path().join("export.json");
    source.export_to_file(&file, &CancelFlag::new()).unwrap();

    let other_dir = TempDir::new().unwrap();
    let target = service_in(&other_dir);

    // Act
    let count = target.import_from_file(&file, &CancelFlag::new()).unwrap();

    // Assert
    assert_eq!(count, 6);
    assert_eq!(target.snapshot(), source.snapshot());
    assert_eq!(resolve(&target, "environment.development.PORT").unwrap(), "3000");
}

// ============================================================
// Import
// ============================================================

#[test]
fn given_bare_array_when_importing_then_accepted() {
    let temp = TempDir::new().unwrap();
    let svc = service_in(&temp);
    let file = write_file(
        &temp,
        "legacy.json",
        r#"[{"label":"db","children":[{"label":"port","value":5432}]}]"#,
    );

    svc.import_from_file(&file, &CancelFlag::new()).unwrap();

    assert_eq!(resolve(&svc, "db.port").unwrap(), "5432");
}

#[test]
fn given_dotted_label_when_importing_then_invalid_format_and_tree_untouched() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let svc = service_in(&temp);
    populate(&svc);
    let before = svc.snapshot();
    let file = write_file(
        &temp,
        "bad.json",
        r#"{"version":"1.0","exportedAt":"2024-01-01T00:00:00.000Z",
            "treeState":[{"label":"ok","value":"1"},{"label":"a.b","value":"2"}]}"#,
    );

    // Act
    let err = svc.import_from_file(&file, &CancelFlag::new()).unwrap_err();

    // Assert
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::InvalidFormat(_))
    ));
    assert_eq!(svc.snapshot(), before);
}

#[test]
fn given_object_without_tree_state_when_importing_then_invalid_format() {
    let temp = TempDir::new().unwrap();
    let svc = service_in(&temp);
    let file = write_file(&temp, "bad.json", r#"{"version":"1.0"}"#);

    let err = svc.import_from_file(&file, &CancelFlag::new()).unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::InvalidFormat(_))
    ));
}

#[test]
fn given_object_value_when_importing_then_invalid_format() {
    let temp = TempDir::new().unwrap();
    let svc = service_in(&temp);
    let file = write_file(&temp, "bad.json", r#"[{"label":"a","value":{"x":1}}]"#);

    let err = svc.import_from_file(&file, &CancelFlag::new()).unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::InvalidFormat(_))
    ));
}

#[test]
fn given_missing_file_when_importing_then_operation_failed() {
    let temp = TempDir::new().unwrap();
    let svc = service_in(&temp);

    let err = svc
        .import_from_file(&temp.path().join("nope.json"), &CancelFlag::new())
        .unwrap_err();

    assert!(matches!(err, ApplicationError::OperationFailed { .. }));
}

#[test]
fn given_cancelled_flag_when_importing_then_tree_untouched() {
    let temp = TempDir::new().unwrap();
    let svc = service_in(&temp);
    populate(&svc);
    let before = svc.snapshot();
    let file = write_file(&temp, "other.json", r#"[{"label":"x","value":"1"}]"#);
    let cancel = CancelFlag::new();
    cancel.cancel();

    let err = svc.import_from_file(&file, &cancel).unwrap_err();

    assert!(matches!(err, ApplicationError::Cancelled("import")));
    assert_eq!(svc.snapshot(), before);
}

#[test]
fn given_subscriber_when_importing_then_single_replaced_event() {
    let temp = TempDir::new().unwrap();
    let svc = service_in(&temp);
    populate(&svc);
    let replaced = Arc::new(AtomicUsize::new(0));
    let other = Arc::new(AtomicUsize::new(0));
    {
        let replaced = Arc::clone(&replaced);
        let other = Arc::clone(&other);
        svc.subscribe(move |change| match change {
            TreeChange::Replaced => {
                replaced.fetch_add(1, Ordering::SeqCst);
            }
            _ => {
                other.fetch_add(1, Ordering::SeqCst);
            }
        });
    }
    let file = write_file(&temp, "in.json", r#"[{"label":"x","value":"1"}]"#);

    svc.import_from_file(&file, &CancelFlag::new()).unwrap();

    assert_eq!(replaced.load(Ordering::SeqCst), 1);
    assert_eq!(other.load(Ordering::SeqCst), 0);
}

// ============================================================
// Auto-save and restore
// ============================================================

#[test]
fn given_mutations_when_reopening_container_then_tree_restored() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let settings = Settings {
        state_file: temp.path().join("state/state.json"),
        ..Settings::default()
    };
    let first = ServiceContainer::new(settings.clone());
    populate(&first.tree);

    // Act
    let second = ServiceContainer::new(settings);

    // Assert
    assert_eq!(second.tree.snapshot(), first.tree.snapshot());
    assert_eq!(resolve(&second.tree, "version").unwrap(), "2");
}

#[test]
fn given_state_file_when_mutating_then_tree_stored_under_state_key() {
    let temp = TempDir::new().unwrap();
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let state = Arc::new(FileStateStore::new(
        temp.path().join("state.json"),
        Arc::clone(&fs),
    ));
    let svc = TreeService::new(fs, Arc::clone(&state) as Arc<dyn StateStore>, "custom");

    svc.add_root_item("a").unwrap();

    assert_eq!(state.get("custom").unwrap().as_deref(), Some(r#"[{"label":"a"}]"#));
    assert_eq!(state.get("treeState").unwrap(), None);
}

#[test]
fn given_clear_when_reopening_then_tree_empty() {
    let temp = TempDir::new().unwrap();
    let settings = Settings {
        state_file: temp.path().join("state.json"),
        ..Settings::default()
    };
    let first = ServiceContainer::new(settings.clone());
    populate(&first.tree);
    first.tree.clear().unwrap();

    let second = ServiceContainer::new(settings);

    assert!(second.tree.snapshot().is_empty());
}

// ============================================================
// Resolution and commands through the service
// ============================================================

#[test]
fn given_parent_path_when_resolving_then_not_a_leaf() {
    let temp = TempDir::new().unwrap();
    let svc = service_in(&temp);
    populate(&svc);

    let err = resolve(&svc, "Environment.Development").unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::NotALeaf(_))
    ));
}

#[test]
fn given_parent_when_setting_value_then_has_children_and_tree_unchanged() {
    let temp = TempDir::new().unwrap();
    let svc = service_in(&temp);
    populate(&svc);
    let before = svc.snapshot();
    let dev = svc.locate("Environment.Development").unwrap();

    let err = svc.set_item_value(dev, "x".into()).unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::HasChildren { count: 2, .. })
    ));
    assert_eq!(svc.snapshot(), before);
}

#[test]
fn given_tree_when_generating_commands_then_one_per_leaf_in_order() {
    let temp = TempDir::new().unwrap();
    let svc = service_in(&temp);
    populate(&svc);

    let commands = svc.generate_commands();

    let ids: Vec<&str> = commands.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(
        ids,
        [
            "Environment.Development.port",
            "Environment.Development.host",
            "version"
        ]
    );
    let json = serde_json::to_value(&commands[0]).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "id": "Environment.Development.port",
            "type": "command",
            "command": "cfgtree.resolve",
            "args": {"path": "Environment.Development.port"}
        })
    );
}

#[test]
fn given_removed_item_when_resolving_then_path_not_found() {
    let temp = TempDir::new().unwrap();
    let svc = service_in(&temp);
    populate(&svc);
    let env = svc.locate("environment").unwrap();

    assert!(svc.remove_item(env).unwrap());

    assert!(matches!(
        resolve(&svc, "Environment.Development.port").unwrap_err(),
        ApplicationError::Domain(DomainError::PathNotFound { .. })
    ));
    assert!(matches!(
        svc.rename_item(env, "x").unwrap_err(),
        ApplicationError::Domain(DomainError::UnknownNode)
    ));
}
