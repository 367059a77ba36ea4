//! Tests for TreeService
//!
//! Every mutation is one transaction against a NodeStore: either the whole
//! new row set is committed, or the store is left exactly as it was.

use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;

use nestview::application::services::TreeService;
use nestview::application::{
    ApplicationError, NodeResponse, RenderContext, ResponseStatus, TreeScope,
};
use nestview::config::{Settings, TreeOptions};
use nestview::domain::{Direction, DomainError, Node, NodeAttributes, NodeDraft, NodeFlags};
use nestview::infrastructure::di::ServiceContainer;
use nestview::infrastructure::{JsonFileStore, MemoryStore, NodeStore, Row};
use nestview::util::testing;

fn settings_with(tree: TreeOptions) -> Settings {
    Settings {
        tree,
        ..Settings::default()
    }
}

fn service_with(settings: Settings) -> (Arc<MemoryStore>, TreeService) {
    testing::init_test_setup();
    let store = Arc::new(MemoryStore::default());
    let service = TreeService::new(store.clone(), Arc::new(settings));
    (store, service)
}

/// root(1) -> [a(2), b(3)]
fn root_with_two_leaves() -> (Arc<MemoryStore>, TreeService) {
    let (store, service) = service_with(Settings::default());
    service.create_root(NodeDraft::new("root")).unwrap();
    service.create(1, NodeDraft::new("a")).unwrap();
    service.create(1, NodeDraft::new("b")).unwrap();
    (store, service)
}

fn coords(service: &TreeService, key: i64) -> (i64, i64, i64, u32) {
    let n: Node = service.find(key).unwrap();
    (n.root, n.lft, n.rgt, n.depth)
}

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

// ============================================================
// Create
// ============================================================

#[test]
fn given_root_when_creating_children_then_appended_as_last_child() {
    let (_, service) = root_with_two_leaves();

    assert_eq!(coords(&service, 1), (1, 1, 6, 0));
    assert_eq!(coords(&service, 2), (1, 2, 3, 1));
    assert_eq!(coords(&service, 3), (1, 4, 5, 1));
}

#[test]
fn given_unsaved_parent_when_creating_then_invalid_and_store_untouched() {
    let (store, service) = root_with_two_leaves();
    let before = store.fetch().unwrap();

    let err = service.create(99, NodeDraft::new("orphan")).unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::InvalidOperation { .. })
    ));
    assert_eq!(store.fetch().unwrap(), before);
}

#[test]
fn given_new_roots_disabled_when_creating_root_then_invalid() {
    let (store, service) = service_with(settings_with(TreeOptions {
        allow_new_roots: false,
        ..TreeOptions::default()
    }));
    assert!(service.create_root(NodeDraft::new("r")).is_err());
    assert!(store.fetch().unwrap().is_empty());
}

#[test]
fn given_leaf_only_node_when_creating_child_then_invalid() {
    let (_, service) = service_with(Settings::default());
    service.create_root(NodeDraft::new("root")).unwrap();
    service
        .create(
            1,
            NodeDraft::new("leaf").with_flags(NodeFlags {
                child_allowed: Some(false),
                ..NodeFlags::default()
            }),
        )
        .unwrap();

    let err = service.create(2, NodeDraft::new("x")).unwrap_err();
    assert_eq!(err.kind(), "invalid_operation");
}

// ============================================================
// Move
// ============================================================

#[test]
fn given_last_sibling_when_moving_up_then_swaps_with_previous() {
    let (_, service) = root_with_two_leaves();

    let outcome = service.move_node(3, Direction::Up).unwrap();

    assert_eq!(outcome.node.lft, 2);
    assert_eq!(coords(&service, 3), (1, 2, 3, 1));
    assert_eq!(coords(&service, 2), (1, 4, 5, 1));
    assert_eq!(coords(&service, 1), (1, 1, 6, 0));
    assert_eq!(outcome.affected.len(), 2);
}

#[test]
fn given_only_child_when_moving_up_then_boundary_and_store_untouched() {
    let (store, service) = service_with(Settings::default());
    service.create_root(NodeDraft::new("root")).unwrap();
    service.create(1, NodeDraft::new("only")).unwrap();
    let before = store.fetch().unwrap();

    let err = service.move_node(2, Direction::Up).unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::Boundary {
            key: 2,
            direction: Direction::Up
        })
    ));
    assert_eq!(store.fetch().unwrap(), before);
}

#[test]
fn given_second_sibling_when_moving_right_then_left_then_back_in_place() {
    let (_, service) = root_with_two_leaves();

    service.move_node(3, Direction::Right).unwrap();
    assert_eq!(coords(&service, 2), (1, 2, 5, 1));
    assert_eq!(coords(&service, 3), (1, 3, 4, 2));

    service.move_node(3, Direction::Left).unwrap();
    assert_eq!(coords(&service, 2), (1, 2, 3, 1));
    assert_eq!(coords(&service, 3), (1, 4, 5, 1));
}

#[test]
fn given_depth_one_node_when_moving_left_then_becomes_root() {
    let (_, service) = root_with_two_leaves();

    service.move_node(2, Direction::Left).unwrap();

    assert_eq!(coords(&service, 2), (2, 1, 2, 0));
    assert_eq!(coords(&service, 1), (1, 1, 4, 0));
    assert_eq!(coords(&service, 3), (1, 2, 3, 1));
    let roots: Vec<_> = service
        .nodes(&TreeScope::All)
        .unwrap()
        .into_iter()
        .filter(Node::is_root)
        .map(|n| n.key)
        .collect();
    assert_eq!(roots, vec![1, 2]);
}

#[test]
fn given_subtree_when_moving_down_then_descendants_follow() {
    let (_, service) = root_with_two_leaves();
    service.create(2, NodeDraft::new("a1")).unwrap();

    service.move_node(2, Direction::Down).unwrap();

    assert_eq!(coords(&service, 3), (1, 2, 3, 1));
    assert_eq!(coords(&service, 2), (1, 4, 7, 1));
    assert_eq!(coords(&service, 4), (1, 5, 6, 2));
}

#[test]
fn given_movable_flag_off_when_moving_then_invalid_operation() {
    let (_, service) = root_with_two_leaves();
    let attributes = NodeAttributes {
        flags: NodeFlags {
            movable_d: Some(false),
            ..NodeFlags::default()
        },
        ..NodeAttributes::default()
    };
    service.save(2, attributes).unwrap();

    let err = service.move_node(2, Direction::Down).unwrap_err();
    assert_eq!(err.kind(), "invalid_operation");
}

// ============================================================
// Remove / restore
// ============================================================

#[test]
fn given_soft_delete_when_removing_then_coordinates_unchanged() {
    let (_, service) = root_with_two_leaves();
    let before = coords(&service, 2);

    let outcome = service.remove(2).unwrap();

    assert!(!outcome.node.active);
    assert!(outcome.removed.is_empty());
    assert_eq!(coords(&service, 2), before);
    assert_eq!(coords(&service, 1), (1, 1, 6, 0));

    let rendered = service
        .render(&TreeScope::All, &RenderContext::default())
        .unwrap();
    assert!(rendered.view(2).is_none());
    assert_eq!(rendered.stats.skipped, 1);
}

#[test]
fn given_soft_deleted_node_when_restoring_then_active_again() {
    let (_, service) = root_with_two_leaves();
    service.remove(2).unwrap();

    assert!(service.remove(2).is_err());
    let outcome = service.restore(2).unwrap();

    assert!(outcome.node.active);
    assert!(service.find(2).unwrap().active);
    assert!(service.restore(2).is_err());
}

#[test]
fn given_soft_deleted_first_child_when_moving_second_then_refused_and_store_untouched() {
    let (store, service) = root_with_two_leaves();
    service.remove(2).unwrap();
    let before = store.fetch().unwrap();

    let rendered = service
        .render(&TreeScope::All, &RenderContext::default())
        .unwrap();
    let b = rendered.view(3).unwrap();
    assert!(!b.movable_u);
    assert!(!b.movable_r);

    for direction in [Direction::Up, Direction::Right] {
        let err = service.move_node(3, direction).unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::Boundary { key: 3, .. })
        ));
    }
    assert_eq!(store.fetch().unwrap(), before);
    assert!(service.find(3).unwrap().active);
}

#[test]
fn given_soft_deleted_node_when_creating_child_then_invalid() {
    let (store, service) = root_with_two_leaves();
    service.remove(2).unwrap();
    let before = store.fetch().unwrap();

    let err = service.create(2, NodeDraft::new("ghost")).unwrap_err();

    assert_eq!(err.kind(), "invalid_operation");
    assert_eq!(store.fetch().unwrap(), before);
}

#[test]
fn given_hard_delete_when_removing_then_gap_closed() {
    let (store, service) = service_with(settings_with(TreeOptions {
        soft_delete: false,
        ..TreeOptions::default()
    }));
    service.create_root(NodeDraft::new("root")).unwrap();
    service.create(1, NodeDraft::new("a")).unwrap();
    service.create(1, NodeDraft::new("b")).unwrap();

    let outcome = service.remove(2).unwrap();

    assert_eq!(outcome.removed, vec![2]);
    assert_eq!(store.fetch().unwrap().len(), 2);
    assert_eq!(coords(&service, 1), (1, 1, 4, 0));
    assert_eq!(coords(&service, 3), (1, 2, 3, 1));
}

#[test]
fn given_parent_without_removable_all_when_removing_then_invalid() {
    let (_, service) = root_with_two_leaves();
    service.create(2, NodeDraft::new("a1")).unwrap();

    let err = service.remove(2).unwrap_err();
    assert_eq!(err.kind(), "invalid_operation");

    let attributes = NodeAttributes {
        flags: NodeFlags {
            removable_all: Some(true),
            ..NodeFlags::default()
        },
        ..NodeAttributes::default()
    };
    service.save(2, attributes).unwrap();
    let outcome = service.remove(2).unwrap();
    assert_eq!(outcome.affected.len(), 2);
    assert!(!service.find(4).unwrap().active);
}

// ============================================================
// Save
// ============================================================

#[test]
fn given_attributes_when_saving_then_only_attributes_change() {
    let (_, service) = root_with_two_leaves();
    let before = coords(&service, 2);

    let attributes = NodeAttributes {
        name: Some("  renamed  ".into()),
        icon: Some(Some("fas fa-star".into())),
        ..NodeAttributes::default()
    };
    service.save(2, attributes).unwrap();

    let node = service.find(2).unwrap();
    assert_eq!(node.name, "renamed");
    assert_eq!(node.icon.as_deref(), Some("fas fa-star"));
    assert_eq!(coords(&service, 2), before);
}

#[test]
fn given_readonly_node_when_saving_or_moving_then_refused_until_unlocked() {
    let (_, service) = root_with_two_leaves();
    let lock = NodeAttributes {
        flags: NodeFlags {
            readonly: Some(true),
            ..NodeFlags::default()
        },
        ..NodeAttributes::default()
    };
    service.save(3, lock).unwrap();

    assert!(service.move_node(3, Direction::Up).is_err());
    assert!(service
        .save(
            3,
            NodeAttributes {
                name: Some("x".into()),
                ..NodeAttributes::default()
            }
        )
        .is_err());

    let unlock = NodeAttributes {
        flags: NodeFlags {
            readonly: Some(false),
            ..NodeFlags::default()
        },
        ..NodeAttributes::default()
    };
    service.save(3, unlock).unwrap();
    assert!(service.move_node(3, Direction::Up).is_ok());
}

#[test]
fn given_readonly_node_when_unlocking_and_renaming_at_once_then_refused() {
    let (store, service) = service_with(Settings::default());
    service.create_root(NodeDraft::new("root")).unwrap();
    service
        .create(
            1,
            NodeDraft::new("locked").with_flags(NodeFlags {
                readonly: Some(true),
                ..NodeFlags::default()
            }),
        )
        .unwrap();
    let before = store.fetch().unwrap();

    let err = service
        .save(
            2,
            NodeAttributes {
                name: Some("renamed".into()),
                flags: NodeFlags {
                    readonly: Some(false),
                    ..NodeFlags::default()
                },
                ..NodeAttributes::default()
            },
        )
        .unwrap_err();

    assert_eq!(err.kind(), "invalid_operation");
    assert_eq!(store.fetch().unwrap(), before);
    let node = service.find(2).unwrap();
    assert_eq!(node.name, "locked");
    assert!(node.readonly);
}

#[test]
fn given_blank_name_when_saving_then_invalid() {
    let (_, service) = root_with_two_leaves();
    let attributes = NodeAttributes {
        name: Some("   ".into()),
        ..NodeAttributes::default()
    };
    assert!(service.save(2, attributes).is_err());
    assert_eq!(service.find(2).unwrap().name, "a");
}

// ============================================================
// Store contract
// ============================================================

#[test]
fn given_corrupt_rows_when_mutating_then_corrupt_tree_and_nothing_written() {
    let rows = vec![
        row(json!({"id": 1, "root": 1, "lft": 1, "rgt": 4, "lvl": 0, "name": "r"})),
        row(json!({"id": 2, "root": 1, "lft": 2, "rgt": 5, "lvl": 1, "name": "a"})),
    ];
    let store = Arc::new(MemoryStore::new(rows.clone()));
    let service = TreeService::new(store.clone(), Arc::new(Settings::default()));

    let err = service.create(1, NodeDraft::new("x")).unwrap_err();

    assert_eq!(err.kind(), "corrupt_tree");
    assert_eq!(store.fetch().unwrap(), rows);
}

#[test]
fn given_json_file_store_when_reopened_then_tree_persisted() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("data").join("tree.json");

    {
        let container = ServiceContainer::with_deps(
            Settings::default(),
            Arc::new(JsonFileStore::new(path.clone())),
        );
        container.tree.create_root(NodeDraft::new("root")).unwrap();
        container.tree.create(1, NodeDraft::new("a")).unwrap();
        container.tree.move_node(2, Direction::Left).unwrap();
    }

    let reopened = TreeService::new(
        Arc::new(JsonFileStore::new(path.clone())),
        Arc::new(Settings::default()),
    );
    let nodes = reopened.nodes(&TreeScope::All).unwrap();
    assert_eq!(nodes.len(), 2);
    assert!(nodes.iter().all(Node::is_root));

    let content = std::fs::read_to_string(&path).unwrap();
    let parsed: Value = serde_json::from_str(&content).unwrap();
    assert_eq!(parsed.as_array().map(Vec::len), Some(2));
}

#[test]
fn given_container_from_settings_when_created_then_uses_configured_store() {
    let temp = TempDir::new().unwrap();
    let settings = Settings {
        store: temp.path().join("nodes.json"),
        ..Settings::default()
    };
    let container = ServiceContainer::new(settings);
    container.tree.create_root(NodeDraft::new("r")).unwrap();

    assert!(temp.path().join("nodes.json").exists());
    assert_eq!(container.store.fetch().unwrap().len(), 1);
}

// ============================================================
// Response payloads
// ============================================================

#[test]
fn given_mutation_results_when_building_responses_then_status_and_kind_set() {
    let (_, service) = root_with_two_leaves();

    let ok = NodeResponse::from_result(&service.move_node(3, Direction::Up));
    assert_eq!(ok.status, ResponseStatus::Success);
    assert_eq!(ok.key, Some(3));
    assert_eq!(ok.nodes.len(), 2);

    let err = NodeResponse::from_result(&service.move_node(3, Direction::Up));
    assert!(!err.is_success());
    assert_eq!(err.kind.as_deref(), Some("boundary"));
    assert!(err.nodes.is_empty());
}
