mod common;

use planner::error::AppError;
use planner::models::{
    DecodeError, Folder, FolderMetadata, NewFolderRequest, build_folder_tree, decode_json_field,
};
use planner::services::FolderService;

use common::*;

fn folder(id: &str, parent: Option<&str>, name: &str) -> Folder {
    Folder {
        id: id.to_string(),
        user_id: "alice".to_string(),
        parent_id: parent.map(str::to_string),
        name: name.to_string(),
        metadata: None,
        created_at: String::new(),
    }
}

#[test]
fn test_tree_nests_children_sorted_by_name() {
    let folders = vec![
        folder("c", Some("a"), "Week 2"),
        folder("a", None, "Algorithms"),
        folder("b", Some("a"), "Week 1"),
        folder("d", Some("b"), "Slides"),
        folder("e", None, "Databases"),
    ];

    let tree = build_folder_tree(folders, |_| FolderMetadata::default());

    assert_eq!(tree.len(), 2);
    assert_eq!(tree[0].name, "Algorithms");
    assert_eq!(tree[1].name, "Databases");
    let weeks: Vec<&str> = tree[0].children.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(weeks, vec!["Week 1", "Week 2"]);
    assert_eq!(tree[0].children[0].children[0].id, "d");
}

#[test]
fn test_tree_promotes_orphans_and_breaks_cycles() {
    let folders = vec![
        folder("orphan", Some("gone"), "Orphan"),
        folder("x", Some("y"), "X"),
        folder("y", Some("x"), "Y"),
        folder("self", Some("self"), "Self"),
    ];

    let tree = build_folder_tree(folders, |_| FolderMetadata::default());

    let mut seen = Vec::new();
    let mut stack: Vec<_> = tree.iter().collect();
    while let Some(node) = stack.pop() {
        seen.push(node.id.clone());
        stack.extend(node.children.iter());
    }
    seen.sort();
    assert_eq!(seen, vec!["orphan", "self", "x", "y"], "every folder appears exactly once");
}

#[test]
fn test_decode_json_field_leaves_fallback_to_caller() {
    let decoded: Option<FolderMetadata> =
        decode_json_field("metadata", Some(r#"{"color":"teal","pinned":true}"#)).unwrap();
    assert_eq!(
        decoded,
        Some(FolderMetadata {
            color: Some("teal".to_string()),
            pinned: true
        })
    );

    assert!(decode_json_field::<FolderMetadata>("metadata", None).unwrap().is_none());
    assert!(decode_json_field::<FolderMetadata>("metadata", Some("  ")).unwrap().is_none());

    let err: DecodeError = decode_json_field::<FolderMetadata>("metadata", Some("{not json"))
        .expect_err("malformed JSON must surface");
    assert_eq!(err.field, "metadata");
}

#[tokio::test]
async fn test_folder_service_builds_tree_and_defaults_bad_metadata() {
    let pool = test_pool().await;
    let folders = FolderService::new(pool.clone());

    let root = folders
        .create_folder(
            "alice",
            NewFolderRequest {
                name: "Semester 1".to_string(),
                parent_id: None,
                metadata: Some(FolderMetadata {
                    color: Some("red".to_string()),
                    pinned: false,
                }),
            },
        )
        .await
        .unwrap();
    let child = folders
        .create_folder(
            "alice",
            NewFolderRequest {
                name: "Notes".to_string(),
                parent_id: Some(root.id.clone()),
                metadata: None,
            },
        )
        .await
        .unwrap();

    sqlx::query("UPDATE folders SET metadata = '{broken' WHERE id = ?")
        .bind(&child.id)
        .execute(&pool)
        .await
        .unwrap();

    let tree = folders.folder_tree("alice").await.unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].metadata.color.as_deref(), Some("red"));
    assert_eq!(tree[0].children[0].id, child.id);
    assert_eq!(tree[0].children[0].metadata, FolderMetadata::default());

    assert!(folders.folder_tree("bob").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_folder_parent_must_belong_to_caller() {
    let pool = test_pool().await;
    let folders = FolderService::new(pool.clone());

    let alice_root = folders
        .create_folder(
            "alice",
            NewFolderRequest {
                name: "Mine".to_string(),
                parent_id: None,
                metadata: None,
            },
        )
        .await
        .unwrap();

    let err = folders
        .create_folder(
            "bob",
            NewFolderRequest {
                name: "Sneaky".to_string(),
                parent_id: Some(alice_root.id),
                metadata: None,
            },
        )
        .await
        .expect_err("foreign parent");
    assert!(matches!(err, AppError::NotFound));
}
