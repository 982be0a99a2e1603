// tests/test_copy_all.rs

mod common;

use common::{Call, MemoryStore};
use s3bulk::{BulkClient, BulkError, CopyAllOptions, CopyPath, FilterOptions, StorageClass};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_copy_into_destination_prefix() {
    let store = Arc::new(MemoryStore::new().with_object("bkt1", "photo.jpg", b"jpeg"));

    let result = BulkClient::new(store.clone())
        .copy_all(
            &CancellationToken::new(),
            &CopyPath::bucket("bkt1"),
            &CopyPath::new("bkt2", "archive"),
            CopyAllOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(result.success_count, 1);
    assert_eq!(store.keys("bkt2"), ["archive/photo.jpg"]);
    assert_eq!(store.object("bkt2", "archive/photo.jpg").unwrap(), "jpeg");
}

#[tokio::test]
async fn test_copy_rebases_keys_under_source_prefix() {
    let store = Arc::new(
        MemoryStore::new()
            .with_object("src", "2024/jan/a.txt", b"a")
            .with_object("src", "2024/feb/b.txt", b"b")
            .with_object("src", "2023/old.txt", b"old"),
    );

    let result = BulkClient::new(store.clone())
        .copy_all(
            &CancellationToken::new(),
            &CopyPath::new("src", "2024/"),
            &CopyPath::new("dst", "backup/2024"),
            CopyAllOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(result.success_count, 2);
    assert_eq!(store.keys("dst"), ["backup/2024/feb/b.txt", "backup/2024/jan/a.txt"]);
}

#[tokio::test]
async fn test_copy_with_empty_destination_prefix_keeps_keys() {
    let store = Arc::new(MemoryStore::new().with_object("src", "2024/jan/a.txt", b"a"));

    BulkClient::new(store.clone())
        .copy_all(
            &CancellationToken::new(),
            &CopyPath::new("src", "2024/"),
            &CopyPath::bucket("dst"),
            CopyAllOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(store.keys("dst"), ["2024/jan/a.txt"]);
}

#[tokio::test]
async fn test_copy_skips_dir_markers_entirely() {
    let store = Arc::new(
        MemoryStore::new()
            .with_dir_marker("src", "folder/")
            .with_object("src", "folder/file.txt", b"data"),
    );

    let result = BulkClient::new(store.clone())
        .copy_all(
            &CancellationToken::new(),
            &CopyPath::bucket("src"),
            &CopyPath::bucket("dst"),
            CopyAllOptions::default(),
        )
        .await
        .unwrap();

    // The marker is neither copied nor counted.
    assert_eq!(result.total(), 1);
    assert_eq!(result.success_count, 1);
    let copied: Vec<String> = store.copies().into_iter().map(|(src, _, _)| src.object_key).collect();
    assert_eq!(copied, ["folder/file.txt"]);
}

#[tokio::test]
async fn test_copy_failure_is_isolated() {
    let store = Arc::new(
        MemoryStore::new()
            .with_object("src", "k1", b"1")
            .with_object("src", "k2", b"2")
            .with_object("src", "k3", b"3")
            .with_object("src", "k4", b"4")
            .failing_on("k3"),
    );

    let result = BulkClient::new(store.clone())
        .with_max_parallel(1)
        .copy_all(
            &CancellationToken::new(),
            &CopyPath::bucket("src"),
            &CopyPath::bucket("dst"),
            CopyAllOptions { batch_size: Some(2), ..Default::default() },
        )
        .await
        .unwrap();

    assert_eq!(result.success_count, 3);
    assert_eq!(result.error_count, 1);
    assert_eq!(result.errors[0].key, "k3");
    assert_eq!(store.keys("dst"), ["k1", "k2", "k4"]);
}

#[tokio::test]
async fn test_copy_filter_uses_source_key() {
    let store = Arc::new(
        MemoryStore::new()
            .with_object("src", "logs/app.log", b"l")
            .with_object("src", "logs/app.log.gz", b"z")
            .with_object("src", "data/app.csv", b"c"),
    );

    BulkClient::new(store.clone())
        .copy_all(
            &CancellationToken::new(),
            &CopyPath::bucket("src"),
            &CopyPath::new("dst", "kept"),
            CopyAllOptions {
                filter: Some(vec![FilterOptions::include("^logs/"), FilterOptions::exclude(r"\.gz$")]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(store.keys("dst"), ["kept/logs/app.log"]);
}

#[tokio::test]
async fn test_copy_storage_class_is_forwarded() {
    let store = Arc::new(MemoryStore::new().with_object("src", "a", b"a"));

    BulkClient::new(store.clone())
        .copy_all(
            &CancellationToken::new(),
            &CopyPath::bucket("src"),
            &CopyPath::bucket("dst"),
            CopyAllOptions { storage_class: Some("STANDARD".into()), ..Default::default() },
        )
        .await
        .unwrap();

    let classes: Vec<_> = store.copies().into_iter().map(|(_, _, class)| class).collect();
    assert_eq!(classes, [Some(StorageClass::Standard)]);
}

#[tokio::test]
async fn test_copy_validation_happens_before_listing() {
    let store = Arc::new(MemoryStore::new().with_object("src", "a", b"a"));
    let client = BulkClient::new(store.clone());
    let token = CancellationToken::new();

    let err = client
        .copy_all(
            &token,
            &CopyPath::bucket("src"),
            &CopyPath::bucket("dst"),
            CopyAllOptions { storage_class: Some("invalid".into()), ..Default::default() },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BulkError::InvalidStorageClass(ref s) if s == "invalid"));

    let err = client
        .copy_all(&token, &CopyPath::bucket(""), &CopyPath::bucket("dst"), CopyAllOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BulkError::InvalidBucketName(_)));

    let err = client
        .copy_all(&token, &CopyPath::bucket("src"), &CopyPath::bucket(""), CopyAllOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BulkError::InvalidBucketName(_)));

    assert!(!store.calls().iter().any(|c| matches!(c, Call::List { .. })));
    assert!(store.calls().is_empty());
}
