use super::*;
use crate::metadata::{CategoryPalette, DocMetadata};
use tempfile::TempDir;

fn test_record(id: &str, doc_type: Option<&str>, content: &str) -> EmbeddingRecord {
    let seed: f32 = id.parse().unwrap_or(1.0);
    let vector = (0..5).map(|i| seed.mul_add(0.01, i as f32 * 0.1)).collect();

    EmbeddingRecord {
        id: id.to_string(),
        vector,
        content: content.to_string(),
        doc_type: doc_type.map(str::to_string),
        source_path: format!("kb/{}/file.md", doc_type.unwrap_or("misc")),
        chunk_index: 0,
        created_at: "2024-01-01T00:00:00Z".to_string(),
    }
}

async fn open_test_store() -> (VectorStore, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = VectorStore::open(&temp_dir.path().join("vectors"))
        .await
        .expect("should open store");
    (store, temp_dir)
}

#[test]
fn from_chunk_preserves_metadata() {
    let chunk = Chunk {
        content: "chunk text".to_string(),
        metadata: DocMetadata {
            doc_type: "skills".to_string(),
            source_path: "kb/skills/langs.md".to_string(),
        },
        chunk_index: 3,
    };

    let record = EmbeddingRecord::from_chunk(&chunk, vec![0.1, 0.2]);

    assert_eq!(record.content, "chunk text");
    assert_eq!(record.doc_type.as_deref(), Some("skills"));
    assert_eq!(record.source_path, "kb/skills/langs.md");
    assert_eq!(record.chunk_index, 3);
    assert!(!record.id.is_empty());
}

#[tokio::test]
async fn empty_store_reports_no_embeddings() {
    let (store, _temp_dir) = open_test_store().await;

    let summary = store.describe().await.expect("describe should succeed");
    assert_eq!(summary.count, 0);
    assert_eq!(summary.dimension, None);
    assert_eq!(
        summary.to_string(),
        "No embeddings found in the vector store."
    );

    let snapshot = store
        .fetch_all(&CategoryPalette::linkedin())
        .await
        .expect("fetch_all should succeed");
    assert!(snapshot.is_empty());
    assert!(snapshot.vectors.is_empty());
    assert!(snapshot.texts.is_empty());
    assert!(snapshot.doc_types.is_empty());
    assert!(snapshot.colors.is_empty());
}

#[tokio::test]
async fn insert_and_fetch_all_round_trip() {
    let (mut store, _temp_dir) = open_test_store().await;
    let records = vec![
        test_record("1", Some("skills"), "Python, Go"),
        test_record("2", Some("projects"), "A portfolio project"),
        test_record("3", None, "untyped content"),
    ];

    store.insert(&records).await.expect("insert should succeed");

    let snapshot = store
        .fetch_all(&CategoryPalette::linkedin())
        .await
        .expect("fetch_all should succeed");

    assert_eq!(snapshot.len(), 3);
    let mut texts = snapshot.texts.clone();
    texts.sort();
    assert_eq!(
        texts,
        vec!["A portfolio project", "Python, Go", "untyped content"]
    );

    for (text, (doc_type, color)) in snapshot
        .texts
        .iter()
        .zip(snapshot.doc_types.iter().zip(snapshot.colors.iter()))
    {
        match text.as_str() {
            "Python, Go" => {
                assert_eq!(doc_type, "skills");
                assert_eq!(color, "#ca8a04");
            }
            "A portfolio project" => {
                assert_eq!(doc_type, "projects");
                assert_eq!(color, "#ea580c");
            }
            _ => {
                assert_eq!(doc_type, "unknown");
                assert_eq!(color, "gray");
            }
        }
    }
}

#[tokio::test]
async fn describe_reports_count_and_dimension() {
    let (mut store, _temp_dir) = open_test_store().await;
    store
        .insert(&[test_record("1", Some("skills"), "a")])
        .await
        .expect("insert should succeed");

    let summary = store.describe().await.expect("describe should succeed");
    assert_eq!(summary.count, 1);
    assert_eq!(summary.dimension, Some(5));
    assert_eq!(
        summary.to_string(),
        "There are 1 vectors with 5 dimensions in the vector store"
    );
}

#[tokio::test]
async fn clear_then_insert_is_a_full_replace() {
    let (mut store, _temp_dir) = open_test_store().await;

    store
        .insert(&[
            test_record("1", Some("skills"), "old a"),
            test_record("2", Some("skills"), "old b"),
        ])
        .await
        .expect("first insert should succeed");

    store.clear().await.expect("clear should succeed");
    store
        .insert(&[test_record("3", Some("projects"), "new")])
        .await
        .expect("second insert should succeed");

    assert_eq!(store.count().await.expect("count should succeed"), 1);
    let snapshot = store
        .fetch_all(&CategoryPalette::linkedin())
        .await
        .expect("fetch_all should succeed");
    assert_eq!(snapshot.texts, vec!["new"]);
}

#[tokio::test]
async fn insert_without_clear_appends() {
    let (mut store, _temp_dir) = open_test_store().await;

    store
        .insert(&[test_record("1", Some("skills"), "a")])
        .await
        .expect("first insert should succeed");
    store
        .insert(&[test_record("2", Some("skills"), "b")])
        .await
        .expect("second insert should succeed");

    assert_eq!(store.count().await.expect("count should succeed"), 2);
}

#[tokio::test]
async fn clear_on_empty_store_is_a_no_op() {
    let (mut store, _temp_dir) = open_test_store().await;

    store.clear().await.expect("clear should succeed");
    assert_eq!(store.count().await.expect("count should succeed"), 0);
}

#[tokio::test]
async fn mismatched_dimension_is_a_store_error() {
    let (mut store, _temp_dir) = open_test_store().await;
    store
        .insert(&[test_record("1", Some("skills"), "a")])
        .await
        .expect("insert should succeed");

    let mut wrong = test_record("2", Some("skills"), "b");
    wrong.vector = vec![0.1, 0.2, 0.3];

    let result = store.insert(&[wrong]).await;
    assert!(matches!(result, Err(KbError::Store(_))));
}

#[tokio::test]
async fn search_returns_nearest_records() {
    let (mut store, _temp_dir) = open_test_store().await;

    let mut near = test_record("1", Some("skills"), "near");
    near.vector = vec![1.0, 0.0, 0.0, 0.0, 0.0];
    let mut far = test_record("2", Some("projects"), "far");
    far.vector = vec![0.0, 10.0, 0.0, 0.0, 0.0];

    store
        .insert(&[near, far])
        .await
        .expect("insert should succeed");

    let results = store
        .search(&[1.0, 0.0, 0.0, 0.0, 0.0], 1)
        .await
        .expect("search should succeed");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].content, "near");
    assert_eq!(results[0].doc_type.as_deref(), Some("skills"));
    assert!(results[0].distance < 0.001);
}

#[tokio::test]
async fn search_on_empty_store_returns_nothing() {
    let (store, _temp_dir) = open_test_store().await;

    let results = store
        .search(&[1.0, 0.0, 0.0, 0.0, 0.0], 5)
        .await
        .expect("search should succeed");

    assert!(results.is_empty());
}
