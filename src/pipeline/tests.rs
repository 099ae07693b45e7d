use super::*;
use tempfile::TempDir;

fn test_config(temp_dir: &TempDir) -> Config {
    let kb_root = temp_dir.path().join("knowledge-base");
    std::fs::create_dir_all(&kb_root).expect("should create kb root");

    Config {
        knowledge_base: kb_root.to_string_lossy().into_owned(),
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    }
}

#[tokio::test]
async fn empty_knowledge_base_builds_an_empty_store() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = test_config(&temp_dir);

    // No provider is contacted when there is nothing to embed
    let report = build_store(&config, true).await.expect("build should succeed");

    assert_eq!(report.documents, 0);
    assert_eq!(report.chunks, 0);
    assert_eq!(report.records, 0);
    assert_eq!(report.dimension, None);

    let store = VectorStore::open(&config.vector_store_path())
        .await
        .expect("should open store");
    assert_eq!(store.count().await.expect("count should succeed"), 0);
}

#[tokio::test]
async fn invalid_splitter_config_aborts_before_any_store_write() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = test_config(&temp_dir);
    let skills = temp_dir.path().join("knowledge-base/skills");
    std::fs::create_dir_all(&skills).expect("should create category");
    std::fs::write(skills.join("langs.md"), "Python, Go").expect("should write file");

    config.splitter.chunk_overlap = config.splitter.chunk_size;

    let result = build_store(&config, true).await;
    assert!(matches!(result, Err(KbError::Configuration(_))));
}

#[tokio::test]
async fn undecodable_file_aborts_the_build() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = test_config(&temp_dir);
    let skills = temp_dir.path().join("knowledge-base/skills");
    std::fs::create_dir_all(&skills).expect("should create category");
    std::fs::write(skills.join("broken.md"), [0xff, 0xfe]).expect("should write file");

    let result = build_store(&config, true).await;
    assert!(matches!(result, Err(KbError::Decoding(_))));
}
