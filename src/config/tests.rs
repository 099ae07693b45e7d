use super::*;
use serial_test::serial;
use tempfile::TempDir;

#[test]
#[serial]
fn load_without_file_uses_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let config = Config::load(temp_dir.path()).expect("load should succeed");

    assert_eq!(config.knowledge_base, "knowledge-base");
    assert_eq!(config.palette, "linkedin");
    assert_eq!(config.openai.embedding_model, "text-embedding-3-small");
    assert_eq!(config.openai.chat_model, "gpt-4o-mini");
    assert_eq!(config.splitter.chunk_size, 1000);
    assert_eq!(config.splitter.chunk_overlap, 200);
    assert_eq!(config.retrieval.top_k, 25);
    assert_eq!(config.base_dir, temp_dir.path());
}

#[test]
#[serial]
fn save_and_reload_round_trip() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let mut config = Config::load(temp_dir.path()).expect("load should succeed");
    config.palette = "career".to_string();
    config.retrieval.top_k = 10;
    config.openai.temperature = 0.2;
    config.save().expect("save should succeed");

    let reloaded = Config::load(temp_dir.path()).expect("reload should succeed");
    assert_eq!(reloaded.palette, "career");
    assert_eq!(reloaded.retrieval.top_k, 10);
    assert!((reloaded.openai.temperature - 0.2).abs() < f32::EPSILON);
}

#[test]
#[serial]
fn api_key_comes_from_environment() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    // SAFETY: guarded by #[serial]; no other thread touches the environment
    unsafe { std::env::set_var("OPENAI_API_KEY", "sk-test-123") };
    let config = Config::load(temp_dir.path()).expect("load should succeed");
    assert_eq!(config.api_key, "sk-test-123");

    // SAFETY: guarded by #[serial]; no other thread touches the environment
    unsafe { std::env::remove_var("OPENAI_API_KEY") };
    let config = Config::load(temp_dir.path()).expect("load should succeed");
    assert_eq!(config.api_key, API_KEY_PLACEHOLDER);
}

#[test]
#[serial]
fn api_key_is_never_persisted() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    // SAFETY: guarded by #[serial]; no other thread touches the environment
    unsafe { std::env::set_var("OPENAI_API_KEY", "sk-secret") };
    let config = Config::load(temp_dir.path()).expect("load should succeed");
    config.save().expect("save should succeed");
    // SAFETY: guarded by #[serial]; no other thread touches the environment
    unsafe { std::env::remove_var("OPENAI_API_KEY") };

    let content = std::fs::read_to_string(config.config_file_path())
        .expect("config file should exist");
    assert!(!content.contains("sk-secret"));
}

#[test]
fn overlap_must_be_smaller_than_chunk_size() {
    let config = Config {
        splitter: crate::chunker::SplitterConfig {
            chunk_size: 100,
            chunk_overlap: 100,
        },
        ..Config::default()
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigError::ChunkOverlapTooLarge(100, 100))
    ));
}

#[test]
fn unknown_palette_is_rejected() {
    let config = Config {
        palette: "rainbow".to_string(),
        ..Config::default()
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigError::UnknownPalette(_))
    ));
}

#[test]
fn temperature_bounds_are_enforced() {
    let mut config = Config::default();
    config.openai.temperature = 2.5;

    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidTemperature(_))
    ));
}

#[test]
fn invalid_base_url_is_rejected() {
    let mut config = Config::default();
    config.openai.base_url = "not a url".to_string();

    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidBaseUrl(_))
    ));
}

#[test]
fn zero_top_k_is_rejected() {
    let mut config = Config::default();
    config.retrieval.top_k = 0;

    assert!(matches!(config.validate(), Err(ConfigError::InvalidTopK(0))));
}
