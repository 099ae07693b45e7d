#[cfg(test)]
mod tests;

use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use itertools::Itertools;
use tracing::info;

use crate::chat::run_repl;
use crate::config::{API_KEY_PLACEHOLDER, Config, get_config_dir};
use crate::pipeline::build_store;
use crate::providers::OpenAiClient;
use crate::rag::{ConversationEngine, ConversationLog};
use crate::store::VectorStore;
use crate::viz;

fn load_config() -> Result<Config> {
    let config_dir = get_config_dir()?;
    Config::load(config_dir)
}

/// Build (or extend) the vector store from the knowledge base
#[inline]
pub async fn build(append: bool) -> Result<()> {
    let config = load_config()?;
    info!(
        "Building vector store from knowledge base at {}",
        config.knowledge_base
    );

    let report = build_store(&config, !append)
        .await
        .context("Failed to build the vector store")?;

    println!(
        "Loaded {} documents and split them into {} chunks.",
        report.documents, report.chunks
    );
    match report.dimension {
        Some(dimension) => println!(
            "Stored {} embedding records with {} dimensions.",
            report.records, dimension
        ),
        None => println!("Nothing to embed; the vector store was left empty."),
    }

    Ok(())
}

/// Interactive chat over the knowledge base
#[inline]
pub async fn chat() -> Result<()> {
    let config = load_config()?;
    let store = VectorStore::open(&config.vector_store_path()).await?;

    if store.count().await? == 0 {
        println!("The vector store is empty. Run 'kb-chat build' first.");
        return Ok(());
    }

    let client = OpenAiClient::new(&config)?;
    let engine = ConversationEngine::new(client, store, &config);
    run_repl(&engine).await
}

/// Answer a single question and exit
#[inline]
pub async fn ask(question: &str) -> Result<()> {
    let config = load_config()?;
    let store = VectorStore::open(&config.vector_store_path()).await?;
    let client = OpenAiClient::new(&config)?;
    let engine = ConversationEngine::new(client, store, &config);

    let outcome = engine
        .answer(question, &ConversationLog::new())
        .await
        .context("Failed to answer the question")?;

    info!("Answered with {} context chunks", outcome.sources.len());
    println!("{}", outcome.answer);

    Ok(())
}

/// Report the vector store's contents
#[inline]
pub async fn inspect() -> Result<()> {
    let config = load_config()?;
    let store = VectorStore::open(&config.vector_store_path()).await?;

    let summary = store.describe().await?;
    println!("{summary}");

    if summary.count > 0 {
        let palette = config.category_palette()?;
        let snapshot = store.fetch_all(&palette).await?;

        println!();
        println!("Records per category:");
        for (doc_type, count) in category_counts(&snapshot.doc_types) {
            println!("  {doc_type}: {count}");
        }
    }

    Ok(())
}

/// Count records per category, sorted by category name
pub(crate) fn category_counts(doc_types: &[String]) -> Vec<(String, usize)> {
    doc_types
        .iter()
        .counts()
        .into_iter()
        .map(|(doc_type, count)| (doc_type.clone(), count))
        .sorted()
        .collect()
}

/// Project the stored vectors and write an interactive scatter plot
#[inline]
pub async fn visualize(dims: usize, output: &Path) -> Result<()> {
    let config = load_config()?;
    let palette = config.category_palette()?;
    let store = VectorStore::open(&config.vector_store_path()).await?;

    let snapshot = store.fetch_all(&palette).await?;
    if snapshot.is_empty() {
        println!("No embeddings found in the vector store.");
        return Ok(());
    }

    info!("Projecting {} vectors to {}D", snapshot.len(), dims);
    let coordinates = viz::project(&snapshot.vectors, dims)?;
    let title = format!("{dims}D Vector Store Visualization");
    let figure = viz::render(&coordinates, &snapshot, &title)?;

    figure
        .write_html(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Wrote a {dims}D visualization of {} vectors to {}",
        snapshot.len(),
        output.display()
    );

    Ok(())
}

/// Print the active configuration
#[inline]
pub fn show_config() -> Result<()> {
    let config = load_config()?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("Knowledge base: {}", style(&config.knowledge_base).cyan());
    eprintln!("Palette: {}", style(&config.palette).cyan());

    eprintln!();
    eprintln!("{}", style("OpenAI Settings:").bold().yellow());
    eprintln!("  Base URL: {}", style(&config.openai.base_url).cyan());
    eprintln!(
        "  Embedding model: {}",
        style(&config.openai.embedding_model).cyan()
    );
    eprintln!("  Chat model: {}", style(&config.openai.chat_model).cyan());
    eprintln!(
        "  Temperature: {}",
        style(config.openai.temperature).cyan()
    );
    eprintln!("  Batch size: {}", style(config.openai.batch_size).cyan());
    eprintln!(
        "  Timeout: {}s",
        style(config.openai.timeout_seconds).cyan()
    );
    let key_status = if config.api_key == API_KEY_PLACEHOLDER {
        style("not set (requests will fail with an auth error)").yellow()
    } else {
        style("set from OPENAI_API_KEY").green()
    };
    eprintln!("  API key: {key_status}");

    eprintln!();
    eprintln!("{}", style("Splitter Settings:").bold().yellow());
    eprintln!(
        "  Chunk size: {}",
        style(config.splitter.chunk_size).cyan()
    );
    eprintln!(
        "  Chunk overlap: {}",
        style(config.splitter.chunk_overlap).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Retrieval Settings:").bold().yellow());
    eprintln!("  Top k: {}", style(config.retrieval.top_k).cyan());
    match &config.retrieval.system_prompt {
        Some(prompt) => eprintln!("  System prompt: {}", style(prompt).cyan()),
        None => eprintln!("  System prompt: {}", style("(none)").dim()),
    }

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

/// Write a default configuration file if none exists yet
#[inline]
pub fn init_config() -> Result<()> {
    let config_dir = get_config_dir()?;
    let config_path = config_dir.join("config.toml");

    if config_path.exists() {
        println!(
            "Configuration already exists at {}",
            config_path.display()
        );
        return Ok(());
    }

    let config = Config {
        base_dir: config_dir,
        ..Config::default()
    };
    config.save().context("Failed to save configuration")?;

    println!("Wrote default configuration to {}", config_path.display());
    Ok(())
}
