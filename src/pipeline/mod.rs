// Ingestion pipeline module
// Orchestrates load -> split -> embed -> persist

#[cfg(test)]
mod tests;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::chunker::split;
use crate::config::Config;
use crate::loader::load_knowledge_base;
use crate::metadata::Tagger;
use crate::providers::OpenAiClient;
use crate::store::{EmbeddingRecord, VectorStore};
use crate::{KbError, Result};

/// Counts reported after a build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    pub records: usize,
    pub dimension: Option<usize>,
}

/// Build the vector store from the configured knowledge base.
///
/// When `overwrite` is true the store's existing contents are deleted before
/// inserting, a full replace; otherwise new records append. Any provider or
/// store failure aborts the build; nothing is retried here.
#[inline]
pub async fn build_store(config: &Config, overwrite: bool) -> Result<IngestReport> {
    let palette = config
        .category_palette()
        .map_err(|e| KbError::Configuration(e.to_string()))?;
    let tagger = Tagger::new(palette);

    let documents = load_knowledge_base(&config.knowledge_base, &tagger)?;
    let chunks = split(&documents, &config.splitter)?;
    info!(
        "Prepared {} chunks from {} documents",
        chunks.len(),
        documents.len()
    );

    let mut store = VectorStore::open(&config.vector_store_path()).await?;
    if overwrite {
        store.clear().await?;
    }

    if chunks.is_empty() {
        return Ok(IngestReport {
            documents: documents.len(),
            chunks: 0,
            records: 0,
            dimension: None,
        });
    }

    let client = OpenAiClient::new(config)?;
    let bar = embedding_progress_bar(chunks.len() as u64);

    let mut records = 0;
    let mut dimension = None;
    for batch in chunks.chunks(config.openai.batch_size as usize) {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let vectors = client.embed_many(&texts)?;

        let batch_records: Vec<EmbeddingRecord> = batch
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddingRecord::from_chunk(chunk, vector))
            .collect();

        if dimension.is_none() {
            dimension = batch_records.first().map(|r| r.vector.len());
        }

        store.insert(&batch_records).await?;
        records += batch_records.len();
        bar.inc(batch.len() as u64);
        debug!("Embedded and stored {} of {} chunks", records, chunks.len());
    }

    bar.finish_and_clear();
    info!("Build complete: {} records stored", records);

    Ok(IngestReport {
        documents: documents.len(),
        chunks: chunks.len(),
        records,
        dimension,
    })
}

fn embedding_progress_bar(total: u64) -> ProgressBar {
    if console::user_attended_stderr() {
        ProgressBar::new(total).with_style(
            ProgressStyle::with_template("{bar:40} [{pos}/{len}] Embedding chunks")
                .expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    }
}
