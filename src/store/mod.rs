// Vector store module
// LanceDB-backed persistence and retrieval of embedding records

#[cfg(test)]
mod tests;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chunker::Chunk;
use crate::metadata::{CategoryPalette, doc_type_or_unknown};
use crate::{KbError, Result};

const TABLE_NAME: &str = "embeddings";

/// One embedded chunk as persisted in the vector store
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub content: String,
    pub doc_type: Option<String>,
    pub source_path: String,
    pub chunk_index: u32,
    pub created_at: String,
}

impl EmbeddingRecord {
    /// Build a record from a chunk and its embedding vector
    #[inline]
    pub fn from_chunk(chunk: &Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            vector,
            content: chunk.content.clone(),
            doc_type: Some(chunk.metadata.doc_type.clone()),
            source_path: chunk.metadata.source_path.clone(),
            chunk_index: chunk.chunk_index as u32,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Every record in the store, columnar, in native iteration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    pub vectors: Vec<Vec<f32>>,
    pub texts: Vec<String>,
    pub doc_types: Vec<String>,
    pub colors: Vec<String>,
}

impl StoreSnapshot {
    #[inline]
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}

/// Record count and vector dimensionality of the store.
///
/// `dimension` is `None` whenever no record could be sampled, which is
/// reported distinctly from a store that merely counts zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSummary {
    pub count: u64,
    pub dimension: Option<usize>,
}

impl fmt::Display for StoreSummary {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dimension {
            Some(dimension) => write!(
                f,
                "There are {} vectors with {} dimensions in the vector store",
                self.count, dimension
            ),
            None => write!(f, "No embeddings found in the vector store."),
        }
    }
}

/// A retrieved record with its distance to the query vector
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub content: String,
    pub doc_type: Option<String>,
    pub source_path: String,
    pub distance: f32,
    pub similarity: f32,
}

/// Vector store handle over an on-disk LanceDB directory.
///
/// Single-writer access during builds is assumed, not enforced; locking is
/// delegated to LanceDB.
pub struct VectorStore {
    connection: Connection,
    table_name: String,
}

impl VectorStore {
    /// Open (or create) the store directory. The embeddings table itself is
    /// created lazily on first insert, once the dimensionality is known.
    #[inline]
    pub async fn open(store_path: &Path) -> Result<Self> {
        debug!("Opening LanceDB store at {}", store_path.display());

        if let Some(parent) = store_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                KbError::Store(format!("Failed to create vector store directory: {}", e))
            })?;
        }

        let uri = format!("file://{}", store_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| KbError::Store(format!("Failed to connect to LanceDB: {}", e)))?;

        Ok(Self {
            connection,
            table_name: TABLE_NAME.to_string(),
        })
    }

    /// Append records to the store.
    ///
    /// All records must share one dimensionality, and it must match any
    /// existing table's.
    #[inline]
    pub async fn insert(&mut self, records: &[EmbeddingRecord]) -> Result<()> {
        if records.is_empty() {
            debug!("No records to insert");
            return Ok(());
        }

        let dimension = records[0].vector.len();
        if let Some(record) = records.iter().find(|r| r.vector.len() != dimension) {
            return Err(KbError::Store(format!(
                "Inconsistent vector dimensions in batch: {} vs {}",
                dimension,
                record.vector.len()
            )));
        }

        if let Some(existing) = self.table_dimension().await? {
            if existing != dimension {
                return Err(KbError::Store(format!(
                    "Vector dimension {} does not match existing store dimension {}",
                    dimension, existing
                )));
            }
        } else {
            self.create_table(dimension).await?;
        }

        let record_batch = create_record_batch(records, dimension)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);

        let table = self.open_table().await?;
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| KbError::Store(format!("Failed to insert records: {}", e)))?;

        info!("Inserted {} records into the vector store", records.len());
        Ok(())
    }

    /// Delete every record by dropping the table. This is the full-replace
    /// primitive behind overwrite builds; appends never pass through here.
    #[inline]
    pub async fn clear(&mut self) -> Result<()> {
        if !self.table_exists().await? {
            debug!("Store is already empty, nothing to clear");
            return Ok(());
        }

        info!("Clearing existing vector store contents");
        self.connection
            .drop_table(&self.table_name)
            .await
            .map_err(|e| KbError::Store(format!("Failed to drop table: {}", e)))?;

        Ok(())
    }

    /// Total number of stored records
    #[inline]
    pub async fn count(&self) -> Result<u64> {
        if !self.table_exists().await? {
            return Ok(0);
        }

        let table = self.open_table().await?;
        let count = table
            .count_rows(None)
            .await
            .map_err(|e| KbError::Store(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    /// Record count plus sampled dimensionality
    #[inline]
    pub async fn describe(&self) -> Result<StoreSummary> {
        let count = self.count().await?;

        if count == 0 {
            return Ok(StoreSummary {
                count,
                dimension: None,
            });
        }

        let table = self.open_table().await?;
        let mut stream = table
            .query()
            .limit(1)
            .execute()
            .await
            .map_err(|e| KbError::Store(format!("Failed to sample store: {}", e)))?;

        let mut dimension = None;
        if let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| KbError::Store(format!("Failed to read sample batch: {}", e)))?
        {
            if batch.num_rows() > 0 {
                dimension = Some(vector_column(&batch)?.value_length() as usize);
            }
        }

        Ok(StoreSummary { count, dimension })
    }

    /// Fetch every record, deriving categories and palette colors.
    /// Records without a `doc_type` surface as `"unknown"`.
    #[inline]
    pub async fn fetch_all(&self, palette: &CategoryPalette) -> Result<StoreSnapshot> {
        if !self.table_exists().await? {
            debug!("Store has no table yet, returning empty snapshot");
            return Ok(StoreSnapshot::default());
        }

        let table = self.open_table().await?;
        let mut stream = table
            .query()
            .execute()
            .await
            .map_err(|e| KbError::Store(format!("Failed to scan store: {}", e)))?;

        let mut snapshot = StoreSnapshot::default();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| KbError::Store(format!("Failed to read scan batch: {}", e)))?
        {
            append_snapshot_batch(&batch, palette, &mut snapshot)?;
        }

        debug!("Fetched {} records from the vector store", snapshot.len());
        Ok(snapshot)
    }

    /// Top-`limit` records by the store's native L2 distance to the query
    #[inline]
    pub async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<ScoredRecord>> {
        if !self.table_exists().await? {
            warn!("Similarity search against an empty store");
            return Ok(Vec::new());
        }

        let table = self.open_table().await?;
        let mut stream = table
            .vector_search(query_vector)
            .map_err(|e| KbError::Store(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(limit)
            .execute()
            .await
            .map_err(|e| KbError::Store(format!("Failed to execute search: {}", e)))?;

        let mut results = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| KbError::Store(format!("Failed to read search batch: {}", e)))?
        {
            append_search_batch(&batch, &mut results)?;
        }

        debug!("Search returned {} records", results.len());
        Ok(results)
    }

    async fn table_exists(&self) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| KbError::Store(format!("Failed to list tables: {}", e)))?;

        Ok(table_names.contains(&self.table_name))
    }

    async fn table_dimension(&self) -> Result<Option<usize>> {
        if !self.table_exists().await? {
            return Ok(None);
        }

        let table = self.open_table().await?;
        let schema = table
            .schema()
            .await
            .map_err(|e| KbError::Store(format!("Failed to read table schema: {}", e)))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return Ok(Some(*size as usize));
                }
            }
        }

        Err(KbError::Store(
            "Existing table has no fixed-size vector column".to_string(),
        ))
    }

    async fn create_table(&self, dimension: usize) -> Result<()> {
        info!("Creating embeddings table with {} dimensions", dimension);

        self.connection
            .create_empty_table(&self.table_name, store_schema(dimension))
            .execute()
            .await
            .map_err(|e| KbError::Store(format!("Failed to create table: {}", e)))?;

        Ok(())
    }

    async fn open_table(&self) -> Result<lancedb::Table> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| KbError::Store(format!("Failed to open table: {}", e)))
    }
}

fn store_schema(dimension: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                dimension as i32,
            ),
            false,
        ),
        Field::new("content", DataType::Utf8, false),
        Field::new("doc_type", DataType::Utf8, true),
        Field::new("source_path", DataType::Utf8, false),
        Field::new("chunk_index", DataType::UInt32, false),
        Field::new("created_at", DataType::Utf8, false),
    ]))
}

fn create_record_batch(records: &[EmbeddingRecord], dimension: usize) -> Result<RecordBatch> {
    let len = records.len();

    let mut ids = Vec::with_capacity(len);
    let mut contents = Vec::with_capacity(len);
    let mut doc_types = Vec::with_capacity(len);
    let mut source_paths = Vec::with_capacity(len);
    let mut chunk_indices = Vec::with_capacity(len);
    let mut created_ats = Vec::with_capacity(len);
    let mut flat_values = Vec::with_capacity(len * dimension);

    for record in records {
        ids.push(record.id.as_str());
        contents.push(record.content.as_str());
        doc_types.push(record.doc_type.as_deref());
        source_paths.push(record.source_path.as_str());
        chunk_indices.push(record.chunk_index);
        created_ats.push(record.created_at.as_str());
        flat_values.extend_from_slice(&record.vector);
    }

    let values_array = Float32Array::from(flat_values);
    let item_field = Arc::new(Field::new("item", DataType::Float32, false));
    let vector_array =
        FixedSizeListArray::try_new(item_field, dimension as i32, Arc::new(values_array), None)
            .map_err(|e| KbError::Store(format!("Failed to create vector array: {}", e)))?;

    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(vector_array),
        Arc::new(StringArray::from(contents)),
        Arc::new(StringArray::from(doc_types)),
        Arc::new(StringArray::from(source_paths)),
        Arc::new(UInt32Array::from(chunk_indices)),
        Arc::new(StringArray::from(created_ats)),
    ];

    RecordBatch::try_new(store_schema(dimension), arrays)
        .map_err(|e| KbError::Store(format!("Failed to create record batch: {}", e)))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| KbError::Store(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| KbError::Store(format!("Invalid {} column type", name)))
}

fn vector_column(batch: &RecordBatch) -> Result<&FixedSizeListArray> {
    batch
        .column_by_name("vector")
        .ok_or_else(|| KbError::Store("Missing vector column".to_string()))?
        .as_any()
        .downcast_ref::<FixedSizeListArray>()
        .ok_or_else(|| KbError::Store("Invalid vector column type".to_string()))
}

fn vector_at(vectors: &FixedSizeListArray, row: usize) -> Result<Vec<f32>> {
    let values = vectors.value(row);
    let values = values
        .as_any()
        .downcast_ref::<Float32Array>()
        .ok_or_else(|| KbError::Store("Invalid vector item type".to_string()))?;

    Ok(values.values().to_vec())
}

fn append_snapshot_batch(
    batch: &RecordBatch,
    palette: &CategoryPalette,
    snapshot: &mut StoreSnapshot,
) -> Result<()> {
    let vectors = vector_column(batch)?;
    let contents = string_column(batch, "content")?;
    let doc_types = string_column(batch, "doc_type")?;

    for row in 0..batch.num_rows() {
        let doc_type = if doc_types.is_null(row) {
            None
        } else {
            Some(doc_types.value(row))
        };
        let doc_type = doc_type_or_unknown(doc_type).to_string();

        snapshot.vectors.push(vector_at(vectors, row)?);
        snapshot.texts.push(contents.value(row).to_string());
        snapshot.colors.push(palette.color_for(&doc_type).to_string());
        snapshot.doc_types.push(doc_type);
    }

    Ok(())
}

fn append_search_batch(batch: &RecordBatch, results: &mut Vec<ScoredRecord>) -> Result<()> {
    let contents = string_column(batch, "content")?;
    let doc_types = string_column(batch, "doc_type")?;
    let source_paths = string_column(batch, "source_path")?;

    let distances = batch
        .column_by_name("_distance")
        .map(|col| col.as_any().downcast_ref::<Float32Array>());

    for row in 0..batch.num_rows() {
        let distance = distances
            .flatten()
            .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

        results.push(ScoredRecord {
            content: contents.value(row).to_string(),
            doc_type: if doc_types.is_null(row) {
                None
            } else {
                Some(doc_types.value(row).to_string())
            },
            source_path: source_paths.value(row).to_string(),
            distance,
            similarity: 1.0 - distance,
        });
    }

    Ok(())
}
