// Document loader module
// Walks a folder-per-category knowledge base and reads text files as UTF-8


use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::metadata::{DocMetadata, Tagger};
use crate::{KbError, Result};

/// A loaded text file plus its typed metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub content: String,
    pub metadata: DocMetadata,
}

/// Load every document under a knowledge-base root.
///
/// `root` names the knowledge-base directory; each of its immediate
/// subdirectories is a category, and every file below a category folder
/// becomes one [`Document`] tagged with `doc_type` = the folder's base name.
/// Category order and intra-folder order follow filesystem expansion and
/// must not be assumed sorted.
///
/// The load aborts on the first file that cannot be read or is not valid
/// UTF-8.
#[inline]
pub fn load_knowledge_base(root: &str, tagger: &Tagger) -> Result<Vec<Document>> {
    let pattern = format!("{}/*", root.trim_end_matches('/'));
    let folders = expand_category_folders(&pattern)?;

    if folders.is_empty() {
        warn!("No category folders matched pattern: {}", pattern);
    }

    let mut documents = Vec::new();
    for folder in &folders {
        documents.extend(load_folder(folder, tagger)?);
    }

    info!(
        "Loaded {} documents from {} categories under {}",
        documents.len(),
        folders.len(),
        root
    );
    Ok(documents)
}

/// Expand the knowledge-base pattern into its category folders
fn expand_category_folders(pattern: &str) -> Result<Vec<std::path::PathBuf>> {
    let paths = glob::glob(pattern)
        .map_err(|e| KbError::Configuration(format!("Invalid knowledge base pattern: {}", e)))?;

    let mut folders = Vec::new();
    for path in paths {
        let path = path.map_err(|e| KbError::Io(e.into_error()))?;
        if path.is_dir() {
            folders.push(path);
        } else {
            debug!("Skipping non-directory entry: {}", path.display());
        }
    }

    Ok(folders)
}

/// Load all files under one category folder, tagged with the folder's name
fn load_folder(folder: &Path, tagger: &Tagger) -> Result<Vec<Document>> {
    let doc_type = folder
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    debug!("Loading category '{}' from {}", doc_type, folder.display());

    let mut documents = Vec::new();
    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry))
    {
        let entry = entry.map_err(|e| {
            KbError::Io(e.into_io_error().unwrap_or_else(|| {
                std::io::Error::other("directory walk failed")
            }))
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let document = read_document(entry.path())?;
        documents.push(tagger.tag(document, &doc_type));
    }

    debug!("Loaded {} documents for '{}'", documents.len(), doc_type);
    Ok(documents)
}

/// Read one file as strict UTF-8
fn read_document(path: &Path) -> Result<Document> {
    let bytes = fs::read(path)?;

    let content = String::from_utf8(bytes).map_err(|_| {
        KbError::Decoding(format!("File is not valid UTF-8: {}", path.display()))
    })?;

    Ok(Document {
        content,
        metadata: DocMetadata {
            doc_type: String::new(),
            source_path: path.display().to_string(),
        },
    })
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}
