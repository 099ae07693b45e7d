// Metadata tagging module
// Maps knowledge-base categories onto documents and display colors


use std::collections::HashMap;

use crate::loader::Document;

/// Color used for any category missing from a palette
pub const DEFAULT_COLOR: &str = "gray";

/// Typed metadata carried by every document and chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocMetadata {
    /// Category label, derived from the source folder's base name
    pub doc_type: String,
    /// Path of the file this content was read from
    pub source_path: String,
}

/// A named mapping from `doc_type` to a display color.
///
/// Palettes are injected configuration, selected by name in the config file,
/// so multiple category schemes can coexist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPalette {
    name: String,
    colors: HashMap<String, String>,
    default_color: String,
}

impl CategoryPalette {
    /// Palette for a LinkedIn-export knowledge base
    #[inline]
    pub fn linkedin() -> Self {
        Self::from_entries(
            "linkedin",
            &[
                ("profile", "#1e3a8a"),
                ("experience", "#065f46"),
                ("education", "#7c2d12"),
                ("skills", "#ca8a04"),
                ("certifications", "#7c3aed"),
                ("projects", "#ea580c"),
                ("publications", "#dc2626"),
                ("networking", "#0d9488"),
                ("communications", "#059669"),
                ("preferences", "#6b7280"),
            ],
        )
    }

    /// Palette for a generic career knowledge base
    #[inline]
    pub fn career() -> Self {
        Self::from_entries(
            "career",
            &[
                ("about", "#1e3a8a"),
                ("experience", "#065f46"),
                ("education", "#7c2d12"),
                ("skills", "#ca8a04"),
                ("projects", "#ea580c"),
                ("publications", "#dc2626"),
                ("interests", "#0d9488"),
                ("contact", "#6b7280"),
            ],
        )
    }

    /// Look up a built-in palette by its configured name
    #[inline]
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "linkedin" => Some(Self::linkedin()),
            "career" => Some(Self::career()),
            _ => None,
        }
    }

    /// Build a palette from explicit category/color pairs
    #[inline]
    pub fn from_entries(name: &str, entries: &[(&str, &str)]) -> Self {
        let colors = entries
            .iter()
            .map(|(doc_type, color)| ((*doc_type).to_string(), (*color).to_string()))
            .collect();

        Self {
            name: name.to_string(),
            colors,
            default_color: DEFAULT_COLOR.to_string(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Color for a `doc_type`. Total over any string input; categories
    /// missing from the palette get the default color.
    #[inline]
    pub fn color_for(&self, doc_type: &str) -> &str {
        self.colors
            .get(doc_type)
            .map_or(self.default_color.as_str(), String::as_str)
    }
}

/// Annotates documents with their category and owns the palette used to
/// color them downstream.
#[derive(Debug, Clone)]
pub struct Tagger {
    palette: CategoryPalette,
}

impl Tagger {
    #[inline]
    pub fn new(palette: CategoryPalette) -> Self {
        Self { palette }
    }

    /// Set `doc_type` on a document to the given category
    #[inline]
    pub fn tag(&self, mut document: Document, category: &str) -> Document {
        document.metadata.doc_type = category.to_string();
        document
    }

    #[inline]
    pub fn palette(&self) -> &CategoryPalette {
        &self.palette
    }
}

/// Defined-default category lookup for records missing a `doc_type`
#[inline]
pub fn doc_type_or_unknown(doc_type: Option<&str>) -> &str {
    match doc_type {
        Some(doc_type) if !doc_type.is_empty() => doc_type,
        _ => "unknown",
    }
}
