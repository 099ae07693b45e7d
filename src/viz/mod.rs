// Embedding visualization module
// Projects stored vectors to 2D/3D and renders an interactive scatter plot

mod tsne;

use std::path::Path;

use serde_json::{json, Value};
use tracing::debug;

use crate::store::StoreSnapshot;
use crate::{KbError, Result};

const TSNE_SEED: u64 = 42;
const HOVER_PREVIEW_CHARS: usize = 100;

/// Reduce high-dimensional vectors to `dims` coordinates with t-SNE.
///
/// Only 2 and 3 target dimensions are supported. The projection is
/// deterministic: the same vectors always produce the same layout.
/// Perplexity adapts to small inputs so a handful of points still projects.
#[inline]
pub fn project(vectors: &[Vec<f32>], dims: usize) -> Result<Vec<Vec<f32>>> {
    if dims != 2 && dims != 3 {
        return Err(KbError::Configuration(format!(
            "visualization dimensions must be 2 or 3, got {dims}"
        )));
    }
    let n = vectors.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    if n == 1 {
        return Ok(vec![vec![0.0; dims]]);
    }

    let perplexity = 30.0f64.min(((n - 1) as f64 / 3.0).max(1.0));
    debug!("Projecting {n} vectors to {dims}D (perplexity {perplexity:.1})");
    Ok(tsne::run(vectors, dims, perplexity, TSNE_SEED))
}

/// A renderable plotly figure: one trace plus a layout
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    data: Value,
    layout: Value,
}

impl Figure {
    #[inline]
    pub fn data(&self) -> &Value {
        &self.data
    }

    #[inline]
    pub fn layout(&self) -> &Value {
        &self.layout
    }

    /// A self-contained HTML page rendering the figure via the plotly CDN
    #[inline]
    pub fn to_html(&self) -> String {
        format!(
            concat!(
                "<!DOCTYPE html>\n",
                "<html>\n<head>\n<meta charset=\"utf-8\" />\n",
                "<script src=\"https://cdn.plot.ly/plotly-2.32.0.min.js\"></script>\n",
                "</head>\n<body>\n<div id=\"plot\"></div>\n",
                "<script>\nPlotly.newPlot(\"plot\", [{data}], {layout});\n</script>\n",
                "</body>\n</html>\n"
            ),
            data = self.data,
            layout = self.layout,
        )
    }

    /// Write the figure to `path` as a standalone HTML file
    #[inline]
    pub fn write_html(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_html())?;
        Ok(())
    }
}

/// Build a scatter figure from projected coordinates and the snapshot the
/// vectors came from. Marker colors follow the snapshot's category colors;
/// hover text shows each chunk's category and a text preview.
#[inline]
pub fn render(coordinates: &[Vec<f32>], snapshot: &StoreSnapshot, title: &str) -> Result<Figure> {
    if coordinates.len() != snapshot.len() {
        return Err(KbError::Other(anyhow::anyhow!(
            "coordinate count {} does not match snapshot size {}",
            coordinates.len(),
            snapshot.len()
        )));
    }
    let dims = coordinates.first().map_or(2, Vec::len);

    let hover: Vec<String> = snapshot
        .doc_types
        .iter()
        .zip(&snapshot.texts)
        .map(|(doc_type, text)| {
            let preview: String = text.chars().take(HOVER_PREVIEW_CHARS).collect();
            format!("Type: {doc_type}<br>Text: {preview}...")
        })
        .collect();

    let xs: Vec<f32> = coordinates.iter().map(|c| c[0]).collect();
    let ys: Vec<f32> = coordinates.iter().map(|c| c[1]).collect();

    let mut data = json!({
        "type": if dims == 3 { "scatter3d" } else { "scatter" },
        "mode": "markers",
        "x": xs,
        "y": ys,
        "marker": {
            "size": 5,
            "color": snapshot.colors,
            "opacity": 0.8,
        },
        "text": hover,
        "hoverinfo": "text",
    });

    let layout = if dims == 3 {
        let zs: Vec<f32> = coordinates.iter().map(|c| c[2]).collect();
        data["z"] = json!(zs);
        json!({
            "title": title,
            "scene": {
                "xaxis": { "title": "x" },
                "yaxis": { "title": "y" },
                "zaxis": { "title": "z" },
            },
            "width": 900,
            "height": 700,
            "margin": { "r": 20, "b": 10, "l": 10, "t": 40 },
        })
    } else {
        json!({
            "title": title,
            "xaxis": { "title": "x" },
            "yaxis": { "title": "y" },
            "width": 800,
            "height": 600,
            "margin": { "r": 20, "b": 10, "l": 10, "t": 40 },
        })
    };

    Ok(Figure { data, layout })
}
