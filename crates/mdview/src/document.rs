//! Document loading and rendering.
//!
//! Owns the file-system side the renderer stays out of: extension and size
//! checks, reading, and deriving the directory local images are confined to.

use std::fs;
use std::path::Path;

use mdview_config::{Config, DocumentConfig};
use mdview_renderer::{MarkdownRenderer, RenderResult};

use crate::error::CliError;

/// Markdown source read from disk.
#[derive(Debug)]
pub(crate) struct LoadedDocument {
    /// File content.
    pub content: String,
    /// Directory of the file, `/`-separated.
    pub file_dir: Option<String>,
}

/// Check and read a markdown file.
///
/// The size limit is checked before the file is read.
pub(crate) fn load(path: &Path, config: &DocumentConfig) -> Result<LoadedDocument, CliError> {
    if !config.is_markdown(path) {
        return Err(CliError::UnsupportedFile(path.to_path_buf()));
    }

    let path = fs::canonicalize(path)?;
    let size = fs::metadata(&path)?.len();
    if size > config.max_file_size {
        return Err(CliError::FileTooLarge {
            size,
            limit: config.max_file_size,
        });
    }

    let content = fs::read_to_string(&path)?;
    tracing::info!(path = %path.display(), bytes = size, "Loaded document");

    Ok(LoadedDocument {
        content,
        file_dir: file_dir(&path.to_string_lossy()),
    })
}

/// Directory part of a path, splitting on both separators.
///
/// Returns `None` when nothing is left, which disables local images.
pub(crate) fn file_dir(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = path.split(['/', '\\']).collect();
    segments.pop();
    let dir = segments.join("/");
    (!dir.is_empty()).then_some(dir)
}

/// Load and render a markdown file with the configured options.
pub(crate) fn render_file(path: &Path, config: &Config) -> Result<RenderResult, CliError> {
    let document = load(path, &config.document)?;
    if document.content.is_empty() {
        return Ok(RenderResult::default());
    }

    let renderer = MarkdownRenderer::new().with_gfm(config.render.gfm);
    let result = renderer.render(
        &document.content,
        document.file_dir.as_deref(),
        config.render.dark,
    )?;
    Ok(result)
}
