//! `mdview toc` command implementation.

use std::path::PathBuf;

use clap::Args;
use mdview_config::Config;
use mdview_renderer::TocEntry;

use crate::document::render_file;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the toc command.
#[derive(Args)]
pub(crate) struct TocArgs {
    /// Markdown file to read.
    file: PathBuf,

    /// Path to configuration file (default: auto-discover mdview.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl TocArgs {
    /// Execute the toc command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, loading or rendering fails.
    pub(crate) fn execute(self, output: &Output) -> Result<(), CliError> {
        let config = Config::load(self.config.as_deref(), None)?;
        let result = render_file(&self.file, &config)?;
        output.document(&format_toc(&result.toc))?;
        Ok(())
    }
}

/// One line per entry, indented two spaces per level below 1.
fn format_toc(toc: &[TocEntry]) -> String {
    toc.iter()
        .map(|entry| {
            let indent = "  ".repeat(usize::from(entry.level.saturating_sub(1)));
            format!("{indent}- {} (#{})", entry.title, entry.id)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
