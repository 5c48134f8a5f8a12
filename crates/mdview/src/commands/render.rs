//! `mdview render` command implementation.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use mdview_config::{CliSettings, Config};

use crate::document::render_file;
use crate::error::CliError;
use crate::output::Output;

/// Output format for rendered documents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum Format {
    /// HTML fragment.
    #[default]
    Html,
    /// JSON object with `html` and `toc`.
    Json,
}

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Markdown file to render.
    file: PathBuf,

    /// Path to configuration file (default: auto-discover mdview.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use the dark highlighting theme (overrides config).
    #[arg(long)]
    dark: bool,

    /// Use the light highlighting theme (overrides config).
    #[arg(long, conflicts_with = "dark")]
    light: bool,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Html)]
    format: Format,

    /// Maximum document size in bytes (overrides config).
    #[arg(long, env = "MDVIEW_MAX_FILE_SIZE")]
    max_file_size: Option<u64>,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, loading or rendering fails.
    pub(crate) fn execute(self, output: &Output) -> Result<(), CliError> {
        let rendered = self.run()?;
        output.document(&rendered)?;
        Ok(())
    }

    fn run(&self) -> Result<String, CliError> {
        let cli_settings = CliSettings {
            dark: self.resolve_dark(),
            max_file_size: self.max_file_size,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let result = render_file(&self.file, &config)?;

        match self.format {
            Format::Html => Ok(result.html),
            Format::Json => Ok(serde_json::to_string(&result)?),
        }
    }

    /// Resolve dark mode from `--dark`/`--light` flags.
    fn resolve_dark(&self) -> Option<bool> {
        if self.dark {
            Some(true)
        } else if self.light {
            Some(false)
        } else {
            None
        }
    }
}
