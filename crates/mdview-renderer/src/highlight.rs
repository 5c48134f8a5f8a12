//! Syntax highlighting for rendered code blocks.
//!
//! Runs over serialized, sanitized HTML. Each `<pre><code>` block is decoded,
//! highlighted with syntect (extended with the two-face grammars) using inline
//! styles and wrapped in a `highlight-container` div. Blocks are independent: one that fails keeps its
//! original markup and the rest are still highlighted.
//!
//! The syntect engine is expensive to build, so a single process-wide
//! [`Highlighter`] is created on first use (see [`Highlighter::shared`]).

use std::sync::LazyLock;
use std::time::Instant;

use regex::{Captures, Regex};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Color, Theme, ThemeSet};
use syntect::html::{IncludeBackground, styled_line_to_highlighted_html};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::tree::escape_html;

/// Theme used in light mode.
pub const LIGHT_THEME: &str = "InspiredGitHub";

/// Theme used in dark mode.
pub const DARK_THEME: &str = "base16-ocean.dark";

/// Class of the wrapper around each highlighted block.
pub const CONTAINER_CLASS: &str = "highlight-container";

/// Language of blocks without an info string.
const PLAIN_LANGUAGE: &str = "text";

static CODE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<pre><code(?: class="language-([^"]*)")?>(.*?)</code></pre>"#)
        .expect("invalid code block regex")
});

static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(?:lt|gt|amp|quot|#39);").expect("invalid entity regex"));

static SHARED: LazyLock<Result<Highlighter, HighlightError>> = LazyLock::new(|| {
    let start = Instant::now();
    let highlighter = Highlighter::new();
    match &highlighter {
        Ok(_) => tracing::info!(
            elapsed_ms = start.elapsed().as_millis(),
            "Initialized syntax highlighter"
        ),
        Err(e) => tracing::warn!(error = %e, "Failed to initialize syntax highlighter"),
    }
    highlighter
});

/// Highlighting error.
#[derive(Clone, Debug, thiserror::Error)]
pub enum HighlightError {
    /// A bundled theme is missing.
    #[error("theme not found: {0}")]
    MissingTheme(String),

    /// Highlighting a single block failed.
    #[error("failed to highlight {language} block: {message}")]
    Block { language: String, message: String },
}

/// Turns one code block into highlighted `<pre>` markup.
pub trait CodeHighlighter: Send + Sync {
    /// Highlight decoded source code.
    ///
    /// `language` is already canonical (see [`canonical_language`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the block cannot be highlighted.
    fn highlight(&self, code: &str, language: &str, is_dark: bool) -> Result<String, HighlightError>;
}

/// syntect engine with the extended syntax set and both themes loaded.
pub struct Highlighter {
    syntax_set: SyntaxSet,
    light: Theme,
    dark: Theme,
}

impl Highlighter {
    /// Load the bundled syntaxes and themes.
    ///
    /// Prefer [`Highlighter::shared`]; building an engine takes tens of
    /// milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`HighlightError::MissingTheme`] if a theme is not bundled.
    pub fn new() -> Result<Self, HighlightError> {
        let mut themes = ThemeSet::load_defaults().themes;
        let mut take = |name: &str| {
            themes
                .remove(name)
                .ok_or_else(|| HighlightError::MissingTheme(name.to_owned()))
        };
        let light = take(LIGHT_THEME)?;
        let dark = take(DARK_THEME)?;

        Ok(Self {
            syntax_set: two_face::syntax::extra_newlines(),
            light,
            dark,
        })
    }

    /// Process-wide instance, built on first call.
    ///
    /// Concurrent first callers block until construction finishes; later
    /// callers share the same instance.
    ///
    /// # Errors
    ///
    /// Returns the construction error, on every call, if building failed.
    pub fn shared() -> Result<&'static Self, HighlightError> {
        SHARED.as_ref().map_err(Clone::clone)
    }

    /// Whether the language has a dedicated syntax.
    #[must_use]
    pub fn supports_language(&self, language: &str) -> bool {
        self.find_syntax(language).is_some()
    }

    /// Look a language up by name or extension, then by its usual extension.
    fn find_syntax(&self, language: &str) -> Option<&SyntaxReference> {
        self.syntax_set.find_syntax_by_token(language).or_else(|| {
            syntax_extension(language).and_then(|ext| self.syntax_set.find_syntax_by_extension(ext))
        })
    }

    fn theme(&self, is_dark: bool) -> &Theme {
        if is_dark { &self.dark } else { &self.light }
    }
}

impl std::fmt::Debug for Highlighter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Highlighter")
            .field("syntaxes", &self.syntax_set.syntaxes().len())
            .finish_non_exhaustive()
    }
}

impl CodeHighlighter for Highlighter {
    fn highlight(&self, code: &str, language: &str, is_dark: bool) -> Result<String, HighlightError> {
        let (syntax, language) = match self.find_syntax(language) {
            Some(syntax) => (syntax, language),
            None => (self.syntax_set.find_syntax_plain_text(), PLAIN_LANGUAGE),
        };
        let theme = self.theme(is_dark);
        let block_error = |e: syntect::Error| HighlightError::Block {
            language: language.to_owned(),
            message: e.to_string(),
        };

        let mut lines = HighlightLines::new(syntax, theme);
        let mut body = String::with_capacity(code.len() * 4);
        for line in LinesWithEndings::from(code) {
            let regions = lines
                .highlight_line(line, &self.syntax_set)
                .map_err(block_error)?;
            let html = styled_line_to_highlighted_html(&regions, IncludeBackground::No)
                .map_err(block_error)?;
            body.push_str(&html);
        }

        Ok(format!(
            r#"<pre class="highlight" style="{}"><code class="language-{}">{body}</code></pre>"#,
            pre_style(theme),
            escape_html(language)
        ))
    }
}

fn pre_style(theme: &Theme) -> String {
    let background = theme.settings.background.unwrap_or(Color::WHITE);
    let foreground = theme.settings.foreground.unwrap_or(Color::BLACK);
    format!(
        "background-color:{};color:{}",
        hex_color(background),
        hex_color(foreground)
    )
}

fn hex_color(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

/// Build the shared highlighter ahead of the first render.
///
/// # Errors
///
/// Returns an error if the highlighter cannot be built.
pub fn warm_up() -> Result<(), HighlightError> {
    Highlighter::shared().map(|_| ())
}

/// Map common short language names to the names syntect knows.
///
/// An empty name means plain text.
#[must_use]
pub fn canonical_language(language: &str) -> &str {
    match language {
        "" => PLAIN_LANGUAGE,
        "js" => "javascript",
        "ts" => "typescript",
        "py" => "python",
        "rb" => "ruby",
        "sh" | "zsh" | "shell" => "bash",
        "yml" => "yaml",
        other => other,
    }
}

/// Extension for languages whose grammar name differs from the common name.
fn syntax_extension(language: &str) -> Option<&'static str> {
    match language {
        "javascript" => Some("js"),
        "typescript" => Some("ts"),
        "csharp" => Some("cs"),
        "markdown" => Some("md"),
        "powershell" => Some("ps1"),
        "dockerfile" => Some("Dockerfile"),
        "kotlin" => Some("kt"),
        _ => None,
    }
}

/// Decode the entities produced by HTML escaping, in a single pass.
fn decode_entities(s: &str) -> String {
    ENTITY
        .replace_all(s, |caps: &Captures| match &caps[0] {
            "&lt;" => "<",
            "&gt;" => ">",
            "&amp;" => "&",
            "&quot;" => "\"",
            _ => "'",
        })
        .into_owned()
}

/// Whether the markup contains a code block worth highlighting.
#[must_use]
pub fn contains_code_blocks(html: &str) -> bool {
    html.contains("<pre><code")
}

/// Highlight every `<pre><code>` block in serialized HTML.
///
/// Blocks that fail keep their original markup; the failure is logged.
#[must_use]
pub fn highlight_code_blocks(html: &str, is_dark: bool, highlighter: &dyn CodeHighlighter) -> String {
    CODE_BLOCK
        .replace_all(html, |caps: &Captures| {
            let language = decode_entities(caps.get(1).map_or("", |m| m.as_str()));
            let language = canonical_language(&language);
            let code = decode_entities(&caps[2]);

            match highlighter.highlight(&code, language, is_dark) {
                Ok(block) => format!(r#"<div class="{CONTAINER_CLASS}">{block}</div>"#),
                Err(e) => {
                    tracing::warn!(language, error = %e, "Failed to highlight code block");
                    caps[0].to_owned()
                }
            }
        })
        .into_owned()
}
