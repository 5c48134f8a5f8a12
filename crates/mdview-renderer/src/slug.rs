//! Heading slug generation.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static NON_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9_\s-]").expect("invalid slug regex"));
static WHITESPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("invalid whitespace regex"));
static HYPHEN_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-+").expect("invalid hyphen regex"));

/// Convert text to URL-safe slug.
///
/// Lower-cases, removes everything except ASCII word characters, whitespace
/// and hyphens, turns whitespace runs into single hyphens and trims hyphens
/// from both ends. Non-ASCII letters are dropped, so a heading written only in
/// them has an empty slug.
///
/// # Examples
///
/// ```
/// use mdview_renderer::slugify;
///
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("What's New?"), "whats-new");
/// ```
#[must_use]
pub fn slugify(text: &str) -> String {
    let lower = text.to_lowercase();
    let stripped = NON_SLUG_CHARS.replace_all(&lower, "");
    let hyphenated = WHITESPACE_RUNS.replace_all(&stripped, "-");
    let collapsed = HYPHEN_RUNS.replace_all(&hyphenated, "-");
    collapsed.trim_matches('-').to_owned()
}

/// Heading ids assigned during a single render.
///
/// Create a fresh instance per document; reusing one across documents would
/// shift duplicate numbering.
#[derive(Debug, Default)]
pub struct HeadingIds {
    used: HashSet<String>,
}

impl HeadingIds {
    /// Create an empty id set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a unique id for heading text and register it.
    ///
    /// Text without any slug characters falls back to `heading-<N>`, where N
    /// is the number of ids assigned so far. Collisions get `-1`, `-2`, ...
    pub fn assign(&mut self, text: &str) -> String {
        let mut base = slugify(text);
        if base.is_empty() {
            base = format!("heading-{}", self.used.len());
        }

        let mut id = base.clone();
        let mut counter = 1;
        while self.used.contains(&id) {
            id = format!("{base}-{counter}");
            counter += 1;
        }

        self.used.insert(id.clone());
        id
    }

    /// Number of ids assigned so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.used.len()
    }

    /// Whether no ids have been assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}
