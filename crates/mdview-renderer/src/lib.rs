//! Markdown to safe HTML rendering for a local document viewer.
//!
//! Untrusted markdown is parsed with pulldown-cmark into an owned document
//! tree, rewritten by a fixed sequence of stages and serialized to HTML. Code
//! blocks are then highlighted with syntect.
//!
//! # Security
//!
//! Every policy fails closed:
//! - raw HTML in the source is dropped while building the tree
//! - links other than `http(s)`, `mailto:` and `#fragment` become `#`
//! - local images must stay inside the document directory
//! - the sanitizer removes anything outside [`SanitizeSchema::markdown`]
//!
//! # Example
//!
//! ```
//! use mdview_renderer::render_markdown;
//!
//! let result = render_markdown(
//!     "# Intro\n\n[site](https://example.com) ![logo](./logo.png)",
//!     Some("/home/user/docs"),
//!     false,
//! )
//! .unwrap();
//!
//! assert_eq!(result.toc[0].id, "intro");
//! assert!(result.html.contains(r#"data-external="true""#));
//! assert!(result.html.contains("asset://localhost/%2Fhome%2Fuser%2Fdocs%2Flogo.png"));
//! ```

mod asset;
mod autolink;
mod builder;
mod error;
mod headings;
mod highlight;
mod images;
mod links;
mod renderer;
mod sanitize;
mod slug;
mod tree;

pub use asset::{ASSET_SCHEME, AssetProtocol, AssetUrlConverter};
pub use error::RenderError;
pub use headings::{TOC_MAX_LEVEL, TocEntry};
pub use highlight::{
    CONTAINER_CLASS, CodeHighlighter, DARK_THEME, HighlightError, Highlighter, LIGHT_THEME,
    canonical_language, contains_code_blocks, highlight_code_blocks, warm_up,
};
pub use images::{normalize_path, resolve_image};
pub use links::{EXTERNAL_ATTR, LinkKind, classify_href};
pub use renderer::{MarkdownRenderer, RenderResult, render_markdown};
pub use sanitize::SanitizeSchema;
pub use slug::{HeadingIds, slugify};
pub use tree::{Document, Element, Node, escape_html};
