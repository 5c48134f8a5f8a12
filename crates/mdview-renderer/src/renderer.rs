//! Markdown rendering pipeline.

use std::sync::LazyLock;

use pulldown_cmark::{Options, Parser};

use crate::asset::{AssetProtocol, AssetUrlConverter};
use crate::autolink::link_bare_urls;
use crate::builder::build;
use crate::error::RenderError;
use crate::headings::{TocEntry, assign_heading_ids};
use crate::highlight::{Highlighter, contains_code_blocks, highlight_code_blocks};
use crate::images::resolve_images;
use crate::links::apply_link_policy;
use crate::sanitize::{SanitizeSchema, sanitize};
use crate::slug::HeadingIds;

static DEFAULT_RENDERER: LazyLock<MarkdownRenderer> = LazyLock::new(MarkdownRenderer::new);

/// Result of rendering markdown.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderResult {
    /// Sanitized, highlighted HTML.
    pub html: String,
    /// Table of contents entries for heading levels 1-3.
    pub toc: Vec<TocEntry>,
}

/// Markdown to safe HTML renderer.
///
/// Holds configuration only, so one instance can serve concurrent renders
/// from many threads. Every call gets its own document tree, heading ids and
/// table of contents.
///
/// # Pipeline
///
/// 1. Parse with pulldown-cmark and build the document tree (raw HTML dropped)
/// 2. Link bare URLs (GFM only)
/// 3. Assign heading ids and collect the table of contents
/// 4. Resolve image paths against the document directory
/// 5. Apply the link policy
/// 6. Sanitize against [`SanitizeSchema::markdown`]
/// 7. Serialize
/// 8. Highlight code blocks
///
/// # Example
///
/// ```
/// use mdview_renderer::MarkdownRenderer;
///
/// let result = MarkdownRenderer::new()
///     .render("# Hello World", None, false)
///     .unwrap();
/// assert_eq!(result.html, r#"<h1 id="hello-world">Hello World</h1>"#);
/// assert_eq!(result.toc[0].id, "hello-world");
/// ```
pub struct MarkdownRenderer {
    converter: Box<dyn AssetUrlConverter>,
    gfm: bool,
}

impl MarkdownRenderer {
    /// Create a renderer with GFM enabled and the default asset protocol.
    #[must_use]
    pub fn new() -> Self {
        Self {
            converter: Box::new(AssetProtocol::new()),
            gfm: true,
        }
    }

    /// Use a custom local path to resource URL conversion.
    #[must_use]
    pub fn with_asset_converter(mut self, converter: impl AssetUrlConverter + 'static) -> Self {
        self.converter = Box::new(converter);
        self
    }

    /// Enable or disable GitHub Flavored Markdown extensions.
    ///
    /// When disabled, tables, strikethrough, task lists, alerts and bare URL
    /// autolinks are not recognized.
    #[must_use]
    pub fn with_gfm(mut self, enabled: bool) -> Self {
        self.gfm = enabled;
        self
    }

    /// Parser options for the current configuration.
    #[must_use]
    pub fn parser_options(&self) -> Options {
        if self.gfm {
            Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_GFM
        } else {
            Options::empty()
        }
    }

    /// Render markdown to sanitized HTML and a table of contents.
    ///
    /// `file_dir` is the directory of the source document. Local images are
    /// resolved against it and may not escape it. Without it, image sources
    /// are left to the sanitizer.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Highlighter`] if the document has code blocks
    /// and the shared highlighter cannot be built, or
    /// [`RenderError::UnbalancedTree`] if the parser emits unbalanced events.
    pub fn render(
        &self,
        content: &str,
        file_dir: Option<&str>,
        is_dark: bool,
    ) -> Result<RenderResult, RenderError> {
        if content.is_empty() {
            return Ok(RenderResult::default());
        }

        let parser = Parser::new_ext(content, self.parser_options());
        let mut doc = build(parser)?;
        if self.gfm {
            doc = link_bare_urls(doc);
        }

        let mut ids = HeadingIds::new();
        let mut toc = Vec::new();
        let doc = assign_heading_ids(doc, &mut ids, &mut toc);
        let doc = resolve_images(doc, file_dir, self.converter.as_ref());
        let doc = apply_link_policy(doc);
        let doc = sanitize(doc, SanitizeSchema::shared());

        let mut html = doc.to_html();
        if contains_code_blocks(&html) {
            html = highlight_code_blocks(&html, is_dark, Highlighter::shared()?);
        }

        tracing::debug!(
            bytes = content.len(),
            headings = ids.len(),
            toc = toc.len(),
            "Rendered markdown"
        );
        Ok(RenderResult { html, toc })
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MarkdownRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkdownRenderer")
            .field("gfm", &self.gfm)
            .finish_non_exhaustive()
    }
}

/// Render markdown with the default renderer.
///
/// # Errors
///
/// See [`MarkdownRenderer::render`].
pub fn render_markdown(
    content: &str,
    file_dir: Option<&str>,
    is_dark: bool,
) -> Result<RenderResult, RenderError> {
    DEFAULT_RENDERER.render(content, file_dir, is_dark)
}

#[cfg(test)]
mod tests {
    // Ensure one renderer can be shared across threads
    static_assertions::assert_impl_all!(super::MarkdownRenderer: Send, Sync);
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(markdown: &str) -> RenderResult {
        render_markdown(markdown, None, false).unwrap()
    }

    fn render_in(markdown: &str, dir: &str) -> String {
        render_markdown(markdown, Some(dir), false).unwrap().html
    }

    fn entry(level: u8, title: &str, id: &str) -> TocEntry {
        TocEntry {
            level,
            title: title.to_owned(),
            id: id.to_owned(),
        }
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(render(""), RenderResult::default());
    }

    #[test]
    fn test_single_heading() {
        let result = render("# Hello World");
        assert_eq!(result.html, r#"<h1 id="hello-world">Hello World</h1>"#);
        assert_eq!(result.toc, vec![entry(1, "Hello World", "hello-world")]);
    }

    #[test]
    fn test_duplicate_headings() {
        let result = render("# Title\n\n# Title\n\n# Title");
        let ids: Vec<_> = result.toc.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["title", "title-1", "title-2"]);
        assert!(result.html.contains(r#"<h1 id="title-2">"#));
    }

    #[test]
    fn test_non_ascii_heading_letters_dropped_from_ids() {
        let result = render("# Café\n\n# 日本語");
        assert_eq!(
            result.toc,
            vec![entry(1, "Café", "caf"), entry(1, "日本語", "heading-1")]
        );
    }

    #[test]
    fn test_deep_headings_excluded_from_toc() {
        let result = render("## Two\n\n#### Four\n\n##### Five\n\n###### Six");
        assert_eq!(result.toc, vec![entry(2, "Two", "two")]);
        assert!(result.html.contains(r#"<h4 id="four">Four</h4>"#));
        assert!(result.html.contains(r#"<h6 id="six">Six</h6>"#));
    }

    #[test]
    fn test_symbol_heading_fallback_id() {
        let result = render("# $$$\n\n# Next");
        assert_eq!(result.toc[0].id, "heading-0");
        assert_eq!(result.toc[1].id, "next");
    }

    #[test]
    fn test_heading_title_includes_inline_code() {
        let result = render("## Using `cargo` *well*");
        assert_eq!(result.toc, vec![entry(2, "Using cargo well", "using-cargo-well")]);
    }

    #[test]
    fn test_external_link_marked() {
        assert_eq!(
            render("[site](https://example.com)").html,
            r#"<p><a href="https://example.com" data-external="true">site</a></p>"#
        );
    }

    #[test]
    fn test_unsafe_links_neutralized() {
        for markdown in [
            "[x](javascript:alert(1))",
            "[x](file:///etc/passwd)",
            "[x](data:text/html,hi)",
            "[x](other.md)",
        ] {
            assert_eq!(render(markdown).html, r##"<p><a href="#">x</a></p>"##, "{markdown}");
        }
    }

    #[test]
    fn test_anchor_and_mailto_links_kept() {
        assert_eq!(
            render("[top](#top) [me](mailto:me@example.com)").html,
            r##"<p><a href="#top">top</a> <a href="mailto:me@example.com">me</a></p>"##
        );
    }

    #[test]
    fn test_bare_url_autolinked_and_marked() {
        assert_eq!(
            render("see https://example.com").html,
            r#"<p>see <a href="https://example.com" data-external="true">https://example.com</a></p>"#
        );
    }

    #[test]
    fn test_local_image_resolved() {
        assert_eq!(
            render_in("![pic](img/a.png)", "/docs"),
            r#"<p><img src="asset://localhost/%2Fdocs%2Fimg%2Fa.png" alt="pic"></p>"#
        );
    }

    #[test]
    fn test_image_escapes_blocked() {
        assert_eq!(
            render_in("![x](../../etc/passwd)", "/docs/files"),
            r#"<p><img src="" alt="x"></p>"#
        );
        assert_eq!(
            render_in("![x](/absolute/image.png)", "/docs"),
            r#"<p><img src="" alt="x"></p>"#
        );
        assert_eq!(
            render_in("![x](data:image/png;base64,AAAA)", "/docs"),
            r#"<p><img src="" alt="x"></p>"#
        );
    }

    #[test]
    fn test_remote_image_passes() {
        assert_eq!(
            render_in("![x](https://example.com/a.png)", "/docs"),
            r#"<p><img src="https://example.com/a.png" alt="x"></p>"#
        );
    }

    #[test]
    fn test_image_without_base_dir_left_to_sanitizer() {
        assert_eq!(render("![x](img.png)").html, r#"<p><img src="img.png" alt="x"></p>"#);
        assert_eq!(render("![x](javascript:alert(1))").html, r#"<p><img alt="x"></p>"#);
    }

    #[test]
    fn test_custom_asset_converter() {
        let renderer = MarkdownRenderer::new()
            .with_asset_converter(|path: &str| format!("asset://localhost/{}", path.trim_start_matches('/')));
        let result = renderer.render("![x](a.png)", Some("/dir"), false).unwrap();
        assert_eq!(result.html, r#"<p><img src="asset://localhost/dir/a.png" alt="x"></p>"#);
    }

    #[test]
    fn test_raw_html_never_survives() {
        let html = render(
            "<script>alert(1)</script>\n\n<img src=x onerror=alert(1)>\n\n<iframe src=\"https://evil.example\"></iframe>\n\ntext",
        )
        .html;
        assert!(!html.contains("<script"));
        assert!(!html.contains("onerror"));
        assert!(!html.contains("<iframe"));
        assert!(html.contains("<p>text</p>"));
    }

    #[test]
    fn test_js_alias_highlighted() {
        let html = render("```js\nconst x = 1;\n```").html;
        assert!(html.starts_with(r#"<div class="highlight-container">"#));
        assert!(html.contains(r#"class="language-javascript""#));
        assert!(html.contains("<span style="));
    }

    #[test]
    fn test_unknown_language_does_not_fail() {
        let html = render("```notalanguage\nsome < code\n```").html;
        assert!(html.contains(r#"<div class="highlight-container">"#));
        assert!(html.contains("some &lt; code"));
        assert!(html.contains(r#"<code class="language-text">"#));
        assert!(!html.contains("notalanguage"));
    }

    #[test]
    fn test_ts_alias_highlighted() {
        let html = render("```ts
const x: number = 1;
```").html;
        assert!(html.contains(r#"class="language-typescript""#));
        assert!(html.matches("<span style=").count() > 1);
    }

    #[test]
    fn test_dark_mode_changes_code_colors() {
        let markdown = "```rust\nfn main() {}\n```";
        let light = render_markdown(markdown, None, false).unwrap().html;
        let dark = render_markdown(markdown, None, true).unwrap().html;
        assert_ne!(light, dark);
    }

    #[test]
    fn test_document_without_code_is_not_highlighted() {
        let html = render("plain `inline` text").html;
        assert_eq!(html, "<p>plain <code>inline</code> text</p>");
    }

    #[test]
    fn test_task_list_and_table() {
        let html = render("- [x] done\n\n| a |\n|:-:|\n| 1 |").html;
        assert!(html.contains(r#"<input type="checkbox" checked disabled>"#));
        assert!(html.contains(r#"<td align="center">1</td>"#));
    }

    #[test]
    fn test_gfm_disabled() {
        let renderer = MarkdownRenderer::new().with_gfm(false);
        let result = renderer.render("~~x~~ https://example.com", None, false).unwrap();
        assert_eq!(result.html, "<p>~~x~~ https://example.com</p>");
    }

    #[test]
    fn test_render_is_deterministic() {
        let markdown = "# A\n\n# A\n\n[l](https://x.y)\n\n```py\nx = 1\n```";
        assert_eq!(render(markdown), render(markdown));
    }

    #[test]
    fn test_concurrent_renders_are_independent() {
        let renderer = MarkdownRenderer::new();
        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| renderer.render("# Same\n\n```js\nlet a;\n```", None, false)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect()
        });
        for result in &results {
            assert_eq!(result, &results[0]);
            assert_eq!(result.toc, vec![entry(1, "Same", "same")]);
        }
    }

    #[test]
    fn test_stage_ordering() {
        // Highlighting runs after sanitizing, so its inline styles survive.
        let html = render("```rust\nlet x = 1;\n```").html;
        assert!(html.contains(r#"<pre class="highlight" style="#));

        // Link policy and image resolution run before the sanitizer, whose
        // schema allows their output.
        let html = render_in("[a](https://x.y) ![b](c.png)", "/d");
        assert!(html.contains(r#"data-external="true""#));
        assert!(html.contains(r#"src="asset://localhost/%2Fd%2Fc.png""#));

        // Ids are assigned before sanitizing and kept as a global attribute.
        assert!(render("# Kept").html.contains(r#"id="kept""#));
    }
}
