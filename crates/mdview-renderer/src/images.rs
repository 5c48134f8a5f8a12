//! Image source resolution against the document directory.
//!
//! Remote `http(s)` images pass through. Every other scheme is blocked. Local
//! references are joined to the document directory, normalized, and must stay
//! inside it; anything else resolves to an empty `src`.

use crate::asset::AssetUrlConverter;
use crate::tree::Document;

/// Resolve one image `src` against a trusted base directory.
///
/// Returns an empty string when the reference is blocked.
///
/// # Examples
///
/// ```
/// use mdview_renderer::{AssetProtocol, resolve_image};
///
/// let converter = AssetProtocol::new();
/// assert_eq!(resolve_image("../../etc/passwd", "/docs/files", &converter), "");
/// assert_eq!(
///     resolve_image("./img/a.png", "/docs", &converter),
///     "asset://localhost/%2Fdocs%2Fimg%2Fa.png"
/// );
/// ```
pub fn resolve_image(src: &str, base_dir: &str, converter: &dyn AssetUrlConverter) -> String {
    resolve_against(src, &normalize_path(base_dir), converter)
}

/// Rewrite the `src` of every image in the document.
///
/// Without a document directory the stage leaves images untouched.
pub(crate) fn resolve_images(
    mut doc: Document,
    base_dir: Option<&str>,
    converter: &dyn AssetUrlConverter,
) -> Document {
    let Some(base_dir) = base_dir.filter(|dir| !dir.is_empty()) else {
        return doc;
    };
    let base = normalize_path(base_dir);

    doc.for_each_element_mut(&mut |el| {
        if el.tag != "img" {
            return;
        }
        let Some(src) = el.attr("src").filter(|src| !src.is_empty()).map(str::to_owned) else {
            return;
        };
        let resolved = resolve_against(&src, &base, converter);
        if resolved.is_empty() {
            tracing::debug!(src = %src, "Blocked image source");
        }
        el.set_attr("src", resolved);
    });
    doc
}

fn resolve_against(src: &str, base: &str, converter: &dyn AssetUrlConverter) -> String {
    if src.starts_with("http://") || src.starts_with("https://") {
        return src.to_owned();
    }

    // data:, javascript:, file:, ftp:, drive letters, ...
    if src.contains(':') {
        return String::new();
    }

    let joined = if src.starts_with('/') {
        src.to_owned()
    } else {
        let relative = src.strip_prefix("./").unwrap_or(src);
        join(base, relative)
    };
    let resolved = normalize_path(&joined);

    if !is_within(&resolved, base) {
        return String::new();
    }

    converter.to_asset_url(&resolved)
}

/// Resolve `.` and `..` segments with forward slashes.
///
/// `..` pops the last kept segment, `.` and empty segments are dropped, and a
/// leading `/` is preserved.
///
/// # Examples
///
/// ```
/// use mdview_renderer::normalize_path;
///
/// assert_eq!(normalize_path("/docs/./a/../b.png"), "/docs/b.png");
/// assert_eq!(normalize_path(r"C:\Users\docs"), "C:/Users/docs");
/// ```
pub fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();

    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    let prefix = if unified.starts_with('/') { "/" } else { "" };
    format!("{prefix}{}", segments.join("/"))
}

fn join(base: &str, relative: &str) -> String {
    if base.is_empty() {
        relative.to_owned()
    } else if base.ends_with('/') {
        format!("{base}{relative}")
    } else {
        format!("{base}/{relative}")
    }
}

/// Whether `path` is `base` or lies below it on a segment boundary.
///
/// An empty base (the directory normalized away) contains nothing.
fn is_within(path: &str, base: &str) -> bool {
    if base.is_empty() {
        return false;
    }
    if base == "/" {
        return path.starts_with('/');
    }
    path == base
        || path
            .strip_prefix(base)
            .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetProtocol;
    use crate::tree::{Element, Node};

    /// Mirrors the desktop runtime's conversion without percent-encoding.
    fn converter() -> impl AssetUrlConverter {
        |path: &str| format!("asset://localhost/{}", path.trim_start_matches('/'))
    }

    fn resolve(src: &str, base: &str) -> String {
        resolve_image(src, base, &converter())
    }

    #[test]
    fn test_remote_images_pass_through() {
        assert_eq!(
            resolve("https://example.com/img.png", "/dir"),
            "https://example.com/img.png"
        );
        assert_eq!(
            resolve("http://example.com/img.png", "/dir"),
            "http://example.com/img.png"
        );
    }

    #[test]
    fn test_other_schemes_blocked() {
        for src in [
            "data:image/png;base64,abc",
            "javascript:alert(1)",
            "ftp://server/img.png",
            "file:///etc/passwd",
            "C:/Windows/img.png",
            "HTTPS://example.com/img.png",
        ] {
            assert_eq!(resolve(src, "/docs"), "", "{src} should be blocked");
        }
    }

    #[test]
    fn test_relative_images_resolved() {
        assert_eq!(
            resolve("image.png", "/docs"),
            "asset://localhost/docs/image.png"
        );
        assert_eq!(
            resolve("./image.png", "/docs"),
            "asset://localhost/docs/image.png"
        );
        assert_eq!(
            resolve("img/../pics/./a.png", "/docs"),
            "asset://localhost/docs/pics/a.png"
        );
    }

    #[test]
    fn test_traversal_blocked() {
        assert_eq!(resolve("../../etc/passwd", "/docs/files"), "");
        assert_eq!(resolve("../sibling/a.png", "/docs/files"), "");
        assert_eq!(resolve(r"..\..\etc\passwd", "/docs/files"), "");
    }

    #[test]
    fn test_absolute_outside_base_blocked() {
        assert_eq!(resolve("/absolute/image.png", "/docs"), "");
    }

    #[test]
    fn test_absolute_inside_base_allowed() {
        assert_eq!(
            resolve("/docs/a/b.png", "/docs"),
            "asset://localhost/docs/a/b.png"
        );
    }

    #[test]
    fn test_sibling_prefix_directory_blocked() {
        assert_eq!(resolve("/docs2/secret.png", "/docs"), "");
        assert_eq!(resolve("../docs2/secret.png", "/docs"), "");
    }

    #[test]
    fn test_windows_base_directory() {
        assert_eq!(
            resolve("image.png", r"C:\Users\docs"),
            "asset://localhost/C:/Users/docs/image.png"
        );
    }

    #[test]
    fn test_root_base_directory() {
        assert_eq!(resolve("a.png", "/"), "asset://localhost/a.png");
    }

    #[test]
    fn test_base_normalizing_to_empty_blocks_local() {
        assert_eq!(resolve("a.png", "."), "");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/a/b/../c"), "/a/c");
        assert_eq!(normalize_path("a//b/./c/"), "a/b/c");
        assert_eq!(normalize_path("/../../x"), "/x");
        assert_eq!(normalize_path("/"), "/");
    }

    #[test]
    fn test_stage_without_base_dir_is_noop() {
        let doc = Document::new(vec![Node::Element(
            Element::new("img").with_attr("src", "javascript:alert(1)"),
        )]);
        let doc = resolve_images(doc, None, &AssetProtocol::new());
        assert_eq!(doc.to_html(), r#"<img src="javascript:alert(1)">"#);

        let doc = resolve_images(doc, Some(""), &AssetProtocol::new());
        assert_eq!(doc.to_html(), r#"<img src="javascript:alert(1)">"#);
    }

    #[test]
    fn test_stage_rewrites_every_image() {
        let doc = Document::new(vec![
            Node::Element(Element::new("img").with_attr("src", "a.png").with_attr("alt", "a")),
            Node::Element(Element::new("img").with_attr("src", "data:x")),
        ]);
        let doc = resolve_images(doc, Some("/docs"), &converter());
        assert_eq!(
            doc.to_html(),
            r#"<img src="asset://localhost/docs/a.png" alt="a"><img src="">"#
        );
    }
}
