//! Link classification and rewriting.
//!
//! External links are marked for the host, in-page anchors and `mailto:` links
//! are kept, and every other target is neutralized to `#`.

use crate::tree::Document;

/// Attribute marking links the host opens outside the viewer.
pub const EXTERNAL_ATTR: &str = "data-external";

/// Classification of a link target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkKind {
    /// `http://` or `https://` URL.
    External,
    /// In-page `#fragment`.
    Anchor,
    /// `mailto:` address.
    Mailto,
    /// Anything else, including relative paths and unknown schemes.
    Blocked,
}

/// Classify an `href` value. Prefixes are matched case-insensitively.
///
/// # Examples
///
/// ```
/// use mdview_renderer::{LinkKind, classify_href};
///
/// assert_eq!(classify_href("https://example.com"), LinkKind::External);
/// assert_eq!(classify_href("#section"), LinkKind::Anchor);
/// assert_eq!(classify_href("javascript:alert(1)"), LinkKind::Blocked);
/// ```
#[must_use]
pub fn classify_href(href: &str) -> LinkKind {
    if has_prefix(href, "http://") || has_prefix(href, "https://") {
        LinkKind::External
    } else if href.starts_with('#') {
        LinkKind::Anchor
    } else if has_prefix(href, "mailto:") {
        LinkKind::Mailto
    } else {
        LinkKind::Blocked
    }
}

// Schemes are case-insensitive (RFC 3986), so `HTTPS://` is external rather
// than rewritten to `#`.
fn has_prefix(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Apply the link policy to every `<a>` with an `href`.
pub(crate) fn apply_link_policy(mut doc: Document) -> Document {
    let mut blocked = 0usize;

    doc.for_each_element_mut(&mut |el| {
        if el.tag != "a" {
            return;
        }
        let Some(kind) = el.attr("href").map(classify_href) else {
            return;
        };

        match kind {
            LinkKind::External => el.set_attr(EXTERNAL_ATTR, "true"),
            LinkKind::Anchor | LinkKind::Mailto => {
                el.remove_attr(EXTERNAL_ATTR);
            }
            LinkKind::Blocked => {
                el.set_attr("href", "#");
                el.remove_attr(EXTERNAL_ATTR);
                blocked += 1;
            }
        }
    });

    if blocked > 0 {
        tracing::debug!(count = blocked, "Neutralized link targets");
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Element, Node};
    use pretty_assertions::assert_eq;

    fn apply(link: Element) -> String {
        apply_link_policy(Document::new(vec![Node::Element(link)])).to_html()
    }

    fn link(href: &str) -> Element {
        Element::new("a").with_attr("href", href).with_text("x")
    }

    #[test]
    fn test_classify_href() {
        assert_eq!(classify_href("http://example.com"), LinkKind::External);
        assert_eq!(classify_href("HTTPS://EXAMPLE.COM"), LinkKind::External);
        assert_eq!(classify_href("#top"), LinkKind::Anchor);
        assert_eq!(classify_href("mailto:a@b.c"), LinkKind::Mailto);
        assert_eq!(classify_href("MailTo:a@b.c"), LinkKind::Mailto);
        assert_eq!(classify_href("./other.md"), LinkKind::Blocked);
        assert_eq!(classify_href("file:///etc/passwd"), LinkKind::Blocked);
        assert_eq!(classify_href("JavaScript:alert(1)"), LinkKind::Blocked);
        assert_eq!(classify_href(""), LinkKind::Blocked);
    }

    // A case-sensitive prefix check would block these; both are kept.
    #[test]
    fn test_uppercase_scheme_is_not_blocked() {
        assert_eq!(classify_href("HTTPS://a.b"), LinkKind::External);
        assert_eq!(classify_href("Http://a.b"), LinkKind::External);
        assert_eq!(
            apply(link("HTTPS://a.b")),
            r#"<a href="HTTPS://a.b" data-external="true">x</a>"#
        );
    }

    #[test]
    fn test_classify_multibyte_prefix_does_not_panic() {
        assert_eq!(classify_href("ééé"), LinkKind::Blocked);
    }

    #[test]
    fn test_external_link_marked() {
        assert_eq!(
            apply(link("https://example.com")),
            r#"<a href="https://example.com" data-external="true">x</a>"#
        );
    }

    #[test]
    fn test_anchor_and_mailto_kept() {
        assert_eq!(apply(link("#section")), r##"<a href="#section">x</a>"##);
        assert_eq!(
            apply(link("mailto:me@example.com")),
            r#"<a href="mailto:me@example.com">x</a>"#
        );
    }

    #[test]
    fn test_blocked_link_neutralized() {
        assert_eq!(apply(link("javascript:alert(1)")), r##"<a href="#">x</a>"##);
        assert_eq!(apply(link("../secret.md")), r##"<a href="#">x</a>"##);
    }

    #[test]
    fn test_stray_external_marker_removed() {
        let forged = link("file:///etc/passwd").with_attr(EXTERNAL_ATTR, "true");
        assert_eq!(apply(forged), r##"<a href="#">x</a>"##);
    }

    #[test]
    fn test_link_without_href_untouched() {
        let anchor = Element::new("a").with_attr("title", "t").with_text("x");
        assert_eq!(apply(anchor), r#"<a title="t">x</a>"#);
    }
}
