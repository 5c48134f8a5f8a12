//! Heading anchor ids and table of contents.

use crate::slug::HeadingIds;
use crate::tree::Document;

/// Deepest heading level listed in the table of contents.
pub const TOC_MAX_LEVEL: u8 = 3;

/// Table of contents entry.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TocEntry {
    /// Heading level (1-3).
    pub level: u8,
    /// Heading text without inline formatting.
    pub title: String,
    /// Anchor ID for linking.
    pub id: String,
}

/// Give every heading an `id` and collect levels 1-3 into `toc`.
///
/// Deeper headings still get ids so in-page anchors behave the same at every
/// level.
pub(crate) fn assign_heading_ids(
    mut doc: Document,
    ids: &mut HeadingIds,
    toc: &mut Vec<TocEntry>,
) -> Document {
    doc.for_each_element_mut(&mut |el| {
        let Some(level) = el.heading_level() else {
            return;
        };
        let title = el.text_content().trim().to_owned();
        let id = ids.assign(&title);
        el.set_attr("id", id.clone());

        if level <= TOC_MAX_LEVEL {
            toc.push(TocEntry { level, title, id });
        }
    });
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Element, Node};

    fn heading(tag: &str, children: Vec<Node>) -> Node {
        Node::Element(Element::new(tag).with_children(children))
    }

    fn text(s: &str) -> Node {
        Node::Text(s.to_owned())
    }

    fn run(doc: Document) -> (String, Vec<TocEntry>) {
        let mut ids = HeadingIds::new();
        let mut toc = Vec::new();
        let doc = assign_heading_ids(doc, &mut ids, &mut toc);
        (doc.to_html(), toc)
    }

    #[test]
    fn test_heading_gets_id_and_toc_entry() {
        let (html, toc) = run(Document::new(vec![heading("h1", vec![text("Hello World")])]));
        assert_eq!(html, r#"<h1 id="hello-world">Hello World</h1>"#);
        assert_eq!(
            toc,
            vec![TocEntry {
                level: 1,
                title: "Hello World".to_owned(),
                id: "hello-world".to_owned(),
            }]
        );
    }

    #[test]
    fn test_title_ignores_inline_formatting() {
        let doc = Document::new(vec![heading(
            "h2",
            vec![
                text("Hello "),
                Node::Element(Element::new("strong").with_text("bold")),
                text(" world"),
            ],
        )]);
        let (_, toc) = run(doc);
        assert_eq!(toc[0].title, "Hello bold world");
        assert_eq!(toc[0].id, "hello-bold-world");
    }

    #[test]
    fn test_deep_headings_get_ids_but_no_toc() {
        let doc = Document::new(vec![
            heading("h4", vec![text("Deep")]),
            heading("h5", vec![text("Deeper")]),
            heading("h6", vec![text("Deepest")]),
        ]);
        let (html, toc) = run(doc);
        assert!(html.contains(r#"<h4 id="deep">"#));
        assert!(html.contains(r#"<h6 id="deepest">"#));
        assert!(toc.is_empty());
    }

    #[test]
    fn test_nested_headings_found() {
        let doc = Document::new(vec![Node::Element(
            Element::new("blockquote").with_children(vec![heading("h3", vec![text("Inside")])]),
        )]);
        let (_, toc) = run(doc);
        assert_eq!(toc.len(), 1);
        assert_eq!(toc[0].level, 3);
    }
}
