//! Allow-list sanitizer for the document tree.
//!
//! Runs after every other tree stage. Elements outside the schema are
//! unwrapped, elements that can execute or embed content are dropped together
//! with their children, and attributes are filtered per tag and per URL
//! scheme.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use crate::tree::{Document, Element, Node};

/// Elements removed with all of their content, whatever the schema says.
const FORBIDDEN_TAGS: &[&str] = &[
    "applet", "base", "button", "embed", "form", "frame", "frameset", "iframe", "link", "math",
    "meta", "noscript", "object", "option", "script", "select", "style", "svg", "template",
    "textarea",
];

const ALLOWED_TAGS: &[&str] = &[
    "a", "b", "blockquote", "br", "code", "dd", "del", "details", "div", "dl", "dt", "em", "h1",
    "h2", "h3", "h4", "h5", "h6", "hr", "i", "img", "input", "ins", "kbd", "li", "ol", "p", "pre",
    "q", "s", "samp", "section", "span", "strike", "strong", "sub", "summary", "sup", "table",
    "tbody", "td", "tfoot", "th", "thead", "tr", "tt", "ul", "var",
];

const GLOBAL_ATTRIBUTES: &[&str] = &["id", "class", "lang", "dir"];

const TAG_ATTRIBUTES: &[(&str, &[&str])] = &[
    ("a", &["href", "title", "data-external"]),
    ("img", &["src", "alt", "title", "width", "height"]),
    ("input", &["type", "checked", "disabled"]),
    ("ol", &["start"]),
    ("th", &["align", "colspan", "rowspan"]),
    ("td", &["align", "colspan", "rowspan"]),
    ("blockquote", &["cite"]),
    ("q", &["cite"]),
    ("del", &["cite"]),
    ("ins", &["cite"]),
    ("details", &["open"]),
];

const PROTOCOLS: &[(&str, &[&str])] = &[
    ("href", &["http", "https", "mailto"]),
    ("src", &["http", "https", "asset"]),
    ("cite", &["http", "https"]),
];

static SCHEMA: LazyLock<SanitizeSchema> = LazyLock::new(SanitizeSchema::markdown);

/// Allowed tags, attributes and URL schemes.
#[derive(Clone, Debug)]
pub struct SanitizeSchema {
    tags: HashSet<&'static str>,
    global_attributes: HashSet<&'static str>,
    tag_attributes: HashMap<&'static str, HashSet<&'static str>>,
    protocols: HashMap<&'static str, HashSet<&'static str>>,
}

impl SanitizeSchema {
    /// Schema for rendered markdown.
    #[must_use]
    pub fn markdown() -> Self {
        Self {
            tags: ALLOWED_TAGS.iter().copied().collect(),
            global_attributes: GLOBAL_ATTRIBUTES.iter().copied().collect(),
            tag_attributes: TAG_ATTRIBUTES
                .iter()
                .map(|(tag, attrs)| (*tag, attrs.iter().copied().collect()))
                .collect(),
            protocols: PROTOCOLS
                .iter()
                .map(|(attr, schemes)| (*attr, schemes.iter().copied().collect()))
                .collect(),
        }
    }

    /// Process-wide markdown schema.
    #[must_use]
    pub fn shared() -> &'static Self {
        &SCHEMA
    }

    /// Whether the element may appear in output.
    #[must_use]
    pub fn allows_tag(&self, tag: &str) -> bool {
        !is_forbidden(tag) && self.tags.contains(tag)
    }

    /// Whether the attribute may appear on the element. Values are not checked.
    #[must_use]
    pub fn allows_attribute(&self, tag: &str, attr: &str) -> bool {
        if is_event_handler(attr) {
            return false;
        }
        self.global_attributes.contains(attr)
            || self
                .tag_attributes
                .get(tag)
                .is_some_and(|attrs| attrs.contains(attr))
    }

    /// Whether a URL value is acceptable for the attribute.
    ///
    /// Attributes without a protocol list accept any value. Relative values
    /// (no scheme before the first `/`, `?` or `#`) are always accepted.
    #[must_use]
    pub fn allows_url(&self, attr: &str, value: &str) -> bool {
        let Some(allowed) = self.protocols.get(attr) else {
            return true;
        };
        match url_scheme(value) {
            Some(scheme) => allowed.contains(scheme.as_str()),
            None => true,
        }
    }
}

impl Default for SanitizeSchema {
    fn default() -> Self {
        Self::markdown()
    }
}

fn is_forbidden(tag: &str) -> bool {
    FORBIDDEN_TAGS.contains(&tag)
}

fn is_event_handler(attr: &str) -> bool {
    attr.get(..2)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("on"))
}

/// Lower-cased scheme of a URL, ignoring whitespace and control characters
/// the way browsers do.
fn url_scheme(value: &str) -> Option<String> {
    let cleaned: String = value
        .chars()
        .filter(|c| !c.is_ascii_control() && !c.is_ascii_whitespace())
        .collect();
    let end = cleaned.find([':', '/', '?', '#'])?;
    cleaned[end..]
        .starts_with(':')
        .then(|| cleaned[..end].to_ascii_lowercase())
}

#[derive(Default)]
struct Removed {
    elements: usize,
    unwrapped: usize,
    attributes: usize,
}

/// Remove everything the schema does not allow.
pub(crate) fn sanitize(mut doc: Document, schema: &SanitizeSchema) -> Document {
    let mut removed = Removed::default();
    doc.children = sanitize_nodes(std::mem::take(&mut doc.children), schema, &mut removed);

    if removed.elements + removed.unwrapped + removed.attributes > 0 {
        tracing::debug!(
            elements = removed.elements,
            unwrapped = removed.unwrapped,
            attributes = removed.attributes,
            "Sanitized document"
        );
    }
    doc
}

fn sanitize_nodes(nodes: Vec<Node>, schema: &SanitizeSchema, removed: &mut Removed) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Text(text) => out.push(Node::Text(text)),
            Node::Element(el) => sanitize_element(el, schema, removed, &mut out),
        }
    }
    out
}

fn sanitize_element(
    mut el: Element,
    schema: &SanitizeSchema,
    removed: &mut Removed,
    out: &mut Vec<Node>,
) {
    el.tag.make_ascii_lowercase();

    if is_forbidden(&el.tag) {
        removed.elements += 1;
        return;
    }
    if !schema.allows_tag(&el.tag) {
        removed.unwrapped += 1;
        out.extend(sanitize_nodes(el.children, schema, removed));
        return;
    }
    if el.tag == "input" && !el.attr("type").is_some_and(|t| t.eq_ignore_ascii_case("checkbox")) {
        removed.elements += 1;
        return;
    }

    let before = el.attrs.len();
    let tag = el.tag.as_str();
    el.attrs.retain(|(name, value)| {
        schema.allows_attribute(tag, name) && schema.allows_url(name, value)
    });
    removed.attributes += before - el.attrs.len();

    el.children = sanitize_nodes(std::mem::take(&mut el.children), schema, removed);
    out.push(Node::Element(el));
}
