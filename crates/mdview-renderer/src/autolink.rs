//! GFM autolink literals.
//!
//! Turns bare `http://`, `https://`, `www.` URLs and e-mail addresses in text
//! nodes into links. Text inside existing links and code is left alone.

use std::sync::LazyLock;

use regex::Regex;

use crate::tree::{Document, Element, Node};

/// Candidate autolink literals. Trailing punctuation is trimmed afterwards.
static LITERAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:(?:https?://|www\.)[^\s<]+|[a-z0-9._+-]+@[a-z0-9-]+(?:\.[a-z0-9-]+)+)",
    )
    .expect("invalid autolink regex")
});

/// Elements whose text is never autolinked.
const SKIP_ELEMENTS: &[&str] = &["a", "code", "pre"];

/// Link bare URLs and e-mail addresses in the document.
pub(crate) fn link_bare_urls(mut doc: Document) -> Document {
    doc.children = link_nodes(std::mem::take(&mut doc.children));
    doc
}

fn link_nodes(nodes: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Text(text) => split_literals(&text, &mut out),
            Node::Element(mut el) => {
                if !SKIP_ELEMENTS.contains(&el.tag.as_str()) {
                    el.children = link_nodes(std::mem::take(&mut el.children));
                }
                out.push(Node::Element(el));
            }
        }
    }
    out
}

/// Split text into plain text and link nodes.
fn split_literals(text: &str, out: &mut Vec<Node>) {
    let mut last = 0;

    for found in LITERAL_PATTERN.find_iter(text) {
        if found.start() < last {
            continue;
        }
        let literal = trim_literal(found.as_str());
        let Some(href) = literal_href(literal) else {
            continue;
        };

        if found.start() > last {
            out.push(Node::Text(text[last..found.start()].to_owned()));
        }
        out.push(Node::Element(
            Element::new("a").with_attr("href", href).with_text(literal),
        ));
        last = found.start() + literal.len();
    }

    if last < text.len() {
        out.push(Node::Text(text[last..].to_owned()));
    }
}

/// Strip trailing punctuation and unbalanced closing parentheses.
fn trim_literal(mut literal: &str) -> &str {
    loop {
        let Some(last) = literal.chars().last() else {
            return literal;
        };
        let strip = match last {
            '?' | '!' | '.' | ',' | ':' | '*' | '_' | '~' | '\'' | '"' | ';' => true,
            ')' => literal.matches(')').count() > literal.matches('(').count(),
            _ => false,
        };
        if !strip {
            return literal;
        }
        literal = &literal[..literal.len() - last.len_utf8()];
    }
}

/// Link target for a trimmed literal, or `None` when nothing linkable is left.
fn literal_href(literal: &str) -> Option<String> {
    let lower = literal.to_ascii_lowercase();
    for scheme in ["http://", "https://"] {
        if lower.starts_with(scheme) {
            return (literal.len() > scheme.len()).then(|| literal.to_owned());
        }
    }
    if lower.starts_with("www.") {
        return (literal.len() > "www.".len()).then(|| format!("http://{literal}"));
    }
    if literal.contains('@') && !literal.ends_with('-') {
        return Some(format!("mailto:{literal}"));
    }
    None
}
