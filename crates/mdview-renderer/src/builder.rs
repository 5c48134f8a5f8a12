//! Presentational tree construction from pulldown-cmark events.
//!
//! Raw HTML events are discarded here: literal markup in the source never
//! reaches the tree, so it can neither execute nor be sanitized into something
//! executable later.

use pulldown_cmark::{Alignment, BlockQuoteKind, CodeBlockKind, Event, HeadingLevel, Tag, TagEnd};

use crate::error::RenderError;
use crate::tree::{Document, Element, Node};

/// Build a document tree from parser events.
pub(crate) fn build<'a, I>(events: I) -> Result<Document, RenderError>
where
    I: Iterator<Item = Event<'a>>,
{
    let mut builder = TreeBuilder::default();
    for event in events {
        builder.process_event(event)?;
    }
    builder.finish()
}

/// State for tracking table rendering.
#[derive(Default)]
struct TableState {
    /// Column alignments for current table.
    alignments: Vec<Alignment>,
    /// Whether we're inside the table header row.
    in_head: bool,
    /// Whether `<tbody>` has been opened for the current table.
    body_open: bool,
    /// Current column index in table row.
    cell_index: usize,
}

impl TableState {
    fn start(&mut self, alignments: Vec<Alignment>) {
        self.alignments = alignments;
        self.in_head = false;
        self.body_open = false;
        self.cell_index = 0;
    }

    fn start_row(&mut self) {
        self.cell_index = 0;
    }

    fn next_cell(&mut self) {
        self.cell_index += 1;
    }

    /// Value of the `align` attribute for the current cell.
    fn current_alignment(&self) -> Option<&'static str> {
        match self.alignments.get(self.cell_index) {
            Some(Alignment::Left) => Some("left"),
            Some(Alignment::Center) => Some("center"),
            Some(Alignment::Right) => Some("right"),
            Some(Alignment::None) | None => None,
        }
    }
}

#[derive(Default)]
struct TreeBuilder {
    root: Vec<Node>,
    stack: Vec<Element>,
    table: TableState,
    dropped_html: usize,
}

impl TreeBuilder {
    fn process_event(&mut self, event: Event<'_>) -> Result<(), RenderError> {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag)?,
            Event::Text(text) => self.push_text(&text),
            Event::Code(code) => self.append(Element::new("code").with_text(code.as_ref())),
            Event::Html(_) | Event::InlineHtml(_) => self.dropped_html += 1,
            Event::SoftBreak => self.push_text("\n"),
            Event::HardBreak => {
                self.append(Element::new("br"));
                self.push_text("\n");
            }
            Event::Rule => self.append(Element::new("hr")),
            Event::TaskListMarker(checked) => self.task_list_marker(checked),
            Event::FootnoteReference(_) | Event::InlineMath(_) | Event::DisplayMath(_) => {
                // Not enabled in parser options
            }
        }
        Ok(())
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.open(Element::new("p")),
            Tag::Heading { level, .. } => self.open(Element::new(heading_tag(level))),
            Tag::BlockQuote(kind) => {
                let mut quote = Element::new("blockquote");
                if let Some(kind) = kind {
                    quote.add_class("alert");
                    quote.add_class(alert_class(kind));
                }
                self.open(quote);
            }
            Tag::CodeBlock(kind) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(ref info) => info.split_whitespace().next(),
                    CodeBlockKind::Indented => None,
                };
                let mut code = Element::new("code");
                if let Some(lang) = lang {
                    code.set_attr("class", format!("language-{lang}"));
                }
                self.open(Element::new("pre"));
                self.open(code);
            }
            Tag::List(start) => match start {
                Some(1) => self.open(Element::new("ol")),
                Some(n) => self.open(Element::new("ol").with_attr("start", n.to_string())),
                None => self.open(Element::new("ul")),
            },
            Tag::Item => self.open(Element::new("li")),
            Tag::FootnoteDefinition(_) | Tag::HtmlBlock | Tag::MetadataBlock(_) => {}
            Tag::DefinitionList => self.open(Element::new("dl")),
            Tag::DefinitionListTitle => self.open(Element::new("dt")),
            Tag::DefinitionListDefinition => self.open(Element::new("dd")),
            Tag::Table(alignments) => {
                self.table.start(alignments);
                self.open(Element::new("table"));
            }
            Tag::TableHead => {
                self.table.in_head = true;
                self.table.start_row();
                self.open(Element::new("thead"));
                self.open(Element::new("tr"));
            }
            Tag::TableRow => {
                if !self.table.body_open {
                    self.table.body_open = true;
                    self.open(Element::new("tbody"));
                }
                self.table.start_row();
                self.open(Element::new("tr"));
            }
            Tag::TableCell => {
                let mut cell = Element::new(if self.table.in_head { "th" } else { "td" });
                if let Some(align) = self.table.current_alignment() {
                    cell.set_attr("align", align);
                }
                self.open(cell);
            }
            Tag::Emphasis => self.open(Element::new("em")),
            Tag::Strong => self.open(Element::new("strong")),
            Tag::Strikethrough => self.open(Element::new("del")),
            Tag::Superscript => self.open(Element::new("sup")),
            Tag::Subscript => self.open(Element::new("sub")),
            Tag::Link {
                dest_url, title, ..
            } => {
                let mut link = Element::new("a").with_attr("href", dest_url.as_ref());
                if !title.is_empty() {
                    link.set_attr("title", title.as_ref());
                }
                self.open(link);
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                // Alt text is collected as children and folded into `alt` on close
                let mut image = Element::new("img").with_attr("src", dest_url.as_ref());
                if !title.is_empty() {
                    image.set_attr("title", title.as_ref());
                }
                self.open(image);
            }
        }
    }

    fn end_tag(&mut self, tag: TagEnd) -> Result<(), RenderError> {
        match tag {
            TagEnd::Paragraph => self.close("p"),
            TagEnd::Heading(level) => self.close(heading_tag(level)),
            TagEnd::BlockQuote(_) => self.close("blockquote"),
            TagEnd::CodeBlock => {
                self.close("code")?;
                self.close("pre")
            }
            TagEnd::List(ordered) => self.close(if ordered { "ol" } else { "ul" }),
            TagEnd::Item => self.close("li"),
            TagEnd::FootnoteDefinition | TagEnd::HtmlBlock | TagEnd::MetadataBlock(_) => Ok(()),
            TagEnd::DefinitionList => self.close("dl"),
            TagEnd::DefinitionListTitle => self.close("dt"),
            TagEnd::DefinitionListDefinition => self.close("dd"),
            TagEnd::Table => {
                if self.table.body_open {
                    self.close("tbody")?;
                }
                self.close("table")
            }
            TagEnd::TableHead => {
                self.table.in_head = false;
                self.close("tr")?;
                self.close("thead")
            }
            TagEnd::TableRow => self.close("tr"),
            TagEnd::TableCell => {
                self.table.next_cell();
                self.close(if self.table.in_head { "th" } else { "td" })
            }
            TagEnd::Emphasis => self.close("em"),
            TagEnd::Strong => self.close("strong"),
            TagEnd::Strikethrough => self.close("del"),
            TagEnd::Superscript => self.close("sup"),
            TagEnd::Subscript => self.close("sub"),
            TagEnd::Link => self.close("a"),
            TagEnd::Image => self.close_image(),
        }
    }

    fn open(&mut self, element: Element) {
        self.stack.push(element);
    }

    fn close(&mut self, tag: &str) -> Result<(), RenderError> {
        let element = self.pop(tag)?;
        self.append(element);
        Ok(())
    }

    fn close_image(&mut self) -> Result<(), RenderError> {
        let open = self.pop("img")?;
        let mut image = Element::new("img").with_attr("src", open.attr("src").unwrap_or(""));
        image.set_attr("alt", open.text_content());
        if let Some(title) = open.attr("title") {
            image.set_attr("title", title);
        }
        self.append(image);
        Ok(())
    }

    fn pop(&mut self, tag: &str) -> Result<Element, RenderError> {
        match self.stack.pop() {
            Some(element) if element.tag == tag => Ok(element),
            _ => Err(RenderError::UnbalancedTree(tag.to_owned())),
        }
    }

    fn append(&mut self, element: Element) {
        self.children_mut().push(Node::Element(element));
    }

    /// Append text, merging with a preceding text node.
    fn push_text(&mut self, text: &str) {
        let children = self.children_mut();
        if let Some(Node::Text(last)) = children.last_mut() {
            last.push_str(text);
        } else {
            children.push(Node::Text(text.to_owned()));
        }
    }

    fn children_mut(&mut self) -> &mut Vec<Node> {
        match self.stack.last_mut() {
            Some(top) => &mut top.children,
            None => &mut self.root,
        }
    }

    fn task_list_marker(&mut self, checked: bool) {
        let mut checkbox = Element::new("input").with_attr("type", "checkbox");
        if checked {
            checkbox.set_attr("checked", "");
        }
        checkbox.set_attr("disabled", "");
        self.append(checkbox);
        self.push_text(" ");

        if let Some(item) = self.stack.iter().rposition(|el| el.tag == "li") {
            self.stack[item].add_class("task-list-item");
            if let Some(list) = item.checked_sub(1).map(|i| &mut self.stack[i])
                && (list.tag == "ul" || list.tag == "ol")
            {
                list.add_class("contains-task-list");
            }
        }
    }

    fn finish(self) -> Result<Document, RenderError> {
        if let Some(open) = self.stack.last() {
            return Err(RenderError::UnbalancedTree(open.tag.clone()));
        }
        if self.dropped_html > 0 {
            tracing::debug!(count = self.dropped_html, "Dropped raw HTML from markdown source");
        }
        Ok(Document::new(self.root))
    }
}

fn heading_tag(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
}

fn alert_class(kind: BlockQuoteKind) -> &'static str {
    match kind {
        BlockQuoteKind::Note => "alert-note",
        BlockQuoteKind::Tip => "alert-tip",
        BlockQuoteKind::Important => "alert-important",
        BlockQuoteKind::Warning => "alert-warning",
        BlockQuoteKind::Caution => "alert-caution",
    }
}
