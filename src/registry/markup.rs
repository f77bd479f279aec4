//! A tiny, lenient markup tree for self-contained page fragments.
//!
//! Only small fragments cut out of a page are parsed here, never a whole
//! document. HTML quirks are tolerated: mismatched or stray end tags, void
//! elements written without a closing slash, attributes without values and
//! entities the XML reader does not know (kept verbatim).

use anyhow::{Context, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

const FRAGMENT_ROOT: &str = "#fragment";

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// All descendant elements named `tag`, in document order.
    pub fn descendants(&self, tag: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        self.collect_descendants(tag, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, tag: &str, found: &mut Vec<&'a Element>) {
        for child in &self.children {
            if let Node::Element(el) = child {
                if el.tag == tag {
                    found.push(el);
                }
                el.collect_descendants(tag, found);
            }
        }
    }

    /// First descendant element named `tag`.
    pub fn find(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find_map(|child| match child {
            Node::Element(el) if el.tag == tag => Some(el),
            Node::Element(el) => el.find(tag),
            Node::Text(_) => None,
        })
    }

    /// Text content with runs of whitespace collapsed to single spaces.
    pub fn text(&self) -> String {
        let mut raw = String::new();
        self.collect_text(&mut raw);
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(text) => {
                    out.push_str(text);
                    out.push(' ');
                }
                Node::Element(el) => el.collect_text(out),
            }
        }
    }
}

/// Parse a fragment into a tree. The returned element is a synthetic root
/// whose children are the fragment's top-level nodes.
pub fn parse_fragment(markup: &str) -> Result<Element> {
    let mut reader = Reader::from_str(markup);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut stack = vec![Element::new(FRAGMENT_ROOT)];

    loop {
        let event = reader
            .read_event()
            .with_context(|| format!("Malformed markup at byte {}", reader.buffer_position()))?;

        match event {
            Event::Start(ref e) => {
                let element = start_element(e);
                if VOID_ELEMENTS.contains(&element.tag.as_str()) {
                    append(&mut stack, Node::Element(element));
                } else {
                    stack.push(element);
                }
            }
            Event::Empty(ref e) => append(&mut stack, Node::Element(start_element(e))),
            Event::End(ref e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                close(&mut stack, &name);
            }
            Event::Text(ref e) => {
                let text = match e.unescape() {
                    Ok(text) => text.into_owned(),
                    Err(_) => String::from_utf8_lossy(e).into_owned(),
                };
                if !text.trim().is_empty() {
                    append(&mut stack, Node::Text(text));
                }
            }
            Event::CData(ref e) => {
                append(&mut stack, Node::Text(String::from_utf8_lossy(e).into_owned()))
            }
            Event::Eof => break,
            // Comments, declarations, processing instructions
            _ => {}
        }
    }

    while stack.len() > 1 {
        fold_top(&mut stack);
    }
    Ok(stack.pop().unwrap_or_else(|| Element::new(FRAGMENT_ROOT)))
}

fn start_element(e: &BytesStart<'_>) -> Element {
    let tag = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
    let attrs = e
        .html_attributes()
        .filter_map(|attr| attr.ok())
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
            let value = match attr.unescape_value() {
                Ok(value) => value.into_owned(),
                Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
            };
            (key, value)
        })
        .collect();

    Element {
        tag,
        attrs,
        children: Vec::new(),
    }
}

fn append(stack: &mut [Element], node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

/// Close the nearest open element named `name`, implicitly closing anything
/// opened after it. Stray end tags are ignored.
fn close(stack: &mut Vec<Element>, name: &str) {
    let Some(pos) = stack.iter().rposition(|el| el.tag == name) else {
        return;
    };
    if pos == 0 {
        return;
    }
    while stack.len() > pos {
        fold_top(stack);
    }
}

fn fold_top(stack: &mut Vec<Element>) {
    if stack.len() < 2 {
        return;
    }
    if let Some(top) = stack.pop() {
        append(stack, Node::Element(top));
    }
}
