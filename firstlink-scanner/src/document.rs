// Flattened paragraph model and the HTML parser that produces it

use crate::error::{Result, ScanError};
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use tracing::debug;

/// Paragraphs inside the article body of a Wikipedia page
pub const CONTENT_PARAGRAPHS: &str = "#mw-content-text p";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text { text: String },
    Element(ElementNode),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text { text: text.into() }
    }

    pub fn element(element: ElementNode) -> Self {
        Node::Element(element)
    }
}

/// An element as seen during a depth-first scan.
///
/// Children are not stored: in a flattened [`Paragraph`] they are the nodes
/// that follow the element. `ancestors` holds the tag names from the parent
/// up to the document root, captured at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementNode {
    pub tag_name: String,
    pub attributes: BTreeMap<String, String>,
    pub ancestors: Vec<String>,
}

impl ElementNode {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            attributes: BTreeMap::new(),
            ancestors: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_ancestors<I, S>(mut self, ancestors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ancestors = ancestors.into_iter().map(Into::into).collect();
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_ancestor(&self, tag_name: &str) -> bool {
        self.ancestors.iter().any(|a| a == tag_name)
    }
}

/// One paragraph flattened into document order. Iterating does not consume
/// it, so a paragraph can be scanned any number of times.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    nodes: Vec<Node>,
}

impl Paragraph {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<'a> IntoIterator for &'a Paragraph {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

impl FromIterator<Node> for Paragraph {
    fn from_iter<T: IntoIterator<Item = Node>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Parse a full HTML document and flatten every article paragraph
pub fn parse_paragraphs(html: &str) -> Result<Vec<Paragraph>> {
    parse_paragraphs_matching(html, CONTENT_PARAGRAPHS)
}

/// Same as [`parse_paragraphs`] with a caller-supplied CSS selector.
///
/// Paragraphs holding only whitespace and line breaks (Wikipedia's
/// `mw-empty-elt` placeholders) are dropped.
pub fn parse_paragraphs_matching(html: &str, css: &str) -> Result<Vec<Paragraph>> {
    let selector = Selector::parse(css)
        .map_err(|e| ScanError::ParseError(format!("Invalid selector '{}': {:?}", css, e)))?;
    let document = Html::parse_document(html);

    let paragraphs: Vec<Paragraph> = document
        .select(&selector)
        .filter(has_content)
        .map(flatten)
        .collect();

    debug!("Parsed {} paragraphs", paragraphs.len());
    Ok(paragraphs)
}

fn has_content(paragraph: &ElementRef<'_>) -> bool {
    paragraph.text().any(|t| !t.trim().is_empty())
        || paragraph
            .descendants()
            .skip(1)
            .filter_map(|node| node.value().as_element())
            .any(|element| element.name() != "br")
}

fn flatten(paragraph: ElementRef<'_>) -> Paragraph {
    paragraph
        .descendants()
        .filter_map(|node| match node.value() {
            scraper::Node::Text(text) => Some(Node::text(&**text)),
            scraper::Node::Element(element) => Some(Node::Element(ElementNode {
                tag_name: element.name().to_string(),
                attributes: element
                    .attrs()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect(),
                ancestors: node
                    .ancestors()
                    .filter_map(|a| a.value().as_element())
                    .map(|e| e.name().to_string())
                    .collect(),
            })),
            _ => None,
        })
        .collect()
}
