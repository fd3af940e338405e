use crate::document::{ElementNode, Node};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

pub const WIKIPEDIA_ROOT: &str = "https://en.wikipedia.org";
pub const REDLINK_MARKER: &str = "redlink=1";

const OPEN_PARENTHESIS: char = '(';
const CLOSE_PARENTHESIS: char = ')';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCandidate {
    pub url: String,
}

/// Picks the single link a walk follows out of a paragraph.
///
/// A link qualifies when it is not inside an unclosed parenthetical, has no
/// italics ancestor, is not a redlink, and does not resolve to a page already
/// on the visited path.
#[derive(Debug, Clone)]
pub struct LinkSelector {
    site_root: String,
    anchor_tag: String,
    link_attr: String,
    italic_tags: Vec<String>,
    redlink_marker: String,
}

impl LinkSelector {
    /// A trailing `/` on `site_root` is dropped, since every `href` already
    /// starts with one.
    pub fn new(site_root: impl Into<String>) -> Self {
        let site_root: String = site_root.into();
        Self {
            site_root: site_root.trim_end_matches('/').to_string(),
            anchor_tag: "a".to_string(),
            link_attr: "href".to_string(),
            italic_tags: vec!["i".to_string(), "em".to_string()],
            redlink_marker: REDLINK_MARKER.to_string(),
        }
    }

    pub fn with_italic_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.italic_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_redlink_marker(mut self, marker: impl Into<String>) -> Self {
        self.redlink_marker = marker.into();
        self
    }

    pub fn site_root(&self) -> &str {
        &self.site_root
    }

    /// Absolute URL for a page-relative reference. Plain concatenation, so
    /// two pages are equal exactly when their strings are.
    pub fn resolve(&self, href: &str) -> String {
        format!("{}{}", self.site_root, href)
    }

    pub fn select_first_valid_link<'a, I>(&self, nodes: I, visited: &[String]) -> Option<LinkCandidate>
    where
        I: IntoIterator<Item = &'a Node>,
    {
        let mut open_parens = 0usize;
        let mut close_parens = 0usize;

        for node in nodes {
            match node {
                Node::Text { text } => {
                    for c in text.chars() {
                        if c == OPEN_PARENTHESIS {
                            open_parens += 1;
                        } else if c == CLOSE_PARENTHESIS {
                            close_parens += 1;
                        }
                    }
                }
                Node::Element(element) if element.tag_name == self.anchor_tag => {
                    let Some(href) = element.attr(&self.link_attr) else {
                        continue;
                    };
                    if self.is_valid(element, href, visited) && close_parens >= open_parens {
                        let url = self.resolve(href);
                        debug!("Selected link {}", url);
                        return Some(LinkCandidate { url });
                    }
                    if close_parens < open_parens {
                        trace!("Skipping {} inside parentheses ({} open, {} closed)", href, open_parens, close_parens);
                    }
                }
                Node::Element(_) => {}
            }
        }

        None
    }

    pub fn is_valid(&self, element: &ElementNode, href: &str, visited: &[String]) -> bool {
        if self.is_italicized(element) {
            trace!("Skipping italicized link {}", href);
            return false;
        }
        if self.is_redlink(href) {
            trace!("Skipping redlink {}", href);
            return false;
        }
        if self.is_loop(href, visited) {
            debug!("Skipping already visited link {}", href);
            return false;
        }
        true
    }

    pub fn is_italicized(&self, element: &ElementNode) -> bool {
        self.italic_tags.iter().any(|tag| element.has_ancestor(tag))
    }

    /// Suffix test; values shorter than the marker are never redlinks.
    pub fn is_redlink(&self, href: &str) -> bool {
        href.ends_with(&self.redlink_marker)
    }

    pub fn is_loop(&self, href: &str, visited: &[String]) -> bool {
        let url = self.resolve(href);
        visited.iter().any(|v| *v == url)
    }
}

impl Default for LinkSelector {
    fn default() -> Self {
        Self::new(WIKIPEDIA_ROOT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Paragraph;

    fn anchor(href: &str) -> Node {
        Node::element(ElementNode::new("a").with_attr("href", href).with_ancestors(["p", "body", "html"]))
    }

    fn italic_anchor(tag: &str, href: &str) -> Node {
        Node::element(
            ElementNode::new("a")
                .with_attr("href", href)
                .with_ancestors([tag, "p", "body", "html"]),
        )
    }

    fn select(nodes: Vec<Node>, visited: &[String]) -> Option<String> {
        let paragraph = Paragraph::new(nodes);
        LinkSelector::default()
            .select_first_valid_link(&paragraph, visited)
            .map(|c| c.url)
    }

    #[test]
    fn test_no_anchor_yields_none() {
        let nodes = vec![
            Node::element(ElementNode::new("p")),
            Node::text("Plain text with no links."),
            Node::element(ElementNode::new("b")),
            Node::text("bold"),
        ];
        assert_eq!(select(nodes, &[]), None);
    }

    #[test]
    fn test_first_plain_link_is_selected() {
        let nodes = vec![Node::text("See "), anchor("/wiki/Foo"), Node::text(" and "), anchor("/wiki/Bar")];
        assert_eq!(select(nodes, &[]), Some("https://en.wikipedia.org/wiki/Foo".to_string()));
    }

    #[test]
    fn test_unclosed_parenthesis_excludes_link() {
        let nodes = vec![Node::text("("), anchor("/wiki/Foo"), Node::text(")")];
        assert_eq!(select(nodes, &[]), None);
    }

    #[test]
    fn test_link_after_closed_parenthesis_is_selected() {
        let nodes = vec![
            Node::text("Java ("),
            anchor("/wiki/Indonesian_language"),
            Node::text(") is an "),
            anchor("/wiki/Island"),
        ];
        assert_eq!(select(nodes, &[]), Some("https://en.wikipedia.org/wiki/Island".to_string()));
    }

    #[test]
    fn test_nested_parentheses_only_track_balance() {
        let nodes = vec![
            Node::text("((x) "),
            anchor("/wiki/Inner"),
            Node::text(") "),
            anchor("/wiki/Outer"),
        ];
        assert_eq!(select(nodes, &[]), Some("https://en.wikipedia.org/wiki/Outer".to_string()));
    }

    #[test]
    fn test_extra_close_parenthesis_still_allows_link() {
        let nodes = vec![Node::text(":) "), anchor("/wiki/Smile")];
        assert_eq!(select(nodes, &[]), Some("https://en.wikipedia.org/wiki/Smile".to_string()));
    }

    #[test]
    fn test_italicized_links_are_excluded() {
        let nodes = vec![
            italic_anchor("i", "/wiki/Italic"),
            italic_anchor("em", "/wiki/Emphasis"),
            anchor("/wiki/Plain"),
        ];
        assert_eq!(select(nodes, &[]), Some("https://en.wikipedia.org/wiki/Plain".to_string()));
    }

    #[test]
    fn test_distant_italic_ancestor_excludes_link() {
        let nodes = vec![Node::element(
            ElementNode::new("a")
                .with_attr("href", "/wiki/Deep")
                .with_ancestors(["b", "span", "i", "p", "body", "html"]),
        )];
        assert_eq!(select(nodes, &[]), None);
    }

    #[test]
    fn test_redlink_marker_excludes_link() {
        let nodes = vec![
            anchor("/w/index.php?title=Nope&action=edit&redlink=1"),
            anchor("/wiki/Exists"),
        ];
        assert_eq!(select(nodes, &[]), Some("https://en.wikipedia.org/wiki/Exists".to_string()));
    }

    #[test]
    fn test_href_equal_to_marker_is_redlink() {
        assert_eq!(select(vec![anchor("redlink=1")], &[]), None);
    }

    #[test]
    fn test_short_href_is_not_redlink() {
        let selector = LinkSelector::default();
        assert!(!selector.is_redlink(""));
        assert!(!selector.is_redlink("/a"));
        assert_eq!(select(vec![anchor("/a")], &[]), Some("https://en.wikipedia.org/a".to_string()));
    }

    #[test]
    fn test_visited_link_is_excluded() {
        let visited = vec!["https://en.wikipedia.org/wiki/Foo".to_string()];
        let nodes = vec![anchor("/wiki/Foo"), anchor("/wiki/Bar")];
        assert_eq!(select(nodes, &visited), Some("https://en.wikipedia.org/wiki/Bar".to_string()));
    }

    #[test]
    fn test_only_visited_links_yields_none() {
        let visited = vec!["https://en.wikipedia.org/wiki/Foo".to_string()];
        assert_eq!(select(vec![anchor("/wiki/Foo")], &visited), None);
    }

    #[test]
    fn test_rescan_is_idempotent() {
        let paragraph = Paragraph::new(vec![Node::text("x "), anchor("/wiki/Foo"), anchor("/wiki/Bar")]);
        let visited = vec!["https://en.wikipedia.org/wiki/Foo".to_string()];
        let selector = LinkSelector::default();

        let first = selector.select_first_valid_link(&paragraph, &visited);
        let second = selector.select_first_valid_link(&paragraph, &visited);
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolution_matches_loop_check() {
        let selector = LinkSelector::default();
        let visited = vec![selector.resolve("/wiki/Foo")];
        assert!(selector.is_loop("/wiki/Foo", &visited));
        assert!(!selector.is_loop("/wiki/foo", &visited));
    }

    #[test]
    fn test_anchor_without_href_is_ignored() {
        let nodes = vec![
            Node::element(ElementNode::new("a").with_attr("name", "top")),
            anchor("/wiki/Next"),
        ];
        assert_eq!(select(nodes, &[]), Some("https://en.wikipedia.org/wiki/Next".to_string()));
    }

    #[test]
    fn test_custom_site_root_and_tags() {
        let selector = LinkSelector::new("http://localhost:8080")
            .with_italic_tags(["cite"])
            .with_redlink_marker("missing");
        let paragraph = Paragraph::new(vec![
            italic_anchor("cite", "/wiki/Cited"),
            anchor("/wiki/Gone?missing"),
            italic_anchor("i", "/wiki/Italic"),
        ]);

        let picked = selector.select_first_valid_link(&paragraph, &[]);
        assert_eq!(picked.map(|c| c.url), Some("http://localhost:8080/wiki/Italic".to_string()));
    }

    #[test]
    fn test_trailing_slash_on_site_root_is_dropped() {
        let selector = LinkSelector::new("https://en.wikipedia.org/");
        assert_eq!(selector.site_root(), WIKIPEDIA_ROOT);
        assert_eq!(
            selector.resolve("/wiki/Philosophy"),
            "https://en.wikipedia.org/wiki/Philosophy"
        );

        let visited = vec!["https://en.wikipedia.org/wiki/Logic".to_string()];
        assert!(selector.is_loop("/wiki/Logic", &visited));
    }
}
