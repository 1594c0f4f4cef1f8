use std::sync::OnceLock;

use regex::Regex;

use crate::error::BridgeError;

// ============================================================================
// Bounds
// ============================================================================

/// On-screen rectangle of a node, as reported by the accessibility dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+").expect("valid regex"))
}

impl Bounds {
    /// Parse the `[x1,y1][x2,y2]` wire format.
    ///
    /// Any string that yields exactly four integers is accepted; anything
    /// else is rejected with `BridgeError::InvalidBounds`.
    pub fn parse(raw: &str) -> Result<Self, BridgeError> {
        let numbers: Vec<i32> = number_pattern()
            .find_iter(raw)
            .map(|m| m.as_str().parse::<i32>())
            .collect::<Result<_, _>>()
            .map_err(|_| BridgeError::InvalidBounds(raw.to_string()))?;

        match numbers.as_slice() {
            [x1, y1, x2, y2] => Ok(Bounds {
                x1: *x1,
                y1: *y1,
                x2: *x2,
                y2: *y2,
            }),
            _ => Err(BridgeError::InvalidBounds(raw.to_string())),
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (f64::from(self.x1) + f64::from(self.x2)) / 2.0,
            (f64::from(self.y1) + f64::from(self.y2)) / 2.0,
        )
    }
}

// ============================================================================
// Node
// ============================================================================

/// One element of the accessibility tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub class: String,
    pub text: String,
    pub content_desc: String,
    pub resource_id: String,
    /// Raw `bounds` attribute; parsed on demand because malformed values
    /// must only fail the gesture that needs them.
    pub bounds: String,
    pub index: i32,
    pub selected: bool,
    pub checked: bool,
    pub children: Vec<Node>,
}

/// How a text attribute is compared against a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMatch {
    Exact,
    Contains,
}

impl TextMatch {
    pub fn matches(self, haystack: &str, needle: &str) -> bool {
        match self {
            TextMatch::Exact => haystack == needle,
            TextMatch::Contains => haystack.contains(needle),
        }
    }
}

impl Node {
    pub fn parse_bounds(&self) -> Result<Bounds, BridgeError> {
        Bounds::parse(&self.bounds)
    }

    pub fn is_class(&self, class: &str) -> bool {
        self.class == class
    }

    pub fn is_flagged(&self) -> bool {
        self.selected || self.checked
    }

    /// First direct child with the given class and sibling index.
    pub fn child_at(&self, class: &str, index: i32) -> Option<&Node> {
        self.children
            .iter()
            .find(|c| c.class == class && c.index == index)
    }

    /// Pre-order traversal, starting with `self`.
    pub fn descendants(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }
}

pub struct PreOrder<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Immutable capture of the on-screen accessibility tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub roots: Vec<Node>,
}

impl Snapshot {
    /// Parse a uiautomator hierarchy dump (`<hierarchy><node .../></hierarchy>`).
    pub fn parse(xml: &str) -> Result<Self, BridgeError> {
        let doc = roxmltree::Document::parse(xml)?;
        let root = doc.root_element();

        let roots = if root.has_tag_name("node") {
            vec![convert(root)]
        } else if root.has_tag_name("hierarchy") {
            root.children()
                .filter(|c| c.has_tag_name("node"))
                .map(convert)
                .collect()
        } else {
            return Err(BridgeError::SnapshotStructure(format!(
                "unexpected root element <{}>",
                root.tag_name().name()
            )));
        };

        Ok(Snapshot { roots })
    }

    /// Pre-order traversal over every node in the snapshot.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.roots.iter().flat_map(Node::descendants)
    }

    pub fn find_by_text(&self, text: &str, mode: TextMatch) -> Option<&Node> {
        self.nodes().find(|n| mode.matches(&n.text, text))
    }

    pub fn find_by_desc(&self, desc: &str, mode: TextMatch) -> Option<&Node> {
        self.nodes().find(|n| mode.matches(&n.content_desc, desc))
    }

    pub fn find_by_resource_id(&self, id: &str) -> Option<&Node> {
        self.nodes().find(|n| n.resource_id == id)
    }

    /// Element whose children include `target` (compared by identity).
    pub fn parent_of(&self, target: &Node) -> Option<&Node> {
        self.nodes()
            .find(|n| n.children.iter().any(|c| std::ptr::eq(c, target)))
    }

    pub fn has_text(&self, text: &str) -> bool {
        self.find_by_text(text, TextMatch::Exact).is_some()
    }

    pub fn contains_text(&self, text: &str) -> bool {
        self.find_by_text(text, TextMatch::Contains).is_some()
    }

    pub fn has_desc(&self, desc: &str) -> bool {
        self.find_by_desc(desc, TextMatch::Exact).is_some()
    }
}

fn convert(el: roxmltree::Node<'_, '_>) -> Node {
    let attr = |name: &str| el.attribute(name).unwrap_or("").to_string();
    let flag = |name: &str| el.attribute(name) == Some("true");

    Node {
        class: attr("class"),
        text: attr("text"),
        content_desc: attr("content-desc"),
        resource_id: attr("resource-id"),
        bounds: attr("bounds"),
        index: el
            .attribute("index")
            .and_then(|i| i.trim().parse().ok())
            .unwrap_or(0),
        selected: flag("selected"),
        checked: flag("checked"),
        children: el
            .children()
            .filter(|c| c.has_tag_name("node"))
            .map(convert)
            .collect(),
    }
}
