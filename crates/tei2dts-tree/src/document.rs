//! Arena-backed XML document.
//!
//! Nodes live in a flat `Vec<Node>` and refer to each other by [`NodeId`].
//! Parent links are plain indices, so the tree has no cyclic ownership and
//! traversals run on explicit stacks instead of recursion.

use std::borrow::Cow;

use quick_xml::escape::{escape, unescape};

use crate::error::ParseError;
use crate::serializer;

/// Index of a node inside a [`Document`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the arena. Arena order is document order.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Element attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    /// Qualified name as written (e.g. `xml:id`).
    pub name: String,
    /// Value as written in the source, entity references included.
    pub raw_value: String,
}

/// Element data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    /// Qualified name as written (e.g. `tei:div` or `div`).
    pub name: String,
    /// Attributes in source order.
    pub attrs: Vec<Attribute>,
    /// Whether the source used the `<name/>` form.
    pub self_closing: bool,
}

impl Element {
    /// Element name without namespace prefix.
    #[must_use]
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Unescaped value of the attribute with the given qualified name.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<Cow<'_, str>> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| unescape_lossy(&a.raw_value))
    }
}

/// Node payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Element with attributes.
    Element(Element),
    /// Character data, raw (escaped) as in the source.
    Text(String),
    /// CDATA section content.
    CData(String),
    /// Comment content.
    Comment(String),
    /// Processing instruction content (target and data).
    ProcessingInstruction(String),
}

/// A node in the document arena.
#[derive(Clone, Debug)]
pub struct Node {
    /// Node payload.
    pub kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

/// Step of a document-order walk.
///
/// Every element yields an `Open` and a matching `Close`; every other node
/// yields a single `Leaf`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkEvent {
    /// Start of an element.
    Open(NodeId),
    /// End of an element.
    Close(NodeId),
    /// Text, CDATA, comment or processing instruction.
    Leaf(NodeId),
}

/// Parsed XML document.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    /// Raw markup before the root element (declaration, doctype, comments).
    prolog: Vec<String>,
    /// Raw markup after the root element.
    epilog: Vec<String>,
}

impl Document {
    /// Parse a document from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not well-formed XML.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        crate::parser::parse(input)
    }

    pub(crate) fn from_parts(
        nodes: Vec<Node>,
        root: NodeId,
        prolog: Vec<String>,
        epilog: Vec<String>,
    ) -> Self {
        Self {
            nodes,
            root,
            prolog,
            epilog,
        }
    }

    /// Append a node to an arena under construction.
    pub(crate) fn push_node(
        nodes: &mut Vec<Node>,
        kind: NodeKind,
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = NodeId(nodes.len());
        nodes.push(Node {
            kind,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            nodes[parent.0].children.push(id);
        }
        id
    }

    /// Root element.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty. A parsed document always has a root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Element data, or `None` for non-element nodes.
    #[must_use]
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Local name of an element node.
    #[must_use]
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(Element::local_name)
    }

    /// Whether `id` is an element with the given local name.
    #[must_use]
    pub fn is_element(&self, id: NodeId, local: &str) -> bool {
        self.local_name(id) == Some(local)
    }

    /// Whether the element is written as `<name/>`: it was so in the source
    /// and still has no children.
    #[must_use]
    pub fn is_empty_tag(&self, id: NodeId) -> bool {
        self.element(id).is_some_and(|el| el.self_closing) && self.children(id).is_empty()
    }

    /// Parent node, `None` for the root.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Child nodes in document order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Unescaped attribute value by qualified name.
    #[must_use]
    pub fn attr(&self, id: NodeId, name: &str) -> Option<Cow<'_, str>> {
        self.element(id).and_then(|el| el.attr(name))
    }

    /// Set an attribute, escaping `value`.
    ///
    /// Replaces the value of an existing attribute in place or appends a new
    /// one. Returns `false` if `id` is not an element.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> bool {
        let NodeKind::Element(el) = &mut self.nodes[id.0].kind else {
            return false;
        };
        let raw_value = escape(value).into_owned();
        if let Some(attr) = el.attrs.iter_mut().find(|a| a.name == name) {
            attr.raw_value = raw_value;
        } else {
            el.attrs.push(Attribute {
                name: name.to_owned(),
                raw_value,
            });
        }
        true
    }

    /// Direct element children with the given local name.
    pub fn child_elements<'a>(
        &'a self,
        id: NodeId,
        local: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&c| self.is_element(c, local))
    }

    /// All nodes below `id` in document order, `id` excluded.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack = self.children(id).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// Ancestors of `id`, nearest first, `id` excluded.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), |&n| self.parent(n))
    }

    /// Walk `id` and its subtree.
    #[must_use]
    pub fn walk(&self, id: NodeId) -> Walk<'_> {
        Walk {
            doc: self,
            stack: vec![Frame::Enter(id)],
        }
    }

    /// Walk the content of `id` without its own open/close events.
    #[must_use]
    pub fn walk_inner(&self, id: NodeId) -> Walk<'_> {
        let stack = self
            .children(id)
            .iter()
            .rev()
            .map(|&c| Frame::Enter(c))
            .collect();
        Walk { doc: self, stack }
    }

    /// Concatenated, unescaped text of all text and CDATA nodes under `id`.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.descendants(id) {
            match &self.nodes[node.0].kind {
                NodeKind::Text(raw) => out.push_str(&unescape_lossy(raw)),
                NodeKind::CData(text) => out.push_str(text),
                _ => {}
            }
        }
        out
    }

    /// Raw markup preceding the root element.
    #[must_use]
    pub fn prolog(&self) -> &[String] {
        &self.prolog
    }

    /// Serialize the subtree rooted at `id`.
    #[must_use]
    pub fn serialize_node(&self, id: NodeId) -> String {
        let mut out = String::new();
        serializer::write_events(self, self.walk(id), &mut out);
        out
    }

    /// Serialize the whole document, prolog and epilog included.
    #[must_use]
    pub fn serialize(&self) -> String {
        let mut out = String::with_capacity(4096);
        for item in &self.prolog {
            out.push_str(item);
        }
        serializer::write_events(self, self.walk(self.root), &mut out);
        for item in &self.epilog {
            out.push_str(item);
        }
        out
    }
}

/// Pre-order iterator over descendants.
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(id).iter().rev().copied());
        Some(id)
    }
}

enum Frame {
    Enter(NodeId),
    Exit(NodeId),
}

/// Document-order iterator of [`WalkEvent`]s.
pub struct Walk<'a> {
    doc: &'a Document,
    stack: Vec<Frame>,
}

impl Iterator for Walk<'_> {
    type Item = WalkEvent;

    fn next(&mut self) -> Option<WalkEvent> {
        match self.stack.pop()? {
            Frame::Enter(id) => {
                if self.doc.element(id).is_none() {
                    return Some(WalkEvent::Leaf(id));
                }
                self.stack.push(Frame::Exit(id));
                self.stack
                    .extend(self.doc.children(id).iter().rev().map(|&c| Frame::Enter(c)));
                Some(WalkEvent::Open(id))
            }
            Frame::Exit(id) => Some(WalkEvent::Close(id)),
        }
    }
}

/// Strip the namespace prefix from a qualified name.
#[must_use]
pub fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// Unescape a raw value, keeping it as written if it holds unknown entities.
fn unescape_lossy(raw: &str) -> Cow<'_, str> {
    unescape(raw).unwrap_or(Cow::Borrowed(raw))
}
