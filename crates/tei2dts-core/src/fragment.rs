//! Standalone XML fragments for units.
//!
//! A fragment wraps the content a unit owns in a `TEI` root and a
//! `dts:wrapper` element. The root carries every namespace declaration in
//! scope where the unit sits in the source; the wrapper carries the
//! inherited `xml:lang`, `xml:base` and `xml:space` values:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <TEI xmlns="http://www.tei-c.org/ns/1.0"><dts:wrapper xmlns:dts="https://w3id.org/dts/api#">…</dts:wrapper></TEI>
//! ```
//!
//! Flat units start in the middle of the tree, so their fragments re-open
//! the elements enclosing the break marker and close whatever is still open
//! at the end of the span.

use std::collections::HashMap;

use tei2dts_tree::{
    Attribute, Document, Element, NodeId, WalkEvent, write_close_tag, write_events,
    write_open_tag,
};

use crate::navigation::{Navigation, Span, Unit};
use crate::tei::TEI_NAMESPACE;

/// DTS API namespace.
pub const DTS_NAMESPACE: &str = "https://w3id.org/dts/api#";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// `xml:` attributes whose value applies to descendants.
const INHERITED_ATTRS: [&str; 3] = ["xml:lang", "xml:base", "xml:space"];

/// Serialized content of one unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fragment {
    /// Identifier of the unit.
    pub id: String,
    /// Complete XML fragment document.
    pub content: String,
    /// Page-image reference of the unit.
    pub facsimile: Option<String>,
}

/// Serializes unit content from a document and its navigation.
pub struct FragmentExtractor<'a> {
    doc: &'a Document,
    nav: &'a Navigation,
    events: Vec<WalkEvent>,
    /// Elements open just before each range start, outermost first.
    contexts: HashMap<usize, Vec<NodeId>>,
    /// Scope at the parent of each subtree unit and at the content root.
    scopes: HashMap<NodeId, Scope>,
}

impl<'a> FragmentExtractor<'a> {
    /// Prepare extraction for all units of `nav`.
    #[must_use]
    pub fn new(doc: &'a Document, nav: &'a Navigation) -> Self {
        let events: Vec<WalkEvent> = doc.walk_inner(nav.content_root()).collect();
        let starts: Vec<usize> = nav
            .units()
            .iter()
            .filter_map(|u| match u.span {
                Span::Range { start, .. } => Some(start),
                Span::Subtree(_) => None,
            })
            .collect();
        let contexts = open_elements_at(&events, &starts);

        let mut scopes = HashMap::new();
        resolve_scope(doc, nav.content_root(), &mut scopes);
        for unit in nav.units() {
            if let Span::Subtree(node) = unit.span
                && let Some(parent) = doc.parent(node)
            {
                resolve_scope(doc, parent, &mut scopes);
            }
        }

        Self {
            doc,
            nav,
            events,
            contexts,
            scopes,
        }
    }

    /// Fragments for every unit in navigation order.
    #[must_use]
    pub fn extract_all(&self) -> Vec<Fragment> {
        self.nav.units().iter().map(|u| self.extract(u)).collect()
    }

    /// Fragment for one unit.
    #[must_use]
    pub fn extract(&self, unit: &Unit) -> Fragment {
        // Flat spans re-open their context below the content root, and
        // those elements carry their own attributes.
        let scope_node = match unit.span {
            Span::Subtree(node) => self.doc.parent(node).unwrap_or(node),
            Span::Range { .. } => self.nav.content_root(),
        };
        let (root, wrapper) = match self.scopes.get(&scope_node) {
            Some(scope) => (scope.root_element(), scope.wrapper_element()),
            None => (Scope::default().root_element(), Scope::default().wrapper_element()),
        };

        let mut content = String::with_capacity(1024);
        content.push_str(XML_DECLARATION);
        content.push('\n');
        write_open_tag(&root, false, &mut content);
        write_open_tag(&wrapper, false, &mut content);

        match unit.span {
            Span::Subtree(node) => {
                write_events(self.doc, self.doc.walk(node), &mut content);
            }
            Span::Range { start, end } => self.write_range(start, end, &mut content),
        }

        write_close_tag(&wrapper, &mut content);
        write_close_tag(&root, &mut content);
        content.push('\n');

        Fragment {
            id: unit.id.clone(),
            content,
            facsimile: unit.facsimile.clone(),
        }
    }

    /// Markup the unit owns, without the wrapper or re-opened context.
    ///
    /// For flat navigation the owned content of all units, in order, adds up
    /// to the serialized content of the content root.
    #[must_use]
    pub fn owned_content(&self, unit: &Unit) -> String {
        match unit.span {
            Span::Subtree(node) => self.doc.serialize_node(node),
            Span::Range { start, end } => {
                let mut out = String::new();
                write_events(self.doc, self.events[start..end].iter().copied(), &mut out);
                out
            }
        }
    }

    /// Write a range balanced by its enclosing elements.
    fn write_range(&self, start: usize, end: usize, out: &mut String) {
        let mut open = self.contexts.get(&start).cloned().unwrap_or_default();
        for &node in &open {
            if let Some(el) = self.doc.element(node) {
                write_open_tag(el, false, out);
            }
        }

        for &event in &self.events[start..end] {
            match event {
                WalkEvent::Open(n) => open.push(n),
                WalkEvent::Close(_) => {
                    open.pop();
                }
                WalkEvent::Leaf(_) => {}
            }
        }
        write_events(self.doc, self.events[start..end].iter().copied(), out);

        for &node in open.iter().rev() {
            if let Some(el) = self.doc.element(node)
                && !self.doc.is_empty_tag(node)
            {
                write_close_tag(el, out);
            }
        }
    }
}

/// Open element stacks at the given event indices, in one pass.
fn open_elements_at(events: &[WalkEvent], starts: &[usize]) -> HashMap<usize, Vec<NodeId>> {
    let mut contexts = HashMap::with_capacity(starts.len());
    let mut open = Vec::new();
    let mut pending = starts.iter().copied().peekable();
    for (i, &event) in events.iter().enumerate() {
        while let Some(s) = pending.next_if(|&s| s <= i) {
            contexts.insert(s, open.clone());
        }
        match event {
            WalkEvent::Open(n) => open.push(n),
            WalkEvent::Close(_) => {
                open.pop();
            }
            WalkEvent::Leaf(_) => {}
        }
    }
    for s in pending {
        contexts.insert(s, open.clone());
    }
    contexts
}

/// Namespace declarations and inherited `xml:` attributes in effect at a
/// node, nearest declaration winning.
#[derive(Clone, Debug, Default)]
struct Scope {
    attrs: Vec<Attribute>,
}

impl Scope {
    fn extend(&mut self, el: &Element) {
        for attr in el.attrs.iter().filter(|a| is_scoped(&a.name)) {
            if let Some(existing) = self.attrs.iter_mut().find(|a| a.name == attr.name) {
                existing.raw_value.clone_from(&attr.raw_value);
            } else {
                self.attrs.push(attr.clone());
            }
        }
    }

    /// `TEI` start tag with the namespace declarations.
    fn root_element(&self) -> Element {
        let mut attrs: Vec<Attribute> = self
            .attrs
            .iter()
            .filter(|a| is_namespace_decl(&a.name))
            .cloned()
            .collect();
        if !attrs.iter().any(|a| a.name == "xmlns") {
            attrs.insert(
                0,
                Attribute {
                    name: "xmlns".to_owned(),
                    raw_value: TEI_NAMESPACE.to_owned(),
                },
            );
        }
        Element {
            name: "TEI".to_owned(),
            attrs,
            self_closing: false,
        }
    }

    /// `dts:wrapper` start tag with the inherited `xml:` attributes.
    fn wrapper_element(&self) -> Element {
        let mut attrs = vec![Attribute {
            name: "xmlns:dts".to_owned(),
            raw_value: DTS_NAMESPACE.to_owned(),
        }];
        attrs.extend(
            self.attrs
                .iter()
                .filter(|a| !is_namespace_decl(&a.name))
                .cloned(),
        );
        Element {
            name: "dts:wrapper".to_owned(),
            attrs,
            self_closing: false,
        }
    }
}

/// Compute the scope of `node` and of its ancestors not yet in `scopes`.
fn resolve_scope(doc: &Document, node: NodeId, scopes: &mut HashMap<NodeId, Scope>) {
    let mut chain = Vec::new();
    let mut scope = Scope::default();
    let mut cursor = Some(node);
    while let Some(n) = cursor {
        if let Some(known) = scopes.get(&n) {
            scope = known.clone();
            break;
        }
        chain.push(n);
        cursor = doc.parent(n);
    }
    for &n in chain.iter().rev() {
        if let Some(el) = doc.element(n) {
            scope.extend(el);
        }
        scopes.insert(n, scope.clone());
    }
}

fn is_scoped(name: &str) -> bool {
    is_namespace_decl(name) || INHERITED_ATTRS.contains(&name)
}

fn is_namespace_decl(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:")
}
