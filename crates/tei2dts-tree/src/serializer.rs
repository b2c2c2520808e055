//! Markup serialization for tree nodes and walk events.

use std::fmt::Write;

use crate::document::{Document, Element, NodeKind, WalkEvent};

/// Serialize a sequence of walk events.
///
/// Events need not be balanced: an `Open` without its `Close` writes only the
/// start tag, which lets callers emit arbitrary document ranges.
pub fn write_events<I>(doc: &Document, events: I, out: &mut String)
where
    I: IntoIterator<Item = WalkEvent>,
{
    for event in events {
        match event {
            WalkEvent::Open(id) => {
                if let Some(el) = doc.element(id) {
                    write_open_tag(el, doc.is_empty_tag(id), out);
                }
            }
            WalkEvent::Close(id) => {
                if let Some(el) = doc.element(id)
                    && !doc.is_empty_tag(id)
                {
                    write_close_tag(el, out);
                }
            }
            WalkEvent::Leaf(id) => write_leaf(&doc.node(id).kind, out),
        }
    }
}

/// Write a start tag; `empty` selects the `<name/>` form.
pub fn write_open_tag(el: &Element, empty: bool, out: &mut String) {
    out.push('<');
    out.push_str(&el.name);
    for attr in &el.attrs {
        // Values from single-quoted source may hold a bare `"`.
        let _ = write!(out, r#" {}="{}""#, attr.name, attr.raw_value.replace('"', "&quot;"));
    }
    out.push_str(if empty { "/>" } else { ">" });
}

/// Write an end tag.
pub fn write_close_tag(el: &Element, out: &mut String) {
    let _ = write!(out, "</{}>", el.name);
}

fn write_leaf(kind: &NodeKind, out: &mut String) {
    match kind {
        NodeKind::Text(raw) => out.push_str(raw),
        NodeKind::CData(text) => {
            let _ = write!(out, "<![CDATA[{text}]]>");
        }
        NodeKind::Comment(text) => {
            let _ = write!(out, "<!--{text}-->");
        }
        NodeKind::ProcessingInstruction(text) => {
            let _ = write!(out, "<?{text}?>");
        }
        NodeKind::Element(_) => {}
    }
}
