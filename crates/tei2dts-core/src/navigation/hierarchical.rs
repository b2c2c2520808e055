//! Navigation over nested divisions.

use tei2dts_tree::{Document, NodeId};

use super::{
    Candidates, Navigation, NavigationArena, NavigationBuilder, NavigationMode, Span, Unit,
    required_id, unit,
};
use crate::error::ConvertError;
use crate::tei::{DIV, HEAD, N, TYPE, normalize_space};

/// One unit per `<div>`, parented by the nearest enclosing `<div>`.
#[derive(Clone, Copy, Debug, Default)]
pub struct HierarchicalBuilder;

impl NavigationBuilder for HierarchicalBuilder {
    fn mode(&self) -> NavigationMode {
        NavigationMode::Hierarchical
    }

    fn candidates(&self, doc: &Document, content_root: NodeId) -> Candidates {
        Candidates {
            elements: doc
                .descendants(content_root)
                .filter(|&n| doc.is_element(n, DIV))
                .collect(),
            leading: false,
        }
    }

    fn build(
        &self,
        doc: &Document,
        content_root: NodeId,
        _leading_id: Option<&str>,
    ) -> Result<Navigation, ConvertError> {
        let mut arena = NavigationArena::new(NavigationMode::Hierarchical, content_root);

        // (node, unit of the nearest enclosing division)
        let mut stack: Vec<(NodeId, Option<usize>)> = doc
            .children(content_root)
            .iter()
            .rev()
            .map(|&c| (c, None))
            .collect();

        while let Some((node, parent)) = stack.pop() {
            let mut enclosing = parent;
            if doc.is_element(node, DIV) {
                let id = required_id(doc, node)?;
                tracing::debug!(%id, depth = parent.map_or(1, |p| arena.depth(p) + 1), "Division unit");
                let idx = arena.add(Unit {
                    label: division_label(doc, node),
                    cite_type: doc.attr(node, TYPE).map(|t| t.into_owned()),
                    parent,
                    ..unit(id, Span::Subtree(node))
                });
                enclosing = Some(idx);
            }
            stack.extend(
                doc.children(node)
                    .iter()
                    .rev()
                    .filter(|&&c| doc.element(c).is_some())
                    .map(|&c| (c, enclosing)),
            );
        }

        Ok(arena.build())
    }
}

/// Label from the division's `<head>` children, falling back to `n`.
fn division_label(doc: &Document, div: NodeId) -> Option<String> {
    let heads: Vec<String> = doc
        .child_elements(div, HEAD)
        .map(|h| normalize_space(&doc.text_content(h)))
        .filter(|h| !h.is_empty())
        .collect();
    if heads.is_empty() {
        doc.attr(div, N).map(|n| n.into_owned())
    } else {
        Some(heads.join(" "))
    }
}
