//! Navigation over page-break markers.
//!
//! Each `<pb/>` opens a unit that runs to the next marker or the end of the
//! content root, regardless of the divisions in between. Spans are ranges of
//! [`Document::walk_inner`] events over the content root; a span starts at
//! the wrappers opened right before its marker, so that the previous unit
//! does not end on empty start tags.

use std::collections::HashSet;

use tei2dts_tree::{Document, NodeId, NodeKind, WalkEvent};

use super::{
    Candidates, LeadingContent, Navigation, NavigationArena, NavigationBuilder, NavigationMode,
    Span, Unit, required_id, unit,
};
use crate::error::ConvertError;
use crate::facsimile::FacsimileResolver;
use crate::tei::{FACS, N, PB};

/// Citation type of page units.
const PAGE: &str = "page";

/// One unit per `<pb/>`, in a flat list.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlatBuilder {
    leading: LeadingContent,
}

impl FlatBuilder {
    /// Create a builder with the given leading content policy.
    #[must_use]
    pub fn new(leading: LeadingContent) -> Self {
        Self { leading }
    }

    /// Whether the events before the first unit become a unit of their own.
    fn keeps_leading(&self, doc: &Document, events: &[WalkEvent], pages: &[Page]) -> bool {
        let Some(first) = pages.first() else {
            return false;
        };
        if first.start == 0 {
            return false;
        }
        let significant = is_significant(doc, &events[..first.start], first.marker);
        match (self.leading, significant) {
            (LeadingContent::Keep, true) => true,
            (LeadingContent::Drop, true) => {
                tracing::info!(
                    events = first.start,
                    "Dropping content before the first page break"
                );
                false
            }
            (_, false) => {
                tracing::debug!("No significant content before the first page break");
                false
            }
        }
    }
}

impl NavigationBuilder for FlatBuilder {
    fn mode(&self) -> NavigationMode {
        NavigationMode::Flat
    }

    fn candidates(&self, doc: &Document, content_root: NodeId) -> Candidates {
        let events: Vec<WalkEvent> = doc.walk_inner(content_root).collect();
        let pages = pages(doc, &events);
        Candidates {
            elements: pages.iter().map(|p| p.marker).collect(),
            leading: self.keeps_leading(doc, &events, &pages),
        }
    }

    fn build(
        &self,
        doc: &Document,
        content_root: NodeId,
        leading_id: Option<&str>,
    ) -> Result<Navigation, ConvertError> {
        let events: Vec<WalkEvent> = doc.walk_inner(content_root).collect();
        let pages = pages(doc, &events);
        let resolver = FacsimileResolver::new(doc);
        let mut arena = NavigationArena::new(NavigationMode::Flat, content_root);

        if let (Some(first), Some(id)) = (pages.first(), leading_id) {
            tracing::debug!(%id, "Leading content unit");
            arena.add(Unit {
                cite_type: Some(PAGE.to_owned()),
                ..unit(
                    id.to_owned(),
                    Span::Range {
                        start: 0,
                        end: first.start,
                    },
                )
            });
        }

        for (i, page) in pages.iter().enumerate() {
            let node = page.marker;
            let start = page.start;
            let end = pages.get(i + 1).map_or(events.len(), |p| p.start);
            let id = required_id(doc, node)?;
            let facsimile = doc.attr(node, FACS).map(|f| resolver.resolve(&f));
            tracing::debug!(%id, start, end, facsimile = facsimile.as_deref(), "Page unit");
            arena.add(Unit {
                label: doc.attr(node, N).map(|n| n.into_owned()),
                cite_type: Some(PAGE.to_owned()),
                facsimile,
                ..unit(id, Span::Range { start, end })
            });
        }

        Ok(arena.build())
    }
}

/// A break marker and the first event of its unit.
struct Page {
    marker: NodeId,
    start: usize,
}

/// Break markers in document order.
///
/// A unit starts at its marker's `Open`, moved back over start tags and
/// whitespace that directly precede it, but never into the previous unit.
fn pages(doc: &Document, events: &[WalkEvent]) -> Vec<Page> {
    let mut pages: Vec<Page> = Vec::new();
    for (i, &event) in events.iter().enumerate() {
        let WalkEvent::Open(marker) = event else {
            continue;
        };
        if !doc.is_element(marker, PB) {
            continue;
        }
        let floor = pages.last().map_or(0, |p| p.start + 1);
        let mut start = i;
        while start > floor && is_lead_in(doc, events[start - 1]) {
            start -= 1;
        }
        pages.push(Page { marker, start });
    }
    pages
}

fn is_lead_in(doc: &Document, event: WalkEvent) -> bool {
    match event {
        WalkEvent::Open(_) => true,
        WalkEvent::Close(_) => false,
        WalkEvent::Leaf(n) => {
            matches!(&doc.node(n).kind, NodeKind::Text(raw) if raw.trim().is_empty())
        }
    }
}

/// Whether a prefix holds text or elements that are not mere wrappers of
/// the first marker.
fn is_significant(doc: &Document, prefix: &[WalkEvent], first_marker: NodeId) -> bool {
    let wrappers: HashSet<NodeId> = doc.ancestors(first_marker).collect();
    prefix.iter().any(|&event| match event {
        WalkEvent::Open(n) => !wrappers.contains(&n),
        WalkEvent::Close(_) => false,
        WalkEvent::Leaf(n) => match &doc.node(n).kind {
            NodeKind::Text(raw) => !raw.trim().is_empty(),
            NodeKind::CData(_) => true,
            _ => false,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdAssigner;
    use crate::tei::content_root;
    use pretty_assertions::assert_eq;

    fn navigation(input: &str, leading: LeadingContent) -> (Document, Navigation) {
        let mut doc = Document::parse(input).unwrap();
        let root = content_root(&doc).unwrap();
        let builder = FlatBuilder::new(leading);
        let candidates = builder.candidates(&doc, root);
        let assigned = IdAssigner::new("p").assign(&mut doc, &candidates).unwrap();
        let nav = builder.build(&doc, root, assigned.leading.as_deref()).unwrap();
        (doc, nav)
    }

    #[test]
    fn test_two_page_breaks_with_facsimile() {
        let (_, nav) = navigation(
            r#"<TEI><text><pb facs="img1"/>first<pb/>second</text></TEI>"#,
            LeadingContent::Keep,
        );

        assert_eq!(nav.len(), 2);
        assert_eq!(nav.units()[0].facsimile.as_deref(), Some("img1"));
        assert_eq!(nav.units()[0].span, Span::Range { start: 0, end: 3 });
        assert_eq!(nav.units()[1].facsimile, None);
        assert_eq!(nav.units()[1].span, Span::Range { start: 3, end: 6 });
    }

    #[test]
    fn test_units_cross_divisions() {
        let (_, nav) = navigation(
            r#"<TEI><text><div><pb n="1"/><p>a</p></div><div><p>b<pb n="2"/>c</p></div></text></TEI>"#,
            LeadingContent::Keep,
        );

        assert_eq!(nav.len(), 2);
        assert_eq!(nav.units()[0].label.as_deref(), Some("1"));
        assert_eq!(nav.units()[1].label.as_deref(), Some("2"));
        assert!(nav.units().iter().all(|u| u.parent.is_none() && u.depth == 1));
        assert_eq!(nav.units()[0].cite_type.as_deref(), Some("page"));
    }

    #[test]
    fn test_whitespace_before_first_break_is_not_a_unit() {
        let (_, nav) = navigation(
            "<TEI><text>\n  <body>\n    <pb/>text</body></text></TEI>",
            LeadingContent::Keep,
        );

        assert_eq!(nav.len(), 1);
    }

    #[test]
    fn test_leading_content_kept() {
        let (_, nav) = navigation(
            "<TEI><text><front><p>title page</p></front><body><pb/>one<pb/>two</body></text></TEI>",
            LeadingContent::Keep,
        );

        assert_eq!(nav.len(), 3);
        let leading = &nav.units()[0];
        assert_eq!(leading.id, "p1");
        assert_eq!(leading.label, None);
        assert_eq!(leading.span, Span::Range { start: 0, end: 5 });
        assert_eq!(nav.units()[1].id, "p2");
    }

    #[test]
    fn test_leading_content_dropped() {
        let (_, nav) = navigation(
            "<TEI><text><front><p>title page</p></front><body><pb/>one<pb/>two</body></text></TEI>",
            LeadingContent::Drop,
        );

        assert_eq!(nav.len(), 2);
        assert_eq!(nav.units()[0].id, "p1");
    }

    #[test]
    fn test_comment_before_first_break_not_significant() {
        let (_, nav) = navigation(
            "<TEI><text><!-- scan --><pb/>one</text></TEI>",
            LeadingContent::Keep,
        );

        assert_eq!(nav.len(), 1);
    }

    #[test]
    fn test_no_page_breaks_gives_empty_navigation() {
        let (_, nav) = navigation(
            "<TEI><text><p>unpaginated</p></text></TEI>",
            LeadingContent::Keep,
        );

        assert!(nav.is_empty());
    }

    #[test]
    fn test_spans_partition_content() {
        let (doc, nav) = navigation(
            "<TEI><text><p>lead</p><div><pb/>a<p>b<pb/>c</p></div><pb/>d</text></TEI>",
            LeadingContent::Keep,
        );
        let total = doc.walk_inner(nav.content_root()).count();

        let mut expected_start = 0;
        for unit in nav.units() {
            let Span::Range { start, end } = unit.span else {
                panic!("flat unit with subtree span");
            };
            assert_eq!(start, expected_start);
            assert!(end > start);
            expected_start = end;
        }
        assert_eq!(expected_start, total);
    }

    #[test]
    fn test_facsimile_pointer_resolved() {
        let (_, nav) = navigation(
            r##"<TEI><facsimile><surface xml:id="f1"><graphic url="p1.jpg"/></surface></facsimile><text><pb facs="#f1"/>x</text></TEI>"##,
            LeadingContent::Keep,
        );

        assert_eq!(nav.units()[0].facsimile.as_deref(), Some("p1.jpg"));
    }
}
