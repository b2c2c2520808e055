//! Page-image references.
//!
//! A `facs` value is either a URL, kept as written, or a local pointer
//! (`#id`) to a `<surface>`, `<zone>` or `<graphic>` in the document's
//! `<facsimile>` section, resolved to the first `<graphic url>` found there.

use std::collections::HashMap;

use tei2dts_tree::{Document, NodeId};

use crate::tei::XML_ID;

const SURFACE: &str = "surface";
const ZONE: &str = "zone";
const GRAPHIC: &str = "graphic";
const URL: &str = "url";

/// Resolves `facs` values against the document's facsimile elements.
#[derive(Debug)]
pub struct FacsimileResolver<'a> {
    doc: &'a Document,
    targets: HashMap<String, NodeId>,
}

impl<'a> FacsimileResolver<'a> {
    /// Index the identified surfaces, zones and graphics of `doc`.
    #[must_use]
    pub fn new(doc: &'a Document) -> Self {
        let targets = doc
            .descendants(doc.root())
            .filter(|&n| {
                matches!(doc.local_name(n), Some(SURFACE | ZONE | GRAPHIC))
            })
            .filter_map(|n| doc.attr(n, XML_ID).map(|id| (id.into_owned(), n)))
            .collect();
        Self { doc, targets }
    }

    /// Resolve a `facs` attribute value.
    ///
    /// Values that are not local pointers, and pointers that lead nowhere,
    /// are returned unchanged.
    #[must_use]
    pub fn resolve(&self, value: &str) -> String {
        let Some(target) = value.strip_prefix('#') else {
            return value.to_owned();
        };
        let url = self
            .targets
            .get(target)
            .and_then(|&node| self.graphic_url(node));
        if let Some(url) = url {
            tracing::debug!(pointer = value, %url, "Resolved facsimile");
            url
        } else {
            tracing::warn!(pointer = value, "Facsimile reference does not resolve, kept as is");
            value.to_owned()
        }
    }

    /// First `<graphic url>` at or below `node`.
    fn graphic_url(&self, node: NodeId) -> Option<String> {
        std::iter::once(node)
            .chain(self.doc.descendants(node))
            .filter(|&n| self.doc.is_element(n, GRAPHIC))
            .find_map(|n| self.doc.attr(n, URL).map(|u| u.into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = r#"<TEI>
  <facsimile>
    <surface xml:id="s1"><zone xml:id="z1"><graphic url="zone1.jpg"/></zone><graphic url="page1.jpg"/></surface>
    <surface xml:id="s2"/>
    <graphic xml:id="g3" url="page3.png"/>
  </facsimile>
  <text/>
</TEI>"#;

    #[test]
    fn test_plain_url_unchanged() {
        let doc = Document::parse(DOC).unwrap();
        let resolver = FacsimileResolver::new(&doc);

        assert_eq!(resolver.resolve("img1"), "img1");
        assert_eq!(resolver.resolve("https://img.example/p1.jpg"), "https://img.example/p1.jpg");
    }

    #[test]
    fn test_pointer_to_surface() {
        let doc = Document::parse(DOC).unwrap();
        let resolver = FacsimileResolver::new(&doc);

        assert_eq!(resolver.resolve("#s1"), "zone1.jpg");
        assert_eq!(resolver.resolve("#z1"), "zone1.jpg");
    }

    #[test]
    fn test_pointer_to_graphic() {
        let doc = Document::parse(DOC).unwrap();
        let resolver = FacsimileResolver::new(&doc);

        assert_eq!(resolver.resolve("#g3"), "page3.png");
    }

    #[test]
    fn test_unresolved_pointer_kept() {
        let doc = Document::parse(DOC).unwrap();
        let resolver = FacsimileResolver::new(&doc);

        assert_eq!(resolver.resolve("#s2"), "#s2");
        assert_eq!(resolver.resolve("#missing"), "#missing");
    }
}
