//! XML parser producing an arena [`Document`].
//!
//! Drives `quick-xml` events through an explicit stack of open elements, so
//! nesting depth is bounded by memory rather than the call stack.

use quick_xml::Decoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::document::{Attribute, Document, Element, Node, NodeId, NodeKind};
use crate::error::ParseError;

/// Parse `input` into a [`Document`].
pub(crate) fn parse(input: &str) -> Result<Document, ParseError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(false);

    let mut builder = TreeBuilder::default();

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(source) => {
                return Err(ParseError::Xml {
                    position: reader.error_position(),
                    source,
                });
            }
        };
        let position = reader.buffer_position();
        let decoder = reader.decoder();

        match event {
            Event::Start(e) => {
                let element = decode_element(decoder, &e, false)?;
                builder.open(element, position)?;
            }
            Event::Empty(e) => {
                let element = decode_element(decoder, &e, true)?;
                builder.open(element, position)?;
                builder.close();
            }
            Event::End(_) => {
                // The reader rejects mismatched end tags.
                builder.close();
            }
            Event::Text(e) => {
                let text = decoder.decode(&e)?;
                builder.text(&text, position)?;
            }
            Event::GeneralRef(e) => {
                // Entity references stay raw; values are unescaped on read.
                let entity = decoder.decode(&e)?;
                builder.text(&format!("&{entity};"), position)?;
            }
            Event::CData(e) => {
                let text = decoder.decode(&e)?.into_owned();
                builder.leaf(NodeKind::CData(text), None, position)?;
            }
            Event::Comment(e) => {
                let text = decoder.decode(&e)?.into_owned();
                let raw = format!("<!--{text}-->");
                builder.leaf(NodeKind::Comment(text), Some(raw), position)?;
            }
            Event::PI(e) => {
                let text = decoder.decode(&e)?.into_owned();
                let raw = format!("<?{text}?>");
                builder.leaf(NodeKind::ProcessingInstruction(text), Some(raw), position)?;
            }
            Event::Decl(e) => {
                let text = decoder.decode(&e)?;
                builder.outside_root(format!("<?{text}?>"), position)?;
            }
            Event::DocType(e) => {
                let text = decoder.decode(&e)?;
                builder.outside_root(format!("<!DOCTYPE {text}>"), position)?;
            }
            Event::Eof => break,
        }
    }

    builder.finish()
}

/// Decode element name and attributes, keeping attribute values raw.
fn decode_element(
    decoder: Decoder,
    e: &BytesStart,
    self_closing: bool,
) -> Result<Element, ParseError> {
    let name = decoder.decode(e.name().as_ref())?.into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        attrs.push(Attribute {
            name: decoder.decode(attr.key.as_ref())?.into_owned(),
            raw_value: decoder.decode(&attr.value)?.into_owned(),
        });
    }
    Ok(Element {
        name,
        attrs,
        self_closing,
    })
}

/// Incremental arena construction.
#[derive(Default)]
struct TreeBuilder {
    nodes: Vec<Node>,
    open: Vec<NodeId>,
    root: Option<NodeId>,
    prolog: Vec<String>,
    epilog: Vec<String>,
}

impl TreeBuilder {
    fn open(&mut self, element: Element, position: u64) -> Result<(), ParseError> {
        let parent = self.open.last().copied();
        if parent.is_none() && self.root.is_some() {
            return Err(ParseError::ContentOutsideRoot { position });
        }
        let id = Document::push_node(&mut self.nodes, NodeKind::Element(element), parent);
        if parent.is_none() {
            self.root = Some(id);
        }
        self.open.push(id);
        Ok(())
    }

    fn close(&mut self) {
        self.open.pop();
    }

    /// Append raw text, merging with a preceding text sibling.
    fn text(&mut self, raw: &str, position: u64) -> Result<(), ParseError> {
        let Some(parent) = self.open.last().copied() else {
            if raw.trim().is_empty() {
                return self.outside_root(raw.to_owned(), position);
            }
            return Err(ParseError::ContentOutsideRoot { position });
        };

        let last = self.nodes[parent.index()].children.last().copied();
        if let Some(last) = last
            && let NodeKind::Text(existing) = &mut self.nodes[last.index()].kind
        {
            existing.push_str(raw);
            return Ok(());
        }
        Document::push_node(&mut self.nodes, NodeKind::Text(raw.to_owned()), Some(parent));
        Ok(())
    }

    /// Add a non-text leaf; `raw` is its markup when it may appear outside the root.
    fn leaf(
        &mut self,
        kind: NodeKind,
        raw: Option<String>,
        position: u64,
    ) -> Result<(), ParseError> {
        match (self.open.last().copied(), raw) {
            (Some(parent), _) => {
                Document::push_node(&mut self.nodes, kind, Some(parent));
                Ok(())
            }
            (None, Some(raw)) => self.outside_root(raw, position),
            (None, None) => Err(ParseError::ContentOutsideRoot { position }),
        }
    }

    /// Record markup found before or after the root element.
    fn outside_root(&mut self, raw: String, position: u64) -> Result<(), ParseError> {
        if !self.open.is_empty() {
            return Err(ParseError::ContentOutsideRoot { position });
        }
        if self.root.is_some() {
            self.epilog.push(raw);
        } else {
            self.prolog.push(raw);
        }
        Ok(())
    }

    fn finish(self) -> Result<Document, ParseError> {
        if let Some(&unclosed) = self.open.last() {
            let name = match &self.nodes[unclosed.index()].kind {
                NodeKind::Element(el) => el.name.clone(),
                _ => String::new(),
            };
            return Err(ParseError::UnclosedElement { name });
        }
        let root = self.root.ok_or(ParseError::NoRootElement)?;
        Ok(Document::from_parts(self.nodes, root, self.prolog, self.epilog))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_simple_element() {
        let doc = parse("<p>Hello</p>").unwrap();

        assert_eq!(doc.local_name(doc.root()), Some("p"));
        assert_eq!(doc.text_content(doc.root()), "Hello");
    }

    #[test]
    fn test_parse_nested_elements() {
        let doc = parse("<p><hi rend=\"bold\">Bold</hi> text</p>").unwrap();
        let children = doc.children(doc.root());

        assert_eq!(children.len(), 2);
        assert_eq!(doc.local_name(children[0]), Some("hi"));
        assert_eq!(doc.attr(children[0], "rend").as_deref(), Some("bold"));
        assert_eq!(doc.node(children[1]).kind, NodeKind::Text(" text".to_owned()));
    }

    #[test]
    fn test_parse_merges_text_around_entities() {
        let doc = parse("<p>a &amp; b &#233;</p>").unwrap();
        let children = doc.children(doc.root());

        assert_eq!(children.len(), 1);
        assert_eq!(
            doc.node(children[0]).kind,
            NodeKind::Text("a &amp; b &#233;".to_owned())
        );
        assert_eq!(doc.text_content(doc.root()), "a & b \u{e9}");
    }

    #[test]
    fn test_parse_self_closing_elements() {
        let doc = parse("<p>Before<lb/>After</p>").unwrap();
        let lb = doc.children(doc.root())[1];

        assert!(doc.element(lb).unwrap().self_closing);
        assert_eq!(doc.serialize(), "<p>Before<lb/>After</p>");
    }

    #[test]
    fn test_parse_keeps_prolog() {
        let input = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!-- note -->\n<TEI/>\n";
        let doc = parse(input).unwrap();

        assert_eq!(doc.prolog().len(), 4);
        assert_eq!(doc.serialize(), input);
    }

    #[test]
    fn test_parse_keeps_comments_and_cdata() {
        let input = "<a><!-- c --><![CDATA[<x>]]><?pi data?></a>";
        let doc = parse(input).unwrap();

        assert_eq!(doc.serialize(), input);
    }

    #[test]
    fn test_parse_mismatched_end_tag_fails() {
        let err = parse("<a><b></a>").unwrap_err();

        assert!(matches!(err, ParseError::Xml { .. }), "got {err:?}");
    }

    #[test]
    fn test_parse_unclosed_element_fails() {
        let err = parse("<a><b>text").unwrap_err();

        assert!(
            matches!(err, ParseError::Xml { .. } | ParseError::UnclosedElement { .. }),
            "got {err:?}"
        );
    }

    #[test]
    fn test_parse_second_root_fails() {
        let err = parse("<a/><b/>").unwrap_err();

        assert!(matches!(err, ParseError::ContentOutsideRoot { .. }));
    }

    #[test]
    fn test_parse_text_outside_root_fails() {
        let err = parse("<a/>trailing").unwrap_err();

        assert!(matches!(err, ParseError::ContentOutsideRoot { .. }));
    }

    #[test]
    fn test_parse_empty_input_fails() {
        let err = parse("  \n").unwrap_err();

        assert!(matches!(err, ParseError::NoRootElement));
    }

    #[test]
    fn test_parse_duplicate_attribute_fails() {
        let err = parse(r#"<a n="1" n="2"/>"#).unwrap_err();

        assert!(matches!(err, ParseError::Attr(_)), "got {err:?}");
    }

    #[test]
    fn test_parse_deep_nesting() {
        let depth = 10_000;
        let input = format!("{}{}", "<d>".repeat(depth), "</d>".repeat(depth));
        let doc = parse(&input).unwrap();

        assert_eq!(doc.len(), depth);
        assert_eq!(doc.serialize(), input);
    }
}
