//! Lossless XML tree model for tei2dts.
//!
//! Parses a document into an arena of nodes and serializes any subtree or
//! walk-event range back to markup. Text and attribute values are kept in
//! their raw (escaped) source form, so serializing an untouched document
//! reproduces its elements, text and entity references as written.
//!
//! # Quick Start
//!
//! ```
//! use tei2dts_tree::Document;
//!
//! let mut doc = Document::parse(r#"<TEI><text><pb n="1"/>Hello</text></TEI>"#)?;
//! let text = doc.child_elements(doc.root(), "text").next().unwrap();
//! let pb = doc.child_elements(text, "pb").next().unwrap();
//! assert_eq!(doc.attr(pb, "n").as_deref(), Some("1"));
//!
//! doc.set_attr(pb, "xml:id", "p1");
//! assert_eq!(doc.serialize_node(text), r#"<text><pb n="1" xml:id="p1"/>Hello</text>"#);
//! # Ok::<(), tei2dts_tree::ParseError>(())
//! ```

mod document;
mod error;
mod parser;
mod serializer;

pub use document::{Attribute, Document, Element, Node, NodeId, NodeKind, WalkEvent, local_name};
pub use error::ParseError;
pub use serializer::{write_close_tag, write_events, write_open_tag};
