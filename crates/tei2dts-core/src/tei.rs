//! TEI vocabulary and document skeleton lookups.

use tei2dts_tree::{Document, NodeId};

use crate::error::ConvertError;

/// TEI namespace URI.
pub const TEI_NAMESPACE: &str = "http://www.tei-c.org/ns/1.0";

/// Identifier attribute carried by every unit element.
pub const XML_ID: &str = "xml:id";

pub(crate) const TEI: &str = "TEI";
pub(crate) const TEXT: &str = "text";
pub(crate) const DIV: &str = "div";
pub(crate) const HEAD: &str = "head";
pub(crate) const PB: &str = "pb";
pub(crate) const FACS: &str = "facs";
pub(crate) const N: &str = "n";
pub(crate) const TYPE: &str = "type";

/// Locate the `<text>` element under the `<TEI>` root.
///
/// Units are only discovered inside this element.
///
/// # Errors
///
/// Returns [`ConvertError::NotTei`] if the root is not `TEI` or has no
/// `text` child.
pub fn content_root(doc: &Document) -> Result<NodeId, ConvertError> {
    let root = doc.root();
    if !doc.is_element(root, TEI) {
        return Err(ConvertError::NotTei("root element is not 'TEI'"));
    }
    doc.child_elements(root, TEXT)
        .next()
        .ok_or(ConvertError::NotTei("missing 'text' element"))
}

/// Main title from `teiHeader/fileDesc/titleStmt/title`.
#[must_use]
pub fn document_title(doc: &Document) -> Option<String> {
    let mut node = doc.root();
    for step in ["teiHeader", "fileDesc", "titleStmt", "title"] {
        node = doc.child_elements(node, step).next()?;
    }
    let title = normalize_space(&doc.text_content(node));
    (!title.is_empty()).then_some(title)
}

/// Collapse runs of whitespace into single spaces and trim.
pub(crate) fn normalize_space(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
