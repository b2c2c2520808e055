//! Error types for XML parsing.

/// Error while parsing a document.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Malformed XML reported by the reader.
    #[error("XML parse error at byte {position}: {source}")]
    Xml {
        /// Byte offset of the error.
        position: u64,
        /// Reader error.
        source: quick_xml::Error,
    },

    /// XML attribute error.
    #[error("XML attribute error: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    /// Encoding error during XML parsing.
    #[error("encoding error: {0}")]
    Encoding(#[from] quick_xml::encoding::EncodingError),

    /// Input ended inside an element.
    #[error("unexpected end of input: <{name}> is not closed")]
    UnclosedElement {
        /// Qualified name of the innermost open element.
        name: String,
    },

    /// Text or a second element outside the root element.
    #[error("content outside the root element at byte {position}")]
    ContentOutsideRoot {
        /// Byte offset after the offending content.
        position: u64,
    },

    /// Input contains no element.
    #[error("document has no root element")]
    NoRootElement,
}
