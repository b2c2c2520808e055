//! Error types for the conversion pipeline.

use tei2dts_tree::ParseError;

/// Fatal conversion error. Nothing is written when one occurs.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// Input is not well-formed XML.
    #[error("{0}")]
    Parse(#[from] ParseError),

    /// Input is XML but lacks the TEI skeleton.
    #[error("not a valid TEI document: {0}")]
    NotTei(&'static str),

    /// The same `xml:id` appears on more than one element.
    #[error("identifier \"{id}\" is used more than once")]
    IdCollision {
        /// The duplicated identifier.
        id: String,
    },

    /// A unit element reached the navigation builder without an `xml:id`.
    #[error("<{element}> has no xml:id; identifiers must be assigned before building navigation")]
    MissingId {
        /// Qualified name of the element.
        element: String,
    },
}
