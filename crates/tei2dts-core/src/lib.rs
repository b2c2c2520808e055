//! TEI to DTS transformation.
//!
//! Turns a TEI document into addressable units with stable identifiers,
//! a navigation structure and one XML fragment per unit:
//!
//! - **Hierarchical** navigation follows nested `<div>` elements.
//! - **Flat** navigation cuts the text at every `<pb/>`, across divisions.
//!
//! # Example
//!
//! ```
//! use tei2dts_core::{ConvertOptions, NavigationMode, convert};
//!
//! let input = r#"<TEI><text><pb facs="p1.jpg"/>one<pb/>two</text></TEI>"#;
//! let options = ConvertOptions {
//!     mode: NavigationMode::Flat,
//!     id_prefix: "p".to_owned(),
//!     ..ConvertOptions::default()
//! };
//! let conversion = convert(input, &options).unwrap();
//!
//! assert_eq!(conversion.navigation.len(), 2);
//! assert_eq!(conversion.fragments[0].id, "p1");
//! assert_eq!(conversion.fragments[0].facsimile.as_deref(), Some("p1.jpg"));
//! ```

mod convert;
mod error;
mod facsimile;
mod fragment;
mod ids;
mod navigation;
mod tei;

pub use convert::{Conversion, ConvertOptions, convert};
pub use error::ConvertError;
pub use facsimile::FacsimileResolver;
pub use fragment::{DTS_NAMESPACE, Fragment, FragmentExtractor};
pub use ids::{AssignedIds, IdAssigner};
pub use navigation::{
    Candidates, FlatBuilder, HierarchicalBuilder, LeadingContent, Navigation, NavigationBuilder,
    NavigationMode, Span, Unit, builder_for,
};
pub use tei::{TEI_NAMESPACE, XML_ID, content_root, document_title};
