//! Static DTS output for tei2dts.
//!
//! Turns a [`tei2dts_core::Conversion`] into a file tree that a plain web
//! server can publish as the document and navigation endpoints of a
//! Distributed Text Services API.

mod assembler;
mod payload;
mod url;

pub use assembler::{BuildConfig, BuildError, BuildReport, OutputAssembler};
pub use payload::{
    DocumentDescriptor, NavigationPayload, UnitEntry, UnitNavigationPayload, UnitRef,
};
pub use url::{Resource, UrlScheme, encode_segment};
