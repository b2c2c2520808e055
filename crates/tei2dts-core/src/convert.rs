//! Conversion pipeline: parse, assign identifiers, build navigation and
//! extract fragments.

use tei2dts_tree::Document;

use crate::error::ConvertError;
use crate::fragment::{Fragment, FragmentExtractor};
use crate::ids::IdAssigner;
use crate::navigation::{LeadingContent, Navigation, NavigationMode, builder_for};
use crate::tei::{content_root, document_title};

/// Settings threaded through one conversion run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    /// How units are derived.
    pub mode: NavigationMode,
    /// Prefix of generated identifiers.
    pub id_prefix: String,
    /// Flat mode handling of content before the first page break.
    pub leading_content: LeadingContent,
}

/// Everything the output layer needs from one document.
#[derive(Debug)]
pub struct Conversion {
    /// Source tree with identifiers assigned.
    pub document: Document,
    /// Ordered units.
    pub navigation: Navigation,
    /// One fragment per unit, in navigation order.
    pub fragments: Vec<Fragment>,
    /// Main title from the TEI header.
    pub title: Option<String>,
}

/// Convert TEI source text.
///
/// # Errors
///
/// Returns [`ConvertError`] if the input is malformed, is not TEI, or
/// reuses an `xml:id`. Nothing is produced in that case.
pub fn convert(input: &str, options: &ConvertOptions) -> Result<Conversion, ConvertError> {
    let mut document = Document::parse(input)?;
    let root = content_root(&document)?;
    let builder = builder_for(options.mode, options.leading_content);

    let candidates = builder.candidates(&document, root);
    let assigned = IdAssigner::new(options.id_prefix.as_str()).assign(&mut document, &candidates)?;
    tracing::debug!(
        candidates = candidates.elements.len(),
        generated = assigned.generated,
        "Assigned identifiers"
    );

    let navigation = builder.build(&document, root, assigned.leading.as_deref())?;
    if navigation.is_empty() {
        tracing::warn!(
            mode = %builder.mode(),
            "No units found; only the whole document will be published"
        );
    }

    let fragments = FragmentExtractor::new(&document, &navigation).extract_all();
    let title = document_title(&document);
    tracing::info!(mode = %builder.mode(), units = navigation.len(), "Converted document");

    Ok(Conversion {
        document,
        navigation,
        fragments,
        title,
    })
}
