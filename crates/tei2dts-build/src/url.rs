//! Reference URLs and file locations of the output tree.
//!
//! Every published file has a URL of the form
//! `{api_base}/{endpoint}/{document}[/{unit}].{ext}` and lives at the same
//! relative path under the output directory. Identifiers are percent-encoded
//! so that any `xml:id` maps to a single safe path segment.

use std::path::PathBuf;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Unreserved characters (RFC 3986): A-Z a-z 0-9 - . _ ~
const SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode an identifier as one path segment.
///
/// Segments made only of dots are fully encoded so they cannot address a
/// parent or current directory.
#[must_use]
pub fn encode_segment(id: &str) -> String {
    if !id.is_empty() && id.bytes().all(|b| b == b'.') {
        return "%2E".repeat(id.len());
    }
    utf8_percent_encode(id, SEGMENT_ENCODE_SET).to_string()
}

/// File extension of published resources.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    /// XML fragment or whole document.
    Document,
    /// JSON navigation payload.
    Navigation,
}

impl Resource {
    fn extension(self) -> &'static str {
        match self {
            Self::Document => "xml",
            Self::Navigation => "json",
        }
    }
}

/// URL prefixes and endpoint sub-paths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlScheme {
    api_base: String,
    document_path: String,
    navigation_path: String,
}

impl UrlScheme {
    /// Create a scheme from an API base URL and endpoint sub-paths.
    #[must_use]
    pub fn new(
        api_base: impl Into<String>,
        document_path: impl Into<String>,
        navigation_path: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            document_path: document_path.into(),
            navigation_path: navigation_path.into(),
        }
    }

    /// URL of the document descriptor.
    #[must_use]
    pub fn descriptor_url(&self, doc_id: &str) -> String {
        join_url(&[
            &self.api_base,
            &format!("{}.json", encode_segment(doc_id)),
        ])
    }

    /// URL of a whole-document or per-unit resource.
    #[must_use]
    pub fn url(&self, resource: Resource, doc_id: &str, unit_id: Option<&str>) -> String {
        let leaf = leaf_path(resource, doc_id, unit_id);
        join_url(&[&self.api_base, self.sub_path(resource), &leaf])
    }

    /// Path of the descriptor relative to the output directory.
    #[must_use]
    pub fn descriptor_file(&self, doc_id: &str) -> PathBuf {
        PathBuf::from(format!("{}.json", encode_segment(doc_id)))
    }

    /// Path of a resource relative to the output directory.
    #[must_use]
    pub fn file(&self, resource: Resource, doc_id: &str, unit_id: Option<&str>) -> PathBuf {
        let mut path: PathBuf = self
            .sub_path(resource)
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        path.push(leaf_path(resource, doc_id, unit_id));
        path
    }

    fn sub_path(&self, resource: Resource) -> &str {
        match resource {
            Resource::Document => &self.document_path,
            Resource::Navigation => &self.navigation_path,
        }
    }
}

/// `{doc}.{ext}` or `{doc}/{unit}.{ext}`, encoded.
fn leaf_path(resource: Resource, doc_id: &str, unit_id: Option<&str>) -> String {
    let ext = resource.extension();
    match unit_id {
        Some(unit) => format!("{}/{}.{ext}", encode_segment(doc_id), encode_segment(unit)),
        None => format!("{}.{ext}", encode_segment(doc_id)),
    }
}

/// Join URL parts with `/`, collapsing repeated slashes after the scheme.
fn join_url(parts: &[&str]) -> String {
    let joined = parts.join("/");
    let (scheme, rest) = match joined.split_once("://") {
        Some((scheme, rest)) if !scheme.is_empty() && !scheme.contains('/') => {
            (Some(scheme), rest)
        }
        _ => (None, joined.as_str()),
    };

    let mut out = String::with_capacity(joined.len());
    if let Some(scheme) = scheme {
        out.push_str(scheme);
        out.push_str("://");
    }
    let mut previous_slash = false;
    for c in rest.chars() {
        if c == '/' && previous_slash {
            continue;
        }
        previous_slash = c == '/';
        out.push(c);
    }
    out
}
