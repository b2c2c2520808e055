//! JSON payloads of the navigation endpoint and the document descriptor.
//!
//! Navigation members are listed in navigation order. Hierarchy is expressed
//! by `level`, `parent` and `children` references rather than by nesting, so
//! payloads stay flat for arbitrarily deep documents.

use serde::Serialize;
use tei2dts_core::{Navigation, NavigationMode, Unit};

use crate::url::{Resource, UrlScheme};

/// Top-level description of a converted document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDescriptor {
    /// Resource kind.
    #[serde(rename = "@type")]
    pub kind: &'static str,
    /// Document identifier.
    pub id: String,
    /// Title from the TEI header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Navigation mode of the publication.
    pub mode: NavigationMode,
    /// Number of units.
    pub units: usize,
    /// URL of the whole document.
    pub document: String,
    /// URL of the navigation payload.
    pub navigation: String,
}

/// Reference to a unit from another unit's payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitRef {
    /// Unit identifier.
    pub identifier: String,
    /// Human-readable label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// URL of the unit fragment.
    pub document: String,
    /// URL of the unit navigation payload.
    pub navigation: String,
}

/// One member of the navigation list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitEntry {
    /// Resource kind.
    #[serde(rename = "@type")]
    pub kind: &'static str,
    /// Unit identifier.
    pub identifier: String,
    /// Nesting level, 1 for top-level units.
    pub level: usize,
    /// Human-readable label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Citation type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cite_type: Option<String>,
    /// Identifier of the parent unit, `null` for top-level units.
    pub parent: Option<String>,
    /// Identifiers of child units.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    /// Identifier of the preceding unit (flat navigation).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    /// Identifier of the following unit (flat navigation).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    /// Page-image reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facsimile: Option<String>,
    /// URL of the unit fragment.
    pub document: String,
    /// URL of the unit navigation payload.
    pub navigation: String,
}

/// Full navigation of a document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationPayload {
    /// Resource kind.
    #[serde(rename = "@type")]
    pub kind: &'static str,
    /// Document identifier.
    pub resource: String,
    /// Navigation mode.
    pub mode: NavigationMode,
    /// URL of the whole document.
    pub document: String,
    /// Units in navigation order.
    pub member: Vec<UnitEntry>,
}

/// Navigation around a single unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitNavigationPayload {
    /// Resource kind.
    #[serde(rename = "@type")]
    pub kind: &'static str,
    /// Document identifier.
    pub resource: String,
    /// Navigation mode.
    pub mode: NavigationMode,
    /// The unit itself.
    pub unit: UnitEntry,
    /// Parent unit.
    pub parent: Option<UnitRef>,
    /// Child units.
    pub children: Vec<UnitRef>,
    /// Preceding unit in navigation order.
    pub previous: Option<UnitRef>,
    /// Following unit in navigation order.
    pub next: Option<UnitRef>,
}

/// Builds payloads for one document.
pub(crate) struct PayloadBuilder<'a> {
    doc_id: &'a str,
    nav: &'a Navigation,
    urls: &'a UrlScheme,
}

impl<'a> PayloadBuilder<'a> {
    pub(crate) fn new(doc_id: &'a str, nav: &'a Navigation, urls: &'a UrlScheme) -> Self {
        Self { doc_id, nav, urls }
    }

    pub(crate) fn descriptor(&self, title: Option<String>) -> DocumentDescriptor {
        DocumentDescriptor {
            kind: "Resource",
            id: self.doc_id.to_owned(),
            title,
            mode: self.nav.mode(),
            units: self.nav.len(),
            document: self.urls.url(Resource::Document, self.doc_id, None),
            navigation: self.urls.url(Resource::Navigation, self.doc_id, None),
        }
    }

    pub(crate) fn navigation(&self) -> NavigationPayload {
        NavigationPayload {
            kind: "Navigation",
            resource: self.doc_id.to_owned(),
            mode: self.nav.mode(),
            document: self.urls.url(Resource::Document, self.doc_id, None),
            member: self.nav.units().iter().map(|u| self.entry(u)).collect(),
        }
    }

    pub(crate) fn unit_navigation(&self, unit: &Unit) -> UnitNavigationPayload {
        UnitNavigationPayload {
            kind: "Navigation",
            resource: self.doc_id.to_owned(),
            mode: self.nav.mode(),
            unit: self.entry(unit),
            parent: self.nav.parent(unit).map(|u| self.unit_ref(u)),
            children: self.nav.children(unit).map(|u| self.unit_ref(u)).collect(),
            previous: self.nav.previous(unit).map(|u| self.unit_ref(u)),
            next: self.nav.next(unit).map(|u| self.unit_ref(u)),
        }
    }

    fn entry(&self, unit: &Unit) -> UnitEntry {
        let flat = self.nav.mode() == NavigationMode::Flat;
        let id_of = |u: &Unit| u.id.clone();
        UnitEntry {
            kind: "CitableUnit",
            identifier: unit.id.clone(),
            level: unit.depth,
            label: unit.label.clone(),
            cite_type: unit.cite_type.clone(),
            parent: self.nav.parent(unit).map(id_of),
            children: self.nav.children(unit).map(id_of).collect(),
            previous: flat.then(|| self.nav.previous(unit).map(id_of)).flatten(),
            next: flat.then(|| self.nav.next(unit).map(id_of)).flatten(),
            facsimile: unit.facsimile.clone(),
            document: self.urls.url(Resource::Document, self.doc_id, Some(&unit.id)),
            navigation: self.urls.url(Resource::Navigation, self.doc_id, Some(&unit.id)),
        }
    }

    fn unit_ref(&self, unit: &Unit) -> UnitRef {
        UnitRef {
            identifier: unit.id.clone(),
            label: unit.label.clone(),
            document: self.urls.url(Resource::Document, self.doc_id, Some(&unit.id)),
            navigation: self.urls.url(Resource::Navigation, self.doc_id, Some(&unit.id)),
        }
    }
}
