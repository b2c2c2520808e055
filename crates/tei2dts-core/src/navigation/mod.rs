//! Navigation structure for addressable units.
//!
//! Units are stored in a flat `Vec<Unit>` with parent/children relationships
//! tracked by indices, in navigation order:
//! - hierarchical mode: pre-order over nested `<div>` elements
//! - flat mode: one unit per `<pb/>`, optionally preceded by a leading unit
//!
//! Two builders implement [`NavigationBuilder`]; [`builder_for`] selects one
//! from [`ConvertOptions`](crate::ConvertOptions).

mod flat;
mod hierarchical;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tei2dts_tree::{Document, NodeId};

use crate::error::ConvertError;
use crate::tei::XML_ID;

pub use flat::FlatBuilder;
pub use hierarchical::HierarchicalBuilder;

/// How units are derived from the document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationMode {
    /// One unit per `<div>`, nested like the divisions.
    #[default]
    Hierarchical,
    /// One unit per `<pb/>`, in a flat list.
    Flat,
}

impl NavigationMode {
    /// Lowercase name used in configuration and output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hierarchical => "hierarchical",
            Self::Flat => "flat",
        }
    }
}

impl fmt::Display for NavigationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NavigationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hierarchical" => Ok(Self::Hierarchical),
            "flat" => Ok(Self::Flat),
            other => Err(format!(
                "unknown navigation mode '{other}' (expected 'hierarchical' or 'flat')"
            )),
        }
    }
}

/// What flat mode does with content before the first `<pb/>`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadingContent {
    /// Publish significant leading content as an extra first unit.
    #[default]
    Keep,
    /// Leave leading content out of every unit.
    Drop,
}

impl fmt::Display for LeadingContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Keep => "keep",
            Self::Drop => "drop",
        })
    }
}

impl FromStr for LeadingContent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keep" => Ok(Self::Keep),
            "drop" => Ok(Self::Drop),
            other => Err(format!(
                "unknown leading content policy '{other}' (expected 'keep' or 'drop')"
            )),
        }
    }
}

/// Content owned by a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Span {
    /// The whole subtree of a division element.
    Subtree(NodeId),
    /// Half-open range of walk events inside the content root, as produced
    /// by [`Document::walk_inner`].
    Range {
        /// First owned event (the break marker's `Open`, or 0 for leading content).
        start: usize,
        /// First event not owned.
        end: usize,
    },
}

/// An addressable piece of the document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Unit {
    /// Identifier, unique in the document.
    pub id: String,
    /// Position in navigation order.
    pub ordinal: usize,
    /// Nesting level, 1 for top-level units.
    pub depth: usize,
    /// Human-readable label.
    pub label: Option<String>,
    /// Citation type (`type` of a division, `page` for break markers).
    pub cite_type: Option<String>,
    /// Index of the parent unit.
    pub parent: Option<usize>,
    /// Indices of child units in document order.
    pub children: Vec<usize>,
    /// Page-image reference (flat mode).
    pub facsimile: Option<String>,
    /// Owned content.
    pub span: Span,
}

/// Ordered units of one document.
#[derive(Clone, Debug)]
pub struct Navigation {
    mode: NavigationMode,
    content_root: NodeId,
    units: Vec<Unit>,
    roots: Vec<usize>,
    id_index: HashMap<String, usize>,
}

impl Navigation {
    /// Navigation mode that produced these units.
    #[must_use]
    pub fn mode(&self) -> NavigationMode {
        self.mode
    }

    /// The `<text>` element units were discovered in.
    #[must_use]
    pub fn content_root(&self) -> NodeId {
        self.content_root
    }

    /// All units in navigation order.
    #[must_use]
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Top-level units.
    pub fn roots(&self) -> impl Iterator<Item = &Unit> {
        self.roots.iter().map(|&i| &self.units[i])
    }

    /// Number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether no unit was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Unit by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Unit> {
        self.id_index.get(id).map(|&i| &self.units[i])
    }

    /// Parent of a unit.
    #[must_use]
    pub fn parent(&self, unit: &Unit) -> Option<&Unit> {
        unit.parent.map(|i| &self.units[i])
    }

    /// Children of a unit.
    pub fn children<'a>(&'a self, unit: &'a Unit) -> impl Iterator<Item = &'a Unit> {
        unit.children.iter().map(|&i| &self.units[i])
    }

    /// Unit preceding `unit` in navigation order.
    #[must_use]
    pub fn previous(&self, unit: &Unit) -> Option<&Unit> {
        unit.ordinal.checked_sub(1).map(|i| &self.units[i])
    }

    /// Unit following `unit` in navigation order.
    #[must_use]
    pub fn next(&self, unit: &Unit) -> Option<&Unit> {
        self.units.get(unit.ordinal + 1)
    }
}

/// Candidate unit elements of one navigation mode.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Candidates {
    /// Elements that become units, in document order.
    pub elements: Vec<NodeId>,
    /// Whether an implicit leading unit precedes them.
    pub leading: bool,
}

/// Strategy for turning a document into [`Navigation`].
pub trait NavigationBuilder {
    /// Mode implemented by this builder.
    fn mode(&self) -> NavigationMode;

    /// Elements that will become units, so identifiers can be assigned first.
    fn candidates(&self, doc: &Document, content_root: NodeId) -> Candidates;

    /// Build navigation from a document whose candidates carry `xml:id`.
    ///
    /// `leading_id` is the identifier reserved for the implicit leading unit,
    /// if [`Candidates::leading`] was set.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::MissingId`] if a candidate has no `xml:id`.
    fn build(
        &self,
        doc: &Document,
        content_root: NodeId,
        leading_id: Option<&str>,
    ) -> Result<Navigation, ConvertError>;
}

/// Builder for the given mode.
#[must_use]
pub fn builder_for(mode: NavigationMode, leading: LeadingContent) -> Box<dyn NavigationBuilder> {
    match mode {
        NavigationMode::Hierarchical => Box::new(HierarchicalBuilder),
        NavigationMode::Flat => Box::new(FlatBuilder::new(leading)),
    }
}

/// Incremental construction of a [`Navigation`] arena.
pub(crate) struct NavigationArena {
    mode: NavigationMode,
    content_root: NodeId,
    units: Vec<Unit>,
    roots: Vec<usize>,
}

impl NavigationArena {
    pub(crate) fn new(mode: NavigationMode, content_root: NodeId) -> Self {
        Self {
            mode,
            content_root,
            units: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Depth of the unit at `idx`.
    pub(crate) fn depth(&self, idx: usize) -> usize {
        self.units[idx].depth
    }

    /// Add a unit and link it to its parent.
    ///
    /// `ordinal`, `depth` and `children` of `unit` are filled in here.
    ///
    /// # Returns
    ///
    /// Index of the added unit.
    pub(crate) fn add(&mut self, mut unit: Unit) -> usize {
        let idx = self.units.len();
        unit.ordinal = idx;
        unit.depth = unit.parent.map_or(1, |p| self.units[p].depth + 1);
        unit.children.clear();

        if let Some(parent) = unit.parent {
            self.units[parent].children.push(idx);
        } else {
            self.roots.push(idx);
        }
        self.units.push(unit);
        idx
    }

    pub(crate) fn build(self) -> Navigation {
        let id_index = self
            .units
            .iter()
            .enumerate()
            .map(|(i, unit)| (unit.id.clone(), i))
            .collect();
        Navigation {
            mode: self.mode,
            content_root: self.content_root,
            units: self.units,
            roots: self.roots,
            id_index,
        }
    }
}

/// `xml:id` of a candidate element.
pub(crate) fn required_id(doc: &Document, node: NodeId) -> Result<String, ConvertError> {
    doc.attr(node, XML_ID)
        .map(|id| id.into_owned())
        .ok_or_else(|| ConvertError::MissingId {
            element: doc
                .element(node)
                .map(|el| el.name.clone())
                .unwrap_or_default(),
        })
}

/// Unit with only identifier, labels and span set.
pub(crate) fn unit(id: String, span: Span) -> Unit {
    Unit {
        id,
        ordinal: 0,
        depth: 0,
        label: None,
        cite_type: None,
        parent: None,
        children: Vec::new(),
        facsimile: None,
        span,
    }
}
