//! Unit identifier assignment.
//!
//! Every unit element must carry a unique `xml:id` before navigation is
//! built. Explicit identifiers are kept; missing ones are generated as
//! `<prefix><counter>` and written back into the tree so fragments and
//! navigation agree.

use std::collections::HashSet;

use tei2dts_tree::Document;

use crate::error::ConvertError;
use crate::navigation::Candidates;
use crate::tei::XML_ID;

/// Result of identifier assignment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssignedIds {
    /// Number of identifiers written into the tree.
    pub generated: usize,
    /// Identifier reserved for the implicit leading unit.
    pub leading: Option<String>,
}

/// Ensures unit elements carry unique identifiers.
#[derive(Clone, Debug)]
pub struct IdAssigner {
    prefix: String,
}

impl IdAssigner {
    /// Create an assigner generating `<prefix><counter>` identifiers.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Assign identifiers to all candidates.
    ///
    /// The leading unit, when requested, takes the first generated value;
    /// candidate elements follow in document order.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::IdCollision`] if any explicit `xml:id` value
    /// occurs more than once in the document. The tree is left untouched in
    /// that case.
    pub fn assign(
        &self,
        doc: &mut Document,
        candidates: &Candidates,
    ) -> Result<AssignedIds, ConvertError> {
        let taken = explicit_ids(doc)?;
        let mut generator = IdGenerator {
            prefix: &self.prefix,
            counter: 0,
            taken: &taken,
        };

        let leading = candidates.leading.then(|| generator.next_id());

        let mut generated = 0;
        for &node in &candidates.elements {
            match doc.attr(node, XML_ID) {
                Some(id) if !id.is_empty() => continue,
                Some(_) => {
                    tracing::warn!(
                        element = doc.local_name(node).unwrap_or_default(),
                        "Empty xml:id replaced with a generated identifier"
                    );
                }
                None => {}
            }
            let id = generator.next_id();
            tracing::debug!(%id, "Generated unit identifier");
            doc.set_attr(node, XML_ID, &id);
            generated += 1;
        }

        Ok(AssignedIds { generated, leading })
    }
}

/// Sequential identifiers that avoid explicit values.
struct IdGenerator<'a> {
    prefix: &'a str,
    counter: u64,
    taken: &'a HashSet<String>,
}

impl IdGenerator<'_> {
    fn next_id(&mut self) -> String {
        loop {
            self.counter += 1;
            let id = format!("{}{}", self.prefix, self.counter);
            if !self.taken.contains(&id) {
                return id;
            }
        }
    }
}

/// All non-empty `xml:id` values in the document.
fn explicit_ids(doc: &Document) -> Result<HashSet<String>, ConvertError> {
    let mut seen = HashSet::new();
    let nodes = std::iter::once(doc.root()).chain(doc.descendants(doc.root()));
    for node in nodes {
        let Some(id) = doc.attr(node, XML_ID) else {
            continue;
        };
        if id.is_empty() {
            continue;
        }
        if !seen.insert(id.clone().into_owned()) {
            return Err(ConvertError::IdCollision {
                id: id.into_owned(),
            });
        }
    }
    Ok(seen)
}
