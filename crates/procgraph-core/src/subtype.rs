//! Subtype reasoner: classify every individual of every schema graph.
//!
//! A pure function of the current hierarchy. It is recomputed from scratch on
//! every change; nothing here is patched incrementally.

use crate::hierarchy::{Hierarchy, HierarchyNode};
use crate::vocab::Vocabulary;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Subtype {
    /// The concept's parent is the "undefined" sentinel (or missing).
    NotDefined,
    /// Has its own schema, and that schema hangs under this diagram.
    DetailedChild,
    /// Has its own schema elsewhere in the tree.
    DetailedExternal,
    /// No own schema; a direct sub-process of the process this diagram defines.
    NotDetailedChild,
    /// No own schema; belongs to some other process.
    NotDetailedExternal,
}

impl Subtype {
    pub const ALL: [Subtype; 5] = [
        Subtype::NotDefined,
        Subtype::DetailedChild,
        Subtype::DetailedExternal,
        Subtype::NotDetailedChild,
        Subtype::NotDetailedExternal,
    ];

    pub fn local_name(self) -> &'static str {
        match self {
            Subtype::NotDefined => "NotDefined",
            Subtype::DetailedChild => "DetailedChild",
            Subtype::DetailedExternal => "DetailedExternal",
            Subtype::NotDetailedChild => "NotDetailedChild",
            Subtype::NotDetailedExternal => "NotDetailedExternal",
        }
    }

    pub fn iri(self, vocab: &Vocabulary) -> String {
        format!("{}{}", vocab.subtype_namespace, self.local_name())
    }

    pub fn from_iri(iri: &str, vocab: &Vocabulary) -> Option<Self> {
        let local = iri.strip_prefix(vocab.subtype_namespace.as_str())?;
        Self::ALL.into_iter().find(|s| s.local_name() == local)
    }
}

impl fmt::Display for Subtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.local_name())
    }
}

/// Schema graph id → individual id → subtype. Schema graphs without
/// individuals are absent.
pub type SubtypeMap = BTreeMap<String, BTreeMap<String, Subtype>>;

/// Classify every individual contained in every schema graph.
pub fn compute_subtypes(hierarchy: &Hierarchy, vocab: &Vocabulary) -> SubtypeMap {
    let mut out = SubtypeMap::new();
    for schema in hierarchy.graphs_of_type(&vocab.schema_type) {
        let entries: BTreeMap<String, Subtype> = schema
            .individuals
            .iter()
            .map(|individual| {
                (
                    individual.clone(),
                    classify(hierarchy, schema, individual, vocab),
                )
            })
            .collect();
        if !entries.is_empty() {
            out.insert(schema.id.clone(), entries);
        }
    }
    tracing::debug!(schemas = out.len(), "subtypes computed");
    out
}

/// Decision order, first match wins:
/// 1. parent is the undefined sentinel (or there is none) → `NotDefined`
/// 2. own schema present → `DetailedChild` when that schema's parent is the
///    enclosing schema or the process it defines, else `DetailedExternal`
/// 3. → `NotDetailedChild` when the parent is the process the enclosing schema
///    defines, else `NotDetailedExternal`
pub fn classify(
    hierarchy: &Hierarchy,
    schema: &HierarchyNode,
    individual: &str,
    vocab: &Vocabulary,
) -> Subtype {
    let concept = hierarchy.node(individual);
    let parent = concept.and_then(|c| c.parent.as_deref());
    let Some(parent) = parent.filter(|p| *p != vocab.undefined) else {
        return Subtype::NotDefined;
    };
    let defined = schema.defines.as_deref();

    if let Some(own_schema) = concept.and_then(|c| c.own_schema.as_deref()) {
        let declared_parent = hierarchy.parent_of(own_schema);
        let is_child = declared_parent.is_some_and(|p| p == schema.id || Some(p) == defined);
        return if is_child {
            Subtype::DetailedChild
        } else {
            Subtype::DetailedExternal
        };
    }

    if Some(parent) == defined {
        Subtype::NotDetailedChild
    } else {
        Subtype::NotDetailedExternal
    }
}
