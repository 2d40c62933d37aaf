//! In-memory quad store.
//!
//! A set of quads deduplicated on exact 4-tuple equality. Iteration order is
//! the `Ord` of [`Quad`], so every scan (and everything derived from one) is
//! deterministic.

use crate::term::Quad;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Store {
    quads: BTreeSet<Quad>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the quad was not already present.
    pub fn insert(&mut self, quad: Quad) -> bool {
        self.quads.insert(quad)
    }

    pub fn remove(&mut self, quad: &Quad) -> bool {
        self.quads.remove(quad)
    }

    pub fn contains(&self, quad: &Quad) -> bool {
        self.quads.contains(quad)
    }

    pub fn extend<I: IntoIterator<Item = Quad>>(&mut self, quads: I) -> usize {
        quads.into_iter().filter(|q| self.quads.insert(q.clone())).count()
    }

    pub fn len(&self) -> usize {
        self.quads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Quad> {
        self.quads.iter()
    }

    pub fn clear(&mut self) {
        self.quads.clear();
    }

    /// Distinct named-graph identifiers, in order.
    pub fn graphs(&self) -> BTreeSet<String> {
        self.quads.iter().filter_map(Quad::graph_id).collect()
    }

    /// Quads whose graph component is `graph` (`None` = default graph).
    pub fn quads_in_graph<'a>(&'a self, graph: Option<&'a str>) -> impl Iterator<Item = &'a Quad> + 'a {
        self.quads
            .iter()
            .filter(move |q| q.graph_id().as_deref() == graph)
    }

    /// Remove every quad in the named graph; returns how many were removed.
    pub fn remove_graph(&mut self, graph: &str) -> usize {
        let before = self.quads.len();
        self.quads.retain(|q| q.graph_id().as_deref() != Some(graph));
        before - self.quads.len()
    }

    /// Named graphs that declare themselves `G rdf:type ty` inside `G`.
    pub fn self_typed_graphs(&self, ty: &str) -> BTreeSet<String> {
        self.quads
            .iter()
            .filter(|q| {
                q.predicate_iri() == crate::vocab::RDF_TYPE
                    && q.object().as_iri() == Some(ty)
                    && q.graph().is_some_and(|g| g == q.subject())
            })
            .filter_map(Quad::graph_id)
            .collect()
    }

    /// Apply a mutation: deletes first, then inserts.
    ///
    /// Quads are typed at construction, so there is nothing left that can fail
    /// half way through.
    pub fn apply(&mut self, mutation: Mutation) -> MutationSummary {
        let deleted = mutation
            .delete
            .iter()
            .filter(|q| self.quads.remove(*q))
            .count();
        let inserted = self.extend(mutation.insert);
        MutationSummary { inserted, deleted }
    }
}

impl FromIterator<Quad> for Store {
    fn from_iter<I: IntoIterator<Item = Quad>>(iter: I) -> Self {
        Self {
            quads: iter.into_iter().collect(),
        }
    }
}

/// A batch of quad edits applied as one unit.
#[derive(Debug, Clone, Default)]
pub struct Mutation {
    pub insert: Vec<Quad>,
    pub delete: Vec<Quad>,
}

impl Mutation {
    pub fn insert(quads: impl IntoIterator<Item = Quad>) -> Self {
        Self {
            insert: quads.into_iter().collect(),
            delete: Vec::new(),
        }
    }

    pub fn delete(quads: impl IntoIterator<Item = Quad>) -> Self {
        Self {
            insert: Vec::new(),
            delete: quads.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.insert.is_empty() && self.delete.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationSummary {
    pub inserted: usize,
    pub deleted: usize,
}
