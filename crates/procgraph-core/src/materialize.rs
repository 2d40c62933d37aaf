//! Virtual graph materializer.
//!
//! Every schema graph `N` with at least one classified individual gets a
//! virtual graph `N + suffix` holding exactly:
//!
//! - `V rdf:type vg:Virtual` (marker),
//! - `V vg:hasParentObj N` (back-reference),
//! - one `I vg:processSubtype vg:<Subtype>` per individual.
//!
//! Each virtual graph is dropped and rewritten as a whole on every cycle, and
//! virtual graphs whose schema no longer yields subtypes are dropped too.
//! Running it twice on the same input leaves the store unchanged.

use crate::store::Store;
use crate::subtype::SubtypeMap;
use crate::term::Quad;
use crate::vocab::{Vocabulary, RDF_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub fn virtual_graph_id(schema_graph: &str, vocab: &Vocabulary) -> String {
    format!("{schema_graph}{}", vocab.virtual_suffix)
}

/// Inverse of [`virtual_graph_id`].
pub fn schema_graph_of<'a>(virtual_graph: &'a str, vocab: &Vocabulary) -> Option<&'a str> {
    virtual_graph
        .strip_suffix(vocab.virtual_suffix.as_str())
        .filter(|s| !s.is_empty())
}

/// Graphs currently carrying the virtual marker.
pub fn virtual_graphs(store: &Store, vocab: &Vocabulary) -> BTreeSet<String> {
    store.self_typed_graphs(&vocab.virtual_type)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializeReport {
    pub graphs_written: usize,
    pub quads_written: usize,
    pub quads_removed: usize,
    /// Every graph whose contents changed hands in this cycle; consumer caches
    /// keyed by these ids are stale.
    pub invalidated: BTreeSet<String>,
}

/// Replace the derived-fact graphs in `store` with the ones `subtypes` implies.
pub fn materialize(subtypes: &SubtypeMap, store: &mut Store, vocab: &Vocabulary) -> MaterializeReport {
    let mut report = MaterializeReport::default();
    let wanted: BTreeSet<String> = subtypes
        .keys()
        .map(|schema| virtual_graph_id(schema, vocab))
        .collect();

    for stale in virtual_graphs(store, vocab).difference(&wanted) {
        report.quads_removed += store.remove_graph(stale);
        report.invalidated.insert(stale.clone());
        tracing::debug!(graph = %stale, "removed stale virtual graph");
    }

    for (schema, entries) in subtypes {
        let graph = virtual_graph_id(schema, vocab);
        report.quads_removed += store.remove_graph(&graph);

        let mut quads = Vec::with_capacity(entries.len() + 2);
        quads.push(Quad::from_ids(&graph, RDF_TYPE, &vocab.virtual_type, &graph));
        quads.push(Quad::from_ids(&graph, &vocab.has_parent_predicate, schema, &graph));
        for (individual, subtype) in entries {
            quads.push(Quad::from_ids(
                individual,
                &vocab.subtype_predicate,
                &subtype.iri(vocab),
                &graph,
            ));
        }
        report.quads_written += store.extend(quads);
        report.graphs_written += 1;
        report.invalidated.insert(graph);
    }

    tracing::info!(
        graphs = report.graphs_written,
        written = report.quads_written,
        removed = report.quads_removed,
        "materialized virtual graphs"
    );
    report
}

/// Remove every virtual graph. Used when the hierarchy is invalid, so that no
/// derived fact from an earlier cycle outlives it.
pub fn clear_virtual_graphs(store: &mut Store, vocab: &Vocabulary) -> MaterializeReport {
    let mut report = MaterializeReport::default();
    for graph in virtual_graphs(store, vocab) {
        report.quads_removed += store.remove_graph(&graph);
        report.invalidated.insert(graph);
    }
    if report.quads_removed > 0 {
        tracing::info!(removed = report.quads_removed, "cleared virtual graphs");
    }
    report
}
