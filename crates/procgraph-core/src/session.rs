//! Session: the one owner of the store and everything derived from it.
//!
//! Write-owners:
//! - the store changes through [`Session::load`], [`Session::apply`] and
//!   [`Session::clear`] only, and each of them finishes with
//!   [`Session::recompute`] before returning,
//! - the hierarchy, subtype map and virtual graphs are written by
//!   `recompute` alone,
//! - the per-graph quad cache is filled lazily by readers and dropped for
//!   every graph a mutation or a materialization touched.
//!
//! Queries therefore never observe stale derived facts.

use crate::config::SessionConfig;
use crate::engine::{EngineRequest, QueryEngine};
use crate::error::{Error, Result};
use crate::eval::{self, Binding};
use crate::hierarchy::{build_hierarchy, Hierarchy, InvalidHierarchy};
use crate::materialize::{clear_virtual_graphs, materialize, MaterializeReport};
use crate::prefix::PrefixMap;
use crate::query::{is_hidden_variable, parse_query, ParsedQuery};
use crate::store::{Mutation, MutationSummary, Store};
use crate::subtype::{compute_subtypes, Subtype, SubtypeMap};
use crate::term::{Quad, Term};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

// ============================================================================
// Result rows
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResolvedValue {
    pub term: Term,
    /// IRI string or literal lexical form.
    pub value: String,
    /// Prefix-shortened IRI, when a namespace matches.
    pub label: Option<String>,
}

impl ResolvedValue {
    fn resolve(term: Term, prefixes: &PrefixMap) -> Self {
        let label = term.as_iri().and_then(|iri| prefixes.shorten(iri));
        Self {
            value: term.value().to_string(),
            term,
            label,
        }
    }

    /// Label if present, else the raw value.
    pub fn display(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.value)
    }
}

/// One projected SELECT row. Unbound projected variables are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResultRow {
    pub values: BTreeMap<String, ResolvedValue>,
}

impl ResultRow {
    pub fn get(&self, variable: &str) -> Option<&ResolvedValue> {
        self.values.get(variable)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerSource {
    Engine(String),
    Local,
}

/// An answer plus the path that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answered<T> {
    pub value: T,
    pub source: AnswerSource,
    /// Why the engine was bypassed, when it was.
    pub fallback_reason: Option<String>,
}

// ============================================================================
// Session
// ============================================================================

pub struct Session {
    store: Store,
    prefixes: PrefixMap,
    config: SessionConfig,
    hierarchy: std::result::Result<Hierarchy, InvalidHierarchy>,
    subtypes: SubtypeMap,
    last_report: MaterializeReport,
    cache: Mutex<BTreeMap<Option<String>, Arc<[Quad]>>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let mut session = Self {
            store: Store::new(),
            prefixes: config.prefixes.clone(),
            hierarchy: Ok(Hierarchy {
                nodes: BTreeMap::new(),
                roots: Vec::new(),
                detached: Vec::new(),
                root_id: config.vocabulary.root.clone(),
            }),
            config,
            subtypes: SubtypeMap::new(),
            last_report: MaterializeReport::default(),
            cache: Mutex::new(BTreeMap::new()),
        };
        session.recompute();
        session
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn prefixes(&self) -> &PrefixMap {
        &self.prefixes
    }

    /// Add prefixes (e.g. those declared by loaded Turtle files).
    pub fn add_prefixes(&mut self, prefixes: &PrefixMap) {
        self.prefixes.merge(prefixes);
    }

    /// Insert a finished batch of parsed quads, then recompute.
    pub fn load(&mut self, quads: impl IntoIterator<Item = Quad>) -> MutationSummary {
        self.apply(Mutation::insert(quads))
    }

    /// Apply a mutation as one unit (deletes, then inserts), then recompute.
    pub fn apply(&mut self, mutation: Mutation) -> MutationSummary {
        let touched: BTreeSet<Option<String>> = mutation
            .insert
            .iter()
            .chain(mutation.delete.iter())
            .map(Quad::graph_id)
            .collect();
        let summary = self.store.apply(mutation);
        tracing::debug!(
            inserted = summary.inserted,
            deleted = summary.deleted,
            "applied mutation"
        );
        self.invalidate(touched);
        self.recompute();
        summary
    }

    /// Drop every quad, authored and derived.
    pub fn clear(&mut self) {
        self.store.clear();
        self.cache.lock().clear();
        self.recompute();
    }

    /// Hierarchy → subtypes → virtual graphs. On an invalid hierarchy every
    /// virtual graph is removed and the subtype map is emptied.
    pub fn recompute(&mut self) -> &MaterializeReport {
        let vocab = &self.config.vocabulary;
        let report = match build_hierarchy(&self.store, vocab) {
            Ok(hierarchy) => {
                let subtypes = compute_subtypes(&hierarchy, vocab);
                let report = materialize(&subtypes, &mut self.store, vocab);
                self.subtypes = subtypes;
                self.hierarchy = Ok(hierarchy);
                report
            }
            Err(invalid) => {
                for error in &invalid.errors {
                    tracing::warn!(graph = %error.graph, message = %error.message, "hierarchy error");
                }
                self.subtypes.clear();
                self.hierarchy = Err(invalid);
                clear_virtual_graphs(&mut self.store, vocab)
            }
        };
        self.invalidate(report.invalidated.iter().cloned().map(Some));
        self.last_report = report;
        &self.last_report
    }

    /// Report of the most recent materialization.
    pub fn last_report(&self) -> &MaterializeReport {
        &self.last_report
    }

    pub fn hierarchy(&self) -> std::result::Result<&Hierarchy, &InvalidHierarchy> {
        self.hierarchy.as_ref()
    }

    /// The hierarchy, or its validation errors as an [`Error`].
    pub fn valid_hierarchy(&self) -> Result<&Hierarchy> {
        self.hierarchy
            .as_ref()
            .map_err(|invalid| Error::Hierarchy(invalid.clone()))
    }

    pub fn subtypes(&self) -> &SubtypeMap {
        &self.subtypes
    }

    pub fn subtype_of(&self, schema_graph: &str, individual: &str) -> Option<Subtype> {
        self.subtypes.get(schema_graph)?.get(individual).copied()
    }

    /// Quads of one graph (`None` = default graph), cached until a mutation or
    /// a materialization touches that graph.
    pub fn graph_quads(&self, graph: Option<&str>) -> Arc<[Quad]> {
        let key = graph.map(str::to_string);
        let mut cache = self.cache.lock();
        if let Some(hit) = cache.get(&key) {
            return Arc::clone(hit);
        }
        let quads: Arc<[Quad]> = self.store.quads_in_graph(graph).cloned().collect();
        cache.insert(key, Arc::clone(&quads));
        quads
    }

    fn invalidate(&self, graphs: impl IntoIterator<Item = Option<String>>) {
        let mut cache = self.cache.lock();
        for graph in graphs {
            cache.remove(&graph);
        }
    }

    // ------------------------------------------------------------------------
    // Local queries
    // ------------------------------------------------------------------------

    /// Answer a SELECT with the local evaluator. Malformed queries (and ASK
    /// text) yield no rows.
    pub fn select(&self, query: &str) -> Vec<ResultRow> {
        match parse_query(query, &self.prefixes) {
            Some(parsed) if !parsed.is_ask() => {
                let bindings = eval::evaluate(&parsed.patterns, &self.store);
                project(Some(&parsed), bindings, &self.prefixes)
            }
            Some(_) => {
                tracing::warn!("ASK query passed to select; no rows");
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    /// Answer an ASK with the local evaluator. Malformed queries are `false`.
    pub fn ask(&self, query: &str) -> bool {
        parse_query(query, &self.prefixes).is_some_and(|q| eval::ask(&q.patterns, &self.store))
    }

    // ------------------------------------------------------------------------
    // Engine-first queries
    // ------------------------------------------------------------------------

    fn request<'a>(&'a self, query: &'a str) -> EngineRequest<'a> {
        EngineRequest {
            query,
            store: &self.store,
            prefixes: &self.prefixes,
        }
    }

    /// Try `engine` first; on error answer locally (unless fallback is
    /// disabled, in which case the engine error is returned).
    pub async fn select_with(
        &self,
        engine: &dyn QueryEngine,
        query: &str,
    ) -> Result<Answered<Vec<ResultRow>>> {
        match engine.select(self.request(query)).await {
            Ok(bindings) => {
                let parsed = parse_query(query, &self.prefixes);
                Ok(Answered {
                    value: project(parsed.as_ref(), bindings, &self.prefixes),
                    source: AnswerSource::Engine(engine.name().to_string()),
                    fallback_reason: None,
                })
            }
            Err(source) if self.config.fallback_on_engine_error => {
                tracing::warn!(engine = engine.name(), error = %source, "engine failed; answering locally");
                Ok(Answered {
                    value: self.select(query),
                    source: AnswerSource::Local,
                    fallback_reason: Some(source.to_string()),
                })
            }
            Err(source) => Err(Error::Engine {
                engine: engine.name().to_string(),
                source,
            }),
        }
    }

    pub async fn ask_with(&self, engine: &dyn QueryEngine, query: &str) -> Result<Answered<bool>> {
        match engine.ask(self.request(query)).await {
            Ok(value) => Ok(Answered {
                value,
                source: AnswerSource::Engine(engine.name().to_string()),
                fallback_reason: None,
            }),
            Err(source) if self.config.fallback_on_engine_error => {
                tracing::warn!(engine = engine.name(), error = %source, "engine failed; answering locally");
                Ok(Answered {
                    value: self.ask(query),
                    source: AnswerSource::Local,
                    fallback_reason: Some(source.to_string()),
                })
            }
            Err(source) => Err(Error::Engine {
                engine: engine.name().to_string(),
                source,
            }),
        }
    }
}

/// Project bindings onto the query's variables, then apply DISTINCT and LIMIT.
/// Without a parsed query every visible variable is kept.
fn project(query: Option<&ParsedQuery>, bindings: Vec<Binding>, prefixes: &PrefixMap) -> Vec<ResultRow> {
    let prefixes = query.map_or(prefixes, |q| &q.prefixes);
    let variables = query.map(ParsedQuery::projection);
    let mut rows: Vec<ResultRow> = bindings
        .into_iter()
        .map(|binding| ResultRow {
            values: binding
                .into_iter()
                .filter(|(name, _)| match &variables {
                    Some(vars) => vars.iter().any(|v| v == name),
                    None => !is_hidden_variable(name),
                })
                .map(|(name, term)| (name, ResolvedValue::resolve(term, prefixes)))
                .collect(),
        })
        .collect();

    if query.is_some_and(ParsedQuery::is_distinct) {
        let mut seen = BTreeSet::new();
        rows.retain(|row| seen.insert(row.clone()));
    }
    if let Some(limit) = query.and_then(|q| q.limit) {
        rows.truncate(limit);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{LocalEngine, UnavailableEngine};
    use crate::vocab::{RDF_TYPE, VG_NS};

    const TREE: &str = "http://x/tree";
    const G1: &str = "http://x/G1";

    fn vg(local: &str) -> String {
        format!("{VG_NS}{local}")
    }

    fn diagram(session: &Session, i1_parent: &str) -> Vec<Quad> {
        let v = &session.config().vocabulary;
        let q = |s: &str, p: &str, o: &str, g: &str| Quad::iri(s, p, o, Some(g));
        vec![
            q(TREE, RDF_TYPE, &vg("ProcessTree"), TREE),
            q(TREE, &v.parent_predicate, &v.root, TREE),
            q("http://x/P1", &v.parent_predicate, TREE, TREE),
            q("http://x/P2", &v.parent_predicate, TREE, TREE),
            q("http://x/I1", &v.parent_predicate, i1_parent, TREE),
            q(G1, RDF_TYPE, &v.schema_type, G1),
            q(G1, &v.parent_predicate, "http://x/P1", G1),
            q(G1, &v.defines_predicate, "http://x/P1", G1),
            q("http://x/I1", RDF_TYPE, &vg("Process"), G1),
        ]
    }

    fn session() -> Session {
        let mut session = Session::default();
        let quads = diagram(&session, "http://x/P1");
        session.load(quads);
        session
    }

    #[test]
    fn load_materializes_queryable_subtypes() {
        let session = session();
        assert_eq!(
            session.subtype_of(G1, "http://x/I1"),
            Some(Subtype::NotDetailedChild)
        );
        let rows = session.select(
            "SELECT ?i ?t WHERE { GRAPH <http://x/G1_virtual> { ?i vg:processSubtype ?t } }",
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("t").map(ResolvedValue::display), Some("vg:NotDetailedChild"));
        assert_eq!(rows[0].get("i").map(|r| r.value.as_str()), Some("http://x/I1"));
    }

    #[test]
    fn reparenting_flips_the_subtype_before_the_next_query() {
        let mut session = session();
        let v = session.config().vocabulary.clone();
        session.apply(Mutation {
            delete: vec![Quad::iri("http://x/I1", &v.parent_predicate, "http://x/P1", Some(TREE))],
            insert: vec![Quad::iri("http://x/I1", &v.parent_predicate, "http://x/P2", Some(TREE))],
        });
        assert!(session.ask("ASK { GRAPH ?g { <http://x/I1> vg:processSubtype vg:NotDetailedExternal } }"));
        assert!(!session.ask("ASK { ?i vg:processSubtype vg:NotDetailedChild }"));
    }

    #[test]
    fn invalid_hierarchy_clears_derived_facts() {
        let mut session = session();
        assert_eq!(session.last_report().graphs_written, 1);
        session.load([Quad::iri("http://x/s", "http://x/p", "http://x/o", Some("http://x/orphan"))]);
        let invalid = session.hierarchy().expect_err("orphan graph");
        assert_eq!(invalid.errors[0].graph, "http://x/orphan");
        assert!(matches!(session.valid_hierarchy(), Err(Error::Hierarchy(_))));
        assert!(session.subtypes().is_empty());
        assert!(!session.ask("ASK { ?i vg:processSubtype ?t }"));
    }

    #[test]
    fn graph_cache_is_dropped_when_the_graph_changes() {
        let mut session = session();
        let before = session.graph_quads(Some(G1));
        assert!(Arc::ptr_eq(&before, &session.graph_quads(Some(G1))));
        session.load([Quad::with_literal(G1, crate::vocab::RDFS_LABEL, "Diagram", Some(G1))]);
        let after = session.graph_quads(Some(G1));
        assert_eq!(after.len(), before.len() + 1);

        let virtual_before = session.graph_quads(Some("http://x/G1_virtual"));
        let v = session.config().vocabulary.clone();
        session.load([Quad::iri("http://x/I2", &v.individual_predicates[0], "http://x/I1", Some(G1))]);
        let virtual_after = session.graph_quads(Some("http://x/G1_virtual"));
        assert_eq!(virtual_after.len(), virtual_before.len() + 1);
    }

    #[test]
    fn distinct_and_limit_shape_rows() {
        let session = session();
        let all = session.select("SELECT ?g WHERE { GRAPH ?g { ?s ?p ?o } }");
        assert!(all.len() > 3);
        let distinct = session.select("SELECT DISTINCT ?g WHERE { GRAPH ?g { ?s ?p ?o } }");
        assert_eq!(distinct.len(), 3);
        let limited = session.select("SELECT DISTINCT ?g WHERE { GRAPH ?g { ?s ?p ?o } } LIMIT 2");
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn malformed_queries_degrade_quietly() {
        let session = session();
        assert!(session.select("SELECT ?s").is_empty());
        assert!(!session.ask("nonsense"));
        assert!(!session.ask("ASK { }"));
    }

    #[test]
    fn decimals_and_dotted_local_names_match_stored_terms() {
        let mut session = Session::default();
        let weight = Term::typed_literal("1.5", crate::vocab::XSD_DECIMAL);
        session.load([
            Quad::new(Term::iri("http://x/loaf"), Term::iri("http://x/weight"), weight, None)
                .expect("quad"),
            Quad::iri("http://x/loaf", "http://x/tag", &vg("v1.2"), None),
        ]);
        assert!(session.ask("ASK { ?s <http://x/weight> 1.5 }"));
        assert!(!session.ask("ASK { ?s <http://x/weight> 1 }"));
        assert!(session.ask("ASK { ?s <http://x/tag> vg:v1.2 . ?s <http://x/weight> 1.5 . }"));
    }

    #[tokio::test]
    async fn engine_failure_falls_back_to_local() {
        let session = session();
        let query = "ASK { <http://x/I1> a vg:Process }";
        let answered = session
            .ask_with(&UnavailableEngine::new("offline"), query)
            .await
            .expect("fallback");
        assert!(answered.value);
        assert_eq!(answered.source, AnswerSource::Local);
        assert!(answered.fallback_reason.is_some_and(|r| r.contains("offline")));

        let answered = session.ask_with(&LocalEngine, query).await.expect("engine");
        assert_eq!(answered.source, AnswerSource::Engine("local".into()));
    }

    #[tokio::test]
    async fn engine_failure_surfaces_when_fallback_is_disabled() {
        let config = SessionConfig {
            fallback_on_engine_error: false,
            ..SessionConfig::default()
        };
        let session = Session::new(config);
        let err = session
            .select_with(&UnavailableEngine::new("offline"), "SELECT ?s WHERE { ?s ?p ?o }")
            .await
            .expect_err("no fallback");
        assert!(matches!(err, Error::Engine { .. }));
    }

    #[tokio::test]
    async fn engine_rows_are_projected_like_local_ones() {
        let session = session();
        let query = "SELECT ?t WHERE { ?i vg:processSubtype ?t }";
        let engine = session.select_with(&LocalEngine, query).await.expect("rows");
        assert_eq!(engine.value, session.select(query));
        assert_eq!(engine.value[0].values.len(), 1);
    }
}
