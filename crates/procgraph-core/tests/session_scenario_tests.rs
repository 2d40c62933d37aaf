use procgraph_core::vocab::{RDF_TYPE, VG_NS};
use procgraph_core::{Mutation, Quad, Session, Subtype, Vocabulary};

const TREE: &str = "http://example.org/tree";
const G1: &str = "http://example.org/G1";
const G2: &str = "http://example.org/G2";
const P1: &str = "http://example.org/P1";
const P2: &str = "http://example.org/P2";
const I1: &str = "http://example.org/I1";

fn vg(local: &str) -> String {
    format!("{VG_NS}{local}")
}

fn q(s: &str, p: &str, o: &str, g: &str) -> Quad {
    Quad::iri(s, p, o, Some(g))
}

fn diagram(v: &Vocabulary) -> Vec<Quad> {
    vec![
        q(TREE, RDF_TYPE, &vg("ProcessTree"), TREE),
        q(TREE, &v.parent_predicate, &v.root, TREE),
        q(P1, &v.parent_predicate, TREE, TREE),
        q(P2, &v.parent_predicate, TREE, TREE),
        q(G1, RDF_TYPE, &v.schema_type, G1),
        q(G1, &v.parent_predicate, P1, G1),
        q(G1, &v.defines_predicate, P1, G1),
        q(I1, RDF_TYPE, &vg("Process"), G1),
    ]
}

fn session_with(extra: Vec<Quad>) -> Session {
    let mut session = Session::default();
    let mut quads = diagram(&session.config().vocabulary);
    quads.extend(extra);
    session.load(quads);
    session
}

fn parent(of: &str, to: &str) -> Quad {
    q(of, &Vocabulary::default().parent_predicate, to, TREE)
}

#[test]
fn graph_scoped_pattern_yields_exactly_one_binding() {
    let mut session = Session::default();
    session.load([
        Quad::iri("http://x/s1", "http://x/p", "http://x/o", Some("http://x/g")),
        Quad::iri("http://x/s2", "http://x/p", "http://x/o", Some("http://x/h")),
        Quad::iri("http://x/g", &Vocabulary::default().parent_predicate, &Vocabulary::default().root, Some("http://x/g")),
        Quad::iri("http://x/h", &Vocabulary::default().parent_predicate, &Vocabulary::default().root, Some("http://x/h")),
    ]);
    let rows = session.select("SELECT ?s WHERE { GRAPH <http://x/g> { ?s <http://x/p> <http://x/o> . } }");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("s").map(|v| v.value.as_str()), Some("http://x/s1"));
}

#[test]
fn not_detailed_child_then_external_after_reparenting() {
    let mut session = session_with(vec![parent(I1, P1)]);
    assert_eq!(session.subtype_of(G1, I1), Some(Subtype::NotDetailedChild));

    session.apply(Mutation {
        delete: vec![parent(I1, P1)],
        insert: vec![parent(I1, P2)],
    });
    assert_eq!(session.subtype_of(G1, I1), Some(Subtype::NotDetailedExternal));
    assert!(session.ask(&format!(
        "ASK {{ GRAPH <{G1}_virtual> {{ <{I1}> vg:processSubtype vg:NotDetailedExternal }} }}"
    )));
}

#[test]
fn undefined_parent_takes_priority() {
    let v = Vocabulary::default();
    let session = session_with(vec![
        parent(I1, &v.undefined),
        q(I1, &v.own_schema_predicate, G2, TREE),
        q(G2, RDF_TYPE, &v.schema_type, G2),
        q(G2, &v.parent_predicate, P1, G2),
    ]);
    assert_eq!(session.subtype_of(G1, I1), Some(Subtype::NotDefined));
}

#[test]
fn nested_schema_parent_decides_detailed_child_or_external() {
    let v = Vocabulary::default();
    let nested = |schema_parent: &str| {
        vec![
            parent(I1, P1),
            q(I1, &v.own_schema_predicate, G2, TREE),
            q(G2, RDF_TYPE, &v.schema_type, G2),
            q(G2, &v.parent_predicate, schema_parent, G2),
        ]
    };
    let mut session = session_with(nested(P1));
    assert_eq!(session.subtype_of(G1, I1), Some(Subtype::DetailedChild));

    session.apply(Mutation {
        delete: vec![q(G2, &v.parent_predicate, P1, G2)],
        insert: vec![q(G2, &v.parent_predicate, P2, G2)],
    });
    assert_eq!(session.subtype_of(G1, I1), Some(Subtype::DetailedExternal));
}

#[test]
fn recompute_is_idempotent() {
    let mut session = session_with(vec![parent(I1, P1)]);
    let before = session.store().clone();
    let report = session.recompute().clone();
    assert_eq!(session.store(), &before);
    assert_eq!(report.quads_written, report.quads_removed);
}

#[test]
fn ask_flips_when_the_asserting_quad_is_removed() {
    let mut session = session_with(vec![parent(I1, P1)]);
    let query = format!("ASK {{ <{I1}> vg:hasParentObj <{P1}> }}");
    assert!(session.ask(&query));
    session.apply(Mutation::delete([parent(I1, P1)]));
    assert!(!session.ask(&query));
}

#[test]
fn orphan_graph_is_reported_by_name() {
    let session = session_with(vec![q("http://x/s", "http://x/p", "http://x/o", "http://example.org/orphan")]);
    let invalid = session.hierarchy().expect_err("invalid hierarchy");
    assert_eq!(invalid.errors.len(), 1);
    assert_eq!(invalid.errors[0].graph, "http://example.org/orphan");
}
