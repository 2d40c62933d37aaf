use procgraph_core::eval::{ask, evaluate};
use procgraph_core::pattern::TriplePattern;
use procgraph_core::{Quad, Store, Term};
use proptest::prelude::*;
use std::collections::BTreeSet;

const NODES: usize = 5;
const PREDICATES: usize = 2;

fn node(i: usize) -> String {
    format!("http://x/n{i}")
}

fn predicate(i: usize) -> String {
    format!("http://x/p{i}")
}

fn store_strategy() -> impl Strategy<Value = Vec<(usize, usize, usize, Option<usize>)>> {
    prop::collection::vec(
        (0..NODES, 0..PREDICATES, 0..NODES, prop::option::of(0usize..2)),
        0..=20,
    )
}

fn build(raw: &[(usize, usize, usize, Option<usize>)]) -> Store {
    raw.iter()
        .map(|&(s, p, o, g)| {
            let graph = g.map(|g| format!("http://x/g{g}"));
            Quad::iri(&node(s), &predicate(p), &node(o), graph.as_deref())
        })
        .collect()
}

fn has_triple(store: &Store, s: &Term, p: &str, o: &Term) -> bool {
    store
        .iter()
        .any(|q| q.subject() == s && q.predicate_iri() == p && q.object() == o)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn shared_variable_joins_are_sound_and_complete(
        raw in store_strategy(),
        first in 0..PREDICATES,
        second in 0..PREDICATES,
    ) {
        let store = build(&raw);
        let (p1, p2) = (predicate(first), predicate(second));
        let patterns = vec![
            TriplePattern::new(Term::var("x"), Term::iri(&p1), Term::var("y")),
            TriplePattern::new(Term::var("y"), Term::iri(&p2), Term::var("z")),
        ];
        let rows = evaluate(&patterns, &store);

        for row in &rows {
            prop_assert!(has_triple(&store, &row["x"], &p1, &row["y"]));
            prop_assert!(has_triple(&store, &row["y"], &p2, &row["z"]));
        }

        let mut expected = BTreeSet::new();
        for a in store.iter().filter(|q| q.predicate_iri() == p1) {
            for b in store.iter().filter(|q| q.predicate_iri() == p2) {
                if a.object() == b.subject() {
                    expected.insert((a.subject().clone(), a.object().clone(), b.object().clone()));
                }
            }
        }
        let actual: BTreeSet<_> = rows
            .iter()
            .map(|r| (r["x"].clone(), r["y"].clone(), r["z"].clone()))
            .collect();
        prop_assert_eq!(actual.len(), rows.len());
        prop_assert_eq!(actual, expected);

        prop_assert_eq!(ask(&patterns, &store), !rows.is_empty());
    }

    #[test]
    fn removing_the_only_witness_flips_ask(raw in store_strategy(), pick in any::<prop::sample::Index>()) {
        prop_assume!(!raw.is_empty());
        let mut store = build(&raw);
        let witness = store.iter().nth(pick.index(store.len())).cloned().expect("non-empty store");
        let pattern = TriplePattern::new(
            witness.subject().clone(),
            witness.predicate().clone(),
            witness.object().clone(),
        );
        let pattern = match witness.graph() {
            Some(g) => pattern.in_graph(g.clone()),
            None => pattern,
        };
        prop_assert!(ask(&[pattern.clone()], &store));
        store.remove(&witness);
        let still_scoped_match = witness.graph().is_none()
            && store.iter().any(|q| q.subject() == witness.subject()
                && q.predicate() == witness.predicate()
                && q.object() == witness.object());
        prop_assert_eq!(ask(&[pattern], &store), still_scoped_match);
    }
}
