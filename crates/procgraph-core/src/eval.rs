//! Join and ASK evaluation over a [`Store`].
//!
//! Evaluation is a nested-loop join in textual pattern order:
//! `|patterns| × |bindings| × |quads|`. Stores are small (one diagram
//! session), so there is no index.

use crate::pattern::{GraphScope, TriplePattern};
use crate::store::Store;
use crate::term::{Quad, Term};
use std::collections::{BTreeMap, HashSet};

/// Variable name → value. A variable, once bound, never changes within a binding.
pub type Binding = BTreeMap<String, Term>;

/// Evaluate a conjunction of patterns. Starts from one empty binding, so zero
/// patterns yield exactly one (empty) binding.
pub fn evaluate(patterns: &[TriplePattern], store: &Store) -> Vec<Binding> {
    let mut bindings: Vec<Binding> = vec![Binding::new()];
    for pattern in patterns {
        let mut next = Vec::new();
        let mut seen: HashSet<Binding> = HashSet::new();
        for binding in &bindings {
            for quad in store.iter() {
                if let Some(extended) = match_quad(pattern, quad, binding) {
                    if seen.insert(extended.clone()) {
                        next.push(extended);
                    }
                }
            }
        }
        bindings = next;
        if bindings.is_empty() {
            break;
        }
    }
    bindings
}

/// `true` iff at least one binding satisfies every pattern. Zero patterns is
/// always `false`. Stops at the first complete match.
pub fn ask(patterns: &[TriplePattern], store: &Store) -> bool {
    if patterns.is_empty() {
        return false;
    }
    first_match(patterns, store, &Binding::new())
}

fn first_match(patterns: &[TriplePattern], store: &Store, binding: &Binding) -> bool {
    let Some((pattern, rest)) = patterns.split_first() else {
        return true;
    };
    store
        .iter()
        .filter_map(|quad| match_quad(pattern, quad, binding))
        .any(|extended| first_match(rest, store, &extended))
}

/// Match one quad against a pattern under `binding`; on success returns the
/// binding extended with the variables this pattern newly binds.
pub fn match_quad(pattern: &TriplePattern, quad: &Quad, binding: &Binding) -> Option<Binding> {
    let mut out = binding.clone();
    if !unify(&pattern.subject, quad.subject(), &mut out)
        || !unify(&pattern.predicate, quad.predicate(), &mut out)
        || !unify(&pattern.object, quad.object(), &mut out)
    {
        return None;
    }
    match &pattern.graph {
        GraphScope::Unscoped => {}
        GraphScope::Named(scope) => {
            // Scoped patterns never match the default graph.
            let graph = quad.graph()?;
            if !unify(scope, graph, &mut out) {
                return None;
            }
        }
    }
    Some(out)
}

fn unify(pattern: &Term, value: &Term, binding: &mut Binding) -> bool {
    match pattern {
        Term::Variable(name) => match binding.get(name) {
            Some(bound) => bound == value,
            None => {
                binding.insert(name.clone(), value.clone());
                true
            }
        },
        bound => bound == value,
    }
}
