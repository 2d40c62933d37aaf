//! Hierarchy builder: one tree across every named graph and every subject
//! that carries the parent-reference predicate.
//!
//! The hierarchy is rebuilt from a full store scan whenever source data
//! changes; it is never patched in place. Virtual graphs (derived facts) are
//! invisible to the scan.
//!
//! ## Pipeline
//!
//! 1. collect named-graph identifiers,
//! 2. accumulate per-subject metadata (types, label, parent, `defines`,
//!    own schema) from every graph,
//! 3. merge into [`HierarchyNode`]s, flagging graph-typed ones,
//! 4. validate (missing parents, parent cycles); any error rejects the whole
//!    hierarchy,
//! 5. link roots and children, synthesizing placeholders for unknown parents,
//! 6. compute each node's contained individuals.

use crate::store::Store;
use crate::term::Quad;
use crate::vocab::{Vocabulary, RDF_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub id: String,
    pub label: Option<String>,
    /// Primary type: the first graph-like type if any, else the first type.
    pub declared_type: Option<String>,
    pub types: BTreeSet<String>,
    /// `None` only for root-level nodes and placeholders.
    pub parent: Option<String>,
    pub children: Vec<String>,
    /// Individuals contained in this node (sorted).
    pub individuals: Vec<String>,
    pub is_graph: bool,
    /// Synthesized for a parent that is referenced but never described.
    pub placeholder: bool,
    /// Process this node (a schema graph) defines.
    pub defines: Option<String>,
    /// This concept's own nested schema.
    pub own_schema: Option<String>,
}

impl HierarchyNode {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            label: None,
            declared_type: None,
            types: BTreeSet::new(),
            parent: None,
            children: Vec::new(),
            individuals: Vec::new(),
            is_graph: false,
            placeholder: false,
            defines: None,
            own_schema: None,
        }
    }

    fn placeholder(id: &str) -> Self {
        let mut node = Self::new(id);
        node.label = Some(local_name(id).to_string());
        node.placeholder = true;
        node
    }

    pub fn has_type(&self, ty: &str) -> bool {
        self.types.contains(ty)
    }

    /// Label if present, else the local name of the id.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or_else(|| local_name(&self.id))
    }
}

fn local_name(iri: &str) -> &str {
    iri.rsplit(['#', '/']).find(|s| !s.is_empty()).unwrap_or(iri)
}

/// A validated tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hierarchy {
    pub nodes: BTreeMap<String, HierarchyNode>,
    /// Nodes whose parent is the designated root, in id order.
    pub roots: Vec<String>,
    /// Reachable only from here: placeholders and parentless excluded nodes.
    pub detached: Vec<String>,
    pub root_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub graph: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.graph, self.message)
    }
}

/// The hierarchy failed validation; nothing downstream may run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid hierarchy ({} error(s))", .errors.len())]
pub struct InvalidHierarchy {
    pub errors: Vec<ValidationError>,
}

#[derive(Debug, Default)]
struct SubjectMeta {
    types: BTreeSet<String>,
    label: Option<String>,
    parents: BTreeSet<String>,
    defines: Option<String>,
    own_schema: Option<String>,
}

/// Build and validate the hierarchy from a full store scan.
pub fn build_hierarchy(store: &Store, vocab: &Vocabulary) -> Result<Hierarchy, InvalidHierarchy> {
    let derived = store.self_typed_graphs(&vocab.virtual_type);
    let authored = |q: &&Quad| q.graph_id().map_or(true, |g| !derived.contains(&g));

    // Step 1
    let named_graphs: BTreeSet<String> = store
        .graphs()
        .into_iter()
        .filter(|g| !derived.contains(g))
        .collect();

    // Step 2
    let mut meta: BTreeMap<String, SubjectMeta> = BTreeMap::new();
    for quad in store.iter().filter(authored) {
        let Some(subject) = quad.subject().node_id() else {
            continue;
        };
        let predicate = quad.predicate_iri();
        let object = quad.object();
        if predicate == RDF_TYPE {
            if let Some(ty) = object.as_iri() {
                meta.entry(subject).or_default().types.insert(ty.to_string());
            }
        } else if predicate == vocab.label_predicate {
            if let Some(lit) = object.as_literal() {
                let entry = meta.entry(subject).or_default();
                if entry.label.is_none() {
                    entry.label = Some(lit.value.clone());
                }
            }
        } else if predicate == vocab.parent_predicate {
            if let Some(parent) = object.node_id() {
                meta.entry(subject).or_default().parents.insert(parent);
            }
        } else if predicate == vocab.defines_predicate {
            if let Some(process) = object.node_id() {
                meta.entry(subject).or_default().defines.get_or_insert(process);
            }
        } else if predicate == vocab.own_schema_predicate {
            if let Some(schema) = object.node_id() {
                meta.entry(subject).or_default().own_schema.get_or_insert(schema);
            }
        }
    }

    // Step 3
    let mut nodes: BTreeMap<String, HierarchyNode> = BTreeMap::new();
    let empty = SubjectMeta::default();
    let candidates: BTreeSet<&String> = named_graphs
        .iter()
        .chain(meta.iter().filter_map(|(id, m)| {
            (!m.parents.is_empty() || m.types.iter().any(|t| vocab.is_graph_type(t))).then_some(id)
        }))
        .collect();
    for id in candidates {
        let m = meta.get(id).unwrap_or(&empty);
        let mut node = HierarchyNode::new(id);
        node.types = m.types.clone();
        node.label = m.label.clone();
        node.declared_type = m
            .types
            .iter()
            .find(|t| vocab.is_graph_type(t))
            .or_else(|| m.types.iter().next())
            .cloned();
        node.parent = m.parents.iter().next().cloned();
        if m.parents.len() > 1 {
            tracing::warn!(
                node = %id,
                parents = ?m.parents,
                "multiple parent references; using the first"
            );
        }
        node.defines = m.defines.clone();
        node.own_schema = m.own_schema.clone();
        node.is_graph = named_graphs.contains(id) || m.types.iter().any(|t| vocab.is_graph_type(t));
        nodes.insert(id.clone(), node);
    }

    // Step 4
    let errors = validate(&nodes, vocab);
    if !errors.is_empty() {
        tracing::warn!(errors = errors.len(), "hierarchy validation failed");
        return Err(InvalidHierarchy { errors });
    }

    // Step 5
    let mut roots = Vec::new();
    let mut detached = Vec::new();
    let mut links: Vec<(String, String)> = Vec::new();
    for node in nodes.values() {
        match &node.parent {
            Some(parent) if *parent == vocab.root => roots.push(node.id.clone()),
            Some(parent) => links.push((parent.clone(), node.id.clone())),
            None if node.id == vocab.root => {}
            None => detached.push(node.id.clone()),
        }
    }
    for (parent, child) in links {
        let entry = nodes.entry(parent.clone()).or_insert_with(|| {
            tracing::debug!(node = %parent, "synthesizing placeholder for unknown parent");
            detached.push(parent.clone());
            HierarchyNode::placeholder(&parent)
        });
        entry.children.push(child);
    }
    detached.sort();

    // Step 6
    let individuals = contained_individuals(store.iter().filter(authored), &nodes, vocab);
    for (id, set) in individuals {
        if let Some(node) = nodes.get_mut(&id) {
            node.individuals = set.into_iter().collect();
        }
    }

    tracing::debug!(nodes = nodes.len(), roots = roots.len(), "hierarchy built");
    Ok(Hierarchy {
        nodes,
        roots,
        detached,
        root_id: vocab.root.clone(),
    })
}

fn validate(nodes: &BTreeMap<String, HierarchyNode>, vocab: &Vocabulary) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for node in nodes.values() {
        if node.is_graph
            && node.parent.is_none()
            && node.id != vocab.root
            && !node.has_type(&vocab.excluded_type)
        {
            errors.push(ValidationError {
                graph: node.id.clone(),
                message: format!(
                    "graph has no parent reference (<{}>)",
                    vocab.parent_predicate
                ),
            });
        }
    }

    // A parent chain that comes back on itself; reported once per cycle.
    let mut reported: BTreeSet<String> = BTreeSet::new();
    for start in nodes.keys() {
        let mut path: Vec<&str> = Vec::new();
        let mut current = Some(start.as_str());
        while let Some(id) = current {
            if let Some(pos) = path.iter().position(|p| *p == id) {
                let cycle = &path[pos..];
                let first = cycle.iter().min().copied().unwrap_or(id);
                if reported.insert(first.to_string()) {
                    errors.push(ValidationError {
                        graph: first.to_string(),
                        message: format!("parent chain forms a cycle: {}", cycle.join(" -> ")),
                    });
                }
                break;
            }
            path.push(id);
            current = nodes.get(id).and_then(|n| n.parent.as_deref());
        }
    }
    errors
}

/// Individuals per node: subjects of `isSubprocessOf node` anywhere, plus,
/// inside the node's own graph, subjects of individual predicates and
/// subjects typed with an individual type.
fn contained_individuals<'a>(
    quads: impl Iterator<Item = &'a Quad>,
    nodes: &BTreeMap<String, HierarchyNode>,
    vocab: &Vocabulary,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut out: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for quad in quads {
        let Some(subject) = quad.subject().node_id() else {
            continue;
        };
        let predicate = quad.predicate_iri();

        if predicate == vocab.subprocess_predicate {
            if let Some(target) = quad.object().node_id() {
                if nodes.contains_key(&target) && target != subject {
                    out.entry(target).or_default().insert(subject.clone());
                }
            }
        }

        let Some(graph) = quad.graph_id() else {
            continue;
        };
        if graph == subject || !nodes.contains_key(&graph) {
            continue;
        }
        if vocab.is_individual_predicate(predicate) || is_individual_type(quad, vocab) {
            out.entry(graph).or_default().insert(subject);
        }
    }
    out
}

fn is_individual_type(quad: &Quad, vocab: &Vocabulary) -> bool {
    quad.predicate_iri() == RDF_TYPE
        && quad
            .object()
            .as_iri()
            .is_some_and(|ty| vocab.is_individual_type(ty))
}

impl Hierarchy {
    pub fn node(&self, id: &str) -> Option<&HierarchyNode> {
        self.nodes.get(id)
    }

    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).and_then(|n| n.parent.as_deref())
    }

    /// Graph-typed nodes carrying `ty`.
    pub fn graphs_of_type<'a>(&'a self, ty: &'a str) -> impl Iterator<Item = &'a HierarchyNode> + 'a {
        self.nodes
            .values()
            .filter(move |n| n.is_graph && n.has_type(ty))
    }

    /// Parent chain from `id` upward (excluding `id`), stopping at the root.
    pub fn ancestors(&self, id: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut current = self.parent_of(id);
        while let Some(parent) = current {
            if out.iter().any(|p| p == parent) {
                break;
            }
            out.push(parent.to_string());
            current = self.parent_of(parent);
        }
        out
    }

    /// Depth-first pre-order over roots then detached nodes: `(depth, node)`.
    pub fn walk(&self) -> Vec<(usize, &HierarchyNode)> {
        let mut out = Vec::new();
        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut stack: Vec<(usize, &str)> = self
            .roots
            .iter()
            .chain(self.detached.iter())
            .rev()
            .map(|id| (0, id.as_str()))
            .collect();
        while let Some((depth, id)) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            out.push((depth, node));
            for child in node.children.iter().rev() {
                stack.push((depth + 1, child));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::VG_NS;

    fn vg(local: &str) -> String {
        format!("{VG_NS}{local}")
    }

    fn quad(s: &str, p: &str, o: &str, g: &str) -> Quad {
        Quad::iri(s, p, o, Some(g))
    }

    fn sample() -> Store {
        let v = Vocabulary::default();
        [
            quad("http://x/tree", RDF_TYPE, &vg("ProcessTree"), "http://x/tree"),
            quad("http://x/tree", &v.parent_predicate, &v.root, "http://x/tree"),
            quad("http://x/P1", &v.parent_predicate, "http://x/tree", "http://x/tree"),
            quad("http://x/I1", &v.parent_predicate, "http://x/P1", "http://x/tree"),
            quad("http://x/G1", RDF_TYPE, &vg("Schema"), "http://x/G1"),
            quad("http://x/G1", &v.parent_predicate, "http://x/P1", "http://x/G1"),
            quad("http://x/I1", RDF_TYPE, &vg("Process"), "http://x/G1"),
            quad("http://x/I2", &vg("flowsTo"), "http://x/I1", "http://x/G1"),
            quad("http://x/I3", &v.subprocess_predicate, "http://x/G1", "http://x/tree"),
            quad("http://x/I9", &v.parent_predicate, "http://x/ghost", "http://x/tree"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn builds_tree_with_children_and_placeholders() {
        let h = build_hierarchy(&sample(), &Vocabulary::default()).expect("valid");
        assert_eq!(h.roots, vec!["http://x/tree".to_string()]);
        assert_eq!(h.nodes["http://x/tree"].children, vec!["http://x/P1".to_string()]);
        assert_eq!(
            h.nodes["http://x/P1"].children,
            vec!["http://x/G1".to_string(), "http://x/I1".to_string()]
        );
        let ghost = &h.nodes["http://x/ghost"];
        assert!(ghost.placeholder);
        assert_eq!(ghost.children, vec!["http://x/I9".to_string()]);
        assert_eq!(h.detached, vec!["http://x/ghost".to_string()]);
        assert!(h.nodes["http://x/G1"].is_graph);
        assert!(!h.nodes["http://x/P1"].is_graph);
    }

    #[test]
    fn contained_individuals_from_all_three_sources() {
        let h = build_hierarchy(&sample(), &Vocabulary::default()).expect("valid");
        assert_eq!(
            h.nodes["http://x/G1"].individuals,
            vec![
                "http://x/I1".to_string(),
                "http://x/I2".to_string(),
                "http://x/I3".to_string()
            ]
        );
    }

    #[test]
    fn graph_without_parent_is_rejected() {
        let mut store = sample();
        store.insert(quad("http://x/s", "http://x/p", "http://x/o", "http://x/orphan"));
        let err = build_hierarchy(&store, &Vocabulary::default()).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].graph, "http://x/orphan");
    }

    #[test]
    fn excluded_graphs_and_root_need_no_parent() {
        let v = Vocabulary::default();
        let mut store = sample();
        store.insert(quad("http://x/scratch", RDF_TYPE, &v.excluded_type, "http://x/scratch"));
        store.insert(quad(&v.root, RDF_TYPE, &vg("ProcessTree"), &v.root));
        let h = build_hierarchy(&store, &v).expect("valid");
        assert!(h.detached.contains(&"http://x/scratch".to_string()));
    }

    #[test]
    fn parent_cycles_are_rejected() {
        let v = Vocabulary::default();
        let mut store = sample();
        store.insert(quad("http://x/A", &v.parent_predicate, "http://x/B", "http://x/tree"));
        store.insert(quad("http://x/B", &v.parent_predicate, "http://x/A", "http://x/tree"));
        let err = build_hierarchy(&store, &v).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].graph, "http://x/A");
    }

    #[test]
    fn walk_visits_every_reachable_node_once() {
        let h = build_hierarchy(&sample(), &Vocabulary::default()).expect("valid");
        let walked: Vec<&str> = h.walk().iter().map(|(_, n)| n.id.as_str()).collect();
        assert_eq!(
            walked,
            vec![
                "http://x/tree",
                "http://x/P1",
                "http://x/G1",
                "http://x/I1",
                "http://x/ghost",
                "http://x/I9"
            ]
        );
        assert_eq!(
            h.ancestors("http://x/I1"),
            vec!["http://x/P1".to_string(), "http://x/tree".to_string(), v_root()]
        );
    }

    fn v_root() -> String {
        Vocabulary::default().root
    }
}
