//! Vocabulary: the designated IRIs that drive the hierarchy, the subtype
//! reasoner and the virtual graph materializer.
//!
//! Every designated IRI lives in [`Vocabulary`] so a deployment can point the
//! core at its own ontology through [`crate::config::SessionConfig`].

use serde::{Deserialize, Serialize};

pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS_NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";
pub const VG_NS: &str = "https://w3id.org/procgraph/vg#";

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";

fn vg(local: &str) -> String {
    format!("{VG_NS}{local}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Vocabulary {
    /// The single parent-reference predicate the hierarchy is built from.
    pub parent_predicate: String,
    pub label_predicate: String,
    /// The one graph-typed node allowed to have no parent.
    pub root: String,
    /// Declared types that make a subject graph-typed even when it never
    /// appears in a graph position.
    pub graph_types: Vec<String>,
    /// Graph-typed nodes with this type are exempt from the parent check.
    pub excluded_type: String,
    /// Type of schema graphs (diagrams).
    pub schema_type: String,
    /// `schema definesProcess process`.
    pub defines_predicate: String,
    /// `concept hasSchema schema`: the concept has its own nested diagram.
    pub own_schema_predicate: String,
    /// Parent reference of concepts whose place in the tree is not decided yet.
    pub undefined: String,
    /// `individual isSubprocessOf node`.
    pub subprocess_predicate: String,
    /// Predicates whose subjects, inside a graph, are individuals of that graph.
    pub individual_predicates: Vec<String>,
    /// `rdf:type` objects marking individuals inside a graph.
    pub individual_types: Vec<String>,
    /// Marker type carried by every virtual graph.
    pub virtual_type: String,
    /// Back-reference from a virtual graph to its schema graph.
    pub has_parent_predicate: String,
    pub subtype_predicate: String,
    /// Namespace the five subtype values are minted in.
    pub subtype_namespace: String,
    /// Appended to a schema graph id to name its virtual graph.
    pub virtual_suffix: String,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            parent_predicate: vg("hasParentObj"),
            label_predicate: RDFS_LABEL.to_string(),
            root: vg("root"),
            graph_types: vec![vg("Schema"), vg("ProcessTree"), vg("ObjectTree")],
            excluded_type: vg("Excluded"),
            schema_type: vg("Schema"),
            defines_predicate: vg("definesProcess"),
            own_schema_predicate: vg("hasSchema"),
            undefined: vg("undefined"),
            subprocess_predicate: vg("isSubprocessOf"),
            individual_predicates: vec![vg("flowsTo"), vg("hasInput"), vg("hasOutput")],
            individual_types: vec![vg("Process")],
            virtual_type: vg("Virtual"),
            has_parent_predicate: vg("hasParentObj"),
            subtype_predicate: vg("processSubtype"),
            subtype_namespace: VG_NS.to_string(),
            virtual_suffix: "_virtual".to_string(),
        }
    }
}

impl Vocabulary {
    pub fn is_graph_type(&self, ty: &str) -> bool {
        self.graph_types.iter().any(|t| t == ty)
    }

    pub fn is_individual_predicate(&self, predicate: &str) -> bool {
        self.individual_predicates.iter().any(|p| p == predicate)
    }

    pub fn is_individual_type(&self, ty: &str) -> bool {
        self.individual_types.iter().any(|t| t == ty)
    }
}
