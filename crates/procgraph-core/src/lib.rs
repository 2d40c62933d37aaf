//! # procgraph-core
//!
//! Embedded query-and-reasoning core for process-tree diagrams stored as quads.
//!
//! - [`term`] / [`store`]: typed terms, quads and the in-memory quad store
//! - [`lexer`] / [`pattern`] / [`query`]: SELECT/ASK text → triple patterns
//! - [`eval`]: nested-loop join and short-circuit ASK
//! - [`hierarchy`]: one parent/child tree across every named graph
//! - [`subtype`]: derived classification of individuals in schema graphs
//! - [`materialize`]: derived facts written back as virtual graphs
//! - [`session`]: the context object that owns all of the above
//! - [`engine`]: seam for an external query engine with local fallback

pub mod config;
pub mod engine;
pub mod error;
pub mod eval;
pub mod hierarchy;
pub mod lexer;
pub mod materialize;
pub mod pattern;
pub mod prefix;
pub mod query;
pub mod session;
pub mod store;
pub mod subtype;
pub mod term;
pub mod vocab;

pub use config::SessionConfig;
pub use engine::{EngineError, EngineRequest, LocalEngine, QueryEngine, UnavailableEngine};
pub use error::{Error, Result};
pub use eval::Binding;
pub use hierarchy::{build_hierarchy, Hierarchy, HierarchyNode, InvalidHierarchy, ValidationError};
pub use materialize::{materialize, MaterializeReport};
pub use prefix::PrefixMap;
pub use query::{parse_query, ParsedQuery, QueryForm};
pub use session::{AnswerSource, Answered, ResolvedValue, ResultRow, Session};
pub use store::{Mutation, MutationSummary, Store};
pub use subtype::{compute_subtypes, Subtype, SubtypeMap};
pub use term::{Literal, Quad, Term};
pub use vocab::Vocabulary;
