//! Term model: typed graph values and the quad record.
//!
//! Terms are decided once, when text is parsed (by the ingest adapter or the
//! pattern compiler). Downstream code never sniffs `<`, `"` or `?` again.

use crate::error::{Error, Result};
use crate::vocab::XSD_STRING;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A literal value with optional datatype and language tag.
///
/// Plain literals and `xsd:string` literals are the same value: the
/// constructor drops an explicit `xsd:string` datatype.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    pub value: String,
    pub datatype: Option<String>,
    pub language: Option<String>,
}

impl Literal {
    pub fn new(
        value: impl Into<String>,
        datatype: Option<String>,
        language: Option<String>,
    ) -> Self {
        let datatype = datatype.filter(|dt| dt != XSD_STRING);
        Self {
            value: value.into(),
            datatype,
            language: language.map(|l| l.to_ascii_lowercase()),
        }
    }

    pub fn plain(value: impl Into<String>) -> Self {
        Self::new(value, None, None)
    }
}

/// A graph value.
///
/// IRIs compare byte-for-byte. Only `Variable` may appear unbound, and only in
/// patterns; a stored [`Quad`] never holds one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Term {
    Iri(String),
    Literal(Literal),
    BlankNode(String),
    Variable(String),
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal(Literal::plain(value))
    }

    pub fn typed_literal(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal(Literal::new(value, Some(datatype.into()), None))
    }

    pub fn lang_literal(value: impl Into<String>, language: impl Into<String>) -> Self {
        Term::Literal(Literal::new(value, None, Some(language.into())))
    }

    pub fn blank(id: impl Into<String>) -> Self {
        Term::BlankNode(id.into())
    }

    pub fn var(name: impl Into<String>) -> Self {
        Term::Variable(name.into())
    }

    /// Rebuild a node term from a hierarchy identifier (`_:x` is a blank node).
    pub fn from_node_id(id: &str) -> Self {
        match id.strip_prefix("_:") {
            Some(bn) => Term::BlankNode(bn.to_string()),
            None => Term::Iri(id.to_string()),
        }
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    /// Can this term name a node (subject / graph position)?
    pub fn is_node(&self) -> bool {
        matches!(self, Term::Iri(_) | Term::BlankNode(_))
    }

    /// Node identifier used by the hierarchy: the IRI itself, or `_:id`.
    pub fn node_id(&self) -> Option<String> {
        match self {
            Term::Iri(iri) => Some(iri.clone()),
            Term::BlankNode(bn) => Some(format!("_:{bn}")),
            _ => None,
        }
    }

    /// The bare value: IRI string, literal lexical form, blank id or var name.
    pub fn value(&self) -> &str {
        match self {
            Term::Iri(s) | Term::BlankNode(s) | Term::Variable(s) => s,
            Term::Literal(lit) => &lit.value,
        }
    }
}

pub(crate) fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// N-Quads style rendering.
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{iri}>"),
            Term::BlankNode(bn) => write!(f, "_:{bn}"),
            Term::Variable(name) => write!(f, "?{name}"),
            Term::Literal(lit) => {
                write!(f, "\"{}\"", escape_literal(&lit.value))?;
                if let Some(lang) = &lit.language {
                    write!(f, "@{lang}")
                } else if let Some(dt) = &lit.datatype {
                    write!(f, "^^<{dt}>")
                } else {
                    Ok(())
                }
            }
        }
    }
}

// ============================================================================
// Quad
// ============================================================================

/// A subject-predicate-object fact scoped to a named graph (`None` = default graph).
///
/// Positions are checked on construction: subject and graph are IRI or blank
/// node, predicate is an IRI, object is any non-variable term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quad {
    subject: Term,
    predicate: Term,
    object: Term,
    graph: Option<Term>,
}

impl Quad {
    pub fn new(subject: Term, predicate: Term, object: Term, graph: Option<Term>) -> Result<Self> {
        if !subject.is_node() {
            return Err(Error::InvalidQuad(format!(
                "subject must be an IRI or blank node, got {subject}"
            )));
        }
        if predicate.as_iri().is_none() {
            return Err(Error::InvalidQuad(format!(
                "predicate must be an IRI, got {predicate}"
            )));
        }
        if object.is_variable() {
            return Err(Error::InvalidQuad(format!(
                "object must be bound, got {object}"
            )));
        }
        if let Some(g) = &graph {
            if !g.is_node() {
                return Err(Error::InvalidQuad(format!(
                    "graph must be an IRI or blank node, got {g}"
                )));
            }
        }
        Ok(Self {
            subject,
            predicate,
            object,
            graph,
        })
    }

    /// Convenience constructor for the common all-IRI shape.
    pub fn iri(subject: &str, predicate: &str, object: &str, graph: Option<&str>) -> Self {
        Self {
            subject: Term::iri(subject),
            predicate: Term::iri(predicate),
            object: Term::iri(object),
            graph: graph.map(Term::iri),
        }
    }

    /// IRI subject/predicate/graph with a plain literal object.
    pub fn with_literal(subject: &str, predicate: &str, value: &str, graph: Option<&str>) -> Self {
        Self {
            subject: Term::iri(subject),
            predicate: Term::iri(predicate),
            object: Term::literal(value),
            graph: graph.map(Term::iri),
        }
    }

    /// Build from node identifiers (`_:x` becomes a blank node).
    pub(crate) fn from_ids(subject: &str, predicate: &str, object: &str, graph: &str) -> Self {
        Self {
            subject: Term::from_node_id(subject),
            predicate: Term::iri(predicate),
            object: Term::from_node_id(object),
            graph: Some(Term::from_node_id(graph)),
        }
    }

    pub fn subject(&self) -> &Term {
        &self.subject
    }

    pub fn predicate(&self) -> &Term {
        &self.predicate
    }

    pub fn predicate_iri(&self) -> &str {
        self.predicate.value()
    }

    pub fn object(&self) -> &Term {
        &self.object
    }

    pub fn graph(&self) -> Option<&Term> {
        self.graph.as_ref()
    }

    /// Graph identifier as used by the hierarchy (`None` for the default graph).
    pub fn graph_id(&self) -> Option<String> {
        self.graph.as_ref().and_then(Term::node_id)
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)?;
        if let Some(g) = &self.graph {
            write!(f, " {g}")?;
        }
        write!(f, " .")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_literal_subject_and_variable_object() {
        let lit = Quad::new(
            Term::literal("x"),
            Term::iri("http://x/p"),
            Term::iri("http://x/o"),
            None,
        );
        assert!(matches!(lit, Err(Error::InvalidQuad(_))));

        let var = Quad::new(
            Term::iri("http://x/s"),
            Term::iri("http://x/p"),
            Term::var("o"),
            None,
        );
        assert!(var.is_err());
    }

    #[test]
    fn xsd_string_is_a_plain_literal() {
        assert_eq!(
            Term::typed_literal("v", XSD_STRING),
            Term::literal("v"),
        );
    }

    #[test]
    fn renders_nquads_terms() {
        let q = Quad::new(
            Term::blank("b0"),
            Term::iri("http://x/p"),
            Term::lang_literal("say \"hi\"", "EN"),
            Some(Term::iri("http://x/g")),
        )
        .unwrap();
        assert_eq!(q.to_string(), r#"_:b0 <http://x/p> "say \"hi\""@en <http://x/g> ."#);
        assert_eq!(q.subject().node_id().as_deref(), Some("_:b0"));
    }
}
