//! RDF ingestion for procgraph (boundary adapter).
//!
//! This crate sits at the **input boundary** of a session:
//!
//! - It parses RDF text (untrusted) into a finished `Vec<Quad>`; the core never
//!   sees a partial parse.
//! - It serializes a store back to N-Quads so derived (virtual) graphs can be
//!   inspected next to authored data.
//!
//! Parsing uses **Sophia** for the common serializations:
//! - N-Triples (`.nt`)
//! - Turtle (`.ttl`)
//! - N-Quads (`.nq`)
//! - TriG (`.trig`)
//! - RDF/XML (`.rdf`, `.owl`, `.xml`)
//!
//! Triple formats land in the default graph.

use anyhow::{anyhow, Context, Result};
use procgraph_core::{Literal, PrefixMap, Quad, Term};
use sophia::api::prelude::*;
// The core `Quad` shadows the prelude's; keep the trait methods in scope.
use sophia::api::quad::Quad as _;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfFormat {
    NTriples,
    Turtle,
    NQuads,
    TriG,
    RdfXml,
}

impl RdfFormat {
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.to_lowercase().as_str() {
            "nt" | "ntriples" => Ok(RdfFormat::NTriples),
            "ttl" | "turtle" => Ok(RdfFormat::Turtle),
            "nq" | "nquads" => Ok(RdfFormat::NQuads),
            "trig" => Ok(RdfFormat::TriG),
            "rdf" | "owl" | "xml" => Ok(RdfFormat::RdfXml),
            other => Err(anyhow!("unsupported RDF format: .{other}")),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        Self::from_extension(ext)
    }

    /// Formats that can declare `@prefix` / `PREFIX` lines.
    pub fn has_prefix_declarations(self) -> bool {
        matches!(self, RdfFormat::Turtle | RdfFormat::TriG)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct IngestSinkError {
    message: String,
}

impl From<anyhow::Error> for IngestSinkError {
    fn from(value: anyhow::Error) -> Self {
        Self {
            message: value.to_string(),
        }
    }
}

// ============================================================================
// Sophia display form → core terms
// ============================================================================

fn unescape_rdf_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Parse the N-Triples-ish display form Sophia prints for a term.
fn parse_term_display(term: &str) -> Result<Term> {
    let s = term.trim();

    if let Some(rest) = s.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        return Ok(Term::iri(rest));
    }

    if let Some(rest) = s.strip_prefix("_:") {
        return Ok(Term::blank(rest));
    }

    if s.starts_with('"') {
        let mut end_quote = None;
        let mut escaped = false;
        for (i, ch) in s.char_indices().skip(1) {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                end_quote = Some(i);
                break;
            }
        }
        let Some(end) = end_quote else {
            return Err(anyhow!("invalid literal term (missing closing quote): {s}"));
        };

        let value = unescape_rdf_string(&s[1..end]);
        let rest = s[end + 1..].trim();

        if let Some(lang) = rest.strip_prefix('@') {
            return Ok(Term::Literal(Literal::new(value, None, Some(lang.to_string()))));
        }
        if let Some(dt) = rest.strip_prefix("^^") {
            let dt = dt.trim();
            let dt = dt
                .strip_prefix('<')
                .and_then(|t| t.strip_suffix('>'))
                .unwrap_or(dt);
            return Ok(Term::Literal(Literal::new(
                value,
                (!dt.is_empty()).then(|| dt.to_string()),
                None,
            )));
        }
        return Ok(Term::Literal(Literal::plain(value)));
    }

    Err(anyhow!("unsupported RDF term form: {s}"))
}

/// Build a quad from displayed terms. Statements whose predicate is not an IRI
/// are skipped (`Ok(None)`), matching what the store can represent.
fn quad_from_display(
    subject: &str,
    predicate: &str,
    object: &str,
    graph: Option<String>,
) -> Result<Option<Quad>> {
    let predicate = parse_term_display(predicate)?;
    if predicate.as_iri().is_none() {
        tracing::debug!(predicate = %predicate, "skipping statement with non-IRI predicate");
        return Ok(None);
    }
    let graph = graph.as_deref().map(parse_term_display).transpose()?;
    let quad = Quad::new(
        parse_term_display(subject)?,
        predicate,
        parse_term_display(object)?,
        graph,
    )?;
    Ok(Some(quad))
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse RDF bytes into quads, in document order.
pub fn parse_quads(bytes: &[u8], format: RdfFormat) -> Result<Vec<Quad>> {
    let cursor = std::io::Cursor::new(bytes);
    let reader = std::io::BufReader::new(cursor);
    let mut out: Vec<Quad> = Vec::new();

    let mut push = |s: String,
                    p: String,
                    o: String,
                    g: Option<String>|
     -> std::result::Result<(), IngestSinkError> {
        if let Some(quad) = quad_from_display(&s, &p, &o, g)? {
            out.push(quad);
        }
        Ok(())
    };

    match format {
        RdfFormat::NTriples => {
            let mut parser = sophia::turtle::parser::nt::parse_bufread(reader);
            parser
                .try_for_each_triple(|t| {
                    push(t.s().to_string(), t.p().to_string(), t.o().to_string(), None)
                })
                .map_err(|e| anyhow!("failed to parse N-Triples: {e}"))?;
        }
        RdfFormat::Turtle => {
            let mut parser = sophia::turtle::parser::turtle::parse_bufread(reader);
            parser
                .try_for_each_triple(|t| {
                    push(t.s().to_string(), t.p().to_string(), t.o().to_string(), None)
                })
                .map_err(|e| anyhow!("failed to parse Turtle: {e}"))?;
        }
        RdfFormat::NQuads => {
            let mut parser = sophia::turtle::parser::nq::parse_bufread(reader);
            parser
                .try_for_each_quad(|q| {
                    push(
                        q.s().to_string(),
                        q.p().to_string(),
                        q.o().to_string(),
                        q.g().map(|g| g.to_string()),
                    )
                })
                .map_err(|e| anyhow!("failed to parse N-Quads: {e}"))?;
        }
        RdfFormat::TriG => {
            let mut parser = sophia::turtle::parser::trig::parse_bufread(reader);
            parser
                .try_for_each_quad(|q| {
                    push(
                        q.s().to_string(),
                        q.p().to_string(),
                        q.o().to_string(),
                        q.g().map(|g| g.to_string()),
                    )
                })
                .map_err(|e| anyhow!("failed to parse TriG: {e}"))?;
        }
        RdfFormat::RdfXml => {
            let mut parser = sophia::xml::parser::parse_bufread(reader);
            parser
                .try_for_each_triple(|t| {
                    push(t.s().to_string(), t.p().to_string(), t.o().to_string(), None)
                })
                .map_err(|e| anyhow!("failed to parse RDF/XML: {e}"))?;
        }
    }

    tracing::debug!(quads = out.len(), format = ?format, "parsed RDF");
    Ok(out)
}

/// Prefixes declared by `@prefix p: <ns> .` or `PREFIX p: <ns>` lines.
///
/// A lexical scan: Sophia resolves prefixed names during parsing but does not
/// hand the table back.
pub fn declared_prefixes(text: &str) -> PrefixMap {
    let mut out = PrefixMap::empty();
    for line in text.lines() {
        let line = line.trim_start();
        let rest = if let Some(rest) = line.strip_prefix("@prefix") {
            rest
        } else if line.len() >= 6 && line[..6].eq_ignore_ascii_case("PREFIX") {
            &line[6..]
        } else {
            continue;
        };
        let Some((name, rest)) = rest.trim_start().split_once(':') else {
            continue;
        };
        let Some(ns) = rest
            .trim_start()
            .strip_prefix('<')
            .and_then(|r| r.split_once('>'))
            .map(|(ns, _)| ns)
        else {
            continue;
        };
        out.insert(name.trim(), ns);
    }
    out
}

/// A parsed RDF document.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub quads: Vec<Quad>,
    pub prefixes: PrefixMap,
}

pub fn load_bytes(bytes: &[u8], format: RdfFormat) -> Result<LoadedDocument> {
    let quads = parse_quads(bytes, format)?;
    let prefixes = if format.has_prefix_declarations() {
        declared_prefixes(&String::from_utf8_lossy(bytes))
    } else {
        PrefixMap::empty()
    };
    Ok(LoadedDocument { quads, prefixes })
}

/// Read and parse a file, picking the format from its extension.
pub fn load_file(path: &Path) -> Result<LoadedDocument> {
    let format = RdfFormat::from_path(path)?;
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    load_bytes(&bytes, format).with_context(|| format!("failed to load {}", path.display()))
}

// ============================================================================
// N-Quads export
// ============================================================================

pub fn write_nquads<'a, W: Write>(
    mut writer: W,
    quads: impl IntoIterator<Item = &'a Quad>,
) -> std::io::Result<usize> {
    let mut written = 0usize;
    for quad in quads {
        writeln!(writer, "{quad}")?;
        written += 1;
    }
    Ok(written)
}

pub fn to_nquads<'a>(quads: impl IntoIterator<Item = &'a Quad>) -> String {
    quads.into_iter().map(|q| format!("{q}\n")).collect()
}
