//! Pattern compiler: WHERE-clause text → typed triple patterns.
//!
//! - `GRAPH <g> { ... }` / `GRAPH prefix:g { ... }` / `GRAPH ?g { ... }` blocks
//!   yield patterns scoped to that graph.
//! - Whatever is left once the graph blocks are cut out yields unscoped
//!   patterns (they match quads in any graph, default graph included).
//! - `#` comments and `OPTIONAL { ... }` blocks are removed before anything else.
//!
//! Malformed statements (fewer than three fields, unsupported keywords) are
//! skipped, never reported as errors.

use crate::lexer::{
    find_keyword, matching_brace, split_fields, split_statements, strip_blocks, strip_comments,
};
use crate::prefix::PrefixMap;
use crate::term::{Literal, Term};
use crate::vocab::{RDF_TYPE, XSD_BOOLEAN, XSD_DECIMAL, XSD_INTEGER};
use serde::{Deserialize, Serialize};

/// Graph component of a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GraphScope {
    /// Matches any graph, the default graph included.
    Unscoped,
    /// A bound graph IRI, or a variable ranging over named graphs.
    Named(Term),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriplePattern {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
    pub graph: GraphScope,
}

impl TriplePattern {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
            graph: GraphScope::Unscoped,
        }
    }

    pub fn in_graph(mut self, graph: Term) -> Self {
        self.graph = GraphScope::Named(graph);
        self
    }

    /// Variables in subject, predicate, object, graph order (repeats kept).
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        let graph = match &self.graph {
            GraphScope::Named(t) => Some(t),
            GraphScope::Unscoped => None,
        };
        [Some(&self.subject), Some(&self.predicate), Some(&self.object), graph]
            .into_iter()
            .flatten()
            .filter_map(|t| match t {
                Term::Variable(v) => Some(v.as_str()),
                _ => None,
            })
    }
}

/// Keywords that open constructs the compiler does not evaluate.
const UNSUPPORTED_KEYWORDS: &[&str] = &["FILTER", "BIND", "VALUES", "MINUS", "SERVICE"];

/// Compile a WHERE-clause body into patterns: graph-scoped ones first, in
/// textual order, then the unscoped remainder.
pub fn compile_where(body: &str, prefixes: &PrefixMap) -> Vec<TriplePattern> {
    let body = strip_blocks(&strip_comments(body), "OPTIONAL");

    let mut patterns = Vec::new();
    let mut remainder = String::with_capacity(body.len());
    let mut cursor = 0usize;
    let mut from = 0usize;

    while let Some(kw) = find_keyword(&body, "GRAPH", from) {
        let Some((scope_token, open)) = graph_block_header(&body, kw + "GRAPH".len()) else {
            from = kw + "GRAPH".len();
            continue;
        };
        let end = matching_brace(&body, open);
        let inner_end = if body[..end].ends_with('}') { end - 1 } else { end };
        let scope = resolve_term(scope_token, prefixes);
        match &scope {
            Term::Iri(_) | Term::Variable(_) | Term::BlankNode(_) => {
                for stmt in split_statements(&body[open + 1..inner_end]) {
                    if let Some(p) = compile_statement(&stmt, Some(&scope), prefixes) {
                        patterns.push(p);
                    }
                }
            }
            Term::Literal(_) => {
                tracing::debug!(scope = scope_token, "GRAPH scope is a literal; block skipped");
            }
        }
        // Cut the block out, leaving a terminator so neighbours stay apart.
        remainder.push_str(&body[cursor..kw]);
        remainder.push_str(" . ");
        cursor = end;
        from = end;
    }
    remainder.push_str(&body[cursor..]);

    for stmt in split_statements(&remainder) {
        if let Some(p) = compile_statement(&stmt, None, prefixes) {
            patterns.push(p);
        }
    }
    patterns
}

/// Parse `<scope> {` after a GRAPH keyword: returns the scope token and the
/// index of `{`.
fn graph_block_header(body: &str, after_kw: usize) -> Option<(&str, usize)> {
    let rest = &body[after_kw..];
    let token_start = after_kw + (rest.len() - rest.trim_start().len());
    let rest = &body[token_start..];
    let token_len = if rest.starts_with('<') {
        rest.find('>')? + 1
    } else {
        rest.find(|c: char| c.is_whitespace() || c == '{')?
    };
    if token_len == 0 {
        return None;
    }
    let token = &body[token_start..token_start + token_len];
    let after_token = &body[token_start + token_len..];
    let open = token_start + token_len + (after_token.len() - after_token.trim_start().len());
    body[open..].starts_with('{').then_some((token, open))
}

/// Compile one statement. `scope` is the enclosing GRAPH term, if any.
pub fn compile_statement(
    statement: &str,
    scope: Option<&Term>,
    prefixes: &PrefixMap,
) -> Option<TriplePattern> {
    let statement = statement.trim();
    if statement.starts_with('#') {
        return None;
    }
    if let Some(kw) = UNSUPPORTED_KEYWORDS
        .iter()
        .find(|kw| starts_with_keyword(statement, kw))
    {
        tracing::warn!(keyword = *kw, statement, "unsupported construct ignored");
        return None;
    }
    let Some((s, p, o)) = split_fields(statement) else {
        tracing::debug!(statement, "skipping malformed pattern (fewer than 3 fields)");
        return None;
    };
    let predicate = if p == "a" {
        Term::iri(RDF_TYPE)
    } else {
        resolve_term(p, prefixes)
    };
    let pattern = TriplePattern::new(resolve_term(s, prefixes), predicate, resolve_term(o, prefixes));
    Some(match scope {
        Some(g) => pattern.in_graph(g.clone()),
        None => pattern,
    })
}

fn starts_with_keyword(statement: &str, keyword: &str) -> bool {
    statement.len() >= keyword.len()
        && statement.is_char_boundary(keyword.len())
        && statement[..keyword.len()].eq_ignore_ascii_case(keyword)
        && !statement[keyword.len()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
}

/// Resolve one token to a term.
///
/// Unknown prefixes pass through as an opaque IRI holding the raw token.
pub fn resolve_term(token: &str, prefixes: &PrefixMap) -> Term {
    let token = token.trim();
    if let Some(name) = token.strip_prefix('?').or_else(|| token.strip_prefix('$')) {
        return Term::var(name);
    }
    if let Some(inner) = token.strip_prefix('<') {
        return Term::iri(inner.strip_suffix('>').unwrap_or(inner));
    }
    if let Some(label) = token.strip_prefix("_:") {
        // Blank nodes in patterns are non-selectable variables.
        return Term::var(format!("_:{label}"));
    }
    if token.starts_with('"') || token.starts_with('\'') {
        return Term::Literal(parse_literal(token, prefixes));
    }
    if token == "true" || token == "false" {
        return Term::typed_literal(token, XSD_BOOLEAN);
    }
    if is_integer(token) {
        return Term::typed_literal(token, XSD_INTEGER);
    }
    if is_decimal(token) {
        return Term::typed_literal(token, XSD_DECIMAL);
    }
    if token.contains(':') {
        return match prefixes.expand(token) {
            Some(iri) => Term::iri(iri),
            None => {
                tracing::warn!(token, "unknown prefix; token kept unresolved");
                Term::iri(token)
            }
        };
    }
    Term::iri(token)
}

fn is_integer(token: &str) -> bool {
    let digits = token.strip_prefix(['+', '-']).unwrap_or(token);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// `[+-]? digits? "." digits`, as in Turtle.
fn is_decimal(token: &str) -> bool {
    let unsigned = token.strip_prefix(['+', '-']).unwrap_or(token);
    match unsigned.split_once('.') {
        Some((whole, frac)) => {
            !frac.is_empty()
                && whole.chars().all(|c| c.is_ascii_digit())
                && frac.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Parse a quoted literal with optional `@lang` or `^^datatype` suffix.
/// A missing closing quote takes the rest of the token as the value.
fn parse_literal(token: &str, prefixes: &PrefixMap) -> Literal {
    let quote = token.chars().next().unwrap_or('"');
    let body = &token[quote.len_utf8()..];

    let mut value = String::with_capacity(body.len());
    let mut chars = body.char_indices();
    let mut close = None;
    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, 'r')) => value.push('\r'),
                Some((_, other)) => value.push(other),
                None => value.push('\\'),
            }
        } else if c == quote {
            close = Some(i);
            break;
        } else {
            value.push(c);
        }
    }

    let suffix = close.map(|i| body[i + quote.len_utf8()..].trim()).unwrap_or("");
    if let Some(lang) = suffix.strip_prefix('@') {
        return Literal::new(value, None, Some(lang.to_string()));
    }
    if let Some(dt) = suffix.strip_prefix("^^") {
        let datatype = resolve_term(dt, prefixes);
        return Literal::new(value, datatype.as_iri().map(str::to_string), None);
    }
    Literal::plain(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::VG_NS;

    fn prefixes() -> PrefixMap {
        let mut p = PrefixMap::default();
        p.insert("ex", "http://example.org/");
        p
    }

    #[test]
    fn resolves_each_term_kind() {
        let p = prefixes();
        assert_eq!(resolve_term("?s", &p), Term::var("s"));
        assert_eq!(resolve_term("<http://x/a>", &p), Term::iri("http://x/a"));
        assert_eq!(resolve_term("ex:a", &p), Term::iri("http://example.org/a"));
        assert_eq!(resolve_term("zz:a", &p), Term::iri("zz:a"));
        assert_eq!(resolve_term("\"two words\"", &p), Term::literal("two words"));
        assert_eq!(resolve_term("'single'", &p), Term::literal("single"));
        assert_eq!(resolve_term("\"hi\"@EN", &p), Term::lang_literal("hi", "en"));
        assert_eq!(
            resolve_term("\"5\"^^xsd:integer", &p),
            Term::typed_literal("5", XSD_INTEGER)
        );
        assert_eq!(resolve_term("42", &p), Term::typed_literal("42", XSD_INTEGER));
    }

    #[test]
    fn decimals_and_dotted_local_names_stay_whole() {
        let patterns = compile_where("?s <http://x/w> 1.5 . ?s ex:tag ex:v1.2 .", &prefixes());
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[0].object, Term::typed_literal("1.5", XSD_DECIMAL));
        assert_eq!(patterns[1].object, Term::iri("http://example.org/v1.2"));
        assert_eq!(resolve_term("-.5", &prefixes()), Term::typed_literal("-.5", XSD_DECIMAL));
        assert_eq!(resolve_term("1.", &prefixes()), Term::iri("1."));
    }

    #[test]
    fn graph_blocks_scope_their_patterns() {
        let body = "?x <http://x/q> ?y . GRAPH <http://x/g> { ?s <http://x/p> <http://x/o> . } ?y ex:r ?z";
        let patterns = compile_where(body, &prefixes());
        assert_eq!(patterns.len(), 3);
        assert_eq!(patterns[0].graph, GraphScope::Named(Term::iri("http://x/g")));
        assert_eq!(patterns[0].subject, Term::var("s"));
        assert_eq!(patterns[1].graph, GraphScope::Unscoped);
        assert_eq!(patterns[2].predicate, Term::iri("http://example.org/r"));
    }

    #[test]
    fn prefixed_and_variable_graph_scopes() {
        let body = "GRAPH vg:tree { ?c vg:hasParentObj ?p } GRAPH ?g { ?s a vg:Schema }";
        let patterns = compile_where(body, &prefixes());
        assert_eq!(patterns.len(), 2);
        assert_eq!(
            patterns[0].graph,
            GraphScope::Named(Term::iri(format!("{VG_NS}tree")))
        );
        assert_eq!(patterns[1].graph, GraphScope::Named(Term::var("g")));
        assert_eq!(patterns[1].predicate, Term::iri(RDF_TYPE));
    }

    #[test]
    fn optional_and_malformed_statements_are_dropped() {
        let body = r#"
            ?s <http://x/p> ?o .
            OPTIONAL { ?s <http://x/label> ?l . }
            ?broken <http://x/p> .
            # ?commented <http://x/p> ?out .
            ?s <http://x/name> "Ann Lee"
        "#;
        let patterns = compile_where(body, &prefixes());
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[1].object, Term::literal("Ann Lee"));
    }

    #[test]
    fn filter_statements_are_ignored() {
        let patterns = compile_where("?s ?p ?o . FILTER(?o != 3)", &prefixes());
        assert_eq!(patterns.len(), 1);
    }
}
