//! Query front-end: `SELECT` / `ASK` text → [`ParsedQuery`].
//!
//! Accepted shapes (keywords case-insensitive):
//!
//! ```text
//! [PREFIX p: <ns>]*
//! SELECT [DISTINCT|REDUCED] (?v ... | *) [WHERE] { ... } [LIMIT n]
//! ASK [WHERE] { ... }
//! ```
//!
//! Malformed queries are not errors: [`parse_query`] logs and returns `None`,
//! and callers answer with an empty result / `false`.

use crate::lexer::{find_keyword, find_top_level, matching_brace, strip_comments};
use crate::pattern::{compile_where, TriplePattern};
use crate::prefix::PrefixMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryForm {
    Select {
        /// Requested variables; empty means `SELECT *`.
        variables: Vec<String>,
        distinct: bool,
    },
    Ask,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuery {
    pub form: QueryForm,
    pub patterns: Vec<TriplePattern>,
    pub limit: Option<usize>,
    /// Prefix table in effect (session prefixes plus the query's own).
    pub prefixes: PrefixMap,
}

impl ParsedQuery {
    pub fn is_ask(&self) -> bool {
        matches!(self.form, QueryForm::Ask)
    }

    /// Variables to project: the requested list, or for `SELECT *` every
    /// selectable variable in first-appearance order.
    pub fn projection(&self) -> Vec<String> {
        if let QueryForm::Select { variables, .. } = &self.form {
            if !variables.is_empty() {
                return variables.clone();
            }
        }
        let mut out: Vec<String> = Vec::new();
        for v in self.patterns.iter().flat_map(TriplePattern::variables) {
            if !is_hidden_variable(v) && !out.iter().any(|o| o == v) {
                out.push(v.to_string());
            }
        }
        out
    }

    pub fn is_distinct(&self) -> bool {
        matches!(self.form, QueryForm::Select { distinct: true, .. })
    }
}

/// Variables minted for blank nodes in patterns are never projected.
pub fn is_hidden_variable(name: &str) -> bool {
    name.starts_with("_:")
}

/// Parse query text against the session prefix table.
pub fn parse_query(text: &str, prefixes: &PrefixMap) -> Option<ParsedQuery> {
    let text = strip_comments(text);
    let mut prefixes = prefixes.clone();

    let select = find_keyword(&text, "SELECT", 0);
    let ask = find_keyword(&text, "ASK", 0);
    let (form_at, is_ask) = match (select, ask) {
        (Some(s), Some(a)) if a < s => (a, true),
        (Some(s), _) => (s, false),
        (None, Some(a)) => (a, true),
        (None, None) => {
            tracing::warn!(query = %text.trim(), "malformed query: no SELECT or ASK keyword");
            return None;
        }
    };

    read_prologue(&text[..form_at], &mut prefixes);

    let keyword_len = if is_ask { "ASK".len() } else { "SELECT".len() };
    let head_start = form_at + keyword_len;
    let Some(open) = find_top_level(&text, '{', head_start) else {
        tracing::warn!(query = %text.trim(), "malformed query: no WHERE clause");
        return None;
    };
    let where_kw = find_keyword(&text, "WHERE", head_start).filter(|&w| w < open);
    let head = &text[head_start..where_kw.unwrap_or(open)];

    let end = matching_brace(&text, open);
    let inner_end = if text[..end].ends_with('}') { end - 1 } else { end };
    let patterns = compile_where(&text[open + 1..inner_end], &prefixes);
    let limit = parse_limit(&text[end..]);

    let form = if is_ask {
        QueryForm::Ask
    } else {
        let (variables, distinct) = parse_select_head(head);
        QueryForm::Select {
            variables,
            distinct,
        }
    };

    tracing::debug!(
        patterns = patterns.len(),
        ask = is_ask,
        "parsed query"
    );
    Some(ParsedQuery {
        form,
        patterns,
        limit,
        prefixes,
    })
}

/// `PREFIX p: <ns>` declarations (SPARQL and Turtle `@prefix` spellings).
fn read_prologue(prologue: &str, prefixes: &mut PrefixMap) {
    let mut from = 0usize;
    while let Some(kw) = find_keyword(prologue, "PREFIX", from) {
        let rest = &prologue[kw + "PREFIX".len()..];
        from = kw + "PREFIX".len();
        let rest = rest.trim_start();
        let Some((name, rest)) = rest.split_once(':') else {
            continue;
        };
        let rest = rest.trim_start();
        let Some(ns) = rest.strip_prefix('<').and_then(|r| r.split_once('>')).map(|(ns, _)| ns)
        else {
            continue;
        };
        prefixes.insert(name.trim(), ns);
    }
}

fn parse_select_head(head: &str) -> (Vec<String>, bool) {
    let mut distinct = false;
    let mut variables = Vec::new();
    for token in head.split_whitespace() {
        if token.eq_ignore_ascii_case("DISTINCT") {
            distinct = true;
        } else if token == "*" || token.eq_ignore_ascii_case("REDUCED") {
            continue;
        } else if let Some(v) = token.strip_prefix('?').or_else(|| token.strip_prefix('$')) {
            if !v.is_empty() && !variables.iter().any(|x: &String| x == v) {
                variables.push(v.to_string());
            }
        }
    }
    (variables, distinct)
}

fn parse_limit(tail: &str) -> Option<usize> {
    let kw = find_keyword(tail, "LIMIT", 0)?;
    tail[kw + "LIMIT".len()..]
        .split_whitespace()
        .next()
        .and_then(|n| n.parse().ok())
}
