//! Lexical splitter for the query subset.
//!
//! Everything here is span-aware: text between `<` and `>` (nesting tracked)
//! and text between matching `'` or `"` quotes is atomic. Terminators, braces,
//! keywords and comment markers inside such spans are inert.
//!
//! Unterminated spans silently close at end of input; nothing in this module
//! returns an error.

/// Top-level statement terminator.
pub const STATEMENT_TERMINATOR: char = '.';

/// Tracks whether the scanner is inside an IRI or quoted span.
#[derive(Debug, Default, Clone, Copy)]
struct SpanTracker {
    iri_depth: usize,
    quote: Option<char>,
    escaped: bool,
}

impl SpanTracker {
    /// Feed one character; returns `true` when `c` sits at top level.
    ///
    /// Span delimiters themselves are never top level.
    fn feed(&mut self, c: char) -> bool {
        if let Some(q) = self.quote {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == q {
                self.quote = None;
            }
            return false;
        }
        if self.iri_depth > 0 {
            match c {
                '<' => self.iri_depth += 1,
                '>' => self.iri_depth -= 1,
                _ => {}
            }
            return false;
        }
        match c {
            '<' => {
                self.iri_depth = 1;
                false
            }
            '"' | '\'' => {
                self.quote = Some(c);
                false
            }
            _ => true,
        }
    }
}

/// Split a clause body into statements on the default terminator.
pub fn split_statements(body: &str) -> Vec<String> {
    split_on(body, STATEMENT_TERMINATOR)
}

/// Split on a top-level `terminator`, dropping empty statements.
///
/// A `.` between two name characters (`1.5`, `ex:v1.2`) belongs to the token
/// and does not terminate.
pub fn split_on(body: &str, terminator: char) -> Vec<String> {
    let mut out = Vec::new();
    let mut tracker = SpanTracker::default();
    let mut start = 0usize;
    let mut prev: Option<char> = None;
    let mut chars = body.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let top = tracker.feed(c);
        let inside_name = c == '.'
            && prev.is_some_and(is_name_char)
            && chars.peek().is_some_and(|&(_, next)| is_name_char(next));
        if top && c == terminator && !inside_name {
            push_statement(&mut out, &body[start..i]);
            start = i + c.len_utf8();
        }
        prev = Some(c);
    }
    push_statement(&mut out, &body[start..]);
    out
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn push_statement(out: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

/// Given the byte index of an opening `{`, return the index just past its
/// matching `}` (or `text.len()` when the block never closes).
///
/// Braces inside IRIs and quoted literals do not count.
pub fn matching_brace(text: &str, open: usize) -> usize {
    let mut depth = 0usize;
    let mut tracker = SpanTracker::default();
    for (i, c) in text[open..].char_indices() {
        if !tracker.feed(c) {
            continue;
        }
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return open + i + 1;
                }
            }
            _ => {}
        }
    }
    text.len()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '?' | '$')
}

/// Case-insensitive search for a whole-word keyword at top level, starting at
/// byte index `from`. Returns the byte index of the keyword.
pub fn find_keyword(text: &str, keyword: &str, from: usize) -> Option<usize> {
    let mut tracker = SpanTracker::default();
    let mut prev: Option<char> = None;
    // Track span state from the start so `from` may land inside a literal.
    for (i, c) in text.char_indices() {
        let top = tracker.feed(c);
        if top && i >= from && !prev.is_some_and(is_word_char) {
            let rest = &text[i..];
            if rest.len() >= keyword.len()
                && rest.is_char_boundary(keyword.len())
                && rest[..keyword.len()].eq_ignore_ascii_case(keyword)
                && !rest[keyword.len()..].chars().next().is_some_and(is_word_char)
            {
                return Some(i);
            }
        }
        prev = Some(c);
    }
    None
}

/// Byte index of the first top-level occurrence of `needle` at or after `from`.
pub fn find_top_level(text: &str, needle: char, from: usize) -> Option<usize> {
    let mut tracker = SpanTracker::default();
    text.char_indices()
        .find(|&(i, c)| tracker.feed(c) && i >= from && c == needle)
        .map(|(i, _)| i)
}

/// Remove every `keyword { ... }` block (e.g. `OPTIONAL`), nested blocks
/// included. A keyword not followed by `{` is left alone.
pub fn strip_blocks(text: &str, keyword: &str) -> String {
    let mut out = text.to_string();
    let mut from = 0usize;
    while let Some(kw) = find_keyword(&out, keyword, from) {
        let after = kw + keyword.len();
        let open = after + (out[after..].len() - out[after..].trim_start().len());
        if !out[open..].starts_with('{') {
            from = after;
            continue;
        }
        let end = matching_brace(&out, open);
        out.replace_range(kw..end, " ");
        from = kw;
    }
    out
}

/// Drop `#` comments (a top-level `#` up to end of line).
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut tracker = SpanTracker::default();
    let mut in_comment = false;
    for c in text.chars() {
        if in_comment {
            if c == '\n' {
                in_comment = false;
                out.push(c);
            }
            continue;
        }
        // Probe on a copy so a `#` never enters the tracker.
        let mut probe = tracker;
        if c == '#' && probe.feed(c) {
            in_comment = true;
            continue;
        }
        tracker.feed(c);
        out.push(c);
    }
    out
}

/// Split a statement into subject, predicate and "everything else".
///
/// The third field keeps its inner whitespace so multi-word literals survive.
/// Returns `None` for fewer than three fields.
pub fn split_fields(statement: &str) -> Option<(&str, &str, &str)> {
    let s = statement.trim();
    let (subject, rest) = s.split_once(char::is_whitespace)?;
    let rest = rest.trim_start();
    let (predicate, rest) = rest.split_once(char::is_whitespace)?;
    let object = rest.trim();
    if subject.is_empty() || predicate.is_empty() || object.is_empty() {
        return None;
    }
    Some((subject, predicate, object))
}
