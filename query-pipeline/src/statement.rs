//! Extraction and acceptance of Cypher statements from oracle replies.

use lazy_static::lazy_static;
use regex::Regex;

use crate::prompt::NO_MATCH_SENTINEL;

lazy_static! {
    // Matches write keywords anywhere outside literals, so a bare map key or
    // alias such as `{set: 1}` or `AS delete` is rejected too. Backticked
    // names and property access (`n.delete`) pass.
    static ref WRITE_CLAUSE: Regex = Regex::new(
        r"(?i)(?:^|[^.:$\w])(CREATE|MERGE|DELETE|DETACH|SET|REMOVE|DROP|FOREACH|LOAD\s+CSV)\b"
    )
    .unwrap();
    static ref FIRST_WORD: Regex = Regex::new(r"^[A-Za-z]+").unwrap();
}

const READ_KEYWORDS: [&str; 7] = ["MATCH", "OPTIONAL", "WITH", "CALL", "UNWIND", "RETURN", "USE"];

/// Pulls the statement out of a reply.
///
/// Takes the first fenced block when there is one (dropping a language tag
/// such as `cypher`), then trims whitespace and trailing `;`.
pub fn extract_statement(reply: &str) -> Option<String> {
    let body = match reply.find("```") {
        Some(start) => {
            let after = &reply[start + 3..];
            let block = after.find("```").map_or(after, |end| &after[..end]);
            drop_language_tag(block)
        }
        None => reply,
    };
    let stmt = trim_terminators(body);
    (!stmt.is_empty()).then(|| stmt.to_string())
}

/// Trims whitespace and trailing statement terminators.
pub fn trim_terminators(query: &str) -> &str {
    query.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace())
}

fn drop_language_tag(block: &str) -> &str {
    match block.split_once('\n') {
        Some((first, rest)) if is_language_tag(first.trim()) => rest,
        _ => block,
    }
}

fn is_language_tag(word: &str) -> bool {
    word.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        && !READ_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

/// Extracts the statement and checks it is a single read-only query.
///
/// Returns `None` for the no-match sentinel, prose, or anything that could
/// write to the graph.
pub fn accept_statement(reply: &str) -> Option<String> {
    let stmt = extract_statement(reply)?;
    if stmt.contains(NO_MATCH_SENTINEL) {
        return None;
    }
    let masked = mask_literals(&stmt);
    if !starts_with_read_keyword(&masked) || WRITE_CLAUSE.is_match(&masked) {
        return None;
    }
    Some(stmt)
}

/// True when the reply is the no-match sentinel (possibly fenced or quoted).
pub fn is_no_match(reply: &str) -> bool {
    extract_statement(reply)
        .map(|s| s.trim_matches(|c| c == '"' || c == '\'' || c == '.') == NO_MATCH_SENTINEL)
        .unwrap_or(false)
}

fn starts_with_read_keyword(masked: &str) -> bool {
    let code = masked
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with("//"))
        .unwrap_or("");
    FIRST_WORD
        .find(code)
        .map(|m| {
            READ_KEYWORDS
                .iter()
                .any(|k| k.eq_ignore_ascii_case(m.as_str()))
        })
        .unwrap_or(false)
}

/// Blanks out string literals, quoted identifiers and comments.
///
/// The result has the same byte length as the input, so match offsets found
/// in the masked text apply to the original.
pub fn mask_literals(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    let mut chars = query.chars().peekable();
    let mut quote: Option<char> = None;
    let mut line_comment = false;
    let mut block_comment = false;

    while let Some(c) = chars.next() {
        if block_comment {
            if c == '*' && chars.peek() == Some(&'/') {
                block_comment = false;
                blank(&mut out, c);
                if let Some(slash) = chars.next() {
                    blank(&mut out, slash);
                }
            } else if c == '\n' {
                out.push(c);
            } else {
                blank(&mut out, c);
            }
            continue;
        }
        if line_comment {
            if c == '\n' {
                line_comment = false;
                out.push(c);
            } else {
                blank(&mut out, c);
            }
            continue;
        }
        match quote {
            Some(q) => {
                if c == '\\' && q != '`' {
                    blank(&mut out, c);
                    if let Some(escaped) = chars.next() {
                        blank(&mut out, escaped);
                    }
                    continue;
                }
                if c == q {
                    quote = None;
                    out.push(c);
                } else {
                    blank(&mut out, c);
                }
            }
            None => match c {
                '\'' | '"' | '`' => {
                    quote = Some(c);
                    out.push(c);
                }
                '/' if chars.peek() == Some(&'/') => {
                    line_comment = true;
                    blank(&mut out, c);
                }
                '/' if chars.peek() == Some(&'*') => {
                    block_comment = true;
                    blank(&mut out, c);
                    if let Some(star) = chars.next() {
                        blank(&mut out, star);
                    }
                }
                _ => out.push(c),
            },
        }
    }
    out
}

fn blank(out: &mut String, c: char) {
    out.extend(std::iter::repeat_n(' ', c.len_utf8()));
}
