use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

const EXCERPT_LEN: usize = 160;
const DEGENERATION_TAIL_CHARS: usize = 4000;
const WORD_RUN_LIMIT: usize = 25;
const FRAGMENT_RUN_LIMIT: usize = 4;
const LITERAL_RUN_LIMIT: usize = 8;

/// # NDOC
/// component: `json_recovery`
/// purpose: Typed classification of unrecoverable model output.
/// invariants:
///   - `Repetition` is detected before any parse attempt; it marks model collapse.
///   - `Truncation` is only reported when the scanner saw unclosed openers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParseFailureKind {
    Repetition,
    Truncation,
    Malformed,
    Empty,
}

#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{kind:?}: {excerpt}")]
pub struct ParseFailure {
    pub kind: ParseFailureKind,
    pub excerpt: String,
}

impl ParseFailure {
    fn new(kind: ParseFailureKind, text: &str) -> Self {
        let tail: String = text
            .chars()
            .rev()
            .take(EXCERPT_LEN)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        Self {
            kind,
            excerpt: tail,
        }
    }
}

static WORD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9_]{4,}").expect("static word pattern"));
static STRING_LITERAL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"\\]{6,120})""#).expect("static literal pattern"));

/// Successful recovery plus whether the auto-closer had to repair a
/// truncated envelope (callers surface this as a slide warning).
#[derive(Debug, Clone, PartialEq)]
pub struct Recovery {
    pub value: Value,
    pub auto_closed: bool,
}

/// # NDOC
/// component: `json_recovery`
/// purpose: Recover a JSON value from raw model text, or classify the failure.
///
/// Ladder, stopping at the first success:
/// 1. degeneration guard (repetition collapse)
/// 2. envelope extraction (fences stripped, balanced-region scan)
/// 3. straight parse
/// 4. auto-closer for unbalanced envelopes
/// 5. raw-newline-in-string escape fallback
/// 6. one layer of double-encoded string decoding
/// 7. typed failure: `Truncation` when openers were left unclosed, else `Malformed`
pub fn recover_json(raw: &str) -> Result<Value, ParseFailure> {
    recover_json_report(raw).map(|r| r.value)
}

pub fn recover_json_report(raw: &str) -> Result<Recovery, ParseFailure> {
    if raw.trim().is_empty() {
        return Err(ParseFailure::new(ParseFailureKind::Empty, raw));
    }
    if detect_degeneration(raw) {
        return Err(ParseFailure::new(ParseFailureKind::Repetition, raw));
    }

    let stripped = strip_code_fences(raw);

    // Whole-envelope-as-quoted-string: decode one layer and re-enter the ladder.
    let trimmed = stripped.trim();
    if trimmed.starts_with('"') {
        if let Ok(inner) = serde_json::from_str::<String>(trimmed) {
            if inner.trim_start().starts_with(['{', '[']) {
                return recover_json_report(&inner);
            }
        }
    }

    let Some(start) = stripped.find(['{', '[']) else {
        return Err(ParseFailure::new(ParseFailureKind::Malformed, raw));
    };
    let candidate = &stripped[start..];
    let scan = scan_envelope(candidate);
    let envelope = &candidate[..scan.end];

    if let Ok(value) = serde_json::from_str::<Value>(envelope) {
        return Ok(Recovery {
            value: unwrap_double_encoded(value),
            auto_closed: false,
        });
    }

    if !scan.balanced {
        if let Some(value) = auto_close(envelope, &scan) {
            return Ok(Recovery {
                value: unwrap_double_encoded(value),
                auto_closed: true,
            });
        }
    }

    let escaped = escape_raw_newlines(envelope);
    if let Ok(value) = serde_json::from_str::<Value>(&escaped) {
        return Ok(Recovery {
            value: unwrap_double_encoded(value),
            auto_closed: false,
        });
    }
    if !scan.balanced {
        let rescan = scan_envelope(&escaped);
        if let Some(value) = auto_close(&escaped, &rescan) {
            return Ok(Recovery {
                value: unwrap_double_encoded(value),
                auto_closed: true,
            });
        }
    }

    let kind = if scan.balanced {
        ParseFailureKind::Malformed
    } else {
        ParseFailureKind::Truncation
    };
    Err(ParseFailure::new(kind, raw))
}

/// Reject output whose tail collapsed into repetition. Three signatures:
/// a 4+-char word repeated 25 times in a row, a short identifier fragment
/// repeated 4+ times with no separator, or the same string literal emitted
/// 8+ times consecutively (the repeated-bullet hallucination).
pub fn detect_degeneration(text: &str) -> bool {
    let tail_start = text
        .char_indices()
        .rev()
        .nth(DEGENERATION_TAIL_CHARS.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let tail = &text[tail_start..];

    let mut run = 1usize;
    let mut previous: Option<&str> = None;
    for m in WORD_PATTERN.find_iter(tail) {
        let word = m.as_str();
        if previous == Some(word) {
            run += 1;
            if run >= WORD_RUN_LIMIT {
                return true;
            }
        } else {
            run = 1;
            previous = Some(word);
        }
    }

    let mut literal_run = 1usize;
    let mut previous_literal: Option<&str> = None;
    for cap in STRING_LITERAL_PATTERN.captures_iter(tail) {
        let literal = cap.get(1).map(|m| m.as_str()).unwrap_or_default();
        if previous_literal == Some(literal) {
            literal_run += 1;
            if literal_run >= LITERAL_RUN_LIMIT {
                return true;
            }
        } else {
            literal_run = 1;
            previous_literal = Some(literal);
        }
    }

    // Separator-free periodic tails like "_data_data_data_data". Single
    // repeated characters (ellipses, rules) are legitimate content. Trailing
    // quotes and braces are stripped so the anchor lands on the fragment.
    let bytes = tail.as_bytes();
    let mut tail_end = bytes.len();
    while tail_end > 0 {
        let b = bytes[tail_end - 1];
        if b.is_ascii_alphanumeric() || b == b'_' {
            break;
        }
        tail_end -= 1;
    }
    let bytes = &bytes[..tail_end];
    let window = bytes.len().min(400);
    let probe = &bytes[bytes.len() - window..];
    for period in 4..=32usize {
        if probe.len() < period * FRAGMENT_RUN_LIMIT {
            continue;
        }
        let fragment = &probe[probe.len() - period..];
        let distinct = fragment.iter().collect::<std::collections::BTreeSet<_>>();
        let wordish = fragment
            .iter()
            .any(|b| b.is_ascii_alphanumeric() || *b == b'_');
        if distinct.len() < 2 || !wordish {
            continue;
        }
        let mut repeats = 1;
        let mut end = probe.len();
        while end >= 2 * period
            && probe[end - period..end] == probe[end - 2 * period..end - period]
        {
            repeats += 1;
            end -= period;
            if repeats >= FRAGMENT_RUN_LIMIT {
                return true;
            }
        }
    }
    false
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json", "JSON", ...) on the fence line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

struct EnvelopeScan {
    /// Byte offset one past the balanced region, or the text length when unbalanced.
    end: usize,
    balanced: bool,
    /// Unclosed openers, outermost first. Empty when balanced.
    open_stack: Vec<char>,
    /// Scanner ended inside a string literal.
    in_string: bool,
    /// Byte offset of the opening quote of the unterminated string, if any.
    string_start: usize,
}

/// Walk the text from its first opener tracking string and escape state.
/// Stops at the point where the opening brace finds its match, so trailing
/// garbage after a complete document is never part of the envelope.
fn scan_envelope(text: &str) -> EnvelopeScan {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut string_start = 0usize;

    for (idx, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => {
                in_string = true;
                string_start = idx;
            }
            '{' | '[' => stack.push(ch),
            '}' | ']' => {
                stack.pop();
                if stack.is_empty() {
                    return EnvelopeScan {
                        end: idx + ch.len_utf8(),
                        balanced: true,
                        open_stack: Vec::new(),
                        in_string: false,
                        string_start: 0,
                    };
                }
            }
            _ => {}
        }
    }
    EnvelopeScan {
        end: text.len(),
        balanced: stack.is_empty(),
        open_stack: stack,
        in_string,
        string_start,
    }
}

/// Append the reversed stack of missing closers and reparse. When that is not
/// enough (the text broke mid-token), trim back to the last structural
/// boundary and close again.
fn auto_close(text: &str, scan: &EnvelopeScan) -> Option<Value> {
    let mut base = text.to_string();
    if scan.in_string {
        // First try terminating the string in place; a string cut mid-way is
        // still useful content.
        let closed = format!("{}\"{}", base, closers(&scan.open_stack));
        if let Ok(value) = serde_json::from_str::<Value>(&closed) {
            return Some(value);
        }
        // Otherwise drop the unterminated string entirely.
        base.truncate(scan.string_start);
    }

    for _ in 0..3 {
        let trimmed = trim_dangling_tail(&base);
        let closed = format!("{}{}", trimmed, closers_for(&trimmed));
        if let Ok(value) = serde_json::from_str::<Value>(&closed) {
            return Some(value);
        }
        // Cut back to the previous comma outside strings and retry.
        match last_structural_comma(&trimmed) {
            Some(idx) => base = trimmed[..idx].to_string(),
            None => return None,
        }
    }
    None
}

fn closers(stack: &[char]) -> String {
    stack
        .iter()
        .rev()
        .map(|c| if *c == '{' { '}' } else { ']' })
        .collect()
}

fn closers_for(text: &str) -> String {
    let scan = scan_envelope(text);
    closers(&scan.open_stack)
}

/// Remove trailing artifacts that block a close: dangling commas, a key with
/// no value, or a partial bare literal such as `tru`.
fn trim_dangling_tail(text: &str) -> String {
    let mut out = text.trim_end().to_string();
    let tail_token: String = out
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+'))
        .collect();
    if !tail_token.is_empty() {
        let token: String = tail_token.chars().rev().collect();
        let valid_literal = matches!(token.as_str(), "true" | "false" | "null")
            || serde_json::from_str::<Value>(&token).is_ok();
        if !valid_literal {
            out.truncate(out.len() - token.len());
            out = out.trim_end().to_string();
        }
    }
    if out.ends_with(':') {
        out.push_str("null");
    }
    if out.ends_with(',') {
        out.pop();
    }
    out
}

fn last_structural_comma(text: &str) -> Option<usize> {
    let mut in_string = false;
    let mut escaped = false;
    let mut last = None;
    for (idx, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            ',' => last = Some(idx),
            _ => {}
        }
    }
    last
}

/// Replace raw newlines that occur inside string literals with the escaped
/// form. Models emit these when speaker notes leak literal line breaks.
fn escape_raw_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut in_string = false;
    let mut escaped = false;
    for ch in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(ch);
                continue;
            }
            match ch {
                '\\' => {
                    escaped = true;
                    out.push(ch);
                }
                '"' => {
                    in_string = false;
                    out.push(ch);
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                _ => out.push(ch),
            }
        } else {
            if ch == '"' {
                in_string = true;
            }
            out.push(ch);
        }
    }
    out
}

/// A parsed value that is itself a JSON-encoded string gets one more decode.
fn unwrap_double_encoded(value: Value) -> Value {
    if let Value::String(s) = &value {
        let inner = s.trim_start();
        if inner.starts_with(['{', '[']) {
            if let Ok(decoded) = serde_json::from_str::<Value>(s) {
                return decoded;
            }
        }
    }
    value
}
