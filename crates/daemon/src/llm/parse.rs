//! Ordered parser chains for free-form model replies. Each strategy is a pure
//! function; the first one that yields a value wins.

use once_cell::sync::Lazy;
use regex::Regex;

use engine::audio::Theme;

pub type Strategy<T> = fn(&str) -> Option<T>;

pub fn parse_with<T>(strategies: &[Strategy<T>], raw: &str) -> Option<T> {
    strategies.iter().find_map(|strategy| strategy(raw))
}

pub const KEYWORD_STRATEGIES: &[Strategy<Vec<String>>] = &[
    json_string_array,
    embedded_json_array,
    double_quoted_terms,
    single_quoted_terms,
];

pub const SCRIPT_STRATEGIES: &[Strategy<String>] = &[json_script_field, quoted_script_field, raw_script];

pub const THEME_STRATEGIES: &[Strategy<Theme>] = &[exact_theme, first_theme_word];

/// Theme named in a classifier reply; anything unrecognised is `Relaxing`.
pub fn parse_theme(raw: &str) -> Theme {
    parse_with(THEME_STRATEGIES, raw).unwrap_or_default()
}

fn normalize_terms(terms: Vec<String>) -> Option<Vec<String>> {
    let terms: Vec<String> = terms
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms)
    }
}

fn json_string_array(raw: &str) -> Option<Vec<String>> {
    let terms: Vec<String> = serde_json::from_str(raw.trim()).ok()?;
    normalize_terms(terms)
}

/// JSON array surrounded by prose or a code fence.
fn embedded_json_array(raw: &str) -> Option<Vec<String>> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    if end <= start {
        return None;
    }
    json_string_array(&raw[start..=end])
}

static DOUBLE_QUOTED_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"]*)""#).expect("double-quoted term pattern"));

/// A bracketed list of single-quoted items, e.g. `['a', 'b']`.
static SINGLE_QUOTED_LIST_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\s*'[^']*'(?:\s*,\s*'[^']*')*\s*,?\s*\]").expect("single-quoted list pattern")
});

static SINGLE_QUOTED_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'([^']*)'").expect("single-quoted term pattern"));

static SCRIPT_FIELD_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""script"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("script field pattern")
});

fn double_quoted_terms(raw: &str) -> Option<Vec<String>> {
    normalize_terms(
        DOUBLE_QUOTED_REGEX
            .captures_iter(raw)
            .map(|c| c[1].to_string())
            .collect(),
    )
}

/// Only inside a bracketed list; apostrophes in plain prose are not quotes.
fn single_quoted_terms(raw: &str) -> Option<Vec<String>> {
    let list = SINGLE_QUOTED_LIST_REGEX.find(raw)?.as_str();
    normalize_terms(
        SINGLE_QUOTED_REGEX
            .captures_iter(list)
            .map(|c| c[1].to_string())
            .collect(),
    )
}

fn non_empty(s: String) -> Option<String> {
    let s = s.trim().to_string();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn json_script_field(raw: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw.trim()).ok()?;
    value.get("script")?.as_str().map(str::to_string).and_then(non_empty)
}

fn quoted_script_field(raw: &str) -> Option<String> {
    let captured = SCRIPT_FIELD_REGEX.captures(raw)?.get(1)?.as_str();
    let unescaped: String = serde_json::from_str(&format!("\"{}\"", captured))
        .unwrap_or_else(|_| captured.to_string());
    non_empty(unescaped)
}

fn raw_script(raw: &str) -> Option<String> {
    non_empty(raw.to_string())
}

fn exact_theme(raw: &str) -> Option<Theme> {
    Theme::from_label(raw.trim().trim_matches(|c: char| !c.is_alphanumeric()))
}

fn first_theme_word(raw: &str) -> Option<Theme> {
    raw.split(|c: char| !c.is_alphabetic())
        .find_map(Theme::from_label)
}
