//! Parsed parameter values.
//!
//! A [`FilterToken`] is the typed form of one query-parameter value: an
//! operator plus its operand(s). Classification is purely syntactic, driven by
//! the value string and the statically known kind of the leaf field; no record
//! data is consulted.
//!
//! | Kind | Value forms |
//! |------|-------------|
//! | Text, DateTime | `v` exact, `v*` prefix, `*v` suffix, `*v*` contains, `pre*suf` wildcard |
//! | Integer, Float, Decimal | `N`, `>=N`, `<=N`, `>N`, `<N`, `min-max` |
//! | Boolean | `true`/`false`, `1`/`0`, `yes`/`no` |
//!
//! All text matching is case-insensitive.

use regex::{Regex, RegexBuilder};
use serde::{Serialize, Serializer};

use crate::error::Rejection;
use crate::op::Op;
use crate::schema::FieldKind;
use crate::value::{Number, Value};

/// Operand of an [`FilterToken::Exact`] token.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Operand {
    Text(String),
    Number(Number),
    Bool(bool),
}

/// A text pattern containing interior `*` wildcards.
///
/// Each `*` stands for any run of characters (including none). The pattern is
/// anchored at both ends, so `t*t` matches `test` and `t123t` but not `tes`.
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    source: String,
    regex: Regex,
}

impl WildcardPattern {
    /// Compiles a wildcard pattern.
    pub fn new(source: &str) -> Result<Self, Rejection> {
        let body = source
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = RegexBuilder::new(&format!("^{}$", body))
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()?;
        Ok(WildcardPattern {
            source: source.to_string(),
            regex,
        })
    }

    /// The pattern as written in the parameter value.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The equivalent anchored regular expression.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for WildcardPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Serialize for WildcardPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.regex.as_str())
    }
}

/// Parsed representation of one query-parameter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", content = "operand", rename_all = "snake_case")]
pub enum FilterToken {
    /// Equality; case-insensitive for text.
    Exact(Operand),
    /// Text starts with the operand.
    StartsWith(String),
    /// Text ends with the operand.
    EndsWith(String),
    /// Text contains the operand.
    Contains(String),
    /// Text matches an anchored wildcard pattern.
    MiddleWildcard(WildcardPattern),
    Gte(Number),
    Lte(Number),
    Gt(Number),
    Lt(Number),
    /// Inclusive range `min..=max`.
    Range(Number, Number),
}

impl FilterToken {
    /// Classifies `raw` for a leaf field of the given kind.
    ///
    /// Relation kinds never produce a token; the caller is expected to reject
    /// relation leaves before getting here.
    pub fn classify(kind: &FieldKind, raw: &str) -> Result<FilterToken, Rejection> {
        match kind {
            FieldKind::Text | FieldKind::DateTime => classify_text(raw),
            FieldKind::Integer | FieldKind::Float | FieldKind::Decimal => {
                classify_number(kind, raw)
            }
            FieldKind::Boolean => parse_bool(raw)
                .map(|b| FilterToken::Exact(Operand::Bool(b)))
                .ok_or_else(|| Rejection::malformed(raw, kind)),
            FieldKind::Relation(_) => Err(Rejection::malformed(raw, kind)),
        }
    }

    /// The operator of this token.
    pub fn op(&self) -> Op {
        match self {
            FilterToken::Exact(_) => Op::Exact,
            FilterToken::StartsWith(_) => Op::StartsWith,
            FilterToken::EndsWith(_) => Op::EndsWith,
            FilterToken::Contains(_) => Op::Contains,
            FilterToken::MiddleWildcard(_) => Op::MiddleWildcard,
            FilterToken::Gte(_) => Op::Gte,
            FilterToken::Lte(_) => Op::Lte,
            FilterToken::Gt(_) => Op::Gt,
            FilterToken::Lt(_) => Op::Lt,
            FilterToken::Range(_, _) => Op::Range,
        }
    }

    /// Returns `true` if this token matches text.
    pub fn is_textual(&self) -> bool {
        match self {
            FilterToken::Exact(operand) => matches!(operand, Operand::Text(_)),
            other => other.op().is_text_op(),
        }
    }

    /// Evaluates this token against a field value.
    ///
    /// Missing values and type mismatches never match.
    pub fn matches(&self, value: &Value<'_>) -> bool {
        match (self, value) {
            (FilterToken::Exact(Operand::Text(expected)), Value::String(s)) => {
                s.to_lowercase() == expected.to_lowercase()
            }
            (FilterToken::StartsWith(prefix), Value::String(s)) => {
                s.to_lowercase().starts_with(&prefix.to_lowercase())
            }
            (FilterToken::EndsWith(suffix), Value::String(s)) => {
                s.to_lowercase().ends_with(&suffix.to_lowercase())
            }
            (FilterToken::Contains(needle), Value::String(s)) => {
                s.to_lowercase().contains(&needle.to_lowercase())
            }
            (FilterToken::MiddleWildcard(pattern), Value::String(s)) => pattern.is_match(s),

            (FilterToken::Exact(Operand::Number(n)), Value::Number(v))
            | (FilterToken::Gte(n), Value::Number(v))
            | (FilterToken::Lte(n), Value::Number(v))
            | (FilterToken::Gt(n), Value::Number(v))
            | (FilterToken::Lt(n), Value::Number(v)) => match v.compare(*n) {
                Some(ordering) => self.op().eval_ordering(ordering),
                None => false, // NaN comparison
            },
            (FilterToken::Range(lo, hi), Value::Number(v)) => {
                matches!(v.partial_cmp(lo), Some(o) if o.is_ge())
                    && matches!(v.partial_cmp(hi), Some(o) if o.is_le())
            }

            (FilterToken::Exact(Operand::Bool(expected)), Value::Bool(b)) => b == expected,

            // Missing value or type mismatch
            _ => false,
        }
    }
}

fn classify_text(raw: &str) -> Result<FilterToken, Rejection> {
    if !raw.contains('*') {
        return Ok(FilterToken::Exact(Operand::Text(raw.to_string())));
    }

    let core = raw.trim_start_matches('*').trim_end_matches('*');
    if core.contains('*') {
        return WildcardPattern::new(raw).map(FilterToken::MiddleWildcard);
    }

    let core = core.to_string();
    let token = match (raw.starts_with('*'), raw.ends_with('*')) {
        (true, true) => FilterToken::Contains(core),
        (true, false) => FilterToken::EndsWith(core),
        (false, true) => FilterToken::StartsWith(core),
        (false, false) => FilterToken::Exact(Operand::Text(core)),
    };
    Ok(token)
}

fn classify_number(kind: &FieldKind, raw: &str) -> Result<FilterToken, Rejection> {
    let text = raw.trim();
    let malformed = || Rejection::malformed(raw, kind);

    if let Some((op, rest)) = Op::split_prefix(text) {
        let n = Number::parse_for(kind, rest).ok_or_else(malformed)?;
        let token = match op {
            Op::Gte => FilterToken::Gte(n),
            Op::Lte => FilterToken::Lte(n),
            Op::Gt => FilterToken::Gt(n),
            _ => FilterToken::Lt(n),
        };
        return Ok(token);
    }

    if let Some((lo, hi)) = split_range(kind, text) {
        return Ok(FilterToken::Range(lo, hi));
    }

    Number::parse_for(kind, text)
        .map(|n| FilterToken::Exact(Operand::Number(n)))
        .ok_or_else(malformed)
}

/// Finds a `min-max` split where both sides parse. A hyphen in first position
/// is a sign, not a separator, so `-5--1` reads as `-5` to `-1`.
fn split_range(kind: &FieldKind, text: &str) -> Option<(Number, Number)> {
    text.char_indices()
        .filter(|&(i, c)| c == '-' && i > 0)
        .find_map(|(i, _)| {
            let lo = Number::parse_for(kind, &text[..i])?;
            let hi = Number::parse_for(kind, &text[i + 1..])?;
            Some((lo, hi))
        })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
