//! Parsing of label selectors in the Kubernetes string syntax into
//! [`kube::core::Selector`].

use std::collections::BTreeSet;

use kube::core::{Expression, Selector};

use crate::error::{Error, Result};

/// Parses `k=v`, `k==v`, `k!=v`, `k`, `!k`, `k in (a,b)` and `k notin (a,b)`
/// terms joined by commas. The empty string selects everything.
pub fn parse_selector(selector: &str) -> Result<Selector> {
    let invalid = |reason: &str| Error::InvalidSelector {
        selector: selector.to_string(),
        reason: reason.to_string(),
    };

    split_terms(selector)
        .map_err(invalid)?
        .into_iter()
        .map(|term| parse_expression(term).map_err(invalid))
        .collect()
}

// Splits on commas outside of `( ... )` value sets.
fn split_terms(selector: &str) -> Result<Vec<&str>, &'static str> {
    let mut terms = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in selector.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1).ok_or("unbalanced parentheses")?,
            ',' if depth == 0 => {
                terms.push(&selector[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err("unbalanced parentheses");
    }
    terms.push(&selector[start..]);

    let terms: Vec<&str> = terms.into_iter().map(str::trim).collect();
    if terms.len() == 1 && terms[0].is_empty() {
        return Ok(Vec::new());
    }
    if terms.iter().any(|t| t.is_empty()) {
        return Err("empty requirement");
    }
    Ok(terms)
}

fn parse_expression(term: &str) -> Result<Expression, &'static str> {
    if let Some((key, rest)) = term.split_once(char::is_whitespace) {
        let rest = rest.trim_start();
        if let Some(values) = rest.strip_prefix("notin") {
            return Ok(Expression::NotIn(parse_key(key)?, parse_set(values)?));
        }
        if let Some(values) = rest.strip_prefix("in") {
            return Ok(Expression::In(parse_key(key)?, parse_set(values)?));
        }
    }
    if let Some((key, value)) = term.split_once("!=") {
        return Ok(Expression::NotEqual(parse_key(key)?, parse_value(value)?));
    }
    if let Some((key, value)) = term.split_once("==").or_else(|| term.split_once('=')) {
        return Ok(Expression::Equal(parse_key(key)?, parse_value(value)?));
    }
    match term.strip_prefix('!') {
        Some(key) => Ok(Expression::DoesNotExist(parse_key(key)?)),
        None => Ok(Expression::Exists(parse_key(term)?)),
    }
}

fn parse_key(key: &str) -> Result<String, &'static str> {
    let key = key.trim();
    if key.is_empty() {
        return Err("empty key");
    }
    if key.contains(|c: char| c.is_whitespace() || "()!=,".contains(c)) {
        return Err("invalid character in key");
    }
    Ok(key.to_string())
}

fn parse_value(value: &str) -> Result<String, &'static str> {
    let value = value.trim();
    if value.contains(|c: char| c.is_whitespace() || "()!=,".contains(c)) {
        return Err("invalid character in value");
    }
    Ok(value.to_string())
}

fn parse_set(values: &str) -> Result<BTreeSet<String>, &'static str> {
    let inner = values
        .trim()
        .strip_prefix('(')
        .and_then(|v| v.strip_suffix(')'))
        .ok_or("expected a parenthesised value set")?;
    let set = inner
        .split(',')
        .map(parse_value)
        .collect::<Result<BTreeSet<_>, _>>()?;
    if set.iter().any(String::is_empty) {
        return Err("empty value in set");
    }
    Ok(set)
}
