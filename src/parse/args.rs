//! Argument coercion — raw tokens to numbers, booleans and unescaped strings.
//!
//! Every hydrator goes through these functions, so escape handling lives in
//! exactly one place.

use std::sync::LazyLock;

use regex::Regex;

use super::error::ValueError;
use crate::document::Arg;

static ESCAPED_DOLLAR_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\(\$\d+)").expect("dollar pattern is valid"));

/// A value as found while gathering arguments: a token, or a number that
/// was already computed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawArg<'a> {
    Number(f64),
    Text(&'a str),
}

impl<'a> From<&'a str> for RawArg<'a> {
    fn from(s: &'a str) -> Self {
        RawArg::Text(s)
    }
}

impl<'a> From<&'a String> for RawArg<'a> {
    fn from(s: &'a String) -> Self {
        RawArg::Text(s)
    }
}

impl From<f64> for RawArg<'_> {
    fn from(n: f64) -> Self {
        RawArg::Number(n)
    }
}

impl std::fmt::Display for RawArg<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawArg::Number(n) => write!(f, "{n}"),
            RawArg::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Parse a number. Strings must be a complete numeric literal.
pub fn parse_number<'a>(raw: impl Into<RawArg<'a>>) -> Result<f64, ValueError> {
    let raw = raw.into();
    let parsed = match raw {
        RawArg::Number(n) => Some(n),
        RawArg::Text(s) if is_numeric_literal(s) => s.parse::<f64>().ok(),
        RawArg::Text(_) => None,
    };
    parsed
        .filter(|n| n.is_finite())
        .ok_or_else(|| ValueError::Number(raw.to_string()))
}

/// Parse a `0` or `1` flag.
pub fn parse_bool<'a>(raw: impl Into<RawArg<'a>>) -> Result<bool, ValueError> {
    let n = parse_number(raw)?;
    if n == 0.0 {
        Ok(false)
    } else if n == 1.0 {
        Ok(true)
    } else {
        Err(ValueError::Bool(n))
    }
}

/// Unescape a string token: `\,` and `\;` first, then `\$n`.
pub fn parse_string<'a>(raw: impl Into<RawArg<'a>>) -> Result<String, ValueError> {
    let s = match raw.into() {
        RawArg::Text(s) => s,
        RawArg::Number(n) => return Err(ValueError::String(n.to_string())),
    };

    let arg = s.replace("\\,", ",").replace("\\;", ";");

    // Matched text is copied literally so an inserted `$` is never rescanned.
    let mut unescaped = String::with_capacity(arg.len());
    let mut last = 0;
    for caps in ESCAPED_DOLLAR_VAR.captures_iter(&arg) {
        let (Some(whole), Some(var)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        unescaped.push_str(&arg[last..whole.start()]);
        unescaped.push_str(var.as_str());
        last = whole.end();
    }
    unescaped.push_str(&arg[last..]);
    Ok(unescaped)
}

/// Parse a generic argument: a number if possible, else a string.
pub fn parse_arg<'a>(raw: impl Into<RawArg<'a>>) -> Result<Arg, ValueError> {
    let raw = raw.into();
    parse_number(raw)
        .map(Arg::Number)
        .or_else(|_| parse_string(raw).map(Arg::Text))
        .map_err(|_| ValueError::Arg(raw.to_string()))
}

/// Accepts only literals like `12`, `-0.5`, `.5`, `3.`, `-4e-2`; rejects
/// `inf`, `nan` and anything with trailing garbage.
fn is_numeric_literal(s: &str) -> bool {
    let body = s.strip_prefix(['-', '+']).unwrap_or(s);
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(i) => (&body[..i], Some(&body[i + 1..])),
        None => (body, None),
    };

    let mut digits = 0;
    let mut dots = 0;
    for c in mantissa.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return false,
        }
    }
    if digits == 0 || dots > 1 {
        return false;
    }

    match exponent {
        None => true,
        Some(exp) => {
            let exp = exp.strip_prefix(['-', '+']).unwrap_or(exp);
            !exp.is_empty() && exp.chars().all(|c| c.is_ascii_digit())
        }
    }
}
