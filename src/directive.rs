//! Directive key recognition.
//!
//! A mapping key (or a whole template string) carries a directive when it
//! starts with a `#word` token, optionally wrapped in `{{ }}`:
//! `"#each items"`, `"{{#if count > 0}}"`, `"{{#include}}"`. Tokenizing
//! splits the key into the directive name and the trailing expression text.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#([a-z]+|\?)").expect("directive name pattern"));

/// A tokenized directive key: `#name expression`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// The directive name including the leading `#`, e.g. `"#each"`.
    pub name: String,
    /// The expression text after the name, trimmed. May be empty.
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("not a directive key: {0:?}")]
    NotADirective(String),
}

/// Splits a directive key into its name and expression.
///
/// Strips an optional `{{ }}` wrapper and surrounding whitespace first.
/// Fails only when the key does not begin with a `#` token.
pub fn tokenize(key: &str) -> Result<Directive, TokenizeError> {
    let inner = strip_wrapper(key).trim();
    let m = NAME_RE
        .find(inner)
        .ok_or_else(|| TokenizeError::NotADirective(key.to_string()))?;
    let name = m.as_str().to_string();
    let expression = inner[m.end()..].trim().to_string();
    Ok(Directive { name, expression })
}

fn strip_wrapper(key: &str) -> &str {
    let t = key.trim();
    if let Some(rest) = t.strip_prefix("{{")
        && let Some(inner) = rest.strip_suffix("}}")
    {
        return inner;
    }
    t
}

impl Directive {
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }
}
