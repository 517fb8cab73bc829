use regex::Regex;
use serde_json::{Value, json};

use super::CliError;
use crate::value;

pub struct SelectOptions {
    /// JSON text to search
    pub input: String,
    /// Regex the entry key must match
    pub key_pattern: Option<String>,
    /// Regex the entry value (display form) must match
    pub value_pattern: Option<String>,
}

/// Runs a selection and reports keys, paths, and values as one JSON
/// object. Without a pattern the root's direct entries are reported.
pub fn execute_select(options: &SelectOptions) -> Result<Value, CliError> {
    let root: Value = serde_json::from_str(&options.input)?;

    let key_re = options
        .key_pattern
        .as_deref()
        .map(Regex::new)
        .transpose()?;
    let value_re = options
        .value_pattern
        .as_deref()
        .map(Regex::new)
        .transpose()?;

    let selection = if key_re.is_none() && value_re.is_none() {
        crate::select(&root)
    } else {
        crate::select_where(&root, move |k, v| {
            key_re.as_ref().is_none_or(|re| re.is_match(k))
                && value_re
                    .as_ref()
                    .is_none_or(|re| re.is_match(&value::display(v)))
        })
    };

    Ok(json!({
        "keys": selection.keys(),
        "paths": selection.paths(),
        "values": selection.values(),
    }))
}
