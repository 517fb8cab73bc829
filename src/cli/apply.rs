use serde_json::Value;

use super::CliError;
use crate::value;

/// Passes are bounded so a template that never converges cannot spin.
const MAX_PASSES: usize = 10;

pub struct ApplyOptions {
    /// Template JSON text
    pub template: String,
    /// Data JSON text (null data when absent)
    pub data: Option<String>,
    /// Pretty-print the output
    pub pretty: bool,
    /// Re-apply until the output stops changing
    pub fixpoint: bool,
}

pub fn execute_apply(options: &ApplyOptions) -> Result<String, CliError> {
    let template: Value = serde_json::from_str(&options.template)?;
    let data: Value = match &options.data {
        Some(text) => serde_json::from_str(text)?,
        None => Value::Null,
    };

    let mut out = crate::transform(&template, &data)?;
    if options.fixpoint {
        for _ in 1..MAX_PASSES {
            if value::is_fully_resolved(&out) {
                break;
            }
            let next = crate::transform(&out, &data)?;
            if next == out {
                break;
            }
            out = next;
        }
    }

    let text = if options.pretty {
        serde_json::to_string_pretty(&out)
    } else {
        serde_json::to_string(&out)
    }?;
    Ok(text)
}
