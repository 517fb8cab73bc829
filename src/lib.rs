//! seltra is a declarative JSON-to-JSON template engine. A template is
//! itself a JSON tree; mapping keys and string values may carry
//! directives (`#each`, `#if`/`#elseif`/`#else`, `#include`, `#merge`,
//! `#concat`, `#let`, `#?`) and `{{ ... }}` expressions, and applying the
//! template to a data tree produces a new tree.
//!
//! Resolution is selective: anything the data cannot answer yet stays in
//! the output unchanged, so the output is again a valid template. Running
//! the engine repeatedly converges on a fixed point, which is how partial
//! data sources (or [`select_where`] with targeted rewrites) compose.
//!
//! ```
//! use serde_json::json;
//!
//! let template = json!({
//!     "users": {
//!         "{{#each people}}": {"name": "{{this.name}}", "rank": "{{$index}}"}
//!     }
//! });
//! let data = json!({"people": [{"name": "ada"}, {"name": "grace"}]});
//! let out = seltra::transform(&template, &data).unwrap();
//! assert_eq!(out, json!({
//!     "users": [
//!         {"name": "ada", "rank": 0},
//!         {"name": "grace", "rank": 1}
//!     ]
//! }));
//! ```

use serde_json::Value;
use thiserror::Error as ThisError;

pub mod ast;
pub mod conditional;
pub mod context;
pub mod directive;
pub mod eval;
mod interp;
pub mod lexer;
pub mod parser;
pub mod select;
mod transform;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

pub use conditional::Conditional;
pub use context::{Context, Formatter, Injected, NativeFn};
pub use directive::{Directive, TokenizeError, tokenize};
pub use eval::{EvalError, EvalValue};
pub use lexer::LexError;
pub use parser::ParseError;
pub use select::{Match, Predicate, Segment, Selection, select, select_where};

/// Errors a transform can surface. Missing or mismatched data never
/// lands here; only template syntax errors and (in serialized mode)
/// malformed JSON do.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("template syntax error: {0}")]
    Syntax(#[from] ParseError),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Applies a template to a data tree.
pub fn transform(template: &Value, data: &Value) -> Result<Value, Error> {
    let ctx = Context::new(data.clone());
    transform::transform_with_context(template, &ctx)
}

/// Resolves a single template string against a data tree.
///
/// A string that is exactly one `{{ ... }}` token yields the value with
/// its native type; mixed strings stringify each token. An unresolved
/// string comes back unchanged.
pub fn fillout(data: &Value, template: &str) -> Result<Value, Error> {
    let ctx = Context::new(data.clone());
    match interp::interpolate(template, &ctx)? {
        interp::Outcome::Resolved(v) => Ok(v),
        interp::Outcome::Unresolved => Ok(Value::String(template.to_string())),
    }
}

/// Serialized-text convenience mode: parses both arguments as JSON,
/// transforms, and re-serializes.
pub fn transform_str(
    template_json: &str,
    data_json: &str,
    pretty: bool,
) -> Result<String, Error> {
    let template: Value = serde_json::from_str(template_json)?;
    let data: Value = serde_json::from_str(data_json)?;
    let out = transform(&template, &data)?;
    let text = if pretty {
        serde_json::to_string_pretty(&out)?
    } else {
        serde_json::to_string(&out)?
    };
    Ok(text)
}
