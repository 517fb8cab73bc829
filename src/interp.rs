//! String interpolation: `{{ ... }}` token scanning and resolution.

use serde_json::Value;

use crate::context::Context;
use crate::directive::{self, Directive};
use crate::eval::{EvalValue, eval_program};
use crate::parser::{ParseError, parse_program};

/// The outcome of resolving a template string against a context.
///
/// Unresolved is not an error: the caller keeps the original text so a
/// later pass (with more data in scope) can finish the job.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Resolved(Value),
    Unresolved,
}

/// One piece of a scanned template string.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Piece {
    Literal(String),
    /// The expression text between `{{` and `}}`.
    Token(String),
}

/// Splits a string into literal runs and `{{ ... }}` tokens.
///
/// Brace matching is balanced, so object literals inside a token
/// (`{{ {a: 1} }}`) scan as one token. An unclosed `{{` is literal text.
pub(crate) fn scan(text: &str) -> Vec<Piece> {
    let chars: Vec<char> = text.chars().collect();
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '{' && chars.get(i + 1) == Some(&'{') {
            let mut depth = 2i32;
            let mut k = i + 2;
            let mut close = None;
            while k < chars.len() {
                match chars[k] {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            close = Some(k);
                            break;
                        }
                    }
                    _ => {}
                }
                k += 1;
            }
            if let Some(close) = close {
                if !literal.is_empty() {
                    pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                }
                let inner: String = chars[i + 2..close - 1].iter().collect();
                pieces.push(Piece::Token(inner));
                i = close + 1;
                continue;
            }
        }
        literal.push(chars[i]);
        i += 1;
    }

    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    pieces
}

/// Returns the directive carried by a string whose entire content is a
/// single `{{#name ...}}` token, e.g. `"{{#include $root.mixin}}"`.
pub(crate) fn sole_directive(text: &str) -> Option<Directive> {
    let pieces = scan(text);
    match pieces.as_slice() {
        [Piece::Token(inner)] if inner.trim_start().starts_with('#') => {
            directive::tokenize(inner.trim()).ok()
        }
        _ => None,
    }
}

/// Evaluates expression text to an [`Outcome`].
///
/// Runtime evaluation failures and undefined results are Unresolved;
/// syntax errors propagate.
pub(crate) fn eval_text(text: &str, ctx: &Context) -> Result<Outcome, ParseError> {
    let program = parse_program(text)?;
    match eval_program(&program, ctx) {
        Ok(EvalValue::Json(v)) => Ok(Outcome::Resolved(v)),
        Ok(EvalValue::Undefined) | Err(_) => Ok(Outcome::Unresolved),
    }
}

/// Resolves a template string.
///
/// A string that is exactly one token yields the evaluated value with its
/// native type. A mixed string stringifies each token through the context
/// formatter, with `null` and `false` rendering empty. Any unresolved
/// token keeps the whole original string; directive-shaped tokens are
/// never treated as interpolation.
pub(crate) fn interpolate(text: &str, ctx: &Context) -> Result<Outcome, ParseError> {
    let pieces = scan(text);
    if !pieces.iter().any(|p| matches!(p, Piece::Token(_))) {
        return Ok(Outcome::Resolved(Value::String(text.to_string())));
    }

    if let [Piece::Token(inner)] = pieces.as_slice() {
        if inner.trim_start().starts_with('#') {
            return Ok(Outcome::Unresolved);
        }
        return eval_text(inner, ctx);
    }

    let mut out = String::new();
    for piece in &pieces {
        match piece {
            Piece::Literal(s) => out.push_str(s),
            Piece::Token(inner) => {
                if inner.trim_start().starts_with('#') {
                    return Ok(Outcome::Unresolved);
                }
                match eval_text(inner, ctx)? {
                    Outcome::Resolved(v) => out.push_str(&segment_text(&v, ctx)),
                    Outcome::Unresolved => return Ok(Outcome::Unresolved),
                }
            }
        }
    }
    Ok(Outcome::Resolved(Value::String(out)))
}

fn segment_text(v: &Value, ctx: &Context) -> String {
    match v {
        Value::Null | Value::Bool(false) => String::new(),
        other => ctx.format(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scan_splits_literals_and_tokens() {
        let pieces = scan("a {{b}} c");
        assert_eq!(
            pieces,
            vec![
                Piece::Literal("a ".to_string()),
                Piece::Token("b".to_string()),
                Piece::Literal(" c".to_string()),
            ]
        );
    }

    #[test]
    fn scan_balances_inner_braces() {
        let pieces = scan("{{ {a: 1} }}");
        assert_eq!(pieces, vec![Piece::Token(" {a: 1} ".to_string())]);
    }

    #[test]
    fn sole_token_keeps_native_type() {
        let ctx = Context::new(json!({"items": [1, 2]}));
        assert_eq!(
            interpolate("{{items}}", &ctx).unwrap(),
            Outcome::Resolved(json!([1, 2]))
        );
        assert_eq!(
            interpolate("n={{items}}", &ctx).unwrap(),
            Outcome::Resolved(json!("n=1,2"))
        );
    }

    #[test]
    fn unresolved_token_keeps_whole_string() {
        let ctx = Context::new(json!({"a": 1}));
        assert_eq!(
            interpolate("x {{missing.ref}} y", &ctx).unwrap(),
            Outcome::Unresolved
        );
    }

    #[test]
    fn null_and_false_render_empty_in_mixed_strings() {
        let ctx = Context::new(json!({"a": null, "b": false, "c": true}));
        assert_eq!(
            interpolate("[{{a}}|{{b}}|{{c}}]", &ctx).unwrap(),
            Outcome::Resolved(json!("[||true]"))
        );
    }

    #[test]
    fn syntax_error_propagates() {
        let ctx = Context::new(json!({}));
        assert!(interpolate("NSRect: {{0, 0}, {375, 284}}", &ctx).is_err());
    }
}
