//! Conditional chains: sequences of `#if` / `#elseif` / `#else` mappings.

use serde_json::Value;

use crate::Error;
use crate::context::Context;
use crate::directive::{Directive, tokenize};
use crate::interp::{self, Outcome};
use crate::parser::ParseError;
use crate::transform;

/// The result of walking a validated chain.
pub(crate) enum ChainOutcome {
    /// A branch fired; carries the branch value untransformed.
    Branch(Value),
    /// Every condition was falsy and there is no `#else`.
    NoMatch,
    /// A condition came back unresolved; the whole chain must be kept
    /// unchanged for a later pass.
    Abort,
}

pub struct Conditional;

impl Conditional {
    /// Validates the chain shape: a non-empty sequence of single-key
    /// mappings, opening with `#if <expr>`, continuing with `#elseif`,
    /// and closing with `#else` or `#elseif`.
    pub fn is(node: &Value) -> bool {
        let Value::Array(items) = node else {
            return false;
        };
        if items.is_empty() {
            return false;
        }

        let mut directives: Vec<Directive> = Vec::with_capacity(items.len());
        for item in items {
            let Value::Object(map) = item else {
                return false;
            };
            if map.len() != 1 {
                return false;
            }
            let Some(key) = map.keys().next() else {
                return false;
            };
            let Ok(d) = tokenize(key) else {
                return false;
            };
            directives.push(d);
        }

        if !directives[0].is("#if") || directives[0].expression.is_empty() {
            return false;
        }
        let last = directives.len() - 1;
        if last > 0 {
            for d in &directives[1..last] {
                if !d.is("#elseif") {
                    return false;
                }
            }
            let closer = &directives[last];
            if !closer.is("#else") && !closer.is("#elseif") {
                return false;
            }
        }
        true
    }

    /// Walks a chain already validated by [`Conditional::is`]. Branch
    /// values come back raw; the caller decides how to transform them.
    pub(crate) fn run_chain(
        items: &[Value],
        ctx: &Context,
    ) -> Result<ChainOutcome, ParseError> {
        for item in items {
            let Value::Object(map) = item else { continue };
            let Some((key, value)) = map.iter().next() else {
                continue;
            };
            let Ok(d) = tokenize(key) else { continue };

            if d.is("#else") {
                return Ok(ChainOutcome::Branch(value.clone()));
            }
            match interp::eval_text(&d.expression, ctx)? {
                Outcome::Resolved(v) if crate::value::is_truthy(&v) => {
                    return Ok(ChainOutcome::Branch(value.clone()));
                }
                Outcome::Resolved(_) => {}
                Outcome::Unresolved => return Ok(ChainOutcome::Abort),
            }
        }
        Ok(ChainOutcome::NoMatch)
    }
}

/// Resolves a conditional chain against `data` and transforms the chosen
/// branch. An invalid or unresolved chain comes back unchanged; a chain
/// that exhausts without `#else` yields `null`.
pub fn run(chain: &Value, data: &Value) -> Result<Value, Error> {
    if !Conditional::is(chain) {
        return Ok(chain.clone());
    }
    let Value::Array(items) = chain else {
        return Ok(chain.clone());
    };
    let ctx = Context::new(data.clone());
    match Conditional::run_chain(items, &ctx)? {
        ChainOutcome::Branch(branch) => transform::transform_with_context(&branch, &ctx),
        ChainOutcome::NoMatch => Ok(Value::Null),
        ChainOutcome::Abort => Ok(chain.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validates_chain_shape() {
        assert!(Conditional::is(&json!([
            {"#if a > 1": "big"},
            {"#elseif a > 0": "small"},
            {"#else": "none"}
        ])));
        // first entry must be #if with an expression
        assert!(!Conditional::is(&json!([{"#if": "x"}])));
        // multi-key mappings disqualify the chain
        assert!(!Conditional::is(&json!([{"#if a": "x", "other": 1}])));
        // plain arrays are not chains
        assert!(!Conditional::is(&json!([1, 2, 3])));
        assert!(!Conditional::is(&json!([])));
    }

    #[test]
    fn else_always_fires() {
        let chain = json!([
            {"#if a > 10": "big"},
            {"#else": "fallback"}
        ]);
        assert_eq!(run(&chain, &json!({"a": 1})).unwrap(), json!("fallback"));
    }

    #[test]
    fn exhaustion_without_else_is_null() {
        let chain = json!([{"#if a > 10": "big"}, {"#elseif a > 5": "mid"}]);
        assert_eq!(run(&chain, &json!({"a": 1})).unwrap(), json!(null));
    }

    #[test]
    fn unresolved_condition_keeps_chain() {
        let chain = json!([
            {"#if missing.thing > 1": "a"},
            {"#else": "b"}
        ]);
        assert_eq!(run(&chain, &json!({"a": 1})).unwrap(), chain);
    }
}
