//! The transform engine: walks a template tree and resolves directives
//! and interpolation against a context.
//!
//! The engine never fails on missing data. Anything that cannot be
//! resolved yet keeps its smallest enclosing node unchanged, so the output
//! is itself a valid template and can be run through the engine again once
//! more data is in scope. Only expression syntax errors surface as `Err`.

use serde_json::Value;

use crate::Error;
use crate::conditional::{ChainOutcome, Conditional};
use crate::context::Context;
use crate::directive::tokenize;
use crate::interp::{self, Outcome};
use crate::value::{self, Object};

/// A transformed node. `NoBranch` marks a conditional chain that fell
/// through without `#else`: dropped from sequences, `null` elsewhere.
pub(crate) enum Resolved {
    Value(Value),
    NoBranch,
}

/// Transforms a template node against a prepared context.
pub(crate) fn transform_with_context(template: &Value, ctx: &Context) -> Result<Value, Error> {
    Ok(match transform_node(template, ctx)? {
        Resolved::Value(v) => v,
        Resolved::NoBranch => Value::Null,
    })
}

pub(crate) fn transform_node(node: &Value, ctx: &Context) -> Result<Resolved, Error> {
    match node {
        Value::String(s) => transform_string(s, ctx),
        Value::Array(_) => transform_sequence(node, ctx),
        Value::Object(map) => transform_mapping(node, map, ctx),
        other => Ok(Resolved::Value(other.clone())),
    }
}

fn unchanged(node: &Value) -> Result<Resolved, Error> {
    Ok(Resolved::Value(node.clone()))
}

fn transform_string(s: &str, ctx: &Context) -> Result<Resolved, Error> {
    // `"{{#include expr}}"` works as a string-level directive; the target
    // is attached verbatim, without transformation.
    if let Some(d) = interp::sole_directive(s) {
        if d.is("#include") && !d.expression.is_empty() {
            return Ok(Resolved::Value(
                include_target(&d.expression, None, ctx)?
                    .unwrap_or_else(|| Value::String(s.to_string())),
            ));
        }
        // other directive-shaped strings wait for a later pass
        return Ok(Resolved::Value(Value::String(s.to_string())));
    }
    match interp::interpolate(s, ctx)? {
        Outcome::Resolved(v) => Ok(Resolved::Value(v)),
        Outcome::Unresolved => Ok(Resolved::Value(Value::String(s.to_string()))),
    }
}

fn transform_sequence(node: &Value, ctx: &Context) -> Result<Resolved, Error> {
    let Value::Array(items) = node else {
        return unchanged(node);
    };

    if Conditional::is(node) {
        return match Conditional::run_chain(items, ctx)? {
            ChainOutcome::Branch(branch) => transform_node(&branch, ctx),
            ChainOutcome::NoMatch => Ok(Resolved::NoBranch),
            ChainOutcome::Abort => unchanged(node),
        };
    }

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match transform_node(item, ctx)? {
            Resolved::Value(v) => out.push(v),
            Resolved::NoBranch => {}
        }
    }
    Ok(Resolved::Value(Value::Array(out)))
}

fn transform_mapping(node: &Value, map: &Object, ctx: &Context) -> Result<Resolved, Error> {
    if map.len() == 1 {
        let Some((key, value)) = map.iter().next() else {
            return unchanged(node);
        };
        if let Ok(d) = tokenize(key) {
            match d.name.as_str() {
                "#each" => return each(node, key, &d.expression, value, ctx),
                "#if" => return standalone_if(node, &d.expression, value, ctx),
                "#include" => {
                    return Ok(match include_target(&d.expression, Some(value), ctx)? {
                        Some(target) => Resolved::Value(target),
                        None => Resolved::Value(node.clone()),
                    });
                }
                "#merge" => return merge(node, value, ctx),
                "#concat" => return concat(node, value, ctx),
                "#let" => return let_bindings(node, value, ctx),
                _ => {}
            }
        }
    } else if let Some(include_key) = find_include_key(map) {
        return include_with_siblings(node, map, &include_key, ctx);
    }

    plain_mapping(map, ctx)
}

/// `#each expr` over a sequence; per-element contexts carry `this` and
/// `$index`, with root and bindings inherited.
fn each(
    node: &Value,
    key: &str,
    expr: &str,
    body: &Value,
    ctx: &Context,
) -> Result<Resolved, Error> {
    // A body still carrying #include must resolve those first: the loop
    // is kept for the next pass while the body is transformed in place.
    if contains_include(body) {
        let resolved_body = transform_with_context(body, ctx)?;
        let mut out = Object::new();
        out.insert(key.to_string(), resolved_body);
        return Ok(Resolved::Value(Value::Object(out)));
    }

    if expr.is_empty() {
        return unchanged(node);
    }
    match interp::eval_text(expr, ctx)? {
        Outcome::Resolved(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let child = ctx.for_element(item.clone(), i);
                match transform_node(body, &child)? {
                    Resolved::Value(v) => out.push(v),
                    Resolved::NoBranch => {}
                }
            }
            Ok(Resolved::Value(Value::Array(out)))
        }
        // non-sequence or unresolved operand keeps the node for later
        _ => unchanged(node),
    }
}

/// A lone `{"#if expr": value}` mapping behaves as a one-element chain.
fn standalone_if(node: &Value, expr: &str, value: &Value, ctx: &Context) -> Result<Resolved, Error> {
    if expr.is_empty() {
        return unchanged(node);
    }
    match interp::eval_text(expr, ctx)? {
        Outcome::Resolved(v) if value::is_truthy(&v) => transform_node(value, ctx),
        Outcome::Resolved(_) => Ok(Resolved::NoBranch),
        Outcome::Unresolved => unchanged(node),
    }
}

/// Resolves an `#include` target. With an expression, evaluation runs with
/// `this` bound to the attached value; without one, the attached value is
/// the target. `None` means unresolved.
fn include_target(
    expr: &str,
    attached: Option<&Value>,
    ctx: &Context,
) -> Result<Option<Value>, Error> {
    if expr.is_empty() {
        return Ok(attached.cloned());
    }
    let ictx = match attached {
        Some(v) => ctx.with_this(v.clone()),
        None => ctx.clone(),
    };
    match interp::eval_text(expr, &ictx)? {
        Outcome::Resolved(v) => Ok(Some(v)),
        Outcome::Unresolved => Ok(None),
    }
}

fn find_include_key(map: &Object) -> Option<String> {
    map.keys()
        .find(|k| tokenize(k).is_ok_and(|d| d.is("#include")))
        .cloned()
}

/// `#include` alongside sibling keys: the target mapping is the base and
/// transformed siblings override it.
fn include_with_siblings(
    node: &Value,
    map: &Object,
    include_key: &str,
    ctx: &Context,
) -> Result<Resolved, Error> {
    let Some(attached) = map.get(include_key) else {
        return unchanged(node);
    };
    let expr = match tokenize(include_key) {
        Ok(d) => d.expression,
        Err(_) => return unchanged(node),
    };
    let Some(target) = include_target(&expr, Some(attached), ctx)? else {
        return unchanged(node);
    };
    let Value::Object(target_map) = target else {
        // a non-mapping target cannot merge; it replaces the node
        return Ok(Resolved::Value(target));
    };

    let mut out = target_map;
    for (k, v) in map {
        if k == include_key {
            continue;
        }
        if let Some((rk, rv)) = resolve_entry(k, v, ctx)? {
            out.insert(rk, rv);
        }
    }
    Ok(Resolved::Value(Value::Object(out)))
}

/// `#merge`: shallow-merges the transformed children left to right,
/// skipping non-mapping results.
fn merge(node: &Value, value: &Value, ctx: &Context) -> Result<Resolved, Error> {
    let Value::Array(items) = value else {
        return unchanged(node);
    };
    let mut merged = Object::new();
    for item in items {
        if let Resolved::Value(Value::Object(m)) = transform_node(item, ctx)? {
            value::shallow_merge(&mut merged, &m);
        }
    }
    Ok(Resolved::Value(Value::Object(merged)))
}

/// `#concat`: splices transformed sequence children into one sequence.
/// Resolution is atomic: if any child output still carries template
/// syntax, the whole node is kept for a later pass.
fn concat(node: &Value, value: &Value, ctx: &Context) -> Result<Resolved, Error> {
    let Value::Array(items) = value else {
        return unchanged(node);
    };
    let mut outputs = Vec::with_capacity(items.len());
    for item in items {
        match transform_node(item, ctx)? {
            Resolved::Value(v) => outputs.push(v),
            Resolved::NoBranch => {}
        }
    }
    if !outputs.iter().all(value::is_fully_resolved) {
        return unchanged(node);
    }
    let mut out = Vec::new();
    for v in outputs {
        match v {
            Value::Array(items) => out.extend(items),
            other => out.push(other),
        }
    }
    Ok(Resolved::Value(Value::Array(out)))
}

/// `#let`: `[{bindings}, body]`. Bindings evaluate against the current
/// context and persist through nested scopes; one unresolved binding keeps
/// the whole node unchanged.
fn let_bindings(node: &Value, value: &Value, ctx: &Context) -> Result<Resolved, Error> {
    let Value::Array(items) = value else {
        return unchanged(node);
    };
    let [Value::Object(pairs), body] = items.as_slice() else {
        return unchanged(node);
    };

    let mut bound = Object::new();
    for (name, v) in pairs {
        match v {
            Value::String(s) => match interp::interpolate(s, ctx)? {
                Outcome::Resolved(rv) => {
                    bound.insert(name.clone(), rv);
                }
                Outcome::Unresolved => return unchanged(node),
            },
            other => {
                let rv = transform_with_context(other, ctx)?;
                if !value::is_fully_resolved(&rv) {
                    return unchanged(node);
                }
                bound.insert(name.clone(), rv);
            }
        }
    }

    let child = ctx.with_bindings(bound);
    transform_node(body, &child)
}

fn plain_mapping(map: &Object, ctx: &Context) -> Result<Resolved, Error> {
    let mut out = Object::new();
    for (k, v) in map {
        if let Some((rk, rv)) = resolve_entry(k, v, ctx)? {
            out.insert(rk, rv);
        }
    }
    Ok(Resolved::Value(Value::Object(out)))
}

/// Resolves one mapping entry. An `"{{#? expr}}"` value gates the entry:
/// truthy keeps the key with the evaluated value, anything else omits it.
fn resolve_entry(
    key: &str,
    v: &Value,
    ctx: &Context,
) -> Result<Option<(String, Value)>, Error> {
    if let Value::String(s) = v
        && let Some(d) = interp::sole_directive(s)
        && d.is("#?")
    {
        if d.expression.is_empty() {
            return Ok(None);
        }
        return match interp::eval_text(&d.expression, ctx)? {
            Outcome::Resolved(rv) if value::is_truthy(&rv) => {
                Ok(Some((render_key(key, ctx)?, rv)))
            }
            _ => Ok(None),
        };
    }

    let rv = match transform_node(v, ctx)? {
        Resolved::Value(v) => v,
        Resolved::NoBranch => Value::Null,
    };
    Ok(Some((render_key(key, ctx)?, rv)))
}

/// Interpolates a mapping key. Directive-shaped and unresolved keys keep
/// their original text.
fn render_key(key: &str, ctx: &Context) -> Result<String, Error> {
    if !key.contains("{{") {
        return Ok(key.to_string());
    }
    if tokenize(key).is_ok() {
        return Ok(key.to_string());
    }
    match interp::interpolate(key, ctx)? {
        Outcome::Resolved(Value::String(s)) => Ok(s),
        Outcome::Resolved(v) => Ok(ctx.format(&v)),
        Outcome::Unresolved => Ok(key.to_string()),
    }
}

/// True when the subtree still carries an `#include` directive, which must
/// resolve before an enclosing `#each` may loop.
fn contains_include(v: &Value) -> bool {
    match v {
        Value::String(s) => interp::sole_directive(s).is_some_and(|d| d.is("#include")),
        Value::Array(items) => items.iter().any(contains_include),
        Value::Object(map) => map.iter().any(|(k, v)| {
            tokenize(k).is_ok_and(|d| d.is("#include")) || contains_include(v)
        }),
        _ => false,
    }
}
