//! Expression evaluation.
//!
//! Evaluation is total over the AST: every runtime failure (undefined
//! reference, type mismatch, division by zero, out-of-scope method) comes
//! back as an [`EvalError`]. Callers in the transform layer map any
//! `EvalError` to "unresolved" and keep the template node unchanged, so
//! these errors never escape the library.
//!
//! Evaluation distinguishes a missing value from an explicit `null`:
//! property access on an existing container with an absent key yields
//! [`EvalValue::Undefined`], which is falsy in boolean position and
//! classifies as unresolved when it is the final result. A bare identifier
//! that resolves nowhere is an error instead.

use regex::Regex;
use serde_json::{Number, Value};
use thiserror::Error;

use crate::ast::{BinOp, Expr, Stmt, UnaryOp};
use crate::context::Context;
use crate::parser::Program;
use crate::value::{self, Object};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("undefined reference: {0}")]
    Undefined(String),
    #[error("type error: {0}")]
    Type(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("unknown method: {0}")]
    UnknownMethod(String),
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("{0} expects {1} argument(s)")]
    Arity(&'static str, usize),
    #[error("invalid pattern: {0}")]
    InvalidRegex(String),
}

/// The result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalValue {
    Json(Value),
    Undefined,
}

impl EvalValue {
    pub fn is_truthy(&self) -> bool {
        match self {
            EvalValue::Json(v) => value::is_truthy(v),
            EvalValue::Undefined => false,
        }
    }

    /// Unwraps to a concrete JSON value, treating undefined as an error.
    pub fn into_json(self) -> Result<Value, EvalError> {
        match self {
            EvalValue::Json(v) => Ok(v),
            EvalValue::Undefined => Err(EvalError::Undefined("undefined value".to_string())),
        }
    }
}

pub fn eval_program(program: &Program, ctx: &Context) -> Result<EvalValue, EvalError> {
    match program {
        Program::Expr(expr) => eval_expr(expr, ctx),
        Program::Block(stmts) => eval_block(stmts, ctx),
    }
}

pub fn eval_expr(expr: &Expr, ctx: &Context) -> Result<EvalValue, EvalError> {
    match expr {
        Expr::Int(n) => Ok(EvalValue::Json(Value::Number(Number::from(*n)))),
        Expr::Float(f) => Ok(EvalValue::Json(
            Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        )),
        Expr::Str(s) => Ok(EvalValue::Json(Value::String(s.clone()))),
        Expr::Bool(b) => Ok(EvalValue::Json(Value::Bool(*b))),
        Expr::Null => Ok(EvalValue::Json(Value::Null)),
        Expr::Ident(name) => resolve_ident(name, ctx),
        Expr::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(eval_expr(item, ctx)?.into_json()?);
            }
            Ok(EvalValue::Json(Value::Array(out)))
        }
        Expr::Object(pairs) => {
            let mut out = Object::new();
            for (key, value) in pairs {
                out.insert(key.clone(), eval_expr(value, ctx)?.into_json()?);
            }
            Ok(EvalValue::Json(Value::Object(out)))
        }
        Expr::Member { object, name } => {
            let obj = eval_expr(object, ctx)?;
            member(obj, name)
        }
        Expr::Index { object, index } => {
            let obj = eval_expr(object, ctx)?;
            let idx = eval_expr(index, ctx)?;
            index_access(obj, idx)
        }
        Expr::Call { name, args } => {
            let f = ctx
                .injected()
                .functions
                .get(name)
                .ok_or_else(|| EvalError::UnknownFunction(name.clone()))?
                .clone();
            let argv = eval_args(args, ctx)?;
            f(&argv).map(EvalValue::Json)
        }
        Expr::MethodCall {
            object,
            method,
            args,
        } => {
            // `ns.method(args)` may target an injected native function
            // before it is treated as a value method.
            if let Expr::Ident(ns) = object.as_ref() {
                let qualified = format!("{ns}.{method}");
                if let Some(f) = ctx.injected().functions.get(&qualified) {
                    let f = f.clone();
                    let argv = eval_args(args, ctx)?;
                    return f(&argv).map(EvalValue::Json);
                }
            }
            let obj = eval_expr(object, ctx)?.into_json()?;
            let argv = eval_args(args, ctx)?;
            call_method(obj, method, &argv, ctx)
        }
        Expr::Unary { op, operand } => {
            let v = eval_expr(operand, ctx)?;
            match op {
                UnaryOp::Not => Ok(EvalValue::Json(Value::Bool(!v.is_truthy()))),
                UnaryOp::Neg => match v.into_json()? {
                    Value::Number(n) => {
                        let d = value::as_decimal(&n)
                            .ok_or_else(|| EvalError::Type("non-finite number".to_string()))?;
                        Ok(EvalValue::Json(numeric(-d)?))
                    }
                    other => Err(EvalError::Type(format!(
                        "cannot negate {}",
                        value::type_name(&other)
                    ))),
                },
            }
        }
        Expr::Binary { op, left, right } => eval_binary(*op, left, right, ctx),
        Expr::Ternary {
            cond,
            then,
            otherwise,
        } => {
            if eval_expr(cond, ctx)?.is_truthy() {
                eval_expr(then, ctx)
            } else {
                eval_expr(otherwise, ctx)
            }
        }
    }
}

/// Evaluates a statement block in a local scope layered over the context
/// bindings. The block's value is the value of the first `return`.
pub fn eval_block(stmts: &[Stmt], ctx: &Context) -> Result<EvalValue, EvalError> {
    let mut scope = ctx.clone();
    for stmt in stmts {
        match stmt {
            Stmt::Var { name, value } => {
                let v = eval_expr(value, &scope)?.into_json()?;
                let mut binding = Object::new();
                binding.insert(name.clone(), v);
                scope = scope.with_bindings(binding);
            }
            Stmt::Assign { target, value } => {
                let v = eval_expr(value, &scope)?.into_json()?;
                scope = assign(scope, target, v)?;
            }
            Stmt::Return(expr) => return eval_expr(expr, &scope),
            Stmt::Expr(expr) => {
                eval_expr(expr, &scope)?;
            }
        }
    }
    Ok(EvalValue::Undefined)
}

fn eval_args(args: &[Expr], ctx: &Context) -> Result<Vec<Value>, EvalError> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        out.push(eval_expr(arg, ctx)?.into_json()?);
    }
    Ok(out)
}

fn resolve_ident(name: &str, ctx: &Context) -> Result<EvalValue, EvalError> {
    match name {
        "this" => return Ok(EvalValue::Json(ctx.this().clone())),
        "$root" => return Ok(EvalValue::Json(ctx.root().clone())),
        "$index" => {
            return ctx
                .index()
                .map(|i| EvalValue::Json(Value::Number(Number::from(i))))
                .ok_or_else(|| EvalError::Undefined("$index".to_string()));
        }
        _ => {}
    }
    if let Some(v) = ctx.bindings().get(name) {
        return Ok(EvalValue::Json(v.clone()));
    }
    if let Some(v) = ctx.injected().values.get(name) {
        return Ok(EvalValue::Json(v.clone()));
    }
    if let Value::Object(map) = ctx.this()
        && let Some(v) = map.get(name)
    {
        return Ok(EvalValue::Json(v.clone()));
    }
    Err(EvalError::Undefined(name.to_string()))
}

fn member(obj: EvalValue, name: &str) -> Result<EvalValue, EvalError> {
    match obj {
        EvalValue::Undefined => Err(EvalError::Type(format!(
            "cannot read '{name}' of undefined"
        ))),
        EvalValue::Json(Value::Null) => {
            Err(EvalError::Type(format!("cannot read '{name}' of null")))
        }
        EvalValue::Json(Value::Object(map)) => Ok(map
            .get(name)
            .cloned()
            .map(EvalValue::Json)
            .unwrap_or(EvalValue::Undefined)),
        EvalValue::Json(Value::Array(items)) => {
            if name == "length" {
                Ok(EvalValue::Json(Value::Number(Number::from(items.len()))))
            } else {
                Ok(EvalValue::Undefined)
            }
        }
        EvalValue::Json(Value::String(s)) => {
            if name == "length" {
                Ok(EvalValue::Json(Value::Number(Number::from(
                    s.chars().count(),
                ))))
            } else {
                Ok(EvalValue::Undefined)
            }
        }
        EvalValue::Json(_) => Ok(EvalValue::Undefined),
    }
}

fn index_access(obj: EvalValue, idx: EvalValue) -> Result<EvalValue, EvalError> {
    let idx = idx.into_json()?;
    match (obj, idx) {
        (EvalValue::Json(Value::Array(items)), Value::Number(n)) => {
            Ok(array_index(&items, &n))
        }
        (EvalValue::Json(Value::String(s)), Value::Number(n)) => {
            let chars: Vec<char> = s.chars().collect();
            Ok(match normalize_index(&n, chars.len()) {
                Some(i) => EvalValue::Json(Value::String(chars[i].to_string())),
                None => EvalValue::Undefined,
            })
        }
        (obj @ EvalValue::Json(Value::Object(_)), Value::String(key)) => member(obj, &key),
        (obj @ EvalValue::Json(Value::Object(_)), Value::Number(n)) => {
            member(obj, &value::display(&Value::Number(n)))
        }
        (EvalValue::Undefined, _) => {
            Err(EvalError::Type("cannot index into undefined".to_string()))
        }
        (EvalValue::Json(v), idx) => Err(EvalError::Type(format!(
            "cannot index {} with {}",
            value::type_name(&v),
            value::type_name(&idx)
        ))),
    }
}

fn array_index(items: &[Value], n: &Number) -> EvalValue {
    match normalize_index(n, items.len()) {
        Some(i) => EvalValue::Json(items[i].clone()),
        None => EvalValue::Undefined,
    }
}

/// Resolves a possibly-negative index against a length. Out of bounds is
/// `None`, which surfaces as undefined.
fn normalize_index(n: &Number, len: usize) -> Option<usize> {
    let i = n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.fract() == 0.0 && f.is_finite())
            .map(|f| f as i64)
    })?;
    let i = if i < 0 { i + len as i64 } else { i };
    (0..len as i64).contains(&i).then_some(i as usize)
}

fn eval_binary(op: BinOp, left: &Expr, right: &Expr, ctx: &Context) -> Result<EvalValue, EvalError> {
    // Logical operators short-circuit; an undefined operand is just falsy.
    match op {
        BinOp::And => {
            let l = eval_expr(left, ctx)?;
            if !l.is_truthy() {
                return Ok(EvalValue::Json(Value::Bool(false)));
            }
            let r = eval_expr(right, ctx)?;
            return Ok(EvalValue::Json(Value::Bool(r.is_truthy())));
        }
        BinOp::Or => {
            let l = eval_expr(left, ctx)?;
            if l.is_truthy() {
                return Ok(l);
            }
            return eval_expr(right, ctx);
        }
        _ => {}
    }

    let l = eval_expr(left, ctx)?;
    let r = eval_expr(right, ctx)?;

    match op {
        BinOp::Eq => Ok(EvalValue::Json(Value::Bool(values_eq(&l, &r)))),
        BinOp::NotEq => Ok(EvalValue::Json(Value::Bool(!values_eq(&l, &r)))),
        BinOp::Lt | BinOp::LtEq | BinOp::Gt | BinOp::GtEq => {
            let ord = compare(&l.into_json()?, &r.into_json()?)?;
            let ok = match op {
                BinOp::Lt => ord.is_lt(),
                BinOp::LtEq => ord.is_le(),
                BinOp::Gt => ord.is_gt(),
                _ => ord.is_ge(),
            };
            Ok(EvalValue::Json(Value::Bool(ok)))
        }
        BinOp::In => contains(&l.into_json()?, &r.into_json()?).map(|b| {
            EvalValue::Json(Value::Bool(b))
        }),
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
            arithmetic(op, l.into_json()?, r.into_json()?)
        }
        BinOp::And | BinOp::Or => unreachable!(),
    }
}

fn values_eq(a: &EvalValue, b: &EvalValue) -> bool {
    match (a, b) {
        (EvalValue::Json(x), EvalValue::Json(y)) => value::loose_eq(x, y),
        (EvalValue::Undefined, EvalValue::Undefined) => true,
        // undefined and null compare equal, as in loose script equality
        (EvalValue::Undefined, EvalValue::Json(Value::Null))
        | (EvalValue::Json(Value::Null), EvalValue::Undefined) => true,
        _ => false,
    }
}

fn compare(a: &Value, b: &Value) -> Result<std::cmp::Ordering, EvalError> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (fx, fy) = (x.as_f64(), y.as_f64());
            match (fx, fy) {
                (Some(fx), Some(fy)) => fx
                    .partial_cmp(&fy)
                    .ok_or_else(|| EvalError::Type("incomparable numbers".to_string())),
                _ => Err(EvalError::Type("incomparable numbers".to_string())),
            }
        }
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        _ => Err(EvalError::Type(format!(
            "cannot compare {} with {}",
            value::type_name(a),
            value::type_name(b)
        ))),
    }
}

/// `needle in haystack`: object key membership, array element membership,
/// or substring.
fn contains(needle: &Value, haystack: &Value) -> Result<bool, EvalError> {
    match haystack {
        Value::Object(map) => match needle {
            Value::String(k) => Ok(map.contains_key(k)),
            _ => Ok(false),
        },
        Value::Array(items) => Ok(items.iter().any(|v| value::loose_eq(v, needle))),
        Value::String(s) => match needle {
            Value::String(sub) => Ok(s.contains(sub.as_str())),
            _ => Ok(false),
        },
        _ => Err(EvalError::Type(format!(
            "'in' requires a container, got {}",
            value::type_name(haystack)
        ))),
    }
}

fn arithmetic(op: BinOp, l: Value, r: Value) -> Result<EvalValue, EvalError> {
    // String concatenation wins for '+' when either side is a string.
    if op == BinOp::Add
        && (matches!(l, Value::String(_)) || matches!(r, Value::String(_)))
    {
        return Ok(EvalValue::Json(Value::String(format!(
            "{}{}",
            value::display(&l),
            value::display(&r)
        ))));
    }

    let (Value::Number(x), Value::Number(y)) = (&l, &r) else {
        return Err(EvalError::Type(format!(
            "cannot apply arithmetic to {} and {}",
            value::type_name(&l),
            value::type_name(&r)
        )));
    };
    let a = value::as_decimal(x).ok_or_else(|| EvalError::Type("non-finite number".to_string()))?;
    let b = value::as_decimal(y).ok_or_else(|| EvalError::Type("non-finite number".to_string()))?;

    let result = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b.is_zero() {
                return Err(EvalError::DivisionByZero);
            }
            a / b
        }
        BinOp::Mod => {
            if b.is_zero() {
                return Err(EvalError::DivisionByZero);
            }
            a % b
        }
        _ => unreachable!(),
    };
    Ok(EvalValue::Json(numeric(result)?))
}

fn numeric(d: rust_decimal::Decimal) -> Result<Value, EvalError> {
    value::number_from_decimal(d)
        .map(Value::Number)
        .ok_or_else(|| EvalError::Type("numeric overflow".to_string()))
}

fn call_method(
    obj: Value,
    method: &str,
    args: &[Value],
    ctx: &Context,
) -> Result<EvalValue, EvalError> {
    let result = match (method, &obj) {
        ("toString", _) => Value::String(ctx.format(&obj)),
        ("type", _) => Value::String(value::type_name(&obj).to_string()),
        ("trim", Value::String(s)) => Value::String(s.trim().to_string()),
        ("split", Value::String(s)) => {
            let sep = string_arg("split", args)?;
            let parts: Vec<Value> = if sep.is_empty() {
                s.chars().map(|c| Value::String(c.to_string())).collect()
            } else {
                s.split(sep.as_str())
                    .map(|p| Value::String(p.to_string()))
                    .collect()
            };
            Value::Array(parts)
        }
        ("startswith", Value::String(s)) => {
            Value::Bool(s.starts_with(string_arg("startswith", args)?.as_str()))
        }
        ("endswith", Value::String(s)) => {
            Value::Bool(s.ends_with(string_arg("endswith", args)?.as_str()))
        }
        ("matches", Value::String(s)) => {
            let pattern = string_arg("matches", args)?;
            let re = Regex::new(&pattern).map_err(|e| EvalError::InvalidRegex(e.to_string()))?;
            Value::Bool(re.is_match(s))
        }
        ("contains", Value::String(s)) => {
            Value::Bool(s.contains(string_arg("contains", args)?.as_str()))
        }
        ("contains", Value::Array(items)) => {
            let needle = args.first().ok_or(EvalError::Arity("contains", 1))?;
            Value::Bool(items.iter().any(|v| value::loose_eq(v, needle)))
        }
        ("join", Value::Array(items)) => {
            let sep = string_arg("join", args)?;
            Value::String(
                items
                    .iter()
                    .map(value::display)
                    .collect::<Vec<_>>()
                    .join(&sep),
            )
        }
        ("reverse", Value::Array(items)) => {
            Value::Array(items.iter().rev().cloned().collect())
        }
        ("reverse", Value::String(s)) => Value::String(s.chars().rev().collect()),
        ("flatten", Value::Array(items)) => {
            let mut out = Vec::new();
            for item in items {
                match item {
                    Value::Array(inner) => out.extend(inner.iter().cloned()),
                    other => out.push(other.clone()),
                }
            }
            Value::Array(out)
        }
        ("min", Value::Array(items)) => fold_extreme(items, true)?,
        ("max", Value::Array(items)) => fold_extreme(items, false)?,
        ("keys", Value::Object(map)) => {
            Value::Array(map.keys().map(|k| Value::String(k.clone())).collect())
        }
        ("values", Value::Object(map)) => Value::Array(map.values().cloned().collect()),
        _ => {
            return Err(EvalError::UnknownMethod(format!(
                "{}.{method}",
                value::type_name(&obj)
            )));
        }
    };
    Ok(EvalValue::Json(result))
}

fn string_arg(method: &'static str, args: &[Value]) -> Result<String, EvalError> {
    match args.first() {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Ok(value::display(other)),
        None => Err(EvalError::Arity(method, 1)),
    }
}

fn fold_extreme(items: &[Value], min: bool) -> Result<Value, EvalError> {
    let mut best: Option<&Value> = None;
    for item in items {
        best = Some(match best {
            None => item,
            Some(b) => {
                let ord = compare(item, b)?;
                if (min && ord.is_lt()) || (!min && ord.is_gt()) {
                    item
                } else {
                    b
                }
            }
        });
    }
    best.cloned()
        .ok_or_else(|| EvalError::Type("empty sequence".to_string()))
}

/// Applies `target = value` inside a statement block, rewriting the named
/// binding through an optional access path.
fn assign(scope: Context, target: &Expr, new_value: Value) -> Result<Context, EvalError> {
    let (base, path) = flatten_target(target, &scope)?;
    let mut root = match scope.bindings().get(&base) {
        Some(v) => v.clone(),
        None if path.is_empty() => Value::Null,
        None => {
            return Err(EvalError::Undefined(base));
        }
    };
    set_path(&mut root, &path, new_value)?;
    let mut binding = Object::new();
    binding.insert(base, root);
    Ok(scope.with_bindings(binding))
}

enum PathSeg {
    Key(String),
    Index(usize),
}

fn flatten_target(target: &Expr, ctx: &Context) -> Result<(String, Vec<PathSeg>), EvalError> {
    match target {
        Expr::Ident(name) => Ok((name.clone(), vec![])),
        Expr::Member { object, name } => {
            let (base, mut path) = flatten_target(object, ctx)?;
            path.push(PathSeg::Key(name.clone()));
            Ok((base, path))
        }
        Expr::Index { object, index } => {
            let (base, mut path) = flatten_target(object, ctx)?;
            match eval_expr(index, ctx)?.into_json()? {
                Value::String(key) => path.push(PathSeg::Key(key)),
                Value::Number(n) => {
                    let i = n
                        .as_u64()
                        .ok_or_else(|| EvalError::Type("invalid index".to_string()))?;
                    path.push(PathSeg::Index(i as usize));
                }
                other => {
                    return Err(EvalError::Type(format!(
                        "invalid index of type {}",
                        value::type_name(&other)
                    )));
                }
            }
            Ok((base, path))
        }
        _ => Err(EvalError::Type("invalid assignment target".to_string())),
    }
}

fn set_path(node: &mut Value, path: &[PathSeg], new_value: Value) -> Result<(), EvalError> {
    let Some((head, rest)) = path.split_first() else {
        *node = new_value;
        return Ok(());
    };
    match head {
        PathSeg::Key(key) => {
            if !node.is_object() {
                *node = Value::Object(Object::new());
            }
            let map = node
                .as_object_mut()
                .ok_or_else(|| EvalError::Type("not an object".to_string()))?;
            let entry = map.entry(key.clone()).or_insert(Value::Null);
            set_path(entry, rest, new_value)
        }
        PathSeg::Index(i) => {
            let items = node
                .as_array_mut()
                .ok_or_else(|| EvalError::Type("not an array".to_string()))?;
            let slot = items
                .get_mut(*i)
                .ok_or_else(|| EvalError::Type("index out of bounds".to_string()))?;
            set_path(slot, rest, new_value)
        }
    }
}
