//! Evaluation context.
//!
//! Every expression evaluates against a [`Context`]: the current node
//! (`this`), the data root (`$root`), the loop index (`$index`), `#let`
//! bindings, injected names and native functions, and the formatter used
//! whenever a value is embedded into string text. Contexts are immutable;
//! loops and `#let` derive child contexts instead of mutating shared state.

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::eval::EvalError;
use crate::value::{self, Object};

/// Renders a value as string text inside an interpolated string.
pub type Formatter = dyn Fn(&Value) -> String;

/// A host function callable from template expressions.
pub type NativeFn = Rc<dyn Fn(&[Value]) -> Result<Value, EvalError>>;

/// Names and functions injected from the host, shared across derived
/// contexts.
#[derive(Default, Clone)]
pub struct Injected {
    pub values: Object,
    pub functions: HashMap<String, NativeFn>,
}

#[derive(Clone)]
pub struct Context {
    this: Value,
    root: Value,
    index: Option<usize>,
    bindings: Object,
    injected: Rc<Injected>,
    formatter: Rc<Formatter>,
}

impl Context {
    /// Builds the root context: `this` and `$root` both point at `data`.
    pub fn new(data: Value) -> Self {
        Context {
            this: data.clone(),
            root: data,
            index: None,
            bindings: Object::new(),
            injected: Rc::new(Injected::default()),
            formatter: Rc::new(value::display),
        }
    }

    pub fn this(&self) -> &Value {
        &self.this
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn bindings(&self) -> &Object {
        &self.bindings
    }

    pub fn injected(&self) -> &Injected {
        &self.injected
    }

    /// Formats a value for embedding into string text.
    pub fn format(&self, v: &Value) -> String {
        (self.formatter)(v)
    }

    /// Derives a context for one loop element: `this` becomes the element,
    /// `$index` its position. Root and bindings carry over.
    pub fn for_element(&self, element: Value, index: usize) -> Self {
        let mut ctx = self.clone();
        ctx.this = element;
        ctx.index = Some(index);
        ctx
    }

    /// Derives a context with `this` rebound, keeping everything else.
    pub fn with_this(&self, this: Value) -> Self {
        let mut ctx = self.clone();
        ctx.this = this;
        ctx
    }

    /// Derives a context with additional bindings layered on top.
    pub fn with_bindings(&self, extra: Object) -> Self {
        let mut ctx = self.clone();
        for (k, v) in extra {
            ctx.bindings.insert(k, v);
        }
        ctx
    }

    pub fn with_injected(&self, injected: Rc<Injected>) -> Self {
        let mut ctx = self.clone();
        ctx.injected = injected;
        ctx
    }

    pub fn with_formatter(&self, formatter: Rc<Formatter>) -> Self {
        let mut ctx = self.clone();
        ctx.formatter = formatter;
        ctx
    }
}
