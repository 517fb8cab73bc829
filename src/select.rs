//! The select/query engine: find matching entries anywhere in a JSON
//! tree, inspect them, and selectively transform the tree at those spots.
//!
//! Selection walks mappings depth-first in key order, recursing through
//! sequences. A matched entry's value is not descended into, so matches
//! are outermost-first and never overlap.

use std::rc::Rc;

use serde_json::{Number, Value};

use crate::Error;
use crate::context::{Context, Injected};
use crate::eval::EvalError;
use crate::transform;
use crate::value::Object;

/// Tests one mapping entry: key text and attached value.
pub type Predicate = dyn Fn(&str, &Value) -> bool;

/// One step of a path from the root: a mapping key or a sequence index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// One matched entry.
#[derive(Debug, Clone)]
pub struct Match {
    /// The matched entry's key within its container.
    pub key: Segment,
    /// The matched entry's value.
    pub value: Value,
    /// The mapping that holds the entry.
    pub container: Value,
    /// Path from the root to the container. Empty at the root, rendered
    /// as `""`; segments render as `["key"]` and `[0]`.
    pub path: Vec<Segment>,
}

#[derive(Clone)]
pub struct Selection {
    root: Value,
    matches: Vec<Match>,
    predicate: Option<Rc<Predicate>>,
    injected: Rc<Injected>,
    outputs: Option<Vec<Value>>,
}

/// Selects the root's direct entries.
pub fn select(root: &Value) -> Selection {
    Selection {
        root: root.clone(),
        matches: direct_matches(root),
        predicate: None,
        injected: Rc::new(Injected::default()),
        outputs: None,
    }
}

/// Selects every mapping entry matching the predicate, anywhere in the
/// tree.
pub fn select_where(
    root: &Value,
    predicate: impl Fn(&str, &Value) -> bool + 'static,
) -> Selection {
    let predicate: Rc<Predicate> = Rc::new(predicate);
    let mut matches = Vec::new();
    walk(root, &mut Vec::new(), predicate.as_ref(), &mut matches);
    Selection {
        root: root.clone(),
        matches,
        predicate: Some(predicate),
        injected: Rc::new(Injected::default()),
        outputs: None,
    }
}

fn direct_matches(root: &Value) -> Vec<Match> {
    match root {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| Match {
                key: Segment::Key(k.clone()),
                value: v.clone(),
                container: root.clone(),
                path: Vec::new(),
            })
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| Match {
                key: Segment::Index(i),
                value: v.clone(),
                container: root.clone(),
                path: Vec::new(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn walk(node: &Value, path: &mut Vec<Segment>, predicate: &Predicate, out: &mut Vec<Match>) {
    match node {
        Value::Object(map) => {
            for (k, v) in map {
                if predicate(k, v) {
                    out.push(Match {
                        key: Segment::Key(k.clone()),
                        value: v.clone(),
                        container: node.clone(),
                        path: path.clone(),
                    });
                } else {
                    path.push(Segment::Key(k.clone()));
                    walk(v, path, predicate, out);
                    path.pop();
                }
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                path.push(Segment::Index(i));
                walk(v, path, predicate, out);
                path.pop();
            }
        }
        _ => {}
    }
}

impl Selection {
    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    /// Matched keys, in discovery order. Sequence positions come back as
    /// numbers.
    pub fn keys(&self) -> Vec<Value> {
        self.matches
            .iter()
            .map(|m| match &m.key {
                Segment::Key(k) => Value::String(k.clone()),
                Segment::Index(i) => Value::Number(Number::from(*i)),
            })
            .collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.matches.iter().map(|m| m.value.clone()).collect()
    }

    /// Rendered container paths, one per match. The root renders as `""`.
    pub fn paths(&self) -> Vec<String> {
        self.matches.iter().map(|m| render_path(&m.path)).collect()
    }

    /// Containers, one per match in discovery order, without
    /// deduplication. After [`Selection::transform_with`], the per-match
    /// outputs instead.
    pub fn objects(&self) -> Vec<Value> {
        match &self.outputs {
            Some(outputs) => outputs.clone(),
            None => self.matches.iter().map(|m| m.container.clone()).collect(),
        }
    }

    /// Runs the transform engine over each match's container against
    /// `data`, rewrites the tree at that path, and re-selects against the
    /// rewritten tree.
    pub fn transform(&self, data: &Value) -> Result<Selection, Error> {
        let mut new_root = self.root.clone();
        let ctx = Context::new(data.clone()).with_injected(self.injected.clone());
        for m in &self.matches {
            let Some(container) = node_at_path(&new_root, &m.path).cloned() else {
                continue;
            };
            let out = transform::transform_with_context(&container, &ctx)?;
            write_at_path(&mut new_root, &m.path, out);
        }
        Ok(self.reselect(new_root))
    }

    /// Transforms `fragment` once per match, with the matched value as the
    /// data root. Outputs replace the matched values in the tree and are
    /// projected by [`Selection::objects`]; keys, values, and paths keep
    /// describing the original matches.
    pub fn transform_with(&self, fragment: &Value) -> Result<Selection, Error> {
        let mut new_root = self.root.clone();
        let mut outputs = Vec::with_capacity(self.matches.len());
        for m in &self.matches {
            let ctx = Context::new(m.value.clone()).with_injected(self.injected.clone());
            let out = transform::transform_with_context(fragment, &ctx)?;
            let mut slot = m.path.clone();
            slot.push(m.key.clone());
            write_at_path(&mut new_root, &slot, out.clone());
            outputs.push(out);
        }
        Ok(Selection {
            root: new_root,
            matches: self.matches.clone(),
            predicate: self.predicate.clone(),
            injected: self.injected.clone(),
            outputs: Some(outputs),
        })
    }

    /// Returns a selection whose transforms see the given names as
    /// identifiers. Nothing shared is mutated.
    pub fn inject(&self, values: Object) -> Selection {
        let mut injected = (*self.injected).clone();
        for (k, v) in values {
            injected.values.insert(k, v);
        }
        let mut next = self.clone();
        next.injected = Rc::new(injected);
        next
    }

    /// Returns a selection whose transforms can call the given native
    /// function as `name(args)` or, with a dotted name, `ns.method(args)`.
    pub fn inject_fn(
        &self,
        name: &str,
        f: impl Fn(&[Value]) -> Result<Value, EvalError> + 'static,
    ) -> Selection {
        let mut injected = (*self.injected).clone();
        injected.functions.insert(name.to_string(), Rc::new(f));
        let mut next = self.clone();
        next.injected = Rc::new(injected);
        next
    }

    fn reselect(&self, root: Value) -> Selection {
        let matches = match &self.predicate {
            Some(p) => {
                let mut out = Vec::new();
                walk(&root, &mut Vec::new(), p.as_ref(), &mut out);
                out
            }
            None => direct_matches(&root),
        };
        Selection {
            root,
            matches,
            predicate: self.predicate.clone(),
            injected: self.injected.clone(),
            outputs: None,
        }
    }
}

fn render_path(path: &[Segment]) -> String {
    let mut out = String::new();
    for seg in path {
        match seg {
            Segment::Key(k) => out.push_str(&format!("[\"{k}\"]")),
            Segment::Index(i) => out.push_str(&format!("[{i}]")),
        }
    }
    out
}

fn node_at_path<'a>(root: &'a Value, path: &[Segment]) -> Option<&'a Value> {
    let mut node = root;
    for seg in path {
        node = match (node, seg) {
            (Value::Object(map), Segment::Key(k)) => map.get(k)?,
            (Value::Array(items), Segment::Index(i)) => items.get(*i)?,
            _ => return None,
        };
    }
    Some(node)
}

fn write_at_path(root: &mut Value, path: &[Segment], new_value: Value) {
    let Some((last, init)) = path.split_last() else {
        *root = new_value;
        return;
    };
    let mut node = root;
    for seg in init {
        node = match (node, seg) {
            (Value::Object(map), Segment::Key(k)) => match map.get_mut(k) {
                Some(v) => v,
                None => return,
            },
            (Value::Array(items), Segment::Index(i)) => match items.get_mut(*i) {
                Some(v) => v,
                None => return,
            },
            _ => return,
        };
    }
    match (node, last) {
        (Value::Object(map), Segment::Key(k)) => {
            map.insert(k.clone(), new_value);
        }
        (Value::Array(items), Segment::Index(i)) => {
            if let Some(slot) = items.get_mut(*i) {
                *slot = new_value;
            }
        }
        _ => {}
    }
}
