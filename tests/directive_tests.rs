use seltra::transform;
use serde_json::json;

// ---------------------------------------------------------------- #include

#[test]
fn include_without_expression_replaces_with_attached_value() {
    let template = json!({"wrapper": {"{{#include}}": {"a": 1}}});
    assert_eq!(
        transform(&template, &json!({})).unwrap(),
        json!({"wrapper": {"a": 1}})
    );
}

#[test]
fn include_target_is_attached_verbatim() {
    // the target is itself a template fragment and must not be resolved
    // in the same pass
    let template = json!({"x": {"{{#include $root.partial}}": {}}});
    let data = json!({"partial": {"t": "{{name}}"}, "name": "zoe"});
    assert_eq!(
        transform(&template, &data).unwrap(),
        json!({"x": {"t": "{{name}}"}})
    );
}

#[test]
fn include_with_siblings_merges_and_siblings_win() {
    let template = json!({
        "{{#include $root.person}}": {},
        "lastname": "gliechtenstein"
    });
    let data = json!({"person": {"firstname": "ethan", "lastname": "x"}});
    assert_eq!(
        transform(&template, &data).unwrap(),
        json!({"firstname": "ethan", "lastname": "gliechtenstein"})
    );
}

#[test]
fn string_level_include_splices_into_sequences() {
    let template = json!({"components": ["{{#include mixin.image}}", {"type": "text"}]});
    let data = json!({"mixin": {"image": {"type": "image", "url": "{{url}}"}}});
    assert_eq!(
        transform(&template, &data).unwrap(),
        json!({"components": [{"type": "image", "url": "{{url}}"}, {"type": "text"}]})
    );
}

#[test]
fn unresolved_include_keeps_node() {
    let template = json!({"x": {"{{#include nothing.here}}": {}}});
    assert_eq!(transform(&template, &json!({})).unwrap(), template);
}

#[test]
fn each_defers_until_inner_includes_resolve() {
    let template = json!({
        "items": {
            "{{#each $jason.items}}": {
                "{{#include $root.mixin}}": {},
                "text": "{{name}}"
            }
        }
    });
    let data = json!({
        "mixin": {"type": "label"},
        "$jason": {"items": [{"name": "a"}, {"name": "b"}]}
    });

    // first pass resolves only the include, keeping the loop
    let pass1 = transform(&template, &data).unwrap();
    assert_eq!(
        pass1,
        json!({
            "items": {
                "{{#each $jason.items}}": {"type": "label", "text": "{{name}}"}
            }
        })
    );

    // second pass loops
    let pass2 = transform(&pass1, &data).unwrap();
    assert_eq!(
        pass2,
        json!({
            "items": [
                {"type": "label", "text": "a"},
                {"type": "label", "text": "b"}
            ]
        })
    );
}

// ------------------------------------------------------------------ #merge

#[test]
fn merge_is_shallow_left_to_right() {
    let template = json!({"{{#merge}}": [
        {"a": 1, "b": 1},
        {"b": "{{x}}", "c": 3}
    ]});
    assert_eq!(
        transform(&template, &json!({"x": 2})).unwrap(),
        json!({"a": 1, "b": 2, "c": 3})
    );
}

#[test]
fn merge_skips_non_mapping_children() {
    let template = json!({"{{#merge}}": [{"a": 1}, "noise", [1, 2], {"b": 2}]});
    assert_eq!(
        transform(&template, &json!({})).unwrap(),
        json!({"a": 1, "b": 2})
    );
}

#[test]
fn merge_of_non_sequence_keeps_node() {
    let template = json!({"{{#merge}}": {"a": 1}});
    assert_eq!(transform(&template, &json!({})).unwrap(), template);
}

// ----------------------------------------------------------------- #concat

#[test]
fn concat_spreads_sequences_and_appends_scalars() {
    let template = json!({"{{#concat}}": [["a"], "{{items}}", "b"]});
    let data = json!({"items": [1, 2]});
    assert_eq!(
        transform(&template, &data).unwrap(),
        json!(["a", 1, 2, "b"])
    );
}

#[test]
fn concat_is_atomic_when_any_child_is_unresolved() {
    let template = json!({"{{#concat}}": [["a"], "{{missing}}"]});
    assert_eq!(transform(&template, &json!({})).unwrap(), template);
}

// -------------------------------------------------------------------- #let

#[test]
fn let_bindings_resolve_natively() {
    let template = json!({"{{#let}}": [
        {"n": "{{count}}", "all": "{{items}}"},
        {"copy": "{{n}}", "first": "{{all[0]}}"}
    ]});
    let data = json!({"count": 5, "items": ["x", "y"]});
    assert_eq!(
        transform(&template, &data).unwrap(),
        json!({"copy": 5, "first": "x"})
    );
}

#[test]
fn let_with_unresolved_binding_keeps_node() {
    let template = json!({"{{#let}}": [{"a": "{{missing.ref}}"}, {"x": "{{a}}"}]});
    assert_eq!(transform(&template, &json!({})).unwrap(), template);
}

#[test]
fn let_with_malformed_shape_keeps_node() {
    let template = json!({"{{#let}}": [{"a": 1}]});
    assert_eq!(transform(&template, &json!({})).unwrap(), template);
    let template = json!({"{{#let}}": "nope"});
    assert_eq!(transform(&template, &json!({})).unwrap(), template);
}

// --------------------------------------------------------------------- #?

#[test]
fn existential_keeps_truthy_and_drops_the_rest() {
    let template = json!({
        "a": "{{#? present}}",
        "b": "{{#? missing}}",
        "c": "{{#? zero}}",
        "d": "{{#? off}}"
    });
    let data = json!({"present": "v", "zero": 0, "off": false});
    assert_eq!(transform(&template, &data).unwrap(), json!({"a": "v"}));
}

#[test]
fn existential_with_ternary() {
    let template = json!({"result": "{{#? (one === 1 ? one : false)}}"});
    assert_eq!(
        transform(&template, &json!({"one": 1})).unwrap(),
        json!({"result": 1})
    );
    assert_eq!(
        transform(&template, &json!({"one": 2})).unwrap(),
        json!({})
    );
}
