use seltra::transform;
use serde_json::json;

#[test]
fn interpolates_values_and_keys() {
    let template = json!({"{{key}}": "{{value}}", "fixed": "{{value}}!"});
    let data = json!({"key": "name", "value": "celine"});
    assert_eq!(
        transform(&template, &data).unwrap(),
        json!({"name": "celine", "fixed": "celine!"})
    );
}

#[test]
fn unresolved_key_keeps_original_text() {
    let template = json!({"{{missing.key}}": "v"});
    let out = transform(&template, &json!({})).unwrap();
    assert_eq!(out, json!({"{{missing.key}}": "v"}));
}

#[test]
fn each_maps_elements_with_this_and_index() {
    let template = json!({
        "rows": {"{{#each items}}": {"label": "{{this.name}}", "i": "{{$index}}"}}
    });
    let data = json!({"items": [{"name": "a"}, {"name": "b"}]});
    assert_eq!(
        transform(&template, &data).unwrap(),
        json!({"rows": [{"label": "a", "i": 0}, {"label": "b", "i": 1}]})
    );
}

#[test]
fn each_over_scalars_uses_this_directly() {
    let template = json!({"out": {"{{#each names}}": "hi {{this}}"}});
    let data = json!({"names": ["ann", "bo"]});
    assert_eq!(
        transform(&template, &data).unwrap(),
        json!({"out": ["hi ann", "hi bo"]})
    );
}

#[test]
fn each_over_non_sequence_keeps_node() {
    let template = json!({"out": {"{{#each items}}": {"x": "{{this}}"}}});
    let data = json!({"items": {"not": "an array"}});
    assert_eq!(transform(&template, &data).unwrap(), template);
}

#[test]
fn each_over_missing_operand_keeps_node() {
    let template = json!({"out": {"{{#each nothing.here}}": "{{this}}"}});
    assert_eq!(transform(&template, &json!({})).unwrap(), template);
}

#[test]
fn nested_each_with_let_captures_parent_index() {
    let template = json!({
        "{{#each rows}}": {
            "{{#let}}": [
                {"row": "{{$index}}"},
                {"cells": {"{{#each this.cells}}": "{{row}}-{{$index}}"}}
            ]
        }
    });
    let data = json!({"rows": [
        {"cells": ["x", "y"]},
        {"cells": ["z"]}
    ]});
    assert_eq!(
        transform(&template, &data).unwrap(),
        json!([
            {"cells": ["0-0", "0-1"]},
            {"cells": ["1-0"]}
        ])
    );
}

#[test]
fn root_reference_escapes_the_loop_scope() {
    let template = json!({"{{#each items}}": "{{this}} of {{$root.total}}"});
    let data = json!({"items": [1, 2], "total": 2});
    assert_eq!(
        transform(&template, &data).unwrap(),
        json!(["1 of 2", "2 of 2"])
    );
}

#[test]
fn sequences_transform_elementwise() {
    let template = json!(["{{a}}", "literal", {"k": "{{b}}"}]);
    let data = json!({"a": 1, "b": 2});
    assert_eq!(
        transform(&template, &data).unwrap(),
        json!([1, "literal", {"k": 2}])
    );
}

#[test]
fn scalars_pass_through_untouched() {
    let template = json!({"n": 1, "b": true, "z": null});
    assert_eq!(transform(&template, &json!({})).unwrap(), template);
}

#[test]
fn top_level_string_template_keeps_native_type() {
    assert_eq!(
        transform(&json!("{{a}}"), &json!({"a": [1, 2]})).unwrap(),
        json!([1, 2])
    );
    assert_eq!(
        transform(&json!("x={{a}}"), &json!({"a": [1, 2]})).unwrap(),
        json!("x=1,2")
    );
}

#[test]
fn methods_in_templates() {
    let template = json!({
        "parts": "{{csv.split(',')}}",
        "shout": "{{name.toString()}}",
        "ok": "{{name.startswith('et')}}"
    });
    let data = json!({"csv": "a,b", "name": "ethan"});
    assert_eq!(
        transform(&template, &data).unwrap(),
        json!({"parts": ["a", "b"], "shout": "ethan", "ok": true})
    );
}
