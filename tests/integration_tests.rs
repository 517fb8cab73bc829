use seltra::{transform, transform_str, value::is_fully_resolved};
use serde_json::json;

#[test]
fn resolved_output_is_a_fixed_point() {
    let template = json!({
        "title": "{{title}}",
        "rows": {"{{#each items}}": {"v": "{{this}}"}}
    });
    let data = json!({"title": "t", "items": [1, 2]});

    let once = transform(&template, &data).unwrap();
    assert!(is_fully_resolved(&once));
    let twice = transform(&once, &data).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn multi_pass_converges_with_partial_data() {
    let template = json!({
        "view": {
            "{{#each $jason.rows}}": {
                "{{#include $root.cell}}": {},
                "label": "{{this.label}}"
            }
        },
        "title": "{{meta.title}}"
    });

    // only layout fragments are known in the first pass
    let fragments = json!({"cell": {"type": "cell", "height": 44}});
    let pass1 = transform(&template, &fragments).unwrap();
    assert_eq!(
        pass1,
        json!({
            "view": {
                "{{#each $jason.rows}}": {
                    "type": "cell",
                    "height": 44,
                    "label": "{{this.label}}"
                }
            },
            "title": "{{meta.title}}"
        })
    );

    // the second source completes the picture
    let content = json!({
        "$jason": {"rows": [{"label": "a"}, {"label": "b"}]},
        "meta": {"title": "done"}
    });
    let pass2 = transform(&pass1, &content).unwrap();
    assert_eq!(
        pass2,
        json!({
            "view": [
                {"type": "cell", "height": 44, "label": "a"},
                {"type": "cell", "height": 44, "label": "b"}
            ],
            "title": "done"
        })
    );
    assert!(is_fully_resolved(&pass2));
}

#[test]
fn mapping_key_order_is_preserved() {
    let template = json!({"z": 1, "a": "{{x}}", "m": 3});
    let out = transform(&template, &json!({"x": 2})).unwrap();
    let keys: Vec<&String> = out.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["z", "a", "m"]);
}

#[test]
fn serialized_mode_round_trips_text() {
    let out = transform_str(
        r#"{"greeting": "hi {{name}}"}"#,
        r#"{"name": "sam"}"#,
        false,
    )
    .unwrap();
    assert_eq!(out, r#"{"greeting":"hi sam"}"#);

    let pretty = transform_str(r#"{"a": "{{n}}"}"#, r#"{"n": 1}"#, true).unwrap();
    assert!(pretty.contains('\n'));
}

#[test]
fn serialized_mode_surfaces_json_errors() {
    assert!(matches!(
        transform_str("{not json", "{}", false),
        Err(seltra::Error::Json(_))
    ));
    assert!(matches!(
        transform_str("{}", "also not json", false),
        Err(seltra::Error::Json(_))
    ));
}

#[test]
fn expression_syntax_errors_propagate() {
    let template = json!({"s": "NSRect: {{0, 0}, {375, 284}}"});
    assert!(matches!(
        transform(&template, &json!({})),
        Err(seltra::Error::Syntax(_))
    ));
}

#[test]
fn unresolved_regions_never_error() {
    let template = json!({
        "a": "{{missing.a}}",
        "b": {"{{#each missing.b}}": "x"},
        "c": [{"#if missing.c": 1}, {"#else": 2}],
        "d": {"{{#include missing.d}}": {}}
    });
    let out = transform(&template, &json!({})).unwrap();
    assert_eq!(out, template);
}

#[test]
fn empty_containers_pass_through() {
    let template = json!({"empty_map": {}, "empty_seq": []});
    assert_eq!(transform(&template, &json!({})).unwrap(), template);
}
