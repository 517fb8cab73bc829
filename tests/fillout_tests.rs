use seltra::fillout;
use serde_json::json;

#[test]
fn sole_token_returns_native_value() {
    let data = json!({"items": [1, 2, 3], "n": 42, "flag": true});
    assert_eq!(fillout(&data, "{{items}}").unwrap(), json!([1, 2, 3]));
    assert_eq!(fillout(&data, "{{n}}").unwrap(), json!(42));
    assert_eq!(fillout(&data, "{{flag}}").unwrap(), json!(true));
}

#[test]
fn mixed_string_stringifies_tokens() {
    let data = json!({"items": [1, 2, 3], "name": "ethan"});
    assert_eq!(fillout(&data, "hello {{name}}").unwrap(), json!("hello ethan"));
    assert_eq!(fillout(&data, "n={{items}}").unwrap(), json!("n=1,2,3"));
    assert_eq!(
        fillout(&data, "{{name}} has {{items.length}}").unwrap(),
        json!("ethan has 3")
    );
}

#[test]
fn plain_text_passes_through() {
    assert_eq!(fillout(&json!({}), "no tokens here").unwrap(), json!("no tokens here"));
    // unclosed braces are literal text
    assert_eq!(fillout(&json!({}), "half {{open").unwrap(), json!("half {{open"));
}

#[test]
fn unresolved_reference_keeps_the_string() {
    let data = json!({"a": 1});
    assert_eq!(
        fillout(&data, "x {{missing.ref}} y").unwrap(),
        json!("x {{missing.ref}} y")
    );
}

#[test]
fn null_and_out_of_bounds_indexing() {
    let data = json!([10, 20, 30, null]);
    // present but null renders empty
    assert_eq!(fillout(&data, "v={{this[3]}}").unwrap(), json!("v="));
    // out of bounds is unresolved
    assert_eq!(fillout(&data, "v={{this[4]}}").unwrap(), json!("v={{this[4]}}"));
}

#[test]
fn statement_block_with_root_reference() {
    let data = json!({"$get": {"name": "ethan"}});
    assert_eq!(
        fillout(&data, "{{var a = 1; return $root.$get.name;}}").unwrap(),
        json!("ethan")
    );
}

#[test]
fn ternary_and_comparison() {
    let data = json!({"count": 3});
    assert_eq!(
        fillout(&data, "{{count > 0 ? 'some' : 'none'}}").unwrap(),
        json!("some")
    );
    assert_eq!(
        fillout(&json!({"count": 0}), "{{count > 0 ? 'some' : 'none'}}").unwrap(),
        json!("none")
    );
}

#[test]
fn broken_expression_is_an_error() {
    assert!(fillout(&json!({}), "NSRect: {{0, 0}, {375, 284}}").is_err());
}
