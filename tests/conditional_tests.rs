use seltra::{Conditional, conditional, transform};
use serde_json::json;

#[test]
fn chain_picks_first_truthy_branch() {
    let template = json!({"size": [
        {"{{#if n > 100}}": "huge"},
        {"{{#elseif n > 10}}": "big"},
        {"{{#else}}": "small"}
    ]});
    assert_eq!(
        transform(&template, &json!({"n": 50})).unwrap(),
        json!({"size": "big"})
    );
    assert_eq!(
        transform(&template, &json!({"n": 5})).unwrap(),
        json!({"size": "small"})
    );
}

#[test]
fn chosen_branch_is_transformed() {
    let template = json!({"result": [
        {"#if ok": {"v": "{{n}}"}},
        {"#else": "no"}
    ]});
    assert_eq!(
        transform(&template, &json!({"ok": true, "n": 1})).unwrap(),
        json!({"result": {"v": 1}})
    );
}

#[test]
fn no_match_becomes_null_as_mapping_value() {
    let template = json!({"result": [{"#if n > 10": "x"}]});
    assert_eq!(
        transform(&template, &json!({"n": 1})).unwrap(),
        json!({"result": null})
    );
}

#[test]
fn no_match_is_dropped_from_sequences() {
    let template = json!(["a", [{"#if flag": "x"}], "b"]);
    assert_eq!(
        transform(&template, &json!({"flag": false})).unwrap(),
        json!(["a", "b"])
    );
}

#[test]
fn unresolved_condition_keeps_the_whole_chain() {
    let chain = json!([{"#if flag": "x"}, {"#else": "y"}]);
    let template = json!(["a", chain.clone(), "b"]);
    // `flag` resolves nowhere, so the chain must survive for a later pass
    assert_eq!(
        transform(&template, &json!({})).unwrap(),
        json!(["a", chain, "b"])
    );
}

#[test]
fn exploration_stops_at_first_unresolved_condition() {
    // the first condition is falsy, the second unresolved: the chain
    // aborts even though #else would otherwise fire
    let chain = json!([
        {"#if n > 10": "big"},
        {"#elseif mystery > 0": "odd"},
        {"#else": "small"}
    ]);
    assert_eq!(
        transform(&chain, &json!({"n": 1})).unwrap(),
        chain
    );
}

#[test]
fn standalone_if_mapping() {
    let template = json!({"x": {"#if n > 0": "pos"}});
    assert_eq!(
        transform(&template, &json!({"n": 1})).unwrap(),
        json!({"x": "pos"})
    );
    assert_eq!(
        transform(&template, &json!({"n": 0})).unwrap(),
        json!({"x": null})
    );
    assert_eq!(transform(&template, &json!({})).unwrap(), template);
}

#[test]
fn validator_rejects_malformed_chains() {
    // #elseif cannot open a chain
    assert!(!Conditional::is(&json!([{"#elseif a": 1}, {"#else": 2}])));
    // #else cannot sit in the middle
    assert!(!Conditional::is(&json!([
        {"#if a": 1},
        {"#else": 2},
        {"#elseif b": 3}
    ])));
    assert!(Conditional::is(&json!([
        {"#if a": 1},
        {"#elseif b": 2},
        {"#elseif c": 3}
    ])));
}

#[test]
fn run_resolves_a_chain_directly() {
    let chain = json!([
        {"#if tweets.length > 0": {"names": {"{{#each tweets}}": "{{this.user}}"}}},
        {"#else": "quiet"}
    ]);
    let data = json!({"tweets": [{"user": "ethan"}, {"user": "john"}]});
    assert_eq!(
        conditional::run(&chain, &data).unwrap(),
        json!({"names": ["ethan", "john"]})
    );
    assert_eq!(
        conditional::run(&chain, &json!({"tweets": []})).unwrap(),
        json!("quiet")
    );
}
