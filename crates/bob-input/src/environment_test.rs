// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;

use super::*;

fn env(pairs: &[(&str, &str)]) -> Env {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[rstest]
#[case("plain text", "plain text")]
#[case("${FOO}", "foo")]
#[case("a-${FOO}-b", "a-foo-b")]
#[case("${MISSING:-fallback}", "fallback")]
#[case("${EMPTY:-fallback}", "fallback")]
#[case("${EMPTY-fallback}", "")]
#[case("${MISSING-fallback}", "fallback")]
#[case("${FOO:+alt}", "alt")]
#[case("${EMPTY:+alt}", "")]
#[case("${EMPTY+alt}", "alt")]
#[case("${MISSING:-${FOO}}", "foo")]
#[case("cost: $$5", "cost: $5")]
#[case("lonely $ sign", "lonely $ sign")]
fn test_substitute(#[case] text: &str, #[case] expected: &str) {
    let env = env(&[("FOO", "foo"), ("EMPTY", "")]);
    assert_eq!(substitute(text, &env, "test").unwrap(), expected);
}

#[rstest]
fn test_undefined_variable_is_error() {
    let err = substitute("${NOPE}", &Env::new(), "recipe 'x'").unwrap_err();
    match err {
        Error::UndefinedVariable { name, context } => {
            assert_eq!(name, "NOPE");
            assert_eq!(context, "recipe 'x'");
        }
        other => panic!("Expected UndefinedVariable, got: {:?}", other),
    }
}

#[rstest]
#[case("${FOO")]
#[case("${}")]
#[case("${FOO:?bar}")]
fn test_bad_substitution(#[case] text: &str) {
    let result = substitute(text, &env(&[("FOO", "foo")]), "test");
    assert!(matches!(result, Err(Error::BadSubstitution { .. })));
}

#[rstest]
fn test_unused_default_is_not_evaluated() {
    let env = env(&[("FOO", "foo")]);
    assert_eq!(substitute("${FOO:-${NOPE}}", &env, "test").unwrap(), "foo");
}

#[rstest]
#[case("", false)]
#[case("0", false)]
#[case("1", true)]
#[case("false", true)]
#[case("yes", true)]
fn test_is_true(#[case] value: &str, #[case] expected: bool) {
    assert_eq!(is_true(value), expected);
}

#[rstest]
fn test_guard_with_default() {
    assert!(evaluate_guard("${TERMINATE:-1}", &Env::new(), "test").unwrap());
    let terminate = env(&[("TERMINATE", "0")]);
    assert!(!evaluate_guard("${TERMINATE:-1}", &terminate, "test").unwrap());
}

#[rstest]
fn test_resolve_mapping_left_to_right() {
    let base = env(&[("BASE", "b")]);
    let overrides = env(&[("A", "${BASE}-a"), ("B", "${A}-b")]);
    let resolved = resolve_mapping(&base, &overrides, "test").unwrap();
    assert_eq!(resolved, env(&[("BASE", "b"), ("A", "b-a"), ("B", "b-a-b")]));
}

#[rstest]
fn test_resolve_mapping_rejects_forward_reference() {
    let overrides = env(&[("A", "${B}"), ("B", "b")]);
    let result = resolve_mapping(&Env::new(), &overrides, "test");
    assert!(matches!(result, Err(Error::UndefinedVariable { name, .. }) if name == "B"));
}

#[rstest]
fn test_resolve_mapping_overrides_base() {
    let base = env(&[("FOO", "old"), ("BAR", "bar")]);
    let overrides = env(&[("FOO", "new:${FOO}")]);
    let resolved = resolve_mapping(&base, &overrides, "test").unwrap();
    assert_eq!(resolved, env(&[("FOO", "new:old"), ("BAR", "bar")]));
}

#[rstest]
fn test_substitute_mapping_does_not_merge() {
    let scope = env(&[("LOCAL", "foo")]);
    let mapping = env(&[("FOO", "${LOCAL}"), ("BAR", "bar")]);
    let resolved = substitute_mapping(&mapping, &scope, "test").unwrap();
    assert_eq!(resolved, env(&[("FOO", "foo"), ("BAR", "bar")]));
}

#[rstest]
fn test_filter_skips_unset() {
    let all = env(&[("A", "1"), ("B", "2")]);
    let names = vec!["B".to_string(), "C".to_string()];
    assert_eq!(filter(&all, &names), env(&[("B", "2")]));
}
