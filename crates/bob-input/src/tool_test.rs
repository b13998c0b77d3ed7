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

fn provider() -> VariantId {
    VariantHasher::new("provider").finish()
}

fn tool(pairs: &[(&str, &str)], net_access: bool) -> ToolBinding {
    ToolBinding {
        path: ".".to_string(),
        environment: env(pairs),
        net_access,
        provider: provider(),
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[rstest]
fn test_parse_short_form() {
    let provision: ToolProvision = serde_yaml::from_str("\"bin\"").unwrap();
    assert_eq!(provision.path, "bin");
    assert!(provision.environment.is_empty());
    assert!(!provision.net_access);
}

#[rstest]
fn test_parse_full_form() {
    let provision: ToolProvision =
        serde_yaml::from_str("path: usr/bin\nenvironment:\n  CC: gcc\nnetAccess: true\n").unwrap();
    assert_eq!(provision.path, "usr/bin");
    assert_eq!(provision.environment, env(&[("CC", "gcc")]));
    assert!(provision.net_access);
}

#[rstest]
fn test_parse_rejects_unknown_key() {
    let result: std::result::Result<ToolProvision, _> =
        serde_yaml::from_str("path: bin\nlibs: [x]\n");
    assert!(result.is_err());
}

#[rstest]
fn test_resolve_substitutes_provider_env() {
    let provision = ToolProvision {
        path: "${PREFIX}/bin".to_string(),
        environment: env(&[("FOO", "${LOCAL}")]),
        net_access: false,
    };
    let binding = ToolBinding::resolve(
        &provision,
        &env(&[("LOCAL", "foo"), ("PREFIX", "usr")]),
        provider(),
        "test",
    )
    .unwrap();
    assert_eq!(binding.path(), "usr/bin");
    assert_eq!(binding.environment(), &env(&[("FOO", "foo")]));
}

#[rstest]
fn test_bind_merges_equal_values() {
    let available: ToolSet = [
        ("t1".to_string(), tool(&[("FOO", "foo"), ("BAR", "bar")], false)),
        ("t2".to_string(), tool(&[("BAR", "bar"), ("BAZ", "baz")], true)),
    ]
    .into_iter()
    .collect();

    let bound = bind_tools("root", &names(&["t1", "t2"]), &available).unwrap();
    assert_eq!(
        bound.environment,
        env(&[("FOO", "foo"), ("BAR", "bar"), ("BAZ", "baz")])
    );
    assert!(bound.net_access);
    assert_eq!(bound.tools.len(), 2);
}

#[rstest]
fn test_bind_conflicting_values() {
    let available: ToolSet = [
        ("t1".to_string(), tool(&[("BAR", "one")], false)),
        ("t2".to_string(), tool(&[("BAR", "two")], false)),
    ]
    .into_iter()
    .collect();

    let result = bind_tools("root", &names(&["t1", "t2"]), &available);
    match result {
        Err(Error::ToolEnvConflict { key, first, second, .. }) => {
            assert_eq!(key, "BAR");
            assert_eq!(first, "t1");
            assert_eq!(second, "t2");
        }
        other => panic!("Expected ToolEnvConflict, got: {:?}", other),
    }
}

#[rstest]
fn test_bind_unknown_tool() {
    let result = bind_tools("root", &names(&["missing"]), &ToolSet::new());
    assert!(matches!(result, Err(Error::UnknownTool { .. })));
}

#[rstest]
fn test_bind_only_requested() {
    let available: ToolSet = [
        ("t1".to_string(), tool(&[], true)),
        ("t2".to_string(), tool(&[], false)),
    ]
    .into_iter()
    .collect();

    let bound = bind_tools("root", &names(&["t2"]), &available).unwrap();
    assert!(!bound.net_access);
    assert!(bound.tools.contains_key("t2"));
    assert!(!bound.tools.contains_key("t1"));
}
