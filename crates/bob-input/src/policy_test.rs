// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;

use super::*;

#[rstest]
fn test_no_version_is_legacy() {
    let policies = PolicySet::default();
    for policy in Policy::ALL {
        assert!(!policies.is_current(policy), "{} should be legacy", policy.name());
    }
    assert!(policies.behavior().default_net_access());
    assert!(policies.behavior().sandbox_affects_variant());
}

#[rstest]
#[case("0.12", false, false)]
#[case("0.13", true, false)]
#[case("0.14.2", true, false)]
#[case("0.15", true, true)]
#[case("1.0", true, true)]
fn test_minimum_version_activates(
    #[case] version: &str,
    #[case] relative: bool,
    #[case] offline: bool,
) {
    let policies = PolicySet::new(Some(version.parse().unwrap()), PolicySettings::default());
    let behavior = policies.behavior();
    assert_eq!(behavior.relative_includes, relative);
    assert_eq!(behavior.offline_build, offline);
    assert_eq!(behavior.default_net_access(), !offline);
}

#[rstest]
fn test_explicit_setting_wins() {
    let settings = PolicySettings {
        relative_includes: Some(true),
        offline_build: Some(false),
        ..Default::default()
    };
    let policies = PolicySet::new(Some("0.15".parse().unwrap()), settings);
    assert!(policies.is_current(Policy::RelativeIncludes));
    assert!(!policies.is_current(Policy::OfflineBuild));
    assert!(policies.is_current(Policy::SandboxInvariant));
}

#[rstest]
fn test_settings_reject_unknown_policy() {
    let result: Result<PolicySettings, _> = serde_yaml::from_str("fancyFeature: true\n");
    assert!(result.is_err());
}

#[rstest]
fn test_settings_reject_wrong_type() {
    let result: Result<PolicySettings, _> = serde_yaml::from_str("offlineBuild: [1, 2]\n");
    assert!(result.is_err());
}
