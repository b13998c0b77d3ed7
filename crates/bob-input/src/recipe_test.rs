// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use rstest::rstest;

use super::*;
use crate::config::parse_document;

fn parse(yaml: &str) -> RecipeDocument {
    parse_document(yaml, Path::new("recipes/test.yaml")).expect("Should parse recipe")
}

fn recipe(yaml: &str) -> Result<Recipe> {
    Recipe::from_document("test".to_string(), parse(yaml), Vec::new())
}

#[rstest]
fn test_empty_document() {
    let recipe = recipe("").unwrap();
    assert!(!recipe.is_root());
    assert!(recipe.depends().is_empty());
    assert_eq!(recipe.step(StepKind::Build).script(), "");
    assert_eq!(recipe.step(StepKind::Build).net_access(), None);
    assert_eq!(recipe.step(StepKind::Checkout).net_access(), Some(true));
}

#[rstest]
fn test_unknown_key_is_rejected() {
    let result: Result<RecipeDocument> =
        parse_document("root: true\nbuildScrpit: make\n", Path::new("recipes/x.yaml"));
    assert!(matches!(result, Err(Error::Schema { .. })));
}

#[rstest]
fn test_depends_forms() {
    let doc = parse(
        r#"
depends:
  - simple
  - name: full
    environment:
      FOO: bar
    if: "${BUILD_FULL:-1}"
    use: [tools, environment]
"#,
    );
    assert_eq!(doc.depends.len(), 2);

    let simple = &doc.depends[0];
    assert_eq!(simple.name(), "simple");
    assert!(simple.uses(Use::Result));
    assert!(simple.uses(Use::Deps));
    assert!(!simple.uses(Use::Tools));
    assert_eq!(simple.condition(), None);

    let full = &doc.depends[1];
    assert_eq!(full.name(), "full");
    assert_eq!(full.environment().get("FOO").unwrap(), "bar");
    assert_eq!(full.condition(), Some("${BUILD_FULL:-1}"));
    assert!(!full.uses(Use::Result));
    assert!(full.uses(Use::Tools));
    assert!(full.uses(Use::Environment));
}

#[rstest]
fn test_unknown_use_is_rejected() {
    let result: Result<RecipeDocument> = parse_document(
        "depends:\n  - name: a\n    use: [everything]\n",
        Path::new("recipes/x.yaml"),
    );
    assert!(result.is_err());
}

#[rstest]
#[case::single("checkoutSCM:\n  scm: git\n  url: a.git\n", 1)]
#[case::list("checkoutSCM:\n  - scm: git\n    url: a.git\n  - scm: svn\n    url: b\n", 2)]
fn test_checkout_scm_forms(#[case] yaml: &str, #[case] count: usize) {
    let recipe = recipe(yaml).unwrap();
    assert_eq!(recipe.checkout_scm().len(), count);
    assert_eq!(recipe.checkout_scm()[0].kind(), "git");
}

#[rstest]
fn test_step_declarations_accumulate() {
    let recipe = recipe(
        r#"
checkoutVars: [A]
checkoutTools: [fetch]
buildVars: [B, A]
buildTools: [cc]
packageVars: [C]
packageTools: [strip]
buildNetAccess: true
"#,
    )
    .unwrap();

    let build = recipe.step(StepKind::Build);
    assert_eq!(build.vars(), ["A", "B"]);
    assert_eq!(build.tools(), ["fetch", "cc"]);
    assert_eq!(build.net_access(), Some(true));

    let package = recipe.step(StepKind::Package);
    assert_eq!(package.vars(), ["A", "B", "C"]);
    assert_eq!(package.tools(), ["fetch", "cc", "strip"]);
    assert_eq!(package.net_access(), None);
}

#[rstest]
fn test_overlay_rules() {
    let base = parse(
        r#"
root: true
depends: [a]
buildScript: "configure"
buildVars: [A, B]
environment:
  X: base
  Y: base
provideTools:
  cc: bin
"#,
    );
    let derived = parse(
        r#"
depends: [b]
buildScript: "make"
buildVars: [B, C]
environment:
  Y: derived
provideTools:
  cc: usr/bin
packageNetAccess: false
"#,
    );

    let merged = base.overlay(&derived);
    assert_eq!(merged.root, Some(true));
    let deps: Vec<_> = merged.depends.iter().map(Dependency::name).collect();
    assert_eq!(deps, ["a", "b"]);
    assert_eq!(merged.build_script.as_deref(), Some("configure\nmake"));
    assert_eq!(merged.build_vars, ["A", "B", "C"]);
    assert_eq!(merged.environment.get("X").unwrap(), "base");
    assert_eq!(merged.environment.get("Y").unwrap(), "derived");
    assert_eq!(merged.provide_tools["cc"].path, "usr/bin");
    assert_eq!(merged.package_net_access, Some(false));
}

#[rstest]
fn test_overlay_derived_scalar_wins() {
    let base = parse("root: true\n");
    let derived = parse("root: false\n");
    assert_eq!(base.overlay(&derived).root, Some(false));
    assert_eq!(derived.overlay(&RecipeDocument::default()).root, Some(false));
}

#[rstest]
#[case::dependency("depends:\n  - \"a b\"\n")]
#[case::provided_dep("provideDeps: [\"\"]\n")]
#[case::tool_name("provideTools:\n  \"a/b\": bin\n")]
#[case::tool_request("buildTools: [\" \"]\n")]
fn test_validation(#[case] yaml: &str) {
    let result = recipe(yaml);
    assert!(matches!(result, Err(Error::InvalidRecipe { .. })), "{result:?}");
}

#[rstest]
fn test_virtual_root() {
    let root = Recipe::virtual_root(["a".to_string(), "b".to_string()]);
    assert_eq!(root.name(), "");
    let deps: Vec<_> = root.depends().iter().map(Dependency::name).collect();
    assert_eq!(deps, ["a", "b"]);
    assert!(root.depends().iter().all(|d| d.uses(Use::Result)));
}
