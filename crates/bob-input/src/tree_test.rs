// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;

use super::*;
use crate::environment::Env;
use crate::fixtures::Project;

fn project() -> Project {
    let project = Project::new();
    project.write_recipe("app", "root: true\ndepends: [lib, util]\n");
    project.write_recipe("tools", "root: true\ndepends: [util]\n");
    project.write_recipe("lib", "depends: [zlib]\nprovideDeps: [zlib]\n");
    project.write_recipe("util", "depends: [zlib]\n");
    project.write_recipe("zlib", "");
    project
}

#[rstest]
fn test_root_package_lists_roots() {
    let packages = project().generate();
    let root = packages.get_root_package().unwrap();
    assert_eq!(root.name(), "");
    assert!(root.stack().is_empty());
    let roots: Vec<_> = root.direct_dependencies().map(|p| p.name()).collect();
    assert_eq!(roots, ["app", "tools"]);
}

#[rstest]
#[case::plain("app/lib/zlib", "zlib")]
#[case::leading_slash("/app/util", "util")]
#[case::double_slash("app//lib", "lib")]
#[case::provided("app/zlib", "zlib")]
#[case::root("", "")]
fn test_walk_package_path(#[case] path: &str, #[case] expected: &str) {
    let packages = project().generate();
    let package = packages.walk_package_path(path).unwrap();
    assert_eq!(package.name(), expected);
}

#[rstest]
fn test_walk_missing_segment() {
    let packages = project().generate();
    let err = packages.walk_package_path("app/nope/zlib").unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Lookup);
    match err {
        Error::PackageNotFound { name, under } => {
            assert_eq!(name, "nope");
            assert_eq!(under, "/app");
        }
        other => panic!("Expected PackageNotFound, got: {:?}", other),
    }
}

#[rstest]
fn test_errors_are_replayed() {
    let project = Project::new();
    project.write_recipe("app", "root: true\ndepends: [missing]\n");
    let packages = project.generate();

    for _ in 0..2 {
        assert!(matches!(
            packages.get_root_package(),
            Err(Error::UnknownRecipe { .. })
        ));
    }
    assert!(matches!(
        packages.walk_package_path("app"),
        Err(Error::UnknownRecipe { .. })
    ));
}

#[rstest]
fn test_package_tree() {
    let packages = project().generate();
    let root = packages.get_root_package().unwrap();
    let tree = package_tree(&root);

    assert_eq!(tree.keys().collect::<Vec<_>>(), ["app", "tools"]);
    let app = &tree["app"];
    assert!(app.direct);
    assert_eq!(app.children.keys().collect::<Vec<_>>(), ["lib", "util", "zlib"]);

    let zlib = &app.children["zlib"];
    assert!(!zlib.direct);
    assert_eq!(zlib.origin.as_deref(), Some("lib"));
    assert!(zlib.children.is_empty());

    // Shared sub-trees are copied
    assert_eq!(tree["tools"].children["util"], app.children["util"]);
}

#[rstest]
fn test_generate_tree() {
    let recipes = project().recipe_set();
    let tree = recipes.generate_tree(&Env::new(), false).unwrap();
    assert!(tree["app"].children["lib"].children.contains_key("zlib"));
}

#[rstest]
fn test_package_tree_prefers_direct_edge() {
    let project = Project::new();
    project.write_recipe("app", "root: true\ndepends:\n  - a\n  - name: c\n    environment: { FOO: direct }\n");
    project.write_recipe("a", "depends:\n  - name: c\n    environment: { FOO: other }\nprovideDeps: [c]\n");
    project.write_recipe("c", "buildVars: [FOO]\n");

    let root = project.generate().get_root_package().unwrap();
    let tree = package_tree(&root);
    let c = &tree["app"].children["c"];
    assert!(c.direct);
    assert_eq!(c.origin, None);
}
