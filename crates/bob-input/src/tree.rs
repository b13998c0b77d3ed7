// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Queries on a resolved package graph.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::package::Package;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./tree_test.rs"]
mod tree_test;

/// Result of [`crate::RecipeSet::generate_packages`].
///
/// Resolution errors are kept and reported again on every access.
#[derive(Debug, Clone)]
pub struct PackageTree {
    root: Result<Arc<Package>>,
}

impl PackageTree {
    pub(crate) fn new(root: Result<Arc<Package>>) -> Self {
        Self { root }
    }

    /// The virtual root package whose direct dependencies are all root
    /// recipes.
    pub fn get_root_package(&self) -> Result<Arc<Package>> {
        self.root.clone()
    }

    /// Walk a `/` separated path of recipe names from the virtual root.
    ///
    /// Empty segments are ignored, so `""` and `"/"` both name the root.
    /// Direct dependencies are preferred over provided ones.
    pub fn walk_package_path(&self, path: &str) -> Result<Arc<Package>> {
        let mut package = self.get_root_package()?;
        let mut walked = Vec::new();

        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let next = package.dependency(segment).cloned().ok_or_else(|| Error::PackageNotFound {
                name: segment.to_string(),
                under: format!("/{}", walked.join("/")),
            })?;
            walked.push(segment);
            package = next;
        }

        Ok(package)
    }
}

/// Node of the nested view produced by [`package_tree`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeNode {
    pub children: BTreeMap<String, TreeNode>,
    /// False when the package was provided by another dependency.
    pub direct: bool,
    /// Name of the providing dependency of indirect packages.
    pub origin: Option<String>,
}

/// Nested map of all dependencies below `package`.
///
/// Shared packages are expanded once and copied to every place they
/// appear.
pub fn package_tree(package: &Package) -> BTreeMap<String, TreeNode> {
    let mut memo = HashMap::new();
    children_of(package, &mut memo)
}

fn children_of(
    package: &Package,
    memo: &mut HashMap<*const Package, BTreeMap<String, TreeNode>>,
) -> BTreeMap<String, TreeNode> {
    let key: *const Package = package;
    if let Some(done) = memo.get(&key) {
        return done.clone();
    }

    let mut children: BTreeMap<String, TreeNode> = BTreeMap::new();
    for edge in package.dependencies() {
        let name = edge.package().name();
        // A direct edge shadows a provided one of the same name
        if !edge.is_direct() && children.contains_key(name) {
            continue;
        }
        let node = TreeNode {
            children: children_of(edge.package(), memo),
            direct: edge.is_direct(),
            origin: edge.origin().map(str::to_string),
        };
        children.insert(name.to_string(), node);
    }

    memo.insert(key, children.clone());
    children
}
