// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Entry point tying configuration, recipes and resolution together.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::compose::{ConfigDocument, ConfigMerger};
use crate::environment::{Env, filter};
use crate::policy::{Behavior, PolicySet};
use crate::recipe::{Recipe, StepKind};
use crate::resolver::{GraphBuilder, PathFormatter};
use crate::store::RecipeStore;
use crate::tree::{PackageTree, TreeNode, package_tree};
use crate::Result;

#[cfg(test)]
#[path = "./recipe_set_test.rs"]
mod recipe_set_test;

/// The parsed configuration and recipes of a project.
#[derive(Debug, Clone)]
pub struct RecipeSet {
    root: PathBuf,
    config: ConfigDocument,
    store: RecipeStore,
}

impl RecipeSet {
    /// Parse the project at `root`.
    ///
    /// `config_files` name additional user configuration documents
    /// (without extension) overriding the project defaults, lowest
    /// precedence first.
    pub fn parse<P: AsRef<Path>>(root: P, config_files: &[String]) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let config = ConfigMerger::new(&root)
            .with_user_configs(config_files.iter().cloned())
            .merge()?;
        let store = RecipeStore::load(&root)?;
        tracing::debug!(
            "parsed {} recipe(s) with {} config document(s)",
            store.len(),
            config.source_files.len()
        );
        Ok(Self {
            root,
            config,
            store,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Host variables passed into the root environment.
    pub fn env_white_list(&self) -> &BTreeSet<String> {
        &self.config.whitelist
    }

    /// Default environment of all root packages.
    pub fn default_env(&self) -> &Env {
        &self.config.environment
    }

    pub fn config(&self) -> &ConfigDocument {
        &self.config
    }

    pub fn policies(&self) -> &PolicySet {
        &self.config.policies
    }

    pub fn behavior(&self) -> Behavior {
        self.config.behavior()
    }

    pub fn store(&self) -> &RecipeStore {
        &self.store
    }

    pub fn get_recipe(&self, name: &str) -> Option<&Arc<Recipe>> {
        self.store.get_recipe(name)
    }

    pub fn get_sources(&self, name: &str) -> Option<&[PathBuf]> {
        self.store.get_sources(name)
    }

    /// Environment of all root packages.
    ///
    /// Whitelisted variables of the calling process, overridden by the
    /// default environment, overridden by `defines`. Host variables that
    /// are not valid unicode are skipped.
    pub fn root_env(&self, defines: &Env) -> Env {
        let host: Env = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect();
        self.root_env_with_host(&host, defines)
    }

    pub(crate) fn root_env_with_host(&self, host: &Env, defines: &Env) -> Env {
        let mut env = filter(host, &self.config.whitelist);
        for (key, value) in self.config.environment.iter().chain(defines) {
            env.insert(key.clone(), value.clone());
        }
        env
    }

    /// Resolve all root recipes into a package graph.
    ///
    /// Resolution errors are not returned here but by every access to the
    /// returned tree.
    pub fn generate_packages(&self, formatter: &dyn PathFormatter, defines: &Env) -> PackageTree {
        self.generate_packages_with_sandbox(formatter, defines, false)
    }

    pub fn generate_packages_with_sandbox(
        &self,
        formatter: &dyn PathFormatter,
        defines: &Env,
        sandbox: bool,
    ) -> PackageTree {
        let builder = GraphBuilder::new(&self.store, self.behavior(), formatter).with_sandbox(sandbox);
        let root = builder.build(&self.root_env(defines));
        if let Err(err) = &root {
            tracing::debug!("package resolution failed: {err}");
        }
        PackageTree::new(root)
    }

    /// Nested map of all packages below the virtual root, tagged with
    /// whether each one is a direct dependency.
    pub fn generate_tree(&self, defines: &Env, sandbox: bool) -> Result<BTreeMap<String, TreeNode>> {
        let formatter = |stack: &[String], kind: StepKind| format!("work/{}/{kind}", stack.join("/"));
        let tree = self.generate_packages_with_sandbox(&formatter, defines, sandbox);
        let root = tree.get_root_package()?;
        Ok(package_tree(&root))
    }
}
