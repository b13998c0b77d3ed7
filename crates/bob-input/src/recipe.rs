// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Recipe documents and the immutable recipes built from them.
//!
//! A [`RecipeDocument`] is what a single YAML file (or class, or
//! `multiPackage` variant) declares. Documents are combined with
//! [`RecipeDocument::overlay`] until every class and variant has been
//! applied, and the result is frozen into a [`Recipe`].

use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

use crate::environment::Env;
use crate::scm::Scm;
use crate::tool::ToolProvision;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./recipe_test.rs"]
mod recipe_test;

/// The phases of every package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StepKind {
    Checkout,
    Build,
    Package,
}

impl StepKind {
    pub const ALL: [StepKind; 3] = [StepKind::Checkout, StepKind::Build, StepKind::Package];

    pub fn as_str(self) -> &'static str {
        match self {
            StepKind::Checkout => "checkout",
            StepKind::Build => "build",
            StepKind::Package => "package",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a consumer takes from a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Use {
    /// The dependency's package result is an input of the build step.
    Result,
    /// The dependency's provided dependencies become indirect dependencies.
    Deps,
    /// The dependency's provided tools become available.
    Tools,
    /// The dependency's provided variables are added to the environment.
    Environment,
}

impl Use {
    pub const DEFAULT: [Use; 2] = [Use::Result, Use::Deps];
}

/// One entry of `depends`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "DependsEntry")]
pub struct Dependency {
    name: String,
    environment: Env,
    condition: Option<String>,
    uses: Vec<Use>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DependsEntry {
    Name(String),
    Full(DependencyDocument),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DependencyDocument {
    name: String,
    #[serde(default)]
    environment: Env,
    #[serde(default, rename = "if")]
    condition: Option<String>,
    #[serde(default, rename = "use")]
    uses: Option<Vec<Use>>,
}

impl From<DependsEntry> for Dependency {
    fn from(entry: DependsEntry) -> Self {
        match entry {
            DependsEntry::Name(name) => Dependency::new(name),
            DependsEntry::Full(doc) => Self {
                name: doc.name,
                environment: doc.environment,
                condition: doc.condition,
                uses: doc.uses.unwrap_or_else(|| Use::DEFAULT.to_vec()),
            },
        }
    }
}

impl Dependency {
    /// A plain dependency with the default `use` selection.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            environment: Env::new(),
            condition: None,
            uses: Use::DEFAULT.to_vec(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Overrides applied to the inherited environment of the dependency.
    pub fn environment(&self) -> &Env {
        &self.environment
    }

    /// The `if:` guard, if any.
    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    pub fn uses(&self, kind: Use) -> bool {
        self.uses.contains(&kind)
    }
}

/// The raw content of a recipe or class document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub(crate) struct RecipeDocument {
    #[serde(default)]
    pub root: Option<bool>,
    #[serde(default)]
    pub inherit: Vec<String>,
    #[serde(default)]
    pub depends: Vec<Dependency>,
    #[serde(default)]
    pub provide_deps: Vec<String>,
    #[serde(default)]
    pub provide_tools: IndexMap<String, ToolProvision>,
    #[serde(default)]
    pub provide_vars: Env,

    #[serde(default)]
    pub checkout_tools: Vec<String>,
    #[serde(default)]
    pub build_tools: Vec<String>,
    #[serde(default)]
    pub package_tools: Vec<String>,

    #[serde(default)]
    pub checkout_script: Option<String>,
    #[serde(default)]
    pub build_script: Option<String>,
    #[serde(default)]
    pub package_script: Option<String>,

    #[serde(default)]
    pub checkout_vars: Vec<String>,
    #[serde(default)]
    pub build_vars: Vec<String>,
    #[serde(default)]
    pub package_vars: Vec<String>,

    #[serde(default, rename = "checkoutSCM", deserialize_with = "one_or_many")]
    pub checkout_scm: Vec<Scm>,

    #[serde(default)]
    pub environment: Env,
    #[serde(default)]
    pub build_net_access: Option<bool>,
    #[serde(default)]
    pub package_net_access: Option<bool>,

    #[serde(default)]
    pub multi_package: IndexMap<String, RecipeDocument>,
}

fn one_or_many<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(items) => items,
        OneOrMany::One(item) => vec![item],
    })
}

impl RecipeDocument {
    /// Apply `derived` on top of `self`.
    ///
    /// Scalars of `derived` win when set, scripts are concatenated, name
    /// lists are joined without duplicates, `depends` and `checkoutSCM`
    /// are appended and mappings are merged with `derived` winning.
    pub fn overlay(&self, derived: &RecipeDocument) -> RecipeDocument {
        RecipeDocument {
            root: derived.root.or(self.root),
            inherit: merge_names(&self.inherit, &derived.inherit),
            depends: concat(&self.depends, &derived.depends),
            provide_deps: merge_names(&self.provide_deps, &derived.provide_deps),
            provide_tools: merge_maps(&self.provide_tools, &derived.provide_tools),
            provide_vars: merge_maps(&self.provide_vars, &derived.provide_vars),
            checkout_tools: merge_names(&self.checkout_tools, &derived.checkout_tools),
            build_tools: merge_names(&self.build_tools, &derived.build_tools),
            package_tools: merge_names(&self.package_tools, &derived.package_tools),
            checkout_script: merge_scripts(&self.checkout_script, &derived.checkout_script),
            build_script: merge_scripts(&self.build_script, &derived.build_script),
            package_script: merge_scripts(&self.package_script, &derived.package_script),
            checkout_vars: merge_names(&self.checkout_vars, &derived.checkout_vars),
            build_vars: merge_names(&self.build_vars, &derived.build_vars),
            package_vars: merge_names(&self.package_vars, &derived.package_vars),
            checkout_scm: concat(&self.checkout_scm, &derived.checkout_scm),
            environment: merge_maps(&self.environment, &derived.environment),
            build_net_access: derived.build_net_access.or(self.build_net_access),
            package_net_access: derived.package_net_access.or(self.package_net_access),
            multi_package: merge_maps(&self.multi_package, &derived.multi_package),
        }
    }
}

fn merge_names(base: &[String], derived: &[String]) -> Vec<String> {
    let mut names = base.to_vec();
    for name in derived {
        if !names.contains(name) {
            names.push(name.clone());
        }
    }
    names
}

fn concat<T: Clone>(base: &[T], derived: &[T]) -> Vec<T> {
    base.iter().chain(derived).cloned().collect()
}

fn merge_maps<V: Clone>(base: &IndexMap<String, V>, derived: &IndexMap<String, V>) -> IndexMap<String, V> {
    let mut merged = base.clone();
    for (key, value) in derived {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

fn merge_scripts(base: &Option<String>, derived: &Option<String>) -> Option<String> {
    match (base, derived) {
        (Some(base), Some(derived)) => Some(format!("{base}\n{derived}")),
        (base, None) => base.clone(),
        (None, derived) => derived.clone(),
    }
}

/// Declaration of one step with the variables and tools it inherits from
/// the previous step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepDeclaration {
    script: String,
    vars: Vec<String>,
    tools: Vec<String>,
    net_access: Option<bool>,
}

impl StepDeclaration {
    pub fn script(&self) -> &str {
        &self.script
    }

    /// Names of the variables visible to the step.
    pub fn vars(&self) -> &[String] {
        &self.vars
    }

    /// Names of the tools bound to the step.
    pub fn tools(&self) -> &[String] {
        &self.tools
    }

    /// Explicit network access request, `None` to follow the policy.
    pub fn net_access(&self) -> Option<bool> {
        self.net_access
    }
}

/// A fully inherited recipe, ready to be instantiated into packages.
#[derive(Debug, Clone)]
pub struct Recipe {
    name: String,
    sources: Vec<PathBuf>,
    root: bool,
    depends: Vec<Dependency>,
    provide_deps: Vec<String>,
    provide_tools: IndexMap<String, ToolProvision>,
    provide_vars: Env,
    environment: Env,
    checkout: StepDeclaration,
    build: StepDeclaration,
    package: StepDeclaration,
    checkout_scm: Vec<Scm>,
}

impl Recipe {
    /// Freeze a document whose classes and variants are already applied.
    pub(crate) fn from_document(name: String, doc: RecipeDocument, sources: Vec<PathBuf>) -> Result<Self> {
        let invalid = |message: String| Error::InvalidRecipe {
            recipe: name.clone(),
            message,
        };

        for dep in &doc.depends {
            if !is_valid_name(dep.name()) {
                return Err(invalid(format!("invalid dependency name '{}'", dep.name())));
            }
        }
        for provided in &doc.provide_deps {
            if !is_valid_name(provided) {
                return Err(invalid(format!("invalid provideDeps entry '{provided}'")));
            }
        }
        for tool in doc.provide_tools.keys() {
            if !is_valid_name(tool) || tool.contains('/') {
                return Err(invalid(format!("invalid tool name '{tool}'")));
            }
        }
        for tool in doc
            .checkout_tools
            .iter()
            .chain(&doc.build_tools)
            .chain(&doc.package_tools)
        {
            if tool.trim().is_empty() {
                return Err(invalid("tool requests must not be empty".to_string()));
            }
        }

        let checkout = StepDeclaration {
            script: doc.checkout_script.unwrap_or_default(),
            vars: doc.checkout_vars,
            tools: doc.checkout_tools,
            net_access: Some(true),
        };
        let build = StepDeclaration {
            script: doc.build_script.unwrap_or_default(),
            vars: merge_names(&checkout.vars, &doc.build_vars),
            tools: merge_names(&checkout.tools, &doc.build_tools),
            net_access: doc.build_net_access,
        };
        let package = StepDeclaration {
            script: doc.package_script.unwrap_or_default(),
            vars: merge_names(&build.vars, &doc.package_vars),
            tools: merge_names(&build.tools, &doc.package_tools),
            net_access: doc.package_net_access,
        };

        Ok(Self {
            name,
            sources,
            root: doc.root.unwrap_or(false),
            depends: doc.depends,
            provide_deps: doc.provide_deps,
            provide_tools: doc.provide_tools,
            provide_vars: doc.provide_vars,
            environment: doc.environment,
            checkout,
            build,
            package,
            checkout_scm: doc.checkout_scm,
        })
    }

    /// The synthetic recipe depending on all root recipes.
    pub(crate) fn virtual_root<I>(roots: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            name: String::new(),
            sources: Vec::new(),
            root: false,
            depends: roots.into_iter().map(Dependency::new).collect(),
            provide_deps: Vec::new(),
            provide_tools: IndexMap::new(),
            provide_vars: Env::new(),
            environment: Env::new(),
            checkout: StepDeclaration::default(),
            build: StepDeclaration::default(),
            package: StepDeclaration::default(),
            checkout_scm: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Documents this recipe was built from: the recipe file first, then
    /// all inherited classes.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// The file the recipe is defined in.
    pub fn source(&self) -> Option<&Path> {
        self.sources.first().map(PathBuf::as_path)
    }

    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn depends(&self) -> &[Dependency] {
        &self.depends
    }

    pub fn provide_deps(&self) -> &[String] {
        &self.provide_deps
    }

    pub fn provide_tools(&self) -> &IndexMap<String, ToolProvision> {
        &self.provide_tools
    }

    pub fn provide_vars(&self) -> &Env {
        &self.provide_vars
    }

    pub fn environment(&self) -> &Env {
        &self.environment
    }

    pub fn checkout_scm(&self) -> &[Scm] {
        &self.checkout_scm
    }

    pub fn step(&self, kind: StepKind) -> &StepDeclaration {
        match kind {
            StepKind::Checkout => &self.checkout,
            StepKind::Build => &self.build,
            StepKind::Package => &self.package,
        }
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(char::is_whitespace)
}
