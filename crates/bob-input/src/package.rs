// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Resolved packages and their steps.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::environment::Env;
use crate::recipe::{Recipe, StepKind};
use crate::scm::Scm;
use crate::tool::ToolSet;
use crate::variant::VariantId;

/// One phase of a package.
#[derive(Debug, Clone)]
pub struct Step {
    pub(crate) kind: StepKind,
    pub(crate) script: String,
    pub(crate) env: Env,
    pub(crate) variant_id: VariantId,
    pub(crate) net_access: bool,
    pub(crate) tools: ToolSet,
    pub(crate) workspace_path: String,
    pub(crate) scm_list: Vec<Scm>,
    pub(crate) arguments: Vec<VariantId>,
}

impl Step {
    pub fn kind(&self) -> StepKind {
        self.kind
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    /// Variables visible to the step, including those set by its tools.
    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn variant_id(&self) -> VariantId {
        self.variant_id
    }

    pub fn has_net_access(&self) -> bool {
        self.net_access
    }

    /// Tools bound to the step.
    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    pub fn workspace_path(&self) -> &str {
        &self.workspace_path
    }

    /// Sources to check out. Always empty except for checkout steps.
    pub fn scm_list(&self) -> &[Scm] {
        &self.scm_list
    }

    /// Variant ids of the steps whose output this step consumes.
    pub fn arguments(&self) -> &[VariantId] {
        &self.arguments
    }

    /// Whether the step does anything at all.
    pub fn is_valid(&self) -> bool {
        !self.script.trim().is_empty() || !self.scm_list.is_empty()
    }
}

/// Edge from a package to one of its dependencies.
#[derive(Debug, Clone)]
pub struct DependencyEdge {
    pub(crate) package: Arc<Package>,
    pub(crate) direct: bool,
    pub(crate) origin: Option<String>,
}

impl DependencyEdge {
    pub fn package(&self) -> &Arc<Package> {
        &self.package
    }

    /// False for dependencies provided through another dependency.
    pub fn is_direct(&self) -> bool {
        self.direct
    }

    /// Name of the dependency that provided this one, if indirect.
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }
}

/// A recipe instantiated for one input environment and tool set.
#[derive(Debug, Clone)]
pub struct Package {
    pub(crate) recipe: Arc<Recipe>,
    pub(crate) stack: Vec<String>,
    pub(crate) env: Env,
    pub(crate) checkout: Step,
    pub(crate) build: Step,
    pub(crate) package: Step,
    pub(crate) dependencies: Vec<DependencyEdge>,
    pub(crate) provided_deps: Vec<Arc<Package>>,
    pub(crate) provided_tools: ToolSet,
    pub(crate) provided_vars: Env,
    /// Names of all recipes in this package's sub-tree, itself included.
    pub(crate) reachable: BTreeSet<String>,
}

impl Package {
    pub fn name(&self) -> &str {
        self.recipe.name()
    }

    pub fn recipe(&self) -> &Arc<Recipe> {
        &self.recipe
    }

    /// Recipe names from a root recipe down to this package, for the
    /// first path the package was resolved through.
    pub fn stack(&self) -> &[String] {
        &self.stack
    }

    /// Environment of the package after all dependencies were applied.
    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn checkout_step(&self) -> &Step {
        &self.checkout
    }

    pub fn build_step(&self) -> &Step {
        &self.build
    }

    pub fn package_step(&self) -> &Step {
        &self.package
    }

    pub fn step(&self, kind: StepKind) -> &Step {
        match kind {
            StepKind::Checkout => &self.checkout,
            StepKind::Build => &self.build,
            StepKind::Package => &self.package,
        }
    }

    /// Identity of the package: the variant of its package step.
    pub fn variant_id(&self) -> VariantId {
        self.package.variant_id
    }

    /// Direct and provided dependencies in resolution order.
    pub fn dependencies(&self) -> &[DependencyEdge] {
        &self.dependencies
    }

    pub fn direct_dependencies(&self) -> impl Iterator<Item = &Arc<Package>> {
        self.dependencies
            .iter()
            .filter(|d| d.direct)
            .map(|d| &d.package)
    }

    /// Dependencies re-exported to consumers using `deps`.
    pub fn provided_deps(&self) -> &[Arc<Package>] {
        &self.provided_deps
    }

    pub fn provided_tools(&self) -> &ToolSet {
        &self.provided_tools
    }

    pub fn provided_vars(&self) -> &Env {
        &self.provided_vars
    }

    /// Find a dependency by name, preferring direct over provided ones.
    pub fn dependency(&self, name: &str) -> Option<&Arc<Package>> {
        let mut found = None;
        for edge in self.dependencies.iter().filter(|d| d.package.name() == name) {
            if edge.direct {
                return Some(&edge.package);
            }
            found.get_or_insert(&edge.package);
        }
        found
    }

    /// Names from this package down to the first package named `target`.
    pub(crate) fn route_to(&self, target: &str) -> Option<Vec<String>> {
        if self.name() == target {
            return Some(vec![self.name().to_string()]);
        }
        self.dependencies
            .iter()
            .filter(|d| d.package.reachable.contains(target))
            .find_map(|d| d.package.route_to(target))
            .map(|mut route| {
                route.insert(0, self.name().to_string());
                route
            })
    }
}
