// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Resolution of recipes into a deduplicated package graph.
//!
//! Every dependency is resolved against its inbound state: the
//! environment it inherits, the tools visible to it and the sandbox flag.
//! The hash of that state is the key of a cache shared by the whole graph,
//! so each distinct variant of a recipe is instantiated exactly once.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use dashmap::DashMap;

use crate::environment::{Env, evaluate_guard, filter, resolve_mapping, substitute_mapping};
use crate::package::{DependencyEdge, Package, Step};
use crate::policy::Behavior;
use crate::recipe::{Recipe, StepKind, Use};
use crate::store::RecipeStore;
use crate::tool::{ToolBinding, ToolSet, bind_tools, hash_tools};
use crate::variant::{VariantHasher, VariantId};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./resolver_test.rs"]
mod resolver_test;

/// Computes the workspace path of a step from the recipe stack of its
/// package.
pub trait PathFormatter: Send + Sync {
    fn format(&self, stack: &[String], kind: StepKind) -> String;
}

impl<F> PathFormatter for F
where
    F: Fn(&[String], StepKind) -> String + Send + Sync,
{
    fn format(&self, stack: &[String], kind: StepKind) -> String {
        self(stack, kind)
    }
}

/// Builds packages from the recipes of a [`RecipeStore`].
///
/// The builder may be shared between threads resolving different roots;
/// packages resolved by one are reused by all others.
pub struct GraphBuilder<'a> {
    store: &'a RecipeStore,
    behavior: Behavior,
    formatter: &'a dyn PathFormatter,
    sandbox: bool,
    cache: DashMap<VariantId, Arc<Package>>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(store: &'a RecipeStore, behavior: Behavior, formatter: &'a dyn PathFormatter) -> Self {
        Self {
            store,
            behavior,
            formatter,
            sandbox: false,
            cache: DashMap::new(),
        }
    }

    /// Resolve for execution inside a sandbox.
    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// Number of distinct packages resolved so far.
    pub fn cached_packages(&self) -> usize {
        self.cache.len()
    }

    /// Resolve the virtual root package whose direct dependencies are all
    /// root recipes.
    pub fn build(&self, env: &Env) -> Result<Arc<Package>> {
        let roots = self.store.root_recipes().map(|r| r.name().to_string());
        let recipe = Arc::new(Recipe::virtual_root(roots));
        let mut path = Vec::new();
        let package = self.instantiate(&recipe, env, &ToolSet::new(), &mut path, Vec::new())?;
        tracing::debug!("resolved {} distinct package(s)", self.cache.len());
        Ok(Arc::new(package))
    }

    /// Resolve a single recipe as if it was a root recipe.
    pub fn resolve_root(&self, name: &str, env: &Env) -> Result<Arc<Package>> {
        let mut path = Vec::new();
        self.resolve_dependency(name, "", env, &ToolSet::new(), &mut path, vec![name.to_string()])
    }

    fn resolve_dependency(
        &self,
        name: &str,
        needed_by: &str,
        env: &Env,
        tools: &ToolSet,
        path: &mut Vec<String>,
        stack: Vec<String>,
    ) -> Result<Arc<Package>> {
        if let Some(pos) = path.iter().position(|n| n == name) {
            let mut chain = path[pos..].to_vec();
            chain.push(name.to_string());
            return Err(Error::Cycle { chain });
        }

        let recipe = self
            .store
            .get_recipe(name)
            .ok_or_else(|| Error::UnknownRecipe {
                name: name.to_string(),
                needed_by: needed_by.to_string(),
            })?;

        let key = self.input_identity(name, env, tools);
        // Clone out of the map so that no shard lock is held below
        let cached = self.cache.get(&key).map(|entry| Arc::clone(entry.value()));
        if let Some(hit) = cached {
            if let Some(chain) = cycle_through(path, &hit) {
                return Err(Error::Cycle { chain });
            }
            tracing::trace!("reusing {name} ({})", key.short());
            return Ok(hit);
        }

        path.push(name.to_string());
        let result = self.instantiate(recipe, env, tools, path, stack);
        path.pop();

        let package = Arc::new(result?);
        let entry = self.cache.entry(key).or_insert(package);
        Ok(Arc::clone(entry.value()))
    }

    fn input_identity(&self, name: &str, env: &Env, tools: &ToolSet) -> VariantId {
        let mut hasher = VariantHasher::new("input");
        hasher.str(name).env(env);
        hash_tools(&mut hasher, tools);
        hasher.flag(self.sandbox);
        hasher.finish()
    }

    fn instantiate(
        &self,
        recipe: &Arc<Recipe>,
        inbound_env: &Env,
        inbound_tools: &ToolSet,
        path: &mut Vec<String>,
        stack: Vec<String>,
    ) -> Result<Package> {
        let name = recipe.name();
        let context = format!("recipe '{name}'");
        let mut env = resolve_mapping(inbound_env, recipe.environment(), &context)?;
        let mut tools = inbound_tools.clone();
        let mut slots = DependencySlots::new(name);

        for dep in recipe.depends() {
            let dep_context = format!("{context}, dependency '{}'", dep.name());
            if let Some(condition) = dep.condition() {
                if !evaluate_guard(condition, &env, &dep_context)? {
                    tracing::debug!("{name}: skipping {} (condition is false)", dep.name());
                    continue;
                }
            }

            let dep_env = resolve_mapping(&env, dep.environment(), &dep_context)?;
            let mut dep_stack = stack.clone();
            dep_stack.push(dep.name().to_string());
            let package = self.resolve_dependency(dep.name(), name, &dep_env, &tools, path, dep_stack)?;

            if dep.uses(Use::Tools) {
                for (tool, binding) in package.provided_tools() {
                    tools.insert(tool.clone(), binding.clone());
                }
            }
            if dep.uses(Use::Environment) {
                for (key, value) in package.provided_vars() {
                    env.insert(key.clone(), value.clone());
                }
            }

            slots.insert_direct(&package, dep.uses(Use::Result))?;
            if dep.uses(Use::Deps) {
                for provided in package.provided_deps() {
                    slots.insert_provided(provided, package.name())?;
                }
            }
        }

        let checkout = self.make_step(recipe, StepKind::Checkout, &env, &tools, &stack, Vec::new())?;
        let mut build_args = vec![checkout.variant_id];
        build_args.extend(slots.result_variants());
        let build = self.make_step(recipe, StepKind::Build, &env, &tools, &stack, build_args)?;
        let package = self.make_step(
            recipe,
            StepKind::Package,
            &env,
            &tools,
            &stack,
            vec![build.variant_id],
        )?;

        let provided_tools = recipe
            .provide_tools()
            .iter()
            .map(|(tool, provision)| {
                let tool_context = format!("{context}, tool '{tool}'");
                ToolBinding::resolve(provision, &env, package.variant_id, &tool_context)
                    .map(|binding| (tool.clone(), binding))
            })
            .collect::<Result<ToolSet>>()?;
        let provided_vars = substitute_mapping(recipe.provide_vars(), &env, &context)?;

        let dependencies = slots.into_edges();
        let mut provided_deps = Vec::new();
        for wanted in recipe.provide_deps() {
            let found = dependencies
                .iter()
                .filter(|d| d.package.name() == wanted)
                .max_by_key(|d| d.direct);
            match found {
                Some(edge) => provided_deps.push(Arc::clone(&edge.package)),
                None => tracing::debug!("{name}: provided dependency {wanted} is not a dependency"),
            }
        }

        let mut reachable = BTreeSet::from([name.to_string()]);
        for edge in &dependencies {
            reachable.extend(edge.package.reachable.iter().cloned());
        }

        Ok(Package {
            recipe: Arc::clone(recipe),
            stack,
            env,
            checkout,
            build,
            package,
            dependencies,
            provided_deps,
            provided_tools,
            provided_vars,
            reachable,
        })
    }

    fn make_step(
        &self,
        recipe: &Recipe,
        kind: StepKind,
        env: &Env,
        tools: &ToolSet,
        stack: &[String],
        arguments: Vec<VariantId>,
    ) -> Result<Step> {
        let decl = recipe.step(kind);
        let bound = bind_tools(recipe.name(), decl.tools(), tools)?;

        let mut step_env = filter(env, decl.vars());
        for (key, value) in &bound.environment {
            step_env.insert(key.clone(), value.clone());
        }

        let scm_list = if kind == StepKind::Checkout {
            let context = format!("recipe '{}', checkoutSCM", recipe.name());
            recipe
                .checkout_scm()
                .iter()
                .map(|scm| scm.substitute(env, &context))
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        let net_access = decl
            .net_access()
            .unwrap_or_else(|| self.behavior.default_net_access())
            || bound.net_access;

        let mut hasher = VariantHasher::new("step");
        hasher.str(kind.as_str()).str(decl.script()).env(&step_env);
        hash_tools(&mut hasher, &bound.tools);
        for scm in &scm_list {
            hasher.properties(&scm.properties());
        }
        hasher.ids(&arguments);
        if self.behavior.sandbox_affects_variant() {
            hasher.flag(self.sandbox);
        }

        Ok(Step {
            kind,
            script: decl.script().to_string(),
            env: step_env,
            variant_id: hasher.finish(),
            net_access,
            tools: bound.tools,
            workspace_path: self.formatter.format(stack, kind),
            scm_list,
            arguments,
        })
    }
}

/// Chain of names if the cached sub-tree `hit` leads back onto `path`.
fn cycle_through(path: &[String], hit: &Package) -> Option<Vec<String>> {
    let pos = path.iter().position(|n| hit.reachable.contains(n))?;
    let mut chain = path[pos..].to_vec();
    chain.extend(hit.route_to(&path[pos])?);
    Some(chain)
}

struct Slot {
    edge: DependencyEdge,
    /// Whether the package result is a build input.
    result: bool,
}

/// Dependencies of one consumer in resolution order.
///
/// At most one direct and one provided edge exist per name. A provided
/// edge of the same variant as the direct one is folded into it.
struct DependencySlots<'a> {
    consumer: &'a str,
    slots: Vec<Slot>,
    /// Variant of every provided dependency seen so far, folded or not.
    provided: HashMap<String, VariantId>,
}

impl<'a> DependencySlots<'a> {
    fn new(consumer: &'a str) -> Self {
        Self {
            consumer,
            slots: Vec::new(),
            provided: HashMap::new(),
        }
    }

    fn incompatible(&self, name: &str) -> Error {
        Error::IncompatibleVariant {
            name: name.to_string(),
            consumer: self.consumer.to_string(),
        }
    }

    fn find(&mut self, name: &str, direct: bool) -> Option<&mut Slot> {
        self.slots
            .iter_mut()
            .find(|slot| slot.edge.direct == direct && slot.edge.package.name() == name)
    }

    /// Record a direct dependency. A direct entry takes over a provided one
    /// of the same variant.
    fn insert_direct(&mut self, package: &Arc<Package>, result: bool) -> Result<()> {
        let name = package.name();
        let variant = package.variant_id();

        if let Some(slot) = self.find(name, true) {
            if slot.edge.package.variant_id() != variant {
                return Err(self.incompatible(name));
            }
            slot.result |= result;
            return Ok(());
        }

        if let Some(slot) = self.find(name, false) {
            if slot.edge.package.variant_id() == variant {
                slot.edge.direct = true;
                slot.edge.origin = None;
                slot.result |= result;
                return Ok(());
            }
        }

        let edge = DependencyEdge {
            package: Arc::clone(package),
            direct: true,
            origin: None,
        };
        self.slots.push(Slot { edge, result });
        Ok(())
    }

    /// Record a dependency provided by `origin`. It never replaces a direct
    /// entry but is kept next to it when the variants differ.
    fn insert_provided(&mut self, package: &Arc<Package>, origin: &str) -> Result<()> {
        let name = package.name();
        let variant = package.variant_id();

        match self.provided.get(name) {
            Some(seen) if *seen != variant => return Err(self.incompatible(name)),
            Some(_) => return Ok(()),
            None => {
                self.provided.insert(name.to_string(), variant);
            }
        }

        if let Some(slot) = self.find(name, true) {
            if slot.edge.package.variant_id() == variant {
                slot.result = true;
                return Ok(());
            }
            tracing::debug!(
                "{}: {name} provided by {origin} differs from the direct dependency",
                self.consumer
            );
        }

        let edge = DependencyEdge {
            package: Arc::clone(package),
            direct: false,
            origin: Some(origin.to_string()),
        };
        self.slots.push(Slot { edge, result: true });
        Ok(())
    }

    fn result_variants(&self) -> impl Iterator<Item = VariantId> + '_ {
        self.slots
            .iter()
            .filter(|slot| slot.result)
            .map(|slot| slot.edge.package.variant_id())
    }

    fn into_edges(self) -> Vec<DependencyEdge> {
        self.slots.into_iter().map(|slot| slot.edge).collect()
    }
}
