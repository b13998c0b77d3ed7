// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Tools provided by dependencies and their binding to steps.
//!
//! A recipe declares tools with `provideTools`. Consumers that depend on
//! it with `use: [tools]` see the tools, and so do all of their own
//! dependencies resolved afterwards. A step only gets the tools it asks
//! for through `checkoutTools`, `buildTools` or `packageTools`.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::environment::{Env, substitute, substitute_mapping};
use crate::variant::{VariantHasher, VariantId};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./tool_test.rs"]
mod tool_test;

/// Tools visible to a package or step, by name.
pub type ToolSet = BTreeMap<String, ToolBinding>;

/// A tool as declared in a recipe, before substitution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "ToolEntry")]
pub struct ToolProvision {
    /// Path relative to the provider's package workspace.
    pub path: String,

    /// Variables set in every step using the tool.
    pub environment: Env,

    /// Force network access of every step using the tool.
    pub net_access: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ToolEntry {
    Path(String),
    Full(ToolDocument),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct ToolDocument {
    path: String,
    #[serde(default)]
    environment: Env,
    #[serde(default)]
    net_access: bool,
}

impl From<ToolEntry> for ToolProvision {
    fn from(entry: ToolEntry) -> Self {
        match entry {
            ToolEntry::Path(path) => Self {
                path,
                ..Default::default()
            },
            ToolEntry::Full(doc) => Self {
                path: doc.path,
                environment: doc.environment,
                net_access: doc.net_access,
            },
        }
    }
}

/// A resolved tool, bound to the package variant providing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolBinding {
    path: String,
    environment: Env,
    net_access: bool,
    provider: VariantId,
}

impl ToolBinding {
    /// Substitute a provision against the provider's environment.
    pub(crate) fn resolve(
        provision: &ToolProvision,
        env: &Env,
        provider: VariantId,
        context: &str,
    ) -> Result<Self> {
        Ok(Self {
            path: substitute(&provision.path, env, context)?,
            environment: substitute_mapping(&provision.environment, env, context)?,
            net_access: provision.net_access,
            provider,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn environment(&self) -> &Env {
        &self.environment
    }

    pub fn net_access(&self) -> bool {
        self.net_access
    }

    /// Package variant of the provider.
    pub fn provider(&self) -> VariantId {
        self.provider
    }

    pub(crate) fn hash_into(&self, hasher: &mut VariantHasher) {
        hasher
            .str(&self.path)
            .env(&self.environment)
            .flag(self.net_access)
            .id(&self.provider);
    }
}

/// Feed a whole tool set into a variant hash.
pub(crate) fn hash_tools(hasher: &mut VariantHasher, tools: &ToolSet) {
    hasher.str(&tools.len().to_string());
    for (name, tool) in tools {
        hasher.str(name);
        tool.hash_into(hasher);
    }
}

/// Tools bound to one step.
#[derive(Debug, Clone, Default)]
pub(crate) struct BoundTools {
    pub tools: ToolSet,

    /// Union of the environment of all bound tools.
    pub environment: Env,

    /// Whether any bound tool forces network access.
    pub net_access: bool,
}

/// Bind the `requested` tools of a step of `recipe`.
pub(crate) fn bind_tools(recipe: &str, requested: &[String], available: &ToolSet) -> Result<BoundTools> {
    let mut bound = BoundTools::default();
    // key -> (value, defining tool)
    let mut defined: IndexMap<&str, (&str, &str)> = IndexMap::new();

    for name in requested {
        let tool = available.get(name).ok_or_else(|| Error::UnknownTool {
            tool: name.clone(),
            recipe: recipe.to_string(),
        })?;

        for (key, value) in tool.environment() {
            match defined.get(key.as_str()) {
                Some((existing, first)) if *existing != value.as_str() => {
                    return Err(Error::ToolEnvConflict {
                        recipe: recipe.to_string(),
                        key: key.clone(),
                        first: first.to_string(),
                        second: name.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    defined.insert(key.as_str(), (value.as_str(), name.as_str()));
                }
            }
        }

        bound.net_access |= tool.net_access();
        bound.tools.insert(name.clone(), tool.clone());
    }

    bound.environment = defined
        .into_iter()
        .map(|(key, (value, _))| (key.to_string(), value.to_string()))
        .collect();
    Ok(bound)
}
