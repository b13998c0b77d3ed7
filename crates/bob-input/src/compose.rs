// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Composition logic for merging configuration layers into one document.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::config::{LayerSpec, ProjectConfig};
use crate::discovery::{DiscoveryOptions, discover_layers};
use crate::environment::Env;
use crate::policy::{Behavior, PolicySet};
use crate::{DOCUMENT_EXTENSION, PROJECT_CONFIG, Result};

#[cfg(test)]
#[path = "./compose_test.rs"]
mod compose_test;

/// Host variables every build may see, regardless of configuration.
pub const DEFAULT_WHITELIST: [&str; 5] = ["PATH", "TERM", "SHELL", "USER", "HOME"];

/// Effective configuration of a project.
#[derive(Debug, Clone, Default)]
pub struct ConfigDocument {
    /// Merged default environment (later layers win).
    pub environment: Env,

    /// Union of all whitelisted variable names.
    pub whitelist: BTreeSet<String>,

    /// Version gated policies from `config.yaml`.
    pub policies: PolicySet,

    /// Source files that contributed to this composition, in order.
    pub source_files: Vec<PathBuf>,
}

impl ConfigDocument {
    /// Resolved policy behavior.
    pub fn behavior(&self) -> Behavior {
        self.policies.behavior()
    }
}

/// Compose layers into a single configuration document.
///
/// Layers are processed in order, with later layers overriding earlier ones.
pub fn compose_layers(layers: &[LayerSpec], policies: PolicySet) -> ConfigDocument {
    let mut composed = ConfigDocument {
        whitelist: DEFAULT_WHITELIST.iter().map(|s| s.to_string()).collect(),
        policies,
        ..Default::default()
    };

    for layer in layers {
        // Environment: later layers override per key
        for (key, value) in &layer.environment {
            composed.environment.insert(key.clone(), value.clone());
        }

        // Whitelist: union
        composed.whitelist.extend(layer.whitelist.iter().cloned());

        // Track source file
        if let Some(path) = &layer.source_path {
            composed.source_files.push(path.clone());
        }
    }

    composed
}

/// Builds the effective configuration of a project directory.
#[derive(Debug, Clone)]
pub struct ConfigMerger {
    root: PathBuf,
    user_configs: Vec<String>,
}

impl ConfigMerger {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            user_configs: Vec::new(),
        }
    }

    /// Add user config files (named without extension, relative to the
    /// project root). Later files take precedence.
    pub fn with_user_configs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_configs.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load `config.yaml`, resolve policies, then discover and compose all
    /// layers.
    pub fn merge(&self) -> Result<ConfigDocument> {
        let project_path = self
            .root
            .join(format!("{PROJECT_CONFIG}.{DOCUMENT_EXTENSION}"));
        let project = ProjectConfig::load_or_default(&project_path)?;
        let policies = PolicySet::new(project.bob_minimum_version, project.policies);

        let options = DiscoveryOptions {
            user_configs: self.user_configs.clone(),
            behavior: policies.behavior(),
        };
        let layers = discover_layers(&self.root, &options)?;
        tracing::debug!("composing {} config layer(s)", layers.len());

        let mut composed = compose_layers(&layers, policies);
        if project_path.is_file() {
            composed.source_files.insert(0, project_path);
        }
        Ok(composed)
    }
}
