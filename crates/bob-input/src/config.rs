// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Configuration document parsing.
//!
//! Two kinds of documents exist. The project's `config.yaml` pins the
//! minimum tool version and policies. Every other configuration document
//! (`default.yaml`, the files it includes or requires, and user supplied
//! config files) is a [`LayerSpec`] contributing environment defaults and
//! whitelist entries.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::environment::Env;
use crate::policy::PolicySettings;
use crate::version::Version;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./config_test.rs"]
mod config_test;

/// Project settings from `config.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Oldest tool version the project supports; activates policies.
    #[serde(default)]
    pub bob_minimum_version: Option<Version>,

    /// Explicit policy choices.
    #[serde(default)]
    pub policies: PolicySettings,
}

impl ProjectConfig {
    /// Load `config.yaml`, returning defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.is_file() {
            tracing::debug!("no project config at {}", path.display());
            return Ok(Self::default());
        }
        load_document(path)
    }
}

/// One layer of the merged configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerSpec {
    /// Optional documents overriding this one.
    #[serde(default)]
    pub include: Vec<String>,

    /// Mandatory documents overriding this one, below any include.
    #[serde(default)]
    pub require: Vec<String>,

    /// Default environment of all root packages.
    #[serde(default)]
    pub environment: Env,

    /// Host variables passed through to the execution layer.
    #[serde(default)]
    pub whitelist: Vec<String>,

    /// Path to the file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl LayerSpec {
    /// Parse a layer from a YAML string.
    pub fn from_yaml<S: AsRef<str>>(yaml: S, path: &Path) -> Result<Self> {
        parse_document(yaml.as_ref(), path)
    }

    /// Load a layer from a file path.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut spec: Self = load_document(path)?;
        spec.source_path = Some(path.to_path_buf());
        Ok(spec)
    }

    /// Directory of the file this layer was loaded from.
    pub fn base_dir(&self) -> Option<&Path> {
        self.source_path.as_deref().and_then(Path::parent)
    }
}

/// Read and parse any YAML document into `T`.
pub(crate) fn load_document<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    let yaml = std::fs::read_to_string(path).map_err(|e| Error::read_failed(path, e))?;
    parse_document(&yaml, path)
}

/// Two stage parse: syntax first, then schema.
///
/// An empty document yields the schema's default value.
pub(crate) fn parse_document<T>(yaml: &str, path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    let value: serde_yaml::Value = serde_yaml::from_str(yaml).map_err(|e| Error::InvalidYaml {
        path: path.to_path_buf(),
        error: Arc::new(e),
    })?;

    if value.is_null() {
        return Ok(T::default());
    }

    serde_yaml::from_value(value).map_err(|e| Error::Schema {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
