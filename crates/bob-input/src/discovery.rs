// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Discovery of configuration layers through `include` and `require`.

use std::path::{Path, PathBuf};

#[cfg(test)]
#[path = "./discovery_test.rs"]
mod discovery_test;

use crate::config::LayerSpec;
use crate::policy::Behavior;
use crate::{DEFAULT_CONFIG, DOCUMENT_EXTENSION, Error, Result};

/// Options for layer discovery.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    /// User config files, lowest to highest precedence.
    pub user_configs: Vec<String>,

    /// Resolved policies of the project.
    pub behavior: Behavior,
}

/// Discover all configuration layers of a project.
///
/// Returns layers in composition order: later layers override earlier ones.
pub fn discover_layers<P: AsRef<Path>>(
    project_root: P,
    options: &DiscoveryOptions,
) -> Result<Vec<LayerSpec>> {
    let root = project_root.as_ref();
    let mut walker = LayerWalker {
        root,
        behavior: options.behavior,
        active: Vec::new(),
        layers: Vec::new(),
    };

    // Step 1: the project defaults, if present
    let default_path = document_path(root, DEFAULT_CONFIG);
    if default_path.is_file() {
        walker.expand(&default_path)?;
    }

    // Step 2: user configs override everything from the project
    for name in &options.user_configs {
        let path = resolve_document_path(name, root)?;
        if !path.is_file() {
            return Err(Error::UserConfigNotFound(path));
        }
        walker.expand(&path)?;
    }

    Ok(walker.layers)
}

struct LayerWalker<'a> {
    root: &'a Path,
    behavior: Behavior,
    /// Documents currently being expanded, to catch circular includes.
    active: Vec<PathBuf>,
    layers: Vec<LayerSpec>,
}

impl LayerWalker<'_> {
    /// Push a document and everything it references in precedence order:
    /// the document itself, then its requires, then its includes.
    fn expand(&mut self, path: &Path) -> Result<()> {
        let canonical = dunce::canonicalize(path).map_err(|e| Error::read_failed(path, e))?;
        if self.active.contains(&canonical) {
            return Err(Error::CircularInclude(canonical));
        }

        tracing::debug!("loading config layer {}", canonical.display());
        let spec = LayerSpec::load(&canonical)?;
        let base_dir = if self.behavior.relative_includes {
            spec.base_dir().unwrap_or(self.root).to_path_buf()
        } else {
            self.root.to_path_buf()
        };
        let requires = spec.require.clone();
        let includes = spec.include.clone();

        self.active.push(canonical.clone());
        self.layers.push(spec);

        for name in &requires {
            let target = resolve_document_path(name, &base_dir)?;
            if !target.is_file() {
                return Err(Error::RequireNotFound {
                    path: target,
                    required_by: canonical,
                });
            }
            self.expand(&target)?;
        }

        for name in &includes {
            let target = resolve_document_path(name, &base_dir)?;
            if !target.is_file() {
                tracing::debug!(
                    "skipping missing include {} of {}",
                    target.display(),
                    canonical.display()
                );
                continue;
            }
            self.expand(&target)?;
        }

        self.active.pop();
        Ok(())
    }
}

/// Path of a document named without extension inside `dir`.
fn document_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.{DOCUMENT_EXTENSION}"))
}

/// Resolve a document reference (absolute, home-relative or relative).
///
/// The document extension is appended unless already present.
fn resolve_document_path(reference: &str, base_dir: &Path) -> Result<PathBuf> {
    let with_ext = if reference.ends_with(&format!(".{DOCUMENT_EXTENSION}")) {
        reference.to_string()
    } else {
        format!("{reference}.{DOCUMENT_EXTENSION}")
    };

    let path = if let Some(rel) = with_ext.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or_else(|| Error::Schema {
            path: PathBuf::from(reference),
            message: "Cannot resolve ~ without HOME".to_string(),
        })?;
        home.join(rel)
    } else if Path::new(&with_ext).is_absolute() {
        PathBuf::from(with_ext)
    } else {
        base_dir.join(with_ext)
    };

    Ok(path)
}
