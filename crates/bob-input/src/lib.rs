// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! bob-input - Recipe parsing and package graph generation
//!
//! This crate turns a project directory of declarative build recipes into a
//! fully resolved, deduplicated graph of packages. Each package carries a
//! checkout, build and package step whose variant identity is a content
//! hash over everything that may influence its output.
//!
//! # Overview
//!
//! A project consists of:
//!
//! - `config.yaml`: minimum tool version and explicit policy choices
//! - `default.yaml`: default environment and whitelist, optionally
//!   including or requiring further configuration documents
//! - `recipes/`: one recipe document per file (`foo/bar.yaml` is `foo::bar`)
//! - `classes/`: reusable recipe fragments referenced by `inherit`
//!
//! # Example
//!
//! ```yaml
//! # recipes/app.yaml
//! root: true
//! depends:
//!   - lib
//!   - name: toolchain
//!     use: [tools]
//! buildTools: [compiler]
//! buildVars: [CFLAGS]
//! buildScript: |
//!   make
//! ```

pub mod compose;
pub mod config;
pub mod discovery;
pub mod environment;
pub mod error;
pub mod package;
pub mod policy;
pub mod recipe;
pub mod recipe_set;
pub mod resolver;
pub mod scm;
pub mod store;
pub mod tool;
pub mod tree;
pub mod variant;
pub mod version;

#[cfg(test)]
mod fixtures;

pub use compose::{ConfigDocument, ConfigMerger};
pub use environment::Env;
pub use error::{Error, ErrorKind, Result};
pub use package::{DependencyEdge, Package, Step};
pub use policy::{Behavior, Policy, PolicySet};
pub use recipe::{Dependency, Recipe, StepKind, Use};
pub use recipe_set::RecipeSet;
pub use resolver::{GraphBuilder, PathFormatter};
pub use scm::Scm;
pub use store::RecipeStore;
pub use tool::{ToolBinding, ToolSet};
pub use tree::{PackageTree, TreeNode};
pub use variant::VariantId;
pub use version::Version;

/// Directory holding recipe documents.
pub const RECIPES_DIR: &str = "recipes";

/// Directory holding class documents.
pub const CLASSES_DIR: &str = "classes";

/// Name of the project default configuration document.
pub const DEFAULT_CONFIG: &str = "default";

/// Name of the project settings document.
pub const PROJECT_CONFIG: &str = "config";

/// Extension of every document.
pub const DOCUMENT_EXTENSION: &str = "yaml";
