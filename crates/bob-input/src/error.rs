// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for recipe parsing and package resolution.

use std::path::PathBuf;
use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;

/// Convenience Result type with the crate Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Static inconsistency found without running any build.
    Parse,
    /// A query named something that does not exist in the package tree.
    Lookup,
}

/// Errors that can occur while parsing recipes or resolving packages.
///
/// Errors are cheap to clone so that a failed resolution can be reported
/// again on every access to the package tree.
#[derive(Error, Diagnostic, Debug, Clone)]
pub enum Error {
    /// The project has no recipes directory
    #[error("No recipes directory found at {0:?}")]
    #[diagnostic(
        code(bob::no_recipes),
        help("Run the command from the project root or create a 'recipes' directory")
    )]
    RecipesDirNotFound(PathBuf),

    /// Document is not valid YAML
    #[error("Invalid YAML in {path:?}: {error}")]
    #[diagnostic(code(bob::invalid_yaml), help("Check the YAML syntax of the document"))]
    InvalidYaml {
        path: PathBuf,
        #[source]
        error: Arc<serde_yaml::Error>,
    },

    /// Document does not match its schema
    #[error("Invalid document {path:?}: {message}")]
    #[diagnostic(code(bob::schema))]
    Schema { path: PathBuf, message: String },

    /// Failed to read file
    #[error("Failed to read file: {path:?}")]
    #[diagnostic(code(bob::read_failed))]
    ReadFailed {
        path: PathBuf,
        #[source]
        error: Arc<std::io::Error>,
    },

    /// A `require`d configuration file does not exist
    #[error("Required config file not found: {path:?} (required by {required_by:?})")]
    #[diagnostic(
        code(bob::require_not_found),
        help("Use 'include' instead of 'require' if the file is optional")
    )]
    RequireNotFound { path: PathBuf, required_by: PathBuf },

    /// A user config file given on the command line does not exist
    #[error("User config file not found: {0:?}")]
    #[diagnostic(code(bob::user_config_not_found))]
    UserConfigNotFound(PathBuf),

    /// Circular include or require detected
    #[error("Circular include detected: {0:?}")]
    #[diagnostic(
        code(bob::circular_include),
        help("Remove the circular reference in your includes")
    )]
    CircularInclude(PathBuf),

    /// Two documents define the same recipe
    #[error("Duplicate definition of recipe '{name}' in {first:?} and {second:?}")]
    #[diagnostic(code(bob::duplicate_recipe))]
    DuplicateRecipe {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Class referenced by `inherit` does not exist
    #[error("Class '{class}' inherited by '{needed_by}' not found")]
    #[diagnostic(code(bob::unknown_class))]
    UnknownClass { class: String, needed_by: String },

    /// Classes inherit from each other
    #[error("Cyclic class inheritance: {}", chain.join(" -> "))]
    #[diagnostic(code(bob::class_cycle))]
    ClassCycle { chain: Vec<String> },

    /// Recipe failed validation
    #[error("Invalid recipe '{recipe}': {message}")]
    #[diagnostic(code(bob::invalid_recipe))]
    InvalidRecipe { recipe: String, message: String },

    /// Dependency names a recipe that does not exist
    #[error("Recipe '{name}' not found (needed by '{needed_by}')")]
    #[diagnostic(code(bob::unknown_recipe))]
    UnknownRecipe { name: String, needed_by: String },

    /// Substitution of an unset variable without a default
    #[error("Undefined variable '{name}' in {context}")]
    #[diagnostic(
        code(bob::undefined_variable),
        help("Define the variable or use '${{{}:-default}}'", name)
    )]
    UndefinedVariable { name: String, context: String },

    /// Malformed substitution expression
    #[error("Bad substitution '{text}' in {context}: {message}")]
    #[diagnostic(code(bob::bad_substitution))]
    BadSubstitution {
        text: String,
        context: String,
        message: String,
    },

    /// Dependency cycle in the recipe graph
    #[error("Dependency cycle detected: {}", chain.join(" -> "))]
    #[diagnostic(code(bob::cycle), help("Break the cycle or guard one of the dependencies"))]
    Cycle { chain: Vec<String> },

    /// Same dependency name resolved to different variants for one consumer
    #[error("Incompatible variants of dependency '{name}' in package '{consumer}'")]
    #[diagnostic(
        code(bob::incompatible_variant),
        help("All dependencies named '{}' of one package must resolve to the same variant", name)
    )]
    IncompatibleVariant { name: String, consumer: String },

    /// Two tools define the same variable with different values
    #[error(
        "Tools '{first}' and '{second}' of '{recipe}' define '{key}' differently"
    )]
    #[diagnostic(code(bob::tool_env_conflict))]
    ToolEnvConflict {
        recipe: String,
        key: String,
        first: String,
        second: String,
    },

    /// Requested tool is not provided by any dependency
    #[error("Tool '{tool}' requested by '{recipe}' is not available")]
    #[diagnostic(
        code(bob::unknown_tool),
        help("Add a dependency providing the tool with 'use: [tools]'")
    )]
    UnknownTool { tool: String, recipe: String },

    /// Package path segment not found
    #[error("Package '{name}' not found under '{under}'")]
    #[diagnostic(code(bob::package_not_found))]
    PackageNotFound { name: String, under: String },
}

impl Error {
    /// The class of failure this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::PackageNotFound { .. } => ErrorKind::Lookup,
            _ => ErrorKind::Parse,
        }
    }

    /// Whether this is a static inconsistency of the recipes or configuration.
    pub fn is_parse_error(&self) -> bool {
        self.kind() == ErrorKind::Parse
    }

    pub(crate) fn read_failed(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Error::ReadFailed {
            path: path.into(),
            error: Arc::new(error),
        }
    }
}
