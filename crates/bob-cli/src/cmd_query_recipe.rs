// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `bob query-recipe` command.

use clap::Args;
use colored::Colorize;
use miette::Result;

use crate::ProjectFlags;

/// Query recipe and class files of a package
#[derive(Debug, Args)]
pub struct CmdQueryRecipe {
    #[clap(flatten)]
    pub(crate) project: ProjectFlags,

    /// (Sub-)package to query
    package: String,
}

impl CmdQueryRecipe {
    pub fn run(&mut self) -> Result<i32> {
        let recipes = self.project.load()?;
        let formatter = |_: &[String], _: bob_input::StepKind| String::new();
        let packages = recipes.generate_packages(&formatter, &self.project.defines());
        let package = packages.walk_package_path(&self.package)?;

        let sources = package.recipe().sources();
        if sources.is_empty() {
            tracing::warn!("{} has no recipe files", self.package.yellow());
        }
        for path in sources {
            println!("{}", path.display());
        }
        Ok(0)
    }
}
