// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! bob - query the package graph of a recipe project

use std::path::PathBuf;

use bob_input::{Env, RecipeSet};
use clap::{Parser, Subcommand};
use miette::Result;

mod cmd_ls;
mod cmd_query_recipe;
mod cmd_query_scm;

use cmd_ls::CmdLs;
use cmd_query_recipe::CmdQueryRecipe;
use cmd_query_scm::CmdQueryScm;

#[derive(Parser)]
#[clap(
    name = "bob",
    about = "Recipe driven build graph generator",
    version,
    long_about = "Resolve the recipes of a project into packages and query the result"
)]
struct Opt {
    #[clap(flatten)]
    logging: Logging,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Parser)]
struct Logging {
    /// Increase verbosity (-v, -vv, -vvv)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[clap(short, long)]
    quiet: bool,
}

/// Options selecting and configuring the project.
#[derive(Parser, Clone, Debug, Default)]
pub struct ProjectFlags {
    /// Project root directory
    #[clap(short = 'C', long = "directory", default_value = ".", env = "BOB_ROOT")]
    pub directory: PathBuf,

    /// Override default environment variable
    #[clap(short = 'D', value_name = "NAME[=VALUE]", value_parser = parse_define)]
    pub defines: Vec<(String, String)>,

    /// Use config file (without extension, relative to the project root)
    #[clap(short = 'c', value_name = "CONFIG")]
    pub configs: Vec<String>,
}

impl ProjectFlags {
    /// Parse configuration and recipes of the project.
    pub fn load(&self) -> Result<RecipeSet> {
        Ok(RecipeSet::parse(&self.directory, &self.configs)?)
    }

    pub fn defines(&self) -> Env {
        self.defines.iter().cloned().collect()
    }
}

/// `NAME` defines an empty variable, `NAME=VALUE` sets it.
fn parse_define(define: &str) -> std::result::Result<(String, String), String> {
    let mut parts = define.split('=');
    let name = parts.next().unwrap_or_default();
    let value = parts.next().unwrap_or_default();
    if name.is_empty() || parts.next().is_some() {
        return Err(format!("Malformed define: {define}"));
    }
    Ok((name.to_string(), value.to_string()))
}

#[derive(Subcommand)]
enum Command {
    /// List packages
    Ls(CmdLs),

    /// Query SCM configuration of packages
    QueryScm(CmdQueryScm),

    /// Query recipe and class files of a package
    QueryRecipe(CmdQueryRecipe),
}

impl Opt {
    fn run(self) -> Result<i32> {
        // Setup logging
        let log_level = match (self.logging.quiet, self.logging.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::WARN,
            (false, 1) => tracing::Level::INFO,
            (false, 2) => tracing::Level::DEBUG,
            (false, _) => tracing::Level::TRACE,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .init();

        // Dispatch to command
        match self.cmd {
            Command::Ls(mut cmd) => cmd.run(),
            Command::QueryScm(mut cmd) => cmd.run(),
            Command::QueryRecipe(mut cmd) => cmd.run(),
        }
    }
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    let code = opt.run()?;
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("FOO=bar", "FOO", "bar")]
    #[case("FOO=", "FOO", "")]
    #[case("FOO", "FOO", "")]
    fn test_parse_define(#[case] define: &str, #[case] name: &str, #[case] value: &str) {
        let (n, v) = parse_define(define).unwrap();
        assert_eq!(n, name);
        assert_eq!(v, value);
    }

    #[rstest]
    #[case("A=b=c")]
    #[case("=value")]
    fn test_parse_define_malformed(#[case] define: &str) {
        assert!(parse_define(define).is_err());
    }

    #[rstest]
    fn test_cli_parses() {
        let opt = Opt::try_parse_from([
            "bob", "-v", "ls", "-C", "/project", "-D", "A=1", "-c", "user", "-ar", "app",
        ])
        .unwrap();
        assert_eq!(opt.logging.verbose, 1);
        match opt.cmd {
            Command::Ls(cmd) => {
                assert_eq!(cmd.project.directory, PathBuf::from("/project"));
                assert_eq!(cmd.project.defines().get("A").unwrap(), "1");
                assert_eq!(cmd.project.configs, ["user"]);
            }
            _ => panic!("Expected ls"),
        }
    }
}
