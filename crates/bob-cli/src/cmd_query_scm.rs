// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `bob query-scm` command.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use bob_input::{Package, VariantId};
use clap::Args;
use miette::{Result, miette};

use crate::ProjectFlags;

const DEFAULT_FORMATS: [(&str, &str); 4] = [
    ("git", "git {package} {dir} {url} {branch}"),
    ("svn", "svn {package} {dir} {url} {revision}"),
    ("cvs", "cvs {package} {dir} {cvsroot} {module}"),
    ("url", "url {package} {dir}/{fileName} {url}"),
];

const FALLBACK_FORMAT: &str = "{scm} {dir}";

/// Query SCM configuration of packages
///
/// Prints one line for each SCM of the package. The line format of each
/// SCM kind can be changed with `-f`; `{name}` is replaced by the property
/// `name` of the SCM or by `{package}`, the path of the package.
#[derive(Debug, Args)]
pub struct CmdQueryScm {
    #[clap(flatten)]
    pub(crate) project: ProjectFlags,

    /// (Sub-)package to query
    package: String,

    /// Output format for an SCM kind (SCM=FORMAT), may be repeated
    #[clap(short = 'f', value_name = "SCM=FORMAT")]
    formats: Vec<String>,

    /// Default for missing attributes
    #[clap(long, default_value = "")]
    default: String,

    /// Recursively display dependencies
    #[clap(short, long)]
    recursive: bool,
}

impl CmdQueryScm {
    pub fn run(&mut self) -> Result<i32> {
        let formats = self.formats()?;
        let recipes = self.project.load()?;
        let packages = recipes.generate_packages(&unused_path, &self.project.defines());
        let package = packages.walk_package_path(&self.package)?;

        let mut done = HashSet::new();
        let mut lines = Vec::new();
        self.show_package(&package, &formats, &mut done, &mut lines);
        for line in lines {
            println!("{line}");
        }
        Ok(0)
    }

    fn formats(&self) -> Result<BTreeMap<String, String>> {
        let mut formats: BTreeMap<String, String> = DEFAULT_FORMATS
            .iter()
            .map(|(scm, fmt)| (scm.to_string(), fmt.to_string()))
            .collect();
        for entry in &self.formats {
            let mut parts = entry.split('=');
            let (Some(scm), Some(fmt), None) = (parts.next(), parts.next(), parts.next()) else {
                return Err(miette!("Malformed format: {entry}"));
            };
            formats.insert(scm.to_string(), fmt.to_string());
        }
        Ok(formats)
    }

    /// Print each recipe only once per checkout variant.
    fn show_package(
        &self,
        package: &Arc<Package>,
        formats: &BTreeMap<String, String>,
        done: &mut HashSet<(String, VariantId)>,
        lines: &mut Vec<String>,
    ) {
        let key = (
            package.name().to_string(),
            package.checkout_step().variant_id(),
        );
        if done.insert(key) {
            for scm in package.checkout_step().scm_list() {
                let mut props = scm.properties();
                props.insert("package".to_string(), package.stack().join("/"));
                let fmt = formats
                    .get(scm.kind())
                    .map(String::as_str)
                    .unwrap_or(FALLBACK_FORMAT);
                lines.push(format_properties(fmt, &props, &self.default));
            }
        }

        if self.recursive {
            for dep in package.direct_dependencies() {
                self.show_package(dep, formats, done, lines);
            }
        }
    }
}

fn unused_path(_stack: &[String], _kind: bob_input::StepKind) -> String {
    "unused".to_string()
}

/// Replace `{name}` placeholders with properties, `{{` and `}}` with
/// literal braces.
fn format_properties(fmt: &str, props: &BTreeMap<String, String>, default: &str) -> String {
    let mut out = String::with_capacity(fmt.len());
    let mut chars = fmt.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let name: String = chars.by_ref().take_while(|c| *c != '}').collect();
                out.push_str(props.get(&name).map(String::as_str).unwrap_or(default));
            }
            c => out.push(c),
        }
    }
    out
}
