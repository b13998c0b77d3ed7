// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `bob ls` command.

use std::collections::BTreeMap;

use bob_input::TreeNode;
use clap::Args;
use colored::Colorize;
use miette::Result;

use crate::ProjectFlags;

const SEP_LAST: &str = "└── ";
const SEP_MIDDLE: &str = "├── ";
const INDENT_LAST: &str = "    ";
const INDENT_MIDDLE: &str = "│   ";

/// List packages
#[derive(Debug, Args)]
pub struct CmdLs {
    #[clap(flatten)]
    pub(crate) project: ProjectFlags,

    /// Sub-package to start listing from
    package: Option<String>,

    /// Show indirect dependencies too
    #[clap(short, long)]
    all: bool,

    /// Show origin of indirect dependencies
    #[clap(short, long)]
    origin: bool,

    /// Recursively display dependencies
    #[clap(short, long)]
    recursive: bool,

    /// Print the full path prefix for each package
    #[clap(short, long)]
    prefixed: bool,

    /// Enable sandboxing
    #[clap(long, conflicts_with = "no_sandbox")]
    sandbox: bool,

    /// Disable sandboxing
    #[clap(long)]
    no_sandbox: bool,
}

impl CmdLs {
    pub fn run(&mut self) -> Result<i32> {
        let recipes = self.project.load()?;
        let tree = recipes.generate_tree(&self.project.defines(), self.sandbox)?;

        let (roots, stack) = select(tree, self.package.as_deref())?;
        for line in self.render(&roots, &stack) {
            println!("{line}");
        }
        Ok(0)
    }

    fn render(&self, roots: &BTreeMap<String, TreeNode>, stack: &[String]) -> Vec<String> {
        let mut lines = Vec::new();
        if self.prefixed {
            self.show_prefixed(roots, stack, self.recursive, &mut lines);
        } else if self.recursive {
            lines.push(if stack.is_empty() {
                "/".to_string()
            } else {
                stack.join("/")
            });
            self.show_tree(roots, "", &mut lines);
        } else {
            self.show_prefixed(roots, &[], false, &mut lines);
        }
        lines
    }

    fn visible<'a>(&self, nodes: &'a BTreeMap<String, TreeNode>) -> Vec<(&'a String, &'a TreeNode)> {
        nodes
            .iter()
            .filter(|(_, node)| self.all || node.direct)
            .collect()
    }

    fn origin_suffix(&self, node: &TreeNode) -> String {
        match (&node.origin, self.origin) {
            (Some(origin), true) => format!(" {}", format!("({origin})").dimmed()),
            _ => String::new(),
        }
    }

    fn show_tree(&self, nodes: &BTreeMap<String, TreeNode>, prefix: &str, lines: &mut Vec<String>) {
        let visible = self.visible(nodes);
        let count = visible.len();
        for (i, (name, node)) in visible.into_iter().enumerate() {
            let last = i + 1 == count;
            lines.push(format!(
                "{prefix}{}{name}{}",
                if last { SEP_LAST } else { SEP_MIDDLE },
                self.origin_suffix(node)
            ));
            let indent = if last { INDENT_LAST } else { INDENT_MIDDLE };
            self.show_tree(&node.children, &format!("{prefix}{indent}"), lines);
        }
    }

    fn show_prefixed(
        &self,
        nodes: &BTreeMap<String, TreeNode>,
        stack: &[String],
        recurse: bool,
        lines: &mut Vec<String>,
    ) {
        for (name, node) in self.visible(nodes) {
            let mut path = stack.to_vec();
            path.push(name.clone());
            lines.push(format!("{}{}", path.join("/"), self.origin_suffix(node)));
            if recurse {
                self.show_prefixed(&node.children, &path, recurse, lines);
            }
        }
    }
}

/// Descend into the sub-tree named by a `/` separated package path.
fn select(
    mut nodes: BTreeMap<String, TreeNode>,
    package: Option<&str>,
) -> Result<(BTreeMap<String, TreeNode>, Vec<String>)> {
    let mut stack = Vec::new();
    for step in package.unwrap_or_default().split('/').filter(|s| !s.is_empty()) {
        let node = nodes.remove(step).ok_or_else(|| bob_input::Error::PackageNotFound {
            name: step.to_string(),
            under: format!("/{}", stack.join("/")),
        })?;
        stack.push(step.to_string());
        nodes = node.children;
    }
    Ok((nodes, stack))
}
