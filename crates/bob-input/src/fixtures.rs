// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Temporary project directories for tests.

use std::path::Path;

use tempfile::TempDir;

use crate::environment::Env;
use crate::recipe::StepKind;
use crate::recipe_set::RecipeSet;
use crate::tree::PackageTree;

/// A project root with an empty `recipes` directory.
pub(crate) struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::create_dir(dir.path().join("recipes")).expect("Failed to create recipes dir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file relative to the project root.
    pub fn write(&self, rel: &str, content: &str) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    pub fn write_recipe(&self, name: &str, content: &str) {
        self.write(&format!("recipes/{name}.yaml"), content);
    }

    pub fn write_class(&self, name: &str, content: &str) {
        self.write(&format!("classes/{name}.yaml"), content);
    }

    pub fn write_config(&self, content: &str) {
        self.write("config.yaml", content);
    }

    pub fn recipe_set(&self) -> RecipeSet {
        RecipeSet::parse(self.path(), &[]).expect("Failed to parse project")
    }

    pub fn generate(&self) -> PackageTree {
        self.recipe_set()
            .generate_packages(&unused_path, &Env::new())
    }
}

pub(crate) fn unused_path(_stack: &[String], _kind: StepKind) -> String {
    "unused".to_string()
}
