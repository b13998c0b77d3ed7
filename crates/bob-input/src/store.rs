// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Loading of all recipes of a project.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use crate::config::load_document;
use crate::recipe::{Recipe, RecipeDocument};
use crate::{CLASSES_DIR, DOCUMENT_EXTENSION, Error, RECIPES_DIR, Result};

#[cfg(test)]
#[path = "./store_test.rs"]
mod store_test;

/// All recipes of a project, by name.
#[derive(Debug, Clone, Default)]
pub struct RecipeStore {
    recipes: BTreeMap<String, Arc<Recipe>>,
}

impl RecipeStore {
    /// Parse every recipe below `<root>/recipes`.
    ///
    /// Recipe names are the relative file paths without extension, with
    /// directories joined by `::`. `multiPackage` documents expand into
    /// one recipe per variant and `inherit` pulls in documents from
    /// `<root>/classes`.
    pub fn load(root: &Path) -> Result<Self> {
        let recipes_dir = root.join(RECIPES_DIR);
        if !recipes_dir.is_dir() {
            return Err(Error::RecipesDirNotFound(recipes_dir));
        }

        let mut classes = ClassLoader::new(root.join(CLASSES_DIR));
        let mut store = Self::default();

        for entry in WalkDir::new(&recipes_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&recipes_dir).to_path_buf();
                Error::read_failed(path, e.into())
            })?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXTENSION)
            {
                continue;
            }

            let base_name = recipe_name(&recipes_dir, path);
            tracing::debug!("loading recipe {base_name} from {}", path.display());
            let doc: RecipeDocument = load_document(path)?;

            for (name, variant) in expand_variants(base_name, doc) {
                let mut sources = vec![path.to_path_buf()];
                let doc = classes.apply(&variant, &name, &mut sources)?;
                let recipe = Recipe::from_document(name.clone(), doc, sources)?;
                store.insert(name, recipe)?;
            }
        }

        tracing::debug!("loaded {} recipe(s)", store.recipes.len());
        Ok(store)
    }

    fn insert(&mut self, name: String, recipe: Recipe) -> Result<()> {
        if let Some(existing) = self.recipes.get(&name) {
            return Err(Error::DuplicateRecipe {
                name,
                first: existing.source().map(Path::to_path_buf).unwrap_or_default(),
                second: recipe.source().map(Path::to_path_buf).unwrap_or_default(),
            });
        }
        self.recipes.insert(name, Arc::new(recipe));
        Ok(())
    }

    pub fn get_recipe(&self, name: &str) -> Option<&Arc<Recipe>> {
        self.recipes.get(name)
    }

    /// Recipe file followed by all class files the recipe inherits.
    pub fn get_sources(&self, name: &str) -> Option<&[PathBuf]> {
        self.recipes.get(name).map(|r| r.sources())
    }

    /// All recipes sorted by name.
    pub fn recipes(&self) -> impl Iterator<Item = &Arc<Recipe>> {
        self.recipes.values()
    }

    /// Recipes flagged with `root: true`, sorted by name.
    pub fn root_recipes(&self) -> impl Iterator<Item = &Arc<Recipe>> {
        self.recipes.values().filter(|r| r.is_root())
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

/// `recipes/foo/bar.yaml` is named `foo::bar`.
fn recipe_name(recipes_dir: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(recipes_dir).unwrap_or(path);
    let relative = relative.with_extension("");
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("::")
}

/// Split a `multiPackage` document into its named variants.
///
/// The empty variant keeps the base name, every other variant is named
/// `base-variant`. Variants may nest.
fn expand_variants(name: String, mut doc: RecipeDocument) -> Vec<(String, RecipeDocument)> {
    if doc.multi_package.is_empty() {
        return vec![(name, doc)];
    }

    let variants = std::mem::take(&mut doc.multi_package);
    let mut expanded = Vec::new();
    for (suffix, variant) in variants {
        let variant_name = if suffix.is_empty() {
            name.clone()
        } else {
            format!("{name}-{suffix}")
        };
        expanded.extend(expand_variants(variant_name, doc.overlay(&variant)));
    }
    expanded
}

/// Lazily loaded class documents.
struct ClassLoader {
    dir: PathBuf,
    loaded: HashMap<String, (Arc<RecipeDocument>, PathBuf)>,
}

impl ClassLoader {
    fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            loaded: HashMap::new(),
        }
    }

    fn load(&mut self, class: &str, needed_by: &str) -> Result<(Arc<RecipeDocument>, PathBuf)> {
        if let Some(found) = self.loaded.get(class) {
            return Ok(found.clone());
        }

        let rel = format!("{}.{DOCUMENT_EXTENSION}", class.replace("::", "/"));
        let path = self.dir.join(rel);
        if !path.is_file() {
            return Err(Error::UnknownClass {
                class: class.to_string(),
                needed_by: needed_by.to_string(),
            });
        }

        tracing::debug!("loading class {class} from {}", path.display());
        let doc: RecipeDocument = load_document(&path)?;
        if !doc.multi_package.is_empty() {
            return Err(Error::InvalidRecipe {
                recipe: class.to_string(),
                message: "classes cannot declare multiPackage".to_string(),
            });
        }
        let found = (Arc::new(doc), path);
        self.loaded.insert(class.to_string(), found.clone());
        Ok(found)
    }

    /// Resolve the inheritance chain of a recipe document.
    fn apply(&mut self, doc: &RecipeDocument, name: &str, sources: &mut Vec<PathBuf>) -> Result<RecipeDocument> {
        let mut chain = vec![name.to_string()];
        self.apply_chain(doc, &mut chain, sources)
    }

    fn apply_chain(
        &mut self,
        doc: &RecipeDocument,
        chain: &mut Vec<String>,
        sources: &mut Vec<PathBuf>,
    ) -> Result<RecipeDocument> {
        let needed_by = chain.last().cloned().unwrap_or_default();
        let mut merged = RecipeDocument::default();

        for class in &doc.inherit {
            if chain[1..].contains(class) {
                let mut cycle = chain.clone();
                cycle.push(class.clone());
                return Err(Error::ClassCycle { chain: cycle });
            }

            let (class_doc, path) = self.load(class, &needed_by)?;
            if !sources.contains(&path) {
                sources.push(path);
            }

            chain.push(class.clone());
            let resolved = self.apply_chain(&class_doc, chain, sources)?;
            chain.pop();

            merged = merged.overlay(&resolved);
        }

        let mut own = doc.clone();
        own.inherit.clear();
        Ok(merged.overlay(&own))
    }
}
