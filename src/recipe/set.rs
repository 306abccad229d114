use std::{
    collections::{BTreeMap, HashSet},
    fs,
    path::{Path, PathBuf},
};

use walkdir::WalkDir;

use super::{Recipe, RecipeBuilder, RecipeFile};
use crate::error::RecipeError;

type Files = BTreeMap<String, (PathBuf, RecipeFile)>;

/// Every recipe of a project, with its classes merged in.
#[derive(Debug, Clone, Default)]
pub struct RecipeSet {
    recipes: BTreeMap<String, Recipe>,
}

impl RecipeSet {
    /// Load `recipes/` and `classes/` below `project_root`. Either may be
    /// missing.
    ///
    /// # Errors
    ///
    /// - A file can't be read or isn't valid YAML
    /// - A class is not defined, or classes inherit each other in a loop
    /// - A `provideDeps` pattern is invalid
    pub fn load(project_root: &Path) -> Result<Self, RecipeError> {
        let classes = read_files(&project_root.join("classes"))?;
        let recipes = read_files(&project_root.join("recipes"))?;

        let mut set = Self::default();
        for (name, (path, file)) in recipes {
            let mut builder = RecipeBuilder::default();
            let mut applied = HashSet::new();
            for class in &file.inherit {
                apply_class(&classes, class, &name, &mut builder, &mut applied, &mut Vec::new())?;
            }
            builder.merge(&file, path);

            let recipe = builder.finish(name.clone(), file.root)?;
            log::debug!(
                "loaded recipe {name} from {} file(s)",
                recipe.sources.len()
            );
            set.recipes.insert(name, recipe);
        }

        Ok(set)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Recipe> {
        self.recipes.get(name)
    }

    /// Recipes sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values()
    }

    /// Names of the recipes marked as root, sorted.
    pub fn root_names(&self) -> impl Iterator<Item = &str> {
        self.recipes
            .values()
            .filter(|recipe| recipe.root)
            .map(|recipe| recipe.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

/// Merge `class` and everything it inherits into `builder`, parents first.
/// A class reached twice is merged only the first time.
fn apply_class(
    classes: &Files,
    class: &str,
    owner: &str,
    builder: &mut RecipeBuilder,
    applied: &mut HashSet<String>,
    active: &mut Vec<String>,
) -> Result<(), RecipeError> {
    if active.iter().any(|c| c == class) {
        let mut chain = active.clone();
        chain.push(class.to_string());
        return Err(RecipeError::ClassCycle(chain.join(" -> ")));
    }
    if applied.contains(class) {
        return Ok(());
    }

    let (path, file) = classes
        .get(class)
        .ok_or_else(|| RecipeError::UndefinedClass {
            owner: owner.to_string(),
            class: class.to_string(),
        })?;

    active.push(class.to_string());
    for parent in &file.inherit {
        apply_class(classes, parent, class, builder, applied, active)?;
    }
    active.pop();

    builder.merge(file, path.clone());
    applied.insert(class.to_string());

    Ok(())
}

/// Read every `*.yaml` below `dir`, keyed by name (`a/b.yaml` is `a::b`).
fn read_files(dir: &Path) -> Result<Files, RecipeError> {
    let mut files = Files::new();
    if !dir.is_dir() {
        return Ok(files);
    }

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "yaml") {
            continue;
        }
        let Ok(relative) = path.strip_prefix(dir) else {
            continue;
        };

        let name = relative
            .with_extension("")
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("::");

        let contents = fs::read_to_string(path).map_err(|source| RecipeError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file = if contents.trim().is_empty() {
            RecipeFile::default()
        } else {
            serde_yaml::from_str(&contents).map_err(|source| RecipeError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        };

        log::trace!("read {name} from {}", path.display());
        files.insert(name, (path.to_path_buf(), file));
    }

    Ok(files)
}
