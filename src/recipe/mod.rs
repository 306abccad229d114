mod resolve;
mod set;

pub use set::RecipeSet;

use std::{collections::BTreeMap, path::PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;

use crate::{
    env::{Env, Scalar, scalars, substitute},
    error::RecipeError,
    scm::{ScmKind, ScmSpec},
};

/// A recipe with all of its classes merged in.
#[derive(Debug, Clone)]
pub struct Recipe {
    pub name: String,
    /// Recipes marked as root become the root aliases of the graph
    pub root: bool,
    /// Defaults, only applied to variables that aren't set yet
    pub environment: Env,
    /// Values the variables must have for this recipe
    pub fixed_environment: Env,
    pub depends: Vec<Dependency>,
    pub provide_deps: Vec<String>,
    provides: GlobSet,
    pub checkout_vars: Vec<String>,
    checkout_scm: Vec<RawScm>,
    pub meta_environment: Env,
    /// Class files in inheritance order, then the recipe file itself
    pub sources: Vec<PathBuf>,
}

impl Recipe {
    /// Whether a dependency named `name` is handed down to parents.
    #[must_use]
    pub fn provides(&self, name: &str) -> bool {
        self.provides.is_match(name)
    }

    /// Substitute the checkout environment into the declared SCMs.
    ///
    /// # Errors
    ///
    /// - A SCM refers to a variable not in the checkout environment
    /// - A SCM is invalid after substitution
    pub fn checkout_scms(&self, checkout_env: &Env) -> Result<Vec<ScmSpec>, RecipeError> {
        self.checkout_scm
            .iter()
            .map(|raw| raw.instantiate(&self.name, checkout_env))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    /// Overrides for the dependency, substituted from the parent's environment
    pub environment: Env,
}

/// On-disk form shared by recipes and classes.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct RecipeFile {
    #[serde(default)]
    root: bool,
    #[serde(default)]
    inherit: Vec<String>,
    #[serde(default)]
    environment: BTreeMap<String, Scalar>,
    #[serde(default)]
    fixed_environment: BTreeMap<String, Scalar>,
    #[serde(default)]
    depends: Vec<DependencyEntry>,
    #[serde(default)]
    provide_deps: Vec<String>,
    #[serde(default)]
    checkout_vars: Vec<String>,
    #[serde(default, rename = "checkoutSCM")]
    checkout_scm: OneOrMany<RawScm>,
    #[serde(default)]
    meta_environment: BTreeMap<String, Scalar>,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum DependencyEntry {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        environment: BTreeMap<String, Scalar>,
    },
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    fn as_slice(&self) -> &[T] {
        match self {
            Self::One(one) => std::slice::from_ref(one),
            Self::Many(many) => many,
        }
    }
}

/// SCM as written in the recipe, before substitution.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct RawScm {
    scm: ScmKind,
    url: Option<Scalar>,
    branch: Option<Scalar>,
    tag: Option<Scalar>,
    commit: Option<Scalar>,
    revision: Option<Scalar>,
    cvsroot: Option<Scalar>,
    module: Option<Scalar>,
    file_name: Option<Scalar>,
    dir: Option<Scalar>,
    #[serde(flatten)]
    extra: BTreeMap<String, Scalar>,
}

impl RawScm {
    fn instantiate(&self, recipe: &str, env: &Env) -> Result<ScmSpec, RecipeError> {
        let field = |value: &Option<Scalar>| -> Result<Option<String>, RecipeError> {
            value
                .as_ref()
                .map(|Scalar(template)| substitute(recipe, template, env))
                .transpose()
        };

        let spec = ScmSpec {
            kind: self.scm,
            url: field(&self.url)?,
            branch: field(&self.branch)?,
            tag: field(&self.tag)?,
            commit: field(&self.commit)?,
            revision: field(&self.revision)?,
            cvsroot: field(&self.cvsroot)?,
            module: field(&self.module)?,
            file_name: field(&self.file_name)?,
            dir: field(&self.dir)?.unwrap_or_else(|| ".".to_string()),
            extra: self
                .extra
                .iter()
                .map(|(key, Scalar(template))| {
                    Ok((key.clone(), substitute(recipe, template, env)?))
                })
                .collect::<Result<_, RecipeError>>()?,
        };

        spec.validated().map_err(|reason| RecipeError::InvalidScm {
            recipe: recipe.to_string(),
            scm: self.scm.to_string(),
            reason,
        })
    }
}

/// Accumulates a recipe from its classes and its own file.
#[derive(Debug, Default)]
struct RecipeBuilder {
    environment: Env,
    fixed_environment: Env,
    depends: Vec<Dependency>,
    provide_deps: Vec<String>,
    checkout_vars: Vec<String>,
    checkout_scm: Vec<RawScm>,
    meta_environment: Env,
    sources: Vec<PathBuf>,
}

impl RecipeBuilder {
    /// Layer `file` on top. Maps are overridden key by key, lists are appended.
    fn merge(&mut self, file: &RecipeFile, source: PathBuf) {
        self.environment.extend(scalars(file.environment.clone()));
        self.fixed_environment
            .extend(scalars(file.fixed_environment.clone()));
        self.meta_environment
            .extend(scalars(file.meta_environment.clone()));

        self.depends.extend(file.depends.iter().map(|entry| match entry {
            DependencyEntry::Name(name) => Dependency {
                name: name.clone(),
                environment: Env::new(),
            },
            DependencyEntry::Detailed { name, environment } => Dependency {
                name: name.clone(),
                environment: scalars(environment.clone()),
            },
        }));
        self.provide_deps.extend(file.provide_deps.iter().cloned());
        for var in &file.checkout_vars {
            if !self.checkout_vars.contains(var) {
                self.checkout_vars.push(var.clone());
            }
        }
        self.checkout_scm
            .extend(file.checkout_scm.as_slice().iter().cloned());

        self.sources.push(source);
    }

    fn finish(self, name: String, root: bool) -> Result<Recipe, RecipeError> {
        let mut provides = GlobSetBuilder::new();
        for pattern in &self.provide_deps {
            let glob = Glob::new(pattern).map_err(|source| RecipeError::InvalidPattern {
                recipe: name.clone(),
                pattern: pattern.clone(),
                source,
            })?;
            provides.add(glob);
        }
        let provides = provides
            .build()
            .map_err(|source| RecipeError::InvalidPattern {
                recipe: name.clone(),
                pattern: self.provide_deps.join(", "),
                source,
            })?;

        Ok(Recipe {
            name,
            root,
            environment: self.environment,
            fixed_environment: self.fixed_environment,
            depends: self.depends,
            provide_deps: self.provide_deps,
            provides,
            checkout_vars: self.checkout_vars,
            checkout_scm: self.checkout_scm,
            meta_environment: self.meta_environment,
            sources: self.sources,
        })
    }
}
