//! Library error types.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Recipe(#[from] RecipeError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("failed to read config {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("config error in {path}: {source}")]
    Config {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Malformed or contradictory recipe input. Always aborts resolution.
#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to walk recipe directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("recipe {recipe}: dependency {dependency} is not defined")]
    UndefinedDependency { recipe: String, dependency: String },
    #[error("{owner}: class {class} is not defined")]
    UndefinedClass { owner: String, class: String },
    #[error("class inheritance is cyclic: {0}")]
    ClassCycle(String),
    #[error("recipe {recipe}: {variable} must be '{expected}' but is '{found}'")]
    Contradiction {
        recipe: String,
        variable: String,
        expected: String,
        found: String,
    },
    #[error("recipes are cyclic: {0}")]
    Cycle(String),
    #[error("recipe {recipe}: variable {variable} is not defined")]
    UndefinedVariable { recipe: String, variable: String },
    #[error("recipe {recipe}: malformed substitution in '{template}'")]
    MalformedSubstitution { recipe: String, template: String },
    #[error("recipe {recipe}: invalid {scm} scm: {reason}")]
    InvalidScm {
        recipe: String,
        scm: String,
        reason: String,
    },
    #[error("recipe {recipe}: invalid provideDeps pattern '{pattern}': {source}")]
    InvalidPattern {
        recipe: String,
        pattern: String,
        source: globset::Error,
    },
    #[error("recipe {recipe}: dependency {dependency} is listed twice")]
    DuplicateDependency { recipe: String, dependency: String },
    #[error("recipe {recipe}: incompatible variants of {dependency}")]
    IncompatibleVariants { recipe: String, dependency: String },
    #[error("root recipe {0} is not defined")]
    UnknownRoot(String),
    #[error("malformed define: {0}")]
    MalformedDefine(String),
}

/// A path query that matched nothing. Reported per query.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("package not found: {path} ({segment} does not exist)")]
    PackageNotFound { path: String, segment: String },
    #[error("invalid path pattern '{segment}': {source}")]
    Pattern {
        segment: String,
        source: globset::Error,
    },
}

/// The graph violates its structural invariants. This is a bug in whatever
/// built the graph.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph integrity violated: {0}")]
    Integrity(String),
}
