//! Layered project configuration.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use directories::BaseDirs;
use serde::Deserialize;

use crate::{
    env::{Env, Scalar, parse_defines, scalars},
    error::{Error, Result},
    scm::ScmFormats,
    variant::VariantId,
};

pub const DEFAULT_WORKSPACE: &str = "work";

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
struct ConfigFile {
    environment: BTreeMap<String, Scalar>,
    scm_formats: BTreeMap<String, String>,
    scm_default: Option<String>,
    workspace: Option<PathBuf>,
    sandbox: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Environment every root starts with
    pub environment: Env,
    pub scm_formats: ScmFormats,
    /// Stands in for SCM attributes a format asks for but a spec doesn't have
    pub scm_default: String,
    /// Checkout root, relative to the project unless absolute
    pub workspace: PathBuf,
    pub sandbox: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Env::new(),
            scm_formats: ScmFormats::default(),
            scm_default: String::new(),
            workspace: PathBuf::from(DEFAULT_WORKSPACE),
            sandbox: false,
        }
    }
}

/// `<config dir>/recipetree/default.yaml`
#[must_use]
pub fn user_config_file() -> Option<PathBuf> {
    let base_dirs = BaseDirs::new()?;
    Some(base_dirs.config_dir().join("recipetree").join("default.yaml"))
}

impl Config {
    /// Read the user defaults, the project's `config.yaml`, then every file
    /// of `extra` in order. `defines` are applied last.
    ///
    /// # Errors
    ///
    /// - A file of `extra` is missing or unreadable
    /// - Any file isn't valid YAML
    /// - A define is malformed
    pub fn load<S: AsRef<str>>(project_root: &Path, extra: &[PathBuf], defines: &[S]) -> Result<Self> {
        let mut config = Self::default();

        for optional in user_config_file()
            .into_iter()
            .chain([project_root.join("config.yaml")])
        {
            if optional.is_file() {
                config.apply_file(&optional)?;
            }
        }
        for path in extra {
            config.apply_file(path)?;
        }

        config.environment.extend(parse_defines(defines)?);

        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<()> {
        let contents = fs::read_to_string(path).map_err(|source| Error::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;

        let file: ConfigFile = if contents.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(&contents).map_err(|source| Error::Config {
                path: path.to_path_buf(),
                source,
            })?
        };

        log::debug!("applying config {}", path.display());
        self.apply(file);
        Ok(())
    }

    fn apply(&mut self, file: ConfigFile) {
        self.environment.extend(scalars(file.environment));
        for (kind, format) in file.scm_formats {
            self.scm_formats.set(kind, format);
        }
        if let Some(default) = file.scm_default {
            self.scm_default = default;
        }
        if let Some(workspace) = file.workspace {
            self.workspace = workspace;
        }
        if let Some(sandbox) = file.sandbox {
            self.sandbox = sandbox;
        }
    }

    /// Absolute checkout root of the project at `project_root`.
    #[must_use]
    pub fn workspace_dir(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.workspace)
    }

    /// `<workspace>/<recipe path>/<checkout id>/src`. Every checkout variant
    /// gets a directory of its own.
    #[must_use]
    pub fn checkout_root(&self, project_root: &Path, name: &str, checkout: VariantId) -> PathBuf {
        self.workspace_dir(project_root)
            .join(name.replace("::", "/"))
            .join(checkout.short())
            .join("src")
    }
}
