mod checker;
mod cvs;
mod git;
mod status;
mod svn;
mod url;

pub use checker::*;
pub use status::*;

use std::{
    collections::BTreeMap,
    fmt, fs,
    future::Future,
    io,
    path::{Path, PathBuf},
};

use crate::format::DefaultMap;

/// WARNING: The set of kinds is closed. Adding one means adding a backend.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ScmKind {
    Git,
    Svn,
    Cvs,
    Url,
}

impl fmt::Display for ScmKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::Git => write!(f, "git"),
            Self::Svn => write!(f, "svn"),
            Self::Cvs => write!(f, "cvs"),
            Self::Url => write!(f, "url"),
        }
    }
}

/// Which ref a git checkout is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitRef<'a> {
    Branch(&'a str),
    Tag(&'a str),
    Commit(&'a str),
    /// Default branch, tracking the remote head
    Default,
}

/// Declared source checkout of a package, with all variables substituted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScmSpec {
    pub kind: ScmKind,
    pub url: Option<String>,
    pub branch: Option<String>,
    pub tag: Option<String>,
    pub commit: Option<String>,
    pub revision: Option<String>,
    pub cvsroot: Option<String>,
    pub module: Option<String>,
    pub file_name: Option<String>,
    /// Relative to the package's checkout root
    pub dir: String,
    /// Attributes without a meaning here. Only shown in `query-scm` output.
    pub extra: BTreeMap<String, String>,
}

impl ScmSpec {
    #[must_use]
    pub fn new(kind: ScmKind) -> Self {
        Self {
            kind,
            url: None,
            branch: None,
            tag: None,
            commit: None,
            revision: None,
            cvsroot: None,
            module: None,
            file_name: None,
            dir: ".".to_string(),
            extra: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_url(kind: ScmKind, url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::new(kind)
        }
    }

    /// Checks the per kind requirements and fills in derived defaults.
    ///
    /// # Errors
    ///
    /// Returns a human readable reason when the SCM is unusable:
    /// - git: more than one of branch/tag/commit, or a commit that isn't 40 hex digits
    /// - svn/url/git: missing url
    /// - cvs: missing cvsroot or module
    pub fn validated(mut self) -> Result<Self, String> {
        match self.kind {
            ScmKind::Git => {
                self.require_url()?;
                let selectors = [&self.branch, &self.tag, &self.commit]
                    .iter()
                    .filter(|s| s.is_some())
                    .count();
                if selectors > 1 {
                    return Err("only one of branch, tag or commit may be set".to_string());
                }
                if let Some(commit) = &self.commit
                    && !is_commit_hash(commit)
                {
                    return Err(format!("'{commit}' is not a full 40 digit commit id"));
                }
            }
            ScmKind::Svn => {
                self.require_url()?;
            }
            ScmKind::Cvs => {
                if self.cvsroot.is_none() || self.module.is_none() {
                    return Err("cvsroot and module are required".to_string());
                }
            }
            ScmKind::Url => {
                let url = self.require_url()?;
                if self.file_name.is_none() {
                    let file_name = url
                        .trim_end_matches('/')
                        .rsplit('/')
                        .next()
                        .filter(|name| !name.is_empty())
                        .ok_or_else(|| format!("cannot derive a file name from '{url}'"))?
                        .to_string();
                    self.file_name = Some(file_name);
                }
            }
        }

        Ok(self)
    }

    fn require_url(&self) -> Result<&str, String> {
        self.url
            .as_deref()
            .ok_or_else(|| "url is required".to_string())
    }

    #[must_use]
    pub fn git_ref(&self) -> GitRef<'_> {
        if let Some(commit) = &self.commit {
            GitRef::Commit(commit)
        } else if let Some(tag) = &self.tag {
            GitRef::Tag(tag)
        } else if let Some(branch) = &self.branch {
            GitRef::Branch(branch)
        } else {
            GitRef::Default
        }
    }

    /// The string a backend reports back for the checkout's origin.
    #[must_use]
    pub fn remote_identity(&self) -> String {
        match self.kind {
            ScmKind::Cvs => format!(
                "{} {}",
                self.cvsroot.as_deref().unwrap_or_default(),
                self.module.as_deref().unwrap_or_default()
            ),
            ScmKind::Git | ScmKind::Svn | ScmKind::Url => self.url.clone().unwrap_or_default(),
        }
    }

    /// Directory of this checkout below `checkout_root`
    #[must_use]
    pub fn checkout_dir(&self, checkout_root: &Path) -> PathBuf {
        checkout_root.join(&self.dir)
    }

    /// All set attributes by their recipe key.
    #[must_use]
    pub fn properties(&self) -> BTreeMap<String, String> {
        let mut properties = self.extra.clone();

        properties.insert("scm".to_string(), self.kind.to_string());
        properties.insert("dir".to_string(), self.dir.clone());
        for (key, value) in [
            ("url", &self.url),
            ("branch", &self.branch),
            ("tag", &self.tag),
            ("commit", &self.commit),
            ("revision", &self.revision),
            ("cvsroot", &self.cvsroot),
            ("module", &self.module),
            ("fileName", &self.file_name),
        ] {
            if let Some(value) = value {
                properties.insert(key.to_string(), value.clone());
            }
        }

        properties
    }

    /// Render the `query-scm` line for this checkout.
    #[must_use]
    pub fn describe(&self, package: &str, formats: &ScmFormats, default: &str) -> String {
        let mut properties = self.properties();
        properties.insert("package".to_string(), package.to_string());

        DefaultMap::new(&properties, default).render(formats.get(self.kind))
    }
}

fn is_commit_hash(commit: &str) -> bool {
    commit.len() == 40
        && commit
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

/// Output formats of `query-scm`, by kind.
#[derive(Debug, Clone)]
pub struct ScmFormats(BTreeMap<String, String>);

pub const FALLBACK_FORMAT: &str = "{scm} {dir}";

impl Default for ScmFormats {
    fn default() -> Self {
        Self(
            [ScmKind::Git, ScmKind::Svn, ScmKind::Cvs, ScmKind::Url]
                .into_iter()
                .map(|kind| (kind.to_string(), default_format(kind).to_string()))
                .collect(),
        )
    }
}

impl ScmFormats {
    pub fn set(&mut self, kind: impl Into<String>, format: impl Into<String>) {
        self.0.insert(kind.into(), format.into());
    }

    #[must_use]
    pub fn get(&self, kind: ScmKind) -> &str {
        self.0
            .get(&kind.to_string())
            .map_or(FALLBACK_FORMAT, String::as_str)
    }
}

/// What a backend can do with a checkout of its kind.
pub trait ScmBackend {
    const DEFAULT_FORMAT: &'static str;

    /// File or directory that marks a checkout of this kind
    fn marker(&self, spec: &ScmSpec) -> PathBuf;

    /// Where a checkout of `spec` stands at `dir`. Only looks, never touches.
    ///
    /// # Errors
    ///
    /// `dir` exists but can't be inspected.
    fn presence(&self, spec: &ScmSpec, dir: &Path) -> io::Result<Presence> {
        let metadata = match fs::metadata(dir) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Presence::Missing),
            Err(err) => return Err(err),
        };
        if !metadata.is_dir() {
            return Ok(Presence::Foreign);
        }

        if fs::read_dir(dir)?.next().is_none() {
            Ok(Presence::Missing)
        } else if dir.join(self.marker(spec)).exists() {
            Ok(Presence::Checkout)
        } else {
            Ok(Presence::Foreign)
        }
    }

    /// Collect the raw facts about an existing checkout.
    fn probe(
        &self,
        spec: &ScmSpec,
        dir: &Path,
    ) -> impl Future<Output = Result<Facts, ProbeError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Nothing checked out yet
    Missing,
    /// Something is there, but not a checkout of the expected kind
    Foreign,
    Checkout,
}

#[must_use]
pub const fn default_format(kind: ScmKind) -> &'static str {
    match kind {
        ScmKind::Git => git::Git::DEFAULT_FORMAT,
        ScmKind::Svn => svn::Svn::DEFAULT_FORMAT,
        ScmKind::Cvs => cvs::Cvs::DEFAULT_FORMAT,
        ScmKind::Url => url::Url::DEFAULT_FORMAT,
    }
}

/// Determine the status of the checkout of `spec` below `checkout_root`.
///
/// Never fails: anything that prevents a verdict becomes [`StatusKind::Error`].
pub async fn status(spec: &ScmSpec, checkout_root: &Path) -> ScmStatus {
    let dir = spec.checkout_dir(checkout_root);

    match spec.kind {
        ScmKind::Git => status_with(&git::Git, spec, &dir).await,
        ScmKind::Svn => status_with(&svn::Svn, spec, &dir).await,
        ScmKind::Cvs => status_with(&cvs::Cvs, spec, &dir).await,
        ScmKind::Url => status_with(&url::Url, spec, &dir).await,
    }
}

async fn status_with<B: ScmBackend>(backend: &B, spec: &ScmSpec, dir: &Path) -> ScmStatus {
    match backend.presence(spec, dir) {
        Ok(Presence::Missing) => ScmStatus::empty(),
        Ok(Presence::Foreign) => ScmStatus::error(format!(
            "{} exists but is not a {} checkout",
            dir.display(),
            spec.kind
        )),
        Ok(Presence::Checkout) => match backend.probe(spec, dir).await {
            Ok(facts) => classify(spec, &facts),
            Err(err) => {
                log::debug!("status probe of {} failed: {err}", dir.display());
                ScmStatus::error(err.to_string())
            }
        },
        Err(err) => ScmStatus::error(format!("cannot inspect {}: {err}", dir.display())),
    }
}
