use std::{fmt, path::Path};

use thiserror::Error;
use tokio::process::Command;

use super::{GitRef, ScmKind, ScmSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatusKind {
    Clean,
    Dirty,
    Empty,
    Error,
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::Clean => write!(f, "clean"),
            Self::Dirty => write!(f, "dirty"),
            Self::Empty => write!(f, "empty"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScmStatus {
    pub kind: StatusKind,
    pub message: String,
}

impl ScmStatus {
    #[must_use]
    pub fn clean() -> Self {
        Self {
            kind: StatusKind::Clean,
            message: String::new(),
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            kind: StatusKind::Empty,
            message: String::new(),
        }
    }

    pub fn dirty(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Dirty,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            message: message.into(),
        }
    }
}

/// The commit (or revision) a checkout has to be at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expected {
    /// No constraint beyond the remote
    Any,
    Exact(String),
    /// A ref was requested but it doesn't resolve locally
    Unresolved(String),
}

/// Raw observations about a checkout, as reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facts {
    /// Remote identity configured in the checkout, comparable to
    /// [`ScmSpec::remote_identity`]
    pub remote: Option<String>,
    /// Commit or revision currently checked out
    pub current: Option<String>,
    pub expected: Expected,
    /// Whether the requested branch/tag is checked out. `None` if nothing was requested.
    pub on_ref: Option<bool>,
    /// Uncommitted changes, untracked files included
    pub modified: bool,
    /// Local commits on any branch that no remote has
    pub unpushed: bool,
}

impl Facts {
    /// Facts of a checkout that matches `spec` exactly.
    #[must_use]
    pub fn matching(spec: &ScmSpec) -> Self {
        Self {
            remote: Some(spec.remote_identity()),
            current: None,
            expected: Expected::Any,
            on_ref: None,
            modified: false,
            unpushed: false,
        }
    }
}

/// Derive the status from the facts. The first divergence wins.
#[must_use]
pub fn classify(spec: &ScmSpec, facts: &Facts) -> ScmStatus {
    if facts.modified {
        return ScmStatus::dirty("uncommitted modifications");
    }

    let expected_remote = spec.remote_identity();
    if facts.remote.as_deref() != Some(expected_remote.as_str()) {
        return ScmStatus::dirty(format!(
            "switched remote: {} instead of {expected_remote}",
            facts.remote.as_deref().unwrap_or("none")
        ));
    }

    match &facts.expected {
        Expected::Any => {}
        Expected::Exact(expected) => {
            if facts.current.as_ref() != Some(expected) {
                return ScmStatus::dirty(format!(
                    "at {} instead of {expected}",
                    facts.current.as_deref().unwrap_or("nothing")
                ));
            }
        }
        Expected::Unresolved(reason) => return ScmStatus::dirty(reason.clone()),
    }

    if facts.on_ref == Some(false) {
        let wanted = match (spec.kind, spec.git_ref()) {
            (ScmKind::Git, GitRef::Branch(branch)) => format!("branch {branch}"),
            (ScmKind::Git, GitRef::Tag(tag)) => format!("tag {tag}"),
            _ => "the requested ref".to_string(),
        };
        return ScmStatus::dirty(format!("not on {wanted}"));
    }

    if facts.unpushed {
        return ScmStatus::dirty("unpushed commits");
    }

    ScmStatus::clean()
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("'{command}' failed: {stderr}")]
    Failed { command: String, stderr: String },
    #[error("'{command}' returned unexpected output: {output}")]
    Malformed { command: String, output: String },
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
}

/// Runs a read-only query of a version control tool inside a checkout.
pub(super) struct Query<'a> {
    program: &'static str,
    dir: &'a Path,
}

impl<'a> Query<'a> {
    pub(super) const fn new(program: &'static str, dir: &'a Path) -> Self {
        Self { program, dir }
    }

    fn describe(&self, args: &[&str]) -> String {
        format!("{} {}", self.program, args.join(" "))
    }

    async fn output(&self, args: &[&str]) -> Result<std::process::Output, ProbeError> {
        log::trace!("{} in {}", self.describe(args), self.dir.display());

        Command::new(self.program)
            .args(args)
            .current_dir(self.dir)
            .env("LC_ALL", "C")
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ProbeError::Spawn {
                program: self.program.to_string(),
                source,
            })
    }

    /// Trimmed stdout. A non-zero exit is an error.
    pub(super) async fn run(&self, args: &[&str]) -> Result<String, ProbeError> {
        let output = self.output(args).await?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(ProbeError::Failed {
                command: self.describe(args),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    /// Trimmed stdout, or `None` if the tool exited non-zero or printed nothing.
    /// Only a failure to start the tool is an error.
    pub(super) async fn lookup(&self, args: &[&str]) -> Result<Option<String>, ProbeError> {
        let output = self.output(args).await?;
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

        Ok((output.status.success() && !stdout.is_empty()).then_some(stdout))
    }

    pub(super) fn malformed(&self, args: &[&str], output: &str) -> ProbeError {
        ProbeError::Malformed {
            command: self.describe(args),
            output: output.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn git_spec() -> ScmSpec {
        ScmSpec::with_url(ScmKind::Git, "https://example.com/repo.git")
    }

    #[test]
    fn matching_facts_are_clean() {
        let spec = git_spec();

        assert_eq!(classify(&spec, &Facts::matching(&spec)), ScmStatus::clean());
    }

    #[test]
    fn modifications_win_over_everything() {
        let spec = git_spec();
        let facts = Facts {
            remote: Some("elsewhere".to_string()),
            modified: true,
            unpushed: true,
            ..Facts::matching(&spec)
        };

        let status = classify(&spec, &facts);
        assert_eq!(status.kind, StatusKind::Dirty);
        assert_eq!(status.message, "uncommitted modifications");
    }

    #[test]
    fn remote_before_commit() {
        let spec = git_spec();
        let facts = Facts {
            remote: None,
            current: Some("a".repeat(40)),
            expected: Expected::Exact("b".repeat(40)),
            ..Facts::matching(&spec)
        };

        let status = classify(&spec, &facts);
        assert_eq!(status.kind, StatusKind::Dirty);
        assert!(status.message.starts_with("switched remote"));
    }

    #[test]
    fn commit_mismatch_and_unresolved() {
        let spec = git_spec();

        let mismatch = Facts {
            current: Some("a".repeat(40)),
            expected: Expected::Exact("b".repeat(40)),
            ..Facts::matching(&spec)
        };
        assert_eq!(classify(&spec, &mismatch).kind, StatusKind::Dirty);

        let unresolved = Facts {
            expected: Expected::Unresolved("tag v1 not found".to_string()),
            ..Facts::matching(&spec)
        };
        assert_eq!(
            classify(&spec, &unresolved),
            ScmStatus::dirty("tag v1 not found")
        );

        let matched = Facts {
            current: Some("a".repeat(40)),
            expected: Expected::Exact("a".repeat(40)),
            ..Facts::matching(&spec)
        };
        assert_eq!(classify(&spec, &matched).kind, StatusKind::Clean);
    }

    #[test]
    fn wrong_ref_then_unpushed() {
        let spec = ScmSpec {
            branch: Some("next".to_string()),
            ..git_spec()
        };

        let off_branch = Facts {
            on_ref: Some(false),
            unpushed: true,
            ..Facts::matching(&spec)
        };
        assert_eq!(
            classify(&spec, &off_branch),
            ScmStatus::dirty("not on branch next")
        );

        let unpushed = Facts {
            on_ref: Some(true),
            unpushed: true,
            ..Facts::matching(&spec)
        };
        assert_eq!(
            classify(&spec, &unpushed),
            ScmStatus::dirty("unpushed commits")
        );
    }

    #[test]
    fn cvs_remote_identity() {
        let spec = ScmSpec {
            cvsroot: Some(":pserver:cvs.example.com:/cvs".to_string()),
            module: Some("proj".to_string()),
            ..ScmSpec::new(ScmKind::Cvs)
        };
        let facts = Facts {
            remote: Some(":pserver:cvs.example.com:/cvs other".to_string()),
            ..Facts::matching(&spec)
        };

        assert_eq!(classify(&spec, &facts).kind, StatusKind::Dirty);
        assert_eq!(
            classify(&spec, &Facts::matching(&spec)).kind,
            StatusKind::Clean
        );
    }

    #[tokio::test]
    async fn missing_tool_is_a_spawn_error() {
        let query = Query::new("recipetree-no-such-tool", Path::new("."));

        assert!(matches!(
            query.run(&["--version"]).await,
            Err(ProbeError::Spawn { .. })
        ));
        assert!(matches!(
            query.lookup(&["--version"]).await,
            Err(ProbeError::Spawn { .. })
        ));
    }
}
