use std::path::{Path, PathBuf};

use super::{
    Expected, Facts, GitRef, ProbeError, ScmBackend, ScmSpec,
    status::Query,
};

pub struct Git;

impl ScmBackend for Git {
    const DEFAULT_FORMAT: &'static str = "git {package} {dir} {url} {branch}";

    fn marker(&self, _spec: &ScmSpec) -> PathBuf {
        PathBuf::from(".git")
    }

    async fn probe(&self, spec: &ScmSpec, dir: &Path) -> Result<Facts, ProbeError> {
        let git = Query::new("git", dir);

        let remote = git.lookup(&["config", "--get", "remote.origin.url"]).await?;

        let head_args = ["rev-parse", "--verify", "HEAD"];
        let head = git.run(&head_args).await?;
        if !is_object_id(&head) {
            return Err(git.malformed(&head_args, &head));
        }

        let (expected, on_ref) = match spec.git_ref() {
            GitRef::Commit(commit) => (Expected::Exact(commit.to_string()), None),
            GitRef::Tag(tag) => {
                let expected = resolve(&git, &format!("refs/tags/{tag}^{{commit}}"))
                    .await?
                    .map_or_else(
                        || Expected::Unresolved(format!("tag {tag} not found")),
                        Expected::Exact,
                    );
                let tags = git.run(&["tag", "--points-at", "HEAD"]).await?;
                (expected, Some(tags.lines().any(|line| line == tag)))
            }
            GitRef::Branch(branch) => {
                let expected = resolve(&git, &format!("refs/remotes/origin/{branch}"))
                    .await?
                    .map_or_else(
                        || Expected::Unresolved(format!("branch {branch} not found on origin")),
                        Expected::Exact,
                    );
                let current = git.lookup(&["symbolic-ref", "--short", "-q", "HEAD"]).await?;
                (expected, Some(current.as_deref() == Some(branch)))
            }
            GitRef::Default => {
                let tracked = match resolve(&git, "@{upstream}").await? {
                    Some(commit) => Some(commit),
                    None => resolve(&git, "refs/remotes/origin/HEAD").await?,
                };
                let expected = tracked.map_or_else(
                    || Expected::Unresolved("no remote tracking branch".to_string()),
                    Expected::Exact,
                );
                (expected, None)
            }
        };

        let modified = !git.run(&["status", "--porcelain"]).await?.is_empty();

        // Any local branch counts, not only the checked out one
        let unpushed = !git
            .run(&["log", "--branches", "--not", "--remotes", "--oneline"])
            .await?
            .is_empty();

        Ok(Facts {
            remote,
            current: Some(head),
            expected,
            on_ref,
            modified,
            unpushed,
        })
    }
}

async fn resolve(git: &Query<'_>, rev: &str) -> Result<Option<String>, ProbeError> {
    git.lookup(&["rev-parse", "--verify", "-q", rev]).await
}

fn is_object_id(id: &str) -> bool {
    matches!(id.len(), 40 | 64) && id.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_ids() {
        assert!(is_object_id(&"a".repeat(40)));
        assert!(is_object_id(&"0".repeat(64)));
        assert!(!is_object_id("HEAD"));
        assert!(!is_object_id(&"g".repeat(40)));
    }
}
