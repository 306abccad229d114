use std::path::{Path, PathBuf};

use super::{Expected, Facts, ProbeError, ScmBackend, ScmSpec, status::Query};

pub struct Svn;

impl ScmBackend for Svn {
    const DEFAULT_FORMAT: &'static str = "svn {package} {dir} {url} {revision}";

    fn marker(&self, _spec: &ScmSpec) -> PathBuf {
        PathBuf::from(".svn")
    }

    async fn probe(&self, spec: &ScmSpec, dir: &Path) -> Result<Facts, ProbeError> {
        let svn = Query::new("svn", dir);

        let remote = svn.run(&["info", "--show-item", "url"]).await?;

        let revision_args = ["info", "--show-item", "revision"];
        let current = svn.run(&revision_args).await?;
        if current.is_empty() || !current.chars().all(|c| c.is_ascii_digit()) {
            return Err(svn.malformed(&revision_args, &current));
        }

        let expected = spec
            .revision
            .clone()
            .map_or(Expected::Any, Expected::Exact);

        let modified = !svn.run(&["status", "-q"]).await?.is_empty();

        Ok(Facts {
            remote: Some(remote),
            current: Some(current),
            expected,
            on_ref: None,
            modified,
            unpushed: false,
        })
    }
}
