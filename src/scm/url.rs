use std::{
    fs, io,
    path::{Path, PathBuf},
};

use super::{Facts, Presence, ProbeError, ScmBackend, ScmSpec};

/// A single downloaded file. Present means done.
pub struct Url;

impl ScmBackend for Url {
    const DEFAULT_FORMAT: &'static str = "url {package} {dir}/{fileName} {url}";

    fn marker(&self, spec: &ScmSpec) -> PathBuf {
        PathBuf::from(spec.file_name.as_deref().unwrap_or_default())
    }

    fn presence(&self, spec: &ScmSpec, dir: &Path) -> io::Result<Presence> {
        match fs::metadata(dir.join(self.marker(spec))) {
            Ok(metadata) if metadata.is_file() => Ok(Presence::Checkout),
            Ok(_) => Ok(Presence::Foreign),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Presence::Missing),
            Err(err) => Err(err),
        }
    }

    async fn probe(&self, spec: &ScmSpec, _dir: &Path) -> Result<Facts, ProbeError> {
        Ok(Facts::matching(spec))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use anyhow::Result;
    use temp_dir::TempDir;

    use super::*;
    use crate::scm::{ScmKind, StatusKind, status};

    #[tokio::test]
    async fn downloaded_file_is_clean() -> Result<()> {
        let checkout = TempDir::new()?;
        let spec = ScmSpec::with_url(ScmKind::Url, "https://example.com/dl/data.bin")
            .validated()
            .map_err(anyhow::Error::msg)?;

        assert_eq!(status(&spec, checkout.path()).await.kind, StatusKind::Empty);

        fs::write(checkout.path().join("data.bin"), "payload")?;
        assert_eq!(status(&spec, checkout.path()).await.kind, StatusKind::Clean);

        fs::remove_file(checkout.path().join("data.bin"))?;
        fs::create_dir(checkout.path().join("data.bin"))?;
        assert_eq!(status(&spec, checkout.path()).await.kind, StatusKind::Error);

        Ok(())
    }
}
