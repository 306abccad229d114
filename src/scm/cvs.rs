use std::path::{Path, PathBuf};

use super::{Expected, Facts, ProbeError, ScmBackend, ScmSpec, status::Query};

pub struct Cvs;

impl ScmBackend for Cvs {
    const DEFAULT_FORMAT: &'static str = "cvs {package} {dir} {cvsroot} {module}";

    fn marker(&self, _spec: &ScmSpec) -> PathBuf {
        Path::new("CVS").join("Root")
    }

    async fn probe(&self, _spec: &ScmSpec, dir: &Path) -> Result<Facts, ProbeError> {
        let root = read_admin_file(dir, "Root").await?;
        let module = read_admin_file(dir, "Repository").await?;

        // `-n` makes update a dry run
        let update = Query::new("cvs", dir).run(&["-qn", "update"]).await?;
        let modified = update.lines().any(is_local_change);

        Ok(Facts {
            remote: Some(format!("{root} {module}")),
            current: None,
            expected: Expected::Any,
            on_ref: None,
            modified,
            unpushed: false,
        })
    }
}

async fn read_admin_file(dir: &Path, name: &str) -> Result<String, ProbeError> {
    let path = dir.join("CVS").join(name);

    tokio::fs::read_to_string(&path)
        .await
        .map(|contents| contents.trim().to_string())
        .map_err(|source| ProbeError::Read {
            path: path.display().to_string(),
            source,
        })
}

/// `M`odified, `A`dded, `R`emoved, `C`onflict or unknown (`?`) files
fn is_local_change(line: &str) -> bool {
    matches!(
        line.split_once(' '),
        Some(("M" | "A" | "R" | "C" | "?", _))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_changes() {
        assert!(is_local_change("M src/main.c"));
        assert!(is_local_change("? notes.txt"));
        assert!(!is_local_change("U src/remote_update.c"));
        assert!(!is_local_change("P patched.c"));
        assert!(!is_local_change(""));
    }
}
