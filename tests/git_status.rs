use std::{fs, path::Path, process::Command};

use anyhow::{Result, bail};
use recipetree::scm::{ScmKind, ScmSpec, StatusChecker, StatusKind, StatusRequest, status};
use temp_dir::TempDir;

fn git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=recipetree",
            "-c",
            "user.email=recipetree@example.com",
            "-c",
            "commit.gpgsign=false",
            "-c",
            "tag.gpgsign=false",
            "-c",
            "init.defaultBranch=main",
        ])
        .args(args)
        .current_dir(dir)
        .env("LC_ALL", "C")
        .output()?;

    if !output.status.success() {
        bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn git_available() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

/// An upstream repository with one tagged commit, cloned to
/// `<tmp>/pkg/src`.
struct Fixture {
    tmp: TempDir,
    url: String,
}

impl Fixture {
    fn new() -> Result<Self> {
        let tmp = TempDir::new()?;
        let upstream = tmp.path().join("upstream");
        fs::create_dir_all(&upstream)?;

        git(&upstream, &["init", "-q"])?;
        fs::write(upstream.join("README"), "hello\n")?;
        git(&upstream, &["add", "README"])?;
        git(&upstream, &["commit", "-q", "-m", "initial"])?;
        git(&upstream, &["tag", "v1"])?;

        let url = upstream.to_string_lossy().into_owned();
        fs::create_dir_all(tmp.path().join("pkg"))?;
        git(&tmp.path().join("pkg"), &["clone", "-q", &url, "src"])?;

        Ok(Self { tmp, url })
    }

    fn root(&self) -> std::path::PathBuf {
        self.tmp.path().join("pkg")
    }

    fn checkout(&self) -> std::path::PathBuf {
        self.root().join("src")
    }

    fn spec(&self) -> ScmSpec {
        ScmSpec {
            dir: "src".to_string(),
            ..ScmSpec::with_url(ScmKind::Git, self.url.clone())
        }
    }
}

#[tokio::test]
async fn fresh_clone_is_clean() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let fixture = Fixture::new()?;

    let status = status(&fixture.spec(), &fixture.root()).await;
    assert_eq!(status.kind, StatusKind::Clean, "{}", status.message);

    Ok(())
}

#[tokio::test]
async fn other_branch_is_dirty() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let fixture = Fixture::new()?;
    let spec = ScmSpec {
        branch: Some("anybranch".to_string()),
        ..fixture.spec()
    };

    assert_eq!(status(&spec, &fixture.root()).await.kind, StatusKind::Dirty);

    Ok(())
}

#[tokio::test]
async fn checked_out_branch_is_clean() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let fixture = Fixture::new()?;
    let spec = ScmSpec {
        branch: Some("main".to_string()),
        ..fixture.spec()
    };

    let status = status(&spec, &fixture.root()).await;
    assert_eq!(status.kind, StatusKind::Clean, "{}", status.message);

    Ok(())
}

#[tokio::test]
async fn other_commit_is_dirty() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let fixture = Fixture::new()?;
    let spec = ScmSpec {
        commit: Some("0123456789abcdef0123456789abcdef01234567".to_string()),
        ..fixture.spec()
    };

    assert_eq!(status(&spec, &fixture.root()).await.kind, StatusKind::Dirty);

    let head = git(&fixture.checkout(), &["rev-parse", "HEAD"])?;
    let pinned = ScmSpec {
        commit: Some(head),
        ..fixture.spec()
    };
    assert_eq!(status(&pinned, &fixture.root()).await.kind, StatusKind::Clean);

    Ok(())
}

#[tokio::test]
async fn tag_at_head_is_clean() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let fixture = Fixture::new()?;
    let tagged = ScmSpec {
        tag: Some("v1".to_string()),
        ..fixture.spec()
    };
    let missing = ScmSpec {
        tag: Some("v2".to_string()),
        ..fixture.spec()
    };

    let status_v1 = status(&tagged, &fixture.root()).await;
    assert_eq!(status_v1.kind, StatusKind::Clean, "{}", status_v1.message);
    assert_eq!(status(&missing, &fixture.root()).await.kind, StatusKind::Dirty);

    Ok(())
}

#[tokio::test]
async fn removed_checkout_is_empty() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let fixture = Fixture::new()?;
    fs::remove_dir_all(fixture.checkout())?;

    let status = status(&fixture.spec(), &fixture.root()).await;
    assert_eq!(status.kind, StatusKind::Empty);

    Ok(())
}

#[tokio::test]
async fn modified_file_is_dirty() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let fixture = Fixture::new()?;
    fs::write(fixture.checkout().join("README"), "changed\n")?;

    let status = status(&fixture.spec(), &fixture.root()).await;
    assert_eq!(status.kind, StatusKind::Dirty);
    assert_eq!(status.message, "uncommitted modifications");

    Ok(())
}

#[tokio::test]
async fn unpushed_commit_is_dirty() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let fixture = Fixture::new()?;
    let checkout = fixture.checkout();
    fs::write(checkout.join("NEWS"), "news\n")?;
    git(&checkout, &["add", "NEWS"])?;
    git(&checkout, &["commit", "-q", "-m", "local"])?;

    assert_eq!(
        status(&fixture.spec(), &fixture.root()).await.kind,
        StatusKind::Dirty
    );

    Ok(())
}

#[tokio::test]
async fn unpushed_commit_on_other_branch_is_dirty() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let fixture = Fixture::new()?;
    let checkout = fixture.checkout();
    git(&checkout, &["checkout", "-q", "-b", "feature"])?;
    fs::write(checkout.join("NEWS"), "news\n")?;
    git(&checkout, &["add", "NEWS"])?;
    git(&checkout, &["commit", "-q", "-m", "local"])?;
    git(&checkout, &["checkout", "-q", "main"])?;

    let status = status(&fixture.spec(), &fixture.root()).await;
    assert_eq!(status.kind, StatusKind::Dirty);
    assert_eq!(status.message, "unpushed commits");

    Ok(())
}

#[tokio::test]
async fn switched_remote_is_dirty() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let fixture = Fixture::new()?;
    let spec = ScmSpec {
        url: Some("https://example.com/elsewhere.git".to_string()),
        ..fixture.spec()
    };

    let status = status(&spec, &fixture.root()).await;
    assert_eq!(status.kind, StatusKind::Dirty);
    assert!(status.message.starts_with("switched remote"));

    Ok(())
}

#[tokio::test]
async fn foreign_directory_is_an_error() -> Result<()> {
    let tmp = TempDir::new()?;
    fs::create_dir_all(tmp.path().join("src"))?;
    fs::write(tmp.path().join("src/file"), "not a repository")?;
    let spec = ScmSpec {
        dir: "src".to_string(),
        ..ScmSpec::with_url(ScmKind::Git, "https://example.com/a.git")
    };

    assert_eq!(status(&spec, tmp.path()).await.kind, StatusKind::Error);

    Ok(())
}

#[tokio::test]
async fn checker_reports_in_request_order() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let fixture = Fixture::new()?;
    let requests = vec![
        StatusRequest {
            spec: fixture.spec(),
            checkout_root: fixture.root(),
        },
        StatusRequest {
            spec: ScmSpec {
                dir: "missing".to_string(),
                ..fixture.spec()
            },
            checkout_root: fixture.root(),
        },
        StatusRequest {
            spec: ScmSpec {
                branch: Some("anybranch".to_string()),
                ..fixture.spec()
            },
            checkout_root: fixture.root(),
        },
    ];

    let kinds: Vec<StatusKind> = StatusChecker::new()
        .check_all(&requests)
        .await
        .into_iter()
        .map(|status| status.kind)
        .collect();

    assert_eq!(
        kinds,
        [StatusKind::Clean, StatusKind::Empty, StatusKind::Dirty]
    );

    Ok(())
}
