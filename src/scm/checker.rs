use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use futures_util::future::join_all;

use super::{ScmSpec, ScmStatus, status};

/// One checkout to look at.
#[derive(Debug, Clone)]
pub struct StatusRequest {
    pub spec: ScmSpec,
    pub checkout_root: PathBuf,
}

/// Runs status probes, never two at once on the same directory.
///
/// Probes of different directories run concurrently. A failed probe is not
/// retried, it is reported as an `error` status right away.
#[derive(Debug, Default)]
pub struct StatusChecker {
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl StatusChecker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, dir: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let key = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());

        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_default()
            .clone()
    }

    pub async fn check(&self, spec: &ScmSpec, checkout_root: &Path) -> ScmStatus {
        let lock = self.lock_for(&spec.checkout_dir(checkout_root));
        let _guard = lock.lock().await;

        status(spec, checkout_root).await
    }

    /// Check every request. Results come back in request order.
    pub async fn check_all(&self, requests: &[StatusRequest]) -> Vec<ScmStatus> {
        join_all(
            requests
                .iter()
                .map(|request| self.check(&request.spec, &request.checkout_root)),
        )
        .await
    }
}
