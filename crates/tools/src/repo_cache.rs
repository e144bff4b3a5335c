//! Working copies of remote repositories, shared by every request.
//!
//! Entries map a normalized repository URL to a directory under the cache
//! root named by a hash of that URL. An entry is only handed out after the
//! working copy has been checked and fast-forwarded; if either step fails
//! the entry is evicted, the directory removed, and the repository cloned
//! again. Operations on the same repository are serialized, and a
//! [`Checkout`] keeps other requests from refreshing the working copy
//! until it is dropped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parsec_core::error::ToolError;
use sha2::{Digest, Sha256};
use tokio::process::Command;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

const GIT_TIMEOUT: Duration = Duration::from_secs(300);

pub struct RepoCache {
    root: PathBuf,
    entries: Mutex<HashMap<String, PathBuf>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RepoCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: Mutex::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Cached working copy for a URL, without validating it.
    pub async fn cached_path(&self, url: &str) -> Option<PathBuf> {
        self.entries
            .lock()
            .await
            .get(&normalize_repo_url(url))
            .cloned()
    }

    /// Return an up-to-date working copy of `url`, cloning if needed.
    pub async fn checkout(&self, url: &str) -> Result<Checkout, ToolError> {
        let normalized = normalize_repo_url(url);
        if normalized.is_empty() {
            return Err(ToolError::Validation("Repository URL is empty".into()));
        }

        let guard = self.lock_for(&normalized).await.lock_owned().await;

        let cached = self.entries.lock().await.get(&normalized).cloned();
        let target = self.root.join(cache_key(&normalized));

        // A copy left by an earlier process is adopted the same way.
        let candidate = cached.or_else(|| target.exists().then(|| target.clone()));

        if let Some(path) = candidate {
            match refresh(&path).await {
                Ok(()) => {
                    debug!(repo = %normalized, path = %path.display(), "Repository cache hit");
                    self.entries
                        .lock()
                        .await
                        .insert(normalized, path.clone());
                    return Ok(Checkout {
                        path,
                        _guard: guard,
                    });
                }
                Err(reason) => {
                    warn!(repo = %normalized, %reason, "Evicting cached repository");
                    self.entries.lock().await.remove(&normalized);
                    remove_dir(&path).await?;
                }
            }
        }

        if target.exists() {
            remove_dir(&target).await?;
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| ToolError::Transport(format!("Failed to create repository cache: {e}")))?;

        let source = clone_url(url, &normalized);
        info!(repo = %normalized, path = %target.display(), "Cloning repository");

        let target_str = target.to_string_lossy().to_string();
        if let Err(reason) =
            git(&["clone", "--depth", "1", "--quiet", &source, &target_str], None).await
        {
            remove_dir(&target).await?;
            return Err(ToolError::Transport(format!(
                "Failed to clone {normalized}: {reason}"
            )));
        }

        self.entries
            .lock()
            .await
            .insert(normalized, target.clone());
        Ok(Checkout {
            path: target,
            _guard: guard,
        })
    }

    async fn lock_for(&self, normalized: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(normalized.to_string())
            .or_default()
            .clone()
    }
}

/// A working copy held for reading. The repository is not refreshed or
/// re-cloned by another request while this is alive.
pub struct Checkout {
    path: PathBuf,
    _guard: OwnedMutexGuard<()>,
}

impl Checkout {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Canonical form of a repository URL: no scheme, no `.git`, no trailing
/// slash, `git@host:owner/repo` rewritten to `host/owner/repo`.
pub fn normalize_repo_url(url: &str) -> String {
    let mut s = url.trim();

    for scheme in ["https://", "http://", "ssh://", "git://"] {
        if let Some(rest) = s.strip_prefix(scheme) {
            s = rest;
            break;
        }
    }

    let mut normalized = match s.strip_prefix("git@") {
        Some(rest) => rest.replacen(':', "/", 1),
        None => s.to_string(),
    };

    while normalized.ends_with('/') {
        normalized.pop();
    }
    if let Some(stripped) = normalized.strip_suffix(".git") {
        normalized = stripped.to_string();
    }
    while normalized.ends_with('/') {
        normalized.pop();
    }

    normalized
}

/// Directory name for a normalized URL.
pub fn cache_key(normalized: &str) -> String {
    let digest = Sha256::digest(normalized.as_bytes());
    hex::encode(&digest[..8])
}

/// URL handed to `git clone`: the original when it carries a scheme or is
/// an scp-style address, otherwise https.
fn clone_url(original: &str, normalized: &str) -> String {
    let original = original.trim();
    if original.contains("://") || original.starts_with("git@") {
        original.to_string()
    } else {
        format!("https://{normalized}")
    }
}

/// Verify a working copy and fast-forward it.
async fn refresh(path: &Path) -> Result<(), String> {
    if !path.join(".git").exists() {
        return Err("working copy is missing".into());
    }
    git(&["pull", "--ff-only", "--quiet"], Some(path)).await
}

async fn remove_dir(path: &Path) -> Result<(), ToolError> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ToolError::Transport(format!(
            "Failed to remove stale repository at {}: {e}",
            path.display()
        ))),
    }
}

async fn git(args: &[&str], cwd: Option<&Path>) -> Result<(), String> {
    let mut command = Command::new("git");
    command
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let output = tokio::time::timeout(GIT_TIMEOUT, command.output())
        .await
        .map_err(|_| format!("git {} timed out", args[0]))?
        .map_err(|e| format!("failed to run git: {e}"))?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(stderr.trim().to_string())
    }
}
