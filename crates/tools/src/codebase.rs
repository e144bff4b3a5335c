//! Codebase tool: file listing and content search over a repository.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parsec_config::{CodebaseConfig, CodebaseSource};
use parsec_core::error::ToolError;
use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::WalkDir;

use crate::repo_cache::RepoCache;

const TOOL_NAME: &str = "search_codebase";

/// Directories never listed or searched.
const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "target",
    "dist",
    "build",
    ".next",
    "vendor",
    "__pycache__",
    ".venv",
];

/// Extensions skipped by content search.
const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "svg", "pdf", "zip", "gz", "tar", "tgz",
    "bz2", "xz", "7z", "jar", "exe", "dll", "so", "dylib", "bin", "o", "a", "class", "wasm",
    "woff", "woff2", "ttf", "otf", "eot", "mp3", "mp4", "mov", "avi", "webm", "lock", "sqlite",
    "db",
];

#[derive(Debug, Deserialize)]
struct SearchInput {
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    content_search: Option<String>,
}

/// Caps applied to one search.
#[derive(Debug, Clone)]
pub struct SearchLimits {
    pub max_files: usize,
    pub max_content_files: usize,
    pub max_matches_per_file: usize,
    pub max_line_length: usize,
}

impl From<&CodebaseConfig> for SearchLimits {
    fn from(config: &CodebaseConfig) -> Self {
        Self {
            max_files: config.max_files,
            max_content_files: config.max_content_files,
            max_matches_per_file: config.max_matches_per_file,
            max_line_length: config.max_line_length,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentMatch {
    pub file: String,
    pub line: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutput {
    pub source: String,
    pub files: Vec<String>,
    pub file_count: usize,
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<Vec<ContentMatch>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_searched: Option<usize>,
}

/// Executes `search_codebase` calls.
pub struct CodebaseTool {
    cache: Arc<RepoCache>,
    limits: SearchLimits,
}

impl CodebaseTool {
    pub fn new(cache: Arc<RepoCache>, limits: SearchLimits) -> Self {
        Self { cache, limits }
    }

    pub async fn execute(
        &self,
        input: &serde_json::Value,
        source: Option<CodebaseSource>,
    ) -> Result<serde_json::Value, ToolError> {
        let input: SearchInput = serde_json::from_value(input.clone())
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let source = source.ok_or_else(|| {
            ToolError::NotConfigured(
                "No codebase connected. Add a repository in the Connectors view".into(),
            )
        })?;

        // The checkout stays alive until the search finishes.
        let (label, root, _checkout) = match source {
            CodebaseSource::Remote { url } => {
                let checkout = self.cache.checkout(&url).await?;
                let path = checkout.path().to_path_buf();
                (url, path, Some(checkout))
            }
            CodebaseSource::Local { path } => {
                let root = PathBuf::from(&path);
                if !root.is_dir() {
                    return Err(ToolError::NotConfigured(format!(
                        "Codebase path does not exist or is not a directory: {path}"
                    )));
                }
                (path, root, None)
            }
        };

        let pattern = input.pattern.filter(|p| !p.trim().is_empty());
        let content = input.content_search.filter(|c| !c.is_empty());
        let limits = self.limits.clone();

        let output = tokio::task::spawn_blocking(move || {
            search(&root, &label, pattern.as_deref(), content.as_deref(), &limits)
        })
        .await
        .map_err(|e| ToolError::ExecutionFailed {
            tool_name: TOOL_NAME.into(),
            reason: e.to_string(),
        })??;

        debug!(
            files = output.file_count,
            truncated = output.truncated,
            matches = output.matches.as_ref().map_or(0, Vec::len),
            "Codebase search complete"
        );

        serde_json::to_value(output).map_err(|e| ToolError::ExecutionFailed {
            tool_name: TOOL_NAME.into(),
            reason: e.to_string(),
        })
    }
}

/// List files under `root` matching `pattern`, then optionally scan their
/// contents for `content` (case-insensitive).
pub fn search(
    root: &Path,
    label: &str,
    pattern: Option<&str>,
    content: Option<&str>,
    limits: &SearchLimits,
) -> Result<SearchOutput, ToolError> {
    let matcher = pattern
        .map(glob::Pattern::new)
        .transpose()
        .map_err(|e| ToolError::Validation(format!("Invalid pattern: {e}")))?;

    let mut files = Vec::new();
    let mut truncated = false;

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            !(e.file_type().is_dir()
                && e.depth() > 0
                && e.file_name()
                    .to_str()
                    .is_some_and(|name| EXCLUDED_DIRS.contains(&name)))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file());

    for entry in walker {
        let Some(relative) = relative_path(root, entry.path()) else {
            continue;
        };
        if matcher.as_ref().is_some_and(|m| !m.matches(&relative)) {
            continue;
        }
        if files.len() == limits.max_files {
            truncated = true;
            break;
        }
        files.push(relative);
    }

    let (matches, files_searched) = match content {
        Some(needle) => {
            let (matches, searched) = search_contents(root, &files, needle, limits);
            (Some(matches), Some(searched))
        }
        None => (None, None),
    };

    Ok(SearchOutput {
        source: label.to_string(),
        file_count: files.len(),
        files,
        truncated,
        matches,
        files_searched,
    })
}

fn search_contents(
    root: &Path,
    files: &[String],
    needle: &str,
    limits: &SearchLimits,
) -> (Vec<ContentMatch>, usize) {
    let needle = needle.to_lowercase();
    let Ok(canonical_root) = root.canonicalize() else {
        return (Vec::new(), 0);
    };

    let mut matches = Vec::new();
    let mut searched = 0;

    for file in files
        .iter()
        .filter(|f| !is_binary(f))
        .take(limits.max_content_files)
    {
        searched += 1;

        let Ok(path) = root.join(file).canonicalize() else {
            continue;
        };
        if !path.starts_with(&canonical_root) {
            continue;
        }
        let Ok(text) = std::fs::read_to_string(&path) else {
            continue;
        };

        matches.extend(
            text.lines()
                .enumerate()
                .filter(|(_, line)| line.to_lowercase().contains(&needle))
                .take(limits.max_matches_per_file)
                .map(|(idx, line)| ContentMatch {
                    file: file.clone(),
                    line: idx + 1,
                    text: line.trim().chars().take(limits.max_line_length).collect(),
                }),
        );
    }

    (matches, searched)
}

fn is_binary(file: &str) -> bool {
    Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| BINARY_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// `/`-separated path of `path` relative to `root`.
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    Some(parts.join("/"))
}
