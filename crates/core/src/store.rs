//! Curated artifact lookup.
//!
//! Artifacts live in a content tree that mirrors the URL hierarchy, one
//! reserved file name per directory (`page.md` by default). Top-level
//! route-group directories such as `(marketing)` do not appear in URLs, so
//! they are searched as alternate roots for the same relative path.
//!
//! ```text
//! content/
//! ├── page.md                  -> /
//! ├── pricing/page.md          -> /pricing
//! └── (marketing)/
//!     └── about/page.md        -> /about
//! ```

use std::future::Future;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::path::segments;

/// Default artifact file name within each directory.
pub const DEFAULT_ARTIFACT_NAME: &str = "page.md";

/// Read-only access to a content tree.
///
/// Paths are relative to the tree's root. Any failure (missing file,
/// permissions, escape attempts) reads as absent.
pub trait ContentTree: Send + Sync {
    /// Reads a file as text.
    fn read(&self, rel: &Path) -> impl Future<Output = Option<String>> + Send;

    /// Lists the entry names of a directory.
    fn list(&self, rel: &Path) -> impl Future<Output = Vec<String>> + Send;
}

/// A content tree on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsContentTree {
    root: PathBuf,
}

impl FsContentTree {
    /// A tree rooted at `root`. Relative roots are resolved against the
    /// current directory up front, so leading `..` components survive the
    /// lexical fold in [`FsContentTree::contain`].
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self { root }
    }

    /// Joins `rel` onto the root and checks the result stays under it.
    ///
    /// The check is lexical: `..` components are folded before comparing,
    /// and any absolute component resets the path outside the root.
    pub fn contain(&self, rel: &Path) -> Option<PathBuf> {
        let root = normalize(&self.root);
        let joined = normalize(&self.root.join(rel));
        if joined.starts_with(&root) { Some(joined) } else { None }
    }

    /// Resolves symlinks and checks the real path is still under the real root.
    async fn contain_canonical(&self, rel: &Path) -> Option<PathBuf> {
        if self.contain(rel).is_none() {
            warn!(path = %rel.display(), "content path escapes root");
            return None;
        }

        let root = tokio::fs::canonicalize(&self.root).await.ok()?;
        let real = tokio::fs::canonicalize(self.root.join(rel)).await.ok()?;
        if real.starts_with(&root) {
            Some(real)
        } else {
            warn!(path = %rel.display(), "content path resolves outside root");
            None
        }
    }
}

impl ContentTree for FsContentTree {
    async fn read(&self, rel: &Path) -> Option<String> {
        let path = self.contain_canonical(rel).await?;
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Some(text),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "artifact unreadable");
                None
            }
        }
    }

    async fn list(&self, rel: &Path) -> Vec<String> {
        let Some(dir) = self.contain_canonical(rel).await else {
            return Vec::new();
        };
        let Ok(mut entries) = tokio::fs::read_dir(&dir).await else {
            return Vec::new();
        };

        let mut names = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        names
    }
}

/// Lexically folds `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Whether a directory name is a route group: `(` + anything + `)`.
pub fn is_route_group(name: &str) -> bool {
    name.len() >= 2 && name.starts_with('(') && name.ends_with(')')
}

/// Raw text of an artifact and where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    /// Location relative to the content root.
    pub path: PathBuf,
    pub text: String,
}

/// Maps logical paths to curated artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore<T> {
    tree: T,
    artifact_name: String,
}

impl<T: ContentTree> ArtifactStore<T> {
    pub fn new(tree: T, artifact_name: impl Into<String>) -> Self {
        Self { tree, artifact_name: artifact_name.into() }
    }

    pub fn tree(&self) -> &T {
        &self.tree
    }

    /// Finds the artifact for a logical path.
    ///
    /// The direct location wins; otherwise each top-level route group is
    /// tried in listing order.
    pub async fn find(&self, logical_path: &str) -> Option<StoredArtifact> {
        let mut relative = PathBuf::new();
        for segment in segments(logical_path) {
            if segment == "." || segment == ".." {
                return None;
            }
            relative.push(segment);
        }
        relative.push(&self.artifact_name);

        if let Some(text) = self.tree.read(&relative).await {
            return Some(StoredArtifact { path: relative, text });
        }

        for group in self.tree.list(Path::new("")).await {
            if !is_route_group(&group) {
                continue;
            }
            let candidate = Path::new(&group).join(&relative);
            if let Some(text) = self.tree.read(&candidate).await {
                debug!(group = %group, path = %candidate.display(), "artifact found in route group");
                return Some(StoredArtifact { path: candidate, text });
            }
        }

        None
    }
}
