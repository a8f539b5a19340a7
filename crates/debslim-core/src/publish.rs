//! Publishing a filtered index tree to an object store.
//!
//! The local artifact tree is enumerated into (key, bytes, content-type)
//! objects, index artifacts gain a content-addressed `by-hash` alias, and
//! the remote key space is reconciled to match the local tree exactly:
//! every object is put, then every remote key with no local counterpart is
//! deleted. Re-running is idempotent (same key, same bytes) and the stale
//! diff is recomputed fresh each run.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

use opendal::Operator;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Path segment under which content-addressed aliases are published.
const BY_HASH_SEGMENT: &str = "by-hash/SHA256";

/// Errors raised while collecting or publishing the artifact tree.
#[derive(Error, Debug)]
pub enum PublishError {
    /// The given local root is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    /// A local artifact could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path of the unreadable artifact.
        path: PathBuf,
        /// The underlying IO error.
        source: io::Error,
    },

    /// Directory traversal failed.
    #[error("failed to walk local tree: {0}")]
    Walk(#[from] walkdir::Error),

    /// A remote put/list/delete call failed. Remote state may now be
    /// inconsistent; the run aborts rather than continuing silently.
    #[error("object store error: {0}")]
    Store(#[from] opendal::Error),
}

/// One object to publish: output key, payload, and content type.
#[derive(Debug, Clone)]
pub struct LocalObject {
    /// Remote key (relative path with `/` separators).
    pub key: String,
    /// Payload bytes.
    pub data: Vec<u8>,
    /// MIME type attached to the remote put.
    pub content_type: &'static str,
}

/// Outcome of a publish run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishReport {
    /// Objects uploaded (every local key, changed or not).
    pub uploaded: usize,
    /// Stale remote keys deleted.
    pub deleted: usize,
}

/// Content type for a key, by file extension.
pub fn content_type_for(key: &str) -> &'static str {
    if key.ends_with(".gz") {
        "application/x-gzip"
    } else if key.ends_with(".xz") {
        "application/x-xz"
    } else if key.ends_with(".lz4") {
        "application/x-lz4"
    } else if key.ends_with(".gpg") {
        "application/pgp-keys"
    } else if key.ends_with(".html") {
        "text/html; charset=utf-8"
    } else if key.ends_with(".json") {
        "application/json"
    } else {
        "text/plain; charset=utf-8"
    }
}

fn is_index_artifact(file_name: &str) -> bool {
    file_name == "Packages" || file_name.starts_with("Packages.")
}

/// Enumerate a local artifact tree into publishable objects.
///
/// Every file becomes an object keyed by its relative path. Index artifacts
/// (`Packages*` by filename convention) additionally get a by-hash alias at
/// `<parent>/by-hash/SHA256/<hex-digest>` carrying identical bytes, so
/// clients can fetch the exact version a release file references. The
/// by-hash alias is derived, never independently mutated; stale digests
/// disappear through the reconciliation diff on the next publish.
///
/// # Errors
///
/// Returns [`PublishError`] if the root is not a directory or a file cannot
/// be read.
pub fn collect_tree(root: &Path) -> Result<Vec<LocalObject>, PublishError> {
    if !root.is_dir() {
        return Err(PublishError::NotADirectory(root.to_path_buf()));
    }

    let mut objects = Vec::new();
    for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .unwrap_or_else(|_| entry.path());
        let key = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let data = std::fs::read(entry.path()).map_err(|source| PublishError::Read {
            path: entry.path().to_path_buf(),
            source,
        })?;
        let content_type = content_type_for(&key);

        if is_index_artifact(&entry.file_name().to_string_lossy()) {
            let digest = hex::encode(Sha256::digest(&data));
            let parent = key.rsplit_once('/').map_or("", |(p, _)| p);
            let alias = if parent.is_empty() {
                format!("{BY_HASH_SEGMENT}/{digest}")
            } else {
                format!("{parent}/{BY_HASH_SEGMENT}/{digest}")
            };
            objects.push(LocalObject {
                key: alias,
                data: data.clone(),
                content_type,
            });
        }

        objects.push(LocalObject {
            key,
            data,
            content_type,
        });
    }
    Ok(objects)
}

/// Reconciles an object store against a local object set.
#[derive(Debug)]
pub struct Publisher {
    op: Operator,
    batch_size: usize,
    dry_run: bool,
}

impl Publisher {
    /// Create a publisher over an opaque store capability.
    pub fn new(op: Operator) -> Self {
        Self {
            op,
            batch_size: 100,
            dry_run: false,
        }
    }

    /// Log intended operations without touching the store.
    pub fn dry_run(mut self, yes: bool) -> Self {
        self.dry_run = yes;
        self
    }

    /// Keys per upload/delete batch. A tuning knob for bulk API limits,
    /// not a correctness parameter.
    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = n.max(1);
        self
    }

    /// Converge the remote key space to exactly the given objects.
    ///
    /// Uploads every object in key order, then lists all remote keys and
    /// deletes the ones absent locally. Stale deletion strictly follows the
    /// upload phase so a key is never removed before its replacement is
    /// confirmed present. Any store failure aborts the run.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Store`] on any failed put/list/delete.
    pub async fn sync(&self, objects: Vec<LocalObject>) -> Result<PublishReport, PublishError> {
        // Deduplicate by key and fix the upload order.
        let local: BTreeMap<String, LocalObject> = objects
            .into_iter()
            .map(|obj| (obj.key.clone(), obj))
            .collect();
        let local_keys: BTreeSet<&str> = local.keys().map(String::as_str).collect();

        tracing::info!(objects = local.len(), "uploading local tree");
        let mut uploaded = 0;
        for obj in local.values() {
            if self.dry_run {
                tracing::info!(key = %obj.key, bytes = obj.data.len(), "[dry-run] PUT");
            } else {
                self.op
                    .write_with(&obj.key, obj.data.clone())
                    .content_type(obj.content_type)
                    .await?;
            }
            uploaded += 1;
            if uploaded % self.batch_size == 0 {
                tracing::debug!(uploaded, total = local.len(), "upload progress");
            }
        }

        // Uploads are fully enumerated before the stale diff is taken.
        let stale = self.stale_keys(&local_keys).await?;
        let deleted = stale.len();
        if stale.is_empty() {
            tracing::info!("no stale objects");
        } else {
            tracing::info!(stale = stale.len(), "deleting stale objects");
            for chunk in stale.chunks(self.batch_size) {
                if self.dry_run {
                    for key in chunk {
                        tracing::info!(%key, "[dry-run] DELETE");
                    }
                } else {
                    self.op.remove(chunk.to_vec()).await?;
                }
            }
        }

        Ok(PublishReport { uploaded, deleted })
    }

    async fn stale_keys(&self, local_keys: &BTreeSet<&str>) -> Result<Vec<String>, PublishError> {
        let entries = self.op.list_with("").recursive(true).await?;
        let mut stale: Vec<String> = entries
            .into_iter()
            .filter(|e| e.metadata().mode().is_file())
            .map(|e| e.path().to_string())
            .filter(|key| !local_keys.contains(key.as_str()))
            .collect();
        stale.sort_unstable();
        Ok(stale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opendal::services::Memory;

    fn memory_publisher() -> (Publisher, Operator) {
        let op = Operator::new(Memory::default()).unwrap().finish();
        (Publisher::new(op.clone()), op)
    }

    async fn remote_keys(op: &Operator) -> BTreeSet<String> {
        op.list_with("")
            .recursive(true)
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.metadata().mode().is_file())
            .map(|e| e.path().to_string())
            .collect()
    }

    fn object(key: &str, data: &[u8]) -> LocalObject {
        LocalObject {
            key: key.to_string(),
            data: data.to_vec(),
            content_type: content_type_for(key),
        }
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("a/Packages.gz"), "application/x-gzip");
        assert_eq!(content_type_for("a/Packages.xz"), "application/x-xz");
        assert_eq!(content_type_for("Release.gpg"), "application/pgp-keys");
        assert_eq!(content_type_for("index.html"), "text/html; charset=utf-8");
        assert_eq!(content_type_for("Release"), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_collect_tree_adds_by_hash_alias() {
        let dir = tempfile::tempdir().unwrap();
        let pkgs = dir.path().join("dists/trixie/main/binary-amd64");
        std::fs::create_dir_all(&pkgs).unwrap();
        std::fs::write(pkgs.join("Packages.gz"), b"payload").unwrap();
        std::fs::write(dir.path().join("index.html"), b"<html></html>").unwrap();

        let objects = collect_tree(dir.path()).unwrap();
        let keys: Vec<&str> = objects.iter().map(|o| o.key.as_str()).collect();

        let digest = hex::encode(Sha256::digest(b"payload"));
        let alias = format!("dists/trixie/main/binary-amd64/by-hash/SHA256/{digest}");
        assert!(keys.contains(&alias.as_str()));
        assert!(keys.contains(&"dists/trixie/main/binary-amd64/Packages.gz"));
        assert!(keys.contains(&"index.html"));
        // The alias carries identical bytes.
        let alias_obj = objects.iter().find(|o| o.key == alias).unwrap();
        assert_eq!(alias_obj.data, b"payload");
        // The HTML file gets no alias.
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn test_collect_tree_rejects_missing_root() {
        let err = collect_tree(Path::new("/nonexistent/debslim-test")).unwrap_err();
        assert!(matches!(err, PublishError::NotADirectory(_)));
    }

    #[tokio::test]
    async fn test_sync_converges_remote_to_local() {
        let (publisher, op) = memory_publisher();

        let run1 = vec![object("x", b"one"), object("y", b"two")];
        let report = publisher.sync(run1).await.unwrap();
        assert_eq!(report, PublishReport { uploaded: 2, deleted: 0 });
        assert_eq!(
            remote_keys(&op).await,
            ["x", "y"].iter().map(ToString::to_string).collect()
        );

        // Second run drops x, keeps y, adds z.
        let run2 = vec![object("y", b"two"), object("z", b"three")];
        let report = publisher.sync(run2).await.unwrap();
        assert_eq!(report, PublishReport { uploaded: 2, deleted: 1 });
        assert_eq!(
            remote_keys(&op).await,
            ["y", "z"].iter().map(ToString::to_string).collect()
        );
        assert_eq!(op.read("z").await.unwrap(), b"three");
    }

    #[tokio::test]
    async fn test_sync_replaces_changed_by_hash_alias() {
        let (publisher, op) = memory_publisher();

        let old_digest = hex::encode(Sha256::digest(b"v1"));
        let run1 = vec![
            object("dists/t/Packages.gz", b"v1"),
            object(&format!("dists/t/by-hash/SHA256/{old_digest}"), b"v1"),
        ];
        publisher.sync(run1).await.unwrap();

        let new_digest = hex::encode(Sha256::digest(b"v2"));
        let run2 = vec![
            object("dists/t/Packages.gz", b"v2"),
            object(&format!("dists/t/by-hash/SHA256/{new_digest}"), b"v2"),
        ];
        publisher.sync(run2).await.unwrap();

        let keys = remote_keys(&op).await;
        // The old digest is pruned by the stale diff, not kept as history.
        assert!(!keys.contains(&format!("dists/t/by-hash/SHA256/{old_digest}")));
        assert!(keys.contains(&format!("dists/t/by-hash/SHA256/{new_digest}")));
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let (publisher, op) = memory_publisher();
        let publisher = publisher.dry_run(true);

        let report = publisher.sync(vec![object("a", b"data")]).await.unwrap();
        assert_eq!(report.uploaded, 1);
        assert!(remote_keys(&op).await.is_empty());
    }
}
