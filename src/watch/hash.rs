// src/watch/hash.rs

//! Content hashing for the optional unchanged-content skip.
//!
//! With `[watch].use_hash = true`, a binding's reaction only runs when the
//! aggregated contents of its matching files actually changed since the last
//! reaction. Editors that rewrite files without changing bytes (or save
//! twice) then stop causing rebuilds. Hashes live in memory and do not
//! outlive the serve session.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use blake3::Hasher;
use tracing::{debug, warn};

use crate::errors::{PipelineError, Result};
use crate::watch::patterns::WatchBinding;

/// Hash of a single file's contents.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf).map_err(|e| PipelineError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Aggregate hash over every file under `root` the binding matches.
///
/// Files are visited in sorted path order so the hash is stable across
/// directory iteration order.
pub fn aggregate_binding_hash(root: &Path, binding: &WatchBinding) -> Result<String> {
    let files = collect_matching_files(root, binding)?;

    let mut hasher = Hasher::new();
    for path in &files {
        let file_hash = compute_file_hash(path)?;
        hasher.update(file_hash.as_bytes());
    }

    let hash = hasher.finalize().to_hex().to_string();
    debug!(files = files.len(), hash = %hash, "computed aggregate binding hash");
    Ok(hash)
}

/// All files under `root` whose root-relative path matches the binding.
fn collect_matching_files(root: &Path, binding: &WatchBinding) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries = std::fs::read_dir(&dir).map_err(|e| PipelineError::io(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| PipelineError::io(&dir, e))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.is_file() {
                if let Ok(rel) = path.strip_prefix(root) {
                    let rel_str = rel.to_string_lossy().replace('\\', "/");
                    if binding.matches(&rel_str) {
                        files.push(path);
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Session-scoped memory of each binding's last aggregate hash.
pub struct HashMemo {
    root: PathBuf,
    hashes: HashMap<usize, String>,
}

impl HashMemo {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            hashes: HashMap::new(),
        }
    }

    /// Whether the binding's watched content is byte-identical to the last
    /// time this was asked. Records the fresh hash as the new baseline when
    /// it changed; when hashing fails, the reaction runs and the baseline is
    /// left alone.
    pub async fn is_unchanged(&mut self, binding_idx: usize, binding: &WatchBinding) -> bool {
        let root = self.root.clone();
        let owned = binding.clone();
        let computed =
            tokio::task::spawn_blocking(move || aggregate_binding_hash(&root, &owned)).await;

        let hash = match computed {
            Ok(Ok(hash)) => hash,
            Ok(Err(err)) => {
                warn!(
                    binding = %binding.label(),
                    error = %err,
                    "hashing watched files failed; running the reaction anyway"
                );
                return false;
            }
            Err(err) => {
                warn!(error = %err, "hashing task panicked; running the reaction anyway");
                return false;
            }
        };

        if self.hashes.get(&binding_idx) == Some(&hash) {
            return true;
        }
        self.hashes.insert(binding_idx, hash);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::ConfigFile;
    use crate::watch::patterns::compile_bindings;

    fn scss_binding(root: &Path) -> WatchBinding {
        let mut cfg = ConfigFile::default();
        cfg.root = root.to_path_buf();
        compile_bindings(&cfg).unwrap().remove(1)
    }

    #[tokio::test]
    async fn second_check_without_edits_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let sass_dir = dir.path().join("assets/sass");
        std::fs::create_dir_all(&sass_dir).unwrap();
        std::fs::write(sass_dir.join("base.scss"), "body { color: red; }").unwrap();

        let binding = scss_binding(dir.path());
        let mut memo = HashMemo::new(dir.path());

        assert!(!memo.is_unchanged(0, &binding).await);
        assert!(memo.is_unchanged(0, &binding).await);
    }

    #[tokio::test]
    async fn edit_resets_the_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let sass_dir = dir.path().join("assets/sass");
        std::fs::create_dir_all(&sass_dir).unwrap();
        let file = sass_dir.join("base.scss");
        std::fs::write(&file, "body { color: red; }").unwrap();

        let binding = scss_binding(dir.path());
        let mut memo = HashMemo::new(dir.path());

        assert!(!memo.is_unchanged(0, &binding).await);
        std::fs::write(&file, "body { color: blue; }").unwrap();
        assert!(!memo.is_unchanged(0, &binding).await);
        assert!(memo.is_unchanged(0, &binding).await);
    }

    #[tokio::test]
    async fn unmatched_files_do_not_affect_the_hash() {
        let dir = tempfile::tempdir().unwrap();
        let sass_dir = dir.path().join("assets/sass");
        std::fs::create_dir_all(&sass_dir).unwrap();
        std::fs::write(sass_dir.join("base.scss"), "body {}").unwrap();

        let binding = scss_binding(dir.path());
        let mut memo = HashMemo::new(dir.path());
        assert!(!memo.is_unchanged(0, &binding).await);

        // A new HTML file is outside the scss binding's patterns.
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        assert!(memo.is_unchanged(0, &binding).await);
    }
}
