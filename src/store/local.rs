//! Directory-backed vector index with brute-force cosine search.
//!
//! Layout: `<root>/manifest.json` plus `<root>/entries.jsonl` (one [`IndexEntry`] per line).
//! Rebuilds are written to a sibling staging directory and swapped in with renames, so a failed
//! or interrupted ingestion leaves the previous index untouched.

use super::{
    IndexEntry, IndexManifest, RetrievedChunk, StoreError, VectorStore, cosine_similarity,
};
use async_trait::async_trait;
use std::{
    cmp::Ordering,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{fs, io::AsyncWriteExt, sync::RwLock};
use uuid::Uuid;

const MANIFEST_FILE: &str = "manifest.json";
const ENTRIES_FILE: &str = "entries.jsonl";

struct LoadedIndex {
    manifest: IndexManifest,
    entries: Vec<IndexEntry>,
}

/// Vector store persisted as plain files under a directory.
pub struct LocalVectorStore {
    root: PathBuf,
    loaded: RwLock<Option<Arc<LoadedIndex>>>,
}

impl LocalVectorStore {
    /// Create a store rooted at `root`. Nothing is read until the first query.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            loaded: RwLock::new(None),
        }
    }

    fn sibling(&self, label: &str) -> PathBuf {
        let name = self
            .root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "index".to_string());
        self.root
            .with_file_name(format!(".{name}.{label}-{}", Uuid::new_v4().simple()))
    }

    async fn load(&self) -> Result<Arc<LoadedIndex>, StoreError> {
        if let Some(index) = self.loaded.read().await.as_ref() {
            return Ok(Arc::clone(index));
        }

        let mut guard = self.loaded.write().await;
        if let Some(index) = guard.as_ref() {
            return Ok(Arc::clone(index));
        }

        let manifest = self.read_manifest().await?;
        let entries_path = self.root.join(ENTRIES_FILE);
        let raw = fs::read_to_string(&entries_path)
            .await
            .map_err(|source| io_error(&entries_path, source))?;
        let entries = raw
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str::<IndexEntry>)
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(entry) = entries
            .iter()
            .find(|entry| entry.vector.len() != manifest.dimension)
        {
            return Err(StoreError::DimensionMismatch {
                expected: manifest.dimension,
                actual: entry.vector.len(),
            });
        }

        tracing::debug!(
            root = %self.root.display(),
            entries = entries.len(),
            model = %manifest.embedding_model,
            "Loaded local index"
        );
        let index = Arc::new(LoadedIndex { manifest, entries });
        *guard = Some(Arc::clone(&index));
        Ok(index)
    }

    async fn read_manifest(&self) -> Result<IndexManifest, StoreError> {
        let path = self.root.join(MANIFEST_FILE);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::MissingIndex(self.location()));
            }
            Err(source) => return Err(io_error(&path, source)),
        };
        Ok(serde_json::from_slice(&raw)?)
    }

    async fn write_staging(
        &self,
        staging: &Path,
        manifest: &IndexManifest,
        entries: &[IndexEntry],
    ) -> Result<(), StoreError> {
        fs::create_dir_all(staging)
            .await
            .map_err(|source| io_error(staging, source))?;

        let entries_path = staging.join(ENTRIES_FILE);
        let mut file = fs::File::create(&entries_path)
            .await
            .map_err(|source| io_error(&entries_path, source))?;
        let mut buffer = Vec::new();
        for entry in entries {
            serde_json::to_writer(&mut buffer, entry)?;
            buffer.push(b'\n');
        }
        file.write_all(&buffer)
            .await
            .map_err(|source| io_error(&entries_path, source))?;
        file.sync_all()
            .await
            .map_err(|source| io_error(&entries_path, source))?;

        // Manifest last: a staging directory without one is never a valid index.
        let manifest_path = staging.join(MANIFEST_FILE);
        fs::write(&manifest_path, serde_json::to_vec_pretty(manifest)?)
            .await
            .map_err(|source| io_error(&manifest_path, source))?;
        Ok(())
    }
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    fn location(&self) -> String {
        self.root.display().to_string()
    }

    async fn exists(&self) -> Result<bool, StoreError> {
        fs::try_exists(self.root.join(MANIFEST_FILE))
            .await
            .map_err(|source| io_error(&self.root, source))
    }

    async fn replace(
        &self,
        manifest: IndexManifest,
        entries: Vec<IndexEntry>,
    ) -> Result<(), StoreError> {
        if let Some(entry) = entries
            .iter()
            .find(|entry| entry.vector.len() != manifest.dimension)
        {
            return Err(StoreError::DimensionMismatch {
                expected: manifest.dimension,
                actual: entry.vector.len(),
            });
        }

        if let Some(parent) = self.root.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| io_error(parent, source))?;
        }

        let staging = self.sibling("staging");
        if let Err(error) = self.write_staging(&staging, &manifest, &entries).await {
            let _ = fs::remove_dir_all(&staging).await;
            return Err(error);
        }

        let mut guard = self.loaded.write().await;
        let retired = if fs::try_exists(&self.root)
            .await
            .map_err(|source| io_error(&self.root, source))?
        {
            let retired = self.sibling("retired");
            fs::rename(&self.root, &retired)
                .await
                .map_err(|source| io_error(&self.root, source))?;
            Some(retired)
        } else {
            None
        };

        if let Err(source) = fs::rename(&staging, &self.root).await {
            if let Some(retired) = &retired {
                let _ = fs::rename(retired, &self.root).await;
            }
            let _ = fs::remove_dir_all(&staging).await;
            return Err(io_error(&self.root, source));
        }

        if let Some(retired) = retired
            && let Err(error) = fs::remove_dir_all(&retired).await
        {
            tracing::warn!(path = %retired.display(), %error, "Failed to remove previous index");
        }

        tracing::info!(
            root = %self.root.display(),
            entries = entries.len(),
            dimension = manifest.dimension,
            "Local index written"
        );
        *guard = Some(Arc::new(LoadedIndex { manifest, entries }));
        Ok(())
    }

    async fn manifest(&self) -> Result<IndexManifest, StoreError> {
        Ok(self.load().await?.manifest.clone())
    }

    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, StoreError> {
        let index = self.load().await?;
        if vector.len() != index.manifest.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: index.manifest.dimension,
                actual: vector.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = index
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, cosine_similarity(vector, &entry.vector)))
            .collect();
        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(position, score)| RetrievedChunk {
                text: index.entries[position].text.clone(),
                score,
            })
            .collect())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}
