//! In-memory artifact store for tests.

use async_trait::async_trait;
use dashmap::DashMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::artifacts::ArtifactStore;
use crate::core::{extension_for_mime, ArtifactLocator, ArtifactRole};
use crate::errors::Result;

/// Keeps artifacts in a map keyed by the path a filesystem store would use.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    files: DashMap<PathBuf, Vec<u8>>,
}

impl MemoryArtifactStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a file, e.g. an uploaded reference image.
    pub fn insert_file(&self, path: impl Into<PathBuf>, bytes: Vec<u8>) {
        self.files.insert(path.into(), bytes);
    }

    /// Returns true if a file exists at the path.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    /// Returns a copy of the stored bytes.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.get(path).map(|entry| entry.value().clone())
    }

    /// Number of stored files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn persist(
        &self,
        task_id: &str,
        role: ArtifactRole,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<ArtifactLocator> {
        let file_name = role.file_name(task_id, extension_for_mime(mime_type));
        let dir = match role {
            ArtifactRole::Reference => "assets",
            ArtifactRole::Product | ArtifactRole::Synthesized | ArtifactRole::Final => "outputs",
        };
        let path = Path::new(dir).join(&file_name);
        self.files.insert(path.clone(), bytes.to_vec());

        Ok(ArtifactLocator {
            role,
            path,
            url: format!("/outputs/{file_name}"),
            mime_type: mime_type.to_string(),
        })
    }

    async fn load(&self, path: &Path) -> Result<Vec<u8>> {
        self.get(path).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} not stored", path.display())).into()
        })
    }

    async fn exists(&self, path: &Path) -> bool {
        self.contains(path)
    }

    fn reference_path(&self, task_id: &str) -> PathBuf {
        Path::new("assets").join(ArtifactRole::Reference.file_name(task_id, "png"))
    }
}
