//! Generated audio on the local filesystem.
//!
//! Files are named `{prefix}_{random id}.mp3` under one output directory and are
//! referenced from ledger rows by that file name. Deleting a ledger row does not
//! delete its file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;

use super::{OperationKind, StoreError, StoreResult};

/// Stable reference to a persisted artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRef {
    /// File name, also the public id
    pub id: String,
    pub size_bytes: usize,
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Write the audio and return its reference.
    async fn persist(&self, kind: OperationKind, audio: &[u8]) -> StoreResult<ArtifactRef>;

    /// Read an artifact back. `None` when it does not exist.
    async fn load(&self, id: &str) -> StoreResult<Option<Vec<u8>>>;
}

/// Artifact ids are plain file names: no separators, no parent references.
pub fn is_valid_artifact_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && !id.contains("..")
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn file_prefix(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::TextSynthesis => "tts",
        OperationKind::VoiceConversion => "sts",
        OperationKind::VoiceCloning => "clone",
    }
}

pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Use `root` as the output directory, creating it if needed.
    pub async fn new(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> StoreResult<PathBuf> {
        if !is_valid_artifact_id(id) {
            return Err(StoreError::InvalidArtifactId(id.to_string()));
        }
        Ok(self.root.join(id))
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn persist(&self, kind: OperationKind, audio: &[u8]) -> StoreResult<ArtifactRef> {
        let id = format!("{}_{}.mp3", file_prefix(kind), uuid::Uuid::new_v4().simple());
        let path = self.path_for(&id)?;

        // Write then rename so readers never observe a partial file
        let partial = self.root.join(format!("{id}.part"));
        tokio::fs::write(&partial, audio).await?;
        tokio::fs::rename(&partial, &path).await?;

        tracing::debug!(artifact = %id, bytes = audio.len(), "Persisted artifact");
        Ok(ArtifactRef {
            id,
            size_bytes: audio.len(),
        })
    }

    async fn load(&self, id: &str) -> StoreResult<Option<Vec<u8>>> {
        let path = self.path_for(id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
