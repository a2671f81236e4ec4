//! File-backed artifact ledger: one JSON document per artifact, never deleted.
//!
//! The trait methods run their file I/O on tokio's blocking pool, so
//! concurrent sweeps do not stall the executor.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::task;
use tracing::debug;

use super::ArtifactStore;
use crate::proposals::{
    Artifact, ArtifactError, ArtifactKind, ArtifactTransition, InterestEdits, TransitionOutcome,
};

#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    root: PathBuf,
}

impl FileArtifactStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create artifact directory {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn list_all(&self) -> Result<Vec<Artifact>> {
        let mut artifacts = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type()?.is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some("json")
            {
                continue;
            }
            artifacts.push(read_artifact(&path)?);
        }
        artifacts.sort_by(|a, b| {
            a.batch_id
                .cmp(&b.batch_id)
                .then(a.position.cmp(&b.position))
        });
        Ok(artifacts)
    }

    fn path(&self, artifact_id: &str) -> Result<PathBuf> {
        if artifact_id.is_empty()
            || artifact_id.contains(['/', '\\'])
            || artifact_id.starts_with('.')
        {
            bail!("Invalid artifact id '{artifact_id}'");
        }
        Ok(self.root.join(format!("{artifact_id}.json")))
    }

    fn write(&self, artifact: &Artifact) -> Result<()> {
        let path = self.path(&artifact.id)?;
        let data = serde_json::to_vec_pretty(artifact)?;
        fs::write(&path, data)
            .with_context(|| format!("Failed to write artifact {}", path.display()))
    }

    fn load(&self, artifact_id: &str) -> Result<Option<Artifact>> {
        let path = self.path(artifact_id)?;
        if !path.exists() {
            return Ok(None);
        }
        read_artifact(&path).map(Some)
    }

    async fn blocking<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&FileArtifactStore) -> Result<T> + Send + 'static,
    {
        let store = self.clone();
        task::spawn_blocking(move || job(&store))
            .await
            .context("Artifact store task failed")?
    }

    fn transition(
        &self,
        artifact_id: &str,
        kind: ArtifactKind,
        transition: ArtifactTransition,
    ) -> Result<Artifact> {
        let mut artifact = self
            .load(artifact_id)?
            .ok_or_else(|| ArtifactError::NotFound(artifact_id.to_string()))?;
        match artifact.resolve(kind, transition)? {
            TransitionOutcome::Applied => {
                self.write(&artifact)?;
                debug!(artifact = artifact_id, status = artifact.status.as_str(), "artifact resolved");
            }
            TransitionOutcome::Replayed => {
                debug!(artifact = artifact_id, status = artifact.status.as_str(), "artifact already resolved");
            }
        }
        Ok(artifact)
    }
}

fn read_artifact(path: &Path) -> Result<Artifact> {
    let data = fs::read(path)?;
    serde_json::from_slice(&data)
        .with_context(|| format!("Failed parsing artifact {}", path.display()))
}

#[async_trait]
impl ArtifactStore for FileArtifactStore {
    /// Artifacts already on disk are left untouched.
    async fn record_pending(&self, artifacts: &[Artifact]) -> Result<()> {
        let artifacts = artifacts.to_vec();
        self.blocking(move |store| {
            for artifact in &artifacts {
                if store.path(&artifact.id)?.exists() {
                    continue;
                }
                store.write(artifact)?;
            }
            Ok(())
        })
        .await
    }

    async fn get(&self, artifact_id: &str) -> Result<Option<Artifact>> {
        let artifact_id = artifact_id.to_string();
        self.blocking(move |store| store.load(&artifact_id)).await
    }

    async fn accept_profile_edit(&self, artifact_id: &str) -> Result<Artifact> {
        let artifact_id = artifact_id.to_string();
        self.blocking(move |store| {
            store.transition(&artifact_id, ArtifactKind::ProfileEdit, ArtifactTransition::Accept)
        })
        .await
    }

    async fn accept_profile_edit_with_edit(
        &self,
        artifact_id: &str,
        value: Value,
    ) -> Result<Artifact> {
        let artifact_id = artifact_id.to_string();
        self.blocking(move |store| {
            store.transition(
                &artifact_id,
                ArtifactKind::ProfileEdit,
                ArtifactTransition::AcceptWithEdit(value),
            )
        })
        .await
    }

    async fn reject_profile_edit(&self, artifact_id: &str) -> Result<Artifact> {
        let artifact_id = artifact_id.to_string();
        self.blocking(move |store| {
            store.transition(&artifact_id, ArtifactKind::ProfileEdit, ArtifactTransition::Reject)
        })
        .await
    }

    async fn accept_interest_proposal(
        &self,
        artifact_id: &str,
        edits: Option<InterestEdits>,
    ) -> Result<Artifact> {
        let transition = ArtifactTransition::for_interest(edits.as_ref())?;
        let artifact_id = artifact_id.to_string();
        self.blocking(move |store| {
            store.transition(&artifact_id, ArtifactKind::InterestProposal, transition)
        })
        .await
    }

    async fn reject_interest_proposal(&self, artifact_id: &str) -> Result<Artifact> {
        let artifact_id = artifact_id.to_string();
        self.blocking(move |store| {
            store.transition(
                &artifact_id,
                ArtifactKind::InterestProposal,
                ArtifactTransition::Reject,
            )
        })
        .await
    }

    async fn pending_for_batch(&self, batch_id: &str) -> Result<Vec<Artifact>> {
        let batch_id = batch_id.to_string();
        self.blocking(move |store| {
            Ok(store
                .list_all()?
                .into_iter()
                .filter(|a| a.batch_id == batch_id && !a.status.is_terminal())
                .collect())
        })
        .await
    }
}
