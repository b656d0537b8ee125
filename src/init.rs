//! Initialization helpers for preparing storage before starting the
//! Voxmeter Gateway server.
//!
//! This module hosts the logic that powers the `voxmeter-gateway init` CLI
//! command. The command creates the SQLite schema and the artifact directory
//! so that the first server start does not race on either.
//!
//! Typical usage from the CLI:
//!
//! ```text
//! $ DATABASE_PATH=/var/lib/voxmeter/voxmeter.db voxmeter-gateway init
//! ```

use anyhow::{Context, Result};

use crate::config::ServerConfig;
use crate::store::{AccountStore, Database, FsArtifactStore, SqliteAccountStore};

/// Create the database schema and artifact directory.
pub async fn run(config: &ServerConfig) -> Result<()> {
    let db = Database::open(&config.database_path).with_context(|| {
        format!(
            "failed to initialize database {}",
            config.database_path.display()
        )
    })?;
    tracing::info!(path = %config.database_path.display(), "Database schema ready");

    FsArtifactStore::new(config.artifact_dir.clone())
        .await
        .with_context(|| {
            format!(
                "failed to create artifact directory {}",
                config.artifact_dir.display()
            )
        })?;
    tracing::info!(path = %config.artifact_dir.display(), "Artifact directory ready");

    let accounts = SqliteAccountStore::new(db).count()?;
    tracing::info!(accounts, "Initialization complete");

    Ok(())
}
