use std::sync::Arc;

use anyhow::Context;

use crate::auth::{LogResetNotifier, ResetNotifier, TokenService};
use crate::config::ServerConfig;
use crate::core::{
    AnalyticsAggregator, CostPolicy, ElevenLabsConfig, ElevenLabsProvider, MeteredCoordinator,
    MeteringStores, VoiceCatalog, VoiceProvider,
};
use crate::store::{
    AccountStore, ArtifactStore, Database, FsArtifactStore, HistoryStore, SqliteAccountStore,
    SqliteHistoryStore, SqliteVoiceStore, VoiceStore,
};

/// Process-wide state shared by all handlers.
///
/// Built once at startup; every component receives its collaborators here
/// instead of reaching for globals.
pub struct AppState {
    pub config: ServerConfig,
    pub db: Database,
    pub accounts: Arc<dyn AccountStore>,
    pub history: Arc<dyn HistoryStore>,
    pub voices: Arc<dyn VoiceStore>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub provider: Arc<dyn VoiceProvider>,
    pub catalog: Arc<VoiceCatalog>,
    pub tokens: TokenService,
    pub coordinator: Arc<MeteredCoordinator>,
    pub analytics: AnalyticsAggregator,
    pub notifier: Arc<dyn ResetNotifier>,
}

impl AppState {
    /// Open storage and build the ElevenLabs client from `config`.
    pub async fn new(config: ServerConfig) -> anyhow::Result<Arc<Self>> {
        let provider = ElevenLabsProvider::new(ElevenLabsConfig::from_provider_config(
            &config.provider,
        ))
        .context("failed to build provider client")?;

        if config.provider.api_key.is_none() {
            tracing::warn!("ELEVENLABS_API_KEY not set; provider calls will fail");
        }

        Self::with_collaborators(config, Arc::new(provider), Arc::new(LogResetNotifier)).await
    }

    /// Build state around an existing provider and reset notifier.
    pub async fn with_collaborators(
        config: ServerConfig,
        provider: Arc<dyn VoiceProvider>,
        notifier: Arc<dyn ResetNotifier>,
    ) -> anyhow::Result<Arc<Self>> {
        let catalog =
            Arc::new(VoiceCatalog::from_table(&config.voices).context("invalid voice table")?);

        let db = Database::open(&config.database_path).with_context(|| {
            format!("failed to open database {}", config.database_path.display())
        })?;
        let artifacts: Arc<dyn ArtifactStore> = Arc::new(
            FsArtifactStore::new(config.artifact_dir.clone())
                .await
                .with_context(|| {
                    format!(
                        "failed to prepare artifact directory {}",
                        config.artifact_dir.display()
                    )
                })?,
        );

        let accounts: Arc<dyn AccountStore> = Arc::new(SqliteAccountStore::new(db.clone()));
        let history: Arc<dyn HistoryStore> = Arc::new(SqliteHistoryStore::new(db.clone()));
        let voices: Arc<dyn VoiceStore> = Arc::new(SqliteVoiceStore::new(db.clone()));

        let coordinator = Arc::new(MeteredCoordinator::new(
            MeteringStores {
                accounts: accounts.clone(),
                history: history.clone(),
                voices: voices.clone(),
                artifacts: artifacts.clone(),
            },
            provider.clone(),
            catalog.clone(),
            CostPolicy::from_config(&config.metering),
        ));
        let analytics =
            AnalyticsAggregator::new(provider.clone(), accounts.clone(), history.clone());
        let tokens = TokenService::from_config(&config.auth);

        tracing::info!(
            database = %config.database_path.display(),
            artifacts = %config.artifact_dir.display(),
            provider = provider.name(),
            "Application state initialized"
        );

        Ok(Arc::new(Self {
            config,
            db,
            accounts,
            history,
            voices,
            artifacts,
            provider,
            catalog,
            tokens,
            coordinator,
            analytics,
            notifier,
        }))
    }
}
