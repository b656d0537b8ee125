pub mod analytics;
pub mod metering;
pub mod provider;
pub mod script;
pub mod voices;

// Re-export commonly used types for convenience
pub use analytics::{AnalyticsAggregator, UsageReport};
pub use metering::{
    BillableRequest, CommitStage, CostPolicy, MeteredCoordinator, MeteredOutcome, MeteringError,
    MeteringStores, Receipt, SynthesisMode,
};
pub use provider::{
    AudioInput, ElevenLabsConfig, ElevenLabsProvider, ProviderError, ProviderResult,
    ProviderVoice, SubscriptionUsage, VoiceProvider, VoiceSettings,
};
pub use script::{ScriptFilter, ScriptReport};
pub use voices::{CatalogError, CatalogVoice, ConversionTarget, VoiceCatalog};
