//! Credit-metered operations.
//!
//! Every billable request runs through the same sequence:
//!
//! 1. **Admission**: input shape, size ceilings, script ratio and voice lookup.
//! 2. **Quota check**: `has_capacity(account, cost)`.
//! 3. **Provider invocation**: one call, never retried.
//! 4. **Commit**: persist the artifact, charge with a conditional increment,
//!    append the ledger record.
//! 5. **Success**: artifact, cost charged and remaining credits.
//!
//! The charge at commit only applies when `credits_used + cost <= credits_limit`
//! still holds, so concurrent requests on one account never push usage past
//! its limit. A request that loses that race after the provider already
//! produced audio ends as [`MeteredOutcome::PartialFailure`].

mod coordinator;


use serde::Serialize;
use thiserror::Error;

use crate::config::MeteringConfig;
use crate::core::provider::{AudioInput, ProviderError};
use crate::core::voices::ConversionTarget;
use crate::store::{ArtifactRef, StoreError};

pub use crate::store::{OperationDetail, OperationKind};
pub use coordinator::{MeteredCoordinator, MeteringStores};

/// Characters kept in a ledger text excerpt
pub const EXCERPT_CHARS: usize = 200;

/// Characters per second used for duration estimates
pub const CHARS_PER_SECOND: f64 = 15.0;

/// Where a synthesis text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SynthesisMode {
    #[default]
    Manual,
    Upload,
    Database,
}

impl SynthesisMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "manual" => Some(SynthesisMode::Manual),
            "upload" => Some(SynthesisMode::Upload),
            "database" => Some(SynthesisMode::Database),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SynthesisMode::Manual => "manual",
            SynthesisMode::Upload => "upload",
            SynthesisMode::Database => "database",
        }
    }
}

/// A billable request, already bound to an authenticated account
#[derive(Debug, Clone)]
pub enum BillableRequest {
    TextSynthesis {
        text: String,
        /// Synthesis preset key; `None` selects the default preset
        voice: Option<String>,
        mode: SynthesisMode,
    },
    VoiceConversion {
        audio: AudioInput,
        target: ConversionTarget,
    },
    /// Synthesis with a cloned voice: a premium preset or one the account cloned
    VoiceCloning { text: String, voice: String },
}

impl BillableRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            BillableRequest::TextSynthesis { .. } => OperationKind::TextSynthesis,
            BillableRequest::VoiceConversion { .. } => OperationKind::VoiceConversion,
            BillableRequest::VoiceCloning { .. } => OperationKind::VoiceCloning,
        }
    }
}

/// Cost and admission limits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostPolicy {
    pub conversion_cost: u64,
    pub max_text_chars: usize,
    pub max_audio_bytes: usize,
    pub script_threshold: f64,
}

impl Default for CostPolicy {
    fn default() -> Self {
        Self::from_config(&MeteringConfig::default())
    }
}

impl CostPolicy {
    pub fn from_config(config: &MeteringConfig) -> Self {
        Self {
            conversion_cost: config.conversion_cost,
            max_text_chars: config.max_text_chars,
            max_audio_bytes: config.max_audio_bytes,
            script_threshold: config.script_threshold,
        }
    }

    /// Credits charged for a request: one per character of trimmed text, or
    /// the flat conversion cost.
    pub fn cost_of(&self, request: &BillableRequest) -> u64 {
        match request {
            BillableRequest::TextSynthesis { text, .. } | BillableRequest::VoiceCloning { text, .. } => {
                text_cost(text)
            }
            BillableRequest::VoiceConversion { .. } => self.conversion_cost,
        }
    }
}

pub fn text_cost(text: &str) -> u64 {
    text.trim().chars().count() as u64
}

/// Commit step that failed after the provider succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitStage {
    /// Audio could not be stored; nothing was charged
    Artifact,
    /// The charge was refused or failed; the artifact exists
    Charge,
    /// Charged, but the ledger record was not written
    Record,
}

impl CommitStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitStage::Artifact => "artifact",
            CommitStage::Charge => "charge",
            CommitStage::Record => "record",
        }
    }
}

/// What a successful operation produced and cost
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub record_id: String,
    pub kind: OperationKind,
    pub artifact: ArtifactRef,
    pub cost_charged: u64,
    pub credits_remaining: u64,
    pub detail: OperationDetail,
}

/// Terminal state of a metered operation
#[derive(Debug, Clone, PartialEq)]
pub enum MeteredOutcome {
    Success(Receipt),
    /// Rejected at admission; nothing was charged or called
    InvalidInput(String),
    QuotaExceeded { required: u64, remaining: u64 },
    /// The provider failed; nothing was charged or recorded
    ProviderFailure(ProviderError),
    /// Audio was generated but billing or record-keeping did not complete
    PartialFailure {
        kind: OperationKind,
        artifact: Option<ArtifactRef>,
        cost: u64,
        /// Credits actually applied to the account
        charged: u64,
        stage: CommitStage,
        reason: String,
    },
}

impl MeteredOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, MeteredOutcome::Success(_))
    }
}

/// Failures that stop an operation before any billable work happened
#[derive(Debug, Error)]
pub enum MeteringError {
    #[error("account store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("account {0} not found")]
    AccountNotFound(String),

    #[error("metered task aborted: {0}")]
    Aborted(String),
}

pub(crate) fn excerpt(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

pub(crate) fn estimated_duration(text: &str) -> f64 {
    text.chars().count() as f64 / CHARS_PER_SECOND
}
