use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, error, info, warn};

use super::{
    BillableRequest, CommitStage, CostPolicy, MeteredOutcome, MeteringError, Receipt,
    SynthesisMode, estimated_duration, excerpt,
};
use crate::core::provider::{
    AudioInput, ProviderResult, VoiceProvider, VoiceSettings, detect_audio_format,
};
use crate::core::script::ScriptFilter;
use crate::core::voices::VoiceCatalog;
use crate::store::{
    AccountStore, ArtifactStore, HistoryStore, NewOperationRecord, OperationDetail,
    OperationKind, VoiceStore,
};

const RECONCILIATION_TARGET: &str = "voxmeter::reconciliation";

/// Stores the coordinator reads and writes
#[derive(Clone)]
pub struct MeteringStores {
    pub accounts: Arc<dyn AccountStore>,
    pub history: Arc<dyn HistoryStore>,
    pub voices: Arc<dyn VoiceStore>,
    pub artifacts: Arc<dyn ArtifactStore>,
}

/// Provider call decided at admission
enum ProviderCall {
    Synthesize { text: String, voice_id: String },
    Convert { audio: AudioInput, voice_id: String },
}

/// A request that passed admission
struct Admitted {
    kind: OperationKind,
    cost: u64,
    call: ProviderCall,
    detail: OperationDetail,
}

/// Runs billable requests through admission, quota, provider and commit.
pub struct MeteredCoordinator {
    stores: MeteringStores,
    provider: Arc<dyn VoiceProvider>,
    catalog: Arc<VoiceCatalog>,
    policy: CostPolicy,
    filter: ScriptFilter,
}

impl MeteredCoordinator {
    pub fn new(
        stores: MeteringStores,
        provider: Arc<dyn VoiceProvider>,
        catalog: Arc<VoiceCatalog>,
        policy: CostPolicy,
    ) -> Self {
        Self {
            stores,
            provider,
            catalog,
            filter: ScriptFilter::new(policy.script_threshold),
            policy,
        }
    }

    pub fn policy(&self) -> &CostPolicy {
        &self.policy
    }

    pub fn script_filter(&self) -> &ScriptFilter {
        &self.filter
    }

    /// Run the request on its own task and wait for it.
    ///
    /// Dropping the returned future does not cancel the task, so an in-flight
    /// provider call still completes and gets billed and recorded.
    pub async fn execute_detached(
        self: Arc<Self>,
        account_id: String,
        request: BillableRequest,
    ) -> Result<MeteredOutcome, MeteringError> {
        let handle = tokio::spawn(async move { self.execute(&account_id, request).await });
        handle
            .await
            .map_err(|e| MeteringError::Aborted(e.to_string()))?
    }

    pub async fn execute(
        &self,
        account_id: &str,
        request: BillableRequest,
    ) -> Result<MeteredOutcome, MeteringError> {
        let kind = request.kind();

        // Admission
        let admitted = match self.admit(account_id, request)? {
            Ok(admitted) => admitted,
            Err(reason) => {
                info!(account_id = %account_id, kind = %kind, reason = %reason, "Request rejected at admission");
                return Ok(MeteredOutcome::InvalidInput(reason));
            }
        };
        let cost = admitted.cost;

        // Quota check
        if !self.stores.accounts.has_capacity(account_id, cost)? {
            let account = self
                .stores
                .accounts
                .find_by_id(account_id)?
                .ok_or_else(|| MeteringError::AccountNotFound(account_id.to_string()))?;
            let remaining = account.credits_remaining();
            info!(account_id = %account_id, kind = %kind, cost, remaining, "Quota exceeded");
            return Ok(MeteredOutcome::QuotaExceeded {
                required: cost,
                remaining,
            });
        }
        debug!(account_id = %account_id, kind = %kind, cost, "Quota check passed");

        // Provider invocation
        let audio = match self.invoke(&admitted.call).await {
            Ok(audio) => audio,
            Err(e) => {
                warn!(account_id = %account_id, kind = %kind, cost, error = %e, "Provider call failed");
                return Ok(MeteredOutcome::ProviderFailure(e));
            }
        };
        debug!(account_id = %account_id, kind = %kind, bytes = audio.len(), "Provider returned audio");

        Ok(self.commit(account_id, admitted, audio).await)
    }

    /// Returns `Ok(Err(reason))` for rejected input. Store failures while
    /// resolving an account-owned voice propagate as `Err`.
    fn admit(
        &self,
        account_id: &str,
        request: BillableRequest,
    ) -> Result<Result<Admitted, String>, MeteringError> {
        let cost = self.policy.cost_of(&request);
        let kind = request.kind();

        match request {
            BillableRequest::TextSynthesis { text, voice, mode } => {
                let text = match self.check_text(&text) {
                    Ok(text) => text,
                    Err(reason) => return Ok(Err(reason)),
                };
                let Some(preset) = self.catalog.synthesis_voice(voice.as_deref()) else {
                    return Ok(Err(format!(
                        "Unknown voice '{}'",
                        voice.unwrap_or_default()
                    )));
                };
                let detail = text_detail(&text, Some(mode), &preset.key, &preset.name);
                Ok(Ok(Admitted {
                    kind,
                    cost,
                    call: ProviderCall::Synthesize {
                        text,
                        voice_id: preset.voice_id.clone(),
                    },
                    detail,
                }))
            }
            BillableRequest::VoiceCloning { text, voice } => {
                let text = match self.check_text(&text) {
                    Ok(text) => text,
                    Err(reason) => return Ok(Err(reason)),
                };
                let resolved = match self.catalog.cloned_voice(&voice) {
                    Some(preset) => Some((
                        preset.key.clone(),
                        preset.name.clone(),
                        preset.voice_id.clone(),
                    )),
                    None => self
                        .stores
                        .voices
                        .find_owned(account_id, voice.trim())?
                        .map(|owned| (owned.voice_id.clone(), owned.name, owned.voice_id)),
                };
                let Some((key, name, voice_id)) = resolved else {
                    return Ok(Err(format!("Unknown voice '{voice}'")));
                };
                let detail = text_detail(&text, None, &key, &name);
                Ok(Ok(Admitted {
                    kind,
                    cost,
                    call: ProviderCall::Synthesize { text, voice_id },
                    detail,
                }))
            }
            BillableRequest::VoiceConversion { audio, target } => {
                if audio.is_empty() {
                    return Ok(Err("Audio file is empty".to_string()));
                }
                if audio.len() > self.policy.max_audio_bytes {
                    return Ok(Err(format!(
                        "File too large. Max {} bytes allowed",
                        self.policy.max_audio_bytes
                    )));
                }
                let declared_audio = audio.content_type.starts_with("audio/");
                let (_, ext) = detect_audio_format(&audio.bytes);
                if !declared_audio && ext == "bin" {
                    return Ok(Err(
                        "Invalid file type. Please upload an audio file".to_string()
                    ));
                }

                let voice = self.catalog.conversion_voice(target);
                let detail = OperationDetail {
                    voice_key: Some(target.as_str().to_string()),
                    voice_name: Some(voice.name.clone()),
                    input_bytes: Some(audio.len()),
                    ..OperationDetail::default()
                };
                Ok(Ok(Admitted {
                    kind,
                    cost,
                    call: ProviderCall::Convert {
                        audio,
                        voice_id: voice.voice_id.clone(),
                    },
                    detail,
                }))
            }
        }
    }

    fn check_text(&self, text: &str) -> Result<String, String> {
        let text = text.trim();
        if text.is_empty() {
            return Err("Text is required".to_string());
        }
        let chars = text.chars().count();
        if chars > self.policy.max_text_chars {
            return Err(format!(
                "Text too long: {chars} characters, max {}",
                self.policy.max_text_chars
            ));
        }
        if !self.filter.accepts(text) {
            return Err("Text must be in Urdu script".to_string());
        }
        Ok(text.to_string())
    }

    async fn invoke(&self, call: &ProviderCall) -> ProviderResult<Bytes> {
        match call {
            ProviderCall::Synthesize { text, voice_id } => {
                self.provider
                    .synthesize(text, voice_id, &VoiceSettings::synthesis())
                    .await
            }
            ProviderCall::Convert { audio, voice_id } => {
                self.provider
                    .convert(audio, voice_id, &VoiceSettings::conversion())
                    .await
            }
        }
    }

    async fn commit(&self, account_id: &str, admitted: Admitted, audio: Bytes) -> MeteredOutcome {
        let Admitted {
            kind,
            cost,
            mut detail,
            ..
        } = admitted;
        if kind == OperationKind::VoiceConversion {
            detail.output_bytes = Some(audio.len());
        }

        // (a) artifact
        let artifact = match self.stores.artifacts.persist(kind, &audio).await {
            Ok(artifact) => artifact,
            Err(e) => {
                error!(
                    target: RECONCILIATION_TARGET,
                    account_id = %account_id,
                    kind = %kind,
                    cost,
                    stage = CommitStage::Artifact.as_str(),
                    error = %e,
                    "Generated audio could not be stored; provider cost is unbilled"
                );
                return MeteredOutcome::PartialFailure {
                    kind,
                    artifact: None,
                    cost,
                    charged: 0,
                    stage: CommitStage::Artifact,
                    reason: e.to_string(),
                };
            }
        };

        // (b) conditional charge
        let charge = self
            .stores
            .accounts
            .increment_used_within_limit(account_id, cost);
        let refusal = match charge {
            Ok(true) => None,
            Ok(false) => Some(self.refusal_reason(account_id)),
            Err(e) => Some(e.to_string()),
        };
        if let Some(reason) = refusal {
            error!(
                target: RECONCILIATION_TARGET,
                account_id = %account_id,
                kind = %kind,
                cost,
                stage = CommitStage::Charge.as_str(),
                artifact = %artifact.id,
                reason = %reason,
                "Generated audio was not billed"
            );
            return MeteredOutcome::PartialFailure {
                kind,
                artifact: Some(artifact),
                cost,
                charged: 0,
                stage: CommitStage::Charge,
                reason,
            };
        }

        // (c) ledger record
        let record = NewOperationRecord::new(account_id, kind, cost, artifact.id.clone(), detail);
        let record = match self.stores.history.append(record) {
            Ok(record) => record,
            Err(e) => {
                error!(
                    target: RECONCILIATION_TARGET,
                    account_id = %account_id,
                    kind = %kind,
                    cost,
                    stage = CommitStage::Record.as_str(),
                    artifact = %artifact.id,
                    error = %e,
                    "Operation was billed but not recorded"
                );
                return MeteredOutcome::PartialFailure {
                    kind,
                    artifact: Some(artifact),
                    cost,
                    charged: cost,
                    stage: CommitStage::Record,
                    reason: e.to_string(),
                };
            }
        };

        let credits_remaining = match self.stores.accounts.find_by_id(account_id) {
            Ok(Some(account)) => account.credits_remaining(),
            Ok(None) => 0,
            Err(e) => {
                warn!(account_id = %account_id, error = %e, "Could not read remaining credits");
                0
            }
        };

        info!(
            account_id = %account_id,
            kind = %kind,
            cost,
            artifact = %artifact.id,
            credits_remaining,
            "Metered operation completed"
        );

        MeteredOutcome::Success(Receipt {
            record_id: record.id,
            kind,
            artifact,
            cost_charged: cost,
            credits_remaining,
            detail: record.detail,
        })
    }

    /// Why a conditional charge was refused after the provider succeeded.
    fn refusal_reason(&self, account_id: &str) -> String {
        match self.stores.accounts.find_by_id(account_id) {
            Ok(Some(_)) => "quota exhausted by concurrent request".to_string(),
            Ok(None) => "account no longer exists".to_string(),
            Err(e) => e.to_string(),
        }
    }
}

fn text_detail(
    text: &str,
    mode: Option<SynthesisMode>,
    voice_key: &str,
    voice_name: &str,
) -> OperationDetail {
    OperationDetail {
        mode: mode.map(|m| m.as_str().to_string()),
        text: Some(excerpt(text)),
        text_length: Some(text.chars().count()),
        voice_key: Some(voice_key.to_string()),
        voice_name: Some(voice_name.to_string()),
        duration_seconds: Some(estimated_duration(text)),
        ..OperationDetail::default()
    }
}
