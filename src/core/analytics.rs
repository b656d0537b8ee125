//! Admin usage report.
//!
//! Combines provider-reported subscription usage, the local operation ledger
//! and the static pricing table. Read-only. A failing source is reported
//! inline as `{ "error": "..." }` and the rest of the report is still built.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;

use crate::config::pricing::{
    PlanPricing, estimate_monthly_cost, get_plan_pricing, get_voice_overage, list_plans,
    tts_cost_per_credit,
};
use crate::core::provider::VoiceProvider;
use crate::store::{AccountStore, HistoryStore, KindTotals, OperationKind, OperationRecord};

/// Days of ledger covered by the local usage section
pub const LOCAL_WINDOW_DAYS: i64 = 30;

/// Latest operations listed in the local usage section
pub const RECENT_OPERATIONS: u32 = 10;

pub const CRITICAL_PERCENT: f64 = 95.0;
pub const WARNING_PERCENT: f64 = 80.0;
pub const INFO_PERCENT: f64 = 50.0;
pub const RESET_NOTICE_DAYS: i64 = 3;

/// A report section that may have failed to load
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Section<T> {
    Ok(T),
    Unavailable { error: String },
}

impl<T> Section<T> {
    pub fn unavailable(error: impl ToString) -> Self {
        Section::Unavailable {
            error: error.to_string(),
        }
    }

    pub fn ok(&self) -> Option<&T> {
        match self {
            Section::Ok(value) => Some(value),
            Section::Unavailable { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
    pub action: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderSection {
    pub provider: &'static str,
    pub tier: String,
    pub status: Option<String>,
    pub characters_used: u64,
    pub characters_limit: u64,
    pub characters_remaining: u64,
    pub usage_percent: f64,
    pub voice_count: Option<u64>,
    pub voice_limit: Option<u64>,
    pub next_reset: Option<DateTime<Utc>>,
    pub days_until_reset: Option<i64>,
    pub plan: Option<PlanPricing>,
    pub voice_overage_per_minute: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocalUsageSection {
    pub since: DateTime<Utc>,
    pub accounts: u64,
    pub total_operations: u64,
    pub total_credits: u64,
    pub by_kind: BTreeMap<OperationKind, KindTotals>,
    pub by_date: BTreeMap<String, u64>,
    pub recent: Vec<OperationRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanEntry {
    pub tier: &'static str,
    #[serde(flatten)]
    pub pricing: PlanPricing,
}

#[derive(Debug, Clone, Serialize)]
pub struct PricingSection {
    pub provider: &'static str,
    pub plans: Vec<PlanEntry>,
    pub tts_cost_per_credit: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub tier: String,
    pub usage_percent: f64,
    pub characters_remaining: u64,
    pub days_until_reset: Option<i64>,
    pub estimated_monthly_cost_usd: Option<f64>,
    pub cost_per_character_usd: Option<f64>,
    pub local_operations: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageReport {
    pub provider: Section<ProviderSection>,
    pub local_usage: Section<LocalUsageSection>,
    pub pricing: PricingSection,
    pub alerts: Vec<Alert>,
    /// Present only when provider usage is available
    pub summary: Option<ReportSummary>,
    pub generated_at: DateTime<Utc>,
}

/// Percent of `limit` consumed by `used`; zero when there is no limit.
pub fn usage_percent(used: u64, limit: u64) -> f64 {
    if limit == 0 {
        return 0.0;
    }
    let percent = used as f64 / limit as f64 * 100.0;
    (percent * 100.0).round() / 100.0
}

/// Threshold alerts. Levels are exclusive; the reset notice is added on top.
pub fn usage_alerts(usage_percent: f64, days_until_reset: Option<i64>) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if usage_percent >= CRITICAL_PERCENT {
        alerts.push(Alert {
            level: AlertLevel::Critical,
            message: format!("Credits almost exhausted ({usage_percent:.1}% used)"),
            action: Some("Consider upgrading plan or limiting usage".to_string()),
        });
    } else if usage_percent >= WARNING_PERCENT {
        alerts.push(Alert {
            level: AlertLevel::Warning,
            message: format!("Credits running low ({usage_percent:.1}% used)"),
            action: Some("Monitor usage closely".to_string()),
        });
    } else if usage_percent >= INFO_PERCENT {
        alerts.push(Alert {
            level: AlertLevel::Info,
            message: format!("Halfway through credits ({usage_percent:.1}% used)"),
            action: None,
        });
    }

    if let Some(days) = days_until_reset {
        if days > 0 && days <= RESET_NOTICE_DAYS {
            alerts.push(Alert {
                level: AlertLevel::Info,
                message: format!("Credits reset in {days} days"),
                action: None,
            });
        }
    }

    alerts
}

pub fn pricing_section(provider: &'static str) -> PricingSection {
    PricingSection {
        provider,
        plans: list_plans(provider)
            .into_iter()
            .map(|(tier, pricing)| PlanEntry {
                tier,
                pricing: pricing.clone(),
            })
            .collect(),
        tts_cost_per_credit: tts_cost_per_credit(provider),
    }
}

pub struct AnalyticsAggregator {
    provider: Arc<dyn VoiceProvider>,
    accounts: Arc<dyn AccountStore>,
    history: Arc<dyn HistoryStore>,
}

impl AnalyticsAggregator {
    pub fn new(
        provider: Arc<dyn VoiceProvider>,
        accounts: Arc<dyn AccountStore>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            provider,
            accounts,
            history,
        }
    }

    pub async fn report(&self, now: DateTime<Utc>) -> UsageReport {
        let provider = self.provider_section(now).await;
        let local_usage = self.local_usage(now);

        let (alerts, summary) = match provider.ok() {
            Some(usage) => {
                let alerts = usage_alerts(usage.usage_percent, usage.days_until_reset);
                let summary = ReportSummary {
                    tier: usage.tier.clone(),
                    usage_percent: usage.usage_percent,
                    characters_remaining: usage.characters_remaining,
                    days_until_reset: usage.days_until_reset,
                    estimated_monthly_cost_usd: estimate_monthly_cost(
                        usage.provider,
                        &usage.tier,
                        usage.characters_used,
                    ),
                    cost_per_character_usd: usage.plan.as_ref().map(PlanPricing::cost_per_character),
                    local_operations: local_usage.ok().map(|local| local.total_operations),
                };
                (alerts, Some(summary))
            }
            None => (Vec::new(), None),
        };

        UsageReport {
            provider,
            local_usage,
            pricing: pricing_section(self.provider.name()),
            alerts,
            summary,
            generated_at: now,
        }
    }

    pub async fn provider_section(&self, now: DateTime<Utc>) -> Section<ProviderSection> {
        let usage = match self.provider.subscription().await {
            Ok(usage) => usage,
            Err(e) => {
                tracing::warn!(error = %e, "Provider usage unavailable for report");
                return Section::unavailable(e);
            }
        };

        let name = self.provider.name();
        let tier = usage.tier.to_lowercase();
        let next_reset = usage
            .next_reset_unix
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
        let days_until_reset = next_reset.map(|reset| (reset - now).num_days());

        Section::Ok(ProviderSection {
            provider: name,
            status: usage.status,
            characters_used: usage.character_count,
            characters_limit: usage.character_limit,
            characters_remaining: usage.character_limit.saturating_sub(usage.character_count),
            usage_percent: usage_percent(usage.character_count, usage.character_limit),
            voice_count: usage.voice_count,
            voice_limit: usage.voice_limit,
            next_reset,
            days_until_reset,
            plan: get_plan_pricing(name, &tier).cloned(),
            voice_overage_per_minute: get_voice_overage(name, &tier).map(|o| o.per_minute_usd),
            tier,
        })
    }

    pub fn local_usage(&self, now: DateTime<Utc>) -> Section<LocalUsageSection> {
        let since = now - Duration::days(LOCAL_WINDOW_DAYS);
        let totals = match self.history.ledger_totals(since) {
            Ok(totals) => totals,
            Err(e) => return Section::unavailable(e),
        };
        let recent = match self.history.latest_global(RECENT_OPERATIONS) {
            Ok(recent) => recent,
            Err(e) => return Section::unavailable(e),
        };
        let accounts = match self.accounts.count() {
            Ok(count) => count,
            Err(e) => return Section::unavailable(e),
        };

        Section::Ok(LocalUsageSection {
            since,
            accounts,
            total_operations: totals.total_operations,
            total_credits: totals.total_credits,
            by_kind: totals.by_kind,
            by_date: totals.by_date,
            recent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use tempfile::TempDir;

    use crate::core::provider::{
        AudioInput, ProviderError, ProviderResult, ProviderVoice, SubscriptionUsage,
        VoiceSettings,
    };
    use crate::store::{
        Database, HistoryPage, HistoryStats, LedgerTotals, NewAccount, NewOperationRecord,
        OperationDetail, PageRequest, SqliteAccountStore, SqliteHistoryStore, StoreError,
        StoreResult,
    };

    /// Provider that only answers subscription queries
    struct UsageProvider(Result<SubscriptionUsage, ProviderError>);

    #[async_trait]
    impl VoiceProvider for UsageProvider {
        fn name(&self) -> &'static str {
            "elevenlabs"
        }

        async fn synthesize(&self, _: &str, _: &str, _: &VoiceSettings) -> ProviderResult<Bytes> {
            Err(ProviderError::NotConfigured("report only".to_string()))
        }

        async fn convert(
            &self,
            _: &AudioInput,
            _: &str,
            _: &VoiceSettings,
        ) -> ProviderResult<Bytes> {
            Err(ProviderError::NotConfigured("report only".to_string()))
        }

        async fn clone_voice(&self, _: &str, _: &str, _: &[AudioInput]) -> ProviderResult<String> {
            Err(ProviderError::NotConfigured("report only".to_string()))
        }

        async fn list_voices(&self) -> ProviderResult<Vec<ProviderVoice>> {
            Ok(Vec::new())
        }

        async fn delete_voice(&self, _: &str) -> ProviderResult<()> {
            Ok(())
        }

        async fn subscription(&self) -> ProviderResult<SubscriptionUsage> {
            self.0.clone()
        }
    }

    /// Ledger that cannot be read
    struct UnreadableLedger;

    fn unreadable<T>() -> StoreResult<T> {
        Err(StoreError::Io(std::io::Error::other("ledger offline")))
    }

    impl HistoryStore for UnreadableLedger {
        fn append(&self, _: NewOperationRecord) -> StoreResult<OperationRecord> {
            unreadable()
        }

        fn list(
            &self,
            _: &str,
            _: Option<OperationKind>,
            _: PageRequest,
        ) -> StoreResult<HistoryPage> {
            unreadable()
        }

        fn recent(
            &self,
            _: &str,
            _: Option<OperationKind>,
            _: u32,
        ) -> StoreResult<Vec<OperationRecord>> {
            unreadable()
        }

        fn aggregate_stats(&self, _: &str, _: DateTime<Utc>) -> StoreResult<HistoryStats> {
            unreadable()
        }

        fn delete_one(&self, _: &str, _: &str) -> StoreResult<bool> {
            unreadable()
        }

        fn delete_all(&self, _: &str) -> StoreResult<u64> {
            unreadable()
        }

        fn ledger_totals(&self, _: DateTime<Utc>) -> StoreResult<LedgerTotals> {
            unreadable()
        }

        fn latest_global(&self, _: u32) -> StoreResult<Vec<OperationRecord>> {
            unreadable()
        }
    }

    fn creator_usage(now: DateTime<Utc>) -> SubscriptionUsage {
        SubscriptionUsage {
            tier: "Creator".to_string(),
            character_count: 90_000,
            character_limit: 100_000,
            next_reset_unix: Some((now + Duration::days(10)).timestamp()),
            voice_count: Some(2),
            voice_limit: Some(30),
            status: Some("active".to_string()),
        }
    }

    /// Stores with one account and one recorded synthesis
    fn seeded_stores(tmp: &TempDir) -> (Arc<SqliteAccountStore>, Arc<SqliteHistoryStore>) {
        let db = Database::open(&tmp.path().join("report.db")).unwrap();
        let accounts = Arc::new(SqliteAccountStore::new(db.clone()));
        let history = Arc::new(SqliteHistoryStore::new(db));
        let account = accounts
            .create(NewAccount {
                email: "report@example.com".to_string(),
                display_name: "report".to_string(),
                password_hash: "$argon2id$stub".to_string(),
                credits_limit: 1000,
            })
            .unwrap();
        history
            .append(NewOperationRecord::new(
                &account.id,
                OperationKind::TextSynthesis,
                12,
                "tts_seed.mp3",
                OperationDetail::default(),
            ))
            .unwrap();
        (accounts, history)
    }

    #[tokio::test]
    async fn provider_outage_still_reports_local_usage() {
        let tmp = TempDir::new().unwrap();
        let (accounts, history) = seeded_stores(&tmp);
        let provider = UsageProvider(Err(ProviderError::Upstream {
            status: 503,
            message: "maintenance".to_string(),
        }));
        let aggregator = AnalyticsAggregator::new(Arc::new(provider), accounts, history);

        let report = aggregator.report(Utc::now()).await;
        let json = serde_json::to_value(&report).unwrap();

        assert!(
            json["provider"]["error"]
                .as_str()
                .is_some_and(|e| e.contains("maintenance"))
        );
        let local = report.local_usage.ok().unwrap();
        assert_eq!(local.accounts, 1);
        assert_eq!(local.total_operations, 1);
        assert_eq!(local.total_credits, 12);
        assert_eq!(local.recent.len(), 1);
        assert!(report.alerts.is_empty());
        assert!(json["summary"].is_null());
        assert!(!report.pricing.plans.is_empty());
    }

    #[tokio::test]
    async fn ledger_outage_still_reports_provider_usage() {
        let tmp = TempDir::new().unwrap();
        let (accounts, _) = seeded_stores(&tmp);
        let now = Utc::now();
        let provider = UsageProvider(Ok(creator_usage(now)));
        let aggregator =
            AnalyticsAggregator::new(Arc::new(provider), accounts, Arc::new(UnreadableLedger));

        let report = aggregator.report(now).await;
        let json = serde_json::to_value(&report).unwrap();

        let usage = report.provider.ok().unwrap();
        assert_eq!(usage.tier, "creator");
        assert_eq!(usage.characters_remaining, 10_000);
        assert_eq!(usage.usage_percent, 90.0);
        assert!(usage.plan.is_some());

        assert!(
            json["local_usage"]["error"]
                .as_str()
                .is_some_and(|e| e.contains("ledger offline"))
        );
        assert_eq!(levels(&report.alerts), vec![AlertLevel::Warning]);

        let summary = report.summary.unwrap();
        assert_eq!(summary.tier, "creator");
        assert_eq!(summary.local_operations, None);
        assert!(summary.estimated_monthly_cost_usd.is_some());
    }

    fn levels(alerts: &[Alert]) -> Vec<AlertLevel> {
        alerts.iter().map(|a| a.level).collect()
    }

    #[test]
    fn thresholds_are_inclusive() {
        assert_eq!(levels(&usage_alerts(95.0, None)), vec![AlertLevel::Critical]);
        assert_eq!(levels(&usage_alerts(94.99, None)), vec![AlertLevel::Warning]);
        assert_eq!(levels(&usage_alerts(80.0, None)), vec![AlertLevel::Warning]);
        assert_eq!(levels(&usage_alerts(50.0, None)), vec![AlertLevel::Info]);
        assert!(usage_alerts(49.9, None).is_empty());
    }

    #[test]
    fn reset_notice_window() {
        assert_eq!(
            levels(&usage_alerts(10.0, Some(3))),
            vec![AlertLevel::Info]
        );
        assert_eq!(
            levels(&usage_alerts(96.0, Some(1))),
            vec![AlertLevel::Critical, AlertLevel::Info]
        );
        assert!(usage_alerts(10.0, Some(0)).is_empty());
        assert!(usage_alerts(10.0, Some(4)).is_empty());
        assert!(usage_alerts(10.0, Some(-2)).is_empty());
    }

    #[test]
    fn usage_percent_rounds_and_handles_zero_limit() {
        assert_eq!(usage_percent(0, 0), 0.0);
        assert_eq!(usage_percent(1, 3), 33.33);
        assert_eq!(usage_percent(100_000, 100_000), 100.0);
    }

    #[test]
    fn unavailable_section_serializes_as_error_object() {
        let section: Section<u32> = Section::unavailable("boom");
        assert_eq!(
            serde_json::to_value(&section).unwrap(),
            serde_json::json!({ "error": "boom" })
        );
        let ok: Section<u32> = Section::Ok(7);
        assert_eq!(serde_json::to_value(&ok).unwrap(), serde_json::json!(7));
    }

    #[test]
    fn pricing_lists_plans_cheapest_first() {
        let pricing = pricing_section("elevenlabs");
        assert_eq!(pricing.plans.first().map(|p| p.tier), Some("free"));
        assert_eq!(pricing.plans.last().map(|p| p.tier), Some("business"));
        assert_eq!(pricing.tts_cost_per_credit, Some(0.00022));
    }
}
