//! Provider plan pricing reference.
//!
//! Single source of truth for the subscription tiers the upstream voice provider
//! sells. The admin analytics report uses these figures to estimate spend and to
//! translate raw character counts into money.
//!
//! # Usage
//!
//! ```rust,ignore
//! use voxmeter_gateway::config::pricing::{get_plan_pricing, tts_cost_per_credit};
//!
//! let creator = get_plan_pricing("elevenlabs", "creator").unwrap();
//! let per_char = tts_cost_per_credit("elevenlabs");
//! ```
//!
//! # Updates
//!
//! When provider pricing changes, update the constants in this file.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Serialize;

// =============================================================================
// Pricing Types
// =============================================================================

/// One subscription tier.
#[derive(Debug, Clone, Serialize)]
pub struct PlanPricing {
    /// Monthly price in USD
    pub monthly_usd: f64,
    /// Characters included per billing cycle
    pub characters: u64,
    /// Voice tool minutes included per billing cycle
    pub voice_minutes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<&'static str>,
}

impl PlanPricing {
    /// Create new plan entry.
    pub const fn new(monthly_usd: f64, characters: u64, voice_minutes: u64) -> Self {
        Self {
            monthly_usd,
            characters,
            voice_minutes,
            notes: None,
        }
    }

    /// Create plan entry with notes.
    pub const fn with_notes(
        monthly_usd: f64,
        characters: u64,
        voice_minutes: u64,
        notes: &'static str,
    ) -> Self {
        Self {
            monthly_usd,
            characters,
            voice_minutes,
            notes: Some(notes),
        }
    }

    /// Effective USD price of one included character.
    pub fn cost_per_character(&self) -> f64 {
        if self.characters == 0 {
            return 0.0;
        }
        self.monthly_usd / self.characters as f64
    }
}

/// Per-minute overage rate for voice tools on a tier.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct VoiceToolsOverage {
    pub per_minute_usd: f64,
}

// =============================================================================
// Plan Tables
// =============================================================================

/// Plan database.
/// Key format: "provider:tier" (lowercase)
static PLAN_PRICING: LazyLock<HashMap<&'static str, PlanPricing>> = LazyLock::new(|| {
    let mut m = HashMap::new();

    // -------------------------------------------------------------------------
    // ElevenLabs
    // https://elevenlabs.io/pricing
    // -------------------------------------------------------------------------
    m.insert("elevenlabs:free", PlanPricing::with_notes(0.0, 10_000, 0, "No commercial license"));
    m.insert("elevenlabs:starter", PlanPricing::new(5.0, 30_000, 30));
    m.insert("elevenlabs:creator", PlanPricing::new(22.0, 100_000, 100));
    m.insert("elevenlabs:pro", PlanPricing::new(99.0, 500_000, 500));
    m.insert("elevenlabs:scale", PlanPricing::new(330.0, 2_000_000, 2_000));
    m.insert(
        "elevenlabs:business",
        PlanPricing::with_notes(1_320.0, 11_000_000, 11_000, "Annual commitment"),
    );

    m
});

/// Voice tools overage, keyed like the plan table.
static VOICE_OVERAGE: LazyLock<HashMap<&'static str, VoiceToolsOverage>> = LazyLock::new(|| {
    let mut m = HashMap::new();
    m.insert("elevenlabs:creator", VoiceToolsOverage { per_minute_usd: 0.30 });
    m.insert("elevenlabs:scale", VoiceToolsOverage { per_minute_usd: 0.12 });
    m
});

/// Pay-as-you-go TTS price per credit (one credit per character).
static TTS_COST_PER_CREDIT: LazyLock<HashMap<&'static str, f64>> = LazyLock::new(|| {
    let mut m = HashMap::new();
    m.insert("elevenlabs", 0.00022);
    m
});

// =============================================================================
// Lookups
// =============================================================================

/// Get plan pricing for a provider tier.
///
/// # Arguments
/// * `provider` - Provider name (e.g., "elevenlabs")
/// * `tier` - Tier name as reported by the provider (e.g., "creator")
pub fn get_plan_pricing(provider: &str, tier: &str) -> Option<&'static PlanPricing> {
    let key = format!("{}:{}", provider.to_lowercase(), tier.to_lowercase());
    PLAN_PRICING.get(key.as_str())
}

/// Get the voice tools overage rate for a provider tier, if the tier has one.
pub fn get_voice_overage(provider: &str, tier: &str) -> Option<VoiceToolsOverage> {
    let key = format!("{}:{}", provider.to_lowercase(), tier.to_lowercase());
    VOICE_OVERAGE.get(key.as_str()).copied()
}

/// Pay-as-you-go price per synthesis credit.
pub fn tts_cost_per_credit(provider: &str) -> Option<f64> {
    TTS_COST_PER_CREDIT.get(provider.to_lowercase().as_str()).copied()
}

/// Estimate the monthly spend for a tier given the characters used so far.
///
/// The plan price covers the included characters; anything above is billed
/// at the pay-as-you-go credit rate.
pub fn estimate_monthly_cost(provider: &str, tier: &str, characters_used: u64) -> Option<f64> {
    let plan = get_plan_pricing(provider, tier)?;
    let overage_chars = characters_used.saturating_sub(plan.characters);
    let overage = tts_cost_per_credit(provider).unwrap_or(0.0) * overage_chars as f64;
    Some(plan.monthly_usd + overage)
}

/// List all plans for a provider, cheapest first.
pub fn list_plans(provider: &str) -> Vec<(&'static str, &'static PlanPricing)> {
    let prefix = format!("{}:", provider.to_lowercase());
    let mut plans: Vec<_> = PLAN_PRICING
        .iter()
        .filter(|(k, _)| k.starts_with(&prefix))
        .map(|(k, v)| (k.strip_prefix(&prefix).unwrap_or(k), v))
        .collect();
    plans.sort_by(|a, b| a.1.monthly_usd.total_cmp(&b.1.monthly_usd));
    plans
}
