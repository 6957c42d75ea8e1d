//! Engine configuration types.
//!
//! `EngineConfig` represents the `config.toml` in the data directory. Every
//! field has a default, so an empty or partial file is valid.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::DEFAULT_SKILL_CAP;

/// Top-level configuration for the allocation engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub allocation: AllocationConfig,
    #[serde(default)]
    pub bonus: BonusConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
}

/// Timing of the debounced, retried remote flush.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Coalescing window between a local edit and the flush it schedules.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Delay of the first retry after a failed flush.
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
    /// Upper bound on any retry delay.
    #[serde(default = "default_retry_max_ms")]
    pub retry_max_ms: u64,
    /// The retry count stops doubling the delay past this exponent.
    #[serde(default = "default_retry_max_exponent")]
    pub retry_max_exponent: u32,
    /// Minimum spacing between two user-facing failure notices.
    #[serde(default = "default_notice_throttle_ms")]
    pub notice_throttle_ms: u64,
}

fn default_debounce_ms() -> u64 {
    150
}

fn default_retry_base_ms() -> u64 {
    600
}

fn default_retry_max_ms() -> u64 {
    10_000
}

fn default_retry_max_exponent() -> u32 {
    4
}

fn default_notice_throttle_ms() -> u64 {
    2_000
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            retry_base_ms: default_retry_base_ms(),
            retry_max_ms: default_retry_max_ms(),
            retry_max_exponent: default_retry_max_exponent(),
            notice_throttle_ms: default_notice_throttle_ms(),
        }
    }
}

/// Budget and cap defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationConfig {
    /// Cap used when no other source defines one.
    #[serde(default = "default_cap")]
    pub default_cap: u32,
    /// Upper bound for an admin-set category budget.
    #[serde(default = "default_max_budget")]
    pub max_budget: u32,
    /// Budget seeded per category for a character without persisted state.
    #[serde(default = "default_points_table")]
    pub default_points: BTreeMap<String, u32>,
    /// Budget seeded for categories missing from `default_points`.
    #[serde(default = "default_fallback_points")]
    pub fallback_points: u32,
}

fn default_cap() -> u32 {
    DEFAULT_SKILL_CAP
}

fn default_max_budget() -> u32 {
    99
}

fn default_fallback_points() -> u32 {
    20
}

fn default_points_table() -> BTreeMap<String, u32> {
    [
        ("combat", 25),
        ("survie", 20),
        ("social", 20),
        ("savoir", 20),
        ("artisanat", 15),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            default_cap: default_cap(),
            max_budget: default_max_budget(),
            default_points: default_points_table(),
            fallback_points: default_fallback_points(),
        }
    }
}

impl AllocationConfig {
    /// Seed budget for a category.
    pub fn default_points_for(&self, category_id: &str) -> u32 {
        self.default_points
            .get(category_id)
            .copied()
            .unwrap_or(self.fallback_points)
    }

    /// Global fallback cap, never zero.
    pub fn effective_default_cap(&self) -> u32 {
        self.default_cap.max(1)
    }
}

/// Bonus resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusConfig {
    /// Stat name → skill names it feeds. Keys are compared normalized, so
    /// "Agilité" and "agilite" are the same alias.
    #[serde(default = "default_aliases")]
    pub aliases: BTreeMap<String, Vec<String>>,
}

fn default_aliases() -> BTreeMap<String, Vec<String>> {
    [
        ("agilite", vec!["Esquive", "Parade"]),
        ("for", vec!["Force"]),
        ("perception", vec!["Pistage", "Perspicacité"]),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.into_iter().map(str::to_string).collect()))
    .collect()
}

impl Default for BonusConfig {
    fn default() -> Self {
        Self {
            aliases: default_aliases(),
        }
    }
}

/// Remote character store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of an HTTP character API. When unset, the local SQLite
    /// character store is used.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}
