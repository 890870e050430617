use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Name of the query parameter the site uses for result ordering
pub const SORT_PARAM: &str = "ordem";

/// Result ordering applied to a search target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SortStrategy {
    /// Site default ordering, no sort parameter
    Relevance,
    MostRecent,
    LowestPrice,
    HighestPrice,
}

impl SortStrategy {
    /// Query fragment appended to the search URL
    pub fn suffix(self) -> Option<String> {
        let value = match self {
            SortStrategy::Relevance => return None,
            SortStrategy::MostRecent => "MOST_RECENT",
            SortStrategy::LowestPrice => "LOWEST_PRICE",
            SortStrategy::HighestPrice => "HIGHEST_PRICE",
        };
        Some(format!("{SORT_PARAM}={value}"))
    }

    pub fn slug(self) -> &'static str {
        match self {
            SortStrategy::Relevance => "relevance",
            SortStrategy::MostRecent => "most-recent",
            SortStrategy::LowestPrice => "lowest-price",
            SortStrategy::HighestPrice => "highest-price",
        }
    }
}

/// What to do when a result page shows no listing cards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PaginationPolicy {
    /// Attempt every configured page; a page without cards is a failure
    #[default]
    Exhaustive,
    /// Stop paginating the target at the first page without cards
    StopOnEmpty,
}

/// Link harvesting parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestOptions {
    pub navigation_timeout_ms: u64,
    pub card_timeout_ms: u64,
    pub pagination: PaginationPolicy,
}

impl HarvestOptions {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn card_timeout(&self) -> Duration {
        Duration::from_millis(self.card_timeout_ms)
    }
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: 60_000,
            card_timeout_ms: 30_000,
            pagination: PaginationPolicy::Exhaustive,
        }
    }
}

/// Detail extraction parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    pub navigation_timeout_ms: u64,
    pub ready_timeout_ms: u64,
    /// Retries after the first attempt
    pub retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
    /// Save a screenshot and the page markup for every failed attempt
    pub save_debug: bool,
    /// Read latitude/longitude from the embedded map
    pub coordinates: bool,
    pub max_images: Option<usize>,
    pub humanize: bool,
    pub pause_min_ms: u64,
    pub pause_max_ms: u64,
}

impl ExtractOptions {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    /// Delay before retry number `attempt` (1-based): `base * 2^attempt`, capped
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        let delay = self.backoff_base_ms.saturating_mul(factor).min(self.backoff_cap_ms);
        Duration::from_millis(delay)
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: 60_000,
            ready_timeout_ms: 60_000,
            retries: 2,
            backoff_base_ms: 1_000,
            backoff_cap_ms: 30_000,
            save_debug: true,
            coordinates: true,
            max_images: None,
            humanize: true,
            pause_min_ms: 1_500,
            pause_max_ms: 4_000,
        }
    }
}
