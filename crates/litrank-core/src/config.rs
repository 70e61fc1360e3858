//! Process-wide configuration loaded once at startup (§6).
//!
//! Follows the same pattern the teacher's `OpenAlexClient::new()` uses for
//! its own API key — `std::env::var(...).ok()` — generalized into one struct
//! with documented defaults so the crate runs with zero configuration.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub semantic_scholar_api_key: Option<String>,
    pub unpaywall_email: String,
    pub search_cache_ttl: Duration,
    pub paper_cache_ttl: Duration,
    pub default_candidates_per_source: usize,
    pub top_results_count: usize,
    pub requests_per_minute: u32,
    pub cors_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            semantic_scholar_api_key: None,
            unpaywall_email: "user@example.com".to_string(),
            search_cache_ttl: Duration::from_secs(24 * 3600),
            paper_cache_ttl: Duration::from_secs(7 * 24 * 3600),
            default_candidates_per_source: 100,
            top_results_count: 20,
            requests_per_minute: 100,
            cors_origins: vec!["http://localhost:3000".to_string(), "http://127.0.0.1:3000".to_string()],
        }
    }
}

impl Config {
    /// Load from the environment, falling back to the documented default for
    /// any variable that is absent or fails to parse.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            semantic_scholar_api_key: std::env::var("SEMANTIC_SCHOLAR_API_KEY").ok(),
            unpaywall_email: std::env::var("UNPAYWALL_EMAIL").unwrap_or(default.unpaywall_email),
            search_cache_ttl: parse_hours("SEARCH_CACHE_TTL_HOURS").unwrap_or(default.search_cache_ttl),
            paper_cache_ttl: parse_days("PAPER_CACHE_TTL_DAYS").unwrap_or(default.paper_cache_ttl),
            default_candidates_per_source: parse_usize("DEFAULT_CANDIDATES_PER_SOURCE").unwrap_or(default.default_candidates_per_source),
            top_results_count: parse_usize("TOP_RESULTS_COUNT").unwrap_or(default.top_results_count),
            requests_per_minute: parse_u32("REQUESTS_PER_MINUTE").unwrap_or(default.requests_per_minute),
            cors_origins: std::env::var("CORS_ORIGINS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(default.cors_origins),
        }
    }
}

fn parse_hours(var: &str) -> Option<Duration> {
    std::env::var(var).ok()?.parse::<u64>().ok().map(|h| Duration::from_secs(h * 3600))
}

fn parse_days(var: &str) -> Option<Duration> {
    std::env::var(var).ok()?.parse::<u64>().ok().map(|d| Duration::from_secs(d * 24 * 3600))
}

fn parse_usize(var: &str) -> Option<usize> {
    std::env::var(var).ok()?.parse().ok()
}

fn parse_u32(var: &str) -> Option<u32> {
    std::env::var(var).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.search_cache_ttl, Duration::from_secs(24 * 3600));
        assert_eq!(config.paper_cache_ttl, Duration::from_secs(7 * 24 * 3600));
        assert_eq!(config.default_candidates_per_source, 100);
        assert_eq!(config.top_results_count, 20);
        assert_eq!(config.requests_per_minute, 100);
        assert!(config.semantic_scholar_api_key.is_none());
    }

    #[test]
    fn cors_origins_default_has_two_entries() {
        assert_eq!(Config::default().cors_origins.len(), 2);
    }
}
