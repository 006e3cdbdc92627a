use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::processing::{
    ChunkerConfig, ChunkingError, DEFAULT_FUZZY_THRESHOLD, DEFAULT_SEARCH_TIMEOUT, DEFAULT_TOP_N,
    chunking::{
        DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_LOOKAHEAD, DEFAULT_LOOKBACK,
        DEFAULT_TAIL_SLACK,
    },
};

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// Chunk size and overlap were individually valid but do not fit together.
    #[error("Invalid chunker settings: {0}")]
    Chunking(#[from] ChunkingError),
}

/// Runtime configuration for the grounding pipeline.
///
/// Built once at startup and passed by reference; nothing reads the environment afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Chunker parameters used during ingestion.
    pub chunker: ChunkerConfig,
    /// Number of chunks returned by retrieval.
    pub top_n: usize,
    /// Minimum fuzzy score for a quote to count as present.
    pub fuzzy_threshold: f64,
    /// Upper bound on a single coordinate search.
    pub search_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunker: ChunkerConfig::default(),
            top_n: DEFAULT_TOP_N,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
        }
    }
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(load_env_optional)?;
        tracing::debug!(
            chunk_size = config.chunker.chunk_size(),
            overlap = config.chunker.overlap(),
            top_n = config.top_n,
            fuzzy_threshold = config.fuzzy_threshold,
            search_timeout_ms = config.search_timeout.as_millis() as u64,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Build configuration from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let chunk_size = parse_or(&lookup, "CITECHECK_CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?;
        let overlap = parse_or(&lookup, "CITECHECK_CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?;
        let lookback = parse_or(&lookup, "CITECHECK_CHUNK_LOOKBACK", DEFAULT_LOOKBACK)?;
        let lookahead = parse_or(&lookup, "CITECHECK_CHUNK_LOOKAHEAD", DEFAULT_LOOKAHEAD)?;
        let tail_slack = parse_or(&lookup, "CITECHECK_CHUNK_TAIL_SLACK", DEFAULT_TAIL_SLACK)?;
        let chunker = ChunkerConfig::new(chunk_size, overlap)?
            .with_boundary_window(lookback, lookahead)
            .with_tail_slack(tail_slack);

        let top_n = parse_or(&lookup, "CITECHECK_TOP_N", DEFAULT_TOP_N)?;
        let fuzzy_threshold: f64 = parse_or(
            &lookup,
            "CITECHECK_FUZZY_THRESHOLD",
            DEFAULT_FUZZY_THRESHOLD,
        )?;
        if !(0.0..=100.0).contains(&fuzzy_threshold) {
            return Err(ConfigError::InvalidValue(
                "CITECHECK_FUZZY_THRESHOLD".to_string(),
            ));
        }
        let timeout_ms: u64 = parse_or(
            &lookup,
            "CITECHECK_SEARCH_TIMEOUT_MS",
            DEFAULT_SEARCH_TIMEOUT.as_millis() as u64,
        )?;

        Ok(Self {
            chunker,
            top_n,
            fuzzy_threshold,
            search_timeout: Duration::from_millis(timeout_ms),
        })
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
        .map(|value| value.unwrap_or(default))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.top_n, 5);
        assert_eq!(config.fuzzy_threshold, 85.0);
        assert_eq!(config.search_timeout, Duration::from_secs(10));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup_from(&[
            ("CITECHECK_CHUNK_SIZE", "500"),
            ("CITECHECK_CHUNK_OVERLAP", " 50 "),
            ("CITECHECK_TOP_N", "8"),
            ("CITECHECK_FUZZY_THRESHOLD", "90.5"),
            ("CITECHECK_SEARCH_TIMEOUT_MS", "250"),
            ("CITECHECK_CHUNK_TAIL_SLACK", ""),
        ]))
        .unwrap();
        assert_eq!(config.chunker.chunk_size(), 500);
        assert_eq!(config.chunker.overlap(), 50);
        assert_eq!(config.top_n, 8);
        assert_eq!(config.fuzzy_threshold, 90.5);
        assert_eq!(config.search_timeout, Duration::from_millis(250));
    }

    #[test]
    fn unparseable_value_names_the_variable() {
        let err = Config::from_lookup(lookup_from(&[("CITECHECK_TOP_N", "five")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key) if key == "CITECHECK_TOP_N"));

        let err =
            Config::from_lookup(lookup_from(&[("CITECHECK_FUZZY_THRESHOLD", "120")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn incompatible_chunk_settings_are_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("CITECHECK_CHUNK_SIZE", "100"),
            ("CITECHECK_CHUNK_OVERLAP", "60"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Chunking(_)));
    }
}
