use crate::error::ResultsError;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://bca_results.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    /// `EnvFilter` directive; falls back to the CLI verbosity when unset.
    pub log_filter: Option<String>,
}

impl Config {
    /// Reads settings from the process environment (after `.env` is loaded).
    pub fn from_env() -> Result<Self, ResultsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ResultsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let max_connections = match lookup("RESULTS_MAX_CONNECTIONS") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(value) if value > 0 => value,
                _ => {
                    return Err(ResultsError::Config {
                        var: "RESULTS_MAX_CONNECTIONS",
                        reason: format!("expected a positive integer, got {raw:?}"),
                    })
                }
            },
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let log_filter = lookup("RESULTS_LOG").filter(|value| !value.trim().is_empty());

        Ok(Self {
            database_url,
            max_connections,
            log_filter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.log_filter, None);
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite://other.db"),
            ("RESULTS_MAX_CONNECTIONS", "2"),
            ("RESULTS_LOG", "bca_results=debug"),
        ]))
        .unwrap();
        assert_eq!(config.database_url, "sqlite://other.db");
        assert_eq!(config.max_connections, 2);
        assert_eq!(config.log_filter.as_deref(), Some("bca_results=debug"));
    }

    #[test]
    fn rejects_zero_connections() {
        let err = Config::from_lookup(lookup_from(&[("RESULTS_MAX_CONNECTIONS", "0")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ResultsError::Config {
                var: "RESULTS_MAX_CONNECTIONS",
                ..
            }
        ));
    }
}
