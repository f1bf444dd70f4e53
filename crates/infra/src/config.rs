//! Configuration loading and representation.
//!
//! Everything comes from the environment, with logged fallbacks for local
//! development.

use crate::service::ServiceConfig;

/// Process configuration for the ledger service.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Postgres connection string; absent means in-memory only (dev/tests).
    pub database_url: Option<String>,
    /// Conflict retry budget per operation.
    pub max_retries: u32,
}

impl LedgerConfig {
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL").ok();
        if database_url.is_none() {
            tracing::warn!("DATABASE_URL not set; Postgres store unavailable");
        }

        let max_retries = parse_max_retries(std::env::var("STOCKROOM_MAX_RETRIES").ok());

        Self {
            database_url,
            max_retries,
        }
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            max_retries: self.max_retries,
        }
    }
}

fn parse_max_retries(raw: Option<String>) -> u32 {
    let default = ServiceConfig::default().max_retries;
    match raw {
        None => default,
        Some(value) => match value.parse::<u32>() {
            Ok(parsed) if parsed > 0 => parsed,
            _ => {
                tracing::warn!(
                    %value,
                    default,
                    "STOCKROOM_MAX_RETRIES is not a positive integer; using default"
                );
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_retries_falls_back_on_garbage() {
        let default = ServiceConfig::default().max_retries;
        assert_eq!(parse_max_retries(None), default);
        assert_eq!(parse_max_retries(Some("banana".to_string())), default);
        assert_eq!(parse_max_retries(Some("0".to_string())), default);
        assert_eq!(parse_max_retries(Some("8".to_string())), 8);
    }
}
