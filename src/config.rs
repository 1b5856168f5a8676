//! Server configuration.
//!
//! Read from environment variables, mirroring the deployment contract:
//!
//! - `HOST`, `PORT`: bind address (default 0.0.0.0:8080)
//! - `ODB_DATABASE_URL`: connection string for a SQL backend (optional;
//!   the in-memory backend is used when absent)
//! - `ODB_ITC_BASE_URL`: base URL of the ITC service
//! - `ODB_GAIA_URL`: base URL of the catalog service (optional)
//! - `ODB_COMMIT_HASH`: system commit hash mixed into digest cache keys
//! - `ODB_TWILIGHT`: `nautical` (default) or `astronomical`
//! - `RUST_LOG`: log filter

use std::env;

use crate::services::twilight::TwilightBound;

/// Parsed server configuration.
#[derive(Debug, Clone)]
pub struct OdbConfig {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub itc_base_url: String,
    pub gaia_url: Option<String>,
    pub commit_hash: String,
    pub twilight: TwilightBound,
}

impl OdbConfig {
    /// Read configuration from the environment, failing on malformed
    /// values. The caller exits with status 1 on error.
    pub fn from_env() -> Result<OdbConfig, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| format!("PORT must be a number, got '{}'", raw))?,
            Err(_) => 8080,
        };

        let twilight = match env::var("ODB_TWILIGHT") {
            Ok(raw) => raw.parse::<TwilightBound>()?,
            Err(_) => TwilightBound::Nautical,
        };

        Ok(OdbConfig {
            host,
            port,
            database_url: env::var("ODB_DATABASE_URL").ok(),
            itc_base_url: env::var("ODB_ITC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:9080".to_string()),
            gaia_url: env::var("ODB_GAIA_URL").ok(),
            commit_hash: env::var("ODB_COMMIT_HASH").unwrap_or_else(|_| "unversioned".to_string()),
            twilight,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twilight_parsing() {
        assert_eq!(
            "nautical".parse::<TwilightBound>().unwrap(),
            TwilightBound::Nautical
        );
        assert_eq!(
            "ASTRONOMICAL".parse::<TwilightBound>().unwrap(),
            TwilightBound::Astronomical
        );
        assert!("civil".parse::<TwilightBound>().is_err());
    }
}
