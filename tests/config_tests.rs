//! Server configuration from the environment.

mod support;

use odb_rust::config::OdbConfig;
use odb_rust::services::twilight::TwilightBound;
use support::with_scoped_env;

#[test]
fn test_defaults() {
    with_scoped_env(
        &[
            ("HOST", None),
            ("PORT", None),
            ("ODB_DATABASE_URL", None),
            ("ODB_ITC_BASE_URL", None),
            ("ODB_COMMIT_HASH", None),
            ("ODB_TWILIGHT", None),
        ],
        || {
            let config = OdbConfig::from_env().unwrap();
            assert_eq!(config.bind_address(), "0.0.0.0:8080");
            assert_eq!(config.commit_hash, "unversioned");
            assert_eq!(config.twilight, TwilightBound::Nautical);
            assert!(config.database_url.is_none());
        },
    );
}

#[test]
fn test_explicit_values() {
    with_scoped_env(
        &[
            ("HOST", Some("127.0.0.1")),
            ("PORT", Some("9090")),
            ("ODB_DATABASE_URL", Some("postgres://odb")),
            ("ODB_COMMIT_HASH", Some("abc123")),
            ("ODB_TWILIGHT", Some("astronomical")),
        ],
        || {
            let config = OdbConfig::from_env().unwrap();
            assert_eq!(config.bind_address(), "127.0.0.1:9090");
            assert_eq!(config.database_url.as_deref(), Some("postgres://odb"));
            assert_eq!(config.commit_hash, "abc123");
            assert_eq!(config.twilight, TwilightBound::Astronomical);
        },
    );
}

#[test]
fn test_malformed_port_is_a_config_error() {
    with_scoped_env(&[("PORT", Some("not-a-port"))], || {
        assert!(OdbConfig::from_env().is_err());
    });
}

#[test]
fn test_malformed_twilight_is_a_config_error() {
    with_scoped_env(&[("PORT", None), ("ODB_TWILIGHT", Some("civil"))], || {
        assert!(OdbConfig::from_env().is_err());
    });
}
