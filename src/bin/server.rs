//! ODB HTTP Server Binary
//!
//! Entry point for the observatory database server. It parses the `serve`
//! subcommand, reads configuration from the environment, initializes the
//! repository and services, and starts serving requests.
//!
//! # Usage
//!
//! ```bash
//! odb-server serve
//! ```
//!
//! # Exit codes
//!
//! - 0: normal shutdown
//! - 1: configuration error
//! - 2: repository unreachable at boot
//!
//! # Environment Variables
//!
//! - `HOST`: Server host (default: 0.0.0.0)
//! - `PORT`: Server port (default: 8080)
//! - `ODB_DATABASE_URL`: SQL connection string (optional)
//! - `ODB_ITC_BASE_URL`: ITC service base URL
//! - `ODB_COMMIT_HASH`: commit hash mixed into digest keys
//! - `ODB_TWILIGHT`: `nautical` or `astronomical`
//! - `RUST_LOG`: Log level (default: info)

use std::env;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use odb_rust::accounting::AccountingConfig;
use odb_rust::config::OdbConfig;
use odb_rust::db;
use odb_rust::http::{create_router, AppState};
use odb_rust::itc::HttpItcClient;
use odb_rust::sequence::TableSmartGcalOracle;
use odb_rust::services::DigestService;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .init();

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("serve") => {}
        other => {
            error!(
                "expected subcommand 'serve', got {:?}; usage: odb-server serve",
                other
            );
            return ExitCode::from(1);
        }
    }

    let config = match OdbConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("configuration error: {}", e);
            return ExitCode::from(1);
        }
    };

    info!("Starting ODB HTTP Server");

    // Initialize global repository once and reuse it across the app
    if db::init_repository().is_err() {
        error!("repository initialization failed");
        return ExitCode::from(2);
    }
    let repository = match db::get_repository() {
        Ok(repo) => Arc::clone(repo),
        Err(e) => {
            error!("repository unavailable: {}", e);
            return ExitCode::from(2);
        }
    };
    match repository.health_check().await {
        Ok(true) => info!("Repository initialized successfully"),
        _ => {
            error!("repository unreachable at boot");
            return ExitCode::from(2);
        }
    }

    let digests = Arc::new(DigestService::new(
        config.commit_hash.clone(),
        Arc::new(TableSmartGcalOracle::gmos_north_defaults()),
        Arc::new(HttpItcClient::new(config.itc_base_url.clone())),
    ));
    let accounting = AccountingConfig {
        twilight: config.twilight,
    };
    let state = AppState::new(repository, digests, accounting);

    let app = create_router(state);

    let addr: SocketAddr = match config.bind_address().parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("invalid bind address '{}': {}", config.bind_address(), e);
            return ExitCode::from(1);
        }
    };

    info!("Server listening on http://{}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("failed to bind {}: {}", addr, e);
            return ExitCode::from(2);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        error!("server error: {}", e);
        return ExitCode::from(2);
    }

    ExitCode::SUCCESS
}
