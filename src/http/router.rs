//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression,
//! tracing), and creates the axum router ready for serving.

use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration - permissive for development, should be restricted in production
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Observation CRUD
        .route("/observations", get(handlers::list_observations))
        .route("/observations", post(handlers::create_observation))
        .route("/observations/{id}", get(handlers::get_observation))
        .route("/observations/{id}", patch(handlers::update_observation))
        .route("/observations/{id}/clone", post(handlers::clone_observation))
        // Execution
        .route("/observations/{id}/execution/digest", get(handlers::get_digest))
        .route(
            "/observations/{id}/execution/config",
            get(handlers::get_execution_config),
        )
        .route("/observations/{id}/execution/visits", get(handlers::get_visits))
        // Workflow
        .route("/observations/{id}/workflow", get(handlers::get_workflow))
        .route("/observations/{id}/workflow", post(handlers::post_transition))
        // Recording
        .route("/visits", post(handlers::record_visit))
        .route("/visits/{id}/atoms", post(handlers::record_atom))
        .route("/atoms/{id}/steps", post(handlers::record_step))
        .route("/steps/{id}/datasets", post(handlers::record_dataset))
        .route("/datasets/{id}", patch(handlers::set_dataset_qa))
        // Event ingestion
        .route("/events/slew", post(handlers::post_slew_event))
        .route("/events/sequence", post(handlers::post_sequence_event))
        .route("/events/atom", post(handlers::post_atom_event))
        .route("/events/step", post(handlers::post_step_event))
        .route("/events/dataset", post(handlers::post_dataset_event))
        // Time accounting
        .route("/visits/{id}/corrections", post(handlers::post_correction));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounting::AccountingConfig;
    use crate::db::repositories::LocalRepository;
    use crate::itc::FixedItcClient;
    use crate::sequence::TableSmartGcalOracle;
    use crate::services::DigestService;
    use std::sync::Arc;

    #[test]
    fn test_router_creation() {
        let repo = Arc::new(LocalRepository::new()) as Arc<dyn crate::db::FullRepository>;
        let digests = Arc::new(DigestService::new(
            "test",
            Arc::new(TableSmartGcalOracle::gmos_north_defaults()),
            Arc::new(FixedItcClient::default_spectroscopy()),
        ));
        let state = AppState::new(repo, digests, AccountingConfig::default());
        let _router = create_router(state);
        // If we got here, router was created successfully
    }
}
