use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Operator UI
        .route("/", get(crate::routes::dashboard::index))
        // Downloaded-file registry
        .route("/api/downloads", get(crate::routes::downloads::list_downloads))
        .route(
            "/api/downloads/{id}/remove",
            post(crate::routes::downloads::remove_download),
        )
        .route("/download/{id}", get(crate::routes::downloads::download_file))
        // Automation runs
        .route("/open", post(crate::routes::generation::open))
        .route(
            "/api/cancel-generation",
            post(crate::routes::generation::cancel_generation),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
