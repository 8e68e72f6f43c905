//! Axum router construction.
//!
//! Builds the application router with the conversion, subtitle, and
//! diagnostic routes, the middleware layers, and static serving of the public
//! directory at the site root.

use std::path::Path;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

fn static_files(dir: &Path) -> ServeDir {
    ServeDir::new(dir).append_index_html_on_directories(true)
}

/// Build the complete Axum router.
///
/// Anything that does not match a route is looked up in
/// `config.storage.public_dir`, which is where job manifests and segments
/// land.
pub fn build_router(ctx: AppContext) -> Router {
    let public_dir = ctx.config.storage.public_dir.clone();
    tracing::debug!("Serving static files from {}", public_dir.display());

    Router::new()
        .route("/video", get(routes::video::convert_video))
        .route("/subtitle", get(routes::subtitles::get_subtitle))
        .route("/health", get(routes::health::health))
        .route("/admin/tools", get(routes::admin::tools))
        .fallback_service(static_files(&public_dir))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Router that only serves `dir`, used by `vidrelay serve`.
pub fn build_static_router(dir: &Path) -> Router {
    Router::new()
        .fallback_service(static_files(dir))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}
