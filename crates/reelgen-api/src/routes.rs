//! API routes.

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::assets::{claim_asset, publish_asset, unpublish_asset};
use crate::handlers::generate::{
    async_image_to_video, image_to_image, image_to_video, text_to_image,
};
use crate::handlers::generations::{
    get_generation, list_community_generations, list_generations, list_user_generations,
};
use crate::handlers::upload::upload_image;
use crate::handlers::{health, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let generate_routes = Router::new()
        .route("/generate/text-to-image", post(text_to_image))
        .route("/generate/image-to-image", post(image_to_image))
        .route("/generate/image-to-video", post(image_to_video))
        .route("/async/image-to-video", post(async_image_to_video));

    let record_routes = Router::new()
        .route("/generation/:id", get(get_generation))
        .route("/generations", get(list_generations))
        .route("/user/:user_id/generations", get(list_user_generations))
        .route("/community/generations", get(list_community_generations));

    let asset_routes = Router::new()
        .route("/claim/:asset_id", get(claim_asset))
        .route("/publish/:asset_id", get(publish_asset))
        .route("/publish/:asset_id", delete(unpublish_asset));

    let upload_routes = Router::new().route("/upload/image", post(upload_image));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    let api_routes = Router::new()
        .merge(generate_routes)
        .merge(record_routes)
        .merge(asset_routes)
        .merge(upload_routes);

    Router::new()
        .nest("/v1", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
