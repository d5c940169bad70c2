mod middleware;
mod relay;

use std::sync::Arc;

use axum::{Router, middleware as axum_middleware, routing::get};
use url::Url;

use crate::{application::relay::RelayService, config::CorsSettings};

#[derive(Clone)]
pub struct RelayState {
    pub relay: Arc<RelayService>,
    pub app_name: String,
    pub app_version: String,
    pub cache_max_age: u64,
    pub public_base_url: Url,
}

pub fn build_router(state: RelayState, cors: &CorsSettings) -> Router {
    Router::new()
        .route("/health", get(relay::health))
        .route("/md/raw", get(relay::md_raw))
        .route("/md/html", get(relay::md_html))
        .route("/md/fragment", get(relay::md_fragment))
        .route("/md/embed.js", get(relay::md_embed_js))
        .route("/md/snippet", get(relay::md_snippet))
        .route("/raw-url", get(relay::raw_url))
        .with_state(state)
        .layer(axum_middleware::from_fn_with_state(
            cors.clone(),
            middleware::apply_cors,
        ))
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}
