pub mod config;
pub mod db;
pub mod donor_id;
pub mod error;
pub mod geo;
pub mod ip_lookup;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod store;
pub mod submission;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::request::Parts;
use axum::http::{HeaderName, HeaderValue, Method, header};
use regex::Regex;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::{Config, CorsConfig};
use crate::ip_lookup::IpLookup;
use crate::rate_limit::SubmissionRateLimiter;
use crate::state::{AppState, SharedState};
use crate::store::DonorStore;
use crate::submission::{Pipeline, PipelineSettings};

pub fn build_app(
    config: Config,
    store: Arc<dyn DonorStore>,
    ip_lookup: Arc<dyn IpLookup>,
) -> (Router, SharedState) {
    let pipeline = Pipeline::new(PipelineSettings::from(&config), store, ip_lookup);

    let state: SharedState = Arc::new(AppState {
        submission_limiter: SubmissionRateLimiter::new(
            config.rate_limit,
            Duration::from_secs(config.rate_limit_window_secs),
        ),
        pipeline,
        config,
    });

    // Unknown paths get the client app so its router can take over
    let static_dir = Path::new(&state.config.static_dir);
    let spa = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    let app = Router::new()
        .merge(routes::api_routes())
        .route("/health", axum::routing::get(health))
        .fallback_service(spa)
        .layer(
            // Cors needs a Default response body, so it sits inside the limit layer
            ServiceBuilder::new()
                .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors)),
        )
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .with_state(state.clone());

    (app, state)
}

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let exact: Vec<HeaderValue> = cors
        .origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    let patterns: Vec<Regex> = cors
        .origin_patterns
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _: &Parts| {
                exact.contains(origin)
                    || origin
                        .to_str()
                        .is_ok_and(|o| patterns.iter().any(|re| re.is_match(o)))
            },
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn health() -> &'static str {
    "ok"
}
