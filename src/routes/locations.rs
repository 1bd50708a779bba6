use std::net::SocketAddr;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::AppError;
use crate::state::SharedState;
use crate::submission::{ValidationOutcome, client_ip, parser};

pub async fn save_location(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let ip = client_ip::resolve(&headers, addr.ip(), &state.config.trusted_proxies);

    if let Err(retry_after) = state.submission_limiter.check(ip) {
        tracing::info!(%ip, retry_after, "Submission rate limited");
        return Err(AppError::RateLimited(format!(
            "Rate limited. Retry after {retry_after}s"
        )));
    }

    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok());
    let request = parser::parse_submission(content_type, &body).map_err(AppError::BadRequest)?;

    match state.pipeline.run(&request, ip).await? {
        ValidationOutcome::Accepted(accepted) => Ok((
            StatusCode::OK,
            Json(json!({
                "message": "Saved",
                "accuracy": accepted.accuracy,
                "timestamp": accepted.timestamp,
                "donorId": accepted.donor_id,
                "qrData": accepted.qr_data,
            })),
        )
            .into_response()),
        ValidationOutcome::Rejected(rejection) => Err(AppError::Rejected(rejection)),
    }
}
