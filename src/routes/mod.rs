pub mod locations;

use axum::Router;
use axum::routing::post;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new().route("/api/save-location", post(locations::save_location))
}
