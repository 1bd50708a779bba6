use std::sync::Arc;

use crate::config::Config;
use crate::rate_limit::SubmissionRateLimiter;
use crate::submission::Pipeline;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: Config,
    pub pipeline: Pipeline,
    pub submission_limiter: SubmissionRateLimiter,
}
