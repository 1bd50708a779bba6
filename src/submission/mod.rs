pub mod client_ip;
pub mod parser;
pub mod pipeline;
mod request;

pub use pipeline::{
    AcceptedSubmission, Pipeline, PipelineError, PipelineSettings, QrPayload, Rejection,
    ValidationOutcome,
};
pub use request::SubmissionRequest;
