use thiserror::Error;
use volley_core::ReportError;

#[derive(Debug, Error)]
pub enum VolleyError {
    #[error("Unable to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Report(#[from] ReportError),
}
