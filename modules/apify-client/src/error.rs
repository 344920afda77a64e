use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApifyError>;

#[derive(Debug, Error)]
pub enum ApifyError {
    #[error("Request error: {0}")]
    Request(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// A response body that did not match the expected run or dataset shape.
    #[error("Unexpected response body: {0}")]
    Decode(String),

    #[error("Run {run_id} ended with status: {status}")]
    RunFailed { run_id: String, status: String },
}

impl From<reqwest::Error> for ApifyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApifyError::Decode(err.to_string())
        } else {
            ApifyError::Request(err.to_string())
        }
    }
}
