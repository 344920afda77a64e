use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserlessError>;

#[derive(Debug, Error)]
pub enum BrowserlessError {
    #[error("Request error: {0}")]
    Request(String),

    /// The page did not render within the client timeout.
    #[error("Render timed out: {0}")]
    Timeout(String),

    #[error("Browserless rejected request (status {status}): {message}")]
    Rejected { status: u16, message: String },
}

impl From<reqwest::Error> for BrowserlessError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BrowserlessError::Timeout(err.to_string())
        } else {
            BrowserlessError::Request(err.to_string())
        }
    }
}
