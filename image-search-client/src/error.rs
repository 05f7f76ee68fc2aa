use thiserror::Error as ThisError;

/// Everything that can go wrong while resolving images from one source.
///
/// None of these reach the caller of [`crate::ImageClient::fetch`]; they are
/// logged and reduced to an advisory message for the key.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("{url} answered with status {status}")]
    Status { status: u16, url: String },
    #[error("Provider rejected the request: {0}")]
    Api(String),
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: i64 },
    #[error("In-flight request for {0} was abandoned")]
    Coalesce(String),
}

impl From<surf::Error> for Error {
    fn from(err: surf::Error) -> Self {
        Error::Http(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
