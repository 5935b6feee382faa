use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures shared by the server cache, the remote client and the reader.
///
/// The type is `Clone` because one coalesced fetch hands the same outcome to
/// every caller that was waiting on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("upstream fetch failed: {0}")]
    UpstreamFetch(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("chapter index {0} is outside 0..=113")]
    OutOfRange(i64),
}

impl Error {
    pub fn upstream(message: impl Into<String>) -> Self {
        Error::UpstreamFetch(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedResponse(message.into())
    }
}
