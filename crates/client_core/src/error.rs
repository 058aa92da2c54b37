use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

pub type ClientResult<T> = std::result::Result<T, ClientError>;

pub(crate) const DEFAULT_ERROR_MESSAGE: &str = "Request failed";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{message}")]
    Unauthenticated { message: String },
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response ({reason}): {raw}")]
    MalformedResponse { raw: String, reason: String },
    #[error("token storage error: {0}")]
    Token(String),
}

impl ClientError {
    /// Maps a non-2xx status and its extracted message. 401 is the only status that
    /// asks the caller to re-authenticate.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match ErrorCode::from_status(status) {
            ErrorCode::Unauthorized => Self::Unauthenticated { message },
            _ => Self::Api(ApiError::new(status, message)),
        }
    }

    pub fn requires_reauth(&self) -> bool {
        matches!(self, Self::Unauthenticated { .. })
    }

    /// Message suitable for display; never empty.
    pub fn user_message(&self) -> String {
        let message = match self {
            Self::Unauthenticated { message } => message.clone(),
            Self::Api(err) => err.message.clone(),
            other => other.to_string(),
        };
        if message.trim().is_empty() {
            DEFAULT_ERROR_MESSAGE.to_string()
        } else {
            message
        }
    }
}
