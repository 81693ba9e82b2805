use thiserror::Error;

/// All errors that can occur when talking to the Kollus API.
#[derive(Error, Debug)]
pub enum ClientError {
    /// No service account was attached before connecting.
    #[error("Service account is required.")]
    MissingServiceAccount,

    /// The service account key is empty.
    #[error("Service account key is empty.")]
    EmptyServiceAccountKey,

    /// The service account API access token is empty.
    #[error("Access token is empty.")]
    EmptyAccessToken,

    /// A request was issued before [`connect`](crate::ApiClient::connect).
    #[error("client is not connected")]
    NotConnected,

    /// The body could not be decoded, or the envelope is missing the
    /// expected `result`, `count` or `items` members.
    #[error("{message}")]
    InvalidResponse {
        message: String,
        status: Option<u16>,
    },

    /// The remote API set its `error` flag. `message` is the remote message
    /// when one was sent, otherwise the raw body.
    #[error("{message} (status {status})")]
    Remote { message: String, status: u16 },

    /// A transport-level HTTP error from reqwest.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A request path could not be resolved against the API base URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ClientError {
    pub(crate) fn invalid_response(status: Option<u16>) -> Self {
        ClientError::InvalidResponse {
            message: "Response is invalid.".into(),
            status,
        }
    }

    /// The last HTTP status observed, for errors produced from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::InvalidResponse { status, .. } => *status,
            ClientError::Remote { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// `true` for failures caused by missing or empty credentials.
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            ClientError::MissingServiceAccount
                | ClientError::EmptyServiceAccountKey
                | ClientError::EmptyAccessToken
        )
    }
}

/// A convenience alias for `Result<T, ClientError>`.
pub type Result<T> = std::result::Result<T, ClientError>;
