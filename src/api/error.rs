/// Failure taxonomy for calls to the detection and dashboard services.
///
/// Every variant's `Display` is the text shown to the user. Callers decide
/// whether a failure is fatal; the poller logs and skips, the upload and
/// delete flows surface the message.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Rejected client-side before any request was sent.
    #[error("{0}")]
    Validation(String),

    /// Connection refused, DNS failure, timeout, broken body stream.
    #[error("Failed to connect to {url}: {message}")]
    Transport { url: String, message: String },

    /// Non-2xx reply. `message` is the server's `error` field when it sent
    /// one, otherwise a generic description of the status.
    #[error("{message}")]
    Status { code: u16, message: String },

    /// 404 on a by-id detection endpoint.
    #[error("Detection not found")]
    NotFound,

    /// A 2xx body that carried an `error` field.
    #[error("{0}")]
    Application(String),

    /// Body could not be read as the expected shape.
    #[error("Unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl ApiError {
    /// HTTP status for [`ApiError::Status`] and [`ApiError::NotFound`].
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { code, .. } => Some(*code),
            ApiError::NotFound => Some(404),
            _ => None,
        }
    }

    /// Whether the request never produced a reply.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport { .. })
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_user_facing() {
        assert_eq!(ApiError::NotFound.to_string(), "Detection not found");
        assert_eq!(
            ApiError::Validation("Please enter an image URL.".into()).to_string(),
            "Please enter an image URL."
        );
        let status = ApiError::Status {
            code: 500,
            message: "Model crashed".into(),
        };
        assert_eq!(status.to_string(), "Model crashed");
        assert_eq!(status.status_code(), Some(500));
    }

    #[test]
    fn transport_names_the_url() {
        let err = ApiError::Transport {
            url: "http://127.0.0.1:1/metrics".into(),
            message: "connection refused".into(),
        };
        assert!(err.is_transport());
        assert!(err.to_string().contains("http://127.0.0.1:1/metrics"));
        assert_eq!(err.status_code(), None);
    }
}
