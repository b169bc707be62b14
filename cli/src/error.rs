use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error for {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: StatusCode },
    #[error("unexpected response from {url}: {reason}")]
    Shape { url: String, reason: String },
}

/// Coarse classification used by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Status,
    Shape,
}

/// Anything the retry wrapper can classify.
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}

impl FetchError {
    pub fn shape(url: &str, reason: impl Into<String>) -> Self {
        FetchError::Shape {
            url: url.to_owned(),
            reason: reason.into(),
        }
    }

    /// Maps a reqwest failure: body decode errors are shape errors,
    /// everything else is the transport's fault.
    pub fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_decode() {
            FetchError::shape(url, source.to_string())
        } else {
            FetchError::Network {
                url: url.to_owned(),
                source,
            }
        }
    }
}

impl Classify for FetchError {
    fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Network { .. } => ErrorKind::Network,
            // Throttling and server-side hiccups behave like dropped connections.
            FetchError::Status { status, .. }
                if status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS =>
            {
                ErrorKind::Network
            }
            FetchError::Status { .. } => ErrorKind::Status,
            FetchError::Shape { .. } => ErrorKind::Shape,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> FetchError {
        FetchError::Status {
            url: "https://stats.nba.com/stats/x".into(),
            status: StatusCode::from_u16(code).unwrap(),
        }
    }

    #[test]
    fn server_errors_and_throttling_are_transient() {
        assert_eq!(status(500).kind(), ErrorKind::Network);
        assert_eq!(status(503).kind(), ErrorKind::Network);
        assert_eq!(status(429).kind(), ErrorKind::Network);
    }

    #[test]
    fn client_errors_are_not_transient() {
        assert_eq!(status(404).kind(), ErrorKind::Status);
        assert_eq!(status(400).kind(), ErrorKind::Status);
    }

    #[test]
    fn shape_errors_keep_their_reason() {
        let err = FetchError::shape("https://stats.nba.com/stats/x", "missing resultSets");
        assert_eq!(err.kind(), ErrorKind::Shape);
        assert!(err.to_string().contains("missing resultSets"));
    }
}
