//! Error types for vidline core

use thiserror::Error;

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Player error types
#[derive(Error, Debug)]
pub enum Error {
    // Manifest errors
    #[error("Failed to fetch manifest: {0}")]
    ManifestFetch(String),

    #[error("Manifest fetch timed out after {timeout_ms}ms: {url}")]
    ManifestTimeout { url: String, timeout_ms: u64 },

    #[error("Manifest request returned HTTP {status}: {url}")]
    ManifestStatus { url: String, status: u16 },

    #[error("No segment directives found in manifest")]
    ManifestMalformed,

    #[error("Operation cancelled")]
    Cancelled,

    // Engine errors
    #[error("Engine failed to attach {url}: {reason}")]
    EngineAttach { url: String, reason: String },

    #[error("Unsupported stream type: {0}")]
    UnsupportedStream(String),

    #[error("Codec not supported: {codec}")]
    CodecNotSupported { codec: String },

    #[error("No engine attached")]
    NoEngine,

    // Transcoding errors
    #[error("{operation} failed: {message}")]
    Transcode { operation: String, message: String },

    // Media element errors
    #[error("Media element rejected {action}: {reason}")]
    MediaElement { action: String, reason: String },

    // Network errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a transcoding error scoped to one operation
    pub fn transcode(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Transcode {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create an engine attach error
    pub fn attach(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::EngineAttach {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::ManifestFetch(_)
                | Error::ManifestTimeout { .. }
                | Error::ManifestStatus { .. }
                | Error::ManifestMalformed
                | Error::Cancelled
                | Error::Transcode { .. }
                | Error::Network(_)
        )
    }

    /// Returns true if the error only degrades segment visualization
    pub fn is_manifest_unavailable(&self) -> bool {
        matches!(
            self,
            Error::ManifestFetch(_)
                | Error::ManifestTimeout { .. }
                | Error::ManifestStatus { .. }
                | Error::ManifestMalformed
                | Error::Network(_)
        )
    }

    /// Returns the error code for analytics
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::ManifestFetch(_) => "MANIFEST_FETCH",
            Error::ManifestTimeout { .. } => "MANIFEST_TIMEOUT",
            Error::ManifestStatus { .. } => "MANIFEST_STATUS",
            Error::ManifestMalformed => "MANIFEST_MALFORMED",
            Error::Cancelled => "CANCELLED",
            Error::EngineAttach { .. } => "ENGINE_ATTACH",
            Error::UnsupportedStream(_) => "STREAM_UNSUPPORTED",
            Error::CodecNotSupported { .. } => "CODEC_UNSUPPORTED",
            Error::NoEngine => "NO_ENGINE",
            Error::Transcode { .. } => "TRANSCODE",
            Error::MediaElement { .. } => "MEDIA_ELEMENT",
            Error::Network(_) => "NETWORK",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Json(_) => "JSON",
            Error::Internal(_) => "INTERNAL",
            Error::Io(_) => "IO",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_errors_are_recoverable() {
        let err = Error::ManifestStatus {
            url: "https://example.com/a.m3u8".to_string(),
            status: 404,
        };
        assert!(err.is_recoverable());
        assert!(err.is_manifest_unavailable());
        assert_eq!(err.error_code(), "MANIFEST_STATUS");
    }

    #[test]
    fn test_attach_error_is_fatal() {
        let err = Error::attach("https://example.com/a.mpd", "unsupported codec");
        assert!(!err.is_recoverable());
        assert_eq!(err.to_string(), "Engine failed to attach https://example.com/a.mpd: unsupported codec");
    }

    #[test]
    fn test_transcode_error_message() {
        let err = Error::transcode("trim", "input has no video stream");
        assert_eq!(err.to_string(), "trim failed: input has no video stream");
        assert_eq!(err.error_code(), "TRANSCODE");
    }
}
