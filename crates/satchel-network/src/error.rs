//! Errors raised while talking to peers.

use satchel_core::error::{AppError, ErrorKind};

/// A request to a peer failed.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// The peer could not be reached or the connection dropped.
    #[error("Peer unreachable at {url}: {message}")]
    Unreachable {
        /// URL that was requested.
        url: String,
        /// Transport error message.
        message: String,
    },

    /// The peer answered with an unexpected status.
    #[error("Peer returned HTTP {status} for {url}")]
    Status {
        /// URL that was requested.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The peer's response body could not be decoded.
    #[error("Invalid response from {url}: {message}")]
    Decode {
        /// URL that was requested.
        url: String,
        /// Decoder error message.
        message: String,
    },
}

impl NetworkError {
    pub(crate) fn unreachable(url: &str, err: reqwest::Error) -> Self {
        Self::Unreachable {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn decode(url: &str, err: reqwest::Error) -> Self {
        Self::Decode {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<NetworkError> for AppError {
    fn from(err: NetworkError) -> Self {
        AppError::with_source(ErrorKind::ExternalService, err.to_string(), err)
    }
}

/// Why importing a node's resources from one peer failed.
///
/// Every variant makes the download executor move on to the next peer,
/// except [`TransferError::Cancelled`], which ends the attempt.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// The peer does not have the file.
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    /// The cancellation token fired mid-transfer.
    #[error("Transfer cancelled")]
    Cancelled,

    /// The received file does not match the expected size.
    #[error("Corrupt transfer of {file}: expected {expected} bytes, received {actual}")]
    Corrupt {
        /// Local file name.
        file: String,
        /// Size recorded in the content store.
        expected: u64,
        /// Size received.
        actual: u64,
    },

    /// A network failure that survived the retries.
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Writing to content storage or updating the content store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] AppError),
}

impl TransferError {
    /// Whether the peer simply lacks the content.
    pub fn is_location_not_found(&self) -> bool {
        matches!(self, Self::LocationNotFound(_))
    }

    /// Whether the transfer was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_error_maps_to_external_service() {
        let err: AppError = NetworkError::Status {
            url: "http://peer/api".to_string(),
            status: 502,
        }
        .into();
        assert_eq!(err.kind, ErrorKind::ExternalService);
        assert!(err.message.contains("502"));
    }

    #[test]
    fn test_corrupt_message() {
        let err = TransferError::Corrupt {
            file: "abc.mp4".to_string(),
            expected: 10,
            actual: 7,
        };
        assert_eq!(
            err.to_string(),
            "Corrupt transfer of abc.mp4: expected 10 bytes, received 7"
        );
        assert!(!err.is_location_not_found());
    }
}
