// error_handling.rs - Error taxonomy for the maze sync protocol

use thiserror::Error;

/// Failures surfaced by the store client and the sync engine.
///
/// Every variant is terminal for the enclosing save/load call: there are
/// no automatic retries, and remote writes already applied when an error
/// occurs are not rolled back.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("maze `{name}` does not exist on the remote store")]
    MazeNotFound { name: String },

    #[error("remote call failed: {message} at {url}")]
    Remote { message: String, url: String },

    #[error("malformed maze payload from {url}: {message}")]
    MalformedPayload { message: String, url: String },

    #[error("unknown tile type code `{code}`")]
    UnknownTileCode { code: String },

    #[error("invalid sync configuration: {message}")]
    InvalidConfig { message: String },
}

impl SyncError {
    /// Remote failure with the offending URL attached.
    pub fn remote(url: impl Into<String>, message: impl ToString) -> Self {
        SyncError::Remote {
            message: message.to_string(),
            url: url.into(),
        }
    }

    /// Undecodable response body with the offending URL attached.
    pub fn malformed(url: impl Into<String>, message: impl ToString) -> Self {
        SyncError::MalformedPayload {
            message: message.to_string(),
            url: url.into(),
        }
    }

    /// True for lookup misses, the one failure the save protocol expects.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::MazeNotFound { .. })
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<no url>".to_string());
        SyncError::Remote {
            message: err.to_string(),
            url,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_carries_url() {
        let err = SyncError::remote("http://host/api/maze/get/by-name/maze8x8", "connection refused");
        let text = err.to_string();
        assert!(text.contains("connection refused"));
        assert!(text.contains("maze/get/by-name/maze8x8"));
    }

    #[test]
    fn test_not_found_predicate() {
        let miss = SyncError::MazeNotFound {
            name: "maze8x8".to_string(),
        };
        assert!(miss.is_not_found());
        assert!(!SyncError::remote("http://host", "boom").is_not_found());
    }
}
