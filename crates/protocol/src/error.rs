//! Error classification shared by the daemon and its clients.
//!
//! The daemon never puts filesystem paths or OS error text into a response.
//! Every failure is reduced to an [`ErrorKind`] whose message is fixed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Client-visible failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The requested path escapes the documents root or is malformed.
    #[error("invalid document path")]
    PathTraversal,

    /// The requested document does not exist.
    #[error("document not found")]
    NotFound,

    /// Anything else. Details stay in the server log.
    #[error("internal server error")]
    Internal,
}

impl ErrorKind {
    /// HTTP status code used for this kind.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::PathTraversal => 400,
            Self::NotFound => 404,
            Self::Internal => 500,
        }
    }
}

/// JSON body of an error response: `{"error": "...", "kind": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Fixed human-readable message.
    pub error: String,
    /// Machine-readable classification.
    pub kind: ErrorKind,
}

impl From<ErrorKind> for ErrorBody {
    fn from(kind: ErrorKind) -> Self {
        Self {
            error: kind.to_string(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ErrorKind::PathTraversal.status_code(), 400);
        assert_eq!(ErrorKind::NotFound.status_code(), 404);
        assert_eq!(ErrorKind::Internal.status_code(), 500);
    }

    #[test]
    fn test_error_body_json() {
        let body = ErrorBody::from(ErrorKind::NotFound);
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"error":"document not found","kind":"not_found"}"#);
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::PathTraversal.to_string(), "invalid document path");
        assert_eq!(ErrorKind::Internal.to_string(), "internal server error");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ErrorKind>();
    }
}
