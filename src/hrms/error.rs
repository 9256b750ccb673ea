//! Error taxonomy for HRMS calls.

use std::fmt;

use crate::fallback::FailoverError;

/// Error returned by the remote client, the fallback store, and the dispatch
/// that combines them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
  /// The request never received a response (timeout, refused, unroutable)
  Network(String),
  /// The backend (or the store on its behalf) reported a duplicate (HTTP 409)
  Conflict(String),
  /// Any other error response from a reachable backend
  Status { status: u16, detail: String },
  /// A success response whose body could not be understood
  Decode(String),
  /// Input rejected locally before anything was sent
  Invalid(String),
}

impl ApiError {
  /// HTTP status this error corresponds to, if any.
  pub fn status(&self) -> Option<u16> {
    match self {
      ApiError::Conflict(_) => Some(409),
      ApiError::Status { status, .. } => Some(*status),
      _ => None,
    }
  }

  /// Human-readable message without the error-class prefix.
  pub fn detail(&self) -> &str {
    match self {
      ApiError::Network(msg)
      | ApiError::Conflict(msg)
      | ApiError::Decode(msg)
      | ApiError::Invalid(msg) => msg,
      ApiError::Status { detail, .. } => detail,
    }
  }

  /// Whether the error should be shown as a warning rather than a failure.
  ///
  /// Duplicate attendance is an expected outcome of re-marking a day.
  pub fn is_warning(&self) -> bool {
    matches!(self, ApiError::Conflict(_)) || self.detail().contains("already marked")
  }
}

impl fmt::Display for ApiError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ApiError::Network(msg) => write!(f, "backend unreachable: {}", msg),
      ApiError::Conflict(msg) => write!(f, "conflict: {}", msg),
      ApiError::Status { status, detail } => write!(f, "HTTP {}: {}", status, detail),
      ApiError::Decode(msg) => write!(f, "unexpected response: {}", msg),
      ApiError::Invalid(msg) => write!(f, "invalid input: {}", msg),
    }
  }
}

impl std::error::Error for ApiError {}

impl FailoverError for ApiError {
  fn is_unreachable(&self) -> bool {
    matches!(self, ApiError::Network(_))
  }
}
