//! Core traits and types for the failover system.

/// Errors that can tell whether the remote side was reachable at all.
///
/// Only unreachability triggers a failover. An error carrying a response from a
/// reachable server (validation failure, conflict, 5xx) must return `false` so it
/// propagates to the caller unchanged.
pub trait FailoverError {
  /// True when the request never received a response (timeout, refused
  /// connection, no route).
  fn is_unreachable(&self) -> bool;
}

/// Result from a dispatched call, including which side served it.
#[derive(Debug, Clone)]
pub struct CallResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CallSource,
}

impl<T> CallResult<T> {
  /// Create a call result from the remote backend.
  pub fn from_remote(data: T) -> Self {
    Self {
      data,
      source: CallSource::Remote,
    }
  }

  /// Create a call result from the local fallback store.
  pub fn from_fallback(data: T) -> Self {
    Self {
      data,
      source: CallSource::Fallback,
    }
  }

  pub fn is_fallback(&self) -> bool {
    self.source == CallSource::Fallback
  }
}

/// Indicates which side served a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSource {
  /// Live response from the backend
  Remote,
  /// Served by the local store (mock mode, or the backend was unreachable)
  Fallback,
}
