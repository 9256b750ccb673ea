//! Failover layer that routes calls between a remote backend and a local store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use tracing::warn;

use super::traits::{CallResult, FailoverError};

/// How calls are routed. Decided once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiMode {
  /// Backend only; unreachability is reported to the caller
  Remote,
  /// Local store only; the backend is never contacted
  Mock,
  /// Backend first, local store when the backend is unreachable
  #[default]
  Fallback,
}

impl fmt::Display for ApiMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ApiMode::Remote => "remote",
      ApiMode::Mock => "mock",
      ApiMode::Fallback => "fallback",
    };
    f.write_str(name)
  }
}

impl FromStr for ApiMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "remote" => Ok(ApiMode::Remote),
      "mock" => Ok(ApiMode::Mock),
      "fallback" => Ok(ApiMode::Fallback),
      other => Err(format!(
        "unknown api mode '{}' (expected remote, mock or fallback)",
        other
      )),
    }
  }
}

/// Failover layer that decides, per call, which side serves it.
///
/// This layer sits between the application and the network client, providing
/// transparent failover to a local store when the backend cannot be reached.
/// It holds no data of its own.
#[derive(Debug, Clone, Copy)]
pub struct FallbackLayer {
  mode: ApiMode,
}

impl FallbackLayer {
  pub fn new(mode: ApiMode) -> Self {
    Self { mode }
  }

  pub fn mode(&self) -> ApiMode {
    self.mode
  }

  /// Run one logical call.
  ///
  /// 1. In mock mode, run `local` only
  /// 2. Otherwise run `remote`
  /// 3. In fallback mode, if `remote` failed without reaching the server, run
  ///    `local` and return its result instead
  ///
  /// Errors from a reachable server are returned as-is and never fail over.
  /// The `op` parameter names the call in log output (e.g., "list_employees").
  pub async fn call<T, E, R, RFut, L, LFut>(
    &self,
    op: &str,
    remote: R,
    local: L,
  ) -> Result<CallResult<T>, E>
  where
    E: FailoverError + fmt::Display,
    R: FnOnce() -> RFut,
    RFut: Future<Output = Result<T, E>>,
    L: FnOnce() -> LFut,
    LFut: Future<Output = Result<T, E>>,
  {
    match self.mode {
      ApiMode::Mock => local().await.map(CallResult::from_fallback),
      ApiMode::Remote => remote().await.map(CallResult::from_remote),
      ApiMode::Fallback => match remote().await {
        Ok(data) => Ok(CallResult::from_remote(data)),
        Err(e) if e.is_unreachable() => {
          warn!(op, error = %e, "backend unreachable, serving from local store");
          local().await.map(CallResult::from_fallback)
        }
        Err(e) => Err(e),
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fallback::CallSource;
  use std::sync::atomic::{AtomicU32, Ordering};

  #[derive(Debug, PartialEq)]
  enum TestError {
    Unreachable,
    Rejected(u16),
  }

  impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "{:?}", self)
    }
  }

  impl FailoverError for TestError {
    fn is_unreachable(&self) -> bool {
      matches!(self, TestError::Unreachable)
    }
  }

  #[tokio::test]
  async fn test_fallback_mode_uses_remote_when_reachable() {
    let layer = FallbackLayer::new(ApiMode::Fallback);

    let result = layer
      .call(
        "op",
        || async { Ok::<_, TestError>("remote") },
        || async { Ok("local") },
      )
      .await
      .expect("call");

    assert_eq!(result.data, "remote");
    assert_eq!(result.source, CallSource::Remote);
  }

  #[tokio::test]
  async fn test_fallback_mode_fails_over_when_unreachable() {
    let layer = FallbackLayer::new(ApiMode::Fallback);

    let result = layer
      .call(
        "op",
        || async { Err::<&str, _>(TestError::Unreachable) },
        || async { Ok("local") },
      )
      .await
      .expect("failover hides the network error");

    assert_eq!(result.data, "local");
    assert!(result.is_fallback());
  }

  #[tokio::test]
  async fn test_fallback_mode_propagates_rejections() {
    let layer = FallbackLayer::new(ApiMode::Fallback);
    let local_calls = AtomicU32::new(0);

    let result = layer
      .call(
        "op",
        || async { Err::<&str, _>(TestError::Rejected(409)) },
        || async {
          local_calls.fetch_add(1, Ordering::SeqCst);
          Ok("local")
        },
      )
      .await;

    assert_eq!(result.unwrap_err(), TestError::Rejected(409));
    assert_eq!(local_calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_mock_mode_never_calls_remote() {
    let layer = FallbackLayer::new(ApiMode::Mock);
    let remote_calls = AtomicU32::new(0);

    let result = layer
      .call(
        "op",
        || async {
          remote_calls.fetch_add(1, Ordering::SeqCst);
          Ok::<_, TestError>("remote")
        },
        || async { Ok("local") },
      )
      .await
      .expect("call");

    assert_eq!(result.data, "local");
    assert_eq!(remote_calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_remote_mode_reports_unreachable() {
    let layer = FallbackLayer::new(ApiMode::Remote);

    let result = layer
      .call(
        "op",
        || async { Err::<&str, _>(TestError::Unreachable) },
        || async { Ok("local") },
      )
      .await;

    assert_eq!(result.unwrap_err(), TestError::Unreachable);
  }

  #[test]
  fn test_mode_parsing() {
    assert_eq!("Mock".parse::<ApiMode>(), Ok(ApiMode::Mock));
    assert_eq!(" remote ".parse::<ApiMode>(), Ok(ApiMode::Remote));
    assert!("offline".parse::<ApiMode>().is_err());
    assert_eq!(ApiMode::Fallback.to_string(), "fallback");
  }
}
