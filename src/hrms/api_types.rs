//! Serde types for HRMS backend payloads that are not domain records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error body returned by the backend: `{"detail": ...}`.
///
/// `detail` is usually a string, but validation failures carry a list of
/// field errors, so it is kept as a raw JSON value.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
  pub detail: Value,
}

impl ApiErrorBody {
  /// Render `detail` as a single message.
  pub fn message(&self) -> String {
    match &self.detail {
      Value::String(s) => s.clone(),
      Value::Array(items) => items
        .iter()
        .map(|item| match item.get("msg").and_then(Value::as_str) {
          Some(msg) => msg.to_string(),
          None => item.to_string(),
        })
        .collect::<Vec<_>>()
        .join("; "),
      other => other.to_string(),
    }
  }
}

/// Extract a readable message from an error response body.
///
/// Falls back to the raw body, or to the status line when the body is empty.
pub fn error_message(status: u16, body: &str) -> String {
  if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
    return parsed.message();
  }
  let trimmed = body.trim();
  if trimmed.is_empty() {
    format!("request failed with status {}", status)
  } else {
    trimmed.to_string()
  }
}

/// Query parameters for the attendance listing endpoint.
#[derive(Debug, Default, Serialize)]
pub struct AttendanceQuery {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub start_date: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub end_date: Option<String>,
}

/// Response of the health endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
  #[serde(default)]
  pub status: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_string_detail() {
    let body = r#"{"detail": "Attendance already marked for employee 'E1' on date '2024-01-05'"}"#;
    assert_eq!(
      error_message(409, body),
      "Attendance already marked for employee 'E1' on date '2024-01-05'"
    );
  }

  #[test]
  fn test_validation_detail_list() {
    let body = r#"{"detail": [
      {"loc": ["body", "email"], "msg": "value is not a valid email address", "type": "value_error"},
      {"loc": ["body", "full_name"], "msg": "field required", "type": "missing"}
    ]}"#;
    assert_eq!(
      error_message(422, body),
      "value is not a valid email address; field required"
    );
  }

  #[test]
  fn test_non_json_body() {
    assert_eq!(error_message(502, "Bad Gateway\n"), "Bad Gateway");
    assert_eq!(error_message(500, ""), "request failed with status 500");
  }
}
