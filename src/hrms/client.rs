use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::api_types::{error_message, AttendanceQuery, HealthResponse};
use super::error::ApiError;
use super::types::{
  AttendanceRecord, DashboardSummary, DateRange, Employee, EmployeeSummary, NewAttendance,
  NewEmployee,
};

/// Default bound on a single backend request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

/// HRMS backend REST client
#[derive(Clone)]
pub struct HrmsClient {
  http: reqwest::Client,
  base_url: Url,
}

impl HrmsClient {
  pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
    let base_url = Url::parse(base_url)
      .map_err(|e| ApiError::Invalid(format!("invalid backend URL '{}': {}", base_url, e)))?;
    if base_url.cannot_be_a_base() {
      return Err(ApiError::Invalid(format!(
        "backend URL '{}' cannot be used as a base",
        base_url
      )));
    }

    let http = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| ApiError::Invalid(format!("failed to create HTTP client: {}", e)))?;

    Ok(Self { http, base_url })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// Build an endpoint URL from path segments. Segments are percent-encoded,
  /// so employee ids may contain any character.
  fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base_url.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
    let url = self.endpoint(segments);
    debug!(%method, %url, "backend request");
    self.http.request(method, url)
  }

  /// List all employees
  pub async fn list_employees(&self) -> Result<Vec<Employee>, ApiError> {
    let response = send(self.request(Method::GET, &["api", "employees"])).await?;
    decode(response).await
  }

  /// Create an employee
  pub async fn create_employee(&self, data: &NewEmployee) -> Result<Employee, ApiError> {
    let response = send(self.request(Method::POST, &["api", "employees"]).json(data)).await?;
    decode(response).await
  }

  /// Delete an employee and, on the backend, its attendance
  pub async fn delete_employee(&self, employee_id: &str) -> Result<(), ApiError> {
    let response = send(self.request(Method::DELETE, &["api", "employees", employee_id])).await?;
    check(response).await.map(|_| ())
  }

  /// Attendance totals for one employee
  pub async fn employee_summary(&self, employee_id: &str) -> Result<EmployeeSummary, ApiError> {
    let response = send(self.request(
      Method::GET,
      &["api", "employees", employee_id, "summary"],
    ))
    .await?;
    decode(response).await
  }

  /// Mark attendance; a second mark for the same day yields `ApiError::Conflict`
  pub async fn create_attendance(&self, data: &NewAttendance) -> Result<AttendanceRecord, ApiError> {
    let response = send(self.request(Method::POST, &["api", "attendance"]).json(data)).await?;
    decode(response).await
  }

  /// Attendance for one employee, filtered by the backend
  pub async fn list_attendance(
    &self,
    employee_id: &str,
    range: DateRange,
  ) -> Result<Vec<AttendanceRecord>, ApiError> {
    let query = AttendanceQuery {
      start_date: range.start.map(|d| d.to_string()),
      end_date: range.end.map(|d| d.to_string()),
    };
    let response = send(
      self
        .request(Method::GET, &["api", "attendance", employee_id])
        .query(&query),
    )
    .await?;
    decode(response).await
  }

  /// Organization-wide totals
  pub async fn dashboard_summary(&self) -> Result<DashboardSummary, ApiError> {
    let response = send(self.request(Method::GET, &["api", "dashboard"])).await?;
    decode(response).await
  }

  /// Probe the backend's health endpoint
  pub async fn health(&self) -> Result<HealthResponse, ApiError> {
    let response = send(self.request(Method::GET, &["health"])).await?;
    decode(response).await
  }
}

/// Send a request. Any failure here means no response was received.
async fn send(request: RequestBuilder) -> Result<Response, ApiError> {
  request
    .send()
    .await
    .map_err(|e| ApiError::Network(describe_transport_error(&e)))
}

/// Turn non-success responses into application-class errors.
async fn check(response: Response) -> Result<Response, ApiError> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }

  let body = response.text().await.unwrap_or_default();
  let detail = error_message(status.as_u16(), &body);
  debug!(status = status.as_u16(), %detail, "backend rejected request");

  if status == StatusCode::CONFLICT {
    Err(ApiError::Conflict(detail))
  } else {
    Err(ApiError::Status {
      status: status.as_u16(),
      detail,
    })
  }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
  let response = check(response).await?;
  let body = response.bytes().await.map_err(|e| {
    if e.is_timeout() {
      ApiError::Network(describe_transport_error(&e))
    } else {
      ApiError::Decode(format!("failed to read response body: {}", e))
    }
  })?;
  serde_json::from_slice(&body)
    .map_err(|e| ApiError::Decode(format!("failed to parse response body: {}", e)))
}

fn describe_transport_error(e: &reqwest::Error) -> String {
  let kind = if e.is_timeout() {
    "request timed out"
  } else if e.is_connect() {
    "connection failed"
  } else {
    "request failed"
  };
  match e.url() {
    Some(url) => format!("{} ({})", kind, url),
    None => kind.to_string(),
  }
}
