//! HRMS client that fails over to the local store when the backend is unreachable.

use crate::fallback::{ApiMode, BlobStorage, CallResult, FallbackLayer};

use super::client::HrmsClient;
use super::error::ApiError;
use super::store::HrmsStore;
use super::types::{
  AttendanceRecord, DashboardSummary, DateRange, Employee, EmployeeSummary, NewAttendance,
  NewEmployee,
};

/// HRMS client with transparent failover.
///
/// This wraps the backend client and the local store behind the same API.
/// Which one serves a call is decided by the layer's mode; each result
/// records where it came from.
pub struct HrmsApi<S: BlobStorage> {
  remote: Option<HrmsClient>,
  store: HrmsStore<S>,
  layer: FallbackLayer,
}

impl<S: BlobStorage> HrmsApi<S> {
  /// Combine a backend client and a store.
  ///
  /// `remote` may only be `None` in mock mode.
  pub fn new(
    mode: ApiMode,
    remote: Option<HrmsClient>,
    store: HrmsStore<S>,
  ) -> Result<Self, ApiError> {
    if remote.is_none() && mode != ApiMode::Mock {
      return Err(ApiError::Invalid(format!(
        "{} mode requires a backend URL",
        mode
      )));
    }

    Ok(Self {
      remote,
      store,
      layer: FallbackLayer::new(mode),
    })
  }

  pub fn mode(&self) -> ApiMode {
    self.layer.mode()
  }

  pub fn remote(&self) -> Option<&HrmsClient> {
    self.remote.as_ref()
  }

  pub fn store(&self) -> &HrmsStore<S> {
    &self.store
  }

  fn backend(&self) -> Result<&HrmsClient, ApiError> {
    self
      .remote
      .as_ref()
      .ok_or_else(|| ApiError::Network("no backend configured".to_string()))
  }

  pub async fn list_employees(&self) -> Result<CallResult<Vec<Employee>>, ApiError> {
    self
      .layer
      .call(
        "list_employees",
        || async { self.backend()?.list_employees().await },
        || self.store.list_employees(),
      )
      .await
  }

  pub async fn create_employee(&self, data: NewEmployee) -> Result<CallResult<Employee>, ApiError> {
    self
      .layer
      .call(
        "create_employee",
        || async { self.backend()?.create_employee(&data).await },
        || self.store.create_employee(data.clone()),
      )
      .await
  }

  pub async fn delete_employee(&self, employee_id: &str) -> Result<CallResult<()>, ApiError> {
    self
      .layer
      .call(
        "delete_employee",
        || async { self.backend()?.delete_employee(employee_id).await },
        || self.store.delete_employee(employee_id),
      )
      .await
  }

  pub async fn employee_summary(
    &self,
    employee_id: &str,
  ) -> Result<CallResult<EmployeeSummary>, ApiError> {
    self
      .layer
      .call(
        "employee_summary",
        || async { self.backend()?.employee_summary(employee_id).await },
        || self.store.employee_summary(employee_id),
      )
      .await
  }

  pub async fn create_attendance(
    &self,
    data: NewAttendance,
  ) -> Result<CallResult<AttendanceRecord>, ApiError> {
    self
      .layer
      .call(
        "create_attendance",
        || async { self.backend()?.create_attendance(&data).await },
        || self.store.create_attendance(data.clone()),
      )
      .await
  }

  pub async fn list_attendance(
    &self,
    employee_id: &str,
    range: DateRange,
  ) -> Result<CallResult<Vec<AttendanceRecord>>, ApiError> {
    self
      .layer
      .call(
        "list_attendance",
        || async { self.backend()?.list_attendance(employee_id, range).await },
        || self.store.list_attendance(employee_id, range),
      )
      .await
  }

  pub async fn dashboard_summary(&self) -> Result<CallResult<DashboardSummary>, ApiError> {
    self
      .layer
      .call(
        "dashboard_summary",
        || async { self.backend()?.dashboard_summary().await },
        || self.store.dashboard_summary(),
      )
      .await
  }
}
