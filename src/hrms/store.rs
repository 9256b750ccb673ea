//! Local emulation of the HRMS backend, persisted as JSON blobs.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::fallback::{read_snapshot, write_snapshot, BlobStorage};

use super::error::ApiError;
use super::types::{
  AttendanceRecord, AttendanceStatus, DashboardSummary, DateRange, Employee, EmployeeSummary,
  NewAttendance, NewEmployee,
};

/// Blob holding the employee list.
pub const EMPLOYEES_KEY: &str = "hrms_mock_employees";
/// Blob holding attendance records keyed by employee id.
pub const ATTENDANCE_KEY: &str = "hrms_mock_attendance";

type AttendanceBook = HashMap<String, Vec<AttendanceRecord>>;

/// Stand-in for the backend's employee, attendance and dashboard endpoints.
///
/// The store keeps no copy of the data: every operation reads the blobs
/// fresh, and every mutation writes them back while holding `write_lock`.
pub struct HrmsStore<S: BlobStorage> {
  storage: Arc<S>,
  write_lock: Arc<Mutex<()>>,
  latency: Duration,
  unique_employee_ids: bool,
}

impl<S: BlobStorage> HrmsStore<S> {
  pub fn new(storage: S) -> Self {
    Self {
      storage: Arc::new(storage),
      write_lock: Arc::new(Mutex::new(())),
      latency: Duration::ZERO,
      unique_employee_ids: false,
    }
  }

  /// Delay every operation by `latency`, like a real round trip would.
  pub fn with_latency(mut self, latency: Duration) -> Self {
    self.latency = latency;
    self
  }

  /// Reject employees whose id is already present.
  pub fn with_unique_employee_ids(mut self, unique: bool) -> Self {
    self.unique_employee_ids = unique;
    self
  }

  pub fn storage(&self) -> &S {
    &self.storage
  }

  async fn simulate_latency(&self) {
    if !self.latency.is_zero() {
      tokio::time::sleep(self.latency).await;
    }
  }

  fn load_employees(&self) -> Vec<Employee> {
    read_snapshot(self.storage.as_ref(), EMPLOYEES_KEY)
  }

  fn load_attendance(&self) -> AttendanceBook {
    read_snapshot(self.storage.as_ref(), ATTENDANCE_KEY)
  }

  pub async fn list_employees(&self) -> Result<Vec<Employee>, ApiError> {
    self.simulate_latency().await;
    Ok(self.load_employees())
  }

  pub async fn create_employee(&self, data: NewEmployee) -> Result<Employee, ApiError> {
    self.simulate_latency().await;
    let _guard = self.write_lock.lock().await;

    let mut employees = self.load_employees();
    if self.unique_employee_ids
      && employees
        .iter()
        .any(|e| e.employee_id == data.employee_id)
    {
      return Err(ApiError::Conflict(format!(
        "Employee with ID '{}' already exists",
        data.employee_id
      )));
    }

    let employee = data.into_employee(Utc::now());
    employees.push(employee.clone());
    write_snapshot(self.storage.as_ref(), EMPLOYEES_KEY, &employees);

    debug!(employee_id = %employee.employee_id, "stored employee locally");
    Ok(employee)
  }

  /// Remove an employee and all of its attendance. Unknown ids are ignored.
  pub async fn delete_employee(&self, employee_id: &str) -> Result<(), ApiError> {
    self.simulate_latency().await;
    let _guard = self.write_lock.lock().await;

    let mut employees = self.load_employees();
    let mut attendance = self.load_attendance();

    if let Some(index) = employees.iter().position(|e| e.employee_id == employee_id) {
      employees.remove(index);
      attendance.remove(employee_id);
      write_snapshot(self.storage.as_ref(), EMPLOYEES_KEY, &employees);
      write_snapshot(self.storage.as_ref(), ATTENDANCE_KEY, &attendance);
      debug!(employee_id, "deleted employee locally");
    }

    Ok(())
  }

  pub async fn employee_summary(&self, employee_id: &str) -> Result<EmployeeSummary, ApiError> {
    self.simulate_latency().await;
    let attendance = self.load_attendance();
    let records = attendance
      .get(employee_id)
      .map(Vec::as_slice)
      .unwrap_or_default();

    let (present, absent) = tally(records);
    Ok(EmployeeSummary {
      total_present_days: present,
      total_absent_days: absent,
      total_records: records.len() as u64,
    })
  }

  pub async fn create_attendance(&self, data: NewAttendance) -> Result<AttendanceRecord, ApiError> {
    self.simulate_latency().await;
    let _guard = self.write_lock.lock().await;

    let mut attendance = self.load_attendance();

    let already_marked = attendance
      .get(&data.employee_id)
      .is_some_and(|records| records.iter().any(|r| r.date == data.date));
    if already_marked {
      return Err(ApiError::Conflict(format!(
        "Attendance already marked for employee '{}' on date '{}'",
        data.employee_id, data.date
      )));
    }

    let id = next_record_id(&attendance, Utc::now().timestamp_millis());
    let record = data.into_record(id);
    attendance
      .entry(record.employee_id.clone())
      .or_default()
      .push(record.clone());
    write_snapshot(self.storage.as_ref(), ATTENDANCE_KEY, &attendance);

    debug!(employee_id = %record.employee_id, date = %record.date, id, "stored attendance locally");
    Ok(record)
  }

  /// Records for one employee within `range`, most recent first.
  pub async fn list_attendance(
    &self,
    employee_id: &str,
    range: DateRange,
  ) -> Result<Vec<AttendanceRecord>, ApiError> {
    self.simulate_latency().await;
    let mut attendance = self.load_attendance();

    let mut records: Vec<AttendanceRecord> = attendance
      .remove(employee_id)
      .unwrap_or_default()
      .into_iter()
      .filter(|r| range.contains(r.date))
      .collect();
    records.sort_by(|a, b| b.date.cmp(&a.date));

    Ok(records)
  }

  pub async fn dashboard_summary(&self) -> Result<DashboardSummary, ApiError> {
    self.simulate_latency().await;
    let employees = self.load_employees();
    let attendance = self.load_attendance();

    let (present, absent) = attendance
      .values()
      .map(|records| tally(records))
      .fold((0, 0), |(p, a), (rp, ra)| (p + rp, a + ra));

    Ok(DashboardSummary {
      total_employees: employees.len() as u64,
      total_attendance_records: present + absent,
      total_present: present,
      total_absent: absent,
    })
  }
}

impl<S: BlobStorage> Clone for HrmsStore<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      write_lock: Arc::clone(&self.write_lock),
      latency: self.latency,
      unique_employee_ids: self.unique_employee_ids,
    }
  }
}

/// Count (present, absent) records.
fn tally(records: &[AttendanceRecord]) -> (u64, u64) {
  records
    .iter()
    .fold((0, 0), |(present, absent), r| match r.status {
      AttendanceStatus::Present => (present + 1, absent),
      AttendanceStatus::Absent => (present, absent + 1),
    })
}

/// Time-derived id that never repeats within the store: the current time in
/// milliseconds, bumped past the largest id already issued.
fn next_record_id(attendance: &AttendanceBook, now_millis: i64) -> u64 {
  let now = u64::try_from(now_millis).unwrap_or(0);
  let max_existing = attendance.values().flatten().map(|r| r.id).max();
  match max_existing {
    Some(max) if max >= now => max + 1,
    _ => now,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fallback::{MemoryStorage, SqliteStorage};
  use chrono::NaiveDate;
  use color_eyre::{eyre::eyre, Result};
  use tempfile::tempdir;

  struct BrokenStorage;

  impl BlobStorage for BrokenStorage {
    fn get(&self, _key: &str) -> Result<Option<String>> {
      Err(eyre!("quota exceeded"))
    }

    fn put(&self, _key: &str, _value: &str) -> Result<()> {
      Err(eyre!("quota exceeded"))
    }
  }

  fn store() -> HrmsStore<MemoryStorage> {
    HrmsStore::new(MemoryStorage::new())
  }

  fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date")
  }

  fn employee(id: &str) -> NewEmployee {
    NewEmployee {
      employee_id: id.to_string(),
      full_name: format!("Employee {}", id),
      email: format!("{}@example.com", id.to_lowercase()),
      department: "Operations".to_string(),
    }
  }

  fn mark(id: &str, day: &str, status: AttendanceStatus) -> NewAttendance {
    NewAttendance {
      employee_id: id.to_string(),
      date: date(day),
      status,
    }
  }

  #[tokio::test]
  async fn test_created_employee_is_listed() {
    let store = store();
    let before = Utc::now();

    let created = store.create_employee(employee("E1")).await.expect("create");
    let listed = store.list_employees().await.expect("list");

    assert_eq!(listed, vec![created.clone()]);
    assert!(created.created_at >= before);
  }

  #[tokio::test]
  async fn test_duplicate_employee_ids_are_appended_by_default() {
    let store = store();
    store.create_employee(employee("E1")).await.expect("first");
    store.create_employee(employee("E1")).await.expect("second");

    assert_eq!(store.list_employees().await.expect("list").len(), 2);
  }

  #[tokio::test]
  async fn test_duplicate_employee_ids_rejected_when_unique() {
    let store = store().with_unique_employee_ids(true);
    store.create_employee(employee("E1")).await.expect("first");

    let err = store.create_employee(employee("E1")).await.unwrap_err();
    assert_eq!(err.status(), Some(409));
    assert!(err.detail().contains("E1"));
  }

  #[tokio::test]
  async fn test_delete_cascades_to_attendance() {
    let store = store();
    store.create_employee(employee("E1")).await.expect("create");
    store.create_employee(employee("E2")).await.expect("create");
    store
      .create_attendance(mark("E1", "2024-01-05", AttendanceStatus::Present))
      .await
      .expect("mark");
    store
      .create_attendance(mark("E2", "2024-01-05", AttendanceStatus::Absent))
      .await
      .expect("mark");

    store.delete_employee("E1").await.expect("delete");

    let ids: Vec<String> = store
      .list_employees()
      .await
      .expect("list")
      .into_iter()
      .map(|e| e.employee_id)
      .collect();
    assert_eq!(ids, vec!["E2".to_string()]);
    assert!(store
      .list_attendance("E1", DateRange::default())
      .await
      .expect("list")
      .is_empty());
    assert_eq!(
      store
        .list_attendance("E2", DateRange::default())
        .await
        .expect("list")
        .len(),
      1
    );
  }

  #[tokio::test]
  async fn test_delete_unknown_employee_is_noop() {
    let store = store();
    store.create_employee(employee("E1")).await.expect("create");

    store.delete_employee("nobody").await.expect("no error");
    assert_eq!(store.list_employees().await.expect("list").len(), 1);
  }

  #[tokio::test]
  async fn test_second_mark_for_same_day_conflicts() {
    let store = store();
    store
      .create_attendance(mark("E1", "2024-01-05", AttendanceStatus::Present))
      .await
      .expect("first mark");

    let err = store
      .create_attendance(mark("E1", "2024-01-05", AttendanceStatus::Absent))
      .await
      .unwrap_err();

    assert!(matches!(err, ApiError::Conflict(_)));
    assert!(err.detail().contains("E1"));
    assert!(err.detail().contains("2024-01-05"));
    assert!(err.is_warning());

    // Another employee on the same day is fine
    store
      .create_attendance(mark("E2", "2024-01-05", AttendanceStatus::Present))
      .await
      .expect("other employee");
  }

  #[tokio::test]
  async fn test_list_attendance_filters_and_sorts_descending() {
    let store = store();
    for day in ["2023-12-31", "2024-01-01", "2024-01-15", "2024-01-31", "2024-02-01"] {
      store
        .create_attendance(mark("E1", day, AttendanceStatus::Present))
        .await
        .expect("mark");
    }

    let records = store
      .list_attendance(
        "E1",
        DateRange::new(Some(date("2024-01-01")), Some(date("2024-01-31"))),
      )
      .await
      .expect("list");

    let days: Vec<String> = records.iter().map(|r| r.date.to_string()).collect();
    assert_eq!(days, vec!["2024-01-31", "2024-01-15", "2024-01-01"]);
  }

  #[tokio::test]
  async fn test_list_attendance_open_ended_range() {
    let store = store();
    for day in ["2024-01-01", "2024-01-10", "2024-01-20"] {
      store
        .create_attendance(mark("E1", day, AttendanceStatus::Absent))
        .await
        .expect("mark");
    }

    let records = store
      .list_attendance("E1", DateRange::new(Some(date("2024-01-10")), None))
      .await
      .expect("list");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].date, date("2024-01-20"));

    assert!(store
      .list_attendance("E9", DateRange::default())
      .await
      .expect("list")
      .is_empty());
  }

  #[tokio::test]
  async fn test_summaries_count_statuses() {
    let store = store();
    store.create_employee(employee("E1")).await.expect("create");
    store.create_employee(employee("E2")).await.expect("create");
    let marks = [
      ("E1", "2024-01-01", AttendanceStatus::Present),
      ("E1", "2024-01-02", AttendanceStatus::Present),
      ("E1", "2024-01-03", AttendanceStatus::Absent),
      ("E2", "2024-01-01", AttendanceStatus::Absent),
      // Attendance for an unknown employee still counts
      ("E3", "2024-01-01", AttendanceStatus::Present),
    ];
    for (id, day, status) in marks {
      store
        .create_attendance(mark(id, day, status))
        .await
        .expect("mark");
    }

    let summary = store.employee_summary("E1").await.expect("summary");
    assert_eq!(
      summary,
      EmployeeSummary {
        total_present_days: 2,
        total_absent_days: 1,
        total_records: 3,
      }
    );
    assert_eq!(
      store.employee_summary("E9").await.expect("summary"),
      EmployeeSummary::default()
    );

    let dashboard = store.dashboard_summary().await.expect("dashboard");
    assert_eq!(dashboard.total_employees, 2);
    assert_eq!(dashboard.total_present, 3);
    assert_eq!(dashboard.total_absent, 2);
    assert_eq!(
      dashboard.total_attendance_records,
      dashboard.total_present + dashboard.total_absent
    );
  }

  #[tokio::test]
  async fn test_rapid_marks_get_distinct_increasing_ids() {
    let store = store();
    let mut ids = Vec::new();
    for day in 1..=20 {
      let record = store
        .create_attendance(NewAttendance {
          employee_id: "E1".to_string(),
          date: NaiveDate::from_ymd_opt(2024, 3, day).expect("date"),
          status: AttendanceStatus::Present,
        })
        .await
        .expect("mark");
      ids.push(record.id);
    }

    assert!(ids.windows(2).all(|w| w[0] < w[1]));
  }

  #[tokio::test]
  async fn test_concurrent_marks_do_not_lose_updates() {
    let store = store();
    let tasks = (1..=10u32).map(|day| {
      let store = store.clone();
      tokio::spawn(async move {
        store
          .create_attendance(NewAttendance {
            employee_id: "E1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 4, day).expect("date"),
            status: AttendanceStatus::Absent,
          })
          .await
      })
    });

    for result in futures::future::join_all(tasks).await {
      result.expect("join").expect("mark");
    }

    let summary = store.employee_summary("E1").await.expect("summary");
    assert_eq!(summary.total_records, 10);
  }

  #[tokio::test]
  async fn test_broken_storage_degrades_to_empty() {
    let store = HrmsStore::new(BrokenStorage);

    let created = store.create_employee(employee("E1")).await.expect("create");
    assert_eq!(created.employee_id, "E1");

    assert!(store.list_employees().await.expect("list").is_empty());
    store
      .create_attendance(mark("E1", "2024-01-05", AttendanceStatus::Present))
      .await
      .expect("mark");
    // Nothing was persisted, so the same day can be marked again
    store
      .create_attendance(mark("E1", "2024-01-05", AttendanceStatus::Present))
      .await
      .expect("mark again");
    assert_eq!(
      store.dashboard_summary().await.expect("dashboard"),
      DashboardSummary::default()
    );
  }

  #[tokio::test]
  async fn test_state_survives_reopen() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("fallback.db");

    {
      let store = HrmsStore::new(SqliteStorage::open(Some(&path)).expect("open"));
      store.create_employee(employee("E1")).await.expect("create");
      store
        .create_attendance(mark("E1", "2024-01-05", AttendanceStatus::Present))
        .await
        .expect("mark");
    }

    let store = HrmsStore::new(SqliteStorage::open(Some(&path)).expect("reopen"));
    assert_eq!(store.list_employees().await.expect("list").len(), 1);
    assert_eq!(
      store.dashboard_summary().await.expect("dashboard").total_present,
      1
    );
  }

  #[test]
  fn test_next_record_id() {
    let mut book = AttendanceBook::new();
    assert_eq!(next_record_id(&book, 1_000), 1_000);

    book.insert(
      "E1".to_string(),
      vec![mark("E1", "2024-01-05", AttendanceStatus::Present).into_record(1_000)],
    );
    assert_eq!(next_record_id(&book, 1_000), 1_001);
    assert_eq!(next_record_id(&book, 900), 1_001);
    assert_eq!(next_record_id(&book, 5_000), 5_000);
  }
}
