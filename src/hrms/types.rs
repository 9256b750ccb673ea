use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ApiError;

/// Employee record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
  pub employee_id: String,
  pub full_name: String,
  pub email: String,
  pub department: String,
  #[serde(deserialize_with = "deserialize_timestamp")]
  pub created_at: DateTime<Utc>,
}

/// Payload for creating an employee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEmployee {
  pub employee_id: String,
  pub full_name: String,
  pub email: String,
  pub department: String,
}

impl NewEmployee {
  /// Check the fields the backend would reject.
  pub fn validate(&self) -> Result<(), ApiError> {
    let fields = [
      ("employee_id", &self.employee_id),
      ("full_name", &self.full_name),
      ("email", &self.email),
      ("department", &self.department),
    ];
    for (name, value) in fields {
      if value.trim().is_empty() {
        return Err(ApiError::Invalid(format!("{} must not be empty", name)));
      }
    }

    if !looks_like_email(self.email.trim()) {
      return Err(ApiError::Invalid(format!(
        "'{}' is not a valid email address",
        self.email
      )));
    }

    Ok(())
  }

  /// Materialize the record with its creation time.
  pub fn into_employee(self, created_at: DateTime<Utc>) -> Employee {
    Employee {
      employee_id: self.employee_id,
      full_name: self.full_name,
      email: self.email,
      department: self.department,
      created_at,
    }
  }
}

fn looks_like_email(email: &str) -> bool {
  let Some((local, domain)) = email.split_once('@') else {
    return false;
  };
  !local.is_empty()
    && !domain.contains('@')
    && !email.contains(char::is_whitespace)
    && domain
      .rsplit_once('.')
      .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

/// Attendance status for a single day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
  Present,
  Absent,
}

impl fmt::Display for AttendanceStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AttendanceStatus::Present => f.write_str("Present"),
      AttendanceStatus::Absent => f.write_str("Absent"),
    }
  }
}

impl FromStr for AttendanceStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "present" | "p" => Ok(AttendanceStatus::Present),
      "absent" | "a" => Ok(AttendanceStatus::Absent),
      _ => Err("Status must be either 'Present' or 'Absent'".to_string()),
    }
  }
}

/// One employee's attendance for one calendar date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
  pub id: u64,
  pub employee_id: String,
  pub date: NaiveDate,
  pub status: AttendanceStatus,
}

/// Payload for marking attendance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAttendance {
  pub employee_id: String,
  pub date: NaiveDate,
  pub status: AttendanceStatus,
}

impl NewAttendance {
  pub fn into_record(self, id: u64) -> AttendanceRecord {
    AttendanceRecord {
      id,
      employee_id: self.employee_id,
      date: self.date,
      status: self.status,
    }
  }
}

/// Inclusive date bounds for attendance listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
  pub start: Option<NaiveDate>,
  pub end: Option<NaiveDate>,
}

impl DateRange {
  pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
    Self { start, end }
  }

  /// Reject ranges whose start is after their end.
  pub fn validate(&self) -> Result<(), ApiError> {
    match (self.start, self.end) {
      (Some(start), Some(end)) if start > end => Err(ApiError::Invalid(
        "Start date must be before or equal to end date".to_string(),
      )),
      _ => Ok(()),
    }
  }

  pub fn contains(&self, date: NaiveDate) -> bool {
    self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
  }
}

/// Attendance totals for one employee
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeSummary {
  pub total_present_days: u64,
  pub total_absent_days: u64,
  pub total_records: u64,
}

/// Totals across the whole organization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
  pub total_employees: u64,
  pub total_attendance_records: u64,
  pub total_present: u64,
  pub total_absent: u64,
}

/// Accept RFC 3339 timestamps as well as the naive ISO datetimes the backend
/// emits; naive values are taken as UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = String::deserialize(deserializer)?;
  parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Ok(dt.with_timezone(&Utc));
  }
  NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
    .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
    .map(|dt| dt.and_utc())
    .map_err(|e| format!("invalid timestamp '{}': {}", raw, e))
}
