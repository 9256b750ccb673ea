//! Command-line surface: subcommands, wiring, and output formatting.

use chrono::{Local, NaiveDate};
use clap::Subcommand;
use color_eyre::Result;
use serde::Serialize;
use std::io::Write;
use tracing::{info, warn};

use crate::config::Config;
use crate::fallback::{ApiMode, BlobStorage, CallResult, MemoryStorage, SqliteStorage};
use crate::hrms::types::{
  AttendanceRecord, AttendanceStatus, DashboardSummary, DateRange, Employee, EmployeeSummary,
  NewAttendance, NewEmployee,
};
use crate::hrms::{HrmsApi, HrmsClient, HrmsStore};

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Add, list and remove employees
  #[command(subcommand)]
  Employees(EmployeeCommand),
  /// Mark and review daily attendance
  #[command(subcommand)]
  Attendance(AttendanceCommand),
  /// Organization-wide totals
  Dashboard,
  /// Show the API mode, backend health and local store location
  Status,
}

#[derive(Subcommand, Debug)]
pub enum EmployeeCommand {
  /// List all employees
  List,
  /// Create an employee
  Add {
    #[arg(long)]
    id: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    department: String,
  },
  /// Delete an employee and all of their attendance
  Delete { id: String },
  /// Attendance totals for one employee
  Summary { id: String },
}

#[derive(Subcommand, Debug)]
pub enum AttendanceCommand {
  /// Mark an employee present or absent for a day
  Mark {
    employee_id: String,
    /// present or absent
    #[arg(long)]
    status: AttendanceStatus,
    /// Day to mark, YYYY-MM-DD (defaults to today)
    #[arg(long)]
    date: Option<NaiveDate>,
  },
  /// List an employee's attendance, most recent first
  List {
    employee_id: String,
    /// First day to include, YYYY-MM-DD
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Last day to include, YYYY-MM-DD
    #[arg(long)]
    to: Option<NaiveDate>,
  },
}

/// A ready-to-use API plus a description of where local data lives.
pub struct Session {
  pub api: HrmsApi<Box<dyn BlobStorage>>,
  pub store_location: String,
}

impl Session {
  /// Build the client, store and dispatch described by `config`.
  pub fn connect(config: &Config) -> Result<Self> {
    let mode = config.resolve_mode()?;

    let (storage, store_location) = open_storage(config);

    let store = HrmsStore::new(storage)
      .with_latency(config.simulated_latency())
      .with_unique_employee_ids(config.fallback.unique_employee_ids);

    let remote = match (mode, config.base_url()) {
      (ApiMode::Mock, _) | (_, None) => None,
      (_, Some(url)) => Some(HrmsClient::new(url, config.timeout())?),
    };

    info!(%mode, base_url = config.base_url().unwrap_or("-"), store = %store_location, "session ready");

    Ok(Self {
      api: HrmsApi::new(mode, remote, store)?,
      store_location,
    })
  }
}

/// Pick the blob storage for the local store. A store that cannot be opened
/// degrades to memory so the backend and the rest of the tool stay usable.
fn open_storage(config: &Config) -> (Box<dyn BlobStorage>, String) {
  if !config.fallback.persist {
    return (Box::new(MemoryStorage::new()), "in memory (not persisted)".to_string());
  }

  match SqliteStorage::open(config.fallback.path.as_deref()) {
    Ok(storage) => {
      let location = storage.path().display().to_string();
      (Box::new(storage), location)
    }
    Err(e) => {
      warn!(error = %e, "fallback store unavailable, keeping local data in memory");
      (
        Box::new(MemoryStorage::new()),
        format!("in memory (store unavailable: {})", e),
      )
    }
  }
}

/// Execute one command, writing results to `out`.
///
/// API errors are returned as `ApiError` inside the report so the caller can
/// tell warnings from failures.
pub async fn run(session: &Session, command: Command, json: bool, out: &mut impl Write) -> Result<()> {
  let api = &session.api;

  match command {
    Command::Employees(EmployeeCommand::List) => {
      let result = api.list_employees().await?;
      note_source(api.mode(), &result);
      emit(out, json, &result.data, render_employees)?;
    }
    Command::Employees(EmployeeCommand::Add {
      id,
      name,
      email,
      department,
    }) => {
      let data = NewEmployee {
        employee_id: id.trim().to_string(),
        full_name: name.trim().to_string(),
        email: email.trim().to_string(),
        department: department.trim().to_string(),
      };
      data.validate()?;
      let result = api.create_employee(data).await?;
      note_source(api.mode(), &result);
      emit(out, json, &result.data, |e| {
        format!("Created employee {} ({})\n", e.employee_id, e.full_name)
      })?;
    }
    Command::Employees(EmployeeCommand::Delete { id }) => {
      let result = api.delete_employee(&id).await?;
      note_source(api.mode(), &result);
      emit(out, json, &serde_json::json!({ "deleted": id }), |_| {
        format!("Deleted employee {}\n", id)
      })?;
    }
    Command::Employees(EmployeeCommand::Summary { id }) => {
      let result = api.employee_summary(&id).await?;
      note_source(api.mode(), &result);
      emit(out, json, &result.data, render_employee_summary)?;
    }
    Command::Attendance(AttendanceCommand::Mark {
      employee_id,
      status,
      date,
    }) => {
      let data = NewAttendance {
        employee_id,
        date: date.unwrap_or_else(|| Local::now().date_naive()),
        status,
      };
      let result = api.create_attendance(data).await?;
      note_source(api.mode(), &result);
      emit(out, json, &result.data, |r| {
        format!("Marked {} {} on {}\n", r.employee_id, r.status, r.date)
      })?;
    }
    Command::Attendance(AttendanceCommand::List {
      employee_id,
      from,
      to,
    }) => {
      let range = DateRange::new(from, to);
      range.validate()?;
      let result = api.list_attendance(&employee_id, range).await?;
      note_source(api.mode(), &result);
      emit(out, json, &result.data, render_attendance)?;
    }
    Command::Dashboard => {
      let result = api.dashboard_summary().await?;
      note_source(api.mode(), &result);
      emit(out, json, &result.data, render_dashboard)?;
    }
    Command::Status => {
      let backend = match api.remote() {
        None => "not contacted".to_string(),
        Some(client) => match client.health().await {
          Ok(health) if health.status.is_empty() => "reachable".to_string(),
          Ok(health) => format!("reachable ({})", health.status),
          Err(e) => e.to_string(),
        },
      };
      let base_url = api
        .remote()
        .map(|c| c.base_url().to_string())
        .unwrap_or_else(|| "-".to_string());

      writeln!(out, "mode:        {}", api.mode())?;
      writeln!(out, "backend:     {}", base_url)?;
      writeln!(out, "health:      {}", backend)?;
      writeln!(out, "local store: {}", session.store_location)?;
    }
  }

  Ok(())
}

/// Tell the user when a failover happened. Mock mode is expected, so it is not
/// annotated.
fn note_source<T>(mode: ApiMode, result: &CallResult<T>) {
  if mode == ApiMode::Fallback && result.is_fallback() {
    eprintln!("(offline: served from local store)");
  }
}

fn emit<T, F>(out: &mut impl Write, json: bool, value: &T, render: F) -> Result<()>
where
  T: Serialize,
  F: FnOnce(&T) -> String,
{
  if json {
    writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
  } else {
    write!(out, "{}", render(value))?;
  }
  Ok(())
}

/// Format rows as left-aligned columns separated by two spaces.
fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
  let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
  for row in rows {
    for (width, cell) in widths.iter_mut().zip(row) {
      *width = (*width).max(cell.chars().count());
    }
  }

  let format_row = |cells: Vec<&str>| {
    let line = cells
      .iter()
      .zip(&widths)
      .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
      .collect::<Vec<_>>()
      .join("  ");
    format!("{}\n", line.trim_end())
  };

  let mut table = format_row(headers.to_vec());
  for row in rows {
    table.push_str(&format_row(row.iter().map(String::as_str).collect()));
  }
  table
}

fn render_employees(employees: &Vec<Employee>) -> String {
  if employees.is_empty() {
    return "No employees found.\n".to_string();
  }
  let rows: Vec<Vec<String>> = employees
    .iter()
    .map(|e| {
      vec![
        e.employee_id.clone(),
        e.full_name.clone(),
        e.email.clone(),
        e.department.clone(),
        e.created_at.format("%Y-%m-%d").to_string(),
      ]
    })
    .collect();
  render_table(&["ID", "NAME", "EMAIL", "DEPARTMENT", "CREATED"], &rows)
}

fn render_attendance(records: &Vec<AttendanceRecord>) -> String {
  if records.is_empty() {
    return "No attendance records found.\n".to_string();
  }
  let rows: Vec<Vec<String>> = records
    .iter()
    .map(|r| vec![r.date.to_string(), r.status.to_string()])
    .collect();
  render_table(&["DATE", "STATUS"], &rows)
}

fn render_employee_summary(summary: &EmployeeSummary) -> String {
  format!(
    "Present days: {}\nAbsent days:  {}\nTotal:        {}\n",
    summary.total_present_days, summary.total_absent_days, summary.total_records
  )
}

fn render_dashboard(summary: &DashboardSummary) -> String {
  format!(
    "Employees:          {}\nAttendance records: {}\nPresent:            {}\nAbsent:             {}\n",
    summary.total_employees,
    summary.total_attendance_records,
    summary.total_present,
    summary.total_absent
  )
}
