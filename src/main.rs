use clap::Parser;
use color_eyre::Result;
use hrms_lite::commands::{self, Command, Session};
use hrms_lite::config::Config;
use hrms_lite::hrms::ApiError;
use hrms_lite::logging;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "hrms")]
#[command(about = "Manage HRMS Lite employees and attendance, online or offline")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./hrms.yaml or $XDG_CONFIG_HOME/hrms/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Backend base URL (overrides config and HRMS_API_URL)
  #[arg(long)]
  api_url: Option<String>,

  /// Never contact the backend; use the local store only
  #[arg(long)]
  mock: bool,

  /// Print results as JSON
  #[arg(long)]
  json: bool,

  #[command(subcommand)]
  command: Command,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
  color_eyre::install()?;

  let args = Args::parse();

  let _log_guard = logging::init(None)?;

  // Load configuration, command line wins over file and environment
  let config = Config::load(args.config.as_deref())?
    .with_overrides(args.api_url, args.mock.then_some(true));

  let session = Session::connect(&config)?;

  let mut stdout = std::io::stdout().lock();
  match commands::run(&session, args.command, args.json, &mut stdout).await {
    Ok(()) => Ok(ExitCode::SUCCESS),
    Err(report) => match report.downcast_ref::<ApiError>() {
      Some(err) if err.is_warning() => {
        eprintln!("warning: {}", err.detail());
        Ok(ExitCode::SUCCESS)
      }
      Some(err) => {
        eprintln!("error: {}", err);
        Ok(ExitCode::FAILURE)
      }
      None => Err(report),
    },
  }
}
