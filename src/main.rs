mod codec;
mod config;
mod domain;
mod elapsed;
mod error;
mod interrupt;
mod paths;
mod session;
mod storage;
mod ui;

use std::env;
use std::error::Error;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::domain::{Category, DurationLedger};
use crate::elapsed::split;
use crate::error::TrackError;
use crate::paths::resolve_database_path;
use crate::session::SessionGuard;
use crate::storage::load_ledger;
use crate::ui::{credit_line, progress_rows, run_tracker, weekly_credit};

#[derive(Debug, Parser)]
#[command(name = "ttrack", about = "A lightweight work-hour tracker")]
struct Cli {
	#[arg(long, global = true)]
	database: Option<PathBuf>,
	#[arg(long, global = true)]
	config: Option<PathBuf>,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Track a session until interrupted (default).
	Track {
		/// Skip the terminal display and just wait for Ctrl-C.
		#[arg(long)]
		plain: bool,
	},
	/// Totals for a day, its week and its month.
	Summary {
		#[arg(long)]
		day: Option<String>,
	},
	/// Every ledger entry.
	Show,
	/// The resolved ledger location.
	Path,
}

fn main() {
	init_logging();

	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn init_logging() {
	let filter = env::var("TTRACK_LOG")
		.ok()
		.and_then(|value| EnvFilter::try_new(value).ok())
		.unwrap_or_else(|| EnvFilter::new("warn"));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();
	let config = Config::load(cli.config)?;
	let database_path = resolve_database_path(cli.database, config.database.clone());

	match cli.command.unwrap_or(Command::Track { plain: false }) {
		Command::Track { plain } => track(&database_path, &config, plain)?,
		Command::Summary { day } => print_summary(&database_path, &config, day.as_deref())?,
		Command::Show => print_entries(&database_path)?,
		Command::Path => println!("{}", database_path.display()),
	}

	Ok(())
}

fn track(database_path: &Path, config: &Config, plain: bool) -> Result<(), Box<dyn Error>> {
	interrupt::install();
	let guard = SessionGuard::start(database_path, Utc::now())?;

	println!("Tracking work hours...");
	let display = if plain {
		interrupt::wait(StdDuration::from_millis(config.refresh_millis.max(10)));
		Ok(())
	} else {
		run_tracker(guard.session(), config)
	};

	interrupt::suppress();
	let result = finish_tracking(guard, display, &mut io::stdout().lock());
	interrupt::restore_default();
	result
}

/// Finalizes the session and prints the report, whether or not the display
/// ended cleanly. A storage error wins over a display error.
fn finish_tracking(
	guard: SessionGuard,
	display: Result<(), Box<dyn Error>>,
	out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
	if let Err(err) = &display {
		warn!(error = %err, "tracker display failed, finalizing the session");
	}

	let finished = guard.finish(Utc::now(), true);
	writeln!(out, "Stopping tracking.")?;
	match &finished {
		Ok(report) => {
			debug!(
				started_at = %report.started_at,
				ended_at = %report.ended_at,
				seconds = report.duration.num_seconds(),
				interrupted = report.interrupted,
				"session report"
			);
			writeln!(out, "Time tracked in session: {}.", report.elapsed)?;
		}
		Err(err) => {
			if let Some(elapsed) = err.elapsed {
				writeln!(out, "Time tracked in session: {elapsed}.")?;
			}
		}
	}

	finished?;
	display
}

fn load_existing(database_path: &Path) -> Result<DurationLedger, TrackError> {
	match load_ledger(database_path) {
		Err(TrackError::StorageNotFound(_)) => Ok(DurationLedger::new()),
		other => other,
	}
}

fn parse_day(input: Option<&str>) -> Result<NaiveDate, Box<dyn Error>> {
	if let Some(raw) = input {
		Ok(NaiveDate::parse_from_str(raw, "%Y-%m-%d")?)
	} else {
		Ok(Utc::now().date_naive())
	}
}

fn print_summary(database_path: &Path, config: &Config, day: Option<&str>) -> Result<(), Box<dyn Error>> {
	let day = parse_day(day)?;
	let ledger = load_existing(database_path)?;

	println!("summary for {}", day.format("%Y-%m-%d"));
	for category in Category::ALL {
		println!("\n{category}:");
		for row in progress_rows(&ledger, day, category, &config.targets) {
			println!("{}", row.line());
		}
		println!("{}", credit_line(weekly_credit(&ledger, day, category, &config.targets)));
	}

	Ok(())
}

fn print_entries(database_path: &Path) -> Result<(), Box<dyn Error>> {
	let ledger = load_existing(database_path)?;
	if ledger.is_empty() {
		println!("no tracked time yet");
		return Ok(());
	}

	for (date, category, duration) in ledger.entries() {
		println!("{} | {} | {}", date.format("%Y-%m-%d"), category, split(duration)?);
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use chrono::{Duration, Utc};
	use tempfile::tempdir;

	use crate::domain::Category;
	use crate::session::SessionGuard;
	use crate::storage::load_ledger;

	use super::finish_tracking;

	#[test]
	fn display_failure_still_records_and_reports() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("database.json");
		let started_at = Utc::now() - Duration::minutes(90);
		let guard = SessionGuard::start(&path, started_at).unwrap();

		let mut out = Vec::new();
		let err = finish_tracking(guard, Err("no terminal".into()), &mut out)
			.expect_err("display error should surface");

		assert_eq!(err.to_string(), "no terminal");
		let out = String::from_utf8(out).unwrap();
		assert!(out.contains("Stopping tracking."));
		assert!(out.contains("Time tracked in session: 1 hours 30 minutes."));
		let recorded = load_ledger(&path)
			.unwrap()
			.get(started_at.date_naive(), Category::Work)
			.expect("session should be recorded");
		assert!(recorded >= Duration::minutes(90));
	}

	#[test]
	fn clean_display_reports_elapsed() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("database.json");
		let guard = SessionGuard::start(&path, Utc::now() - Duration::minutes(45)).unwrap();

		let mut out = Vec::new();
		finish_tracking(guard, Ok(()), &mut out).expect("finish should succeed");

		let out = String::from_utf8(out).unwrap();
		assert_eq!(out, "Stopping tracking.\nTime tracked in session: 0 hours 45 minutes.\n");
	}
}
