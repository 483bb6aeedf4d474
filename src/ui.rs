use std::error::Error;
use std::io;
use std::time::{Duration as StdDuration, Instant};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, ExecutableCommand};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::{Frame, Terminal};
use tracing::warn;

use crate::config::{Config, Targets};
use crate::domain::{Category, DurationLedger, month_bounds, week_bounds};
use crate::elapsed::{ElapsedTime, format_hours, format_signed_hours};
use crate::interrupt;
use crate::session::Session;

const ACCENT_COLOR: Color = Color::Yellow;
const MUTED_COLOR: Color = Color::DarkGray;
const WORKDAYS_PER_WEEK: u32 = 5;

/// Shows the running session until a stop is requested, either by key or by
/// signal. Never finalizes the session itself.
pub fn run_tracker(session: &Session, config: &Config) -> Result<(), Box<dyn Error>> {
	enable_raw_mode()?;
	let mut stdout = io::stdout();
	stdout.execute(EnterAlternateScreen)?;
	let backend = CrosstermBackend::new(stdout);
	let mut terminal = Terminal::new(backend)?;

	let result = run_event_loop(&mut terminal, session, config);

	disable_raw_mode()?;
	execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
	terminal.show_cursor()?;

	result
}

fn run_event_loop(
	terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
	session: &Session,
	config: &Config,
) -> Result<(), Box<dyn Error>> {
	let refresh = StdDuration::from_millis(config.refresh_millis.max(10));
	let checkpoint_every = (config.checkpoint_secs > 0).then(|| StdDuration::from_secs(config.checkpoint_secs));
	let mut last_checkpoint = Instant::now();

	while !interrupt::is_requested() {
		let now = Utc::now();
		let view = TrackerView::build(session, &config.targets, now)?;
		terminal.draw(|frame| draw_tracker(frame, &view))?;

		if let Some(every) = checkpoint_every {
			if last_checkpoint.elapsed() >= every {
				if let Err(err) = session.checkpoint(now) {
					warn!(error = %err, "checkpoint failed");
				}
				last_checkpoint = Instant::now();
			}
		}

		if event::poll(refresh)? {
			if let CEvent::Key(key) = event::read()? {
				if key.kind != KeyEventKind::Press {
					continue;
				}

				let ctrl_c = key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
				if ctrl_c || matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
					interrupt::request();
				}
			}
		}
	}

	Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
	pub label: &'static str,
	pub tracked: Duration,
	pub target_hours: f64,
}

impl Progress {
	pub fn line(&self) -> String {
		format!("{}/{} hours {}", format_hours(self.tracked), self.target_hours, self.label)
	}
}

#[derive(Debug, Clone, PartialEq)]
struct TrackerView {
	started_at: DateTime<Utc>,
	elapsed: ElapsedTime,
	progress: Vec<Progress>,
	credit: Duration,
}

impl TrackerView {
	fn build(session: &Session, targets: &Targets, now: DateTime<Utc>) -> Result<Self, Box<dyn Error>> {
		let started_at = session
			.started_at()
			.ok_or("tracker shown for a session that is not running")?;
		let elapsed = session.elapsed(now)?;
		let ledger = session.projected(now)?;
		let today = now.date_naive();

		Ok(Self {
			started_at,
			elapsed,
			progress: progress_rows(&ledger, today, Category::Work, targets),
			credit: weekly_credit(&ledger, today, Category::Work, targets),
		})
	}
}

/// Tracked time against the targets for the day, week and month of `today`.
pub fn progress_rows(
	ledger: &DurationLedger,
	today: NaiveDate,
	category: Category,
	targets: &Targets,
) -> Vec<Progress> {
	let (week_start, week_end) = week_bounds(today);
	let (month_start, month_end) = month_bounds(today);
	vec![
		Progress {
			label: "today",
			tracked: ledger.total_for_day(today, category),
			target_hours: targets.daily_hours,
		},
		Progress {
			label: "this week",
			tracked: ledger.total_between(week_start, week_end, category),
			target_hours: targets.weekly_hours,
		},
		Progress {
			label: "this month",
			tracked: ledger.total_between(month_start, month_end, category),
			target_hours: targets.monthly_hours,
		},
	]
}

/// Time tracked this week up to `today`, minus the part of the weekly target
/// due by then. Monday to Friday each owe a fifth of the target.
pub fn weekly_credit(
	ledger: &DurationLedger,
	today: NaiveDate,
	category: Category,
	targets: &Targets,
) -> Duration {
	let (week_start, _) = week_bounds(today);
	let tracked = ledger.total_between(week_start, today, category);
	let workdays = (today.weekday().num_days_from_monday() + 1).min(WORKDAYS_PER_WEEK);
	let due_seconds = targets.weekly_hours * 3600.0 * f64::from(workdays) / f64::from(WORKDAYS_PER_WEEK);
	tracked - Duration::seconds(due_seconds.round() as i64)
}

pub fn credit_line(credit: Duration) -> String {
	format!("Credit: {} hours", format_signed_hours(credit))
}

fn draw_tracker(frame: &mut Frame, view: &TrackerView) {
	let layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Min(8), Constraint::Length(3)])
		.split(frame.area());

	render_session_panel(frame, layout[0], view);
	render_footer(frame, layout[1]);
}

fn render_session_panel(frame: &mut Frame, area: Rect, view: &TrackerView) {
	let mut lines = vec![
		Line::from(Span::styled(
			"Tracking work hours...",
			Style::default().fg(ACCENT_COLOR).add_modifier(Modifier::BOLD),
		)),
		Line::from(format!("started {}", view.started_at.format("%Y-%m-%d %H:%M UTC"))),
		Line::from(format!("session: {}", view.elapsed)),
		Line::from(""),
	];
	for row in &view.progress {
		lines.push(Line::from(row.line()));
	}
	lines.push(Line::from(credit_line(view.credit)));

	let block = Block::default()
		.borders(Borders::ALL)
		.border_style(Style::default().fg(ACCENT_COLOR))
		.title(" ttrack ");
	frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_footer(frame: &mut Frame, area: Rect) {
	let block = Block::default()
		.borders(Borders::ALL)
		.border_style(Style::default().fg(MUTED_COLOR));
	let help = Paragraph::new("q / Esc / Ctrl-C: stop tracking").block(block);
	frame.render_widget(help, area);
}

#[cfg(test)]
mod tests {
	use chrono::{Duration, NaiveDate};

	use crate::config::Targets;
	use crate::domain::{Category, DurationLedger};

	use super::{credit_line, progress_rows, weekly_credit};

	#[test]
	fn progress_rows_cover_day_week_and_month() {
		let mut ledger = DurationLedger::new();
		let today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
		ledger.accumulate(today, Category::Work, Duration::hours(2));
		ledger.accumulate(NaiveDate::from_ymd_opt(2024, 5, 13).unwrap(), Category::Work, Duration::hours(4));
		ledger.accumulate(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), Category::Work, Duration::hours(8));

		let rows = progress_rows(&ledger, today, Category::Work, &Targets::default());
		let lines = rows.iter().map(|row| row.line()).collect::<Vec<_>>();
		assert_eq!(
			lines,
			vec![
				"2.0/8 hours today".to_string(),
				"6.0/40 hours this week".to_string(),
				"14.0/160 hours this month".to_string(),
			]
		);

		let targets = Targets::default();
		assert_eq!(
			credit_line(weekly_credit(&ledger, today, Category::Work, &targets)),
			"Credit: -18.0 hours"
		);

		ledger.accumulate(NaiveDate::from_ymd_opt(2024, 5, 14).unwrap(), Category::Work, Duration::hours(36));
		let saturday = NaiveDate::from_ymd_opt(2024, 5, 18).unwrap();
		assert_eq!(
			credit_line(weekly_credit(&ledger, saturday, Category::Work, &targets)),
			"Credit: +2.0 hours"
		);
	}
}
