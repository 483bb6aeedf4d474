use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};

use crate::domain::{Category, DurationLedger};
use crate::elapsed::{ElapsedTime, split};
use crate::error::{FinishError, TrackError};
use crate::storage::{load_or_create_ledger, save_ledger};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    Running { started_at: DateTime<Utc> },
    Finalized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration: Duration,
    pub elapsed: ElapsedTime,
    pub interrupted: bool,
}

/// One tracking session against the ledger file at `path`.
///
/// The in-memory ledger is only changed by [`Session::finish`], which runs at
/// most once.
#[derive(Debug)]
pub struct Session {
    path: PathBuf,
    category: Category,
    ledger: DurationLedger,
    state: SessionState,
}

impl Session {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            category: Category::Work,
            ledger: DurationLedger::new(),
            state: SessionState::NotStarted,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(test)]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[cfg(test)]
    pub fn ledger(&self) -> &DurationLedger {
        &self.ledger
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, SessionState::Running { .. })
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            SessionState::Running { started_at } => Some(started_at),
            _ => None,
        }
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), TrackError> {
        if self.state != SessionState::NotStarted {
            return Err(TrackError::InvalidSession(
                "session has already been started".to_string(),
            ));
        }

        self.ledger = load_or_create_ledger(&self.path)?;
        self.state = SessionState::Running { started_at: now };
        info!(path = %self.path.display(), started_at = %now, "session started");
        Ok(())
    }

    pub fn elapsed(&self, now: DateTime<Utc>) -> Result<ElapsedTime, TrackError> {
        split(self.running_duration(now)?)
    }

    /// The ledger as it would look if the session finished at `now`.
    pub fn projected(&self, now: DateTime<Utc>) -> Result<DurationLedger, TrackError> {
        let started_at = self.running_since()?;
        let duration = checked_duration(started_at, now)?;
        let mut ledger = self.ledger.clone();
        ledger.accumulate(started_at.date_naive(), self.category, duration);
        Ok(ledger)
    }

    /// Saves the projected ledger so an abrupt kill loses at most the time
    /// since the last checkpoint.
    pub fn checkpoint(&self, now: DateTime<Utc>) -> Result<(), TrackError> {
        let ledger = self.projected(now)?;
        save_ledger(&self.path, &ledger)?;
        info!(path = %self.path.display(), at = %now, "checkpoint saved");
        Ok(())
    }

    /// Merges the session into the ledger under its start date and saves it.
    ///
    /// The session is finalized before anything can fail, so a second call
    /// is always rejected with `InvalidSession` and never accumulates again.
    pub fn finish(
        &mut self,
        now: DateTime<Utc>,
        interrupted: bool,
    ) -> Result<SessionReport, FinishError> {
        let started_at = self.running_since()?;
        self.state = SessionState::Finalized;

        let duration = checked_duration(started_at, now)?;
        let elapsed = split(duration)?;

        self.ledger
            .accumulate(started_at.date_naive(), self.category, duration);
        if let Err(source) = save_ledger(&self.path, &self.ledger) {
            return Err(FinishError {
                elapsed: Some(elapsed),
                source,
            });
        }

        info!(
            path = %self.path.display(),
            date = %started_at.date_naive(),
            %elapsed,
            interrupted,
            "session finalized"
        );
        Ok(SessionReport {
            started_at,
            ended_at: now,
            duration,
            elapsed,
            interrupted,
        })
    }

    fn running_since(&self) -> Result<DateTime<Utc>, TrackError> {
        match self.state {
            SessionState::Running { started_at } => Ok(started_at),
            SessionState::NotStarted => Err(TrackError::InvalidSession(
                "session has not been started".to_string(),
            )),
            SessionState::Finalized => Err(TrackError::InvalidSession(
                "session has already been finalized".to_string(),
            )),
        }
    }

    fn running_duration(&self, now: DateTime<Utc>) -> Result<Duration, TrackError> {
        checked_duration(self.running_since()?, now)
    }
}

fn checked_duration(started_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<Duration, TrackError> {
    if now.date_naive() < started_at.date_naive() {
        return Err(TrackError::InvalidSession(format!(
            "end date {} precedes start date {}; was the system clock turned back?",
            now.date_naive(),
            started_at.date_naive()
        )));
    }
    if now < started_at {
        return Err(TrackError::InvalidSession(format!(
            "end time {now} precedes start time {started_at}"
        )));
    }
    Ok(now - started_at)
}

/// Owns a running [`Session`] and finalizes it when dropped, so an early
/// return or a panic still records the tracked time.
#[derive(Debug)]
pub struct SessionGuard {
    session: Session,
}

impl SessionGuard {
    pub fn start(path: impl Into<PathBuf>, now: DateTime<Utc>) -> Result<Self, TrackError> {
        let mut session = Session::new(path);
        session.start(now)?;
        Ok(Self { session })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn finish(
        mut self,
        now: DateTime<Utc>,
        interrupted: bool,
    ) -> Result<SessionReport, FinishError> {
        self.session.finish(now, interrupted)
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if !self.session.is_running() {
            return;
        }

        warn!(
            path = %self.session.path().display(),
            "session ended without an explicit finish, finalizing"
        );
        match self.session.finish(Utc::now(), true) {
            Ok(report) => info!(elapsed = %report.elapsed, "session recorded on drop"),
            Err(err) => error!(
                error = %err.source,
                elapsed = ?err.elapsed,
                "failed to record session on drop"
            ),
        }
    }
}
