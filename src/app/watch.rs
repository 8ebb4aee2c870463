//! Polling loop: fetch grades, compare with the saved snapshot, persist and
//! notify on change.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, Timelike};

use crate::app::pipeline::{PortalSettings, fetch_grades};
use crate::config::Config;
use crate::domain::RetrievalResult;
use crate::error::{AppError, EXIT_CREDENTIALS};
use crate::io::snapshot::{GradeSnapshot, load_snapshot, save_table};
use crate::notify::Notifier;
use crate::report::{GradeChange, aggregate_gpa, diff_grades, is_significant};

pub const DEFAULT_CHECK_INTERVAL: u64 = 3600;
pub const DEFAULT_NIGHT_START: u32 = 23;
pub const DEFAULT_NIGHT_END: u32 = 7;

/// Polling cadence, optionally slower at night.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub check_interval: Duration,
    pub night_interval: Option<Duration>,
    pub night_start: u32,
    pub night_end: u32,
}

impl Schedule {
    pub fn from_config(config: &Config) -> Self {
        Self {
            check_interval: Duration::from_secs(config.get_u64("auto.check_interval", DEFAULT_CHECK_INTERVAL).max(1)),
            night_interval: config.get_opt_u64("auto.night_interval").map(|s| Duration::from_secs(s.max(1))),
            night_start: (config.get_u64("auto.night_start", DEFAULT_NIGHT_START as u64) % 24) as u32,
            night_end: (config.get_u64("auto.night_end", DEFAULT_NIGHT_END as u64) % 24) as u32,
        }
    }

    /// Whether `hour` (0-23) falls in the night window; the window may wrap
    /// past midnight.
    pub fn is_night(&self, hour: u32) -> bool {
        match self.night_start.cmp(&self.night_end) {
            std::cmp::Ordering::Less => (self.night_start..self.night_end).contains(&hour),
            std::cmp::Ordering::Greater => hour >= self.night_start || hour < self.night_end,
            std::cmp::Ordering::Equal => false,
        }
    }

    pub fn interval_at(&self, hour: u32) -> Duration {
        match self.night_interval {
            Some(night) if self.is_night(hour) => night,
            _ => self.check_interval,
        }
    }
}

/// What one check found.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub changes: Vec<GradeChange>,
    pub old_gpa: f64,
    pub new_gpa: f64,
    /// Snapshot rewritten (and notification due).
    pub updated: bool,
}

/// Compare `current` with the snapshot at `path`, rewriting it on a
/// significant change. An empty fetch never replaces the snapshot.
pub fn apply_check(path: &Path, current: &RetrievalResult) -> Result<CheckOutcome, AppError> {
    let previous: GradeSnapshot = load_snapshot(path)?;
    if current.courses.is_empty() {
        tracing::warn!(
            saved = previous.courses.len(),
            "grade fetch returned no rows; keeping snapshot"
        );
        return Ok(CheckOutcome {
            changes: Vec::new(),
            old_gpa: previous.gpa,
            new_gpa: previous.gpa,
            updated: false,
        });
    }
    let new_gpa = aggregate_gpa(&current.courses);
    let changes = diff_grades(&previous.courses, &current.courses);
    let updated = is_significant(&changes, previous.gpa, new_gpa);

    if updated {
        tracing::info!(
            changes = changes.len(),
            old_gpa = previous.gpa,
            new_gpa,
            "grades changed"
        );
        save_table(path, &current.headers, &current.courses)?;
    } else {
        tracing::info!(courses = current.count, gpa = new_gpa, "no grade changes");
    }

    Ok(CheckOutcome {
        changes,
        old_gpa: previous.gpa,
        new_gpa,
        updated,
    })
}

/// The long-running monitor.
pub struct Watcher {
    settings: PortalSettings,
    snapshot_path: PathBuf,
    notifier: Option<Notifier>,
    schedule: Schedule,
}

impl Watcher {
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Ok(Self {
            settings: PortalSettings::from_config(config)?,
            snapshot_path: config.grades_path(),
            notifier: Notifier::from_config(config),
            schedule: Schedule::from_config(config),
        })
    }

    /// One full check: log in, fetch, compare, persist, notify.
    pub fn check_once(&self) -> Result<CheckOutcome, AppError> {
        tracing::info!("checking grades");
        let current = fetch_grades(&self.settings)?;
        let outcome = apply_check(&self.snapshot_path, &current)?;

        if outcome.updated {
            println!(
                "Grades updated: {} change(s), GPA {:.2} -> {:.2}",
                outcome.changes.len(),
                outcome.old_gpa,
                outcome.new_gpa
            );
            if let Some(notifier) = &self.notifier {
                let email = Notifier::compose(
                    &outcome.changes,
                    outcome.old_gpa,
                    outcome.new_gpa,
                    Local::now().naive_local(),
                );
                // Delivery problems never abort the monitor.
                if let Err(e) = notifier.send(&email) {
                    tracing::error!("notification failed: {e}");
                }
            }
        }
        Ok(outcome)
    }

    /// Poll until interrupted. Rejected credentials end the loop; anything
    /// else is logged and retried at the next interval.
    pub fn run(&self) -> Result<(), AppError> {
        tracing::info!(
            interval_secs = self.schedule.check_interval.as_secs(),
            night_interval_secs = self.schedule.night_interval.map(|d| d.as_secs()),
            "grade monitor started"
        );
        loop {
            match self.check_once() {
                Ok(_) => {}
                Err(e) if e.exit_code() == EXIT_CREDENTIALS => {
                    tracing::error!("stopping monitor: {e}");
                    return Err(e);
                }
                Err(e) => tracing::error!("check failed: {e}"),
            }

            let wait = self.schedule.interval_at(Local::now().hour());
            tracing::info!(wait_secs = wait.as_secs(), "next check scheduled");
            std::thread::sleep(wait);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Course, fields};
    use serde_json::json;

    fn result(point: f64) -> RetrievalResult {
        let headers = vec![
            fields::TERM.to_string(),
            fields::COURSE_NAME.to_string(),
            fields::CREDIT.to_string(),
            fields::GRADE_POINT.to_string(),
        ];
        let courses = vec![
            Course::new()
                .with(fields::TERM, "2023-2024 1")
                .with(fields::COURSE_NAME, "高数")
                .with(fields::CREDIT, 5.0)
                .with(fields::GRADE_POINT, point),
        ];
        RetrievalResult::new(headers, courses)
    }

    #[test]
    fn first_check_saves_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grades.csv");

        let outcome = apply_check(&path, &result(4.0)).unwrap();
        assert!(outcome.updated);
        assert_eq!(outcome.changes.len(), 1);
        assert_eq!(outcome.old_gpa, 0.0);
        assert_eq!(outcome.new_gpa, 4.0);
        assert!(path.exists());
    }

    #[test]
    fn unchanged_grades_do_not_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grades.csv");
        apply_check(&path, &result(4.0)).unwrap();

        let outcome = apply_check(&path, &result(4.0)).unwrap();
        assert!(!outcome.updated);
        assert!(outcome.changes.is_empty());
    }

    #[test]
    fn changed_grade_point_is_reported_and_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grades.csv");
        apply_check(&path, &result(3.0)).unwrap();

        let outcome = apply_check(&path, &result(4.0)).unwrap();
        assert!(outcome.updated);
        assert!(matches!(outcome.changes[0], GradeChange::Updated { .. }));
        assert_eq!(load_snapshot(&path).unwrap().gpa, 4.0);
    }

    #[test]
    fn empty_fetch_keeps_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grades.csv");
        apply_check(&path, &result(4.0)).unwrap();

        let empty = RetrievalResult::new(result(4.0).headers, Vec::new());
        let outcome = apply_check(&path, &empty).unwrap();
        assert!(!outcome.updated);
        assert!(outcome.changes.is_empty());
        assert_eq!(outcome.new_gpa, 4.0);

        let saved = load_snapshot(&path).unwrap();
        assert_eq!(saved.courses.len(), 1);
        assert_eq!(saved.gpa, 4.0);

        let outcome = apply_check(&path, &result(4.0)).unwrap();
        assert!(!outcome.updated);
        assert!(outcome.changes.is_empty());
    }

    #[test]
    fn night_window_wraps_midnight() {
        let schedule = Schedule::from_config(&Config::from_value(json!({
            "auto": { "check_interval": 600, "night_interval": 7200 }
        })));
        assert!(schedule.is_night(23));
        assert!(schedule.is_night(3));
        assert!(!schedule.is_night(7));
        assert_eq!(schedule.interval_at(2), Duration::from_secs(7200));
        assert_eq!(schedule.interval_at(12), Duration::from_secs(600));
    }

    #[test]
    fn no_night_interval_keeps_day_cadence() {
        let schedule = Schedule::from_config(&Config::default());
        assert_eq!(schedule.interval_at(2), Duration::from_secs(DEFAULT_CHECK_INTERVAL));
    }

    #[test]
    fn daytime_window_does_not_wrap() {
        let schedule = Schedule {
            check_interval: Duration::from_secs(60),
            night_interval: Some(Duration::from_secs(120)),
            night_start: 1,
            night_end: 5,
        };
        assert!(schedule.is_night(1));
        assert!(!schedule.is_night(5));
        assert!(!schedule.is_night(23));
    }
}
