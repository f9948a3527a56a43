use chrono::{DateTime, Duration, Utc};

use crate::models::ScheduleConfig;

/// Collapses a burst of triggers into one firing after a quiet window.
///
/// Each [`notify`](Self::notify) restarts the window; [`poll`](Self::poll)
/// returns `true` once, the first time it is called at least `window` after
/// the last trigger.
#[derive(Debug, Clone)]
pub struct Coalescer {
    window: Duration,
    last_trigger: Option<DateTime<Utc>>,
}

impl Coalescer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_trigger: None,
        }
    }

    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self::new(config.coalesce_window())
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn notify(&mut self, now: DateTime<Utc>) {
        self.last_trigger = Some(now);
    }

    pub fn poll(&mut self, now: DateTime<Utc>) -> bool {
        match self.last_trigger {
            Some(at) if now - at >= self.window => {
                self.last_trigger = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.last_trigger.is_some()
    }

    /// When a pending trigger will be due.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.last_trigger.map(|at| at + self.window)
    }
}
