// ── Retry backoff gate ──
//
// A single nullable "earliest next attempt" timestamp. Checked passively
// at the start of every operation; no timers run in the background.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::CoreError;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. For tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock lock poisoned");
        *now = add_saturating(*now, by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock poisoned")
    }
}

/// Refuses calls until a cooldown has elapsed.
pub struct RetryGate {
    cooldown: Duration,
    next_allowed: Mutex<Option<DateTime<Utc>>>,
    clock: Arc<dyn Clock>,
}

impl RetryGate {
    pub fn new(cooldown: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            cooldown,
            next_allowed: Mutex::new(None),
            clock,
        }
    }

    /// Fail with [`CoreError::BackoffActive`] while the cooldown runs.
    pub fn admit(&self) -> Result<(), CoreError> {
        let Some(until) = self.next_allowed_at() else {
            return Ok(());
        };
        let now = self.clock.now();
        if now < until {
            let retry_after = (until - now).to_std().unwrap_or_default();
            return Err(CoreError::BackoffActive { retry_after, until });
        }
        Ok(())
    }

    /// Close the gate for one cooldown from now. Returns the reopening time.
    pub fn arm(&self) -> DateTime<Utc> {
        let until = add_saturating(self.clock.now(), self.cooldown);
        *self.lock() = Some(until);
        until
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    pub fn next_allowed_at(&self) -> Option<DateTime<Utc>> {
        *self.lock()
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<DateTime<Utc>>> {
        self.next_allowed.lock().expect("retry gate lock poisoned")
    }
}

fn add_saturating(at: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(by)
        .ok()
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
