use std::cell::Cell;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

/// Longest `wait_until` will block before it refuses.
pub const DEFAULT_MAX_WAIT: f64 = 30.0;

/// Slack left before the target so the caller can flip on time.
const WAIT_LEAD: f64 = 0.001;

#[derive(Debug, Error, PartialEq)]
pub enum TimingError {
    #[error("request to wait until {resume_at:.2} is {wait:.2}s from now (more than {max_wait}s)")]
    WaitTooLong {
        resume_at: f64,
        wait: f64,
        max_wait: f64,
    },
}

/// Clock the task runs against. Timestamps are seconds since the timer
/// started.
pub trait Timer {
    fn now(&self) -> f64;
    fn sleep(&self, d: Duration);

    /// Block until `resume_at`. Targets already in the past return at once
    /// with a warning, targets more than `max_wait` away are an error so a
    /// bad onset cannot hang the session.
    fn wait_until(&self, resume_at: f64, max_wait: f64) -> Result<(), TimingError> {
        let now = self.now();
        let ahead = resume_at - now;
        if ahead > max_wait {
            return Err(TimingError::WaitTooLong {
                resume_at,
                wait: ahead,
                max_wait,
            });
        }

        let wait = ahead - WAIT_LEAD;
        if wait < 0.0 {
            if let Some(late) = lateness(resume_at, now) {
                warn!("{late:.3}s late: resume time {resume_at:.2} is before current time {now:.2}");
            }
            return Ok(());
        }
        debug!("waiting {wait:.2}s until {resume_at:.2}");
        self.sleep(Duration::from_secs_f64(wait));
        Ok(())
    }
}

/// How far `now` is past `resume_at`, ignoring misses within the wait lead.
/// A target of exactly now (a clock that was just restarted) is on time.
pub fn lateness(resume_at: f64, now: f64) -> Option<f64> {
    let late = now - resume_at;
    (late > WAIT_LEAD).then_some(late)
}

/// Monotonic timer with an OS-level precise sleep where one is available.
#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    pub start: Instant,
}

impl Timer for HighPrecisionTimer {
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn sleep(&self, d: Duration) {
        #[cfg(target_os = "linux")]
        self.linux_sleep(d);
        #[cfg(not(target_os = "linux"))]
        std::thread::sleep(d);
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC};

        let req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };

        unsafe {
            clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Timer that never blocks: sleeping just moves the clock forward. Used for
/// dry runs and tests.
#[derive(Debug, Default)]
pub struct SimulatedTimer {
    now: Cell<f64>,
}

impl SimulatedTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, secs: f64) {
        self.now.set(self.now.get() + secs);
    }
}

impl Timer for SimulatedTimer {
    fn now(&self) -> f64 {
        self.now.get()
    }

    fn sleep(&self, d: Duration) {
        self.advance(d.as_secs_f64());
    }
}
