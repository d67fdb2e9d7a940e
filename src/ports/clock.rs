//! Wall clock port, in epoch seconds.

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// UTC system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}
