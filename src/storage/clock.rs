//! Time source for store timestamps

use chrono::{DateTime, Utc};

/// Supplies the current time for `created`/`updated`
pub trait Clock: Send {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
