use std::sync::Mutex;
use std::time::SystemTime;

use crate::traits::Clock;
use crate::types::Timestamp;

/// Reads the operating system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_system_time(SystemTime::now())
    }
}

/// Clock that only moves when told to. For tests and deterministic embedding.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn set(&self, to: Timestamp) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }

    /// Move forward by whole seconds plus nanoseconds, carrying into seconds.
    pub fn advance(&self, seconds: u64, nanos: u32) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        let total = u64::from(now.nanos()) + u64::from(nanos);
        let carry = total / u64::from(Timestamp::NANOS_PER_SECOND);
        let nanos = (total % u64::from(Timestamp::NANOS_PER_SECOND)) as u32;
        if let Some(next) = Timestamp::new(now.seconds().saturating_add(seconds).saturating_add(carry), nanos) {
            *now = next;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_carries_nanos() {
        let clock = ManualClock::new(Timestamp::new(10, 999_999_999).unwrap());
        clock.advance(0, 1);
        assert_eq!(clock.now(), Timestamp::new(11, 0).unwrap());
        clock.advance(2, 1_500_000_000);
        assert_eq!(clock.now(), Timestamp::new(14, 500_000_000).unwrap());
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now().seconds() > 1_577_836_800);
    }
}
