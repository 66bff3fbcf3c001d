use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Monotonic time plus an absolute-deadline sleep.
pub trait Clock {
    fn now(&self) -> Instant;

    /// Blocks until `deadline`; returns immediately if it has already passed.
    fn sleep_until(&self, deadline: Instant);

    /// Granularity the scheduler can honour a deadline with.
    fn resolution(&self) -> Duration;
}

/// Wall-clock implementation backed by `Instant` and `thread::sleep`.
///
/// The sleep is recomputed against the deadline after every wake, so early
/// returns never shift the schedule.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep_until(&self, deadline: Instant) {
        loop {
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            thread::sleep(deadline - now);
        }
    }

    fn resolution(&self) -> Duration {
        Duration::from_millis(1)
    }
}

/// Manually driven clock for deterministic schedule tests and dry runs.
///
/// Clones share the same timeline, so a fake feed can charge compute time
/// to the clock the emitter sleeps on.
#[derive(Debug, Clone)]
pub struct SimulatedClock {
    now: Arc<Mutex<Instant>>,
    resolution: Duration,
}

impl SimulatedClock {
    pub fn new(start: Instant) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
            resolution: Duration::from_micros(1),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Default for SimulatedClock {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

impl Clock for SimulatedClock {
    fn now(&self) -> Instant {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn sleep_until(&self, deadline: Instant) {
        if let Ok(mut now) = self.now.lock() {
            if *now < deadline {
                *now = deadline;
            }
        }
    }

    fn resolution(&self) -> Duration {
        self.resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_sleep_jumps_to_deadline_only_forward() {
        let start = Instant::now();
        let clock = SimulatedClock::new(start);
        clock.sleep_until(start + Duration::from_millis(50));
        assert_eq!(clock.now(), start + Duration::from_millis(50));

        clock.advance(Duration::from_millis(30));
        clock.sleep_until(start + Duration::from_millis(60));
        assert_eq!(clock.now(), start + Duration::from_millis(80));
    }

    #[test]
    fn monotonic_sleep_reaches_deadline() {
        let clock = MonotonicClock;
        let deadline = clock.now() + Duration::from_millis(5);
        clock.sleep_until(deadline);
        assert!(clock.now() >= deadline);
    }
}
