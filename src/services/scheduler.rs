use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};

/// Source of wall-clock time, injectable so schedules can be tested.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    fn sleep(&self, duration: Duration);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// The first instant after `now` whose UTC time of day is `at`.
pub fn next_trigger(now: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    }
}

/// Runs a job once a day at a fixed UTC time.
///
/// The job runs to completion before the next trigger is computed, so runs
/// never overlap.
pub struct Scheduler<K: Clock> {
    clock: K,
    at: NaiveTime,
}

impl<K: Clock> Scheduler<K> {
    pub fn new(clock: K, at: NaiveTime) -> Self {
        Self { clock, at }
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }

    pub fn run_forever<F: FnMut(DateTime<Utc>)>(&self, job: F) -> ! {
        self.run_loop(None, job);
        unreachable!("scheduler without a run limit returned")
    }

    /// Wait for and run the next `times` triggers.
    pub fn run_times<F: FnMut(DateTime<Utc>)>(&self, times: usize, job: F) {
        self.run_loop(Some(times), job);
    }

    fn run_loop<F: FnMut(DateTime<Utc>)>(&self, limit: Option<usize>, mut job: F) {
        let mut runs = 0;
        while limit.map_or(true, |limit| runs < limit) {
            let now = self.clock.now();
            let next = next_trigger(now, self.at);
            tracing::info!(next = %next, "Waiting for next run");

            self.clock
                .sleep((next - now).to_std().unwrap_or(Duration::ZERO));

            job(self.clock.now());
            runs += 1;
        }
    }
}
