//! Debounced trigger for re-running the pipeline when the host redraws.
//!
//! Host change notifications move the trigger from `Idle` to `Pending`. Once
//! no notification has arrived for the quiet period, `poll` hands out a
//! single run. Notifications during a run queue exactly one follow-up.
//! Times are passed in by the caller so the machine stays deterministic.

use std::time::{Duration, Instant};

use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerState {
    Idle,
    Pending { since: Instant },
    Processing { rerun: bool },
}

#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    state: TriggerState,
    last_fingerprint: Option<String>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            state: TriggerState::Idle,
            last_fingerprint: None,
        }
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    pub fn notify(&mut self, now: Instant) {
        self.state = match self.state {
            TriggerState::Idle | TriggerState::Pending { .. } => {
                TriggerState::Pending { since: now }
            }
            TriggerState::Processing { .. } => TriggerState::Processing { rerun: true },
        };
    }

    /// Returns `true` when the caller should run the pipeline now.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            TriggerState::Pending { since }
                if now.saturating_duration_since(since) >= self.quiet =>
            {
                self.state = TriggerState::Processing { rerun: false };
                true
            }
            _ => false,
        }
    }

    /// Ends a run started by [`Debouncer::poll`] and reports whether its
    /// output differs from the previous run's.
    pub fn finish(&mut self, now: Instant, fingerprint: &str) -> bool {
        if let TriggerState::Processing { rerun } = self.state {
            self.state = if rerun {
                TriggerState::Pending { since: now }
            } else {
                TriggerState::Idle
            };
        }
        let changed = self.last_fingerprint.as_deref() != Some(fingerprint);
        if changed {
            self.last_fingerprint = Some(fingerprint.to_string());
        } else {
            debug!("pipeline output unchanged; skipping repaint");
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIET: Duration = Duration::from_millis(200);

    #[test]
    fn bursts_collapse_into_one_run() {
        let t0 = Instant::now();
        let mut trigger = Debouncer::new(QUIET);
        assert!(!trigger.poll(t0));

        trigger.notify(t0);
        trigger.notify(t0 + Duration::from_millis(150));
        assert!(!trigger.poll(t0 + Duration::from_millis(250)));
        assert!(trigger.poll(t0 + Duration::from_millis(350)));
        assert_eq!(trigger.state(), TriggerState::Processing { rerun: false });
        assert!(!trigger.poll(t0 + Duration::from_millis(400)));

        assert!(trigger.finish(t0 + Duration::from_millis(410), "abc"));
        assert_eq!(trigger.state(), TriggerState::Idle);
    }

    #[test]
    fn change_during_run_queues_followup() {
        let t0 = Instant::now();
        let mut trigger = Debouncer::new(QUIET);
        trigger.notify(t0);
        assert!(trigger.poll(t0 + QUIET));
        trigger.notify(t0 + QUIET);
        trigger.notify(t0 + QUIET);
        let done = t0 + QUIET + Duration::from_millis(5);
        trigger.finish(done, "abc");
        assert_eq!(trigger.state(), TriggerState::Pending { since: done });
        assert!(trigger.poll(done + QUIET));
    }

    #[test]
    fn identical_output_is_not_a_change() {
        let t0 = Instant::now();
        let mut trigger = Debouncer::new(QUIET);
        for (fingerprint, expected) in [("a", true), ("a", false), ("b", true)] {
            trigger.notify(t0);
            assert!(trigger.poll(t0 + QUIET));
            assert_eq!(trigger.finish(t0 + QUIET, fingerprint), expected);
        }
    }
}
