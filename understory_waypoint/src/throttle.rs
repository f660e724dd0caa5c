// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Leading + trailing throttle driven by host timestamps.
//!
//! [`ThrottleGate`] never reads a clock and never schedules anything itself.
//! The host passes a millisecond timestamp into every call and is told what
//! to run:
//!
//! - [`ThrottleGate::call`] returns the arguments back when the gate is open
//!   (leading edge). Otherwise it parks them as the pending trailing call,
//!   replacing whatever was parked before.
//! - [`ThrottleGate::deadline`] reports when the parked call becomes
//!   runnable, so the host can arm a timer.
//! - [`ThrottleGate::poll`] hands the parked call out once that deadline has
//!   passed.
//!
//! At most one execution happens per window, and the newest arguments of a
//! burst always run eventually as long as the host polls at the deadline.
//!
//! ```
//! use understory_waypoint::ThrottleGate;
//!
//! let mut gate = ThrottleGate::new(200);
//!
//! // An idle gate runs immediately.
//! assert_eq!(gate.call(1_000, 1), Some(1));
//! // Calls inside the window are coalesced; the newest wins.
//! assert_eq!(gate.call(1_050, 2), None);
//! assert_eq!(gate.call(1_100, 3), None);
//! assert_eq!(gate.deadline(), Some(1_200));
//!
//! assert_eq!(gate.poll(1_150), None);
//! assert_eq!(gate.poll(1_200), Some(3));
//! assert_eq!(gate.deadline(), None);
//! ```

/// Rate limiter that runs at most once per `interval` milliseconds.
#[derive(Clone, Debug)]
pub struct ThrottleGate<A> {
    interval: u64,
    last_run: Option<u64>,
    pending: Option<A>,
}

impl<A> ThrottleGate<A> {
    /// Creates an idle gate with the given window length in milliseconds.
    #[must_use]
    pub const fn new(interval: u64) -> Self {
        Self {
            interval,
            last_run: None,
            pending: None,
        }
    }

    /// Returns the window length in milliseconds.
    #[must_use]
    pub const fn interval(&self) -> u64 {
        self.interval
    }

    /// Offers a call to the gate.
    ///
    /// Returns `Some(args)` when the caller should run now. Otherwise the
    /// arguments are parked as the trailing call and `None` is returned.
    ///
    /// An overdue trailing call that was never polled is superseded by the
    /// newer arguments rather than run twice.
    pub fn call(&mut self, now: u64, args: A) -> Option<A> {
        if self.is_open(now) {
            self.pending = None;
            self.last_run = Some(now);
            Some(args)
        } else {
            self.pending = Some(args);
            None
        }
    }

    /// Returns the parked trailing call once its window has elapsed.
    pub fn poll(&mut self, now: u64) -> Option<A> {
        if self.pending.is_some() && self.is_open(now) {
            self.last_run = Some(now);
            self.pending.take()
        } else {
            None
        }
    }

    /// Timestamp at which the parked trailing call becomes runnable.
    ///
    /// `None` when nothing is parked.
    #[must_use]
    pub fn deadline(&self) -> Option<u64> {
        self.pending.as_ref()?;
        Some(
            self.last_run
                .map_or(0, |last| last.saturating_add(self.interval)),
        )
    }

    /// Returns `true` if a trailing call is parked.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drops the parked trailing call, returning it.
    pub fn cancel(&mut self) -> Option<A> {
        self.pending.take()
    }

    /// Forgets the last run and any parked call; the next call runs immediately.
    pub fn reset(&mut self) {
        self.last_run = None;
        self.pending = None;
    }

    fn is_open(&self, now: u64) -> bool {
        self.last_run
            .is_none_or(|last| now.saturating_sub(last) >= self.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::ThrottleGate;

    #[test]
    fn lone_call_on_idle_gate_runs() {
        let mut gate = ThrottleGate::new(200);
        assert_eq!(gate.call(0, "a"), Some("a"));
        assert!(!gate.is_pending());

        // A call after a quiet period is again a lone call.
        assert_eq!(gate.call(5_000, "b"), Some("b"));
        assert!(!gate.is_pending());
    }

    #[test]
    fn burst_within_one_window_runs_once_then_trails() {
        let mut gate = ThrottleGate::new(100);
        let mut runs = 0;
        for t in 0..50_u64 {
            if gate.call(t, t).is_some() {
                runs += 1;
            }
        }
        assert_eq!(runs, 1, "only the leading call runs inside the window");
        assert_eq!(gate.deadline(), Some(100));
        assert_eq!(gate.poll(99), None);
        assert_eq!(gate.poll(100), Some(49), "trailing call carries the newest args");
        assert_eq!(gate.poll(500), None);
    }

    #[test]
    fn trailing_run_starts_a_new_window() {
        let mut gate = ThrottleGate::new(100);
        assert_eq!(gate.call(0, 1), Some(1));
        assert_eq!(gate.call(10, 2), None);
        assert_eq!(gate.poll(100), Some(2));
        // The trailing run at 100 closes the gate until 200.
        assert_eq!(gate.call(150, 3), None);
        assert_eq!(gate.deadline(), Some(200));
    }

    #[test]
    fn overdue_pending_call_is_superseded() {
        let mut gate = ThrottleGate::new(100);
        assert_eq!(gate.call(0, 1), Some(1));
        assert_eq!(gate.call(50, 2), None);
        // The host never polled; the next call runs with the newest args.
        assert_eq!(gate.call(400, 3), Some(3));
        assert!(!gate.is_pending());
        assert_eq!(gate.poll(1_000), None);
    }

    #[test]
    fn zero_interval_always_runs() {
        let mut gate = ThrottleGate::new(0);
        assert_eq!(gate.call(7, 1), Some(1));
        assert_eq!(gate.call(7, 2), Some(2));
        assert_eq!(gate.deadline(), None);
    }

    #[test]
    fn cancel_and_reset() {
        let mut gate = ThrottleGate::new(100);
        assert_eq!(gate.call(0, 1), Some(1));
        assert_eq!(gate.call(10, 2), None);
        assert_eq!(gate.cancel(), Some(2));
        assert_eq!(gate.poll(200), None);

        assert_eq!(gate.call(210, 3), Some(3));
        gate.reset();
        assert_eq!(gate.call(211, 4), Some(4));
    }
}
