// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::fmt;
use std::fmt::Debug;
use std::time::Duration;
use std::time::Instant;

use crate::Condvar;
use crate::Mutex;

/// Outcome of a bounded wait on a [`ManualResetEvent`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventWaitResult {
    /// The event was signaled before the deadline.
    Signaled,
    /// The deadline passed with the event still clear.
    TimedOut,
}

/// An event that stays signaled until it is explicitly reset.
///
/// Any number of threads may signal or wait. Waiting does not consume the signal, so a waiter that
/// arrives after `signal()` returns immediately. Callers that want to observe only future signals
/// must `reset()` the event before triggering the operation they are about to wait for.
#[derive(Default)]
pub struct ManualResetEvent {
    signaled: Mutex<bool>,
    condvar: Condvar,
}

impl ManualResetEvent {
    /// Creates a new event in the clear state.
    pub fn new() -> ManualResetEvent {
        ManualResetEvent::default()
    }

    /// Sets the event and wakes every waiter.
    pub fn signal(&self) {
        *self.signaled.lock() = true;
        self.condvar.notify_all();
    }

    /// Clears the event.
    pub fn reset(&self) {
        *self.signaled.lock() = false;
    }

    /// Returns true if the event is currently set.
    pub fn is_signaled(&self) -> bool {
        *self.signaled.lock()
    }

    /// Blocks until the event is set. Conformance code always uses `wait_timeout`; this exists for
    /// helper threads that are guaranteed a signal.
    pub fn wait(&self) {
        let guard = self.signaled.lock();
        let _guard = self.condvar.wait_while(guard, |signaled| !*signaled);
    }

    /// Blocks until the event is set or `timeout` elapses.
    ///
    /// The deadline is computed once from a monotonic clock, so spurious wakeups never extend the
    /// total wait.
    pub fn wait_timeout(&self, timeout: Duration) -> EventWaitResult {
        let deadline = Instant::now().checked_add(timeout);
        let mut signaled = self.signaled.lock();
        while !*signaled {
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => Duration::MAX,
            };
            if remaining.is_zero() {
                return EventWaitResult::TimedOut;
            }
            signaled = self.condvar.wait_timeout(signaled, remaining).0;
        }
        EventWaitResult::Signaled
    }
}

impl Debug for ManualResetEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ManualResetEvent")
            .field("signaled", &self.is_signaled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn starts_clear_and_times_out() {
        let event = ManualResetEvent::new();
        assert!(!event.is_signaled());
        assert_eq!(
            event.wait_timeout(Duration::from_millis(10)),
            EventWaitResult::TimedOut
        );
    }

    #[test]
    fn stays_signaled_until_reset() {
        let event = ManualResetEvent::new();
        event.signal();
        assert_eq!(event.wait_timeout(Duration::ZERO), EventWaitResult::Signaled);
        assert_eq!(event.wait_timeout(Duration::ZERO), EventWaitResult::Signaled);
        event.reset();
        assert_eq!(event.wait_timeout(Duration::ZERO), EventWaitResult::TimedOut);
    }

    #[test]
    fn wakes_waiter_on_other_thread() {
        let event = Arc::new(ManualResetEvent::new());
        let signaler = Arc::clone(&event);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            signaler.signal();
        });
        assert_eq!(
            event.wait_timeout(Duration::from_secs(5)),
            EventWaitResult::Signaled
        );
        handle.join().unwrap();
    }

    #[test]
    fn unbounded_wait_returns_after_signal() {
        let event = Arc::new(ManualResetEvent::new());
        let signaler = Arc::clone(&event);
        let handle = thread::spawn(move || signaler.signal());
        event.wait();
        handle.join().unwrap();
    }
}
