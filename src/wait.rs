// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Bounded waits on callback-driven conditions.

use std::time::Duration;
use std::time::Instant;

use log::debug;
use sync::EventWaitResult;
use sync::ManualResetEvent;

use crate::callbacks::SharedState;
use crate::callbacks::Status;
use crate::error::Error;
use crate::error::Result;

/// Whether a wait is expected to be satisfied or to run into its deadline.
///
/// Both use the same primitive. Only the interpretation of an expired deadline differs: it is a
/// `Timeout` failure when success is expected and the passing outcome when failure is expected.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Expect {
    Success,
    Failure,
}

/// Waits until `check` produces a value or `timeout` expires.
///
/// `check` runs under the status lock, first immediately and then each time `event` is
/// signaled. The event is reset under the same lock before sleeping so that an update made by a
/// callback after the check cannot be lost. A recorded protocol violation ends the wait with an
/// error regardless of `check`.
///
/// Returns `Ok(Some(value))` if the condition was met. An expired deadline is `Err(Timeout)`
/// under `Expect::Success` and `Ok(None)` under `Expect::Failure`; a met condition under
/// `Expect::Failure` is `Err(UnexpectedSuccess)`.
pub fn wait_for<T>(
    shared: &SharedState,
    event: &ManualResetEvent,
    expect: Expect,
    timeout: Duration,
    what: &'static str,
    mut check: impl FnMut(&mut Status) -> Option<Result<T>>,
) -> Result<Option<T>> {
    debug!("waiting for {} ({:?}, {:?})", what, expect, timeout);
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = {
            let mut status = shared.status.lock();
            if let Some(violation) = &status.violation {
                return Err(Error::ProtocolViolation(violation.clone()));
            }
            if let Some(result) = check(&mut *status) {
                let value = result?;
                return match expect {
                    Expect::Success => Ok(Some(value)),
                    Expect::Failure => Err(Error::UnexpectedSuccess(what)),
                };
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!("wait for {} expired", what);
                return match expect {
                    Expect::Success => Err(Error::Timeout(what)),
                    Expect::Failure => Ok(None),
                };
            }
            event.reset();
            remaining
        };
        if event.wait_timeout(remaining) == EventWaitResult::TimedOut {
            debug!("{} not signaled within {:?}", what, remaining);
        }
    }
}
