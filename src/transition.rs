// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Driving the component through its lifecycle states.

use log::debug;
use log::info;
use log::warn;
use omx::Command;
use omx::Direction;
use omx::OmxError;
use omx::PortTarget;
use omx::State;

use crate::allocation::allocate_all_buffers;
use crate::allocation::deinit_buffers;
use crate::context::TestContext;
use crate::error::CallResult;
use crate::error::Error;
use crate::error::Result;
use crate::error::Violation;
use crate::wait::wait_for;
use crate::wait::Expect;

/// Name of the command that moves a component to `state`, for messages.
pub fn state_command(state: State) -> &'static str {
    match state {
        State::Invalid => "StateSet(Invalid)",
        State::Loaded => "StateSet(Loaded)",
        State::Idle => "StateSet(Idle)",
        State::Executing => "StateSet(Executing)",
        State::Pause => "StateSet(Pause)",
        State::WaitForResources => "StateSet(WaitForResources)",
    }
}

/// Clears what the callbacks recorded about earlier state changes and sends `StateSet(target)`.
pub fn send_state(ctx: &TestContext, target: State) -> Result<()> {
    {
        let mut status = ctx.shared.status.lock();
        status.state = None;
        status.error = None;
        ctx.shared.events.state_changed.reset();
    }
    debug!("{}: {}", ctx.name(), state_command(target));
    ctx.component
        .send_command(Command::StateSet(target))
        .call("SendCommand(StateSet)")
}

/// Waits for the completion of a state change to `target` sent earlier.
///
/// Returns whether the component got there: always `true` under `Expect::Success`, since not
/// getting there is an error, and `false` under `Expect::Failure` when the deadline passed as
/// it should. An error event during the wait ends it; `InsufficientResources` is reported as
/// [`Error::InsufficientResources`].
pub fn wait_state(ctx: &TestContext, target: State, expect: Expect) -> Result<bool> {
    let what = state_command(target);
    let reached = wait_for(
        &ctx.shared,
        &ctx.shared.events.state_changed,
        expect,
        ctx.timeout(expect),
        what,
        |status| {
            if let Some(error) = status.error {
                return Some(Err(match error {
                    OmxError::InsufficientResources => Error::InsufficientResources,
                    error => Error::ComponentCall { call: what, error },
                }));
            }
            match status.state {
                Some(state) if state == target => Some(Ok(())),
                Some(actual) => Some(Err(Error::StateMismatch {
                    expected: target,
                    actual,
                })),
                None => None,
            }
        },
    )?
    .is_some();
    if reached {
        let actual = ctx.state()?;
        if actual != target {
            return Err(Error::StateMismatch {
                expected: target,
                actual,
            });
        }
    }
    Ok(reached)
}

/// Moves the component to `target` and waits for it to get there.
///
/// Leaving Loaded for Idle populates every port after the command is sent, since the component
/// may only complete the transition once its ports are populated. Going from Idle to Loaded
/// frees every buffer the same way.
pub fn transition_to(ctx: &mut TestContext, target: State) -> Result<()> {
    let current = ctx.state()?;
    info!("{}: {} -> {}", ctx.name(), current, target);
    send_state(ctx, target)?;

    let populate = target == State::Idle
        && matches!(current, State::Loaded | State::WaitForResources);
    if populate {
        if let Err(e) = allocate_all_buffers(ctx) {
            abort_population(ctx);
            return Err(e);
        }
    }
    if target == State::Loaded && current == State::Idle {
        deinit_buffers(ctx)?;
    }

    match wait_state(ctx, target, Expect::Success) {
        Ok(_) => {}
        Err(Error::InsufficientResources) if populate => {
            debug!("{}: not enough resources for Idle", ctx.name());
            if let Err(e) = deinit_buffers(ctx) {
                warn!("{}: freeing buffers after refusal failed: {}", ctx.name(), e);
            }
            return Err(Error::InsufficientResources);
        }
        Err(e) => return Err(e),
    }

    if target == State::Idle && matches!(current, State::Executing | State::Pause) {
        check_all_returned(ctx)?;
    }
    Ok(())
}

/// Every buffer the driver handed to the component must be back once it is Idle.
pub fn check_all_returned(ctx: &TestContext) -> Result<()> {
    for direction in [Direction::Input, Direction::Output] {
        let count = ctx.shared.list(direction).lock().busy();
        if count > 0 {
            return Err(Violation::BuffersHeld { direction, count }.into());
        }
    }
    Ok(())
}

// Population failed part way: disable the ports so the component stops waiting for buffers,
// and free what was allocated. The original error is what gets reported.
fn abort_population(ctx: &TestContext) {
    warn!("{}: port population failed, disabling ports", ctx.name());
    if let Err(e) = ctx
        .component
        .send_command(Command::PortDisable(PortTarget::All))
    {
        warn!("{}: PortDisable(all) failed: {}", ctx.name(), e);
    }
    if let Err(e) = deinit_buffers(ctx) {
        warn!("{}: freeing partial allocation failed: {}", ctx.name(), e);
    }
}
