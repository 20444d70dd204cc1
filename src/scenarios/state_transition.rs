// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use log::info;
use omx::Core;
use omx::OmxError;
use omx::State;

use crate::config::TestConfig;
use crate::context::TestContext;
use crate::error::Error;
use crate::error::Result;
use crate::transition::send_state;
use crate::transition::state_command;
use crate::transition::transition_to;
use crate::wait::wait_for;
use crate::wait::Expect;

const WALK: [State; 9] = [
    State::Idle,
    State::Executing,
    State::Pause,
    State::Idle,
    State::Executing,
    State::Pause,
    State::Executing,
    State::Idle,
    State::Loaded,
];

pub fn run(core: &dyn Core, name: &str, config: &TestConfig) -> Result<()> {
    let mut ctx = TestContext::new(core, name, config)?;
    let result = exercise(&mut ctx);
    ctx.finish(result)
}

fn exercise(ctx: &mut TestContext) -> Result<()> {
    refused(ctx, State::Loaded, OmxError::SameState)?;
    refused(ctx, State::Executing, OmxError::IncorrectStateTransition)?;
    for state in WALK {
        transition_to(ctx, state)?;
    }
    Ok(())
}

/// Requests `target` and checks that the component refuses it with `expected`, either from the
/// call itself or through an error event, and stays where it is.
fn refused(ctx: &TestContext, target: State, expected: OmxError) -> Result<()> {
    let before = ctx.state()?;
    let what = state_command(target);
    match send_state(ctx, target) {
        Err(Error::ComponentCall { error, .. }) if error == expected => {}
        Err(e) => return Err(e),
        Ok(()) => {
            wait_for(
                &ctx.shared,
                &ctx.shared.events.state_changed,
                Expect::Success,
                ctx.timeout(Expect::Success),
                what,
                |status| match (status.error, status.state) {
                    (Some(error), _) if error == expected => Some(Ok(())),
                    (Some(error), _) => Some(Err(Error::ComponentCall { call: what, error })),
                    (None, Some(_)) => Some(Err(Error::UnexpectedSuccess(what))),
                    (None, None) => None,
                },
            )?;
        }
    }
    let after = ctx.state()?;
    if after != before {
        return Err(Error::StateMismatch {
            expected: before,
            actual: after,
        });
    }
    info!("{}: {} refused with {}", ctx.name(), what, expected);
    Ok(())
}
