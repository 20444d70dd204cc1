// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use log::info;
use omx::Core;
use omx::Direction;
use omx::State;

use crate::config::TestConfig;
use crate::context::TestContext;
use crate::error::Result;
use crate::traffic::read_out_buffers;
use crate::traffic::run_traffic;
use crate::traffic::write_in_buffers;
use crate::traffic::InputStream;
use crate::transition::transition_to;
use crate::wait::wait_for;
use crate::wait::Expect;

pub fn run(core: &dyn Core, name: &str, config: &TestConfig) -> Result<()> {
    let mut ctx = TestContext::new(core, name, config)?;
    let result = exercise(&mut ctx);
    ctx.finish(result)
}

fn exercise(ctx: &mut TestContext) -> Result<()> {
    let quota = ctx.config.traffic_quota;
    let mut input = InputStream::open(&ctx.config)?;
    transition_to(ctx, State::Idle)?;
    transition_to(ctx, State::Executing)?;
    run_traffic(ctx, &mut input, quota)?;

    transition_to(ctx, State::Pause)?;
    pause_and_resume(ctx, &mut input)?;
    run_traffic(ctx, &mut input, quota)?;

    transition_to(ctx, State::Idle)?;
    transition_to(ctx, State::Loaded)
}

/// While paused no buffer may come back, even when new ones are submitted. After resuming, the
/// buffers queued in the meantime must complete.
pub(super) fn pause_and_resume(ctx: &mut TestContext, input: &mut InputStream) -> Result<()> {
    if input.is_exhausted() {
        input.rewind()?;
    }
    let before = ctx.exchanges();
    let written = write_in_buffers(ctx, input)?;
    let read = read_out_buffers(ctx)?;
    info!(
        "{}: submitted {} input and {} output buffers while paused",
        ctx.name(),
        written,
        read
    );
    wait_for(
        &ctx.shared,
        &ctx.shared.events.buffer_done,
        Expect::Failure,
        ctx.timeout(Expect::Failure),
        "buffer returned while paused",
        |status| (status.exchanges > before).then_some(Ok(())),
    )?;

    transition_to(ctx, State::Executing)?;
    // Outputs alone cannot complete on a component that only fills them from its input.
    let inputs_queued = ctx.shared.inputs.lock().busy() > 0;
    let outputs_queued = ctx.shared.outputs.lock().busy() > 0;
    if inputs_queued || (outputs_queued && ctx.ports_in(Direction::Input).is_empty()) {
        wait_for(
            &ctx.shared,
            &ctx.shared.events.buffer_done,
            Expect::Success,
            ctx.timeout(Expect::Success),
            "queued buffers after resume",
            |status| (status.exchanges > before).then_some(Ok(())),
        )?;
    }
    Ok(())
}
