// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use log::info;
use omx::BufferFlags;
use omx::Core;
use omx::Direction;
use omx::OmxError;
use omx::OmxResult;
use omx::PortTarget;
use omx::State;

use crate::buffer::BufferDescriptor;
use crate::config::TestConfig;
use crate::context::TestContext;
use crate::error::Error;
use crate::error::Result;
use crate::port::disable_port;
use crate::port::enable_port;
use crate::traffic::run_traffic;
use crate::traffic::InputStream;
use crate::transition::transition_to;

pub fn run(core: &dyn Core, name: &str, config: &TestConfig) -> Result<()> {
    let mut ctx = TestContext::new(core, name, config)?;
    let result = exercise(&mut ctx);
    ctx.finish(result)
}

fn exercise(ctx: &mut TestContext) -> Result<()> {
    let quota = ctx.config.traffic_quota;
    transition_to(ctx, State::Idle)?;

    let ports: Vec<u32> = ctx.ports().iter().map(|p| p.index).collect();
    for port in ports {
        disable_port(ctx, PortTarget::Port(port))?;
        enable_port(ctx, PortTarget::Port(port))?;
        info!("{}: port {} cycled while Idle", ctx.name(), port);
    }

    transition_to(ctx, State::Executing)?;
    run_traffic(ctx, &mut InputStream::open(&ctx.config)?, quota)?;

    // Remember one header per direction to submit once the ports are gone.
    let stale: Vec<BufferDescriptor> = [Direction::Input, Direction::Output]
        .into_iter()
        .filter_map(|direction| {
            let ports = ctx.ports_in(direction);
            let list = ctx.shared.list(direction).lock();
            ports.iter().find_map(|port| list.any_on(*port))
        })
        .collect();

    disable_port(ctx, PortTarget::All)?;
    for buffer in &stale {
        submission_rejected(ctx, buffer)?;
    }

    enable_port(ctx, PortTarget::All)?;
    run_traffic(ctx, &mut InputStream::open(&ctx.config)?, quota)?;

    transition_to(ctx, State::Idle)?;
    transition_to(ctx, State::Loaded)
}

/// Submitting a buffer to a disabled port must fail with `IncorrectStateOperation`.
fn submission_rejected(ctx: &TestContext, buffer: &BufferDescriptor) -> Result<()> {
    let (call, result): (&'static str, OmxResult<()>) = match buffer.direction {
        Direction::Input => (
            "EmptyThisBuffer on a disabled port",
            ctx.component
                .empty_this_buffer(&buffer.header, &[], BufferFlags::empty()),
        ),
        Direction::Output => (
            "FillThisBuffer on a disabled port",
            ctx.component.fill_this_buffer(&buffer.header),
        ),
    };
    match result {
        Err(OmxError::IncorrectStateOperation) => Ok(()),
        Ok(()) => Err(Error::UnexpectedSuccess(call)),
        Err(error) => Err(Error::ComponentCall { call, error }),
    }
}
