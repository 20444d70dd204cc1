// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use log::debug;
use log::info;
use omx::Core;
use omx::PortDefinition;
use omx::State;

use crate::config::TestConfig;
use crate::context::TestContext;
use crate::error::CallResult;
use crate::error::Error;
use crate::error::Result;
use crate::traffic::run_traffic;
use crate::traffic::InputStream;
use crate::transition::transition_to;

pub fn run(core: &dyn Core, name: &str, config: &TestConfig) -> Result<()> {
    let mut ctx = TestContext::new(core, name, config)?;
    let result = exercise(&mut ctx);
    ctx.finish(result)
}

fn exercise(ctx: &mut TestContext) -> Result<()> {
    let ports: Vec<PortDefinition> = ctx.ports().to_vec();
    for declared in &ports {
        if declared.buffer_size > 1 {
            let smaller = PortDefinition {
                buffer_size: declared.buffer_size / 2,
                ..*declared
            };
            undersized_refused(ctx, declared, &smaller, "buffer size below the declared minimum")?;
        }
        if declared.buffer_count_min > 0 {
            let fewer = PortDefinition {
                buffer_count_actual: declared.buffer_count_min - 1,
                ..*declared
            };
            undersized_refused(ctx, declared, &fewer, "buffer count below the declared minimum")?;
        }
    }

    // Buffers are allocated with exactly the size each port declares.
    transition_to(ctx, State::Idle)?;
    transition_to(ctx, State::Executing)?;
    run_traffic(
        ctx,
        &mut InputStream::open(&ctx.config)?,
        ctx.config.traffic_quota,
    )?;
    transition_to(ctx, State::Idle)?;
    transition_to(ctx, State::Loaded)
}

/// Asks for `request` on the port `declared` describes. The component must refuse, or accept
/// without actually going below what it declared.
fn undersized_refused(
    ctx: &mut TestContext,
    declared: &PortDefinition,
    request: &PortDefinition,
    what: &'static str,
) -> Result<()> {
    if let Err(e) = ctx.component.set_port_definition(request) {
        debug!("port {}: {} refused: {}", declared.index, what, e);
        return Ok(());
    }
    let now = ctx
        .component
        .port_definition(declared.index)
        .call("GetParameter(PortDefinition)")?;
    if now.buffer_size < declared.buffer_size
        || now.buffer_count_actual < declared.buffer_count_min
    {
        return Err(Error::UnexpectedSuccess(what));
    }
    info!("port {}: {} ignored", declared.index, what);
    ctx.refresh_ports()
}
