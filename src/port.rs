// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Disabling and enabling ports.

use log::debug;
use omx::Command;
use omx::PortDefinition;
use omx::PortTarget;
use omx::State;

use crate::allocation::allocate_port;
use crate::allocation::free_port_buffers;
use crate::context::TestContext;
use crate::error::CallResult;
use crate::error::Result;
use crate::wait::wait_for;
use crate::wait::Expect;

fn targeted(ctx: &TestContext, target: PortTarget) -> Vec<PortDefinition> {
    ctx.ports()
        .iter()
        .filter(|p| target.covers(p.index))
        .copied()
        .collect()
}

/// Disables `target` and waits until the component reports every addressed port disabled.
///
/// The component returns the buffers it holds on those ports; the driver waits for them, frees
/// them, and has tunnel peers release whatever they are withholding so the component can get its
/// own buffers back.
pub fn disable_port(ctx: &mut TestContext, target: PortTarget) -> Result<()> {
    let ports = targeted(ctx, target);
    {
        let mut status = ctx.shared.status.lock();
        status.disabled.clear();
        ctx.shared.events.port_disabled.reset();
    }
    debug!("{}: PortDisable({})", ctx.name(), target);
    ctx.component
        .send_command(Command::PortDisable(target))
        .call("SendCommand(PortDisable)")?;
    ctx.release_peers();

    wait_for(
        &ctx.shared,
        &ctx.shared.events.buffer_done,
        Expect::Success,
        ctx.timeout(Expect::Success),
        "buffers of disabled ports",
        |_| {
            let busy: usize = ports
                .iter()
                .map(|p| ctx.shared.list(p.direction).lock().busy_on(p.index))
                .sum();
            (busy == 0).then_some(Ok(()))
        },
    )?;
    for port in &ports {
        free_port_buffers(ctx, port.index, port.direction)?;
    }

    wait_for(
        &ctx.shared,
        &ctx.shared.events.port_disabled,
        Expect::Success,
        ctx.timeout(Expect::Success),
        "PortDisable",
        |status| {
            ports
                .iter()
                .all(|p| status.disabled.contains(&p.index))
                .then_some(Ok(()))
        },
    )?;
    ctx.refresh_ports()
}

/// Enables `target` and waits until the component reports every addressed port enabled.
///
/// Outside Loaded the driver populates the ports it supplies right after sending the command.
pub fn enable_port(ctx: &mut TestContext, target: PortTarget) -> Result<()> {
    {
        let mut status = ctx.shared.status.lock();
        status.enabled.clear();
        ctx.shared.events.port_enabled.reset();
    }
    debug!("{}: PortEnable({})", ctx.name(), target);
    ctx.component
        .send_command(Command::PortEnable(target))
        .call("SendCommand(PortEnable)")?;

    ctx.refresh_ports()?;
    let ports = targeted(ctx, target);
    if !matches!(ctx.state()?, State::Loaded | State::WaitForResources) {
        for port in ports.iter().filter(|p| !ctx.is_tunneled(p.index)) {
            allocate_port(ctx, port)?;
        }
    }

    wait_for(
        &ctx.shared,
        &ctx.shared.events.port_enabled,
        Expect::Success,
        ctx.timeout(Expect::Success),
        "PortEnable",
        |status| {
            ports
                .iter()
                .all(|p| status.enabled.contains(&p.index))
                .then_some(Ok(()))
        },
    )?;
    ctx.refresh_ports()
}
