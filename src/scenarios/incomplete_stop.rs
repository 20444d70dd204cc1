// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::sync::Arc;

use log::info;
use log::warn;
use omx::Core;
use omx::Direction;
use omx::OmxError;
use omx::State;
use sync::EventWaitResult;

use crate::config::TestConfig;
use crate::context::TestContext;
use crate::error::CallResult;
use crate::error::Error;
use crate::error::Result;
use crate::traffic::write_in_buffers;
use crate::traffic::InputStream;
use crate::transition::check_all_returned;
use crate::transition::send_state;
use crate::transition::transition_to;
use crate::transition::wait_state;
use crate::ttc::TunnelTestComponent;
use crate::wait::Expect;

pub fn run(core: &dyn Core, name: &str, config: &TestConfig) -> Result<()> {
    let mut ctx = TestContext::new(core, name, config)?;
    let result = exercise(core, &mut ctx);
    ctx.finish(result)
}

fn exercise(core: &dyn Core, ctx: &mut TestContext) -> Result<()> {
    let Some(&port) = ctx.ports_in(Direction::Output).first() else {
        warn!("{}: no output port to tunnel, skipping", ctx.name());
        return Ok(());
    };
    let ttc = Arc::new(TunnelTestComponent::new());
    match ctx.tunnel_to(core, port, Arc::clone(&ttc)) {
        Ok(()) => {}
        Err(Error::ComponentCall {
            error: OmxError::TunnelingUnsupported,
            ..
        }) => {
            warn!("{}: port {} cannot be tunneled, skipping", ctx.name(), port);
            return Ok(());
        }
        Err(e) => return Err(e),
    }

    transition_to(ctx, State::Idle)?;
    transition_to(ctx, State::Executing)?;
    ttc.set_withhold(true);
    write_in_buffers(ctx, &mut InputStream::open(&ctx.config)?)?;
    if let EventWaitResult::TimedOut = ttc.wait_received(ctx.timeout(Expect::Success)) {
        return Err(Error::Timeout("buffer at tunnel peer"));
    }
    info!("{}: tunnel peer holds {} buffers", ctx.name(), ttc.held());

    // The component cannot reach Idle while its peer keeps buffers it supplied.
    send_state(ctx, State::Idle)?;
    wait_state(ctx, State::Idle, Expect::Failure)?;

    ttc.set_withhold(false);
    ttc.release_held().call("FillThisBuffer from tunnel peer")?;
    wait_state(ctx, State::Idle, Expect::Success)?;
    check_all_returned(ctx)?;
    transition_to(ctx, State::Loaded)
}
