// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use log::info;
use omx::Core;
use omx::State;

use super::fill_to_exhaustion;
use crate::config::TestConfig;
use crate::context::TestContext;
use crate::error::Result;
use crate::instances::InstancePool;
use crate::transition::transition_to;
use crate::wait::wait_for;
use crate::wait::Expect;

pub fn run(core: &dyn Core, name: &str, config: &TestConfig) -> Result<()> {
    let mut pool = InstancePool::new(core, name, config);
    let result = exercise(&mut pool, config);
    pool.finish(result)
}

fn exercise(pool: &mut InstancePool, config: &TestConfig) -> Result<()> {
    let Some(blocked) = fill_to_exhaustion(pool, config, None)? else {
        return Ok(());
    };

    pool.get(blocked).shared.status.lock().resources_acquired = false;
    transition_to(pool.get(blocked), State::WaitForResources)?;

    // Nothing is free yet.
    wait_acquired(pool.get(blocked), Expect::Failure)?;

    transition_to(pool.get(0), State::Loaded)?;
    wait_acquired(pool.get(blocked), Expect::Success)?;
    info!("instance {} acquired the released resources", blocked);

    transition_to(pool.get(blocked), State::Idle)
}

fn wait_acquired(ctx: &TestContext, expect: Expect) -> Result<()> {
    wait_for(
        &ctx.shared,
        &ctx.shared.events.resources_acquired,
        expect,
        ctx.timeout(expect),
        "ResourcesAcquired",
        |status| status.resources_acquired.then_some(Ok(())),
    )?;
    Ok(())
}
