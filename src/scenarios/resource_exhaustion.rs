// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use log::info;
use omx::Core;
use omx::State;

use super::fill_to_exhaustion;
use crate::config::TestConfig;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::error::Result;
use crate::instances::InstancePool;
use crate::transition::transition_to;

pub fn run(core: &dyn Core, name: &str, config: &TestConfig) -> Result<()> {
    let mut pool = InstancePool::new(core, name, config);
    let result = exercise(&mut pool, config);
    pool.finish(result)
}

fn exercise(pool: &mut InstancePool, config: &TestConfig) -> Result<()> {
    let Some(refused) = fill_to_exhaustion(pool, config, None)? else {
        return Ok(());
    };
    let last_running = refused - 1;

    // Hand the last resource back and forth between the two newest instances.
    for iteration in 0..config.exhaustion_iterations {
        transition_to(pool.get(last_running), State::Loaded)?;
        transition_to(pool.get(refused), State::Idle)?;
        transition_to(pool.get(refused), State::Loaded)?;
        transition_to(pool.get(last_running), State::Idle)?;
        info!("boundary iteration {} passed", iteration);
    }

    // The limit still holds afterwards.
    match transition_to(pool.get(refused), State::Idle) {
        Err(e) if e.kind() == ErrorKind::ResourceExhaustion => Ok(()),
        Err(e) => Err(e),
        Ok(()) => Err(Error::UnexpectedSuccess(
            "Idle transition beyond the resource limit",
        )),
    }
}
