// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::time::Duration;
use std::time::Instant;

use log::info;
use log::warn;
use omx::Core;
use omx::OmxError;
use omx::PriorityMgmt;
use omx::State;
use sync::EventWaitResult;

use super::fill_to_exhaustion;
use crate::allocation::deinit_buffers;
use crate::config::TestConfig;
use crate::error::CallResult;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::error::Result;
use crate::instances::InstancePool;
use crate::transition::transition_to;

const LOW_PRIORITY: PriorityMgmt = PriorityMgmt {
    group_priority: 1,
    group_id: 0,
};

const HIGH_PRIORITY: PriorityMgmt = PriorityMgmt {
    group_priority: 0,
    group_id: 0,
};

pub fn run(core: &dyn Core, name: &str, config: &TestConfig) -> Result<()> {
    let mut pool = InstancePool::new(core, name, config);
    let result = exercise(&mut pool, config);
    pool.finish(result)
}

fn exercise(pool: &mut InstancePool, config: &TestConfig) -> Result<()> {
    let Some(blocked) = fill_to_exhaustion(pool, config, Some(LOW_PRIORITY))? else {
        return Ok(());
    };

    pool.get(blocked)
        .component
        .set_priority(HIGH_PRIORITY)
        .call("SetParameter(PriorityMgmt)")?;
    match transition_to(pool.get(blocked), State::Idle) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::ResourceExhaustion => {
            // Preemption is optional. The resources must still go to whoever asks once freed.
            warn!("{}: priority did not preempt, releasing a unit instead", pool.get(0).name());
            transition_to(pool.get(0), State::Loaded)?;
            return transition_to(pool.get(blocked), State::Idle);
        }
        Err(e) => return Err(e),
    }

    let victim = wait_for_victim(pool, blocked, config.success_timeout())?;
    info!("instance {} preempted by instance {}", victim, blocked);
    // The preempted instance is Loaded but its buffers are still registered with it.
    deinit_buffers(pool.get(victim))
}

/// Waits until one of the instances other than `preemptor` reports that it lost its resources
/// and fell back to Loaded.
fn wait_for_victim(pool: &mut InstancePool, preemptor: usize, timeout: Duration) -> Result<usize> {
    let deadline = Instant::now() + timeout;
    loop {
        // Reset before scanning so a change racing with the scan wakes the wait below.
        pool.state_changes().reset();
        for index in (0..pool.len()).filter(|i| *i != preemptor) {
            let status = pool.get(index).shared.status.lock();
            if let Some(violation) = &status.violation {
                return Err(Error::ProtocolViolation(violation.clone()));
            }
            if status.error == Some(OmxError::ResourcesPreempted)
                && status.state == Some(State::Loaded)
            {
                return Ok(index);
            }
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero()
            || pool.state_changes().wait_timeout(remaining) == EventWaitResult::TimedOut
        {
            return Err(Error::Timeout("preemption of a lower priority instance"));
        }
    }
}
