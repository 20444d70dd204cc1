// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::sync::Arc;

use log::debug;
use log::warn;
use omx::Core;
use sync::ManualResetEvent;

use crate::config::TestConfig;
use crate::context::FirstError;
use crate::context::TestContext;
use crate::error::Result;

/// Instances of one component created side by side by the multi-instance scenarios.
///
/// Instances are torn down in the reverse of their creation order.
pub struct InstancePool<'a> {
    core: &'a dyn Core,
    name: String,
    config: TestConfig,
    instances: Vec<TestContext>,
    /// Signaled whenever any instance changes state or reports an error.
    state_changes: Arc<ManualResetEvent>,
}

impl<'a> InstancePool<'a> {
    pub fn new(core: &'a dyn Core, name: &str, config: &TestConfig) -> InstancePool<'a> {
        InstancePool {
            core,
            name: name.to_owned(),
            config: config.clone(),
            instances: Vec::new(),
            state_changes: Arc::new(ManualResetEvent::new()),
        }
    }

    /// Creates one more instance and returns its position.
    pub fn create(&mut self) -> Result<usize> {
        let context = TestContext::new(self.core, &self.name, &self.config)?;
        context.shared.watch(Arc::clone(&self.state_changes));
        self.instances.push(context);
        debug!("{}: instance {} created", self.name, self.instances.len() - 1);
        Ok(self.instances.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn state_changes(&self) -> &ManualResetEvent {
        &self.state_changes
    }

    pub fn get(&mut self, index: usize) -> &mut TestContext {
        &mut self.instances[index]
    }

    /// Tears down and drops the most recently created instance.
    pub fn pop(&mut self) -> Result<()> {
        match self.instances.pop() {
            Some(context) => context.finish(Ok(())),
            None => Ok(()),
        }
    }

    /// Tears down every instance, newest first.
    pub fn unwind(&mut self) -> Result<()> {
        let mut first = FirstError::default();
        while !self.instances.is_empty() {
            first.note(self.pop());
        }
        first.into_result()
    }

    /// Unwinds and returns `result`, or the unwinding failure if `result` is `Ok`.
    pub fn finish(mut self, result: Result<()>) -> Result<()> {
        let cleanup = self.unwind();
        result.and(cleanup)
    }
}

impl Drop for InstancePool<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.unwind() {
            warn!("{}: unwinding instances failed: {}", self.name, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use omx::fake::FakeCore;
    use omx::fake::PASSTHROUGH;
    use omx::State;

    use super::*;
    use crate::transition::transition_to;

    #[test]
    fn any_instance_wakes_state_change_watchers() {
        let core = FakeCore::default();
        let mut pool = InstancePool::new(&core, PASSTHROUGH, &TestConfig::default());
        pool.create().unwrap();
        let second = pool.create().unwrap();
        pool.state_changes().reset();
        transition_to(pool.get(second), State::Idle).unwrap();
        assert!(pool.state_changes().is_signaled());
        pool.finish(Ok(())).unwrap();
        assert_eq!(core.resources_in_use(), 0);
    }
}
