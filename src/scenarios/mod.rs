// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The conformance tests, each a fixed sequence of lifecycle steps run against one component.

mod incomplete_stop;
mod min_payload_size;
mod port_communication;
mod port_disable_enable;
mod resource_exhaustion;
mod resource_preemption;
mod state_transition;
mod wait_for_resources;

use std::time::Instant;

use log::info;
use log::warn;
use omx::Core;
use omx::PriorityMgmt;
use omx::State;

use crate::config::TestConfig;
use crate::error::CallResult;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::error::Result;
use crate::instances::InstancePool;
use crate::report::TestOutcome;
use crate::transition::transition_to;

/// Entry point of one test.
pub type TestFn = fn(&dyn Core, &str, &TestConfig) -> Result<()>;

pub struct TestCase {
    pub name: &'static str,
    pub description: &'static str,
    pub run: TestFn,
}

pub const TESTS: &[TestCase] = &[
    TestCase {
        name: "StateTransitionTest",
        description: "walks the state graph and checks that invalid transitions are refused",
        run: state_transition::run,
    },
    TestCase {
        name: "PortCommunicationTest",
        description: "exchanges buffers, pauses, resumes and exchanges again",
        run: port_communication::run,
    },
    TestCase {
        name: "PortDisableEnableTest",
        description: "cycles ports while Idle and stops/restarts all ports while Executing",
        run: port_disable_enable::run,
    },
    TestCase {
        name: "MinPayloadSizeTest",
        description: "refuses undersized buffers and exchanges buffers of the minimum size",
        run: min_payload_size::run,
    },
    TestCase {
        name: "ResourceExhaustionTest",
        description: "creates instances until resources run out and cycles instances at the boundary",
        run: resource_exhaustion::run,
    },
    TestCase {
        name: "ResourcePreemptionTest",
        description: "a higher priority instance takes the resources of a lower priority one",
        run: resource_preemption::run,
    },
    TestCase {
        name: "WaitForResourcesTest",
        description: "an instance waiting for resources gets them once they are released",
        run: wait_for_resources::run,
    },
    TestCase {
        name: "IncompleteStopTest",
        description: "Idle cannot complete while a tunnel peer withholds buffers",
        run: incomplete_stop::run,
    },
];

/// Looks a test up by name, ignoring ASCII case.
pub fn find(name: &str) -> Option<&'static TestCase> {
    TESTS.iter().find(|t| t.name.eq_ignore_ascii_case(name))
}

/// Runs the test called `test` against `component`.
pub fn run_test(core: &dyn Core, component: &str, test: &str, config: &TestConfig) -> Result<()> {
    let case = find(test).ok_or_else(|| Error::UnknownTest(test.to_owned()))?;
    (case.run)(core, component, config)
}

/// Runs one test and records its outcome.
pub fn run_one(core: &dyn Core, component: &str, test: &str, config: &TestConfig) -> TestOutcome {
    info!("running {} on {}", test, component);
    let start = Instant::now();
    let result = run_test(core, component, test, config);
    let outcome = TestOutcome::new(component, test, &result, start.elapsed());
    info!("{}", outcome);
    outcome
}

/// Creates instances and moves each to Idle until one is refused for lack of resources.
///
/// Returns the index of the refused instance, which is left in Loaded, or `None` if every
/// instance up to `max_instances` got its resources.
fn fill_to_exhaustion(
    pool: &mut InstancePool,
    config: &TestConfig,
    priority: Option<PriorityMgmt>,
) -> Result<Option<usize>> {
    while pool.len() < config.max_instances {
        let index = pool.create()?;
        let ctx = pool.get(index);
        if let Some(priority) = priority {
            ctx.component
                .set_priority(priority)
                .call("SetParameter(PriorityMgmt)")?;
        }
        match transition_to(ctx, State::Idle) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::ResourceExhaustion => {
                let actual = ctx.state()?;
                if actual != State::Loaded {
                    return Err(Error::StateMismatch {
                        expected: State::Loaded,
                        actual,
                    });
                }
                info!("resources exhausted by instance {}", index);
                if index == 0 {
                    // Not even one instance can run.
                    return Err(e);
                }
                return Ok(Some(index));
            }
            Err(e) => return Err(e),
        }
    }
    warn!(
        "resources not exhausted by {} instances",
        config.max_instances
    );
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(
            find("portcommunicationtest").map(|t| t.name),
            Some("PortCommunicationTest")
        );
        assert!(find("NoSuchTest").is_none());
    }

    #[test]
    fn registry_is_unique() {
        for (i, a) in TESTS.iter().enumerate() {
            for b in &TESTS[i + 1..] {
                assert!(!a.name.eq_ignore_ascii_case(b.name));
            }
        }
        assert_eq!(TESTS.len(), 8);
    }

    #[test]
    fn unknown_test() {
        let core = omx::fake::FakeCore::default();
        assert!(matches!(
            run_test(&core, omx::fake::PASSTHROUGH, "Bogus", &TestConfig::default()),
            Err(Error::UnknownTest(_))
        ));
    }
}
