// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Runs the conformance tests against the in-process fake components.

use std::io::Write;

use omx::fake::FakeCore;
use omx::fake::FakeFaults;
use omx::fake::FakeSpec;
use omx::fake::PASSTHROUGH;
use omx::fake::SINK;
use omx::fake::SOURCE;
use omx::Direction;
use omx::PortDomain;
use omx::State;
use omx_conformance::allocation::allocate_all_buffers;
use omx_conformance::allocation::deinit_buffers;
use omx_conformance::config::TestConfig;
use omx_conformance::context::TestContext;
use omx_conformance::error::Error;
use omx_conformance::error::ErrorKind;
use omx_conformance::error::Violation;
use omx_conformance::scenarios;
use omx_conformance::scenarios::run_test;
use omx_conformance::traffic::run_traffic;
use omx_conformance::traffic::InputStream;
use omx_conformance::transition::send_state;
use omx_conformance::transition::transition_to;
use omx_conformance::transition::wait_state;
use omx_conformance::wait::Expect;
use tempfile::NamedTempFile;

const FAULTY: &str = "OMX.fake.faulty";

fn quick_config() -> TestConfig {
    TestConfig {
        success_timeout_ms: 2000,
        failure_timeout_ms: 100,
        traffic_timeout_ms: 500,
        traffic_quota: 20,
        max_instances: 8,
        exhaustion_iterations: 2,
        ..Default::default()
    }
}

fn faulty_core(faults: FakeFaults) -> FakeCore {
    FakeCore::default().with_component(
        FAULTY,
        FakeSpec::passthrough(PortDomain::Audio).with_faults(faults),
    )
}

fn assert_passes(core: &FakeCore, component: &str, test: &str) {
    if let Err(e) = run_test(core, component, test, &quick_config()) {
        panic!("{} failed on {}: {}", test, component, e);
    }
}

#[test]
fn every_test_passes_on_passthrough() {
    let core = FakeCore::default();
    for case in scenarios::TESTS {
        assert_passes(&core, PASSTHROUGH, case.name);
    }
    assert_eq!(core.resources_in_use(), 0);
}

#[test]
fn every_test_passes_on_sink_and_source() {
    let core = FakeCore::default();
    for component in [SINK, SOURCE] {
        for case in scenarios::TESTS {
            assert_passes(&core, component, case.name);
        }
    }
    assert_eq!(core.resources_in_use(), 0);
}

#[test]
fn exhaustion_tests_pass_with_small_capacity() {
    let core = FakeCore::new(2);
    for test in [
        "ResourceExhaustionTest",
        "ResourcePreemptionTest",
        "WaitForResourcesTest",
    ] {
        assert_passes(&core, PASSTHROUGH, test);
    }
}

#[test]
fn happy_path_meets_quota_and_returns_everything() {
    let core = FakeCore::default();
    let config = TestConfig {
        traffic_quota: 100,
        ..quick_config()
    };
    let mut ctx = TestContext::new(&core, PASSTHROUGH, &config).unwrap();
    transition_to(&mut ctx, State::Idle).unwrap();
    transition_to(&mut ctx, State::Executing).unwrap();
    let done = run_traffic(&ctx, &mut InputStream::open(&config).unwrap(), 100).unwrap();
    assert!(done >= 100);
    transition_to(&mut ctx, State::Idle).unwrap();
    for direction in [Direction::Input, Direction::Output] {
        let list = ctx.shared.list(direction).lock();
        assert_eq!(list.busy(), 0);
        assert_eq!(list.total(), 2);
    }
    ctx.finish(Ok(())).unwrap();
}

#[test]
fn short_input_file_is_replayed_in_every_phase() {
    // Ten bytes end the stream inside the first buffer of every traffic phase.
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&[0x5a; 10]).unwrap();
    let config = TestConfig {
        input_file: Some(file.path().to_owned()),
        ..quick_config()
    };
    let core = FakeCore::default();
    for component in [PASSTHROUGH, SINK] {
        for test in ["PortCommunicationTest", "PortDisableEnableTest"] {
            if let Err(e) = run_test(&core, component, test, &config) {
                panic!("{} failed on {} with a short input file: {}", test, component, e);
            }
        }
    }
    assert_eq!(core.resources_in_use(), 0);
}

#[test]
fn teardown_twice_is_harmless() {
    let core = FakeCore::default();
    let mut ctx = TestContext::new(&core, PASSTHROUGH, &quick_config()).unwrap();
    transition_to(&mut ctx, State::Idle).unwrap();
    transition_to(&mut ctx, State::Executing).unwrap();
    ctx.teardown().unwrap();
    ctx.teardown().unwrap();
    assert_eq!(ctx.state().unwrap(), State::Loaded);
    assert_eq!(ctx.shared.inputs.lock().total(), 0);
    assert_eq!(ctx.shared.outputs.lock().total(), 0);
    drop(ctx);
    assert_eq!(core.resources_in_use(), 0);
}

#[test]
fn allocation_round_trip_empties_lists() {
    let core = FakeCore::default();
    let mut ctx = TestContext::new(&core, PASSTHROUGH, &quick_config()).unwrap();
    send_state(&ctx, State::Idle).unwrap();
    allocate_all_buffers(&mut ctx).unwrap();
    assert!(wait_state(&ctx, State::Idle, Expect::Success).unwrap());
    assert_eq!(ctx.shared.inputs.lock().total(), 2);
    assert_eq!(ctx.shared.outputs.lock().total(), 2);

    deinit_buffers(&ctx).unwrap();
    for direction in [Direction::Input, Direction::Output] {
        let list = ctx.shared.list(direction).lock();
        assert_eq!((list.total(), list.busy()), (0, 0));
    }
    transition_to(&mut ctx, State::Loaded).unwrap();
}

#[test]
fn idle_is_refused_beyond_capacity() {
    let core = FakeCore::new(2);
    let config = quick_config();
    let mut running = Vec::new();
    for _ in 0..2 {
        let mut ctx = TestContext::new(&core, PASSTHROUGH, &config).unwrap();
        transition_to(&mut ctx, State::Idle).unwrap();
        running.push(ctx);
    }
    let mut refused = TestContext::new(&core, PASSTHROUGH, &config).unwrap();
    let e = transition_to(&mut refused, State::Idle).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::ResourceExhaustion);
    assert_eq!(refused.state().unwrap(), State::Loaded);
    assert_eq!(refused.shared.inputs.lock().total(), 0);
    assert_eq!(core.resources_in_use(), 2);
}

#[test]
fn stalled_component_times_out() {
    let core = faulty_core(FakeFaults {
        stall: true,
        ..Default::default()
    });
    let e = run_test(&core, FAULTY, "PortCommunicationTest", &quick_config()).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Timeout);
}

#[test]
fn duplicate_returns_are_violations() {
    let core = faulty_core(FakeFaults {
        duplicate_returns: true,
        ..Default::default()
    });
    let e = run_test(&core, FAULTY, "PortCommunicationTest", &quick_config()).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::ProtocolViolation);
    assert!(matches!(
        e,
        Error::ProtocolViolation(Violation::ExcessReturn {
            direction: Direction::Input,
            ..
        })
    ));
}

#[test]
fn ignored_state_commands_time_out() {
    let core = faulty_core(FakeFaults {
        ignore_state_commands: true,
        ..Default::default()
    });
    let e = run_test(&core, FAULTY, "StateTransitionTest", &quick_config()).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Timeout);
}

#[test]
fn outcome_records_failure_kind() {
    let core = faulty_core(FakeFaults {
        stall: true,
        ..Default::default()
    });
    let outcome = scenarios::run_one(&core, FAULTY, "PortCommunicationTest", &quick_config());
    assert!(!outcome.passed);
    assert_eq!(outcome.kind, Some(ErrorKind::Timeout));

    let outcome = scenarios::run_one(&core, PASSTHROUGH, "StateTransitionTest", &quick_config());
    assert!(outcome.passed);
    assert_eq!(outcome.kind, None);
}
