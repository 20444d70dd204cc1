// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! An in-process core whose components follow the standard state machine, used to run the
//! conformance scenarios without vendor binaries.

mod component;
mod resources;

use std::collections::BTreeMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub use self::component::FakeComponent;
use self::resources::ResourcePool;
use crate::component::Callbacks;
use crate::component::Component;
use crate::component::Core;
use crate::error::OmxError;
use crate::error::OmxResult;
use crate::types::*;

/// Number of fake components that may be in Idle or above at once.
pub const DEFAULT_CAPACITY: usize = 4;

pub const PASSTHROUGH: &str = "OMX.fake.audio_passthrough";
pub const SINK: &str = "OMX.fake.audio_sink";
pub const SOURCE: &str = "OMX.fake.video_source";

/// Misbehaviour a fake component can be told to exhibit.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FakeFaults {
    /// Accept buffers but never process them.
    pub stall: bool,
    /// Accept state commands without ever acting on them.
    pub ignore_state_commands: bool,
    /// Report every consumed input buffer twice.
    pub duplicate_returns: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FakePortSpec {
    pub domain: PortDomain,
    pub direction: Direction,
    pub buffer_count_min: u32,
    pub buffer_count_actual: u32,
    /// Also the smallest buffer size the port accepts.
    pub buffer_size: u32,
    pub buffer_alignment: u32,
}

impl FakePortSpec {
    pub fn new(domain: PortDomain, direction: Direction) -> FakePortSpec {
        FakePortSpec {
            domain,
            direction,
            buffer_count_min: 1,
            buffer_count_actual: 2,
            buffer_size: 4096,
            buffer_alignment: 1,
        }
    }
}

/// Shape and behaviour of one named fake component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FakeSpec {
    pub ports: Vec<FakePortSpec>,
    pub faults: FakeFaults,
}

impl FakeSpec {
    /// One input and one output port; output buffers carry a copy of the input.
    pub fn passthrough(domain: PortDomain) -> FakeSpec {
        FakeSpec {
            ports: vec![
                FakePortSpec::new(domain, Direction::Input),
                FakePortSpec::new(domain, Direction::Output),
            ],
            faults: FakeFaults::default(),
        }
    }

    /// A single input port whose buffers are consumed as they arrive.
    pub fn sink(domain: PortDomain) -> FakeSpec {
        FakeSpec {
            ports: vec![FakePortSpec::new(domain, Direction::Input)],
            faults: FakeFaults::default(),
        }
    }

    /// A single output port whose buffers are filled with a pattern as they arrive.
    pub fn source(domain: PortDomain) -> FakeSpec {
        FakeSpec {
            ports: vec![FakePortSpec::new(domain, Direction::Output)],
            faults: FakeFaults::default(),
        }
    }

    pub fn with_faults(mut self, faults: FakeFaults) -> FakeSpec {
        self.faults = faults;
        self
    }
}

/// A core serving [`FakeComponent`]s from a catalogue of [`FakeSpec`]s.
pub struct FakeCore {
    specs: BTreeMap<String, FakeSpec>,
    pool: Arc<ResourcePool>,
    next_id: AtomicU64,
}

impl FakeCore {
    /// Creates a core with the default catalogue and room for `capacity` active components.
    pub fn new(capacity: usize) -> FakeCore {
        FakeCore {
            specs: BTreeMap::new(),
            pool: Arc::new(ResourcePool::new(capacity)),
            next_id: AtomicU64::new(1),
        }
        .with_component(PASSTHROUGH, FakeSpec::passthrough(PortDomain::Audio))
        .with_component(SINK, FakeSpec::sink(PortDomain::Audio))
        .with_component(SOURCE, FakeSpec::source(PortDomain::Video))
    }

    /// Adds or replaces a catalogue entry.
    pub fn with_component(mut self, name: &str, spec: FakeSpec) -> FakeCore {
        self.specs.insert(name.to_owned(), spec);
        self
    }

    /// Number of components currently holding a processing unit.
    pub fn resources_in_use(&self) -> usize {
        self.pool.in_use()
    }
}

impl Default for FakeCore {
    fn default() -> FakeCore {
        FakeCore::new(DEFAULT_CAPACITY)
    }
}

impl Core for FakeCore {
    fn get_handle(
        &self,
        name: &str,
        callbacks: Arc<dyn Callbacks>,
    ) -> OmxResult<Arc<dyn Component>> {
        let spec = self.specs.get(name).ok_or(OmxError::ComponentNotFound)?;
        let id = ComponentId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let component =
            FakeComponent::new(id, name, spec, callbacks, Arc::clone(&self.pool))
                .map_err(|_| OmxError::InsufficientResources)?;
        Ok(Arc::new(component))
    }

    fn component_names(&self) -> OmxResult<Vec<String>> {
        Ok(self.specs.keys().cloned().collect())
    }
}
