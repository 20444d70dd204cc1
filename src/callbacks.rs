// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Turns the callbacks of the component under test into updates of the state the driver waits
//! on.
//!
//! Callbacks arrive on threads owned by the component. Each one updates [`SharedState`] under its
//! locks and then signals the matching [`ManualResetEvent`]; the driver never runs code on the
//! component's threads beyond that.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::OnceLock;

use log::debug;
use log::error;
use log::info;
use log::warn;
use omx::BufferFlags;
use omx::BufferHeader;
use omx::Callbacks;
use omx::CommandKind;
use omx::ComponentEvent;
use omx::ComponentId;
use omx::Direction;
use omx::OmxError;
use omx::State;
use sync::ManualResetEvent;
use sync::Mutex;

use crate::buffer::BufferList;
use crate::error::Violation;

/// Events the driver blocks on.
#[derive(Default)]
pub struct Events {
    pub state_changed: ManualResetEvent,
    pub port_disabled: ManualResetEvent,
    pub port_enabled: ManualResetEvent,
    pub buffer_done: ManualResetEvent,
    pub empty_buffer_done: ManualResetEvent,
    pub resources_acquired: ManualResetEvent,
}

impl Events {
    fn signal_all(&self) {
        self.state_changed.signal();
        self.port_disabled.signal();
        self.port_enabled.signal();
        self.buffer_done.signal();
        self.empty_buffer_done.signal();
        self.resources_acquired.signal();
    }
}

/// What the callbacks have reported so far.
#[derive(Debug, Default)]
pub struct Status {
    /// State named by the last `StateSet` completion.
    pub state: Option<State>,
    /// Last error event.
    pub error: Option<OmxError>,
    /// Buffer-done callbacks received.
    pub exchanges: u64,
    pub eos: bool,
    /// Ports whose disable completed since the driver last cleared the set.
    pub disabled: BTreeSet<u32>,
    pub enabled: BTreeSet<u32>,
    pub resources_acquired: bool,
    /// The first protocol violation. Once set, every wait fails with it.
    pub violation: Option<Violation>,
}

/// State shared between the driver and the callback threads of one component.
pub struct SharedState {
    component: OnceLock<ComponentId>,
    /// Also signaled on every state change or error, for waiters watching several components.
    watcher: OnceLock<Arc<ManualResetEvent>>,
    pub inputs: Mutex<BufferList>,
    pub outputs: Mutex<BufferList>,
    pub status: Mutex<Status>,
    pub events: Events,
}

impl Default for SharedState {
    fn default() -> SharedState {
        SharedState::new()
    }
}

impl SharedState {
    pub fn new() -> SharedState {
        SharedState {
            component: OnceLock::new(),
            watcher: OnceLock::new(),
            inputs: Mutex::new(BufferList::new(Direction::Input)),
            outputs: Mutex::new(BufferList::new(Direction::Output)),
            status: Mutex::new(Status::default()),
            events: Events::default(),
        }
    }

    /// Accepts callbacks from `id` only. Until bound, every callback is dropped.
    pub fn bind(&self, id: ComponentId) {
        if self.component.set(id).is_err() {
            warn!("callback adapter already bound to {:?}", self.component.get());
        }
    }

    /// Signals `watcher` along with `events.state_changed` from now on.
    pub fn watch(&self, watcher: Arc<ManualResetEvent>) {
        if self.watcher.set(watcher).is_err() {
            warn!("state changes already watched");
        }
    }

    fn state_changed(&self) {
        self.events.state_changed.signal();
        if let Some(watcher) = self.watcher.get() {
            watcher.signal();
        }
    }

    pub fn list(&self, direction: Direction) -> &Mutex<BufferList> {
        match direction {
            Direction::Input => &self.inputs,
            Direction::Output => &self.outputs,
        }
    }

    /// Records `violation` unless an earlier one is already recorded, and wakes every waiter.
    pub fn violation(&self, violation: Violation) {
        error!("protocol violation: {}", violation);
        let mut status = self.status.lock();
        if status.violation.is_none() {
            status.violation = Some(violation);
        }
        self.events.signal_all();
        if let Some(watcher) = self.watcher.get() {
            watcher.signal();
        }
    }

    fn accepts(&self, component: ComponentId) -> bool {
        if self.component.get() == Some(&component) {
            return true;
        }
        warn!("ignoring callback from unexpected component {}", component);
        false
    }
}

/// The [`Callbacks`] handed to the component under test.
pub struct CallbackAdapter {
    shared: Arc<SharedState>,
}

impl CallbackAdapter {
    pub fn new(shared: Arc<SharedState>) -> CallbackAdapter {
        CallbackAdapter { shared }
    }

    fn command_complete(&self, command: CommandKind, data: u32) {
        let shared = &*self.shared;
        match command {
            CommandKind::StateSet => match State::n(data) {
                Some(state) => {
                    debug!("state changed to {}", state);
                    let mut status = shared.status.lock();
                    status.state = Some(state);
                    shared.state_changed();
                }
                None => shared.violation(Violation::UnknownState(data)),
            },
            CommandKind::PortDisable => {
                debug!("port {} disabled", data);
                let mut status = shared.status.lock();
                status.disabled.insert(data);
                shared.events.port_disabled.signal();
            }
            CommandKind::PortEnable => {
                debug!("port {} enabled", data);
                let mut status = shared.status.lock();
                status.enabled.insert(data);
                shared.events.port_enabled.signal();
            }
            CommandKind::Flush | CommandKind::MarkBuffer => {
                debug!("{:?} complete on {:#x}", command, data)
            }
        }
    }

    fn buffer_done(&self, callback: &'static str, direction: Direction, header: &BufferHeader) {
        let shared = &*self.shared;
        if header.port().map(|(d, _)| d) != Some(direction) {
            shared.violation(Violation::DirectionMismatch {
                callback,
                id: header.id,
                input: header.input_port_index,
                output: header.output_port_index,
            });
            return;
        }
        if direction == Direction::Output
            && u64::from(header.offset) + u64::from(header.filled_len) > u64::from(header.alloc_len)
        {
            shared.violation(Violation::FilledBeyondAlloc {
                id: header.id,
                offset: header.offset,
                filled: header.filled_len,
                alloc: header.alloc_len,
            });
            return;
        }
        // The list lock is released before the status lock is taken.
        let completed = shared.list(direction).lock().complete(header);
        if let Err(violation) = completed {
            shared.violation(violation);
            return;
        }
        let mut status = shared.status.lock();
        status.exchanges += 1;
        if direction == Direction::Output && header.flags.contains(BufferFlags::EOS) {
            status.eos = true;
        }
        if direction == Direction::Input {
            shared.events.empty_buffer_done.signal();
        }
        shared.events.buffer_done.signal();
    }
}

impl Callbacks for CallbackAdapter {
    fn event_handler(&self, component: ComponentId, event: ComponentEvent) {
        if !self.shared.accepts(component) {
            return;
        }
        let shared = &*self.shared;
        match event {
            ComponentEvent::CmdComplete { command, data } => self.command_complete(command, data),
            ComponentEvent::Error { error, data } => {
                info!("component reported error: {} ({:#x})", error, data);
                let mut status = shared.status.lock();
                status.error = Some(error);
                shared.state_changed();
            }
            ComponentEvent::BufferFlag { port, flags } => {
                debug!("buffer flags {:?} on port {}", flags, port);
                if flags.contains(BufferFlags::EOS) {
                    let mut status = shared.status.lock();
                    status.eos = true;
                    shared.events.buffer_done.signal();
                }
            }
            ComponentEvent::ResourcesAcquired => {
                debug!("resources acquired");
                let mut status = shared.status.lock();
                status.resources_acquired = true;
                shared.events.resources_acquired.signal();
            }
            ComponentEvent::PortSettingsChanged { port } => {
                info!("port settings changed on port {}", port)
            }
            ComponentEvent::Mark => debug!("mark"),
            ComponentEvent::Other { kind, data1, data2 } => {
                debug!("event {:#x} ({:#x}, {:#x})", kind, data1, data2)
            }
        }
    }

    fn empty_buffer_done(&self, component: ComponentId, header: BufferHeader) {
        if self.shared.accepts(component) {
            self.buffer_done("EmptyBufferDone", Direction::Input, &header);
        }
    }

    fn fill_buffer_done(&self, component: ComponentId, header: BufferHeader) {
        if self.shared.accepts(component) {
            self.buffer_done("FillBufferDone", Direction::Output, &header);
        }
    }
}
