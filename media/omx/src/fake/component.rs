// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::any::Any;
use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::io;
use std::sync::mpsc::channel;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;

use log::debug;
use log::error;
use log::warn;
use sync::Mutex;

use super::resources::ResourcePool;
use super::FakeFaults;
use super::FakePortSpec;
use super::FakeSpec;
use crate::component::Callbacks;
use crate::component::Component;
use crate::component::TunnelPeer;
use crate::error::OmxError;
use crate::error::OmxResult;
use crate::types::*;

/// Work items for the worker thread of a fake component.
pub(super) enum Msg {
    /// Something changed; process buffers and pending commands.
    Notify,
    /// The resource pool took this component's unit away.
    Preempt,
    /// The resource pool handed a unit to this waiting component.
    ResourcesGranted,
    Shutdown,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Owner {
    Client,
    Component,
    Peer,
}

struct FakeBuffer {
    header: BufferHeader,
    data: Vec<u8>,
    owner: Owner,
    // Allocated by this component for a tunneled output port.
    supplied: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum PortPending {
    Disable,
    Enable,
}

struct Port {
    definition: PortDefinition,
    min_buffer_size: u32,
    pending: Option<PortPending>,
    buffers: BTreeMap<BufferId, FakeBuffer>,
    // Input buffers waiting to be consumed, or output buffers waiting to be filled.
    queue: VecDeque<BufferId>,
    tunnel: Option<TunnelPeer>,
}

impl Port {
    fn new(index: u32, spec: &FakePortSpec) -> Port {
        Port {
            definition: PortDefinition {
                index,
                direction: spec.direction,
                domain: spec.domain,
                buffer_count_actual: spec.buffer_count_actual,
                buffer_count_min: spec.buffer_count_min,
                buffer_size: spec.buffer_size,
                enabled: true,
                populated: false,
                buffers_contiguous: false,
                buffer_alignment: spec.buffer_alignment,
            },
            min_buffer_size: spec.buffer_size,
            pending: None,
            buffers: BTreeMap::new(),
            queue: VecDeque::new(),
            tunnel: None,
        }
    }

    fn index(&self) -> u32 {
        self.definition.index
    }

    fn populated(&self) -> bool {
        self.buffers.len() >= self.definition.buffer_count_actual as usize
    }

    fn at_peer(&self) -> bool {
        self.buffers.values().any(|b| b.owner == Owner::Peer)
    }

    fn snapshot(&self) -> PortDefinition {
        PortDefinition {
            populated: self.populated(),
            ..self.definition
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Pending {
    ToIdleFromLoaded,
    ToIdleFromExecuting,
    ToLoaded,
}

enum Outgoing {
    Event(ComponentEvent),
    EmptyBufferDone(BufferHeader),
    FillBufferDone(BufferHeader),
    ToPeer {
        peer: TunnelPeer,
        header: BufferHeader,
        data: Vec<u8>,
    },
}

struct Inner {
    state: State,
    pending: Option<Pending>,
    ports: Vec<Port>,
    priority: PriorityMgmt,
    holds_resource: bool,
    next_buffer: u64,
    pattern: u8,
    outbox: Vec<Outgoing>,
}

impl Inner {
    fn position(&self, index: u32) -> OmxResult<usize> {
        self.ports
            .iter()
            .position(|p| p.index() == index)
            .ok_or(OmxError::BadPortIndex)
    }

    fn port_mut(&mut self, index: u32) -> OmxResult<&mut Port> {
        let pos = self.position(index)?;
        Ok(&mut self.ports[pos])
    }

    fn targets(&self, target: PortTarget) -> OmxResult<Vec<usize>> {
        match target {
            PortTarget::All => Ok((0..self.ports.len()).collect()),
            PortTarget::Port(index) => Ok(vec![self.position(index)?]),
        }
    }

    fn buffer_id(&mut self) -> BufferId {
        self.next_buffer += 1;
        BufferId(self.next_buffer)
    }

    fn error(&mut self, error: OmxError) {
        self.outbox
            .push(Outgoing::Event(ComponentEvent::Error { error, data: 0 }));
    }

    fn complete(&mut self, command: CommandKind, data: u32) {
        self.outbox
            .push(Outgoing::Event(ComponentEvent::CmdComplete { command, data }));
    }

    /// Hands every queued client buffer of the port back to the client without processing it.
    fn return_queued(&mut self, pos: usize) {
        let port = &mut self.ports[pos];
        let direction = port.definition.direction;
        let mut kept = VecDeque::new();
        let mut returned = Vec::new();
        for id in port.queue.drain(..) {
            match port.buffers.get_mut(&id) {
                Some(buffer) if buffer.supplied => kept.push_back(id),
                Some(buffer) => {
                    buffer.owner = Owner::Client;
                    buffer.header.filled_len = 0;
                    buffer.header.offset = 0;
                    returned.push(buffer.header);
                }
                None => {}
            }
        }
        port.queue = kept;
        for header in returned {
            self.outbox.push(match direction {
                Direction::Input => Outgoing::EmptyBufferDone(header),
                Direction::Output => Outgoing::FillBufferDone(header),
            });
        }
    }

    /// Allocates this component's own buffers on a tunneled output port.
    fn allocate_supplied(&mut self, pos: usize) {
        if self.ports[pos].tunnel.is_none() {
            return;
        }
        while !self.ports[pos].populated() {
            let id = self.buffer_id();
            let port = &mut self.ports[pos];
            let size = port.definition.buffer_size;
            port.buffers.insert(
                id,
                FakeBuffer {
                    header: BufferHeader::new(id, port.index(), Direction::Output, size),
                    data: vec![0; size as usize],
                    owner: Owner::Component,
                    supplied: true,
                },
            );
            port.queue.push_back(id);
        }
    }

    /// Frees the supplied buffers that are not currently held by the peer.
    fn free_supplied(&mut self, pos: usize) {
        let port = &mut self.ports[pos];
        port.buffers
            .retain(|_, b| !b.supplied || b.owner == Owner::Peer);
        let Port { buffers, queue, .. } = port;
        queue.retain(|id| buffers.contains_key(id));
    }

    fn consume(&mut self, pos: usize, id: BufferId, duplicate: bool) -> Option<(Vec<u8>, BufferFlags, i64)> {
        let buffer = self.ports[pos].buffers.get_mut(&id)?;
        let start = buffer.header.offset as usize;
        let end = (start + buffer.header.filled_len as usize).min(buffer.data.len());
        let payload = buffer.data[start.min(end)..end].to_vec();
        let flags = buffer.header.flags;
        let timestamp = buffer.header.timestamp;
        buffer.owner = Owner::Client;
        buffer.header.filled_len = 0;
        buffer.header.offset = 0;
        let header = buffer.header;
        self.outbox.push(Outgoing::EmptyBufferDone(header));
        if duplicate {
            self.outbox.push(Outgoing::EmptyBufferDone(header));
        }
        Some((payload, flags, timestamp))
    }

    fn produce(&mut self, pos: usize, id: BufferId, payload: &[u8], flags: BufferFlags, timestamp: i64) {
        let port = &mut self.ports[pos];
        let index = port.index();
        let tunnel = port.tunnel.clone();
        let Some(buffer) = port.buffers.get_mut(&id) else {
            return;
        };
        let len = payload.len().min(buffer.data.len());
        buffer.data[..len].copy_from_slice(&payload[..len]);
        buffer.header.filled_len = len as u32;
        buffer.header.offset = 0;
        buffer.header.flags = flags;
        buffer.header.timestamp = timestamp;
        let outgoing = match tunnel {
            Some(peer) => {
                buffer.owner = Owner::Peer;
                let mut header = buffer.header;
                header.input_port_index = peer.port;
                Outgoing::ToPeer {
                    peer,
                    header,
                    data: buffer.data[..len].to_vec(),
                }
            }
            None => {
                buffer.owner = Owner::Client;
                Outgoing::FillBufferDone(buffer.header)
            }
        };
        self.outbox.push(outgoing);
        if flags.contains(BufferFlags::EOS) {
            self.outbox.push(Outgoing::Event(ComponentEvent::BufferFlag {
                port: index,
                flags,
            }));
        }
    }

    /// Processes queued buffers: the first input port feeds the first output port, a lone input
    /// port is a sink and a lone output port is a source.
    fn pump(&mut self, faults: &FakeFaults) {
        if faults.stall || self.state != State::Executing || self.pending.is_some() {
            return;
        }
        let ready = |port: &Port| port.definition.enabled && port.pending.is_none();
        let input = self
            .ports
            .iter()
            .position(|p| p.definition.direction == Direction::Input);
        let output = self
            .ports
            .iter()
            .position(|p| p.definition.direction == Direction::Output);
        match (input, output) {
            (Some(i), Some(o)) => {
                while ready(&self.ports[i])
                    && ready(&self.ports[o])
                    && !self.ports[i].queue.is_empty()
                    && !self.ports[o].queue.is_empty()
                {
                    let (Some(in_id), Some(out_id)) =
                        (self.ports[i].queue.pop_front(), self.ports[o].queue.pop_front())
                    else {
                        break;
                    };
                    match self.consume(i, in_id, faults.duplicate_returns) {
                        Some((payload, flags, timestamp)) => {
                            self.produce(o, out_id, &payload, flags, timestamp)
                        }
                        None => self.ports[o].queue.push_front(out_id),
                    }
                }
            }
            (Some(i), None) => {
                while ready(&self.ports[i]) {
                    let Some(id) = self.ports[i].queue.pop_front() else {
                        break;
                    };
                    self.consume(i, id, faults.duplicate_returns);
                }
            }
            (None, Some(o)) => {
                while ready(&self.ports[o]) {
                    let Some(id) = self.ports[o].queue.pop_front() else {
                        break;
                    };
                    let size = self.ports[o].definition.buffer_size as usize;
                    self.pattern = self.pattern.wrapping_add(1);
                    let payload = vec![self.pattern; size];
                    self.produce(o, id, &payload, BufferFlags::empty(), 0);
                }
            }
            (None, None) => {}
        }
    }

    fn reclaim(&mut self, port: u32, id: BufferId) {
        if let Ok(port) = self.port_mut(port) {
            if let Some(buffer) = port.buffers.get_mut(&id) {
                buffer.owner = Owner::Component;
                port.queue.push_back(id);
            }
        }
    }
}

struct Shared {
    id: ComponentId,
    name: String,
    faults: FakeFaults,
    callbacks: Arc<dyn Callbacks>,
    pool: Arc<ResourcePool>,
    notifier: Mutex<Sender<Msg>>,
    inner: Mutex<Inner>,
}

impl Shared {
    fn notify(&self) {
        // The worker only goes away when the component is dropped.
        let _ = self.notifier.lock().send(Msg::Notify);
    }

    fn sender(&self) -> Sender<Msg> {
        self.notifier.lock().clone()
    }

    fn set_state(&self, inner: &mut Inner, target: State) -> OmxResult<()> {
        if self.faults.ignore_state_commands {
            debug!("{}: ignoring StateSet({})", self.name, target);
            return Ok(());
        }
        if inner.pending.is_some() {
            return Err(OmxError::NotReady);
        }
        let current = inner.state;
        if current == target {
            inner.error(OmxError::SameState);
            return Ok(());
        }
        use State::*;
        match (current, target) {
            (_, Invalid) => {
                self.pool.cancel_wait(self.id);
                self.pool.release(self.id);
                inner.holds_resource = false;
                inner.state = Invalid;
                inner.error(OmxError::InvalidState);
            }
            (Loaded, WaitForResources) => {
                self.pool
                    .wait(self.id, inner.priority.group_priority, self.sender());
                inner.state = WaitForResources;
                inner.complete(CommandKind::StateSet, WaitForResources as u32);
            }
            (WaitForResources, Loaded) => {
                self.pool.cancel_wait(self.id);
                if inner.holds_resource {
                    self.pool.release(self.id);
                    inner.holds_resource = false;
                }
                inner.state = Loaded;
                inner.complete(CommandKind::StateSet, Loaded as u32);
            }
            (Loaded, Idle) | (WaitForResources, Idle) => {
                for pos in 0..inner.ports.len() {
                    if inner.ports[pos].definition.enabled {
                        inner.allocate_supplied(pos);
                    }
                }
                inner.pending = Some(Pending::ToIdleFromLoaded);
            }
            (Idle, Loaded) => {
                for pos in 0..inner.ports.len() {
                    inner.free_supplied(pos);
                }
                inner.pending = Some(Pending::ToLoaded);
            }
            (Idle, Executing) | (Idle, Pause) | (Executing, Pause) | (Pause, Executing) => {
                inner.state = target;
                inner.complete(CommandKind::StateSet, target as u32);
            }
            (Executing, Idle) | (Pause, Idle) => {
                for pos in 0..inner.ports.len() {
                    inner.return_queued(pos);
                }
                inner.pending = Some(Pending::ToIdleFromExecuting);
            }
            _ => inner.error(OmxError::IncorrectStateTransition),
        }
        Ok(())
    }

    fn disable_ports(&self, inner: &mut Inner, target: PortTarget) -> OmxResult<()> {
        for pos in inner.targets(target)? {
            let port = &mut inner.ports[pos];
            if !port.definition.enabled && port.pending.is_none() {
                let index = port.index();
                inner.complete(CommandKind::PortDisable, index);
                continue;
            }
            port.definition.enabled = false;
            port.pending = Some(PortPending::Disable);
            inner.return_queued(pos);
        }
        Ok(())
    }

    fn enable_ports(&self, inner: &mut Inner, target: PortTarget) -> OmxResult<()> {
        let loaded = matches!(inner.state, State::Loaded | State::WaitForResources)
            && inner.pending.is_none();
        for pos in inner.targets(target)? {
            let port = &mut inner.ports[pos];
            let index = port.index();
            if port.definition.enabled && port.pending.is_none() {
                inner.complete(CommandKind::PortEnable, index);
                continue;
            }
            port.definition.enabled = true;
            if loaded {
                port.pending = None;
                inner.complete(CommandKind::PortEnable, index);
            } else {
                port.pending = Some(PortPending::Enable);
            }
        }
        Ok(())
    }

    fn flush_ports(&self, inner: &mut Inner, target: PortTarget) -> OmxResult<()> {
        for pos in inner.targets(target)? {
            inner.return_queued(pos);
            let index = inner.ports[pos].index();
            inner.complete(CommandKind::Flush, index);
        }
        Ok(())
    }

    fn check_pending(&self, inner: &mut Inner) {
        for pos in 0..inner.ports.len() {
            match inner.ports[pos].pending {
                Some(PortPending::Disable) => {
                    if inner.ports[pos].tunnel.is_some() && !inner.ports[pos].at_peer() {
                        inner.free_supplied(pos);
                    }
                    if inner.ports[pos].buffers.is_empty() {
                        inner.ports[pos].pending = None;
                        let index = inner.ports[pos].index();
                        inner.complete(CommandKind::PortDisable, index);
                    }
                }
                Some(PortPending::Enable) => {
                    inner.allocate_supplied(pos);
                    if inner.ports[pos].populated() {
                        inner.ports[pos].pending = None;
                        let index = inner.ports[pos].index();
                        inner.complete(CommandKind::PortEnable, index);
                    }
                }
                None => {}
            }
        }

        match inner.pending {
            Some(Pending::ToIdleFromLoaded) => {
                let populated = inner
                    .ports
                    .iter()
                    .all(|p| !p.definition.enabled || p.populated());
                if !populated {
                    return;
                }
                inner.pending = None;
                if inner.holds_resource
                    || self
                        .pool
                        .acquire(self.id, inner.priority.group_priority, self.sender())
                {
                    self.pool.cancel_wait(self.id);
                    inner.holds_resource = true;
                    inner.state = State::Idle;
                    inner.complete(CommandKind::StateSet, State::Idle as u32);
                } else {
                    debug!("{}: no processing unit available", self.name);
                    for pos in 0..inner.ports.len() {
                        inner.free_supplied(pos);
                    }
                    inner.error(OmxError::InsufficientResources);
                }
            }
            Some(Pending::ToIdleFromExecuting) => {
                for pos in 0..inner.ports.len() {
                    inner.return_queued(pos);
                }
                if inner.ports.iter().any(|p| p.at_peer()) {
                    return;
                }
                inner.pending = None;
                inner.state = State::Idle;
                inner.complete(CommandKind::StateSet, State::Idle as u32);
            }
            Some(Pending::ToLoaded) => {
                if inner.ports.iter().any(|p| !p.buffers.is_empty()) {
                    return;
                }
                inner.pending = None;
                self.pool.release(self.id);
                inner.holds_resource = false;
                inner.state = State::Loaded;
                inner.complete(CommandKind::StateSet, State::Loaded as u32);
            }
            None => {}
        }
    }

    fn preempt(&self, inner: &mut Inner) {
        inner.holds_resource = false;
        if !matches!(inner.state, State::Idle | State::Executing | State::Pause) {
            return;
        }
        debug!("{}: preempted in {}", self.name, inner.state);
        inner.pending = None;
        for pos in 0..inner.ports.len() {
            inner.ports[pos].pending = None;
            inner.return_queued(pos);
            inner.free_supplied(pos);
        }
        inner.error(OmxError::ResourcesPreempted);
        inner.state = State::Loaded;
        inner.complete(CommandKind::StateSet, State::Loaded as u32);
    }

    fn resources_granted(&self, inner: &mut Inner) {
        if inner.state == State::WaitForResources {
            inner.holds_resource = true;
            inner
                .outbox
                .push(Outgoing::Event(ComponentEvent::ResourcesAcquired));
        } else {
            self.pool.release(self.id);
        }
    }

    fn deliver(&self, outgoing: Vec<Outgoing>) {
        for item in outgoing {
            match item {
                Outgoing::Event(event) => self.callbacks.event_handler(self.id, event),
                Outgoing::EmptyBufferDone(header) => {
                    self.callbacks.empty_buffer_done(self.id, header)
                }
                Outgoing::FillBufferDone(header) => {
                    self.callbacks.fill_buffer_done(self.id, header)
                }
                Outgoing::ToPeer { peer, header, data } => {
                    let result = match peer.component.upgrade() {
                        Some(component) => {
                            component.empty_this_buffer(&header, &data, header.flags)
                        }
                        None => Err(OmxError::InvalidComponent),
                    };
                    if let Err(e) = result {
                        warn!(
                            "{}: tunnel peer refused buffer {}: {}",
                            self.name, header.id, e
                        );
                        self.inner
                            .lock()
                            .reclaim(header.output_port_index, header.id);
                    }
                }
            }
        }
    }

    fn run(&self, rx: Receiver<Msg>) {
        while let Ok(msg) = rx.recv() {
            let outgoing = {
                let mut inner = self.inner.lock();
                match msg {
                    Msg::Shutdown => break,
                    Msg::Notify => {}
                    Msg::Preempt => self.preempt(&mut inner),
                    Msg::ResourcesGranted => self.resources_granted(&mut inner),
                }
                inner.pump(&self.faults);
                self.check_pending(&mut inner);
                inner.pump(&self.faults);
                std::mem::take(&mut inner.outbox)
            };
            self.deliver(outgoing);
        }
    }
}

/// A component of [`FakeCore`](super::FakeCore).
///
/// Calls validate and update the component synchronously; every callback, and all buffer
/// processing, happens on a dedicated worker thread.
pub struct FakeComponent {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl FakeComponent {
    pub(super) fn new(
        id: ComponentId,
        name: &str,
        spec: &FakeSpec,
        callbacks: Arc<dyn Callbacks>,
        pool: Arc<ResourcePool>,
    ) -> io::Result<FakeComponent> {
        // Ports of one domain get a contiguous range of indices.
        let mut ports = Vec::new();
        for domain in PortDomain::ALL {
            for port in spec.ports.iter().filter(|p| p.domain == domain) {
                ports.push(Port::new(ports.len() as u32, port));
            }
        }
        let (tx, rx) = channel();
        let shared = Arc::new(Shared {
            id,
            name: name.to_owned(),
            faults: spec.faults,
            callbacks,
            pool,
            notifier: Mutex::new(tx),
            inner: Mutex::new(Inner {
                state: State::Loaded,
                pending: None,
                ports,
                priority: PriorityMgmt::default(),
                holds_resource: false,
                next_buffer: 0,
                pattern: 0,
                outbox: Vec::new(),
            }),
        });
        let worker = thread::Builder::new()
            .name(format!("fake_omx_{}", id.0))
            .spawn({
                let shared = Arc::clone(&shared);
                move || shared.run(rx)
            })?;
        Ok(FakeComponent {
            shared,
            worker: Some(worker),
        })
    }

    fn add_buffer(&self, request: &BufferRequest) -> OmxResult<BufferHeader> {
        let mut inner = self.shared.inner.lock();
        let populating = inner.pending == Some(Pending::ToIdleFromLoaded);
        let id = inner.buffer_id();
        let port = inner.port_mut(request.port)?;
        if port.tunnel.is_some() {
            return Err(OmxError::IncorrectStateOperation);
        }
        let allowed = (populating && port.definition.enabled)
            || port.pending == Some(PortPending::Enable);
        if !allowed || port.populated() {
            return Err(OmxError::IncorrectStateOperation);
        }
        if request.size < port.definition.buffer_size {
            return Err(OmxError::BadParameter);
        }
        let header = BufferHeader::new(id, port.index(), port.definition.direction, request.size);
        port.buffers.insert(
            id,
            FakeBuffer {
                header,
                data: vec![0; request.size as usize],
                owner: Owner::Client,
                supplied: false,
            },
        );
        drop(inner);
        self.shared.notify();
        Ok(header)
    }
}

impl Component for FakeComponent {
    fn id(&self) -> ComponentId {
        self.shared.id
    }

    fn name(&self) -> &str {
        &self.shared.name
    }

    fn get_state(&self) -> OmxResult<State> {
        Ok(self.shared.inner.lock().state)
    }

    fn send_command(&self, command: Command) -> OmxResult<()> {
        debug!("{}: SendCommand {}", self.shared.name, command);
        let mut inner = self.shared.inner.lock();
        if inner.state == State::Invalid {
            return Err(OmxError::InvalidState);
        }
        match command {
            Command::StateSet(target) => self.shared.set_state(&mut inner, target)?,
            Command::Flush(target) => self.shared.flush_ports(&mut inner, target)?,
            Command::PortDisable(target) => self.shared.disable_ports(&mut inner, target)?,
            Command::PortEnable(target) => self.shared.enable_ports(&mut inner, target)?,
            Command::MarkBuffer(_) => return Err(OmxError::NotImplemented),
        }
        drop(inner);
        self.shared.notify();
        Ok(())
    }

    fn port_param(&self, domain: PortDomain) -> OmxResult<PortParam> {
        let inner = self.shared.inner.lock();
        let mut indices = inner
            .ports
            .iter()
            .filter(|p| p.definition.domain == domain)
            .map(|p| p.index());
        Ok(match indices.next() {
            Some(start) => PortParam {
                start,
                count: 1 + indices.count() as u32,
            },
            None => PortParam::default(),
        })
    }

    fn port_definition(&self, port: u32) -> OmxResult<PortDefinition> {
        let inner = self.shared.inner.lock();
        let pos = inner.position(port)?;
        Ok(inner.ports[pos].snapshot())
    }

    fn set_port_definition(&self, definition: &PortDefinition) -> OmxResult<()> {
        let mut inner = self.shared.inner.lock();
        let loaded = inner.state == State::Loaded && inner.pending.is_none();
        let port = inner.port_mut(definition.index)?;
        if !loaded && port.definition.enabled {
            return Err(OmxError::IncorrectStateOperation);
        }
        if definition.buffer_count_actual < port.definition.buffer_count_min
            || definition.buffer_size < port.min_buffer_size
        {
            return Err(OmxError::BadParameter);
        }
        port.definition.buffer_count_actual = definition.buffer_count_actual;
        port.definition.buffer_size = definition.buffer_size;
        Ok(())
    }

    fn priority(&self) -> OmxResult<PriorityMgmt> {
        Ok(self.shared.inner.lock().priority)
    }

    fn set_priority(&self, priority: PriorityMgmt) -> OmxResult<()> {
        let mut inner = self.shared.inner.lock();
        inner.priority = priority;
        self.shared
            .pool
            .set_priority(self.shared.id, priority.group_priority);
        Ok(())
    }

    fn use_buffer(&self, request: &BufferRequest) -> OmxResult<BufferHeader> {
        self.add_buffer(request)
    }

    fn allocate_buffer(&self, request: &BufferRequest) -> OmxResult<BufferHeader> {
        self.add_buffer(request)
    }

    fn free_buffer(&self, port: u32, buffer: BufferId) -> OmxResult<()> {
        let mut inner = self.shared.inner.lock();
        let port = inner.port_mut(port)?;
        match port.buffers.get(&buffer) {
            Some(b) if !b.supplied => {}
            _ => return Err(OmxError::BadParameter),
        }
        port.buffers.remove(&buffer);
        port.queue.retain(|id| *id != buffer);
        drop(inner);
        self.shared.notify();
        Ok(())
    }

    fn empty_this_buffer(
        &self,
        header: &BufferHeader,
        payload: &[u8],
        flags: BufferFlags,
    ) -> OmxResult<()> {
        let mut inner = self.shared.inner.lock();
        let state = inner.state;
        let port = inner.port_mut(header.input_port_index)?;
        if port.definition.direction != Direction::Input {
            return Err(OmxError::BadPortIndex);
        }
        if !matches!(state, State::Executing | State::Pause) || !port.definition.enabled {
            return Err(OmxError::IncorrectStateOperation);
        }
        let buffer = port
            .buffers
            .get_mut(&header.id)
            .ok_or(OmxError::BadParameter)?;
        if buffer.owner != Owner::Client {
            return Err(OmxError::IncorrectStateOperation);
        }
        if payload.len() > buffer.data.len() {
            return Err(OmxError::BadParameter);
        }
        buffer.data[..payload.len()].copy_from_slice(payload);
        buffer.header.filled_len = payload.len() as u32;
        buffer.header.offset = 0;
        buffer.header.flags = flags;
        buffer.header.timestamp = header.timestamp;
        buffer.owner = Owner::Component;
        port.queue.push_back(header.id);
        drop(inner);
        self.shared.notify();
        Ok(())
    }

    fn fill_this_buffer(&self, header: &BufferHeader) -> OmxResult<()> {
        let mut inner = self.shared.inner.lock();
        let state = inner.state;
        let port = inner.port_mut(header.output_port_index)?;
        if port.definition.direction != Direction::Output {
            return Err(OmxError::BadPortIndex);
        }
        let supplied = port.buffers.get(&header.id).map(|b| b.supplied);
        if supplied != Some(true)
            && (!matches!(state, State::Executing | State::Pause) || !port.definition.enabled)
        {
            return Err(OmxError::IncorrectStateOperation);
        }
        let buffer = port
            .buffers
            .get_mut(&header.id)
            .ok_or(OmxError::BadParameter)?;
        let expected = if buffer.supplied {
            Owner::Peer
        } else {
            Owner::Client
        };
        if buffer.owner != expected {
            return Err(OmxError::IncorrectStateOperation);
        }
        buffer.header.filled_len = 0;
        buffer.header.offset = 0;
        buffer.header.flags = BufferFlags::empty();
        buffer.owner = Owner::Component;
        port.queue.push_back(header.id);
        drop(inner);
        self.shared.notify();
        Ok(())
    }

    fn tunnel_request(&self, port: u32, peer: Option<TunnelPeer>) -> OmxResult<()> {
        let mut inner = self.shared.inner.lock();
        let loaded = inner.state == State::Loaded && inner.pending.is_none();
        let port = inner.port_mut(port)?;
        if port.definition.direction != Direction::Output {
            return Err(OmxError::TunnelingUnsupported);
        }
        if !loaded && port.definition.enabled {
            return Err(OmxError::IncorrectStateOperation);
        }
        if !port.buffers.is_empty() {
            return Err(OmxError::IncorrectStateOperation);
        }
        port.tunnel = peer;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for FakeComponent {
    fn drop(&mut self) {
        let _ = self.shared.notifier.lock().send(Msg::Shutdown);
        if let Some(worker) = self.worker.take() {
            // The last reference may be released by a tunnel peer running on the worker itself.
            if worker.thread().id() != thread::current().id() && worker.join().is_err() {
                error!("{}: worker thread panicked", self.shared.name);
            }
        }
        self.shared.pool.cancel_wait(self.shared.id);
        self.shared.pool.release(self.shared.id);
    }
}
