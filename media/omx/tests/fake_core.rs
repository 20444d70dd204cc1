// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::any::Any;
use std::sync::mpsc::channel;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;

use omx::fake::FakeCore;
use omx::fake::FakeFaults;
use omx::fake::FakeSpec;
use omx::fake::PASSTHROUGH;
use omx::*;
use sync::Mutex;

const TIMEOUT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(200);

#[derive(Debug)]
enum Seen {
    Event(ComponentEvent),
    Empty(BufferHeader),
    Fill(BufferHeader),
}

struct Recorder {
    tx: Mutex<Sender<Seen>>,
}

impl Callbacks for Recorder {
    fn event_handler(&self, _component: ComponentId, event: ComponentEvent) {
        let _ = self.tx.lock().send(Seen::Event(event));
    }

    fn empty_buffer_done(&self, _component: ComponentId, header: BufferHeader) {
        let _ = self.tx.lock().send(Seen::Empty(header));
    }

    fn fill_buffer_done(&self, _component: ComponentId, header: BufferHeader) {
        let _ = self.tx.lock().send(Seen::Fill(header));
    }
}

fn open(core: &FakeCore, name: &str) -> (Arc<dyn Component>, Receiver<Seen>) {
    let (tx, rx) = channel();
    let recorder = Arc::new(Recorder { tx: Mutex::new(tx) });
    (core.get_handle(name, recorder).unwrap(), rx)
}

fn next_event(rx: &Receiver<Seen>) -> ComponentEvent {
    loop {
        match rx.recv_timeout(TIMEOUT).expect("no event") {
            Seen::Event(event) => return event,
            _ => continue,
        }
    }
}

fn state_complete(state: State) -> ComponentEvent {
    ComponentEvent::CmdComplete {
        command: CommandKind::StateSet,
        data: state as u32,
    }
}

/// Allocates every buffer the component asks for and returns (input, output) headers.
fn populate(component: &Arc<dyn Component>) -> (Vec<BufferHeader>, Vec<BufferHeader>) {
    let mut inputs = Vec::new();
    let mut outputs = Vec::new();
    let param = component.port_param(PortDomain::Audio).unwrap();
    for port in param.ports() {
        let def = component.port_definition(port).unwrap();
        // Tunneled ports are populated by the component itself.
        if def.populated {
            continue;
        }
        for _ in 0..def.buffer_count_actual {
            let header = component
                .use_buffer(&BufferRequest {
                    port,
                    size: def.buffer_size,
                    alignment: def.buffer_alignment,
                    contiguous: false,
                })
                .unwrap();
            match def.direction {
                Direction::Input => inputs.push(header),
                Direction::Output => outputs.push(header),
            }
        }
    }
    (inputs, outputs)
}

fn to_idle(
    component: &Arc<dyn Component>,
    rx: &Receiver<Seen>,
) -> (Vec<BufferHeader>, Vec<BufferHeader>) {
    component
        .send_command(Command::StateSet(State::Idle))
        .unwrap();
    let buffers = populate(component);
    assert_eq!(next_event(rx), state_complete(State::Idle));
    buffers
}

fn free_all(component: &Arc<dyn Component>, headers: &[BufferHeader]) {
    for header in headers {
        let (_, port) = header.port().unwrap();
        component.free_buffer(port, header.id).unwrap();
    }
}

#[test]
fn enumerates_catalogue() {
    let core = FakeCore::default();
    let names = core.component_names().unwrap();
    assert!(names.iter().any(|n| n == PASSTHROUGH));
    let recorder = Arc::new(Recorder {
        tx: Mutex::new(channel().0),
    });
    assert!(matches!(
        core.get_handle("OMX.nope", recorder),
        Err(OmxError::ComponentNotFound)
    ));
}

#[test]
fn ports_are_grouped_by_domain() {
    let core = FakeCore::default();
    let (component, _rx) = open(&core, PASSTHROUGH);
    assert_eq!(
        component.port_param(PortDomain::Audio).unwrap(),
        PortParam { start: 0, count: 2 }
    );
    assert_eq!(component.port_param(PortDomain::Video).unwrap().count, 0);
    let input = component.port_definition(0).unwrap();
    assert_eq!(input.direction, Direction::Input);
    assert!(input.enabled);
    assert!(!input.populated);
    assert_eq!(component.port_definition(7), Err(OmxError::BadPortIndex));
}

#[test]
fn idle_waits_for_population() {
    let core = FakeCore::default();
    let (component, rx) = open(&core, PASSTHROUGH);
    component
        .send_command(Command::StateSet(State::Idle))
        .unwrap();
    assert!(rx.recv_timeout(QUIET).is_err());
    assert_eq!(component.get_state().unwrap(), State::Loaded);

    let (inputs, outputs) = populate(&component);
    assert_eq!(next_event(&rx), state_complete(State::Idle));
    assert_eq!(core.resources_in_use(), 1);

    component
        .send_command(Command::StateSet(State::Loaded))
        .unwrap();
    free_all(&component, &inputs);
    free_all(&component, &outputs);
    assert_eq!(next_event(&rx), state_complete(State::Loaded));
    assert_eq!(core.resources_in_use(), 0);
}

#[test]
fn invalid_transitions_report_errors() {
    let core = FakeCore::default();
    let (component, rx) = open(&core, PASSTHROUGH);
    component
        .send_command(Command::StateSet(State::Loaded))
        .unwrap();
    assert_eq!(
        next_event(&rx),
        ComponentEvent::Error {
            error: OmxError::SameState,
            data: 0
        }
    );
    component
        .send_command(Command::StateSet(State::Executing))
        .unwrap();
    assert_eq!(
        next_event(&rx),
        ComponentEvent::Error {
            error: OmxError::IncorrectStateTransition,
            data: 0
        }
    );
    assert_eq!(component.get_state().unwrap(), State::Loaded);
}

#[test]
fn passthrough_copies_and_propagates_eos() {
    let core = FakeCore::default();
    let (component, rx) = open(&core, PASSTHROUGH);
    let (inputs, outputs) = to_idle(&component, &rx);
    component
        .send_command(Command::StateSet(State::Executing))
        .unwrap();
    assert_eq!(next_event(&rx), state_complete(State::Executing));

    component.fill_this_buffer(&outputs[0]).unwrap();
    component
        .empty_this_buffer(&inputs[0], &[7u8; 10], BufferFlags::EOS)
        .unwrap();

    let mut emptied = None;
    let mut filled = None;
    let mut flagged = false;
    while emptied.is_none() || filled.is_none() || !flagged {
        match rx.recv_timeout(TIMEOUT).unwrap() {
            Seen::Empty(h) => emptied = Some(h),
            Seen::Fill(h) => filled = Some(h),
            Seen::Event(ComponentEvent::BufferFlag { port, flags }) => {
                assert_eq!(port, 1);
                assert!(flags.contains(BufferFlags::EOS));
                flagged = true;
            }
            Seen::Event(e) => panic!("unexpected event {:?}", e),
        }
    }
    assert_eq!(emptied.unwrap().id, inputs[0].id);
    let filled = filled.unwrap();
    assert_eq!(filled.id, outputs[0].id);
    assert_eq!(filled.filled_len, 10);
    assert!(filled.flags.contains(BufferFlags::EOS));
    assert_eq!(filled.port(), Some((Direction::Output, 1)));
}

#[test]
fn disabled_port_rejects_buffers() {
    let core = FakeCore::default();
    let (component, rx) = open(&core, PASSTHROUGH);
    let (inputs, outputs) = to_idle(&component, &rx);
    component
        .send_command(Command::StateSet(State::Executing))
        .unwrap();
    assert_eq!(next_event(&rx), state_complete(State::Executing));

    component
        .send_command(Command::PortDisable(PortTarget::All))
        .unwrap();
    assert_eq!(
        component.empty_this_buffer(&inputs[0], &[1], BufferFlags::empty()),
        Err(OmxError::IncorrectStateOperation)
    );
    free_all(&component, &inputs);
    free_all(&component, &outputs);
    let mut disabled = Vec::new();
    while disabled.len() < 2 {
        if let ComponentEvent::CmdComplete {
            command: CommandKind::PortDisable,
            data,
        } = next_event(&rx)
        {
            disabled.push(data);
        }
    }
    disabled.sort();
    assert_eq!(disabled, vec![0, 1]);
    assert_eq!(
        component.fill_this_buffer(&outputs[0]),
        Err(OmxError::IncorrectStateOperation)
    );
}

#[test]
fn pause_holds_buffers_until_resume() {
    let core = FakeCore::default();
    let (component, rx) = open(&core, PASSTHROUGH);
    let (inputs, outputs) = to_idle(&component, &rx);
    component
        .send_command(Command::StateSet(State::Executing))
        .unwrap();
    assert_eq!(next_event(&rx), state_complete(State::Executing));
    component
        .send_command(Command::StateSet(State::Pause))
        .unwrap();
    assert_eq!(next_event(&rx), state_complete(State::Pause));

    component.fill_this_buffer(&outputs[0]).unwrap();
    component
        .empty_this_buffer(&inputs[0], &[1, 2, 3], BufferFlags::empty())
        .unwrap();
    assert!(rx.recv_timeout(QUIET).is_err());

    component
        .send_command(Command::StateSet(State::Executing))
        .unwrap();
    let mut done = 0;
    while done < 2 {
        match rx.recv_timeout(TIMEOUT).unwrap() {
            Seen::Empty(_) | Seen::Fill(_) => done += 1,
            Seen::Event(_) => {}
        }
    }
}

#[test]
fn capacity_exhaustion_keeps_loaded() {
    let core = FakeCore::new(1);
    let (first, first_rx) = open(&core, PASSTHROUGH);
    let _first_buffers = to_idle(&first, &first_rx);

    let (second, second_rx) = open(&core, PASSTHROUGH);
    second
        .send_command(Command::StateSet(State::Idle))
        .unwrap();
    let (inputs, outputs) = populate(&second);
    assert_eq!(
        next_event(&second_rx),
        ComponentEvent::Error {
            error: OmxError::InsufficientResources,
            data: 0
        }
    );
    assert_eq!(second.get_state().unwrap(), State::Loaded);
    free_all(&second, &inputs);
    free_all(&second, &outputs);
}

#[test]
fn higher_priority_preempts() {
    let core = FakeCore::new(1);
    let (victim, victim_rx) = open(&core, PASSTHROUGH);
    victim
        .set_priority(PriorityMgmt {
            group_priority: 10,
            group_id: 1,
        })
        .unwrap();
    let _victim_buffers = to_idle(&victim, &victim_rx);

    let (winner, winner_rx) = open(&core, PASSTHROUGH);
    winner
        .set_priority(PriorityMgmt {
            group_priority: 1,
            group_id: 2,
        })
        .unwrap();
    let _winner_buffers = to_idle(&winner, &winner_rx);

    assert_eq!(
        next_event(&victim_rx),
        ComponentEvent::Error {
            error: OmxError::ResourcesPreempted,
            data: 0
        }
    );
    assert_eq!(next_event(&victim_rx), state_complete(State::Loaded));
    assert_eq!(victim.get_state().unwrap(), State::Loaded);
    assert_eq!(core.resources_in_use(), 1);
}

#[test]
fn waiting_component_acquires_released_resource() {
    let core = FakeCore::new(1);
    let (holder, holder_rx) = open(&core, PASSTHROUGH);
    let (holder_in, holder_out) = to_idle(&holder, &holder_rx);

    let (waiter, waiter_rx) = open(&core, PASSTHROUGH);
    waiter
        .send_command(Command::StateSet(State::WaitForResources))
        .unwrap();
    assert_eq!(
        next_event(&waiter_rx),
        state_complete(State::WaitForResources)
    );

    holder
        .send_command(Command::StateSet(State::Loaded))
        .unwrap();
    free_all(&holder, &holder_in);
    free_all(&holder, &holder_out);
    assert_eq!(next_event(&holder_rx), state_complete(State::Loaded));
    assert_eq!(next_event(&waiter_rx), ComponentEvent::ResourcesAcquired);

    let _ = to_idle(&waiter, &waiter_rx);
    assert_eq!(waiter.get_state().unwrap(), State::Idle);
}

#[test]
fn duplicate_returns_fault() {
    let faults = FakeFaults {
        duplicate_returns: true,
        ..Default::default()
    };
    let core = FakeCore::default()
        .with_component("OMX.fake.dup", FakeSpec::sink(PortDomain::Audio).with_faults(faults));
    let (component, rx) = open(&core, "OMX.fake.dup");
    let param = component.port_param(PortDomain::Audio).unwrap();
    assert_eq!(param.count, 1);
    let (inputs, _) = to_idle(&component, &rx);
    component
        .send_command(Command::StateSet(State::Executing))
        .unwrap();
    assert_eq!(next_event(&rx), state_complete(State::Executing));
    component
        .empty_this_buffer(&inputs[0], &[0; 4], BufferFlags::empty())
        .unwrap();
    let mut returns = 0;
    while let Ok(seen) = rx.recv_timeout(QUIET) {
        if let Seen::Empty(h) = seen {
            assert_eq!(h.id, inputs[0].id);
            returns += 1;
        }
    }
    assert_eq!(returns, 2);
}

/// Minimal non-supplier peer that keeps every buffer it receives.
struct Holder {
    id: ComponentId,
    received: Mutex<Vec<BufferHeader>>,
}

impl Component for Holder {
    fn id(&self) -> ComponentId {
        self.id
    }

    fn name(&self) -> &str {
        "holder"
    }

    fn get_state(&self) -> OmxResult<State> {
        Ok(State::Executing)
    }

    fn send_command(&self, _command: Command) -> OmxResult<()> {
        Ok(())
    }

    fn port_param(&self, _domain: PortDomain) -> OmxResult<PortParam> {
        Ok(PortParam::default())
    }

    fn port_definition(&self, _port: u32) -> OmxResult<PortDefinition> {
        Err(OmxError::NotImplemented)
    }

    fn set_port_definition(&self, _definition: &PortDefinition) -> OmxResult<()> {
        Err(OmxError::NotImplemented)
    }

    fn priority(&self) -> OmxResult<PriorityMgmt> {
        Ok(PriorityMgmt::default())
    }

    fn set_priority(&self, _priority: PriorityMgmt) -> OmxResult<()> {
        Ok(())
    }

    fn use_buffer(&self, _request: &BufferRequest) -> OmxResult<BufferHeader> {
        Err(OmxError::NotImplemented)
    }

    fn allocate_buffer(&self, _request: &BufferRequest) -> OmxResult<BufferHeader> {
        Err(OmxError::NotImplemented)
    }

    fn free_buffer(&self, _port: u32, _buffer: BufferId) -> OmxResult<()> {
        Err(OmxError::NotImplemented)
    }

    fn empty_this_buffer(
        &self,
        header: &BufferHeader,
        _payload: &[u8],
        _flags: BufferFlags,
    ) -> OmxResult<()> {
        self.received.lock().push(*header);
        Ok(())
    }

    fn fill_this_buffer(&self, _header: &BufferHeader) -> OmxResult<()> {
        Err(OmxError::NotImplemented)
    }

    fn tunnel_request(&self, _port: u32, _peer: Option<TunnelPeer>) -> OmxResult<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[test]
fn tunneled_output_waits_for_peer_before_idle() {
    let core = FakeCore::default();
    let (component, rx) = open(&core, PASSTHROUGH);
    let holder = Arc::new(Holder {
        id: ComponentId(999),
        received: Mutex::new(Vec::new()),
    });
    let peer: Arc<dyn Component> = holder.clone();
    core.setup_tunnel(&component, 1, &peer, 0).unwrap();
    assert_eq!(
        core.setup_tunnel(&peer, 0, &component, 0),
        Err(OmxError::TunnelingUnsupported)
    );

    // Only the input port needs client buffers.
    let (inputs, outputs) = to_idle(&component, &rx);
    assert!(outputs.is_empty());
    component
        .send_command(Command::StateSet(State::Executing))
        .unwrap();
    assert_eq!(next_event(&rx), state_complete(State::Executing));
    component
        .empty_this_buffer(&inputs[0], &[5; 8], BufferFlags::empty())
        .unwrap();
    loop {
        if let Seen::Empty(_) = rx.recv_timeout(TIMEOUT).unwrap() {
            break;
        }
    }
    for _ in 0..100 {
        if !holder.received.lock().is_empty() {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(holder.received.lock().len(), 1);

    component
        .send_command(Command::StateSet(State::Idle))
        .unwrap();
    assert!(rx.recv_timeout(QUIET).is_err());
    assert_eq!(component.get_state().unwrap(), State::Executing);

    let held = std::mem::take(&mut *holder.received.lock());
    for mut header in held {
        header.input_port_index = NO_PORT;
        component.fill_this_buffer(&header).unwrap();
    }
    assert_eq!(next_event(&rx), state_complete(State::Idle));
}
