// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Typed counterparts of the enumerations and parameter structures of the component ABI.

use std::fmt;
use std::fmt::Display;

use bitflags::bitflags;
use enumn::N;
use omx_sys::*;
use serde::Deserialize;
use serde::Serialize;

use crate::error::OmxError;

/// Port index meaning "no port".
pub const NO_PORT: u32 = OMX_NOPORT;
/// Port index meaning "all ports".
pub const ALL_PORTS: u32 = OMX_ALL;

/// Lifecycle state of a component.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, N, Serialize, Deserialize)]
#[repr(u32)]
pub enum State {
    Invalid = OMX_StateInvalid,
    Loaded = OMX_StateLoaded,
    Idle = OMX_StateIdle,
    Executing = OMX_StateExecuting,
    Pause = OMX_StatePause,
    WaitForResources = OMX_StateWaitForResources,
}

impl Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use self::State::*;
        match self {
            Invalid => write!(f, "Invalid"),
            Loaded => write!(f, "Loaded"),
            Idle => write!(f, "Idle"),
            Executing => write!(f, "Executing"),
            Pause => write!(f, "Pause"),
            WaitForResources => write!(f, "WaitForResources"),
        }
    }
}

/// Selects one port or every port of a component.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PortTarget {
    Port(u32),
    All,
}

impl PortTarget {
    pub fn raw(self) -> u32 {
        match self {
            PortTarget::Port(index) => index,
            PortTarget::All => ALL_PORTS,
        }
    }

    pub fn from_raw(raw: u32) -> PortTarget {
        if raw == ALL_PORTS {
            PortTarget::All
        } else {
            PortTarget::Port(raw)
        }
    }

    /// Returns true if `port` is addressed by this target.
    pub fn covers(self, port: u32) -> bool {
        match self {
            PortTarget::Port(index) => index == port,
            PortTarget::All => true,
        }
    }
}

impl Display for PortTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortTarget::Port(index) => write!(f, "port {}", index),
            PortTarget::All => write!(f, "all ports"),
        }
    }
}

/// The command field of `OMX_SendCommand` and of command-complete events.
#[derive(Copy, Clone, Debug, PartialEq, Eq, N)]
#[repr(u32)]
pub enum CommandKind {
    StateSet = OMX_CommandStateSet,
    Flush = OMX_CommandFlush,
    PortDisable = OMX_CommandPortDisable,
    PortEnable = OMX_CommandPortEnable,
    MarkBuffer = OMX_CommandMarkBuffer,
}

/// A command together with its parameter.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    StateSet(State),
    Flush(PortTarget),
    PortDisable(PortTarget),
    PortEnable(PortTarget),
    MarkBuffer(u32),
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::StateSet(_) => CommandKind::StateSet,
            Command::Flush(_) => CommandKind::Flush,
            Command::PortDisable(_) => CommandKind::PortDisable,
            Command::PortEnable(_) => CommandKind::PortEnable,
            Command::MarkBuffer(_) => CommandKind::MarkBuffer,
        }
    }

    /// Returns the `nParam1` value passed alongside the command.
    pub fn param(&self) -> u32 {
        match self {
            Command::StateSet(state) => *state as u32,
            Command::Flush(target) | Command::PortDisable(target) | Command::PortEnable(target) => {
                target.raw()
            }
            Command::MarkBuffer(port) => *port,
        }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::StateSet(state) => write!(f, "StateSet({})", state),
            Command::Flush(target) => write!(f, "Flush({})", target),
            Command::PortDisable(target) => write!(f, "PortDisable({})", target),
            Command::PortEnable(target) => write!(f, "PortEnable({})", target),
            Command::MarkBuffer(port) => write!(f, "MarkBuffer({})", port),
        }
    }
}

/// The four port domains, each with its own contiguous range of port indices.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, N, Serialize, Deserialize)]
#[repr(u32)]
#[serde(rename_all = "snake_case")]
pub enum PortDomain {
    Audio = OMX_PortDomainAudio,
    Video = OMX_PortDomainVideo,
    Image = OMX_PortDomainImage,
    Other = OMX_PortDomainOther,
}

impl PortDomain {
    pub const ALL: [PortDomain; 4] = [
        PortDomain::Audio,
        PortDomain::Video,
        PortDomain::Image,
        PortDomain::Other,
    ];

    /// The parameter index that reports the port range of this domain.
    pub fn init_index(self) -> OMX_INDEXTYPE {
        match self {
            PortDomain::Audio => OMX_IndexParamAudioInit,
            PortDomain::Video => OMX_IndexParamVideoInit,
            PortDomain::Image => OMX_IndexParamImageInit,
            PortDomain::Other => OMX_IndexParamOtherInit,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, N, Serialize, Deserialize)]
#[repr(u32)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Input = OMX_DirInput,
    Output = OMX_DirOutput,
}

impl Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}

/// The range of port indices belonging to one domain.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PortParam {
    pub start: u32,
    pub count: u32,
}

impl PortParam {
    pub fn ports(&self) -> std::ops::Range<u32> {
        self.start..self.start.saturating_add(self.count)
    }
}

/// The fields of `OMX_PARAM_PORTDEFINITIONTYPE` the conformance driver reads or changes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PortDefinition {
    pub index: u32,
    pub direction: Direction,
    pub domain: PortDomain,
    pub buffer_count_actual: u32,
    pub buffer_count_min: u32,
    pub buffer_size: u32,
    pub enabled: bool,
    pub populated: bool,
    pub buffers_contiguous: bool,
    pub buffer_alignment: u32,
}

/// `OMX_PRIORITYMGMTTYPE`. A lower group priority number means a higher priority.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PriorityMgmt {
    pub group_priority: u32,
    pub group_id: u32,
}

bitflags! {
    /// `nFlags` of a buffer header.
    #[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
    #[repr(transparent)]
    pub struct BufferFlags: u32 {
        const EOS = OMX_BUFFERFLAG_EOS;
        const START_TIME = OMX_BUFFERFLAG_STARTTIME;
        const DECODE_ONLY = OMX_BUFFERFLAG_DECODEONLY;
        const DATA_CORRUPT = OMX_BUFFERFLAG_DATACORRUPT;
        const END_OF_FRAME = OMX_BUFFERFLAG_ENDOFFRAME;
        const SYNC_FRAME = OMX_BUFFERFLAG_SYNCFRAME;
        const EXTRADATA = OMX_BUFFERFLAG_EXTRADATA;
        const CODEC_CONFIG = OMX_BUFFERFLAG_CODECCONFIG;
    }
}

/// Identity of a component instance, used to match callbacks to the handle that produced them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub u64);

impl Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Stable identity of a buffer header for as long as it stays allocated.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

impl Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A value snapshot of `OMX_BUFFERHEADERTYPE` as seen at allocation or at a buffer-done callback.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BufferHeader {
    pub id: BufferId,
    pub alloc_len: u32,
    pub filled_len: u32,
    pub offset: u32,
    pub flags: BufferFlags,
    pub timestamp: i64,
    pub input_port_index: u32,
    pub output_port_index: u32,
}

impl BufferHeader {
    /// Creates an empty header for `port`, with the index of the unused direction set to
    /// `NO_PORT`.
    pub fn new(id: BufferId, port: u32, direction: Direction, alloc_len: u32) -> BufferHeader {
        let (input_port_index, output_port_index) = match direction {
            Direction::Input => (port, NO_PORT),
            Direction::Output => (NO_PORT, port),
        };
        BufferHeader {
            id,
            alloc_len,
            filled_len: 0,
            offset: 0,
            flags: BufferFlags::empty(),
            timestamp: 0,
            input_port_index,
            output_port_index,
        }
    }

    /// Returns the direction and port this header belongs to, or `None` unless exactly one of
    /// the two port index fields is set.
    pub fn port(&self) -> Option<(Direction, u32)> {
        match (
            self.input_port_index == NO_PORT,
            self.output_port_index == NO_PORT,
        ) {
            (false, true) => Some((Direction::Input, self.input_port_index)),
            (true, false) => Some((Direction::Output, self.output_port_index)),
            _ => None,
        }
    }
}

/// How a buffer for `UseBuffer`/`AllocateBuffer` should be created.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BufferRequest {
    pub port: u32,
    pub size: u32,
    pub alignment: u32,
    pub contiguous: bool,
}

/// A callback event decoded from the raw `EventHandler` arguments.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ComponentEvent {
    /// A command finished. `data` is the new state for `StateSet` and the port otherwise.
    CmdComplete { command: CommandKind, data: u32 },
    /// The component reports an error. `data` is event specific.
    Error { error: OmxError, data: u32 },
    Mark,
    PortSettingsChanged { port: u32 },
    BufferFlag { port: u32, flags: BufferFlags },
    ResourcesAcquired,
    /// Any event the driver does not interpret.
    Other { kind: u32, data1: u32, data2: u32 },
}

impl ComponentEvent {
    /// Decodes the `eEvent`, `nData1` and `nData2` arguments of `EventHandler`.
    pub fn from_raw(kind: OMX_EVENTTYPE, data1: u32, data2: u32) -> ComponentEvent {
        match kind {
            OMX_EventCmdComplete => match CommandKind::n(data1) {
                Some(command) => ComponentEvent::CmdComplete {
                    command,
                    data: data2,
                },
                None => ComponentEvent::Other { kind, data1, data2 },
            },
            OMX_EventError => ComponentEvent::Error {
                error: OmxError::from_raw(data1),
                data: data2,
            },
            OMX_EventMark => ComponentEvent::Mark,
            OMX_EventPortSettingsChanged => ComponentEvent::PortSettingsChanged { port: data1 },
            OMX_EventBufferFlag => ComponentEvent::BufferFlag {
                port: data1,
                flags: BufferFlags::from_bits_retain(data2),
            },
            OMX_EventResourcesAcquired => ComponentEvent::ResourcesAcquired,
            _ => ComponentEvent::Other { kind, data1, data2 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_port_requires_exactly_one_direction() {
        let input = BufferHeader::new(BufferId(1), 0, Direction::Input, 16);
        assert_eq!(input.port(), Some((Direction::Input, 0)));
        let output = BufferHeader::new(BufferId(2), 1, Direction::Output, 16);
        assert_eq!(output.port(), Some((Direction::Output, 1)));

        let mut both = input;
        both.output_port_index = 1;
        assert_eq!(both.port(), None);
        let mut neither = input;
        neither.input_port_index = NO_PORT;
        assert_eq!(neither.port(), None);
    }

    #[test]
    fn decode_command_complete() {
        assert_eq!(
            ComponentEvent::from_raw(OMX_EventCmdComplete, OMX_CommandStateSet, OMX_StateIdle),
            ComponentEvent::CmdComplete {
                command: CommandKind::StateSet,
                data: State::Idle as u32,
            }
        );
        assert_eq!(
            ComponentEvent::from_raw(OMX_EventCmdComplete, 77, 1),
            ComponentEvent::Other {
                kind: OMX_EventCmdComplete,
                data1: 77,
                data2: 1
            }
        );
    }

    #[test]
    fn decode_error_and_flags() {
        assert_eq!(
            ComponentEvent::from_raw(OMX_EventError, OMX_ErrorInsufficientResources, 0),
            ComponentEvent::Error {
                error: OmxError::InsufficientResources,
                data: 0
            }
        );
        assert_eq!(
            ComponentEvent::from_raw(OMX_EventBufferFlag, 1, OMX_BUFFERFLAG_EOS),
            ComponentEvent::BufferFlag {
                port: 1,
                flags: BufferFlags::EOS
            }
        );
    }

    #[test]
    fn command_parameters() {
        assert_eq!(Command::StateSet(State::Pause).param(), OMX_StatePause);
        assert_eq!(Command::PortDisable(PortTarget::All).param(), OMX_ALL);
        assert_eq!(Command::PortEnable(PortTarget::Port(3)).param(), 3);
        assert!(PortTarget::All.covers(9));
        assert!(!PortTarget::Port(1).covers(2));
    }
}
