// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! A programmable tunnel peer for the component under test.

use std::any::Any;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use log::debug;
use log::warn;
use omx::BufferFlags;
use omx::BufferHeader;
use omx::BufferId;
use omx::BufferRequest;
use omx::Command;
use omx::Component;
use omx::ComponentId;
use omx::Direction;
use omx::OmxError;
use omx::OmxResult;
use omx::PortDefinition;
use omx::PortDomain;
use omx::PortParam;
use omx::PriorityMgmt;
use omx::State;
use omx::TunnelPeer;
use sync::EventWaitResult;
use sync::ManualResetEvent;
use sync::Mutex;

/// The only port of the tunnel test component.
pub const TTC_PORT: u32 = 0;

// Kept apart from the identities handed out by cores.
static NEXT_ID: AtomicU64 = AtomicU64::new(u64::MAX / 2);

struct Inner {
    state: State,
    supplier: Option<TunnelPeer>,
    withhold: bool,
    held: Vec<BufferHeader>,
    received: u64,
}

/// A non-supplying sink with one input port.
///
/// Buffers the supplier sends are returned to it straight away, or kept while withholding is on
/// until [`TunnelTestComponent::release_held`] is called.
pub struct TunnelTestComponent {
    id: ComponentId,
    inner: Mutex<Inner>,
    received: ManualResetEvent,
}

impl TunnelTestComponent {
    pub fn new() -> TunnelTestComponent {
        TunnelTestComponent {
            id: ComponentId(NEXT_ID.fetch_add(1, Ordering::Relaxed)),
            inner: Mutex::new(Inner {
                state: State::Loaded,
                supplier: None,
                withhold: false,
                held: Vec::new(),
                received: 0,
            }),
            received: ManualResetEvent::new(),
        }
    }

    pub fn set_withhold(&self, withhold: bool) {
        self.inner.lock().withhold = withhold;
    }

    /// Number of buffers currently kept from the supplier.
    pub fn held(&self) -> usize {
        self.inner.lock().held.len()
    }

    /// Number of buffers received so far.
    pub fn received(&self) -> u64 {
        self.inner.lock().received
    }

    /// Waits until at least one buffer has arrived.
    pub fn wait_received(&self, timeout: Duration) -> EventWaitResult {
        self.received.wait_timeout(timeout)
    }

    /// Hands every withheld buffer back to the supplier and returns how many there were.
    pub fn release_held(&self) -> OmxResult<usize> {
        let (held, supplier) = {
            let mut inner = self.inner.lock();
            (std::mem::take(&mut inner.held), inner.supplier.clone())
        };
        if held.is_empty() {
            return Ok(0);
        }
        debug!("ttc: releasing {} buffers", held.len());
        let supplier = supplier.ok_or(OmxError::PortUnpopulated)?;
        let mut first = Ok(held.len());
        for header in &held {
            if let Err(e) = Self::give_back(&supplier, header) {
                warn!("ttc: supplier refused buffer {}: {}", header.id, e);
                first = first.and(Err(e));
            }
        }
        first
    }

    fn give_back(supplier: &TunnelPeer, header: &BufferHeader) -> OmxResult<()> {
        let component = supplier
            .component
            .upgrade()
            .ok_or(OmxError::InvalidComponent)?;
        let mut header = *header;
        header.filled_len = 0;
        header.offset = 0;
        header.flags = BufferFlags::empty();
        component.fill_this_buffer(&header)
    }
}

impl Default for TunnelTestComponent {
    fn default() -> TunnelTestComponent {
        TunnelTestComponent::new()
    }
}

impl Component for TunnelTestComponent {
    fn id(&self) -> ComponentId {
        self.id
    }

    fn name(&self) -> &str {
        "OMX.conformance.tunnel_test"
    }

    fn get_state(&self) -> OmxResult<State> {
        Ok(self.inner.lock().state)
    }

    fn send_command(&self, command: Command) -> OmxResult<()> {
        match command {
            Command::StateSet(state) => {
                self.inner.lock().state = state;
                Ok(())
            }
            Command::PortDisable(_) | Command::PortEnable(_) | Command::Flush(_) => Ok(()),
            Command::MarkBuffer(_) => Err(OmxError::NotImplemented),
        }
    }

    fn port_param(&self, domain: PortDomain) -> OmxResult<PortParam> {
        Ok(match domain {
            PortDomain::Other => PortParam {
                start: TTC_PORT,
                count: 1,
            },
            _ => PortParam::default(),
        })
    }

    fn port_definition(&self, port: u32) -> OmxResult<PortDefinition> {
        if port != TTC_PORT {
            return Err(OmxError::BadPortIndex);
        }
        Ok(PortDefinition {
            index: TTC_PORT,
            direction: Direction::Input,
            domain: PortDomain::Other,
            buffer_count_actual: 1,
            buffer_count_min: 1,
            buffer_size: 0,
            enabled: true,
            populated: self.inner.lock().supplier.is_some(),
            buffers_contiguous: false,
            buffer_alignment: 1,
        })
    }

    fn set_port_definition(&self, definition: &PortDefinition) -> OmxResult<()> {
        if definition.index != TTC_PORT {
            return Err(OmxError::BadPortIndex);
        }
        Ok(())
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
        Err(OmxError::BadParameter)
    }

    fn empty_this_buffer(
        &self,
        header: &BufferHeader,
        _payload: &[u8],
        _flags: BufferFlags,
    ) -> OmxResult<()> {
        if header.input_port_index != TTC_PORT {
            return Err(OmxError::BadPortIndex);
        }
        let supplier = {
            let mut inner = self.inner.lock();
            inner.received += 1;
            if inner.withhold {
                inner.held.push(*header);
                None
            } else {
                inner.supplier.clone()
            }
        };
        self.received.signal();
        if let Some(supplier) = supplier {
            if let Err(e) = Self::give_back(&supplier, header) {
                warn!("ttc: supplier refused buffer {}, holding it: {}", header.id, e);
                self.inner.lock().held.push(*header);
            }
        }
        Ok(())
    }

    fn fill_this_buffer(&self, _header: &BufferHeader) -> OmxResult<()> {
        Err(OmxError::BadPortIndex)
    }

    fn tunnel_request(&self, port: u32, peer: Option<TunnelPeer>) -> OmxResult<()> {
        if port != TTC_PORT {
            return Err(OmxError::BadPortIndex);
        }
        self.inner.lock().supplier = peer;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use omx::fake::FakeCore;
    use omx::fake::PASSTHROUGH;
    use omx::Core;

    use super::*;
    use crate::callbacks::CallbackAdapter;
    use crate::callbacks::SharedState;

    #[test]
    fn accepts_tunnel_on_its_only_port() {
        let ttc = TunnelTestComponent::new();
        assert_eq!(ttc.tunnel_request(1, None), Err(OmxError::BadPortIndex));
        assert!(!ttc.port_definition(TTC_PORT).unwrap().populated);
        let request = BufferRequest {
            port: TTC_PORT,
            size: 1,
            alignment: 1,
            contiguous: false,
        };
        assert_eq!(ttc.use_buffer(&request), Err(OmxError::NotImplemented));
    }

    #[test]
    fn withheld_buffers_wait_for_release() {
        let core = FakeCore::default();
        let shared = Arc::new(SharedState::new());
        let cut = core
            .get_handle(PASSTHROUGH, Arc::new(CallbackAdapter::new(shared)))
            .unwrap();
        let ttc = Arc::new(TunnelTestComponent::new());
        let peer: Arc<dyn Component> = ttc.clone();
        core.setup_tunnel(&cut, 1, &peer, TTC_PORT).unwrap();

        ttc.set_withhold(true);
        let header = BufferHeader {
            input_port_index: TTC_PORT,
            output_port_index: 1,
            ..BufferHeader::new(BufferId(5), TTC_PORT, Direction::Input, 16)
        };
        ttc.empty_this_buffer(&header, &[0; 4], BufferFlags::empty())
            .unwrap();
        assert_eq!(ttc.held(), 1);
        assert_eq!(ttc.received(), 1);
        assert_eq!(
            ttc.wait_received(Duration::from_millis(1)),
            EventWaitResult::Signaled
        );
        // The fake does not know buffer 5, so handing it back is refused.
        assert_eq!(ttc.release_held(), Err(OmxError::IncorrectStateOperation));
        assert_eq!(ttc.held(), 0);
        assert_eq!(ttc.release_held(), Ok(0));
    }
}
