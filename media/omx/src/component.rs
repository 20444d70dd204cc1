// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The interface every component backend implements, and the callbacks it drives.

use std::any::Any;
use std::sync::Arc;
use std::sync::Weak;

use crate::error::OmxResult;
use crate::types::*;

/// One instantiated component.
///
/// Methods mirror the entries of the component vtable. Commands complete asynchronously: the
/// result of `send_command` only says whether the command was accepted, and completion is
/// reported through [`Callbacks::event_handler`]. Dropping the last reference frees the handle.
pub trait Component: Send + Sync {
    /// Identity reported alongside every callback from this instance.
    fn id(&self) -> ComponentId;

    fn name(&self) -> &str;

    fn get_state(&self) -> OmxResult<State>;

    fn send_command(&self, command: Command) -> OmxResult<()>;

    /// Returns the port range of `domain`.
    fn port_param(&self, domain: PortDomain) -> OmxResult<PortParam>;

    fn port_definition(&self, port: u32) -> OmxResult<PortDefinition>;

    /// Applies the buffer count and buffer size of `definition` to its port. Other fields are
    /// left as the component reports them.
    fn set_port_definition(&self, definition: &PortDefinition) -> OmxResult<()>;

    fn priority(&self) -> OmxResult<PriorityMgmt>;

    fn set_priority(&self, priority: PriorityMgmt) -> OmxResult<()>;

    /// `UseBuffer`: the caller side allocates the memory and lends it to the component.
    fn use_buffer(&self, request: &BufferRequest) -> OmxResult<BufferHeader>;

    /// `AllocateBuffer`: the component allocates the memory.
    fn allocate_buffer(&self, request: &BufferRequest) -> OmxResult<BufferHeader>;

    fn free_buffer(&self, port: u32, buffer: BufferId) -> OmxResult<()>;

    /// Copies `payload` into the buffer, sets its flags and hands it to the component.
    fn empty_this_buffer(
        &self,
        header: &BufferHeader,
        payload: &[u8],
        flags: BufferFlags,
    ) -> OmxResult<()>;

    /// Hands an empty buffer to the component for filling.
    fn fill_this_buffer(&self, header: &BufferHeader) -> OmxResult<()>;

    /// Connects `port` to `peer`, or disconnects it when `peer` is `None`.
    fn tunnel_request(&self, port: u32, peer: Option<TunnelPeer>) -> OmxResult<()>;

    fn as_any(&self) -> &dyn Any;
}

/// The other end of a tunnel.
#[derive(Clone)]
pub struct TunnelPeer {
    pub component: Weak<dyn Component>,
    pub port: u32,
}

impl TunnelPeer {
    pub fn new(component: &Arc<dyn Component>, port: u32) -> TunnelPeer {
        TunnelPeer {
            component: Arc::downgrade(component),
            port,
        }
    }
}

/// Notifications a component delivers from its own threads.
///
/// Implementations must not block for long and never report failure back to the component.
pub trait Callbacks: Send + Sync {
    fn event_handler(&self, component: ComponentId, event: ComponentEvent);

    /// An input buffer has been consumed and is owned by the client again.
    fn empty_buffer_done(&self, component: ComponentId, header: BufferHeader);

    /// An output buffer has been filled and is owned by the client again.
    fn fill_buffer_done(&self, component: ComponentId, header: BufferHeader);
}

/// Entry points of an OMX core: instantiation, enumeration and tunnel setup.
pub trait Core: Send + Sync {
    /// `OMX_GetHandle`.
    fn get_handle(&self, name: &str, callbacks: Arc<dyn Callbacks>)
        -> OmxResult<Arc<dyn Component>>;

    /// `OMX_ComponentNameEnum`, collected.
    fn component_names(&self) -> OmxResult<Vec<String>>;

    /// `OMX_SetupTunnel`: asks the output side first and then the input side to accept the
    /// tunnel, undoing the output side if the input side refuses.
    fn setup_tunnel(
        &self,
        output: &Arc<dyn Component>,
        output_port: u32,
        input: &Arc<dyn Component>,
        input_port: u32,
    ) -> OmxResult<()> {
        output.tunnel_request(output_port, Some(TunnelPeer::new(input, input_port)))?;
        if let Err(e) = input.tunnel_request(input_port, Some(TunnelPeer::new(output, output_port)))
        {
            let _ = output.tunnel_request(output_port, None);
            return Err(e);
        }
        Ok(())
    }
}
