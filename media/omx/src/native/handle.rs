// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::alloc::alloc_zeroed;
use std::alloc::dealloc;
use std::alloc::Layout;
use std::any::Any;
use std::collections::BTreeMap;
use std::ptr::null_mut;
use std::ptr::NonNull;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use log::debug;
use log::warn;
use omx_sys::*;
use sync::Mutex;

use super::callbacks::component_id;
use super::callbacks::header_snapshot;
use super::callbacks::CallbackShim;
use super::loader::CoreLibrary;
use crate::component::Component;
use crate::component::TunnelPeer;
use crate::error::OmxError;
use crate::error::OmxResult;
use crate::types::*;

/// Calls an entry of the component vtable. Must be used inside `unsafe`.
macro_rules! vtable_call {
    ($self:ident, $entry:ident $(, $arg:expr)*) => {{
        let component = $self.handle as *mut OMX_COMPONENTTYPE;
        match (*component).$entry {
            Some(f) => OmxError::check(f($self.handle $(, $arg)*)),
            None => Err(OmxError::NotImplemented),
        }
    }};
}

/// Zeroed memory lent to a component through `UseBuffer`.
struct AlignedBuffer {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl AlignedBuffer {
    fn new(size: u32, alignment: u32) -> OmxResult<AlignedBuffer> {
        let align = (alignment.max(1) as usize).next_power_of_two();
        let layout = Layout::from_size_align((size as usize).max(1), align)
            .map_err(|_| OmxError::BadParameter)?;
        // Safe because `layout` has a non-zero size.
        let ptr = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr).ok_or(OmxError::InsufficientResources)?;
        Ok(AlignedBuffer { ptr, layout })
    }

    fn as_mut_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        // Safe because `ptr` was allocated with `layout` in `new`.
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

struct NativeBuffer {
    header: *mut OMX_BUFFERHEADERTYPE,
    port: u32,
    // Must outlive the `FreeBuffer` call for `header`.
    _storage: Option<AlignedBuffer>,
}

/// A header fabricated for an id the component has already released.
struct StaleHeader {
    raw: Box<OMX_BUFFERHEADERTYPE>,
    port: Option<u32>,
}

/// Headers of one handle, by the id the client knows them under.
#[derive(Default)]
struct HeaderTable {
    buffers: BTreeMap<BufferId, NativeBuffer>,
    // One per id, kept until the port it names has no buffers left.
    stale: BTreeMap<BufferId, StaleHeader>,
}

impl HeaderTable {
    fn insert(&mut self, id: BufferId, buffer: NativeBuffer) {
        self.buffers.insert(id, buffer);
    }

    fn registered(&self, id: BufferId) -> Option<*mut OMX_BUFFERHEADERTYPE> {
        self.buffers.get(&id).map(|buffer| buffer.header)
    }

    fn take(&mut self, id: BufferId) -> Option<NativeBuffer> {
        self.buffers.remove(&id)
    }

    /// Returns the fabricated header for `header.id`, creating it on first use.
    fn stale_header(&mut self, header: &BufferHeader) -> *mut OMX_BUFFERHEADERTYPE {
        let stale = self.stale.entry(header.id).or_insert_with(|| StaleHeader {
            raw: Box::new(omx_struct_init()),
            port: header.port().map(|(_, port)| port),
        });
        stale.raw.pAppPrivate = header.id.0 as usize as OMX_PTR;
        stale.raw.nInputPortIndex = header.input_port_index;
        stale.raw.nOutputPortIndex = header.output_port_index;
        &mut *stale.raw as *mut OMX_BUFFERHEADERTYPE
    }

    /// Drops the fabricated headers of `port` once none of its buffers remain.
    fn released(&mut self, port: u32) {
        if self.buffers.values().all(|buffer| buffer.port != port) {
            self.stale.retain(|_, stale| stale.port != Some(port));
        }
    }
}

/// A component instantiated through `OMX_GetHandle`.
pub struct OmxHandle {
    handle: OMX_HANDLETYPE,
    name: String,
    // Never held across a call into the component.
    headers: Mutex<HeaderTable>,
    next_buffer: AtomicU64,
    library: Arc<CoreLibrary>,
    _shim: Box<CallbackShim>,
    _table: Box<OMX_CALLBACKTYPE>,
}

// Safe because OMX components are required to accept calls from any thread, and all mutable
// state on this side is behind a mutex.
unsafe impl Send for OmxHandle {}
unsafe impl Sync for OmxHandle {}

impl OmxHandle {
    pub(super) fn new(
        handle: OMX_HANDLETYPE,
        name: &str,
        library: Arc<CoreLibrary>,
        shim: Box<CallbackShim>,
        table: Box<OMX_CALLBACKTYPE>,
    ) -> OmxHandle {
        OmxHandle {
            handle,
            name: name.to_owned(),
            headers: Mutex::new(HeaderTable::default()),
            next_buffer: AtomicU64::new(1),
            library,
            _shim: shim,
            _table: table,
        }
    }

    pub(super) fn raw(&self) -> OMX_HANDLETYPE {
        self.handle
    }

    fn get_parameter<T: OmxStruct>(&self, index: OMX_INDEXTYPE, mut param: T) -> OmxResult<T> {
        // Safe because `param` is a correctly sized structure for `index`.
        unsafe {
            vtable_call!(
                self,
                GetParameter,
                index,
                &mut param as *mut T as OMX_PTR
            )?;
        }
        Ok(param)
    }

    fn set_parameter<T: OmxStruct>(&self, index: OMX_INDEXTYPE, mut param: T) -> OmxResult<()> {
        // Safe because `param` is a correctly sized structure for `index`.
        unsafe {
            vtable_call!(
                self,
                SetParameter,
                index,
                &mut param as *mut T as OMX_PTR
            )
        }
    }

    fn raw_port_definition(&self, port: u32) -> OmxResult<OMX_PARAM_PORTDEFINITIONTYPE> {
        let mut param: OMX_PARAM_PORTDEFINITIONTYPE = omx_struct_init();
        param.nPortIndex = port;
        self.get_parameter(OMX_IndexParamPortDefinition, param)
    }

    fn register(
        &self,
        id: BufferId,
        header: *mut OMX_BUFFERHEADERTYPE,
        port: u32,
        storage: Option<AlignedBuffer>,
    ) -> OmxResult<BufferHeader> {
        if header.is_null() {
            warn!("{}: buffer call on port {} returned no header", self.name, port);
            return Err(OmxError::Undefined);
        }
        // Safe because the component just returned `header`.
        let mut snapshot = unsafe { header_snapshot(header) };
        if snapshot.id != id {
            warn!(
                "{}: component replaced pAppPrivate of buffer {}",
                self.name, id
            );
            snapshot.id = id;
            // Safe because the header is owned by this side until it is handed back.
            unsafe { (*header).pAppPrivate = id.0 as usize as OMX_PTR };
        }
        self.headers.lock().insert(
            id,
            NativeBuffer {
                header,
                port,
                _storage: storage,
            },
        );
        Ok(snapshot)
    }

    /// The registered header of `header.id`, or one carrying only its port indices if the id is
    /// no longer allocated, so that the component gets a chance to reject it.
    fn lookup(&self, header: &BufferHeader) -> (*mut OMX_BUFFERHEADERTYPE, bool) {
        let mut headers = self.headers.lock();
        match headers.registered(header.id) {
            Some(raw) => (raw, true),
            None => {
                debug!("{}: buffer {} is not allocated", self.name, header.id);
                (headers.stale_header(header), false)
            }
        }
    }
}

impl Component for OmxHandle {
    fn id(&self) -> ComponentId {
        component_id(self.handle)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn get_state(&self) -> OmxResult<State> {
        let mut state: OMX_STATETYPE = OMX_StateInvalid;
        // Safe because `state` is writable.
        unsafe { vtable_call!(self, GetState, &mut state)? };
        State::n(state).ok_or(OmxError::Undefined)
    }

    fn send_command(&self, command: Command) -> OmxResult<()> {
        debug!("{}: SendCommand {}", self.name, command);
        // Safe because no command data is passed.
        unsafe {
            vtable_call!(
                self,
                SendCommand,
                command.kind() as OMX_COMMANDTYPE,
                command.param(),
                null_mut()
            )
        }
    }

    fn port_param(&self, domain: PortDomain) -> OmxResult<PortParam> {
        let param: OMX_PORT_PARAM_TYPE =
            self.get_parameter(domain.init_index(), omx_struct_init())?;
        Ok(PortParam {
            start: param.nStartPortNumber,
            count: param.nPorts,
        })
    }

    fn port_definition(&self, port: u32) -> OmxResult<PortDefinition> {
        let param = self.raw_port_definition(port)?;
        Ok(PortDefinition {
            index: param.nPortIndex,
            direction: Direction::n(param.eDir).ok_or(OmxError::Undefined)?,
            domain: PortDomain::n(param.eDomain).ok_or(OmxError::Undefined)?,
            buffer_count_actual: param.nBufferCountActual,
            buffer_count_min: param.nBufferCountMin,
            buffer_size: param.nBufferSize,
            enabled: param.bEnabled != OMX_FALSE,
            populated: param.bPopulated != OMX_FALSE,
            buffers_contiguous: param.bBuffersContiguous != OMX_FALSE,
            buffer_alignment: param.nBufferAlignment,
        })
    }

    fn set_port_definition(&self, definition: &PortDefinition) -> OmxResult<()> {
        let mut param = self.raw_port_definition(definition.index)?;
        param.nBufferCountActual = definition.buffer_count_actual;
        param.nBufferSize = definition.buffer_size;
        self.set_parameter(OMX_IndexParamPortDefinition, param)
    }

    fn priority(&self) -> OmxResult<PriorityMgmt> {
        let param: OMX_PRIORITYMGMTTYPE =
            self.get_parameter(OMX_IndexParamPriorityMgmt, omx_struct_init())?;
        Ok(PriorityMgmt {
            group_priority: param.nGroupPriority,
            group_id: param.nGroupID,
        })
    }

    fn set_priority(&self, priority: PriorityMgmt) -> OmxResult<()> {
        let mut param: OMX_PRIORITYMGMTTYPE = omx_struct_init();
        param.nGroupPriority = priority.group_priority;
        param.nGroupID = priority.group_id;
        self.set_parameter(OMX_IndexParamPriorityMgmt, param)
    }

    fn use_buffer(&self, request: &BufferRequest) -> OmxResult<BufferHeader> {
        let storage = AlignedBuffer::new(request.size, request.alignment)?;
        let id = BufferId(self.next_buffer.fetch_add(1, Ordering::Relaxed));
        let mut header: *mut OMX_BUFFERHEADERTYPE = null_mut();
        // Safe because `storage` is `request.size` bytes long and stays allocated until after
        // the matching `FreeBuffer`.
        unsafe {
            vtable_call!(
                self,
                UseBuffer,
                &mut header,
                request.port,
                id.0 as usize as OMX_PTR,
                request.size,
                storage.as_mut_ptr()
            )?;
        }
        self.register(id, header, request.port, Some(storage))
    }

    fn allocate_buffer(&self, request: &BufferRequest) -> OmxResult<BufferHeader> {
        let id = BufferId(self.next_buffer.fetch_add(1, Ordering::Relaxed));
        let mut header: *mut OMX_BUFFERHEADERTYPE = null_mut();
        // Safe because `header` is writable.
        unsafe {
            vtable_call!(
                self,
                AllocateBuffer,
                &mut header,
                request.port,
                id.0 as usize as OMX_PTR,
                request.size
            )?;
        }
        self.register(id, header, request.port, None)
    }

    fn free_buffer(&self, port: u32, buffer: BufferId) -> OmxResult<()> {
        let entry = self
            .headers
            .lock()
            .take(buffer)
            .ok_or(OmxError::BadParameter)?;
        // Safe because `entry.header` was returned by the component for this handle.
        let ret = unsafe { vtable_call!(self, FreeBuffer, port, entry.header) };
        let mut headers = self.headers.lock();
        match ret {
            Ok(()) => headers.released(entry.port),
            Err(_) => headers.insert(buffer, entry),
        }
        ret
    }

    fn empty_this_buffer(
        &self,
        header: &BufferHeader,
        payload: &[u8],
        flags: BufferFlags,
    ) -> OmxResult<()> {
        let (raw, registered) = self.lookup(header);
        if registered {
            // Safe because the client owns the header until it is handed over below.
            unsafe {
                let fields = &mut *raw;
                if payload.len() > fields.nAllocLen as usize {
                    return Err(OmxError::BadParameter);
                }
                if !fields.pBuffer.is_null() {
                    std::ptr::copy_nonoverlapping(payload.as_ptr(), fields.pBuffer, payload.len());
                }
                fields.nFilledLen = payload.len() as u32;
                fields.nOffset = 0;
                fields.nFlags = flags.bits();
                fields.nTimeStamp = header.timestamp;
            }
        }
        // Safe because `raw` is a valid header for the duration of the call.
        unsafe { vtable_call!(self, EmptyThisBuffer, raw) }
    }

    fn fill_this_buffer(&self, header: &BufferHeader) -> OmxResult<()> {
        let (raw, registered) = self.lookup(header);
        if registered {
            // Safe because the client owns the header until it is handed over below.
            unsafe {
                (*raw).nFilledLen = 0;
                (*raw).nOffset = 0;
                (*raw).nFlags = 0;
            }
        }
        // Safe because `raw` is a valid header for the duration of the call.
        unsafe { vtable_call!(self, FillThisBuffer, raw) }
    }

    fn tunnel_request(&self, port: u32, peer: Option<TunnelPeer>) -> OmxResult<()> {
        let mut setup = OMX_TUNNELSETUPTYPE {
            nTunnelFlags: 0,
            eSupplier: 0,
        };
        let Some(peer) = peer else {
            // Safe because `setup` is writable.
            return unsafe {
                vtable_call!(self, ComponentTunnelRequest, port, null_mut(), 0, &mut setup)
            };
        };
        let component = peer.component.upgrade().ok_or(OmxError::InvalidComponent)?;
        let Some(other) = component.as_any().downcast_ref::<OmxHandle>() else {
            return Err(OmxError::TunnelingUnsupported);
        };
        // Safe because both handles are live and `setup` is writable.
        unsafe {
            vtable_call!(
                self,
                ComponentTunnelRequest,
                port,
                other.handle,
                peer.port,
                &mut setup
            )
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for OmxHandle {
    fn drop(&mut self) {
        let buffers = std::mem::take(&mut self.headers.lock().buffers);
        for (id, buffer) in buffers {
            debug!("{}: releasing buffer {} of port {}", self.name, id, buffer.port);
            // Safe because the header belongs to this handle and is not in use by the client.
            if let Err(e) = unsafe { vtable_call!(self, FreeBuffer, buffer.port, buffer.header) } {
                warn!("{}: FreeBuffer({}) failed: {}", self.name, id, e);
            }
        }
        // Safe because the handle came from OMX_GetHandle of this library and is not used again.
        if let Err(e) = OmxError::check(unsafe { (self.library.free_handle)(self.handle) }) {
            warn!("{}: OMX_FreeHandle failed: {}", self.name, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_buffer_honors_alignment() {
        let buffer = AlignedBuffer::new(100, 64).unwrap();
        assert_eq!(buffer.as_mut_ptr() as usize % 64, 0);
        // Safe because the buffer is 100 bytes long.
        let bytes = unsafe { std::slice::from_raw_parts(buffer.as_mut_ptr(), 100) };
        assert!(bytes.iter().all(|b| *b == 0));
    }

    fn native(port: u32) -> NativeBuffer {
        NativeBuffer {
            header: null_mut(),
            port,
            _storage: None,
        }
    }

    #[test]
    fn stale_headers_are_reused_and_pruned() {
        let mut table = HeaderTable::default();
        table.insert(BufferId(1), native(0));
        table.insert(BufferId(2), native(0));
        table.insert(BufferId(3), native(1));

        let gone = table.take(BufferId(1)).unwrap();
        table.released(gone.port);
        let header = BufferHeader::new(BufferId(1), 0, Direction::Input, 64);
        let first = table.stale_header(&header);
        assert_eq!(table.stale_header(&header), first);
        // Safe because `first` points into a header owned by `table`.
        assert_eq!(unsafe { (*first).nInputPortIndex }, 0);
        assert_eq!(table.stale.len(), 1);
        assert!(table.registered(BufferId(1)).is_none());

        // Buffer 2 still lives on port 0, and port 1 has nothing stale.
        let gone = table.take(BufferId(3)).unwrap();
        table.released(gone.port);
        assert_eq!(table.stale.len(), 1);

        let gone = table.take(BufferId(2)).unwrap();
        table.released(gone.port);
        assert!(table.stale.is_empty());
        assert!(table.buffers.is_empty());
    }

    #[test]
    fn aligned_buffer_rounds_alignment_up() {
        let buffer = AlignedBuffer::new(0, 24).unwrap();
        assert_eq!(buffer.layout.align(), 32);
        assert_eq!(buffer.layout.size(), 1);
    }
}
