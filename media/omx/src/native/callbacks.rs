// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! `extern "C"` trampolines registered with `OMX_GetHandle`.

use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use log::error;
use omx_sys::*;

use crate::component::Callbacks;
use crate::types::*;

/// The `pAppData` pointer handed to the component. It must stay at a fixed address until the
/// handle has been freed.
pub(crate) struct CallbackShim {
    pub callbacks: Arc<dyn Callbacks>,
}

pub(crate) fn callback_table() -> OMX_CALLBACKTYPE {
    OMX_CALLBACKTYPE {
        EventHandler: Some(event_handler),
        EmptyBufferDone: Some(empty_buffer_done),
        FillBufferDone: Some(fill_buffer_done),
    }
}

pub(crate) fn component_id(handle: OMX_HANDLETYPE) -> ComponentId {
    ComponentId(handle as usize as u64)
}

/// Reads the fields of a raw buffer header.
///
/// # Safety
///
/// `header` must point to a valid `OMX_BUFFERHEADERTYPE`.
pub(crate) unsafe fn header_snapshot(header: *const OMX_BUFFERHEADERTYPE) -> BufferHeader {
    let header = &*header;
    BufferHeader {
        id: BufferId(header.pAppPrivate as usize as u64),
        alloc_len: header.nAllocLen,
        filled_len: header.nFilledLen,
        offset: header.nOffset,
        flags: BufferFlags::from_bits_retain(header.nFlags),
        timestamp: header.nTimeStamp,
        input_port_index: header.nInputPortIndex,
        output_port_index: header.nOutputPortIndex,
    }
}

fn dispatch<F: FnOnce(&CallbackShim)>(app_data: OMX_PTR, what: &str, f: F) -> OMX_ERRORTYPE {
    if app_data.is_null() {
        error!("{} called without application data", what);
        return OMX_ErrorNone;
    }
    // Safe because `app_data` is the `CallbackShim` registered in `OMX_GetHandle`, which is kept
    // alive by the owning `OmxHandle` until after `OMX_FreeHandle` returns.
    let shim = unsafe { &*(app_data as *const CallbackShim) };
    if catch_unwind(AssertUnwindSafe(|| f(shim))).is_err() {
        error!("panic in {} callback", what);
    }
    OMX_ErrorNone
}

unsafe extern "C" fn event_handler(
    component: OMX_HANDLETYPE,
    app_data: OMX_PTR,
    event: OMX_EVENTTYPE,
    data1: OMX_U32,
    data2: OMX_U32,
    _event_data: OMX_PTR,
) -> OMX_ERRORTYPE {
    dispatch(app_data, "EventHandler", |shim| {
        shim.callbacks.event_handler(
            component_id(component),
            ComponentEvent::from_raw(event, data1, data2),
        )
    })
}

unsafe extern "C" fn empty_buffer_done(
    component: OMX_HANDLETYPE,
    app_data: OMX_PTR,
    buffer: *mut OMX_BUFFERHEADERTYPE,
) -> OMX_ERRORTYPE {
    if buffer.is_null() {
        error!("EmptyBufferDone called with a null buffer header");
        return OMX_ErrorNone;
    }
    let header = header_snapshot(buffer);
    dispatch(app_data, "EmptyBufferDone", |shim| {
        shim.callbacks
            .empty_buffer_done(component_id(component), header)
    })
}

unsafe extern "C" fn fill_buffer_done(
    component: OMX_HANDLETYPE,
    app_data: OMX_PTR,
    buffer: *mut OMX_BUFFERHEADERTYPE,
) -> OMX_ERRORTYPE {
    if buffer.is_null() {
        error!("FillBufferDone called with a null buffer header");
        return OMX_ErrorNone;
    }
    let header = header_snapshot(buffer);
    dispatch(app_data, "FillBufferDone", |shim| {
        shim.callbacks
            .fill_buffer_done(component_id(component), header)
    })
}

#[cfg(test)]
mod tests {
    use sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(ComponentId, ComponentEvent)>>,
        filled: Mutex<Vec<BufferHeader>>,
    }

    impl Callbacks for Recorder {
        fn event_handler(&self, component: ComponentId, event: ComponentEvent) {
            self.events.lock().push((component, event));
        }

        fn empty_buffer_done(&self, _component: ComponentId, _header: BufferHeader) {}

        fn fill_buffer_done(&self, _component: ComponentId, header: BufferHeader) {
            self.filled.lock().push(header);
        }
    }

    #[test]
    fn trampolines_forward_to_callbacks() {
        let recorder = Arc::new(Recorder::default());
        let shim = CallbackShim {
            callbacks: recorder.clone(),
        };
        let app_data = &shim as *const CallbackShim as OMX_PTR;
        let handle = 0x1000 as OMX_HANDLETYPE;
        let table = callback_table();

        let mut raw: OMX_BUFFERHEADERTYPE = omx_struct_init();
        raw.pAppPrivate = 7usize as OMX_PTR;
        raw.nAllocLen = 64;
        raw.nFilledLen = 10;
        raw.nFlags = OMX_BUFFERFLAG_EOS;
        raw.nInputPortIndex = OMX_NOPORT;
        raw.nOutputPortIndex = 1;

        // Safe because every pointer passed is valid for the duration of the calls.
        unsafe {
            let ret = (table.EventHandler.unwrap())(
                handle,
                app_data,
                OMX_EventCmdComplete,
                OMX_CommandStateSet,
                OMX_StateIdle,
                std::ptr::null_mut(),
            );
            assert_eq!(ret, OMX_ErrorNone);
            (table.FillBufferDone.unwrap())(handle, app_data, &mut raw);
        }

        let events = recorder.events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, ComponentId(0x1000));
        let filled = recorder.filled.lock();
        assert_eq!(filled[0].id, BufferId(7));
        assert_eq!(filled[0].port(), Some((Direction::Output, 1)));
        assert!(filled[0].flags.contains(BufferFlags::EOS));
    }
}
