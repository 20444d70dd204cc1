// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::ffi::CStr;
use std::ffi::CString;
use std::ffi::OsStr;
use std::os::raw::c_char;
use std::ptr::null_mut;
use std::sync::Arc;

use libloading::Library;
use log::debug;
use log::warn;
use omx_sys::*;

use super::callbacks::callback_table;
use super::callbacks::CallbackShim;
use super::handle::OmxHandle;
use crate::component::Callbacks;
use crate::component::Component;
use crate::component::Core;
use crate::error::LoadError;
use crate::error::OmxError;
use crate::error::OmxResult;

/// Entry points resolved from a loaded core library.
pub(crate) struct CoreLibrary {
    deinit: OMX_DeinitFn,
    name_enum: OMX_ComponentNameEnumFn,
    get_handle: OMX_GetHandleFn,
    pub(super) free_handle: OMX_FreeHandleFn,
    setup_tunnel: OMX_SetupTunnelFn,
    // The function pointers above are only valid while the library stays mapped, so it is
    // declared last and dropped after `Drop::drop` has called `OMX_Deinit`.
    _library: Library,
}

impl Drop for CoreLibrary {
    fn drop(&mut self) {
        // Safe because OMX_Init succeeded and every handle holding a reference to this library
        // has already been freed.
        if let Err(e) = OmxError::check(unsafe { (self.deinit)() }) {
            warn!("OMX_Deinit failed: {}", e);
        }
    }
}

/// Copies a function pointer out of `library`.
///
/// # Safety
///
/// `T` must be the correct function pointer type for `symbol`.
unsafe fn resolve<T: Copy>(
    library: &Library,
    symbol: &[u8],
    name: &'static str,
) -> Result<T, LoadError> {
    library
        .get::<T>(symbol)
        .map(|f| *f)
        .map_err(|source| LoadError::MissingSymbol { name, source })
}

/// A vendor OMX core shared library, initialized with `OMX_Init`.
pub struct OmxCore {
    library: Arc<CoreLibrary>,
}

impl OmxCore {
    /// Loads the core library at `path` and initializes it.
    pub fn load<P: AsRef<OsStr>>(path: P) -> Result<OmxCore, LoadError> {
        // Safe because the library is an OMX core whose initializers have no preconditions, and
        // every resolved symbol is given the signature mandated by OMX_Core.h.
        let library = unsafe {
            let library = Library::new(path).map_err(LoadError::Library)?;
            let init: OMX_InitFn = resolve(&library, OMX_INIT_SYMBOL, "OMX_Init")?;
            let core = CoreLibrary {
                deinit: resolve(&library, OMX_DEINIT_SYMBOL, "OMX_Deinit")?,
                name_enum: resolve(
                    &library,
                    OMX_COMPONENT_NAME_ENUM_SYMBOL,
                    "OMX_ComponentNameEnum",
                )?,
                get_handle: resolve(&library, OMX_GET_HANDLE_SYMBOL, "OMX_GetHandle")?,
                free_handle: resolve(&library, OMX_FREE_HANDLE_SYMBOL, "OMX_FreeHandle")?,
                setup_tunnel: resolve(&library, OMX_SETUP_TUNNEL_SYMBOL, "OMX_SetupTunnel")?,
                _library: library,
            };
            OmxError::check(init()).map_err(LoadError::Init)?;
            core
        };
        Ok(OmxCore {
            library: Arc::new(library),
        })
    }
}

impl Core for OmxCore {
    fn get_handle(
        &self,
        name: &str,
        callbacks: Arc<dyn Callbacks>,
    ) -> OmxResult<Arc<dyn Component>> {
        let c_name = CString::new(name).map_err(|_| OmxError::InvalidComponentName)?;
        let shim = Box::new(CallbackShim { callbacks });
        let mut table = Box::new(callback_table());
        let mut handle: OMX_HANDLETYPE = null_mut();
        // Safe because every pointer is valid for the call, and `shim` and `table` are moved into
        // the returned handle, which keeps them at the same address until OMX_FreeHandle.
        let ret = unsafe {
            (self.library.get_handle)(
                &mut handle,
                c_name.as_ptr() as OMX_STRING,
                &*shim as *const CallbackShim as OMX_PTR,
                &mut *table,
            )
        };
        OmxError::check(ret)?;
        if handle.is_null() {
            return Err(OmxError::InvalidComponent);
        }
        debug!("OMX_GetHandle({}) = {:p}", name, handle);
        Ok(Arc::new(OmxHandle::new(
            handle,
            name,
            Arc::clone(&self.library),
            shim,
            table,
        )))
    }

    fn component_names(&self) -> OmxResult<Vec<String>> {
        let mut names = Vec::new();
        for index in 0.. {
            let mut buf = [0 as c_char; OMX_MAX_STRINGNAME_SIZE];
            // Safe because `buf` is writable for the length passed.
            let ret = unsafe {
                (self.library.name_enum)(buf.as_mut_ptr(), buf.len() as OMX_U32, index)
            };
            match OmxError::check(ret) {
                Ok(()) => {}
                Err(OmxError::NoMore) => break,
                Err(e) => return Err(e),
            }
            buf[OMX_MAX_STRINGNAME_SIZE - 1] = 0;
            // Safe because `buf` is NUL terminated.
            let name = unsafe { CStr::from_ptr(buf.as_ptr()) };
            names.push(name.to_string_lossy().into_owned());
        }
        Ok(names)
    }

    fn setup_tunnel(
        &self,
        output: &Arc<dyn Component>,
        output_port: u32,
        input: &Arc<dyn Component>,
        input_port: u32,
    ) -> OmxResult<()> {
        let (Some(output), Some(input)) = (
            output.as_any().downcast_ref::<OmxHandle>(),
            input.as_any().downcast_ref::<OmxHandle>(),
        ) else {
            return Err(OmxError::TunnelingUnsupported);
        };
        // Safe because both handles are live components of this core.
        OmxError::check(unsafe {
            (self.library.setup_tunnel)(output.raw(), output_port, input.raw(), input_port)
        })
    }
}
