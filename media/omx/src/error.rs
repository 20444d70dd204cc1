// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Errors reported by OpenMAX IL components and by the core loader.

use enumn::N;
use omx_sys::*;
use remain::sorted;
use serde::Serialize;
use thiserror::Error;

/// A non-success `OMX_ERRORTYPE` returned by a component call or carried by an error event.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq, N, Serialize)]
#[repr(u32)]
pub enum OmxError {
    #[error("insufficient resources")]
    InsufficientResources = OMX_ErrorInsufficientResources,
    #[error("undefined error")]
    Undefined = OMX_ErrorUndefined,
    #[error("invalid component name")]
    InvalidComponentName = OMX_ErrorInvalidComponentName,
    #[error("component not found")]
    ComponentNotFound = OMX_ErrorComponentNotFound,
    #[error("invalid component")]
    InvalidComponent = OMX_ErrorInvalidComponent,
    #[error("bad parameter")]
    BadParameter = OMX_ErrorBadParameter,
    #[error("not implemented")]
    NotImplemented = OMX_ErrorNotImplemented,
    #[error("underflow")]
    Underflow = OMX_ErrorUnderflow,
    #[error("overflow")]
    Overflow = OMX_ErrorOverflow,
    #[error("hardware error")]
    Hardware = OMX_ErrorHardware,
    #[error("invalid state")]
    InvalidState = OMX_ErrorInvalidState,
    #[error("stream corrupt")]
    StreamCorrupt = OMX_ErrorStreamCorrupt,
    #[error("ports not compatible")]
    PortsNotCompatible = OMX_ErrorPortsNotCompatible,
    #[error("resources lost")]
    ResourcesLost = OMX_ErrorResourcesLost,
    #[error("no more")]
    NoMore = OMX_ErrorNoMore,
    #[error("version mismatch")]
    VersionMismatch = OMX_ErrorVersionMismatch,
    #[error("not ready")]
    NotReady = OMX_ErrorNotReady,
    #[error("timeout")]
    Timeout = OMX_ErrorTimeout,
    #[error("same state")]
    SameState = OMX_ErrorSameState,
    #[error("resources preempted")]
    ResourcesPreempted = OMX_ErrorResourcesPreempted,
    #[error("port unresponsive during allocation")]
    PortUnresponsiveDuringAllocation = OMX_ErrorPortUnresponsiveDuringAllocation,
    #[error("port unresponsive during deallocation")]
    PortUnresponsiveDuringDeallocation = OMX_ErrorPortUnresponsiveDuringDeallocation,
    #[error("port unresponsive during stop")]
    PortUnresponsiveDuringStop = OMX_ErrorPortUnresponsiveDuringStop,
    #[error("incorrect state transition")]
    IncorrectStateTransition = OMX_ErrorIncorrectStateTransition,
    #[error("incorrect state operation")]
    IncorrectStateOperation = OMX_ErrorIncorrectStateOperation,
    #[error("unsupported setting")]
    UnsupportedSetting = OMX_ErrorUnsupportedSetting,
    #[error("unsupported index")]
    UnsupportedIndex = OMX_ErrorUnsupportedIndex,
    #[error("bad port index")]
    BadPortIndex = OMX_ErrorBadPortIndex,
    #[error("port unpopulated")]
    PortUnpopulated = OMX_ErrorPortUnpopulated,
    #[error("component suspended")]
    ComponentSuspended = OMX_ErrorComponentSuspended,
    #[error("dynamic resources unavailable")]
    DynamicResourcesUnavailable = OMX_ErrorDynamicResourcesUnavailable,
    #[error("macroblock errors in frame")]
    MbErrorsInFrame = OMX_ErrorMbErrorsInFrame,
    #[error("format not detected")]
    FormatNotDetected = OMX_ErrorFormatNotDetected,
    #[error("content pipe open failed")]
    ContentPipeOpenFailed = OMX_ErrorContentPipeOpenFailed,
    #[error("content pipe creation failed")]
    ContentPipeCreationFailed = OMX_ErrorContentPipeCreationFailed,
    #[error("separate tables used")]
    SeparateTablesUsed = OMX_ErrorSeperateTablesUsed,
    #[error("tunneling unsupported")]
    TunnelingUnsupported = OMX_ErrorTunnelingUnsupported,
}

impl OmxError {
    /// Decodes a raw `OMX_ERRORTYPE`. `OMX_ErrorNone` is `Ok`; vendor specific codes that this
    /// harness does not know are reported as `Undefined`.
    pub fn check(raw: OMX_ERRORTYPE) -> OmxResult<()> {
        if raw == OMX_ErrorNone {
            return Ok(());
        }
        Err(OmxError::from_raw(raw))
    }

    /// Decodes a raw non-success code.
    pub fn from_raw(raw: OMX_ERRORTYPE) -> OmxError {
        OmxError::n(raw).unwrap_or_else(|| {
            log::warn!("unknown OMX error code {:#010x}", raw);
            OmxError::Undefined
        })
    }

    /// Returns the raw `OMX_ERRORTYPE` value.
    pub fn raw(self) -> OMX_ERRORTYPE {
        self as OMX_ERRORTYPE
    }
}

pub type OmxResult<T> = std::result::Result<T, OmxError>;

/// Failure to bring up a vendor OMX core library.
#[sorted]
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("OMX_Init failed: {0}")]
    Init(OmxError),
    #[error("failed to load core library: {0}")]
    Library(libloading::Error),
    #[error("core library does not export `{name}`: {source}")]
    MissingSymbol {
        name: &'static str,
        source: libloading::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_success() {
        assert_eq!(OmxError::check(OMX_ErrorNone), Ok(()));
    }

    #[test]
    fn known_codes_round_trip() {
        assert_eq!(
            OmxError::check(OMX_ErrorIncorrectStateOperation),
            Err(OmxError::IncorrectStateOperation)
        );
        assert_eq!(
            OmxError::InsufficientResources.raw(),
            OMX_ErrorInsufficientResources
        );
    }

    #[test]
    fn vendor_codes_are_undefined() {
        assert_eq!(OmxError::from_raw(0x9000_0001), OmxError::Undefined);
    }
}
