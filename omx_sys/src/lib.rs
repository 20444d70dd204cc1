// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! OpenMAX IL 1.1.2 component ABI bindings.
//!
//! Only the parts of `OMX_Core.h`, `OMX_Component.h`, `OMX_Index.h` and `OMX_Types.h` used by the
//! conformance driver are declared here.

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(clippy::upper_case_acronyms)]

use std::os::raw::c_char;
use std::os::raw::c_void;

pub type OMX_U8 = u8;
pub type OMX_U32 = u32;
pub type OMX_S32 = i32;
pub type OMX_TICKS = i64;
pub type OMX_BOOL = u32;
pub type OMX_PTR = *mut c_void;
pub type OMX_STRING = *mut c_char;
pub type OMX_HANDLETYPE = *mut c_void;
pub type OMX_UUIDTYPE = [u8; 128];

pub const OMX_FALSE: OMX_BOOL = 0;
pub const OMX_TRUE: OMX_BOOL = 1;

pub const OMX_VERSION_MAJOR: u8 = 1;
pub const OMX_VERSION_MINOR: u8 = 1;
pub const OMX_VERSION_REVISION: u8 = 2;
pub const OMX_VERSION_STEP: u8 = 0;

pub const OMX_MAX_STRINGNAME_SIZE: usize = 128;

/// Port index meaning "every port of the component".
pub const OMX_ALL: OMX_U32 = 0xFFFF_FFFF;
/// Port index meaning "no port"; used in the unused direction field of a buffer header.
pub const OMX_NOPORT: OMX_U32 = 0xFFFF_FFFE;

pub type OMX_ERRORTYPE = u32;
pub const OMX_ErrorNone: OMX_ERRORTYPE = 0;
pub const OMX_ErrorInsufficientResources: OMX_ERRORTYPE = 0x8000_1000;
pub const OMX_ErrorUndefined: OMX_ERRORTYPE = 0x8000_1001;
pub const OMX_ErrorInvalidComponentName: OMX_ERRORTYPE = 0x8000_1002;
pub const OMX_ErrorComponentNotFound: OMX_ERRORTYPE = 0x8000_1003;
pub const OMX_ErrorInvalidComponent: OMX_ERRORTYPE = 0x8000_1004;
pub const OMX_ErrorBadParameter: OMX_ERRORTYPE = 0x8000_1005;
pub const OMX_ErrorNotImplemented: OMX_ERRORTYPE = 0x8000_1006;
pub const OMX_ErrorUnderflow: OMX_ERRORTYPE = 0x8000_1007;
pub const OMX_ErrorOverflow: OMX_ERRORTYPE = 0x8000_1008;
pub const OMX_ErrorHardware: OMX_ERRORTYPE = 0x8000_1009;
pub const OMX_ErrorInvalidState: OMX_ERRORTYPE = 0x8000_100A;
pub const OMX_ErrorStreamCorrupt: OMX_ERRORTYPE = 0x8000_100B;
pub const OMX_ErrorPortsNotCompatible: OMX_ERRORTYPE = 0x8000_100C;
pub const OMX_ErrorResourcesLost: OMX_ERRORTYPE = 0x8000_100D;
pub const OMX_ErrorNoMore: OMX_ERRORTYPE = 0x8000_100E;
pub const OMX_ErrorVersionMismatch: OMX_ERRORTYPE = 0x8000_100F;
pub const OMX_ErrorNotReady: OMX_ERRORTYPE = 0x8000_1010;
pub const OMX_ErrorTimeout: OMX_ERRORTYPE = 0x8000_1011;
pub const OMX_ErrorSameState: OMX_ERRORTYPE = 0x8000_1012;
pub const OMX_ErrorResourcesPreempted: OMX_ERRORTYPE = 0x8000_1013;
pub const OMX_ErrorPortUnresponsiveDuringAllocation: OMX_ERRORTYPE = 0x8000_1014;
pub const OMX_ErrorPortUnresponsiveDuringDeallocation: OMX_ERRORTYPE = 0x8000_1015;
pub const OMX_ErrorPortUnresponsiveDuringStop: OMX_ERRORTYPE = 0x8000_1016;
pub const OMX_ErrorIncorrectStateTransition: OMX_ERRORTYPE = 0x8000_1017;
pub const OMX_ErrorIncorrectStateOperation: OMX_ERRORTYPE = 0x8000_1018;
pub const OMX_ErrorUnsupportedSetting: OMX_ERRORTYPE = 0x8000_1019;
pub const OMX_ErrorUnsupportedIndex: OMX_ERRORTYPE = 0x8000_101A;
pub const OMX_ErrorBadPortIndex: OMX_ERRORTYPE = 0x8000_101B;
pub const OMX_ErrorPortUnpopulated: OMX_ERRORTYPE = 0x8000_101C;
pub const OMX_ErrorComponentSuspended: OMX_ERRORTYPE = 0x8000_101D;
pub const OMX_ErrorDynamicResourcesUnavailable: OMX_ERRORTYPE = 0x8000_101E;
pub const OMX_ErrorMbErrorsInFrame: OMX_ERRORTYPE = 0x8000_101F;
pub const OMX_ErrorFormatNotDetected: OMX_ERRORTYPE = 0x8000_1020;
pub const OMX_ErrorContentPipeOpenFailed: OMX_ERRORTYPE = 0x8000_1021;
pub const OMX_ErrorContentPipeCreationFailed: OMX_ERRORTYPE = 0x8000_1022;
pub const OMX_ErrorSeperateTablesUsed: OMX_ERRORTYPE = 0x8000_1023;
pub const OMX_ErrorTunnelingUnsupported: OMX_ERRORTYPE = 0x8000_1024;

pub type OMX_STATETYPE = u32;
pub const OMX_StateInvalid: OMX_STATETYPE = 0;
pub const OMX_StateLoaded: OMX_STATETYPE = 1;
pub const OMX_StateIdle: OMX_STATETYPE = 2;
pub const OMX_StateExecuting: OMX_STATETYPE = 3;
pub const OMX_StatePause: OMX_STATETYPE = 4;
pub const OMX_StateWaitForResources: OMX_STATETYPE = 5;

pub type OMX_COMMANDTYPE = u32;
pub const OMX_CommandStateSet: OMX_COMMANDTYPE = 0;
pub const OMX_CommandFlush: OMX_COMMANDTYPE = 1;
pub const OMX_CommandPortDisable: OMX_COMMANDTYPE = 2;
pub const OMX_CommandPortEnable: OMX_COMMANDTYPE = 3;
pub const OMX_CommandMarkBuffer: OMX_COMMANDTYPE = 4;

pub type OMX_EVENTTYPE = u32;
pub const OMX_EventCmdComplete: OMX_EVENTTYPE = 0;
pub const OMX_EventError: OMX_EVENTTYPE = 1;
pub const OMX_EventMark: OMX_EVENTTYPE = 2;
pub const OMX_EventPortSettingsChanged: OMX_EVENTTYPE = 3;
pub const OMX_EventBufferFlag: OMX_EVENTTYPE = 4;
pub const OMX_EventResourcesAcquired: OMX_EVENTTYPE = 5;
pub const OMX_EventComponentResumed: OMX_EVENTTYPE = 6;
pub const OMX_EventDynamicResourcesAvailable: OMX_EVENTTYPE = 7;
pub const OMX_EventPortFormatDetected: OMX_EVENTTYPE = 8;

pub type OMX_DIRTYPE = u32;
pub const OMX_DirInput: OMX_DIRTYPE = 0;
pub const OMX_DirOutput: OMX_DIRTYPE = 1;

pub type OMX_PORTDOMAINTYPE = u32;
pub const OMX_PortDomainAudio: OMX_PORTDOMAINTYPE = 0;
pub const OMX_PortDomainVideo: OMX_PORTDOMAINTYPE = 1;
pub const OMX_PortDomainImage: OMX_PORTDOMAINTYPE = 2;
pub const OMX_PortDomainOther: OMX_PORTDOMAINTYPE = 3;

pub type OMX_INDEXTYPE = u32;
pub const OMX_IndexParamPriorityMgmt: OMX_INDEXTYPE = 0x0100_0001;
pub const OMX_IndexParamAudioInit: OMX_INDEXTYPE = 0x0100_0002;
pub const OMX_IndexParamImageInit: OMX_INDEXTYPE = 0x0100_0003;
pub const OMX_IndexParamVideoInit: OMX_INDEXTYPE = 0x0100_0004;
pub const OMX_IndexParamOtherInit: OMX_INDEXTYPE = 0x0100_0005;
pub const OMX_IndexParamPortDefinition: OMX_INDEXTYPE = 0x0200_0001;
pub const OMX_IndexParamCompBufferSupplier: OMX_INDEXTYPE = 0x0200_0002;

pub const OMX_BUFFERFLAG_EOS: OMX_U32 = 0x0000_0001;
pub const OMX_BUFFERFLAG_STARTTIME: OMX_U32 = 0x0000_0002;
pub const OMX_BUFFERFLAG_DECODEONLY: OMX_U32 = 0x0000_0004;
pub const OMX_BUFFERFLAG_DATACORRUPT: OMX_U32 = 0x0000_0008;
pub const OMX_BUFFERFLAG_ENDOFFRAME: OMX_U32 = 0x0000_0010;
pub const OMX_BUFFERFLAG_SYNCFRAME: OMX_U32 = 0x0000_0020;
pub const OMX_BUFFERFLAG_EXTRADATA: OMX_U32 = 0x0000_0040;
pub const OMX_BUFFERFLAG_CODECCONFIG: OMX_U32 = 0x0000_0080;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct OMX_VERSION_FIELDS {
    pub nVersionMajor: OMX_U8,
    pub nVersionMinor: OMX_U8,
    pub nRevision: OMX_U8,
    pub nStep: OMX_U8,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub union OMX_VERSIONTYPE {
    pub s: OMX_VERSION_FIELDS,
    pub nVersion: OMX_U32,
}

impl OMX_VERSIONTYPE {
    /// The IL specification version this harness is written against.
    pub const fn spec() -> OMX_VERSIONTYPE {
        OMX_VERSIONTYPE {
            s: OMX_VERSION_FIELDS {
                nVersionMajor: OMX_VERSION_MAJOR,
                nVersionMinor: OMX_VERSION_MINOR,
                nRevision: OMX_VERSION_REVISION,
                nStep: OMX_VERSION_STEP,
            },
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct OMX_PORT_PARAM_TYPE {
    pub nSize: OMX_U32,
    pub nVersion: OMX_VERSIONTYPE,
    pub nPorts: OMX_U32,
    pub nStartPortNumber: OMX_U32,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct OMX_PRIORITYMGMTTYPE {
    pub nSize: OMX_U32,
    pub nVersion: OMX_VERSIONTYPE,
    pub nGroupPriority: OMX_U32,
    pub nGroupID: OMX_U32,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct OMX_AUDIO_PORTDEFINITIONTYPE {
    pub cMIMEType: OMX_STRING,
    pub pNativeRender: OMX_PTR,
    pub bFlagErrorConcealment: OMX_BOOL,
    pub eEncoding: OMX_U32,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct OMX_VIDEO_PORTDEFINITIONTYPE {
    pub cMIMEType: OMX_STRING,
    pub pNativeRender: OMX_PTR,
    pub nFrameWidth: OMX_U32,
    pub nFrameHeight: OMX_U32,
    pub nStride: OMX_S32,
    pub nSliceHeight: OMX_U32,
    pub nBitrate: OMX_U32,
    pub xFramerate: OMX_U32,
    pub bFlagErrorConcealment: OMX_BOOL,
    pub eCompressionFormat: OMX_U32,
    pub eColorFormat: OMX_U32,
    pub pNativeWindow: OMX_PTR,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct OMX_IMAGE_PORTDEFINITIONTYPE {
    pub cMIMEType: OMX_STRING,
    pub pNativeRender: OMX_PTR,
    pub nFrameWidth: OMX_U32,
    pub nFrameHeight: OMX_U32,
    pub nStride: OMX_S32,
    pub nSliceHeight: OMX_U32,
    pub bFlagErrorConcealment: OMX_BOOL,
    pub eCompressionFormat: OMX_U32,
    pub eColorFormat: OMX_U32,
    pub pNativeWindow: OMX_PTR,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct OMX_OTHER_PORTDEFINITIONTYPE {
    pub eFormat: OMX_U32,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub union OMX_PORTDEFINITION_FORMAT {
    pub audio: OMX_AUDIO_PORTDEFINITIONTYPE,
    pub video: OMX_VIDEO_PORTDEFINITIONTYPE,
    pub image: OMX_IMAGE_PORTDEFINITIONTYPE,
    pub other: OMX_OTHER_PORTDEFINITIONTYPE,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct OMX_PARAM_PORTDEFINITIONTYPE {
    pub nSize: OMX_U32,
    pub nVersion: OMX_VERSIONTYPE,
    pub nPortIndex: OMX_U32,
    pub eDir: OMX_DIRTYPE,
    pub nBufferCountActual: OMX_U32,
    pub nBufferCountMin: OMX_U32,
    pub nBufferSize: OMX_U32,
    pub bEnabled: OMX_BOOL,
    pub bPopulated: OMX_BOOL,
    pub eDomain: OMX_PORTDOMAINTYPE,
    pub format: OMX_PORTDEFINITION_FORMAT,
    pub bBuffersContiguous: OMX_BOOL,
    pub nBufferAlignment: OMX_U32,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct OMX_BUFFERHEADERTYPE {
    pub nSize: OMX_U32,
    pub nVersion: OMX_VERSIONTYPE,
    pub pBuffer: *mut OMX_U8,
    pub nAllocLen: OMX_U32,
    pub nFilledLen: OMX_U32,
    pub nOffset: OMX_U32,
    pub pAppPrivate: OMX_PTR,
    pub pPlatformPrivate: OMX_PTR,
    pub pInputPortPrivate: OMX_PTR,
    pub pOutputPortPrivate: OMX_PTR,
    pub hMarkTargetComponent: OMX_HANDLETYPE,
    pub pMarkData: OMX_PTR,
    pub nTickCount: OMX_U32,
    pub nTimeStamp: OMX_TICKS,
    pub nFlags: OMX_U32,
    pub nOutputPortIndex: OMX_U32,
    pub nInputPortIndex: OMX_U32,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct OMX_TUNNELSETUPTYPE {
    pub nTunnelFlags: OMX_U32,
    pub eSupplier: OMX_U32,
}

/// Implemented by every parameter structure that starts with the `nSize`/`nVersion` header.
///
/// # Safety
///
/// Implementors must be `#[repr(C)]` structures whose first two fields are `nSize: OMX_U32` and
/// `nVersion: OMX_VERSIONTYPE`, and for which the all-zero bit pattern is valid.
pub unsafe trait OmxStruct: Copy {
    fn header_mut(&mut self) -> (&mut OMX_U32, &mut OMX_VERSIONTYPE);
}

macro_rules! omx_struct {
    ($($t:ty),* $(,)?) => {
        $(
            // Safe because the type is a repr(C) struct starting with nSize/nVersion that only
            // contains integers, raw pointers and unions of those.
            unsafe impl OmxStruct for $t {
                fn header_mut(&mut self) -> (&mut OMX_U32, &mut OMX_VERSIONTYPE) {
                    (&mut self.nSize, &mut self.nVersion)
                }
            }
        )*
    };
}

omx_struct!(
    OMX_PORT_PARAM_TYPE,
    OMX_PRIORITYMGMTTYPE,
    OMX_PARAM_PORTDEFINITIONTYPE,
    OMX_BUFFERHEADERTYPE,
);

/// Returns a zeroed `T` with its size and version header filled in.
pub fn omx_struct_init<T: OmxStruct>() -> T {
    // Safe because `OmxStruct` guarantees the all-zero pattern is a valid `T`.
    let mut value: T = unsafe { std::mem::zeroed() };
    let (size, version) = value.header_mut();
    *size = std::mem::size_of::<T>() as OMX_U32;
    *version = OMX_VERSIONTYPE::spec();
    value
}

pub type OMX_EventHandlerFn = unsafe extern "C" fn(
    hComponent: OMX_HANDLETYPE,
    pAppData: OMX_PTR,
    eEvent: OMX_EVENTTYPE,
    nData1: OMX_U32,
    nData2: OMX_U32,
    pEventData: OMX_PTR,
) -> OMX_ERRORTYPE;

pub type OMX_BufferDoneFn = unsafe extern "C" fn(
    hComponent: OMX_HANDLETYPE,
    pAppData: OMX_PTR,
    pBuffer: *mut OMX_BUFFERHEADERTYPE,
) -> OMX_ERRORTYPE;

#[repr(C)]
#[derive(Copy, Clone)]
pub struct OMX_CALLBACKTYPE {
    pub EventHandler: Option<OMX_EventHandlerFn>,
    pub EmptyBufferDone: Option<OMX_BufferDoneFn>,
    pub FillBufferDone: Option<OMX_BufferDoneFn>,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct OMX_COMPONENTTYPE {
    pub nSize: OMX_U32,
    pub nVersion: OMX_VERSIONTYPE,
    pub pComponentPrivate: OMX_PTR,
    pub pApplicationPrivate: OMX_PTR,
    pub GetComponentVersion: Option<
        unsafe extern "C" fn(
            hComponent: OMX_HANDLETYPE,
            pComponentName: OMX_STRING,
            pComponentVersion: *mut OMX_VERSIONTYPE,
            pSpecVersion: *mut OMX_VERSIONTYPE,
            pComponentUUID: *mut OMX_UUIDTYPE,
        ) -> OMX_ERRORTYPE,
    >,
    pub SendCommand: Option<
        unsafe extern "C" fn(
            hComponent: OMX_HANDLETYPE,
            Cmd: OMX_COMMANDTYPE,
            nParam1: OMX_U32,
            pCmdData: OMX_PTR,
        ) -> OMX_ERRORTYPE,
    >,
    pub GetParameter: Option<
        unsafe extern "C" fn(
            hComponent: OMX_HANDLETYPE,
            nParamIndex: OMX_INDEXTYPE,
            pComponentParameterStructure: OMX_PTR,
        ) -> OMX_ERRORTYPE,
    >,
    pub SetParameter: Option<
        unsafe extern "C" fn(
            hComponent: OMX_HANDLETYPE,
            nIndex: OMX_INDEXTYPE,
            pComponentParameterStructure: OMX_PTR,
        ) -> OMX_ERRORTYPE,
    >,
    pub GetConfig: Option<
        unsafe extern "C" fn(
            hComponent: OMX_HANDLETYPE,
            nIndex: OMX_INDEXTYPE,
            pComponentConfigStructure: OMX_PTR,
        ) -> OMX_ERRORTYPE,
    >,
    pub SetConfig: Option<
        unsafe extern "C" fn(
            hComponent: OMX_HANDLETYPE,
            nIndex: OMX_INDEXTYPE,
            pComponentConfigStructure: OMX_PTR,
        ) -> OMX_ERRORTYPE,
    >,
    pub GetExtensionIndex: Option<
        unsafe extern "C" fn(
            hComponent: OMX_HANDLETYPE,
            cParameterName: OMX_STRING,
            pIndexType: *mut OMX_INDEXTYPE,
        ) -> OMX_ERRORTYPE,
    >,
    pub GetState: Option<
        unsafe extern "C" fn(hComponent: OMX_HANDLETYPE, pState: *mut OMX_STATETYPE) -> OMX_ERRORTYPE,
    >,
    pub ComponentTunnelRequest: Option<
        unsafe extern "C" fn(
            hComp: OMX_HANDLETYPE,
            nPort: OMX_U32,
            hTunneledComp: OMX_HANDLETYPE,
            nTunneledPort: OMX_U32,
            pTunnelSetup: *mut OMX_TUNNELSETUPTYPE,
        ) -> OMX_ERRORTYPE,
    >,
    pub UseBuffer: Option<
        unsafe extern "C" fn(
            hComponent: OMX_HANDLETYPE,
            ppBufferHdr: *mut *mut OMX_BUFFERHEADERTYPE,
            nPortIndex: OMX_U32,
            pAppPrivate: OMX_PTR,
            nSizeBytes: OMX_U32,
            pBuffer: *mut OMX_U8,
        ) -> OMX_ERRORTYPE,
    >,
    pub AllocateBuffer: Option<
        unsafe extern "C" fn(
            hComponent: OMX_HANDLETYPE,
            ppBuffer: *mut *mut OMX_BUFFERHEADERTYPE,
            nPortIndex: OMX_U32,
            pAppPrivate: OMX_PTR,
            nSizeBytes: OMX_U32,
        ) -> OMX_ERRORTYPE,
    >,
    pub FreeBuffer: Option<
        unsafe extern "C" fn(
            hComponent: OMX_HANDLETYPE,
            nPortIndex: OMX_U32,
            pBuffer: *mut OMX_BUFFERHEADERTYPE,
        ) -> OMX_ERRORTYPE,
    >,
    pub EmptyThisBuffer: Option<
        unsafe extern "C" fn(
            hComponent: OMX_HANDLETYPE,
            pBuffer: *mut OMX_BUFFERHEADERTYPE,
        ) -> OMX_ERRORTYPE,
    >,
    pub FillThisBuffer: Option<
        unsafe extern "C" fn(
            hComponent: OMX_HANDLETYPE,
            pBuffer: *mut OMX_BUFFERHEADERTYPE,
        ) -> OMX_ERRORTYPE,
    >,
    pub SetCallbacks: Option<
        unsafe extern "C" fn(
            hComponent: OMX_HANDLETYPE,
            pCallbacks: *mut OMX_CALLBACKTYPE,
            pAppData: OMX_PTR,
        ) -> OMX_ERRORTYPE,
    >,
    pub ComponentDeInit: Option<unsafe extern "C" fn(hComponent: OMX_HANDLETYPE) -> OMX_ERRORTYPE>,
    pub UseEGLImage: Option<
        unsafe extern "C" fn(
            hComponent: OMX_HANDLETYPE,
            ppBufferHdr: *mut *mut OMX_BUFFERHEADERTYPE,
            nPortIndex: OMX_U32,
            pAppPrivate: OMX_PTR,
            eglImage: *mut c_void,
        ) -> OMX_ERRORTYPE,
    >,
    pub ComponentRoleEnum: Option<
        unsafe extern "C" fn(
            hComponent: OMX_HANDLETYPE,
            cRole: *mut OMX_U8,
            nIndex: OMX_U32,
        ) -> OMX_ERRORTYPE,
    >,
}

// Entry points exported by an OMX core library. They are resolved at runtime, so only their
// signatures are declared.
pub type OMX_InitFn = unsafe extern "C" fn() -> OMX_ERRORTYPE;
pub type OMX_DeinitFn = unsafe extern "C" fn() -> OMX_ERRORTYPE;
pub type OMX_ComponentNameEnumFn = unsafe extern "C" fn(
    cComponentName: OMX_STRING,
    nNameLength: OMX_U32,
    nIndex: OMX_U32,
) -> OMX_ERRORTYPE;
pub type OMX_GetHandleFn = unsafe extern "C" fn(
    pHandle: *mut OMX_HANDLETYPE,
    cComponentName: OMX_STRING,
    pAppData: OMX_PTR,
    pCallBacks: *mut OMX_CALLBACKTYPE,
) -> OMX_ERRORTYPE;
pub type OMX_FreeHandleFn = unsafe extern "C" fn(hComponent: OMX_HANDLETYPE) -> OMX_ERRORTYPE;
pub type OMX_SetupTunnelFn = unsafe extern "C" fn(
    hOutput: OMX_HANDLETYPE,
    nPortOutput: OMX_U32,
    hInput: OMX_HANDLETYPE,
    nPortInput: OMX_U32,
) -> OMX_ERRORTYPE;

pub const OMX_INIT_SYMBOL: &[u8] = b"OMX_Init\0";
pub const OMX_DEINIT_SYMBOL: &[u8] = b"OMX_Deinit\0";
pub const OMX_COMPONENT_NAME_ENUM_SYMBOL: &[u8] = b"OMX_ComponentNameEnum\0";
pub const OMX_GET_HANDLE_SYMBOL: &[u8] = b"OMX_GetHandle\0";
pub const OMX_FREE_HANDLE_SYMBOL: &[u8] = b"OMX_FreeHandle\0";
pub const OMX_SETUP_TUNNEL_SYMBOL: &[u8] = b"OMX_SetupTunnel\0";

#[cfg(all(test, target_pointer_width = "64"))]
mod tests {
    use std::mem::offset_of;
    use std::mem::size_of;

    use super::*;

    #[test]
    fn buffer_header_layout() {
        assert_eq!(size_of::<OMX_BUFFERHEADERTYPE>(), 112);
        assert_eq!(offset_of!(OMX_BUFFERHEADERTYPE, pBuffer), 8);
        assert_eq!(offset_of!(OMX_BUFFERHEADERTYPE, pAppPrivate), 32);
        assert_eq!(offset_of!(OMX_BUFFERHEADERTYPE, nTimeStamp), 88);
        assert_eq!(offset_of!(OMX_BUFFERHEADERTYPE, nInputPortIndex), 104);
    }

    #[test]
    fn port_definition_layout() {
        assert_eq!(size_of::<OMX_PORTDEFINITION_FORMAT>(), 64);
        assert_eq!(offset_of!(OMX_PARAM_PORTDEFINITIONTYPE, format), 40);
        assert_eq!(size_of::<OMX_PARAM_PORTDEFINITIONTYPE>(), 112);
    }

    #[test]
    fn struct_init_fills_header() {
        let param: OMX_PORT_PARAM_TYPE = omx_struct_init();
        assert_eq!(param.nSize as usize, size_of::<OMX_PORT_PARAM_TYPE>());
        // Safe because both union members are plain integers.
        let version = unsafe { param.nVersion.s };
        assert_eq!(version.nVersionMajor, 1);
        assert_eq!(version.nVersionMinor, 1);
        assert_eq!(version.nRevision, 2);
        assert_eq!(param.nPorts, 0);
    }
}
