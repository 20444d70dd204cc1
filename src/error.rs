// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::io;
use std::path::PathBuf;

use omx::BufferId;
use omx::Direction;
use omx::OmxError;
use omx::OmxResult;
use omx::State;
use remain::sorted;
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of a failed test.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The harness itself could not run the test.
    Harness,
    ProtocolViolation,
    ResourceExhaustion,
    StateMismatch,
    Timeout,
    UnderlyingCallFailure,
    UnexpectedSuccess,
}

/// Inconsistent data reported by the component under test.
#[sorted]
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum Violation {
    #[error("port {port}: {actual} buffers requested, minimum is {min}")]
    BufferCount { port: u32, actual: u32, min: u32 },
    #[error("component reached Idle still holding {count} {direction} buffers")]
    BuffersHeld { direction: Direction, count: usize },
    #[error("{callback} returned buffer {id} with port indices {input:#x}/{output:#x}")]
    DirectionMismatch {
        callback: &'static str,
        id: BufferId,
        input: u32,
        output: u32,
    },
    #[error("{direction} buffer {id} returned more times than it was issued")]
    ExcessReturn { direction: Direction, id: BufferId },
    #[error("buffer {id}: offset {offset} + filled length {filled} exceeds {alloc} bytes")]
    FilledBeyondAlloc {
        id: BufferId,
        offset: u32,
        filled: u32,
        alloc: u32,
    },
    #[error("port {port}: new buffer {id} does not match the request ({detail})")]
    HeaderMismatch {
        port: u32,
        id: BufferId,
        detail: &'static str,
    },
    #[error("{direction} buffer {id} was never allocated")]
    UnknownBuffer { direction: Direction, id: BufferId },
    #[error("command completion reports unknown state {0}")]
    UnknownState(u32),
}

#[sorted]
#[derive(Error, Debug)]
pub enum Error {
    #[error("{call} failed: {error}")]
    ComponentCall { call: &'static str, error: OmxError },
    #[error("failed to parse config: {0}")]
    ConfigParse(serde_json::Error),
    #[error("failed to read config {path}: {source}")]
    ConfigRead { path: PathBuf, source: io::Error },
    #[error("failed to read input stream: {0}")]
    InputRead(io::Error),
    #[error("component reported insufficient resources")]
    InsufficientResources,
    #[error("protocol violation: {0}")]
    ProtocolViolation(Violation),
    #[error("expected state {expected}, component reports {actual}")]
    StateMismatch { expected: State, actual: State },
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
    #[error("{0} happened although it should not have")]
    UnexpectedSuccess(&'static str),
    #[error("unknown test `{0}`")]
    UnknownTest(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        use self::Error::*;
        match self {
            ComponentCall {
                error: OmxError::InsufficientResources,
                ..
            }
            | InsufficientResources => ErrorKind::ResourceExhaustion,
            ComponentCall { .. } => ErrorKind::UnderlyingCallFailure,
            ConfigParse(_) | ConfigRead { .. } | InputRead(_) | UnknownTest(_) => {
                ErrorKind::Harness
            }
            ProtocolViolation(_) => ErrorKind::ProtocolViolation,
            StateMismatch { .. } => ErrorKind::StateMismatch,
            Timeout(_) => ErrorKind::Timeout,
            UnexpectedSuccess(_) => ErrorKind::UnexpectedSuccess,
        }
    }
}

impl From<Violation> for Error {
    fn from(violation: Violation) -> Error {
        Error::ProtocolViolation(violation)
    }
}

/// Attaches the name of the component call to its error.
pub trait CallResult<T> {
    fn call(self, call: &'static str) -> Result<T>;
}

impl<T> CallResult<T> for OmxResult<T> {
    fn call(self, call: &'static str) -> Result<T> {
        self.map_err(|error| Error::ComponentCall { call, error })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(
            Err::<(), _>(OmxError::InsufficientResources)
                .call("SendCommand")
                .unwrap_err()
                .kind(),
            ErrorKind::ResourceExhaustion
        );
        assert_eq!(
            Err::<(), _>(OmxError::BadParameter)
                .call("UseBuffer")
                .unwrap_err()
                .kind(),
            ErrorKind::UnderlyingCallFailure
        );
        assert_eq!(Error::Timeout("Idle").kind(), ErrorKind::Timeout);
        assert_eq!(
            Error::from(Violation::UnknownState(9)).kind(),
            ErrorKind::ProtocolViolation
        );
    }

    #[test]
    fn messages_name_the_call() {
        let e = Err::<(), _>(OmxError::IncorrectStateOperation)
            .call("EmptyThisBuffer")
            .unwrap_err();
        assert_eq!(
            e.to_string(),
            "EmptyThisBuffer failed: incorrect state operation"
        );
    }
}
