// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Blocking synchronization primitives shared between the conformance driver and the callback
//! threads of the component under test.
//!
//! The types in this crate panic where the standard library would return a poison error. A panic
//! while one of these locks is held already fails the test that owns it, so callers never have to
//! consider poison and `.lock().unwrap()` never needs to appear in driver code.

mod condvar;
mod event;
mod mutex;

pub use crate::condvar::Condvar;
pub use crate::event::EventWaitResult;
pub use crate::event::ManualResetEvent;
pub use crate::mutex::Mutex;
pub use crate::mutex::WouldBlock;
