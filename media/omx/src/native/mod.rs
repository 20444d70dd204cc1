// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Backend for vendor components loaded from an OMX core shared library.

mod callbacks;
mod handle;
mod loader;

pub use self::handle::OmxHandle;
pub use self::loader::OmxCore;
