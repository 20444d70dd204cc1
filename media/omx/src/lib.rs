// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! A safe, typed view of OpenMAX IL 1.1.2 components.
//!
//! Components are reached through the [`Core`] trait, implemented both by [`native::OmxCore`],
//! which loads a vendor core library, and by [`fake::FakeCore`], an in-process stand-in.

pub mod fake;
pub mod native;

mod component;
mod error;
mod types;

pub use component::*;
pub use error::*;
pub use types::*;
