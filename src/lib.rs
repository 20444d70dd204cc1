// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Conformance driver for OpenMAX IL components.
//!
//! A test instantiates the component under test through an [`omx::Core`], drives it through its
//! lifecycle states and port commands, exchanges buffers with it, and checks every callback it
//! makes against what the driver handed over. Each test returns a single [`error::Result`].

pub mod allocation;
pub mod buffer;
pub mod callbacks;
pub mod config;
pub mod context;
pub mod error;
pub mod instances;
pub mod port;
pub mod report;
pub mod scenarios;
pub mod traffic;
pub mod transition;
pub mod ttc;
pub mod wait;
