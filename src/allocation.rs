// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Populating and unpopulating the ports of the component under test.

use log::debug;
use log::warn;
use omx::BufferRequest;
use omx::Direction;
use omx::OmxError;
use omx::PortDefinition;

use crate::buffer::BufferDescriptor;
use crate::config::BufferSource;
use crate::context::FirstError;
use crate::context::TestContext;
use crate::error::CallResult;
use crate::error::Error;
use crate::error::Result;
use crate::error::Violation;

/// Allocates `buffer_count_actual` buffers on every enabled port the driver supplies.
///
/// Stops at the first failure. Buffers obtained before it stay in the context's lists for
/// [`deinit_buffers`] to free.
pub fn allocate_all_buffers(ctx: &mut TestContext) -> Result<()> {
    ctx.refresh_ports()?;
    let ports: Vec<PortDefinition> = ctx
        .ports()
        .iter()
        .filter(|p| p.enabled && !ctx.is_tunneled(p.index))
        .copied()
        .collect();
    for definition in &ports {
        allocate_port(ctx, definition)?;
    }
    Ok(())
}

/// Allocates the buffers of one port as its definition asks for.
pub fn allocate_port(ctx: &TestContext, definition: &PortDefinition) -> Result<()> {
    let actual = definition.buffer_count_actual;
    let min = definition.buffer_count_min;
    if min == 0 || actual < min {
        return Err(Violation::BufferCount {
            port: definition.index,
            actual,
            min,
        }
        .into());
    }
    let request = BufferRequest {
        port: definition.index,
        size: definition.buffer_size,
        alignment: definition.buffer_alignment,
        contiguous: definition.buffers_contiguous,
    };
    debug!(
        "{}: allocating {} x {} bytes on {} port {}",
        ctx.name(),
        actual,
        request.size,
        definition.direction,
        request.port
    );
    for _ in 0..actual {
        let header = match ctx.config.buffer_source {
            BufferSource::Driver => ctx.component.use_buffer(&request).call("UseBuffer")?,
            BufferSource::Component => ctx
                .component
                .allocate_buffer(&request)
                .call("AllocateBuffer")?,
        };
        let descriptor = match BufferDescriptor::new(header, &request, definition.direction) {
            Ok(descriptor) => descriptor,
            Err(violation) => {
                if let Err(e) = ctx.component.free_buffer(request.port, header.id) {
                    warn!("failed to free mismatched buffer {}: {}", header.id, e);
                }
                return Err(violation.into());
            }
        };
        // A reused id is not freed here; teardown frees the buffer already tracked under it.
        ctx.shared
            .list(definition.direction)
            .lock()
            .insert(descriptor)?;
    }
    Ok(())
}

/// Frees every buffer the driver holds, on all ports.
///
/// An `InvalidState` error from the component is expected once it has left the states where
/// buffers can be freed and is not reported.
pub fn deinit_buffers(ctx: &TestContext) -> Result<()> {
    let mut first = FirstError::default();
    for direction in [Direction::Input, Direction::Output] {
        let buffers = ctx.shared.list(direction).lock().drain();
        for buffer in buffers {
            first.note(free(ctx, &buffer));
        }
    }
    first.into_result()
}

/// Frees every buffer the driver holds on `port`.
pub fn free_port_buffers(ctx: &TestContext, port: u32, direction: Direction) -> Result<()> {
    let mut first = FirstError::default();
    let buffers = ctx.shared.list(direction).lock().remove_port(port);
    for buffer in buffers {
        first.note(free(ctx, &buffer));
    }
    first.into_result()
}

fn free(ctx: &TestContext, buffer: &BufferDescriptor) -> Result<()> {
    match ctx.component.free_buffer(buffer.port, buffer.header.id) {
        Ok(()) => Ok(()),
        Err(OmxError::InvalidState) => {
            debug!("FreeBuffer({}) in invalid state", buffer.header.id);
            Ok(())
        }
        Err(error) => Err(Error::ComponentCall {
            call: "FreeBuffer",
            error,
        }),
    }
}
