// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Steady-state buffer exchange with an executing component.

use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;

use log::debug;
use log::info;
use omx::BufferFlags;
use omx::Direction;
use sync::EventWaitResult;

use crate::config::TestConfig;
use crate::context::TestContext;
use crate::error::CallResult;
use crate::error::Error;
use crate::error::Result;

enum Source {
    File(BufReader<File>),
    Pattern(u8),
}

/// Data fed to input ports: the configured input file, or an endless byte pattern.
pub struct InputStream {
    source: Source,
    exhausted: bool,
}

impl InputStream {
    pub fn open(config: &TestConfig) -> Result<InputStream> {
        let source = match &config.input_file {
            Some(path) => Source::File(BufReader::new(
                File::open(path).map_err(Error::InputRead)?,
            )),
            None => Source::Pattern(0),
        };
        Ok(InputStream {
            source,
            exhausted: false,
        })
    }

    /// True once the chunk carrying end-of-stream has been produced.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Restarts a file from its first byte so a later phase has data again. The pattern source
    /// is left as is.
    pub fn rewind(&mut self) -> Result<()> {
        if let Source::File(reader) = &mut self.source {
            reader.seek(SeekFrom::Start(0)).map_err(Error::InputRead)?;
            debug!("input file rewound");
        }
        self.exhausted = false;
        Ok(())
    }

    /// Reads up to `len` bytes. The chunk that reaches the end of a file carries `EOS`.
    pub fn next_chunk(&mut self, len: usize) -> Result<(Vec<u8>, BufferFlags)> {
        match &mut self.source {
            Source::File(reader) => {
                let mut chunk = Vec::with_capacity(len);
                reader
                    .take(len as u64)
                    .read_to_end(&mut chunk)
                    .map_err(Error::InputRead)?;
                if chunk.len() < len {
                    self.exhausted = true;
                    return Ok((chunk, BufferFlags::EOS));
                }
                Ok((chunk, BufferFlags::empty()))
            }
            Source::Pattern(next) => {
                let chunk = (0..len)
                    .map(|_| {
                        *next = next.wrapping_add(1);
                        *next
                    })
                    .collect();
                Ok((chunk, BufferFlags::END_OF_FRAME))
            }
        }
    }
}

/// Hands every free output buffer to the component for filling. Returns how many were sent.
pub fn read_out_buffers(ctx: &TestContext) -> Result<usize> {
    let mut submitted = 0;
    loop {
        let Some(buffer) = ctx.shared.outputs.lock().take_free() else {
            break;
        };
        if let Err(error) = ctx.component.fill_this_buffer(&buffer.header) {
            ctx.shared.outputs.lock().restore(buffer.header.id);
            return Err(error).call("FillThisBuffer");
        }
        submitted += 1;
    }
    Ok(submitted)
}

/// Fills every free input buffer from `input` and hands it to the component. Returns how many
/// were sent.
pub fn write_in_buffers(ctx: &TestContext, input: &mut InputStream) -> Result<usize> {
    let mut submitted = 0;
    while !input.is_exhausted() {
        let Some(buffer) = ctx.shared.inputs.lock().take_free() else {
            break;
        };
        let (chunk, flags) = match input.next_chunk(buffer.size as usize) {
            Ok(next) => next,
            Err(e) => {
                ctx.shared.inputs.lock().restore(buffer.header.id);
                return Err(e);
            }
        };
        if let Err(error) = ctx
            .component
            .empty_this_buffer(&buffer.header, &chunk, flags)
        {
            ctx.shared.inputs.lock().restore(buffer.header.id);
            return Err(error).call("EmptyThisBuffer");
        }
        submitted += 1;
    }
    Ok(submitted)
}

/// Exchanges buffers with the component until `quota` more buffers have come back or an
/// end-of-stream has been returned. An input file that ended in an earlier run is replayed.
///
/// The driver only ever submits free buffers, so the number of buffers the component declared is
/// the depth of the queue. When nothing is free the loop sleeps until a buffer comes back; if
/// none does within the traffic timeout the component is considered stalled. Returns the number
/// of buffers that came back during the run.
pub fn run_traffic(ctx: &TestContext, input: &mut InputStream, quota: u64) -> Result<u64> {
    if input.is_exhausted() {
        input.rewind()?;
    }
    let start = {
        let mut status = ctx.shared.status.lock();
        status.eos = false;
        status.exchanges
    };
    let timeout = ctx.config.traffic_timeout();
    loop {
        {
            let status = ctx.shared.status.lock();
            if let Some(violation) = &status.violation {
                return Err(Error::ProtocolViolation(violation.clone()));
            }
            let done = status.exchanges - start;
            if done >= quota || status.eos {
                info!(
                    "{}: {} buffers exchanged{}",
                    ctx.name(),
                    done,
                    if status.eos { " (end of stream)" } else { "" }
                );
                return Ok(done);
            }
            // Reset before scanning the lists so a return racing with the scan is not missed.
            ctx.shared.events.buffer_done.reset();
        }
        let submitted = write_in_buffers(ctx, input)? + read_out_buffers(ctx)?;
        if submitted > 0 {
            continue;
        }
        if input.is_exhausted()
            && ctx.shared.outputs.lock().total() == 0
            && ctx.shared.inputs.lock().busy() == 0
        {
            // A sink that has consumed the whole stream.
            let done = ctx.exchanges() - start;
            info!("{}: input consumed after {} buffers", ctx.name(), done);
            return Ok(done);
        }
        if ctx.shared.events.buffer_done.wait_timeout(timeout) == EventWaitResult::TimedOut {
            debug!(
                "{}: {} input and {} output buffers outstanding",
                ctx.name(),
                ctx.shared.list(Direction::Input).lock().busy(),
                ctx.shared.list(Direction::Output).lock().busy()
            );
            return Err(Error::Timeout("buffer returns"));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn file_stream_ends_with_eos() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[7u8; 10]).unwrap();
        let config = TestConfig {
            input_file: Some(file.path().to_owned()),
            ..Default::default()
        };
        let mut input = InputStream::open(&config).unwrap();
        let (chunk, flags) = input.next_chunk(8).unwrap();
        assert_eq!((chunk.len(), flags), (8, BufferFlags::empty()));
        assert!(!input.is_exhausted());
        let (chunk, flags) = input.next_chunk(8).unwrap();
        assert_eq!((chunk.len(), flags), (2, BufferFlags::EOS));
        assert!(input.is_exhausted());
    }

    #[test]
    fn rewind_replays_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[1, 2, 3, 4, 5]).unwrap();
        let config = TestConfig {
            input_file: Some(file.path().to_owned()),
            ..Default::default()
        };
        let mut input = InputStream::open(&config).unwrap();
        let (first, flags) = input.next_chunk(8).unwrap();
        assert_eq!(flags, BufferFlags::EOS);
        assert!(input.is_exhausted());

        input.rewind().unwrap();
        assert!(!input.is_exhausted());
        let (again, flags) = input.next_chunk(8).unwrap();
        assert_eq!((again, flags), (first, BufferFlags::EOS));
    }

    #[test]
    fn pattern_never_ends() {
        let mut input = InputStream::open(&TestConfig::default()).unwrap();
        let (first, _) = input.next_chunk(3).unwrap();
        let (second, _) = input.next_chunk(3).unwrap();
        assert_eq!(first, vec![1, 2, 3]);
        assert_eq!(second, vec![4, 5, 6]);
        assert!(!input.is_exhausted());
    }

    #[test]
    fn missing_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = TestConfig {
            input_file: Some(dir.path().join("missing.bin")),
            ..Default::default()
        };
        assert!(matches!(
            InputStream::open(&config),
            Err(Error::InputRead(_))
        ));
    }
}
