// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Bookkeeping of the buffers the driver has obtained from the component under test.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::VecDeque;

use omx::BufferHeader;
use omx::BufferId;
use omx::BufferRequest;
use omx::Direction;

use crate::error::Violation;

/// One buffer header obtained from `UseBuffer` or `AllocateBuffer`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub header: BufferHeader,
    pub port: u32,
    pub direction: Direction,
    pub size: u32,
    pub alignment: u32,
    pub contiguous: bool,
}

impl BufferDescriptor {
    /// Checks the header returned for `request` and wraps it.
    pub fn new(
        header: BufferHeader,
        request: &BufferRequest,
        direction: Direction,
    ) -> Result<BufferDescriptor, Violation> {
        let mismatch = |detail| Violation::HeaderMismatch {
            port: request.port,
            id: header.id,
            detail,
        };
        if header.port() != Some((direction, request.port)) {
            return Err(mismatch("port index"));
        }
        if header.alloc_len < request.size {
            return Err(mismatch("allocation length"));
        }
        Ok(BufferDescriptor {
            header,
            port: request.port,
            direction,
            size: header.alloc_len,
            alignment: request.alignment,
            contiguous: request.contiguous,
        })
    }
}

/// The buffers of one direction, split into those the driver may submit and those the component
/// currently holds.
///
/// `busy() <= total()` always holds: a buffer is either free or in flight, and a return for a
/// buffer that is not in flight is rejected instead of being counted.
#[derive(Debug)]
pub struct BufferList {
    direction: Direction,
    buffers: BTreeMap<BufferId, BufferDescriptor>,
    free: VecDeque<BufferId>,
    in_flight: BTreeSet<BufferId>,
}

impl BufferList {
    pub fn new(direction: Direction) -> BufferList {
        BufferList {
            direction,
            buffers: BTreeMap::new(),
            free: VecDeque::new(),
            in_flight: BTreeSet::new(),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Adds a newly allocated buffer as free. An id the list already tracks is refused and the
    /// tracked buffer is left alone.
    pub fn insert(&mut self, descriptor: BufferDescriptor) -> Result<(), Violation> {
        let id = descriptor.header.id;
        match self.buffers.entry(id) {
            Entry::Occupied(_) => Err(Violation::HeaderMismatch {
                port: descriptor.port,
                id,
                detail: "duplicate buffer id",
            }),
            Entry::Vacant(slot) => {
                slot.insert(descriptor);
                self.free.push_back(id);
                Ok(())
            }
        }
    }

    pub fn total(&self) -> usize {
        self.buffers.len()
    }

    pub fn busy(&self) -> usize {
        self.in_flight.len()
    }

    pub fn busy_on(&self, port: u32) -> usize {
        self.in_flight
            .iter()
            .filter(|id| self.buffers.get(id).map(|b| b.port) == Some(port))
            .count()
    }

    pub fn total_on(&self, port: u32) -> usize {
        self.buffers.values().filter(|b| b.port == port).count()
    }

    /// Any buffer of `port`, free or not.
    pub fn any_on(&self, port: u32) -> Option<BufferDescriptor> {
        self.buffers.values().find(|b| b.port == port).copied()
    }

    /// Marks the next free buffer as in flight and returns it.
    pub fn take_free(&mut self) -> Option<BufferDescriptor> {
        let id = self.free.pop_front()?;
        self.in_flight.insert(id);
        self.buffers.get(&id).copied()
    }

    /// Puts back a buffer whose submission the component refused.
    pub fn restore(&mut self, id: BufferId) {
        if self.in_flight.remove(&id) {
            self.free.push_front(id);
        }
    }

    /// Records that the component handed `header` back.
    pub fn complete(&mut self, header: &BufferHeader) -> Result<(), Violation> {
        let id = header.id;
        if self.in_flight.remove(&id) {
            self.free.push_back(id);
            return Ok(());
        }
        let direction = self.direction;
        if self.buffers.contains_key(&id) {
            Err(Violation::ExcessReturn { direction, id })
        } else {
            Err(Violation::UnknownBuffer { direction, id })
        }
    }

    /// Forgets every buffer of `port`, free or not, and returns them for freeing.
    pub fn remove_port(&mut self, port: u32) -> Vec<BufferDescriptor> {
        let ids: Vec<BufferId> = self
            .buffers
            .values()
            .filter(|b| b.port == port)
            .map(|b| b.header.id)
            .collect();
        ids.iter().filter_map(|id| self.remove(*id)).collect()
    }

    /// Forgets every buffer.
    pub fn drain(&mut self) -> Vec<BufferDescriptor> {
        self.free.clear();
        self.in_flight.clear();
        std::mem::take(&mut self.buffers).into_values().collect()
    }

    fn remove(&mut self, id: BufferId) -> Option<BufferDescriptor> {
        self.free.retain(|free| *free != id);
        self.in_flight.remove(&id);
        self.buffers.remove(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: u64, port: u32) -> BufferDescriptor {
        let request = BufferRequest {
            port,
            size: 64,
            alignment: 1,
            contiguous: false,
        };
        let header = BufferHeader::new(BufferId(id), port, Direction::Input, 64);
        BufferDescriptor::new(header, &request, Direction::Input).unwrap()
    }

    #[test]
    fn header_must_match_request() {
        let request = BufferRequest {
            port: 0,
            size: 64,
            alignment: 1,
            contiguous: false,
        };
        let wrong_dir = BufferHeader::new(BufferId(1), 0, Direction::Output, 64);
        assert!(matches!(
            BufferDescriptor::new(wrong_dir, &request, Direction::Input),
            Err(Violation::HeaderMismatch {
                detail: "port index",
                ..
            })
        ));
        let short = BufferHeader::new(BufferId(2), 0, Direction::Input, 32);
        assert!(matches!(
            BufferDescriptor::new(short, &request, Direction::Input),
            Err(Violation::HeaderMismatch {
                detail: "allocation length",
                ..
            })
        ));
    }

    #[test]
    fn busy_never_exceeds_total() {
        let mut list = BufferList::new(Direction::Input);
        list.insert(descriptor(1, 0)).unwrap();
        list.insert(descriptor(2, 0)).unwrap();
        let a = list.take_free().unwrap();
        let b = list.take_free().unwrap();
        assert!(list.take_free().is_none());
        assert_eq!((list.busy(), list.total()), (2, 2));

        list.complete(&a.header).unwrap();
        assert_eq!(
            list.complete(&a.header),
            Err(Violation::ExcessReturn {
                direction: Direction::Input,
                id: a.header.id
            })
        );
        assert_eq!(list.busy(), 1);
        list.restore(b.header.id);
        assert_eq!(list.busy(), 0);
    }

    #[test]
    fn duplicate_id_is_refused() {
        let mut list = BufferList::new(Direction::Input);
        list.insert(descriptor(1, 0)).unwrap();
        let taken = list.take_free().unwrap();
        assert_eq!(
            list.insert(descriptor(1, 2)),
            Err(Violation::HeaderMismatch {
                port: 2,
                id: BufferId(1),
                detail: "duplicate buffer id",
            })
        );
        assert_eq!((list.busy(), list.total()), (1, 1));
        assert!(list.take_free().is_none());
        assert_eq!(list.any_on(0), Some(taken));
    }

    #[test]
    fn unknown_return() {
        let mut list = BufferList::new(Direction::Input);
        let stray = BufferHeader::new(BufferId(9), 0, Direction::Input, 64);
        assert_eq!(
            list.complete(&stray),
            Err(Violation::UnknownBuffer {
                direction: Direction::Input,
                id: BufferId(9)
            })
        );
    }

    #[test]
    fn remove_port_takes_in_flight_too() {
        let mut list = BufferList::new(Direction::Input);
        list.insert(descriptor(1, 0)).unwrap();
        list.insert(descriptor(2, 2)).unwrap();
        list.insert(descriptor(3, 2)).unwrap();
        list.take_free();
        list.take_free();
        assert_eq!(list.busy_on(2), 1);
        assert_eq!(list.remove_port(2).len(), 2);
        assert_eq!((list.busy(), list.total()), (1, 1));
        assert_eq!(list.drain().len(), 1);
        assert_eq!((list.busy(), list.total()), (0, 0));
    }
}
