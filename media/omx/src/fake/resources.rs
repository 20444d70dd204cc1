// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::collections::VecDeque;
use std::sync::mpsc::Sender;

use log::debug;
use sync::Mutex;

use super::component::Msg;
use crate::types::ComponentId;

struct Holder {
    id: ComponentId,
    group_priority: u32,
    notifier: Sender<Msg>,
}

#[derive(Default)]
struct PoolState {
    holders: Vec<Holder>,
    waiters: VecDeque<Holder>,
}

/// Fixed number of processing units shared by every fake component of one core. A component
/// holds one unit from the moment it reaches Idle until it returns to Loaded.
///
/// Callers hold their own component lock while calling in here; the pool never locks a
/// component and only talks to other components through their message channels.
pub(super) struct ResourcePool {
    capacity: usize,
    state: Mutex<PoolState>,
}

impl ResourcePool {
    pub fn new(capacity: usize) -> ResourcePool {
        ResourcePool {
            capacity,
            state: Mutex::new(PoolState::default()),
        }
    }

    pub fn in_use(&self) -> usize {
        self.state.lock().holders.len()
    }

    /// Takes one unit for `id`. When none is free, the holder with the numerically largest group
    /// priority is preempted if that number is larger than `group_priority`. Returns false if no
    /// unit could be obtained.
    pub fn acquire(&self, id: ComponentId, group_priority: u32, notifier: Sender<Msg>) -> bool {
        let mut state = self.state.lock();
        if state.holders.iter().any(|h| h.id == id) {
            return true;
        }
        if state.holders.len() >= self.capacity {
            let victim = state
                .holders
                .iter()
                .enumerate()
                .filter(|(_, h)| h.group_priority > group_priority)
                .max_by_key(|(_, h)| h.group_priority)
                .map(|(i, _)| i);
            let Some(victim) = victim else {
                return false;
            };
            let victim = state.holders.remove(victim);
            debug!("{} preempts {}", id, victim.id);
            // A victim that already went away has nothing left to release.
            let _ = victim.notifier.send(Msg::Preempt);
        }
        state.holders.push(Holder {
            id,
            group_priority,
            notifier,
        });
        true
    }

    /// Returns the unit held by `id`, if any, handing it to the oldest waiter.
    pub fn release(&self, id: ComponentId) {
        let mut state = self.state.lock();
        let before = state.holders.len();
        state.holders.retain(|h| h.id != id);
        if state.holders.len() == before {
            return;
        }
        while state.holders.len() < self.capacity {
            let Some(waiter) = state.waiters.pop_front() else {
                break;
            };
            if waiter.notifier.send(Msg::ResourcesGranted).is_ok() {
                debug!("{} granted to waiting {}", id, waiter.id);
                state.holders.push(waiter);
            }
        }
    }

    /// Queues `id` for the next unit that gets released.
    pub fn wait(&self, id: ComponentId, group_priority: u32, notifier: Sender<Msg>) {
        let mut state = self.state.lock();
        if state.waiters.iter().any(|h| h.id == id) {
            return;
        }
        state.waiters.push_back(Holder {
            id,
            group_priority,
            notifier,
        });
    }

    pub fn cancel_wait(&self, id: ComponentId) {
        self.state.lock().waiters.retain(|h| h.id != id);
    }

    pub fn set_priority(&self, id: ComponentId, group_priority: u32) {
        let mut state = self.state.lock();
        let PoolState { holders, waiters } = &mut *state;
        for holder in holders.iter_mut().chain(waiters.iter_mut()) {
            if holder.id == id {
                holder.group_priority = group_priority;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::channel;

    use super::*;

    #[test]
    fn capacity_is_enforced() {
        let pool = ResourcePool::new(2);
        let (tx, _rx) = channel();
        assert!(pool.acquire(ComponentId(1), 0, tx.clone()));
        assert!(pool.acquire(ComponentId(2), 0, tx.clone()));
        assert!(!pool.acquire(ComponentId(3), 0, tx.clone()));
        // Re-acquiring an existing hold is a no-op.
        assert!(pool.acquire(ComponentId(1), 0, tx));
        assert_eq!(pool.in_use(), 2);
    }

    #[test]
    fn lower_number_preempts_higher_number() {
        let pool = ResourcePool::new(1);
        let (victim_tx, victim_rx) = channel();
        let (tx, _rx) = channel();
        assert!(pool.acquire(ComponentId(1), 5, victim_tx));
        assert!(!pool.acquire(ComponentId(2), 5, tx.clone()));
        assert!(pool.acquire(ComponentId(2), 1, tx));
        assert!(matches!(victim_rx.try_recv(), Ok(Msg::Preempt)));
        assert_eq!(pool.in_use(), 1);
    }

    #[test]
    fn release_grants_to_waiter() {
        let pool = ResourcePool::new(1);
        let (tx, _rx) = channel();
        let (waiter_tx, waiter_rx) = channel();
        assert!(pool.acquire(ComponentId(1), 0, tx));
        pool.wait(ComponentId(2), 0, waiter_tx);
        pool.release(ComponentId(1));
        assert!(matches!(waiter_rx.try_recv(), Ok(Msg::ResourcesGranted)));
        assert_eq!(pool.in_use(), 1);
        pool.release(ComponentId(2));
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn cancelled_waiter_is_skipped() {
        let pool = ResourcePool::new(1);
        let (tx, _rx) = channel();
        let (waiter_tx, waiter_rx) = channel();
        assert!(pool.acquire(ComponentId(1), 0, tx));
        pool.wait(ComponentId(2), 0, waiter_tx);
        pool.cancel_wait(ComponentId(2));
        pool.release(ComponentId(1));
        assert!(waiter_rx.try_recv().is_err());
        assert_eq!(pool.in_use(), 0);
    }
}
