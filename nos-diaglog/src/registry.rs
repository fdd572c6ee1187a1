//! Drain registry
//!
//! An arena of `N` slots indexed by [`DrainHandle`]. Occupancy is tracked in
//! a bitmap so handle checks stay O(1); sinks are held by shared ownership so
//! the dispatch loop can call one without keeping the registry borrowed.

use alloc::sync::Arc;

use bitflags::bitflags;

use crate::cursor::DrainHandle;
use crate::error::{DiagError, Result};
use crate::sink::DrainSink;

bitflags! {
    /// Occupied-slot bitmap, one bit per slot index
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SlotSet: u32 {
        const _ = !0;
    }
}

impl SlotSet {
    pub const fn slot(index: usize) -> Self {
        Self::from_bits_retain(1 << index)
    }

    pub fn has(&self, index: usize) -> bool {
        index < 32 && self.contains(Self::slot(index))
    }
}

/// Slot arena of registered sinks
pub struct DrainRegistry<const N: usize> {
    sinks: [Option<Arc<dyn DrainSink>>; N],
    occupied: SlotSet,
}

impl<const N: usize> DrainRegistry<N> {
    const SLOTS_OK: () = assert!(N >= 1 && N <= 32, "drain slot count must fit the bitmap");

    pub const fn new() -> Self {
        let () = Self::SLOTS_OK;
        Self {
            sinks: [const { None }; N],
            occupied: SlotSet::empty(),
        }
    }

    /// Bind `sink` to the lowest free slot
    pub fn bind(&mut self, sink: Arc<dyn DrainSink>) -> Result<DrainHandle> {
        let index = (0..N)
            .find(|&i| !self.occupied.has(i))
            .ok_or(DiagError::RegistryFull)?;
        self.sinks[index] = Some(sink);
        self.occupied.insert(SlotSet::slot(index));
        Ok(DrainHandle::new(index as u8))
    }

    /// Free a slot, handing back its sink
    pub fn unbind(&mut self, handle: DrainHandle) -> Option<Arc<dyn DrainSink>> {
        if !self.is_occupied(handle) {
            return None;
        }
        self.occupied.remove(SlotSet::slot(handle.index()));
        self.sinks[handle.index()].take()
    }

    pub fn is_occupied(&self, handle: DrainHandle) -> bool {
        handle.index() < N && self.occupied.has(handle.index())
    }

    pub fn sink(&self, handle: DrainHandle) -> Option<Arc<dyn DrainSink>> {
        if !self.is_occupied(handle) {
            return None;
        }
        self.sinks[handle.index()].clone()
    }

    pub fn occupied(&self) -> SlotSet {
        self.occupied
    }

    pub fn len(&self) -> usize {
        self.occupied.bits().count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.occupied.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() == N
    }

    /// Handles of occupied slots in index order
    pub fn handles(&self) -> impl Iterator<Item = DrainHandle> + '_ {
        (0..N)
            .filter(|&i| self.occupied.has(i))
            .map(|i| DrainHandle::new(i as u8))
    }
}

impl<const N: usize> Default for DrainRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}
