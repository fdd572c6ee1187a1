//! Cursor table
//!
//! One read position per drain slot. The slot holding the sentinel drain is
//! never consumed: its cursor only moves when the write path overtakes it, so
//! it always marks the oldest byte still retained in the ring. New and
//! rewound drains start from there.

use core::fmt;

use crate::store::{RingStore, advance};

/// Small integer naming a drain slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DrainHandle(u8);

impl DrainHandle {
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DrainHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "drain#{}", self.0)
    }
}

/// Read positions for `N` drain slots
#[derive(Debug, Clone)]
pub struct CursorTable<const N: usize> {
    positions: [usize; N],
    sentinel: Option<DrainHandle>,
}

impl<const N: usize> CursorTable<N> {
    pub const fn new() -> Self {
        Self {
            positions: [0; N],
            sentinel: None,
        }
    }

    pub fn sentinel(&self) -> Option<DrainHandle> {
        self.sentinel
    }

    pub fn set_sentinel(&mut self, handle: DrainHandle) {
        if handle.index() < N {
            self.sentinel = Some(handle);
        }
    }

    pub fn is_sentinel(&self, handle: DrainHandle) -> bool {
        self.sentinel == Some(handle)
    }

    /// Oldest retained byte; zero until a sentinel exists
    pub fn low_water_mark(&self) -> usize {
        self.sentinel.map_or(0, |s| self.positions[s.index()])
    }

    pub fn position(&self, handle: DrainHandle) -> Option<usize> {
        self.positions.get(handle.index()).copied()
    }

    /// Move a cursor back to the low-water mark
    pub fn rewind(&mut self, handle: DrainHandle) {
        let mark = self.low_water_mark();
        if let Some(pos) = self.positions.get_mut(handle.index()) {
            *pos = mark;
        }
    }

    /// Return every cursor to the empty-ring position
    pub fn reset(&mut self) {
        self.positions = [0; N];
    }

    /// Push forward any cursor whose next unread byte was just overwritten
    ///
    /// Called after every byte with the new write cursor. Unoccupied slots are
    /// included; their positions are rewritten on the next reserve anyway.
    #[inline]
    pub fn catch_up<const CAP: usize>(&mut self, write_cursor: usize) {
        for pos in self.positions.iter_mut() {
            if *pos == write_cursor {
                *pos = advance::<CAP>(*pos);
            }
        }
    }

    /// Copy unread bytes for `handle` into `buf`, advancing its cursor
    pub fn read_into<const CAP: usize>(
        &mut self,
        handle: DrainHandle,
        store: &RingStore<CAP>,
        buf: &mut [u8],
    ) -> usize {
        let Some(pos) = self.positions.get_mut(handle.index()) else {
            return 0;
        };
        let write_cursor = store.write_cursor();
        let mut read = 0;
        while read < buf.len() && *pos != write_cursor {
            buf[read] = store.byte_at(*pos);
            read += 1;
            *pos = advance::<CAP>(*pos);
        }
        read
    }

    /// Bytes waiting for `handle`
    pub fn unread<const CAP: usize>(&self, handle: DrainHandle, store: &RingStore<CAP>) -> usize {
        self.position(handle).map_or(0, |pos| store.unread_from(pos))
    }
}

impl<const N: usize> Default for CursorTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(bytes: &[u8], cursors: &mut CursorTable<3>) -> RingStore<8> {
        let mut store = RingStore::zeroed();
        store.reset();
        for &b in bytes {
            let w = store.push(b);
            cursors.catch_up::<8>(w);
        }
        store
    }

    #[test]
    fn test_read_into_stops_at_write_cursor() {
        let mut cursors: CursorTable<3> = CursorTable::new();
        let store = filled(b"abc", &mut cursors);
        let mut buf = [0u8; 8];
        assert_eq!(cursors.read_into(DrainHandle::new(1), &store, &mut buf), 3);
        assert_eq!(&buf[..3], b"abc");
        assert_eq!(cursors.read_into(DrainHandle::new(1), &store, &mut buf), 0);
    }

    #[test]
    fn test_catch_up_skips_overwritten_byte() {
        let mut cursors: CursorTable<3> = CursorTable::new();
        cursors.set_sentinel(DrainHandle::new(0));
        // Eight bytes into an eight byte ring: the 8th write lands on every cursor
        let store = filled(b"01234567", &mut cursors);
        assert_eq!(store.write_cursor(), 0);
        assert_eq!(cursors.low_water_mark(), 1);
        assert_eq!(cursors.unread(DrainHandle::new(2), &store), 7);
    }

    #[test]
    fn test_rewind_uses_sentinel_position() {
        let mut cursors: CursorTable<3> = CursorTable::new();
        cursors.set_sentinel(DrainHandle::new(0));
        let store = filled(b"0123456789", &mut cursors);
        let mut buf = [0u8; 4];
        cursors.read_into(DrainHandle::new(1), &store, &mut buf);
        assert_ne!(cursors.position(DrainHandle::new(1)), Some(cursors.low_water_mark()));
        cursors.rewind(DrainHandle::new(1));
        assert_eq!(cursors.position(DrainHandle::new(1)), Some(cursors.low_water_mark()));
    }

    #[test]
    fn test_out_of_range_handle_is_ignored() {
        let mut cursors: CursorTable<3> = CursorTable::new();
        let store = filled(b"ab", &mut cursors);
        let mut buf = [0u8; 4];
        cursors.rewind(DrainHandle::new(9));
        assert_eq!(cursors.read_into(DrainHandle::new(9), &store, &mut buf), 0);
        assert_eq!(cursors.position(DrainHandle::new(9)), None);
    }
}
