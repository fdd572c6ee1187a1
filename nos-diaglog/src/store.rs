//! Ring store
//!
//! Fixed-size byte storage with a single wrapping write cursor. The header
//! carries a validity tag so that a ring image which survived a soft reset can
//! be told apart from cold memory.

use crate::VALIDITY_TAG;

/// Ring image header
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingHeader {
    /// [`VALIDITY_TAG`] once the image has been reset at least once
    pub valid_tag: u32,
    /// Capacity recorded when the image was last reset
    pub capacity: u32,
    /// Index of the next byte to be written
    pub write_cursor: u32,
}

impl RingHeader {
    pub const fn zeroed() -> Self {
        Self {
            valid_tag: 0,
            capacity: 0,
            write_cursor: 0,
        }
    }
}

/// Fixed-capacity circular byte store
#[repr(C)]
#[derive(Clone)]
pub struct RingStore<const CAP: usize> {
    header: RingHeader,
    data: [u8; CAP],
}

impl<const CAP: usize> RingStore<CAP> {
    const CAPACITY_OK: () = assert!(CAP > 1 && CAP <= u32::MAX as usize, "ring capacity out of range");

    /// Cold memory: zeroed header and data
    pub const fn zeroed() -> Self {
        let () = Self::CAPACITY_OK;
        Self {
            header: RingHeader::zeroed(),
            data: [0; CAP],
        }
    }

    /// Rebuild a store from a retained image
    pub const fn from_parts(header: RingHeader, data: [u8; CAP]) -> Self {
        let () = Self::CAPACITY_OK;
        Self { header, data }
    }

    pub const fn capacity(&self) -> usize {
        CAP
    }

    pub fn header(&self) -> &RingHeader {
        &self.header
    }

    pub fn data(&self) -> &[u8; CAP] {
        &self.data
    }

    pub fn write_cursor(&self) -> usize {
        self.header.write_cursor as usize
    }

    /// Whether the header describes a previously initialized ring of this size
    pub fn is_valid(&self) -> bool {
        self.header.valid_tag == VALIDITY_TAG
            && self.header.capacity as usize == CAP
            && (self.header.write_cursor as usize) < CAP
    }

    /// Zero the header and restore the expected tag and capacity
    pub fn reset(&mut self) {
        self.header = RingHeader {
            valid_tag: VALIDITY_TAG,
            capacity: CAP as u32,
            write_cursor: 0,
        };
    }

    /// Reset unless the header matches; returns `true` when a reset happened
    pub fn validate_or_reset(&mut self) -> bool {
        if self.is_valid() {
            false
        } else {
            self.reset();
            true
        }
    }

    /// Store one byte at the write cursor and advance it, returning the new cursor
    #[inline]
    pub fn push(&mut self, byte: u8) -> usize {
        let idx = self.write_cursor();
        self.data[idx] = byte;
        let next = advance::<CAP>(idx);
        self.header.write_cursor = next as u32;
        next
    }

    #[inline]
    pub fn byte_at(&self, idx: usize) -> u8 {
        self.data[idx]
    }

    /// Bytes between `position` and the write cursor
    #[inline]
    pub fn unread_from(&self, position: usize) -> usize {
        (self.write_cursor() + CAP - position) % CAP
    }
}

/// Next index after `idx`, wrapping at `CAP`
#[inline]
pub const fn advance<const CAP: usize>(idx: usize) -> usize {
    if idx + 1 >= CAP { 0 } else { idx + 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_store_is_invalid() {
        let mut store: RingStore<16> = RingStore::zeroed();
        assert!(!store.is_valid());
        assert!(store.validate_or_reset());
        assert!(store.is_valid());
        assert_eq!(store.header().capacity, 16);
        assert!(!store.validate_or_reset());
    }

    #[test]
    fn test_push_wraps() {
        let mut store: RingStore<4> = RingStore::zeroed();
        store.reset();
        assert_eq!(store.push(b'a'), 1);
        assert_eq!(store.push(b'b'), 2);
        assert_eq!(store.push(b'c'), 3);
        assert_eq!(store.push(b'd'), 0);
        assert_eq!(store.push(b'e'), 1);
        assert_eq!(store.byte_at(0), b'e');
        assert_eq!(store.unread_from(2), 3);
    }

    #[test]
    fn test_capacity_mismatch_forces_reset() {
        let mut store: RingStore<8> = RingStore::from_parts(
            RingHeader {
                valid_tag: VALIDITY_TAG,
                capacity: 16,
                write_cursor: 3,
            },
            [7; 8],
        );
        assert!(store.validate_or_reset());
        assert_eq!(store.write_cursor(), 0);
    }

    #[test]
    fn test_valid_image_is_kept() {
        let mut store: RingStore<8> = RingStore::from_parts(
            RingHeader {
                valid_tag: VALIDITY_TAG,
                capacity: 8,
                write_cursor: 5,
            },
            *b"retained",
        );
        assert!(!store.validate_or_reset());
        assert_eq!(store.write_cursor(), 5);
        assert_eq!(store.data(), b"retained");
    }
}
