// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Owned byte buffers and the single ownership-transfer operation.
//!
//! Results live in an [`OwnedBuffer`] until the moment they cross the
//! boundary. Crossing happens exactly one way: [`OwnedBuffer::hand_off`]
//! consumes the buffer and yields a raw (pointer, length) pair. From that
//! point the bridge holds no reference to the allocation; the foreign side
//! releases it through [`reclaim`] (exported as `minipress_free_buffer`).
//!
//! Backing storage is a `Box<[u8]>`, so a hand-off is a raw-parts decomposition
//! and a reclaim is the exact inverse — no allocator mismatch is possible.

use std::ptr;

use crate::errors::BridgeError;

/// An internally-owned byte sequence destined for the boundary.
#[derive(Debug)]
pub struct OwnedBuffer {
    data: Box<[u8]>,
}

impl OwnedBuffer {
    pub fn from_string(text: String) -> Self {
        Self {
            data: text.into_bytes().into_boxed_slice(),
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            data: bytes.into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Moves ownership of the backing allocation out of the bridge.
    ///
    /// Empty buffers cross as (null, 0); the paired deallocator treats a
    /// null pointer as a no-op, so the contract stays uniform for callers.
    pub fn hand_off(self) -> BoundaryBuffer {
        if self.data.is_empty() {
            return BoundaryBuffer::empty();
        }
        let len = self.data.len();
        let ptr = Box::into_raw(self.data) as *mut u8;
        BoundaryBuffer { ptr, len }
    }

    /// Bounded copy into a caller-supplied destination.
    ///
    /// Fails with `CapacityOverflow` before writing anything if the result
    /// does not fit, and with `InvalidHandle` if a non-empty copy targets a
    /// null destination.
    pub fn copy_into(&self, dst: *mut u8, capacity: usize) -> Result<usize, BridgeError> {
        let needed = self.data.len();
        if needed > capacity {
            return Err(BridgeError::CapacityOverflow { needed, capacity });
        }
        if needed == 0 {
            return Ok(0);
        }
        if dst.is_null() {
            return Err(BridgeError::InvalidHandle);
        }
        unsafe {
            ptr::copy_nonoverlapping(self.data.as_ptr(), dst, needed);
        }
        Ok(needed)
    }
}

/// A (pointer, length) pair whose ownership has left the bridge.
///
/// Holding one of these is holding the sole reference to the allocation, so
/// sending it across task boundaries is sound.
#[derive(Debug)]
pub struct BoundaryBuffer {
    pub ptr: *mut u8,
    pub len: usize,
}

unsafe impl Send for BoundaryBuffer {}

impl BoundaryBuffer {
    pub fn empty() -> Self {
        Self {
            ptr: ptr::null_mut(),
            len: 0,
        }
    }
}

/// A caller-supplied destination for the caller-buffer delivery mode.
///
/// The caller guarantees the region stays valid and unaliased until the
/// completion callback fires; the bridge only ever writes within `capacity`.
#[derive(Debug, Clone, Copy)]
pub struct DestBuffer {
    ptr: *mut u8,
    capacity: usize,
}

unsafe impl Send for DestBuffer {}

impl DestBuffer {
    pub fn new(ptr: *mut u8, capacity: usize) -> Self {
        Self { ptr, capacity }
    }

    pub fn ptr(&self) -> *mut u8 {
        self.ptr
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Releases an allocation previously produced by [`OwnedBuffer::hand_off`].
///
/// # Safety
///
/// `ptr` and `len` must be exactly the pair produced by a single hand-off,
/// and the pair must not be reclaimed twice. A null `ptr` is a no-op.
pub unsafe fn reclaim(ptr: *mut u8, len: usize) {
    if ptr.is_null() {
        return;
    }
    drop(Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len)));
}
