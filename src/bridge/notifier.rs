// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Completion notifiers: one-shot wrappers around foreign callbacks.
//!
//! Each async call shape carries one notifier. A notifier is consumed by
//! `notify`, so the type system rules out a second invocation; the dispatch
//! layer is responsible for invoking it on every exit path so no request
//! completes silently. All payload memory is in its final location before
//! the foreign function is entered.

use std::os::raw::c_void;

use crate::bridge::buffer::BoundaryBuffer;
use crate::errors::{BridgeError, StatusCode};

/// Callback for the bridge-allocated single-item shape:
/// `cb(context, status, ptr, len)`. Ownership of `(ptr, len)` passes to the
/// callee, which releases it with `minipress_free_buffer`.
pub type BufferCallback = extern "C" fn(ctx: *mut c_void, status: u32, ptr: *mut u8, len: usize);

/// Callback for the caller-buffer single-item shape: `cb(context, status, len)`.
/// On `CapacityOverflow` the reported `len` is the size the caller needs.
pub type CopyCallback = extern "C" fn(ctx: *mut c_void, status: u32, len: usize);

/// Callback for the batch shape:
/// `cb(context, statuses, ptrs, lens, count)`. The three arrays are
/// index-aligned with the submitted items and owned by the bridge for the
/// duration of the call only; the pointed-to result buffers are the
/// callee's to keep and free individually.
pub type BatchCallback = extern "C" fn(
    ctx: *mut c_void,
    statuses: *const u32,
    ptrs: *const *mut u8,
    lens: *const usize,
    count: usize,
);

/// One batch slot: its status and (for successes) its transferred buffer.
pub struct ItemDelivery {
    pub status: StatusCode,
    pub buffer: BoundaryBuffer,
}

impl ItemDelivery {
    pub fn success(buffer: BoundaryBuffer) -> Self {
        Self {
            status: StatusCode::Ok,
            buffer,
        }
    }

    /// A failed slot: sentinel (null, 0) plus the failure status.
    pub fn sentinel(status: StatusCode) -> Self {
        Self {
            status,
            buffer: BoundaryBuffer::empty(),
        }
    }
}

macro_rules! notifier {
    ($(#[$doc:meta])* $name:ident, $callback:ty) => {
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $name {
            callback: $callback,
            context: *mut c_void,
        }

        // The context pointer is an opaque token the caller guarantees valid
        // for the request lifetime; the bridge never dereferences it.
        unsafe impl Send for $name {}

        impl $name {
            /// Rejects a missing callback at dispatch time.
            pub fn new(
                callback: Option<$callback>,
                context: *mut c_void,
            ) -> Result<Self, BridgeError> {
                match callback {
                    Some(callback) => Ok(Self { callback, context }),
                    None => Err(BridgeError::InvalidHandle),
                }
            }
        }
    };
}

notifier!(
    /// Notifier for the bridge-allocated single-item shape.
    BufferNotifier,
    BufferCallback
);

notifier!(
    /// Notifier for the caller-buffer single-item shape.
    CopyNotifier,
    CopyCallback
);

notifier!(
    /// Notifier for the batch shape.
    BatchNotifier,
    BatchCallback
);

impl BufferNotifier {
    pub fn notify(self, status: StatusCode, buffer: BoundaryBuffer) {
        (self.callback)(self.context, status.as_u32(), buffer.ptr, buffer.len);
    }
}

impl CopyNotifier {
    pub fn notify(self, status: StatusCode, len: usize) {
        (self.callback)(self.context, status.as_u32(), len);
    }
}

impl BatchNotifier {
    /// Delivers every slot at once. The parallel arrays live on this stack
    /// frame, so they are valid exactly for the duration of the foreign call
    /// and freed when it returns.
    pub fn notify(self, outcomes: Vec<ItemDelivery>) {
        let count = outcomes.len();
        let mut statuses = Vec::with_capacity(count);
        let mut ptrs: Vec<*mut u8> = Vec::with_capacity(count);
        let mut lens = Vec::with_capacity(count);
        for outcome in &outcomes {
            statuses.push(outcome.status.as_u32());
            ptrs.push(outcome.buffer.ptr);
            lens.push(outcome.buffer.len);
        }
        (self.callback)(
            self.context,
            statuses.as_ptr(),
            ptrs.as_ptr(),
            lens.as_ptr(),
            count,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    static BUFFER_CALLS: AtomicUsize = AtomicUsize::new(0);
    static BUFFER_STATUS: AtomicU32 = AtomicU32::new(u32::MAX);

    extern "C" fn record_buffer(_ctx: *mut c_void, status: u32, ptr: *mut u8, len: usize) {
        BUFFER_CALLS.fetch_add(1, Ordering::SeqCst);
        BUFFER_STATUS.store(status, Ordering::SeqCst);
        unsafe { crate::bridge::reclaim(ptr, len) };
    }

    #[test]
    fn missing_callback_is_rejected_at_construction() {
        let err = BufferNotifier::new(None, ptr::null_mut()).unwrap_err();
        assert_eq!(err.status(), StatusCode::InvalidHandle);
        let err = BatchNotifier::new(None, ptr::null_mut()).unwrap_err();
        assert_eq!(err.status(), StatusCode::InvalidHandle);
    }

    #[test]
    fn notify_fires_the_wrapped_callback_once() {
        BUFFER_CALLS.store(0, Ordering::SeqCst);
        let notifier = BufferNotifier::new(Some(record_buffer), ptr::null_mut()).unwrap();
        let buffer = crate::bridge::OwnedBuffer::from_string("hi".into()).hand_off();
        notifier.notify(StatusCode::Ok, buffer);
        // `notify` consumed the notifier; a second call does not compile.
        assert_eq!(BUFFER_CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(BUFFER_STATUS.load(Ordering::SeqCst), 0);
    }

    static BATCH_COUNT: AtomicUsize = AtomicUsize::new(usize::MAX);
    static BATCH_SECOND_STATUS: AtomicU32 = AtomicU32::new(u32::MAX);

    extern "C" fn record_batch(
        _ctx: *mut c_void,
        statuses: *const u32,
        ptrs: *const *mut u8,
        lens: *const usize,
        count: usize,
    ) {
        BATCH_COUNT.store(count, Ordering::SeqCst);
        let statuses = unsafe { std::slice::from_raw_parts(statuses, count) };
        let ptrs = unsafe { std::slice::from_raw_parts(ptrs, count) };
        let lens = unsafe { std::slice::from_raw_parts(lens, count) };
        if count > 1 {
            BATCH_SECOND_STATUS.store(statuses[1], Ordering::SeqCst);
        }
        for i in 0..count {
            unsafe { crate::bridge::reclaim(ptrs[i], lens[i]) };
        }
    }

    #[test]
    fn batch_notify_delivers_aligned_arrays() {
        let notifier = BatchNotifier::new(Some(record_batch), ptr::null_mut()).unwrap();
        let outcomes = vec![
            ItemDelivery::success(crate::bridge::OwnedBuffer::from_string("a".into()).hand_off()),
            ItemDelivery::sentinel(StatusCode::EngineFailure),
        ];
        notifier.notify(outcomes);
        assert_eq!(BATCH_COUNT.load(Ordering::SeqCst), 2);
        assert_eq!(
            BATCH_SECOND_STATUS.load(Ordering::SeqCst),
            StatusCode::EngineFailure.as_u32()
        );
    }

    static EMPTY_BATCH_COUNT: AtomicUsize = AtomicUsize::new(usize::MAX);

    extern "C" fn record_empty_batch(
        _ctx: *mut c_void,
        _statuses: *const u32,
        _ptrs: *const *mut u8,
        _lens: *const usize,
        count: usize,
    ) {
        EMPTY_BATCH_COUNT.store(count, Ordering::SeqCst);
    }

    #[test]
    fn empty_batch_still_notifies() {
        let notifier = BatchNotifier::new(Some(record_empty_batch), ptr::null_mut()).unwrap();
        notifier.notify(Vec::new());
        assert_eq!(EMPTY_BATCH_COUNT.load(Ordering::SeqCst), 0);
    }
}
