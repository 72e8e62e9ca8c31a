// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The exported C ABI.
//!
//! Every symbol is prefixed `minipress_`. The surface is five functions:
//!
//! * [`minipress_transform`] — synchronous, returns a transferred buffer
//!   inside [`MinipressResult`].
//! * [`minipress_transform_async`] — bridge-allocated async delivery.
//! * [`minipress_transform_async_into`] — caller-buffer async delivery.
//! * [`minipress_transform_batch_async`] — index-aligned batch delivery.
//! * [`minipress_free_buffer`] — the paired deallocator for every buffer
//!   whose ownership crossed outward.
//!
//! All functions share one process-wide [`DispatchController`]; the async
//! entry points return a status describing whether the request was accepted,
//! never the transform outcome. No panic may unwind across these frames.

use std::os::raw::c_void;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::OnceLock;

use crate::bridge::{
    BatchCallback, BatchNotifier, BufferCallback, BufferNotifier, CopyCallback, CopyNotifier,
    DestBuffer,
};
use crate::config::TransformOptions;
use crate::dispatch::{diagnostics_payload, DispatchController};
use crate::errors::{BridgeError, StatusCode};
use crate::observability::messages::dispatch::CallbackRejected;

fn controller() -> &'static DispatchController {
    static CONTROLLER: OnceLock<DispatchController> = OnceLock::new();
    CONTROLLER.get_or_init(DispatchController::with_default_engine)
}

/// Transform configuration as it crosses the boundary. A null options
/// pointer selects the defaults (all passes on).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MinipressOptions {
    pub minify_whitespace: bool,
    pub minify_identifiers: bool,
    pub minify_syntax: bool,
}

impl From<MinipressOptions> for TransformOptions {
    fn from(options: MinipressOptions) -> Self {
        Self {
            minify_whitespace: options.minify_whitespace,
            minify_identifiers: options.minify_identifiers,
            minify_syntax: options.minify_syntax,
        }
    }
}

/// Outcome of the synchronous shape. When `status` is non-zero, `ptr`/`len`
/// carry the failure diagnostics as JSON instead of a result; either way a
/// non-null `ptr` must be released with [`minipress_free_buffer`].
#[repr(C)]
#[derive(Debug)]
pub struct MinipressResult {
    pub status: u32,
    pub ptr: *mut u8,
    pub len: usize,
}

impl MinipressResult {
    fn failure(err: &BridgeError) -> Self {
        let out = diagnostics_payload(err).hand_off();
        Self {
            status: err.status().as_u32(),
            ptr: out.ptr,
            len: out.len,
        }
    }
}

/// One input item of a batch request.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MinipressSlice {
    pub ptr: *const u8,
    pub len: usize,
}

unsafe fn read_source(ptr: *const u8, len: usize) -> Result<Vec<u8>, BridgeError> {
    if len == 0 {
        return Ok(Vec::new());
    }
    if ptr.is_null() {
        return Err(BridgeError::InvalidHandle);
    }
    Ok(std::slice::from_raw_parts(ptr, len).to_vec())
}

unsafe fn read_options(options: *const MinipressOptions) -> TransformOptions {
    if options.is_null() {
        TransformOptions::default()
    } else {
        (*options).into()
    }
}

/// Synchronously transforms `source` and returns the result with its
/// ownership transferred to the caller.
///
/// # Safety
///
/// `source` must point to `source_len` readable bytes (null only when
/// `source_len` is 0), and `options` must be null or point to a valid
/// [`MinipressOptions`].
#[no_mangle]
pub unsafe extern "C" fn minipress_transform(
    source: *const u8,
    source_len: usize,
    options: *const MinipressOptions,
) -> MinipressResult {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let source = match read_source(source, source_len) {
            Ok(source) => source,
            Err(err) => return MinipressResult::failure(&err),
        };
        let options = read_options(options);
        match controller().transform(&source, &options) {
            Ok(buffer) => {
                let out = buffer.hand_off();
                MinipressResult {
                    status: StatusCode::Ok.as_u32(),
                    ptr: out.ptr,
                    len: out.len,
                }
            }
            Err(err) => MinipressResult::failure(&err),
        }
    }));
    outcome.unwrap_or(MinipressResult {
        status: StatusCode::EngineFailure.as_u32(),
        ptr: ptr::null_mut(),
        len: 0,
    })
}

/// Starts an asynchronous transform with bridge-allocated delivery.
///
/// Returns a [`StatusCode`] describing request acceptance only. On success
/// the callback later receives `(context, status, ptr, len)` exactly once;
/// any non-null `ptr` is the callee's to free with
/// [`minipress_free_buffer`].
///
/// # Safety
///
/// Pointer requirements as for [`minipress_transform`]; additionally
/// `callback` and `context` must remain usable until the callback has run.
#[no_mangle]
pub unsafe extern "C" fn minipress_transform_async(
    source: *const u8,
    source_len: usize,
    options: *const MinipressOptions,
    callback: Option<BufferCallback>,
    context: *mut c_void,
) -> u32 {
    let notifier = match BufferNotifier::new(callback, context) {
        Ok(notifier) => notifier,
        Err(err) => {
            tracing::warn!("{}", CallbackRejected { shape: "async" });
            return err.status().as_u32();
        }
    };
    let source = match read_source(source, source_len) {
        Ok(source) => source,
        Err(err) => return err.status().as_u32(),
    };
    controller().transform_async(source, read_options(options), notifier);
    StatusCode::Ok.as_u32()
}

/// Starts an asynchronous transform delivered into a caller-owned buffer.
///
/// The callback later receives `(context, status, len)` exactly once. On
/// `CapacityOverflow` nothing was written and `len` is the capacity a retry
/// needs.
///
/// # Safety
///
/// Pointer requirements as for [`minipress_transform_async`]; additionally
/// `dst` must point to `dst_capacity` writable bytes that stay valid and
/// unaliased until the callback has run.
#[no_mangle]
pub unsafe extern "C" fn minipress_transform_async_into(
    source: *const u8,
    source_len: usize,
    options: *const MinipressOptions,
    dst: *mut u8,
    dst_capacity: usize,
    callback: Option<CopyCallback>,
    context: *mut c_void,
) -> u32 {
    let notifier = match CopyNotifier::new(callback, context) {
        Ok(notifier) => notifier,
        Err(err) => {
            tracing::warn!("{}", CallbackRejected { shape: "async_into" });
            return err.status().as_u32();
        }
    };
    let source = match read_source(source, source_len) {
        Ok(source) => source,
        Err(err) => return err.status().as_u32(),
    };
    controller().transform_async_into(
        source,
        read_options(options),
        DestBuffer::new(dst, dst_capacity),
        notifier,
    );
    StatusCode::Ok.as_u32()
}

/// Starts an asynchronous batch transform over `count` input slices.
///
/// The callback later receives `(context, statuses, ptrs, lens, count)`
/// exactly once, arrays index-aligned with the inputs; failed slots carry a
/// non-zero status and a (null, 0) buffer. The arrays themselves are valid
/// only for the duration of the callback, while each non-null buffer is the
/// callee's to free individually with [`minipress_free_buffer`]. A zero
/// `count` still produces one callback with empty arrays.
///
/// # Safety
///
/// `items` must point to `count` valid [`MinipressSlice`] values (null only
/// when `count` is 0), each obeying the `source` rules of
/// [`minipress_transform`]; `callback` and `context` must remain usable
/// until the callback has run.
#[no_mangle]
pub unsafe extern "C" fn minipress_transform_batch_async(
    items: *const MinipressSlice,
    count: usize,
    options: *const MinipressOptions,
    callback: Option<BatchCallback>,
    context: *mut c_void,
) -> u32 {
    let notifier = match BatchNotifier::new(callback, context) {
        Ok(notifier) => notifier,
        Err(err) => {
            tracing::warn!("{}", CallbackRejected { shape: "batch" });
            return err.status().as_u32();
        }
    };
    if count > 0 && items.is_null() {
        return StatusCode::InvalidHandle.as_u32();
    }
    let mut sources = Vec::with_capacity(count);
    for i in 0..count {
        let item = *items.add(i);
        match read_source(item.ptr, item.len) {
            Ok(source) => sources.push(source),
            Err(err) => return err.status().as_u32(),
        }
    }
    controller().transform_batch_async(sources, read_options(options), notifier);
    StatusCode::Ok.as_u32()
}

/// Releases a buffer whose ownership previously crossed outward.
///
/// # Safety
///
/// `ptr`/`len` must be exactly one pair previously delivered by this
/// library, released at most once. A null `ptr` is a no-op.
#[no_mangle]
pub unsafe extern "C" fn minipress_free_buffer(ptr: *mut u8, len: usize) {
    crate::bridge::reclaim(ptr, len);
}
