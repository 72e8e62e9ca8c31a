// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Request dispatch: the three call shapes over one engine.
//!
//! The [`DispatchController`] is the orchestration layer between the C-ABI
//! surface and the [`TransformEngine`]. It owns no request state; each call
//! produces either a direct result (synchronous shape) or a supervised
//! background task that ends in exactly one completion notification.
//!
//! # Call shapes
//!
//! * **Synchronous single item** — engine runs on the calling thread, the
//!   output buffer's ownership moves to the caller in the return value.
//! * **Asynchronous single item** — returns before the work runs; a
//!   background task executes the engine and fires the callback once, in
//!   either bridge-allocated or caller-buffer delivery mode.
//! * **Asynchronous batch** — one task per item, unbounded fan-out; slot `i`
//!   of the delivered arrays always corresponds to input `i` regardless of
//!   completion order. The callback fires once, after every task reported.
//!
//! # Supervision
//!
//! Every unit of work runs in a spawned task whose `JoinHandle` is awaited
//! by the dispatching task. A panic inside the engine therefore surfaces as
//! a `JoinError`, is converted into an `EngineFailure` outcome, and still
//! produces its one notification — a request can fail, but it cannot vanish.
//!
//! Per-request state machine: Submitted → Running → (per item)
//! Completed|Failed → (batch: AllCompleted) → Notified.

pub mod runtime;


use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinError;

use crate::backends::MinifyEngine;
use crate::bridge::{
    BatchNotifier, BufferNotifier, CopyNotifier, DestBuffer, ItemDelivery, OwnedBuffer,
};
use crate::config::TransformOptions;
use crate::errors::{BridgeError, StatusCode};
use crate::observability::messages::dispatch::{
    BatchCompleted, BatchDispatched, TransformCompleted, TransformFailed,
};
use crate::observability::messages::engine::{EngineRejectedInput, EngineTaskPanicked};
use crate::traits::{EngineDiagnostics, TransformEngine};

use runtime::shared_runtime;

/// Orchestrates the three call shapes over a shared engine instance.
pub struct DispatchController {
    engine: Arc<dyn TransformEngine>,
}

impl DispatchController {
    pub fn new(engine: Arc<dyn TransformEngine>) -> Self {
        Self { engine }
    }

    /// Controller over the built-in reference engine.
    pub fn with_default_engine() -> Self {
        Self::new(Arc::new(MinifyEngine))
    }

    /// Synchronous single item. Runs the engine on the calling thread and
    /// returns the owned result; the caller decides when ownership crosses
    /// the boundary.
    ///
    /// Must not be called from a thread already running on the bridge
    /// runtime (the C-ABI surface never is).
    pub fn transform(
        &self,
        source: &[u8],
        options: &TransformOptions,
    ) -> Result<OwnedBuffer, BridgeError> {
        let started = Instant::now();
        let input_size = source.len();
        let outcome = shared_runtime().block_on(run_item(
            self.engine.clone(),
            source.to_vec(),
            *options,
        ));
        match outcome {
            Ok(text) => {
                tracing::info!(
                    "{}",
                    TransformCompleted {
                        shape: "sync",
                        input_size,
                        output_size: text.len(),
                        duration: started.elapsed(),
                    }
                );
                Ok(OwnedBuffer::from_string(text))
            }
            Err(err) => {
                tracing::error!(
                    "{}",
                    TransformFailed {
                        shape: "sync",
                        error: &err,
                    }
                );
                Err(err)
            }
        }
    }

    /// Asynchronous single item, bridge-allocated delivery.
    ///
    /// Returns immediately. The callback receives `(context, status, ptr,
    /// len)` exactly once; on success the buffer's ownership has already
    /// transferred and the callee frees it with `minipress_free_buffer`. On
    /// `EngineFailure` the buffer carries the diagnostics serialized as
    /// JSON, transferred under the same contract.
    ///
    /// The callback/context pair must stay valid until the callback runs.
    pub fn transform_async(
        &self,
        source: Vec<u8>,
        options: TransformOptions,
        notifier: BufferNotifier,
    ) {
        let engine = self.engine.clone();
        shared_runtime().spawn(async move {
            let started = Instant::now();
            let input_size = source.len();
            match run_supervised(engine, source, options).await {
                Ok(text) => {
                    tracing::info!(
                        "{}",
                        TransformCompleted {
                            shape: "async",
                            input_size,
                            output_size: text.len(),
                            duration: started.elapsed(),
                        }
                    );
                    notifier.notify(StatusCode::Ok, OwnedBuffer::from_string(text).hand_off());
                }
                Err(err) => {
                    tracing::error!(
                        "{}",
                        TransformFailed {
                            shape: "async",
                            error: &err,
                        }
                    );
                    notifier.notify(err.status(), diagnostics_payload(&err).hand_off());
                }
            }
        });
    }

    /// Asynchronous single item, caller-buffer delivery.
    ///
    /// Returns immediately. The result is copied into `dst` — never past its
    /// capacity — and the callback receives `(context, status, len)` exactly
    /// once. On `CapacityOverflow` nothing is written and the reported `len`
    /// is the size the caller needs, so a retry with a larger buffer is a
    /// two-step length-query protocol.
    pub fn transform_async_into(
        &self,
        source: Vec<u8>,
        options: TransformOptions,
        dst: DestBuffer,
        notifier: CopyNotifier,
    ) {
        let engine = self.engine.clone();
        shared_runtime().spawn(async move {
            let started = Instant::now();
            let input_size = source.len();
            let (status, len) = match run_supervised(engine, source, options).await {
                Ok(text) => {
                    let buffer = OwnedBuffer::from_string(text);
                    match buffer.copy_into(dst.ptr(), dst.capacity()) {
                        Ok(written) => {
                            tracing::info!(
                                "{}",
                                TransformCompleted {
                                    shape: "async_into",
                                    input_size,
                                    output_size: written,
                                    duration: started.elapsed(),
                                }
                            );
                            (StatusCode::Ok, written)
                        }
                        Err(err) => {
                            tracing::error!(
                                "{}",
                                TransformFailed {
                                    shape: "async_into",
                                    error: &err,
                                }
                            );
                            // Report the required size so the caller can
                            // reallocate and retry.
                            (err.status(), buffer.len())
                        }
                    }
                }
                Err(err) => {
                    tracing::error!(
                        "{}",
                        TransformFailed {
                            shape: "async_into",
                            error: &err,
                        }
                    );
                    (err.status(), 0)
                }
            };
            notifier.notify(status, len);
        });
    }

    /// Asynchronous batch: one task per item, no cap, fail-independent.
    ///
    /// Returns immediately. Slot `i` of the delivered arrays corresponds to
    /// input `i`; a failed item leaves a sentinel (non-zero status, null,
    /// 0) at its index while siblings complete normally. The callback fires
    /// exactly once, after the join barrier — awaiting every per-item task —
    /// releases. An empty batch completes immediately with empty arrays.
    pub fn transform_batch_async(
        &self,
        items: Vec<Vec<u8>>,
        options: TransformOptions,
        notifier: BatchNotifier,
    ) {
        let engine = self.engine.clone();
        shared_runtime().spawn(async move {
            let started = Instant::now();
            let count = items.len();
            tracing::info!("{}", BatchDispatched { count });

            let mut handles = Vec::with_capacity(count);
            for source in items {
                let engine = engine.clone();
                handles.push(tokio::spawn(
                    async move { run_item(engine, source, options).await },
                ));
            }

            // Join barrier: every task reports before anything is delivered.
            // Awaiting in index order also fixes the output order to the
            // input order, whatever order the tasks actually finished in.
            let mut outcomes = Vec::with_capacity(count);
            let mut failed = 0usize;
            for handle in handles {
                let delivery = match handle.await {
                    Ok(Ok(text)) => {
                        ItemDelivery::success(OwnedBuffer::from_string(text).hand_off())
                    }
                    Ok(Err(err)) => {
                        failed += 1;
                        ItemDelivery::sentinel(err.status())
                    }
                    Err(join_err) => {
                        failed += 1;
                        let err = panic_to_failure(join_err);
                        ItemDelivery::sentinel(err.status())
                    }
                };
                outcomes.push(delivery);
            }

            tracing::info!(
                "{}",
                BatchCompleted {
                    count,
                    failed,
                    duration: started.elapsed(),
                }
            );
            notifier.notify(outcomes);
        });
    }
}

/// Decodes and transforms one item. UTF-8 validation happens here so every
/// shape reports bad input through the same status, not a crash.
async fn run_item(
    engine: Arc<dyn TransformEngine>,
    source: Vec<u8>,
    options: TransformOptions,
) -> Result<String, BridgeError> {
    let text = std::str::from_utf8(&source)
        .map_err(|err| BridgeError::InvalidInput(format!("source text is not valid UTF-8: {err}")))?;
    engine.transform(text, &options).await.map_err(|diagnostics| {
        tracing::warn!(
            "{}",
            EngineRejectedInput {
                engine: engine.name(),
                message_count: diagnostics.messages.len(),
            }
        );
        BridgeError::EngineFailure(diagnostics)
    })
}

/// Runs one item in its own supervised task so a panic becomes a failure
/// outcome instead of a lost notification.
async fn run_supervised(
    engine: Arc<dyn TransformEngine>,
    source: Vec<u8>,
    options: TransformOptions,
) -> Result<String, BridgeError> {
    let handle = tokio::spawn(async move { run_item(engine, source, options).await });
    match handle.await {
        Ok(outcome) => outcome,
        Err(join_err) => Err(panic_to_failure(join_err)),
    }
}

fn panic_to_failure(join_err: JoinError) -> BridgeError {
    let detail = if join_err.is_panic() {
        match join_err.into_panic().downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => (*message).to_string(),
                Err(_) => "unknown panic payload".to_string(),
            },
        }
    } else {
        "task was cancelled".to_string()
    };
    tracing::error!("{}", EngineTaskPanicked { detail: &detail });
    BridgeError::EngineFailure(EngineDiagnostics::from_panic(&detail))
}

/// Serializes a failure into the buffer delivered in place of a result.
///
/// Engine diagnostics cross as JSON so the foreign side can render them;
/// earlier bridge revisions dropped them on the floor. Other failures become
/// a single synthesized diagnostic.
pub fn diagnostics_payload(err: &BridgeError) -> OwnedBuffer {
    let diagnostics = match err {
        BridgeError::EngineFailure(diagnostics) => diagnostics.clone(),
        other => EngineDiagnostics::single(other.to_string(), 0, 0),
    };
    let bytes = serde_json::to_vec(&diagnostics)
        .unwrap_or_else(|_| diagnostics.to_string().into_bytes());
    OwnedBuffer::from_bytes(bytes)
}
