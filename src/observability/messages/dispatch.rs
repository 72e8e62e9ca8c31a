// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for request dispatch and completion delivery.

use std::fmt::{Display, Formatter};
use std::time::Duration;

/// A single-item request finished and its result is about to cross the
/// boundary.
///
/// # Log Level
/// `info!`
pub struct TransformCompleted<'a> {
    pub shape: &'a str,
    pub input_size: usize,
    pub output_size: usize,
    pub duration: Duration,
}

impl Display for TransformCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Transform ({}) completed: input={} bytes, output={} bytes, duration={:?}",
            self.shape, self.input_size, self.output_size, self.duration
        )
    }
}

/// A single-item request failed; the failure status is delivered instead.
///
/// # Log Level
/// `error!`
pub struct TransformFailed<'a> {
    pub shape: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for TransformFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Transform ({}) failed: {}", self.shape, self.error)
    }
}

/// A batch was accepted and its per-item tasks spawned.
///
/// # Log Level
/// `info!`
pub struct BatchDispatched {
    pub count: usize,
}

impl Display for BatchDispatched {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Batch dispatched: {} item(s)", self.count)
    }
}

/// The join barrier released and the batch callback is about to fire.
///
/// # Log Level
/// `info!`
pub struct BatchCompleted {
    pub count: usize,
    pub failed: usize,
    pub duration: Duration,
}

impl Display for BatchCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Batch completed: {} item(s), {} failed, duration={:?}",
            self.count, self.failed, self.duration
        )
    }
}

/// A request was rejected before dispatch because its callback handle was
/// unusable.
///
/// # Log Level
/// `warn!`
pub struct CallbackRejected<'a> {
    pub shape: &'a str,
}

impl Display for CallbackRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Rejected {} request: null or unusable callback handle",
            self.shape
        )
    }
}
