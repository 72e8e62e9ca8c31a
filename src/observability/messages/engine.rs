// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for transform engine outcomes.

use std::fmt::{Display, Formatter};

/// The engine rejected an input with diagnostics.
///
/// # Log Level
/// `warn!` - a caller problem, not a bridge failure
pub struct EngineRejectedInput<'a> {
    pub engine: &'a str,
    pub message_count: usize,
}

impl Display for EngineRejectedInput<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Engine '{}' rejected input with {} diagnostic(s)",
            self.engine, self.message_count
        )
    }
}

/// A spawned transform task panicked; the panic was converted into a
/// failure outcome.
///
/// # Log Level
/// `error!`
pub struct EngineTaskPanicked<'a> {
    pub detail: &'a str,
}

impl Display for EngineTaskPanicked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Transform task panicked and was converted to a failure outcome: {}",
            self.detail
        )
    }
}
