// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Error types for bridge operations.
//!
//! Everything that can go wrong between accepting a request and delivering
//! its result is represented here. Each variant maps to a stable
//! [`StatusCode`] that crosses the C boundary; diagnostics and sizes stay on
//! the Rust side as structured payload.

use thiserror::Error;

use crate::traits::EngineDiagnostics;

/// Error type covering every bridge failure mode.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The engine rejected the input; diagnostics describe why.
    #[error("engine rejected the input: {0}")]
    EngineFailure(EngineDiagnostics),

    /// A caller-supplied destination buffer is smaller than the result.
    /// Detected before any byte is written past the bound.
    #[error("destination buffer too small: need {needed} bytes, capacity is {capacity}")]
    CapacityOverflow { needed: usize, capacity: usize },

    /// The bridge could not allocate an output buffer. The global allocator
    /// aborts rather than reporting failure, so nothing constructs this
    /// today; the variant and its status value stay part of the ABI.
    #[error("failed to allocate an output buffer")]
    AllocationFailure,

    /// A null or otherwise unusable callback/context pair.
    #[error("null or unusable callback handle")]
    InvalidHandle,

    /// Source text that cannot be interpreted (e.g. not UTF-8).
    #[error("invalid source text: {0}")]
    InvalidInput(String),
}

impl BridgeError {
    pub fn status(&self) -> StatusCode {
        match self {
            BridgeError::EngineFailure(_) => StatusCode::EngineFailure,
            BridgeError::CapacityOverflow { .. } => StatusCode::CapacityOverflow,
            BridgeError::AllocationFailure => StatusCode::AllocationFailure,
            BridgeError::InvalidHandle => StatusCode::InvalidHandle,
            BridgeError::InvalidInput(_) => StatusCode::InvalidInput,
        }
    }
}

/// Status values shared with the foreign side of the boundary.
///
/// The numeric values are part of the ABI and must never be reordered.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok = 0,
    EngineFailure = 1,
    CapacityOverflow = 2,
    AllocationFailure = 3,
    InvalidHandle = 4,
    InvalidInput = 5,
}

impl StatusCode {
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_values_are_stable() {
        assert_eq!(StatusCode::Ok.as_u32(), 0);
        assert_eq!(StatusCode::EngineFailure.as_u32(), 1);
        assert_eq!(StatusCode::CapacityOverflow.as_u32(), 2);
        assert_eq!(StatusCode::AllocationFailure.as_u32(), 3);
        assert_eq!(StatusCode::InvalidHandle.as_u32(), 4);
        assert_eq!(StatusCode::InvalidInput.as_u32(), 5);
    }

    #[test]
    fn errors_map_to_their_status() {
        let err = BridgeError::CapacityOverflow {
            needed: 10,
            capacity: 4,
        };
        assert_eq!(err.status(), StatusCode::CapacityOverflow);
        assert_eq!(
            err.to_string(),
            "destination buffer too small: need 10 bytes, capacity is 4"
        );
    }
}
