// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-call transform configuration.

use serde::{Deserialize, Serialize};

/// Which transformation passes a call runs. Every call shape takes one of
/// these; there is no hidden global configuration.
///
/// The default enables all three passes, matching what callers of the
/// original bridge always received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    /// Collapse insignificant whitespace and strip comments.
    pub minify_whitespace: bool,
    /// Shorten local names where no observable behavior can change.
    pub minify_identifiers: bool,
    /// Apply shorter equivalent syntax (literal and punctuation rewrites).
    pub minify_syntax: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            minify_whitespace: true,
            minify_identifiers: true,
            minify_syntax: true,
        }
    }
}

impl TransformOptions {
    /// All passes off. The engine must reproduce its input byte for byte.
    pub fn none() -> Self {
        Self {
            minify_whitespace: false,
            minify_identifiers: false,
            minify_syntax: false,
        }
    }
}
