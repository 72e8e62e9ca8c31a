// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;      // transform engine implementations
pub mod bridge;        // buffer marshaling + completion notification
pub mod config;        // per-call transform options
pub mod dispatch;      // the three call shapes
pub mod errors;        // error handling
pub mod ffi;           // C-ABI surface
pub mod observability;
pub mod traits;        // engine abstraction
