// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod bridge;

pub use bridge::{BridgeError, StatusCode};
