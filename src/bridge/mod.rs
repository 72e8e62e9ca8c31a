// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Boundary marshaling: buffer ownership transfer and completion delivery.

pub mod buffer;
pub mod notifier;

pub use buffer::{reclaim, BoundaryBuffer, DestBuffer, OwnedBuffer};
pub use notifier::{
    BatchCallback, BatchNotifier, BufferCallback, BufferNotifier, CopyCallback, CopyNotifier,
    ItemDelivery,
};
