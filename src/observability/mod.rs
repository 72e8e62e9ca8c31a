// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging of bridge activity.
//!
//! Message types follow a struct-based pattern with `Display`
//! implementations so log call sites stay free of magic strings and the
//! wording lives in one place per subsystem:
//!
//! * `messages::dispatch` - request lifecycle across the three call shapes
//! * `messages::engine` - transform engine outcomes

pub mod messages;
