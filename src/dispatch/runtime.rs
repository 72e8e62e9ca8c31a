// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Process-wide tokio runtime owned by the bridge.
//!
//! Foreign callers provide no async context, so the bridge brings its own:
//! a multi-thread runtime created on first use and kept for the life of the
//! process. Worker count follows the machine, falling back to 4 when the
//! system cannot report its parallelism.

use std::sync::OnceLock;

use tokio::runtime::Runtime;

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

pub fn shared_runtime() -> &'static Runtime {
    RUNTIME.get_or_init(|| {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(workers)
            .thread_name("minipress-worker")
            .enable_all()
            .build()
            .expect("failed to initialize the minipress runtime")
    })
}
