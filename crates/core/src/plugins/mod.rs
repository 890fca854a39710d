// Lockstep - Cycle-Accurate Multicore Simulation Driver
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Built-in reference plugins.
//!
//! Trivial timing models, not microarchitecture: enough to assemble the
//! shipped machine templates, exercise the full assembly and cycle paths,
//! and serve as the pattern external plugins follow.

mod machines;
mod shared_bus;
mod simple_cache;
mod timing_core;

pub use shared_bus::SharedBus;
pub use simple_cache::SimpleCache;
pub use timing_core::TimingCore;

/// Register every built-in plugin. Call once from the program entry
/// point, before assembling a machine.
pub fn register_builtins() {
    timing_core::register();
    simple_cache::register();
    shared_bus::register();
    machines::register();
}
