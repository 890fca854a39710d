// Lockstep - Cycle-Accurate Multicore Simulation Driver
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Process-wide simulation clock.
//!
//! Cores read the current cycle number freely; only the cycle engine
//! advances it, exactly once per completed cycle.

use std::sync::atomic::{AtomicU64, Ordering};

static SIM_CYCLE: AtomicU64 = AtomicU64::new(0);

/// Current global cycle number.
pub fn now() -> u64 {
    SIM_CYCLE.load(Ordering::Relaxed)
}

/// Advance the clock by one cycle and return the new value.
pub fn advance() -> u64 {
    SIM_CYCLE.fetch_add(1, Ordering::Relaxed) + 1
}
