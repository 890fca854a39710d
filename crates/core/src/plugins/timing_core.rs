// Lockstep - Cycle-Accurate Multicore Simulation Driver
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::context::ContextId;
use crate::hierarchy::MemoryHierarchy;
use crate::machine::Machine;
use crate::registry;
use crate::stats::SummaryStats;
use crate::{Core, CoreId, SimResult};
use std::io::{self, Write};
use std::sync::Arc;

/// Fixed-rate timing model: commits `commit_width` instructions every
/// cycle and never votes to stop. Reads its width from the machine's
/// option store under its own instance name.
pub struct TimingCore {
    name: String,
    coreid: CoreId,
    context: ContextId,
    commit_width: u64,
    cycles: u64,
    committed: u64,
}

impl TimingCore {
    pub fn build(machine: &mut Machine, coreid: CoreId, name: &str) -> SimResult<Box<dyn Core>> {
        let context = machine.claim_context()?;
        let commit_width = machine
            .options
            .get_int(name, "commit_width")
            .unwrap_or(1)
            .max(0) as u64;
        Ok(Box::new(Self {
            name: name.to_string(),
            coreid,
            context,
            commit_width,
            cycles: 0,
            committed: 0,
        }))
    }

    pub fn context(&self) -> ContextId {
        self.context
    }
}

impl Core for TimingCore {
    fn coreid(&self) -> CoreId {
        self.coreid
    }

    fn reset(&mut self) {
        self.cycles = 0;
        self.committed = 0;
    }

    fn check_context_changes(&mut self) {}

    fn runcycle(&mut self) -> bool {
        self.cycles += 1;
        self.committed += self.commit_width;
        false
    }

    fn flush_tlb(&mut self, _ctx: ContextId) {}

    fn flush_tlb_virt(&mut self, _ctx: ContextId, _vaddr: u64) {}

    fn instructions_committed(&self) -> u64 {
        self.committed
    }

    fn update_memory_hierarchy(&mut self, _hierarchy: &Arc<dyn MemoryHierarchy>) {}

    fn dump_state(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "[core {} '{}'] cycles {} committed {}",
            self.coreid, self.name, self.cycles, self.committed
        )
    }

    fn update_stats(&self, stats: &mut SummaryStats) {
        stats.insns_committed += self.committed;
    }
}

pub(super) fn register() {
    registry::register_core("timing", TimingCore::build);
}
