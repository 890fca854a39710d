// Lockstep - Cycle-Accurate Multicore Simulation Driver
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod affinity;
pub mod clock;
pub mod connection;
pub mod context;
pub mod engine;
pub mod hierarchy;
pub mod logfile;
pub mod machine;
pub mod options;
pub mod plugins;
pub mod registry;
pub mod stats;

pub use context::{ContextId, MAX_CONTEXTS};
pub use engine::{CycleEngine, RunOutcome, SimSummary, StopReason};
pub use hierarchy::{HierarchyRef, MemoryHierarchy, SimpleHierarchy};
pub use machine::{Machine, StopHandle, WorkerPlan};
pub use plugins::register_builtins;

use crate::stats::SummaryStats;
use std::any::Any;
use std::io;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("unknown machine template '{name}' (registered: {available})")]
    UnknownTemplate { name: String, available: String },
    #[error("unknown core type '{0}'")]
    UnknownCoreType(String),
    #[error("unknown controller type '{0}'")]
    UnknownControllerType(String),
    #[error("unknown interconnect type '{0}'")]
    UnknownInterconnectType(String),
    #[error("connection '{connection}' references unregistered controller '{controller}'")]
    UnknownController {
        connection: String,
        controller: String,
    },
    #[error("machine template name is empty")]
    EmptyTemplateName,
    #[error("context pool exhausted (all {0} contexts claimed)")]
    ContextPoolExhausted(usize),
    #[error("machine '{0}' has no memory hierarchy: assemble it before running")]
    NotAssembled(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type SimResult<T> = Result<T, SimError>;

/// Core identifier. Equals the core's position in the machine's core
/// sequence and is stable for the machine's lifetime.
pub type CoreId = u8;

/// Role a controller plays on an interconnect port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortKind {
    Upper,
    Upper2,
    Lower,
    Instruction,
    Data,
}

/// Contract every simulated core implements for the driver.
///
/// The driver never looks inside a core: it resets it, clocks it once per
/// cycle, and reads back its committed-instruction counter and its
/// termination vote.
pub trait Core: Send {
    fn coreid(&self) -> CoreId;

    fn reset(&mut self);

    /// Re-examine the architectural contexts bound to this core for
    /// changes made by the emulator between runs.
    fn check_context_changes(&mut self);

    /// Advance exactly one cycle. Returning `true` votes to stop the
    /// simulation at the end of the current cycle.
    fn runcycle(&mut self) -> bool;

    fn flush_tlb(&mut self, ctx: ContextId);

    fn flush_tlb_virt(&mut self, ctx: ContextId, vaddr: u64);

    fn instructions_committed(&self) -> u64;

    /// Rebind the core to the machine's memory hierarchy once it exists.
    fn update_memory_hierarchy(&mut self, hierarchy: &Arc<dyn MemoryHierarchy>);

    fn dump_state(&self, out: &mut dyn io::Write) -> io::Result<()>;

    fn update_stats(&self, stats: &mut SummaryStats);
}

/// Cache-controller side of an interconnect attachment.
pub trait Controller: Send + Sync {
    fn name(&self) -> &str;

    fn coreid(&self) -> CoreId;

    /// Called during interconnect materialization, symmetric with
    /// [`Interconnect::register_controller`]. Implementations may reject
    /// traffic later if either side of the pair is missing.
    fn register_interconnect(&self, interconnect: &Arc<dyn Interconnect>, port: PortKind);

    fn as_any(&self) -> Option<&dyn Any> {
        None
    }
}

/// Interconnect side of an attachment.
pub trait Interconnect: Send + Sync {
    fn name(&self) -> &str;

    /// Controllers are registered in attachment-declaration order, which
    /// is observable by the implementation.
    fn register_controller(&self, controller: &Arc<dyn Controller>);

    fn as_any(&self) -> Option<&dyn Any> {
        None
    }
}
