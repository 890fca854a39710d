// Lockstep - Cycle-Accurate Multicore Simulation Driver
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! The machine aggregate and its assembler.
//!
//! A `Machine` exclusively owns its cores, controllers, interconnects and
//! memory hierarchy. Assembly resolves a named template in the machine
//! registry and invokes it; the template calls back into the machine to
//! add cores and controllers, declare interconnect connections, and stash
//! per-component options. Once the template returns, the machine
//! constructs the memory hierarchy, rebinds every core to it, and
//! materializes the declared interconnects.

use crate::connection::{Attachment, ConnectionDef, ConnectionId};
use crate::context::{ContextId, ContextPool};
use crate::hierarchy::{HierarchyRef, MemoryHierarchy, SimpleHierarchy};
use crate::options::OptionStore;
use crate::registry;
use crate::stats::SummaryStats;
use crate::{Controller, Core, CoreId, Interconnect, PortKind, SimError, SimResult};
use lockstep_config::SimConfig;
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Worker assignment for threaded mode, fixed at assembly time. Worker
/// `i` advances the contiguous coreid range
/// `[i * cores_per_worker, min((i + 1) * cores_per_worker, cores))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPlan {
    pub workers: usize,
    pub cores_per_worker: usize,
}

/// Handle for requesting a stop from outside the cycle loop (a signal
/// handler, an embedder thread). The request is latched under a mutex and
/// takes effect at the next cycle boundary; there is no mid-cycle
/// preemption.
#[derive(Clone)]
pub struct StopHandle(Arc<Mutex<bool>>);

impl StopHandle {
    pub fn request(&self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = true;
    }

    /// Read and clear the latched request.
    pub(crate) fn take(&self) -> bool {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

pub struct Machine {
    name: String,
    pub(crate) config: SimConfig,
    pub(crate) cores: Vec<Box<dyn Core>>,
    pub(crate) hierarchy: Option<Arc<dyn MemoryHierarchy>>,
    hierarchy_ref: HierarchyRef,
    controllers: Vec<Arc<dyn Controller>>,
    interconnects: Vec<Arc<dyn Interconnect>>,
    controller_index: HashMap<String, Arc<dyn Controller>>,
    connections: Vec<ConnectionDef>,
    pub options: OptionStore,
    contexts: ContextPool,
    coreid_counter: CoreId,
    stop_request: StopHandle,
    pub(crate) worker_plan: Option<WorkerPlan>,
    pub(crate) first_run: bool,
    pub(crate) iterations: u64,
    pub(crate) total_user_insns_committed: u64,
    pub(crate) stats: SummaryStats,
    pub(crate) resume_context: Option<ContextId>,
}

impl Machine {
    pub fn new(name: impl Into<String>, config: SimConfig) -> Self {
        Self {
            name: name.into(),
            config,
            cores: Vec::new(),
            hierarchy: None,
            hierarchy_ref: HierarchyRef::new(),
            controllers: Vec::new(),
            interconnects: Vec::new(),
            controller_index: HashMap::new(),
            connections: Vec::new(),
            options: OptionStore::new(),
            contexts: ContextPool::new(),
            coreid_counter: 0,
            stop_request: StopHandle(Arc::new(Mutex::new(false))),
            worker_plan: None,
            first_run: true,
            iterations: 0,
            total_user_insns_committed: 0,
            stats: SummaryStats::default(),
            resume_context: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn num_cores(&self) -> usize {
        self.cores.len()
    }

    pub fn cores(&self) -> &[Box<dyn Core>] {
        &self.cores
    }

    pub fn controllers(&self) -> &[Arc<dyn Controller>] {
        &self.controllers
    }

    pub fn interconnects(&self) -> &[Arc<dyn Interconnect>] {
        &self.interconnects
    }

    pub fn controller_by_name(&self, name: &str) -> Option<&Arc<dyn Controller>> {
        self.controller_index.get(name)
    }

    pub fn connections(&self) -> &[ConnectionDef] {
        &self.connections
    }

    pub fn hierarchy(&self) -> Option<&Arc<dyn MemoryHierarchy>> {
        self.hierarchy.as_ref()
    }

    /// Handle that resolves to the memory hierarchy once it is
    /// constructed. Controller builders hold on to this.
    pub fn hierarchy_ref(&self) -> HierarchyRef {
        self.hierarchy_ref.clone()
    }

    pub fn worker_plan(&self) -> Option<WorkerPlan> {
        self.worker_plan
    }

    /// Handle for requesting a stop from outside the loop. Clone it
    /// before `run` takes over the machine.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop_request.clone()
    }

    pub(crate) fn take_external_stop(&self) -> bool {
        self.stop_request.take()
    }

    /// Claim the next architectural context for a core being built.
    pub fn claim_context(&mut self) -> SimResult<ContextId> {
        self.contexts.claim()
    }

    pub fn claimed_contexts(&self) -> usize {
        self.contexts.claimed()
    }

    /// Guest context the emulator should resume on after the loop exits.
    pub fn resume_context(&self) -> Option<ContextId> {
        self.resume_context
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn total_user_insns_committed(&self) -> u64 {
        self.total_user_insns_committed
    }

    pub fn stats(&self) -> &SummaryStats {
        &self.stats
    }

    /// Assemble this machine from the template named by the configuration,
    /// using the default memory hierarchy.
    pub fn assemble(&mut self) -> SimResult<()> {
        self.assemble_with(|machine| Arc::new(SimpleHierarchy::new(machine)))
    }

    /// Assemble with a caller-supplied memory-hierarchy constructor. The
    /// factory runs after the template has returned, so every core and
    /// controller exists by the time it sees the machine.
    pub fn assemble_with<F>(&mut self, hierarchy_factory: F) -> SimResult<()>
    where
        F: FnOnce(&Machine) -> Arc<dyn MemoryHierarchy>,
    {
        if self.config.machine_config.is_empty() {
            return Err(SimError::EmptyTemplateName);
        }
        if self.config.cache_config_type.is_empty() {
            self.config.cache_config_type = "auto".to_string();
        }

        let template = self.config.machine_config.clone();
        let generator = registry::MACHINE_TEMPLATES.lookup(&template).ok_or_else(|| {
            SimError::UnknownTemplate {
                name: template.clone(),
                available: registry::MACHINE_TEMPLATES.keys().join(", "),
            }
        })?;
        info!(machine = %self.name, template = %template, "assembling machine");
        generator(self)?;

        let hierarchy = hierarchy_factory(self);
        self.hierarchy_ref.bind(hierarchy.clone());
        self.hierarchy = Some(hierarchy.clone());
        for core in &mut self.cores {
            core.update_memory_hierarchy(&hierarchy);
        }

        self.setup_interconnects(&hierarchy)?;
        self.setup_workers();
        Ok(())
    }

    /// Allocate a coreid, build a core of `core_type` named
    /// `prefix || coreid`, and append it to the core sequence.
    pub fn add_core(&mut self, prefix: &str, core_type: &str) -> SimResult<CoreId> {
        let factory = registry::CORE_TYPES
            .lookup(core_type)
            .ok_or_else(|| SimError::UnknownCoreType(core_type.to_string()))?;
        let coreid = self.coreid_counter;
        self.coreid_counter += 1;
        let name = format!("{prefix}{coreid}");
        debug!(core = %name, kind = core_type, "adding core");
        let core = factory(self, coreid, &name)?;
        self.cores.push(core);
        Ok(coreid)
    }

    /// Build a controller of `controller_type` named `prefix || coreid`
    /// and index it by name for later connection resolution.
    pub fn add_controller(
        &mut self,
        coreid: CoreId,
        prefix: &str,
        controller_type: &str,
        port: PortKind,
    ) -> SimResult<()> {
        let factory = registry::CONTROLLER_TYPES
            .lookup(controller_type)
            .ok_or_else(|| SimError::UnknownControllerType(controller_type.to_string()))?;
        let name = format!("{prefix}{coreid}");
        debug!(controller = %name, kind = controller_type, "adding controller");
        let controller = factory(coreid, port, self.hierarchy_ref.clone(), &name)?;
        self.controller_index
            .insert(name, Arc::clone(&controller));
        self.controllers.push(controller);
        Ok(())
    }

    /// Declare an empty connection named `prefix || seq_id` and return a
    /// handle for attaching controllers to it.
    pub fn declare_connection(
        &mut self,
        interconnect_type: &str,
        prefix: &str,
        seq_id: usize,
    ) -> ConnectionId {
        self.connections.push(ConnectionDef {
            interconnect_type: interconnect_type.to_string(),
            name: format!("{prefix}{seq_id}"),
            attachments: Vec::new(),
        });
        ConnectionId(self.connections.len() - 1)
    }

    /// Append a (controller, port) pair to a declared connection.
    /// Attachment order is preserved and observable by the interconnect.
    pub fn attach(&mut self, conn: ConnectionId, controller_name: &str, port: PortKind) {
        self.connections[conn.0].attachments.push(Attachment {
            controller: controller_name.to_string(),
            port,
        });
    }

    /// Walk the connection graph in insertion order, instantiate each
    /// declared interconnect, and wire both sides of every attachment.
    fn setup_interconnects(&mut self, hierarchy: &Arc<dyn MemoryHierarchy>) -> SimResult<()> {
        let connections = std::mem::take(&mut self.connections);
        for def in &connections {
            let factory = registry::INTERCONNECT_TYPES
                .lookup(&def.interconnect_type)
                .ok_or_else(|| SimError::UnknownInterconnectType(def.interconnect_type.clone()))?;
            let interconnect = factory(Arc::clone(hierarchy), &def.name)?;
            self.interconnects.push(Arc::clone(&interconnect));

            for attachment in &def.attachments {
                let controller = self
                    .controller_index
                    .get(&attachment.controller)
                    .cloned()
                    .ok_or_else(|| SimError::UnknownController {
                        connection: def.name.clone(),
                        controller: attachment.controller.clone(),
                    })?;
                interconnect.register_controller(&controller);
                controller.register_interconnect(&interconnect, attachment.port);
            }
        }
        self.connections = connections;
        Ok(())
    }

    /// Decide the worker plan. Threaded mode takes effect only when it is
    /// requested, there are more cores than one worker's share, and
    /// verbose logging is off (the log stream has no cross-thread
    /// discipline).
    fn setup_workers(&mut self) {
        if !self.config.threaded_simulation {
            return;
        }
        let cores = self.cores.len();
        let cores_per_worker = self.config.cores_per_worker.max(1) as usize;
        if cores <= cores_per_worker || self.config.logable(1) {
            self.config.threaded_simulation = false;
            info!(
                cores,
                cores_per_worker, "threaded simulation disabled for this machine"
            );
            return;
        }
        let workers = cores.div_ceil(cores_per_worker);
        info!(workers, cores_per_worker, "worker pool configured");
        self.worker_plan = Some(WorkerPlan {
            workers,
            cores_per_worker,
        });
    }

    /// Broadcast a TLB flush to every core in coreid order. Legal only
    /// between cycles; the `&mut` receiver enforces that no cycle is in
    /// progress.
    pub fn flush_tlb(&mut self, ctx: ContextId) {
        for core in &mut self.cores {
            core.flush_tlb(ctx);
        }
    }

    pub fn flush_tlb_virt(&mut self, ctx: ContextId, vaddr: u64) {
        for core in &mut self.cores {
            core.flush_tlb_virt(ctx, vaddr);
        }
    }

    pub fn dump_state(&self, out: &mut dyn io::Write) -> io::Result<()> {
        for core in &self.cores {
            core.dump_state(out)?;
        }
        writeln!(out, " MemoryHierarchy:")?;
        if let Some(hierarchy) = &self.hierarchy {
            hierarchy.dump_info(out)?;
        }
        Ok(())
    }

    pub fn update_stats(&self, stats: &mut SummaryStats) {
        for core in &self.cores {
            core.update_stats(stats);
        }
    }

    /// Release every owned component, in reverse construction order, and
    /// return the machine to its pre-assembly state.
    pub fn reset(&mut self) {
        self.interconnects.clear();
        self.hierarchy = None;
        self.hierarchy_ref = HierarchyRef::new();
        self.controller_index.clear();
        self.controllers.clear();
        self.cores.clear();
        self.connections.clear();
        self.contexts.reset();
        self.coreid_counter = 0;
        self.stop_request = StopHandle(Arc::new(Mutex::new(false)));
        self.worker_plan = None;
        self.first_run = true;
        self.iterations = 0;
        self.total_user_insns_committed = 0;
        self.stats = SummaryStats::default();
        self.resume_context = None;
    }
}

impl Drop for Machine {
    fn drop(&mut self) {
        // Reverse construction order: interconnects, hierarchy,
        // controllers, cores.
        self.interconnects.clear();
        self.hierarchy = None;
        self.controller_index.clear();
        self.controllers.clear();
        self.cores.clear();
    }
}
