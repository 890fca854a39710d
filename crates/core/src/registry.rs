// Lockstep - Cycle-Accurate Multicore Simulation Driver
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Builder registries.
//!
//! Four process-global registries map string keys to factories: machine
//! templates, core types, controller types, interconnect types. Plugins
//! register themselves at process initialization, before any machine is
//! assembled; `register_builtins` in the plugins module wires the shipped
//! set. Keys are case-sensitive, registration is last-wins, and a lookup
//! miss at assembly time is a fatal configuration error.

use crate::hierarchy::{HierarchyRef, MemoryHierarchy};
use crate::machine::Machine;
use crate::{Controller, Core, CoreId, Interconnect, PortKind, SimResult};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

/// Populates a machine from a template. Runs once per assembly and calls
/// back into the machine to add cores, controllers, connections and
/// options.
pub type MachineGenerator = dyn Fn(&mut Machine) -> SimResult<()> + Send + Sync;

/// Produces a core bound to the given machine, with the coreid and
/// instance name the assembler allocated for it.
pub type CoreFactory = dyn Fn(&mut Machine, CoreId, &str) -> SimResult<Box<dyn Core>> + Send + Sync;

/// Produces a controller bound to a coreid, a port type tag and the
/// machine's (not yet constructed) memory hierarchy.
pub type ControllerFactory =
    dyn Fn(CoreId, PortKind, HierarchyRef, &str) -> SimResult<Arc<dyn Controller>> + Send + Sync;

/// Produces an interconnect bound to the (by now constructed) memory
/// hierarchy.
pub type InterconnectFactory =
    dyn Fn(Arc<dyn MemoryHierarchy>, &str) -> SimResult<Arc<dyn Interconnect>> + Send + Sync;

/// One named registry. Lookups return the factory without instantiating.
pub struct BuilderRegistry<F: ?Sized> {
    entries: RwLock<HashMap<String, Arc<F>>>,
}

impl<F: ?Sized> BuilderRegistry<F> {
    fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, key: impl Into<String>, factory: Arc<F>) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.into(), factory);
    }

    pub fn lookup(&self, key: &str) -> Option<Arc<F>> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    /// Registered keys, sorted, for lookup-miss diagnostics.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

pub static MACHINE_TEMPLATES: LazyLock<BuilderRegistry<MachineGenerator>> =
    LazyLock::new(BuilderRegistry::new);

pub static CORE_TYPES: LazyLock<BuilderRegistry<CoreFactory>> = LazyLock::new(BuilderRegistry::new);

pub static CONTROLLER_TYPES: LazyLock<BuilderRegistry<ControllerFactory>> =
    LazyLock::new(BuilderRegistry::new);

pub static INTERCONNECT_TYPES: LazyLock<BuilderRegistry<InterconnectFactory>> =
    LazyLock::new(BuilderRegistry::new);

pub fn register_machine(
    key: impl Into<String>,
    generator: impl Fn(&mut Machine) -> SimResult<()> + Send + Sync + 'static,
) {
    MACHINE_TEMPLATES.register(key, Arc::new(generator));
}

pub fn register_core(
    key: impl Into<String>,
    factory: impl Fn(&mut Machine, CoreId, &str) -> SimResult<Box<dyn Core>> + Send + Sync + 'static,
) {
    CORE_TYPES.register(key, Arc::new(factory));
}

pub fn register_controller(
    key: impl Into<String>,
    factory: impl Fn(CoreId, PortKind, HierarchyRef, &str) -> SimResult<Arc<dyn Controller>>
        + Send
        + Sync
        + 'static,
) {
    CONTROLLER_TYPES.register(key, Arc::new(factory));
}

pub fn register_interconnect(
    key: impl Into<String>,
    factory: impl Fn(Arc<dyn MemoryHierarchy>, &str) -> SimResult<Arc<dyn Interconnect>>
        + Send
        + Sync
        + 'static,
) {
    INTERCONNECT_TYPES.register(key, Arc::new(factory));
}
