// Lockstep - Cycle-Accurate Multicore Simulation Driver
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::hierarchy::HierarchyRef;
use crate::registry;
use crate::{Controller, CoreId, Interconnect, PortKind, SimResult};
use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError};

/// Bookkeeping-only cache controller: records which interconnects were
/// registered on it and with which port role, in registration order.
pub struct SimpleCache {
    name: String,
    coreid: CoreId,
    port: PortKind,
    hierarchy: HierarchyRef,
    interconnects: Mutex<Vec<(String, PortKind)>>,
}

impl SimpleCache {
    pub fn build(
        coreid: CoreId,
        port: PortKind,
        hierarchy: HierarchyRef,
        name: &str,
    ) -> SimResult<Arc<dyn Controller>> {
        Ok(Arc::new(Self {
            name: name.to_string(),
            coreid,
            port,
            hierarchy,
            interconnects: Mutex::new(Vec::new()),
        }))
    }

    /// The port role this controller was built for.
    pub fn port(&self) -> PortKind {
        self.port
    }

    pub fn hierarchy(&self) -> &HierarchyRef {
        &self.hierarchy
    }

    pub fn registered_interconnects(&self) -> Vec<(String, PortKind)> {
        self.interconnects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Controller for SimpleCache {
    fn name(&self) -> &str {
        &self.name
    }

    fn coreid(&self) -> CoreId {
        self.coreid
    }

    fn register_interconnect(&self, interconnect: &Arc<dyn Interconnect>, port: PortKind) {
        self.interconnects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((interconnect.name().to_string(), port));
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }
}

pub(super) fn register() {
    registry::register_controller("simple_cache", SimpleCache::build);
}
