// Lockstep - Cycle-Accurate Multicore Simulation Driver
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::hierarchy::MemoryHierarchy;
use crate::registry;
use crate::{Controller, Interconnect, SimResult};
use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError};

/// Bookkeeping-only interconnect: records attached controllers in
/// attachment order against the memory hierarchy it was built for.
pub struct SharedBus {
    name: String,
    hierarchy: Arc<dyn MemoryHierarchy>,
    controllers: Mutex<Vec<String>>,
}

impl SharedBus {
    pub fn build(
        hierarchy: Arc<dyn MemoryHierarchy>,
        name: &str,
    ) -> SimResult<Arc<dyn Interconnect>> {
        Ok(Arc::new(Self {
            name: name.to_string(),
            hierarchy,
            controllers: Mutex::new(Vec::new()),
        }))
    }

    pub fn hierarchy(&self) -> &Arc<dyn MemoryHierarchy> {
        &self.hierarchy
    }

    pub fn attached_controllers(&self) -> Vec<String> {
        self.controllers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Interconnect for SharedBus {
    fn name(&self) -> &str {
        &self.name
    }

    fn register_controller(&self, controller: &Arc<dyn Controller>) {
        self.controllers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(controller.name().to_string());
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }
}

pub(super) fn register() {
    registry::register_interconnect("shared_bus", SharedBus::build);
}
