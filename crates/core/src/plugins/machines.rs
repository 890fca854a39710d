// Lockstep - Cycle-Accurate Multicore Simulation Driver
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Shipped machine templates.

use crate::machine::Machine;
use crate::{registry, PortKind, SimResult};

/// One timing core, no memory-side controllers.
fn single_core(machine: &mut Machine) -> SimResult<()> {
    machine.options.set_int_indexed("core_", 0, "commit_width", 1);
    machine.add_core("core_", "timing")?;
    Ok(())
}

/// Two timing cores sharing the memory hierarchy directly.
fn dual_core(machine: &mut Machine) -> SimResult<()> {
    for i in 0..2 {
        machine.options.set_int_indexed("core_", i, "commit_width", 1);
        machine.add_core("core_", "timing")?;
    }
    Ok(())
}

/// `num_cores` timing cores with split per-core L1s, point-to-point links
/// from every L1 to one shared L2, and a bus from the L2 to the memory
/// controller.
fn shared_l2(machine: &mut Machine) -> SimResult<()> {
    let cores = machine.config().num_cores.max(1) as usize;

    for i in 0..cores {
        machine.options.set_int_indexed("core_", i, "commit_width", 1);
        let coreid = machine.add_core("core_", "timing")?;
        machine.add_controller(coreid, "L1_I_", "simple_cache", PortKind::Instruction)?;
        machine.add_controller(coreid, "L1_D_", "simple_cache", PortKind::Data)?;
    }

    machine.add_controller(0, "L2_", "simple_cache", PortKind::Lower)?;
    machine.add_controller(0, "MEM_", "simple_cache", PortKind::Lower)?;

    for i in 0..cores {
        let link = machine.declare_connection("shared_bus", "p2p_i_", i);
        machine.attach(link, &format!("L1_I_{i}"), PortKind::Upper);
        machine.attach(link, "L2_0", PortKind::Lower);

        let link = machine.declare_connection("shared_bus", "p2p_d_", i);
        machine.attach(link, &format!("L1_D_{i}"), PortKind::Upper);
        machine.attach(link, "L2_0", PortKind::Upper2);
    }

    let bus = machine.declare_connection("shared_bus", "bus_", 0);
    machine.attach(bus, "L2_0", PortKind::Lower);
    machine.attach(bus, "MEM_0", PortKind::Upper);
    Ok(())
}

pub(super) fn register() {
    registry::register_machine("single_core", single_core);
    registry::register_machine("dual_core", dual_core);
    registry::register_machine("shared_l2", shared_l2);
}
