// Lockstep - Cycle-Accurate Multicore Simulation Driver
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Assembly-time behavior: template resolution, coreid allocation,
//! connection materialization, worker-plan entry conditions.
//!
//! The builder registries are process-global and tests run concurrently,
//! so every template registered here uses a key unique to its test.

use lockstep_config::SimConfig;
use lockstep_core::plugins::{SharedBus, SimpleCache};
use lockstep_core::{register_builtins, registry, Machine, PortKind, SimError, WorkerPlan};

fn config(template: &str) -> SimConfig {
    SimConfig {
        machine_config: template.to_string(),
        ..SimConfig::default()
    }
}

#[test]
fn coreids_form_a_dense_sequence() {
    register_builtins();
    let mut cfg = config("shared_l2");
    cfg.num_cores = 4;
    let mut machine = Machine::new("assembly", cfg);
    machine.assemble().unwrap();

    assert_eq!(machine.num_cores(), 4);
    for (position, core) in machine.cores().iter().enumerate() {
        assert_eq!(core.coreid() as usize, position);
    }
    assert_eq!(machine.claimed_contexts(), 4);
}

#[test]
fn materialization_registers_both_sides() {
    register_builtins();
    let mut cfg = config("shared_l2");
    cfg.num_cores = 2;
    let mut machine = Machine::new("assembly", cfg);
    machine.assemble().unwrap();

    // Controller side: the L1 saw its point-to-point link, the L2 saw
    // every link in declaration order.
    let l1i0 = machine.controller_by_name("L1_I_0").unwrap();
    let l1i0 = l1i0.as_any().unwrap().downcast_ref::<SimpleCache>().unwrap();
    assert_eq!(
        l1i0.registered_interconnects(),
        vec![("p2p_i_0".to_string(), PortKind::Upper)]
    );

    let l2 = machine.controller_by_name("L2_0").unwrap();
    let l2 = l2.as_any().unwrap().downcast_ref::<SimpleCache>().unwrap();
    assert_eq!(
        l2.registered_interconnects(),
        vec![
            ("p2p_i_0".to_string(), PortKind::Lower),
            ("p2p_d_0".to_string(), PortKind::Upper2),
            ("p2p_i_1".to_string(), PortKind::Lower),
            ("p2p_d_1".to_string(), PortKind::Upper2),
            ("bus_0".to_string(), PortKind::Lower),
        ]
    );

    // Interconnect side: attachment order preserved.
    let bus = machine
        .interconnects()
        .iter()
        .find(|ic| ic.name() == "bus_0")
        .unwrap();
    let bus = bus.as_any().unwrap().downcast_ref::<SharedBus>().unwrap();
    assert_eq!(
        bus.attached_controllers(),
        vec!["L2_0".to_string(), "MEM_0".to_string()]
    );

    // One interconnect per declared connection.
    assert_eq!(machine.interconnects().len(), machine.connections().len());
}

#[test]
fn unknown_template_diagnostic_lists_registered() {
    register_builtins();
    let mut machine = Machine::new("assembly", config("no_such_machine"));
    let err = machine.assemble().unwrap_err();
    let message = err.to_string();
    assert!(message.contains("no_such_machine"));
    assert!(message.contains("dual_core"));
}

#[test]
fn unknown_core_type_is_fatal_before_any_cycle() {
    register_builtins();
    registry::register_machine("assembly_bad_core", |machine| {
        machine.add_core("core_", "ooo")?;
        Ok(())
    });
    let mut machine = Machine::new("assembly", config("assembly_bad_core"));
    let err = machine.assemble().unwrap_err();
    assert!(matches!(&err, SimError::UnknownCoreType(name) if name == "ooo"));
    assert_eq!(machine.num_cores(), 0);
}

#[test]
fn unregistered_controller_in_connection_is_fatal() {
    register_builtins();
    registry::register_machine("assembly_dangling", |machine| {
        machine.add_core("core_", "timing")?;
        let link = machine.declare_connection("shared_bus", "link_", 0);
        machine.attach(link, "L1_D_7", PortKind::Upper);
        Ok(())
    });
    let mut machine = Machine::new("assembly", config("assembly_dangling"));
    let err = machine.assemble().unwrap_err();
    assert!(matches!(&err, SimError::UnknownController { .. }));
    assert!(err.to_string().contains("L1_D_7"));
}

#[test]
fn empty_template_name_is_fatal() {
    let mut machine = Machine::new("assembly", SimConfig::default());
    assert!(matches!(
        machine.assemble().unwrap_err(),
        SimError::EmptyTemplateName
    ));
}

#[test]
fn cache_config_type_defaults_to_auto() {
    register_builtins();
    let mut machine = Machine::new("assembly", config("single_core"));
    machine.assemble().unwrap();
    assert_eq!(machine.config().cache_config_type, "auto");
}

#[test]
fn explicit_cache_config_type_is_kept() {
    register_builtins();
    let mut cfg = config("single_core");
    cfg.cache_config_type = "shared_l2".to_string();
    let mut machine = Machine::new("assembly", cfg);
    machine.assemble().unwrap();
    assert_eq!(machine.config().cache_config_type, "shared_l2");
}

#[test]
fn worker_plan_respects_entry_conditions() {
    register_builtins();

    let mut cfg = config("shared_l2");
    cfg.num_cores = 4;
    cfg.threaded_simulation = true;
    cfg.cores_per_worker = 1;
    let mut machine = Machine::new("assembly", cfg);
    machine.assemble().unwrap();
    assert_eq!(
        machine.worker_plan(),
        Some(WorkerPlan {
            workers: 4,
            cores_per_worker: 1
        })
    );

    // Verbose logging forces sequential mode.
    let mut cfg = config("shared_l2");
    cfg.num_cores = 4;
    cfg.threaded_simulation = true;
    cfg.cores_per_worker = 1;
    cfg.loglevel = 1;
    let mut machine = Machine::new("assembly", cfg);
    machine.assemble().unwrap();
    assert_eq!(machine.worker_plan(), None);
    assert!(!machine.config().threaded_simulation);

    // Too few cores for more than one worker's share.
    let mut cfg = config("dual_core");
    cfg.threaded_simulation = true;
    cfg.cores_per_worker = 2;
    let mut machine = Machine::new("assembly", cfg);
    machine.assemble().unwrap();
    assert_eq!(machine.worker_plan(), None);
    assert!(!machine.config().threaded_simulation);
}

#[test]
fn uneven_worker_split_rounds_up() {
    register_builtins();
    let mut cfg = config("shared_l2");
    cfg.num_cores = 5;
    cfg.threaded_simulation = true;
    cfg.cores_per_worker = 2;
    let mut machine = Machine::new("assembly", cfg);
    machine.assemble().unwrap();
    assert_eq!(
        machine.worker_plan(),
        Some(WorkerPlan {
            workers: 3,
            cores_per_worker: 2
        })
    );
}

#[test]
fn reset_returns_machine_to_preassembly_state() {
    register_builtins();
    let mut machine = Machine::new("assembly", config("dual_core"));
    machine.assemble().unwrap();
    assert_eq!(machine.num_cores(), 2);

    machine.reset();
    assert_eq!(machine.num_cores(), 0);
    assert_eq!(machine.claimed_contexts(), 0);
    assert!(machine.hierarchy().is_none());
    assert!(machine.controllers().is_empty());
    assert!(machine.interconnects().is_empty());
    assert!(machine.connections().is_empty());
}

#[test]
fn dump_state_covers_cores_and_hierarchy() {
    register_builtins();
    let mut machine = Machine::new("assembly", config("dual_core"));
    machine.assemble().unwrap();

    let mut out = Vec::new();
    machine.dump_state(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("core_0"));
    assert!(text.contains("core_1"));
    assert!(text.contains("MemoryHierarchy:"));
}
