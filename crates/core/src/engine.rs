// Lockstep - Cycle-Accurate Multicore Simulation Driver
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! The cycle engine.
//!
//! One simulated cycle is: clock the memory hierarchy (phase 1), then
//! advance every core exactly once (phase 2), then fold the cores'
//! termination votes and committed-instruction counters into the stop
//! decision. Sequential mode runs phase 2 inline in coreid order;
//! threaded mode fans phase 2 out to a worker pool bracketed by a run
//! barrier and a join barrier, both of arity workers + 1.

use crate::clock;
use crate::context::ContextId;
use crate::hierarchy::MemoryHierarchy;
use crate::logfile::SimLog;
use crate::machine::{Machine, WorkerPlan};
use crate::stats::TimeSeriesWriter;
use crate::{affinity, SimError, SimResult};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Barrier, Mutex, PoisonError};
use std::thread;
use tracing::{debug, info, trace, warn};

/// Progress indicator stride, in cycles.
pub const PROGRESS_STRIDE: u64 = 1_000;
/// Periodic statistics snapshot stride, in cycles.
pub const SNAPSHOT_STRIDE: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// `wait_all_finished` treated the cycle boundary as a stop.
    WaitAllFinished,
    /// The committed-instruction budget was met or exceeded.
    UserInsnBudget,
    /// At least one core voted to terminate.
    CoreVote,
    /// A stop was requested from outside the loop (signal, embedder).
    ExternalStop,
}

/// What one `run` entry produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The stop predicate fired; the simulation is done.
    Exited(StopReason),
    /// Threaded mode was abandoned at the deferred-logging threshold.
    /// Re-entry is expected and will run sequentially, resuming at the
    /// same cycle number (the abandoned cycle had not begun).
    Relinquished,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimSummary {
    pub machine: String,
    pub cycles: u64,
    pub total_user_insns_committed: u64,
    pub stop_reason: StopReason,
}

/// Owns a machine for the duration of a simulation, together with the
/// simulation log and the optional statistics time series.
pub struct CycleEngine {
    machine: Machine,
    log: SimLog,
    time_series: Option<TimeSeriesWriter>,
}

impl CycleEngine {
    pub fn new(machine: Machine) -> SimResult<Self> {
        let log = SimLog::open(machine.config().log_file.clone())?;
        let time_series = match &machine.config().time_stats_file {
            Some(path) => Some(TimeSeriesWriter::create(path)?),
            None => None,
        };
        Ok(Self {
            machine,
            log,
            time_series,
        })
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    pub fn into_machine(self) -> Machine {
        self.machine
    }

    /// Run to completion, re-entering the loop whenever threaded mode
    /// relinquishes at the deferred-logging threshold.
    pub fn simulate(&mut self) -> SimResult<SimSummary> {
        loop {
            if let RunOutcome::Exited(reason) = self.run()? {
                return Ok(self.summary(reason));
            }
        }
    }

    /// One entry into the cycle loop. Resets the cores on the first entry,
    /// lets every core pick up external context changes, then runs cycles
    /// until the stop predicate fires or threaded mode relinquishes.
    pub fn run(&mut self) -> SimResult<RunOutcome> {
        if self.machine.config.logable(1) {
            debug!(machine = %self.machine.name(), "starting machine toplevel loop");
        }

        let hierarchy = self
            .machine
            .hierarchy
            .clone()
            .ok_or_else(|| SimError::NotAssembled(self.machine.name().to_string()))?;

        if self.machine.first_run {
            for core in &mut self.machine.cores {
                core.reset();
            }
        }
        for core in &mut self.machine.cores {
            core.check_context_changes();
        }
        self.machine.first_run = false;

        let plan = self.machine.worker_plan;
        if self.machine.config.threaded_simulation {
            if let Some(plan) = plan {
                return self.run_threaded(&hierarchy, plan);
            }
        }
        self.run_sequential(&hierarchy)
    }

    fn run_sequential(&mut self, hierarchy: &Arc<dyn MemoryHierarchy>) -> SimResult<RunOutcome> {
        loop {
            self.maybe_enable_logging();
            if clock::now() % PROGRESS_STRIDE == 0 {
                self.update_progress();
            }
            self.dump_time_series();
            self.maybe_rotate_log();

            hierarchy.clock();

            let mut exiting = false;
            let verbose = self.machine.config.logable(4);
            for core in &mut self.machine.cores {
                if verbose {
                    trace!(coreid = core.coreid(), "running core");
                }
                exiting |= core.runcycle();
            }

            self.machine.total_user_insns_committed = self
                .machine
                .cores
                .iter()
                .map(|core| core.instructions_committed())
                .sum();
            self.machine.stats.cycles += 1;
            clock::advance();
            self.machine.iterations += 1;

            if let Some(reason) = self.stop_reason(exiting) {
                self.finish_exit(reason);
                return Ok(RunOutcome::Exited(reason));
            }
        }
    }

    fn run_threaded(
        &mut self,
        hierarchy: &Arc<dyn MemoryHierarchy>,
        plan: WorkerPlan,
    ) -> SimResult<RunOutcome> {
        let run_barrier = Barrier::new(plan.workers + 1);
        let join_barrier = Barrier::new(plan.workers + 1);
        // Workers OR their votes in; the orchestrator takes-and-clears
        // after every join. Never retained across cycles.
        let stop_flag = Mutex::new(false);
        let shutdown = AtomicBool::new(false);
        let committed = AtomicU64::new(0);

        let mut cores = std::mem::take(&mut self.machine.cores);

        let outcome = thread::scope(|scope| {
            for (worker, slice) in cores.chunks_mut(plan.cores_per_worker).enumerate() {
                let run_barrier = &run_barrier;
                let join_barrier = &join_barrier;
                let stop_flag = &stop_flag;
                let shutdown = &shutdown;
                let committed = &committed;
                scope.spawn(move || {
                    if let Err(err) = affinity::pin_current_thread(worker) {
                        warn!(worker, %err, "could not pin worker to a cpu");
                    }
                    loop {
                        run_barrier.wait();
                        if shutdown.load(Ordering::Acquire) {
                            return;
                        }
                        let mut exiting = false;
                        let mut slice_committed = 0u64;
                        for core in slice.iter_mut() {
                            exiting |= core.runcycle();
                            slice_committed += core.instructions_committed();
                        }
                        committed.fetch_add(slice_committed, Ordering::Relaxed);
                        if exiting {
                            *stop_flag
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner) = true;
                        }
                        join_barrier.wait();
                    }
                });
            }

            loop {
                // Abandon threaded mode once the deferred-logging
                // threshold is reached: the log stream cannot be shared
                // across workers. The check precedes phase 1, so the
                // abandoned cycle has not begun.
                let threshold = self.machine.config.start_log_at_iteration;
                if threshold != 0 && self.machine.iterations >= threshold {
                    self.machine.config.threaded_simulation = false;
                    info!(
                        cycle = self.machine.iterations,
                        "leaving threaded mode at the deferred-logging threshold"
                    );
                    shutdown.store(true, Ordering::Release);
                    run_barrier.wait();
                    return Ok(RunOutcome::Relinquished);
                }

                if clock::now() % PROGRESS_STRIDE == 0 {
                    self.update_progress();
                }
                self.dump_time_series();
                self.maybe_rotate_log();

                hierarchy.clock();

                committed.store(0, Ordering::Relaxed);
                run_barrier.wait();
                join_barrier.wait();

                let exiting = {
                    let mut flag = stop_flag.lock().unwrap_or_else(PoisonError::into_inner);
                    std::mem::take(&mut *flag)
                };

                self.machine.total_user_insns_committed = committed.load(Ordering::Relaxed);
                self.machine.stats.cycles += 1;
                clock::advance();
                self.machine.iterations += 1;

                if let Some(reason) = self.stop_reason(exiting) {
                    self.finish_exit(reason);
                    shutdown.store(true, Ordering::Release);
                    run_barrier.wait();
                    return Ok(RunOutcome::Exited(reason));
                }
            }
        });

        self.machine.cores = cores;
        outcome
    }

    /// Stop predicate, evaluated at the end of every cycle.
    fn stop_reason(&self, core_vote: bool) -> Option<StopReason> {
        let config = &self.machine.config;
        if config.wait_all_finished {
            return Some(StopReason::WaitAllFinished);
        }
        if self.machine.total_user_insns_committed >= config.stop_at_user_insns {
            return Some(StopReason::UserInsnBudget);
        }
        if core_vote {
            return Some(StopReason::CoreVote);
        }
        if self.machine.take_external_stop() {
            return Some(StopReason::ExternalStop);
        }
        None
    }

    fn finish_exit(&mut self, reason: StopReason) {
        // The emulator resumes on some guest context after the loop; make
        // sure one is bound even when no core nominated one.
        if self.machine.resume_context.is_none() {
            self.machine.resume_context = Some(ContextId(0));
        }
        self.machine.stats.insns_committed = self.machine.total_user_insns_committed;
        info!(
            ?reason,
            iterations = self.machine.iterations,
            commits = self.machine.total_user_insns_committed,
            "stopping simulation loop"
        );
        self.log.note(&format!(
            "stopping simulation loop ({} iterations, {} commits)",
            self.machine.iterations, self.machine.total_user_insns_committed
        ));
        if let Err(err) = self.log.flush() {
            warn!(%err, "could not flush simulation log");
        }
    }

    fn maybe_enable_logging(&mut self) {
        let config = &self.machine.config;
        if self.log.enabled() || config.log_user_only {
            return;
        }
        if self.machine.iterations < config.start_log_at_iteration {
            return;
        }
        let level = config.loglevel;
        let cycle = self.machine.iterations;
        self.log.enable();
        info!(loglevel = level, cycle, "simulation logging enabled");
        self.log
            .note(&format!("start logging at level {level} in cycle {cycle}"));
    }

    fn update_progress(&self) {
        info!(
            target: "lockstep::progress",
            cycle = clock::now(),
            commits = self.machine.total_user_insns_committed,
            "completed cycles"
        );
    }

    fn dump_time_series(&mut self) {
        let Some(writer) = self.time_series.as_mut() else {
            return;
        };
        if !writer.header_written() {
            if let Err(err) = writer.dump_header() {
                warn!(%err, "skipping time-series header");
            }
        }
        if clock::now() % SNAPSHOT_STRIDE == 0 {
            if let Err(err) =
                writer.dump_periodic(clock::now(), self.machine.total_user_insns_committed)
            {
                warn!(%err, "skipping time-series snapshot");
            }
        }
    }

    fn maybe_rotate_log(&mut self) {
        let max_bytes = self.machine.config.log_file_size;
        if !self.log.needs_rotation(max_bytes) {
            return;
        }
        match self.log.rotate() {
            Ok(()) => info!("simulation log rotated"),
            Err(err) => warn!(%err, "log rotation failed"),
        }
    }

    fn summary(&self, stop_reason: StopReason) -> SimSummary {
        SimSummary {
            machine: self.machine.name().to_string(),
            cycles: self.machine.iterations,
            total_user_insns_committed: self.machine.total_user_insns_committed,
            stop_reason,
        }
    }
}
