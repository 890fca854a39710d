// Lockstep - Cycle-Accurate Multicore Simulation Driver
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration consumed by the machine driver.
///
/// Every field has a usable default so a config file only needs to name the
/// machine template; `validate` enforces the few fields that must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Machine template to assemble. Required; empty is a configuration error.
    pub machine_config: String,
    /// Advance the cores across a pool of worker threads.
    pub threaded_simulation: bool,
    /// How many cores each worker thread advances per cycle.
    pub cores_per_worker: u32,
    /// Cycle at which the simulation log is enabled (0 = from the start).
    pub start_log_at_iteration: u64,
    /// Leave logging decisions to the guest-facing layer.
    pub log_user_only: bool,
    /// Simulation log verbosity. Any level >= 1 forces sequential mode.
    pub loglevel: u8,
    /// Simulation log stream. No file means no simulation log.
    pub log_file: Option<PathBuf>,
    /// Rotate the simulation log once it exceeds this many bytes.
    pub log_file_size: u64,
    /// Stop once this many user instructions have been committed in total.
    pub stop_at_user_insns: u64,
    /// Treat the next cycle boundary as a stop.
    pub wait_all_finished: bool,
    /// Forwarded to the memory hierarchy. The driver defaults this to
    /// "auto" before invoking the machine template.
    pub cache_config_type: String,
    /// Periodic statistics snapshots are appended to this file.
    pub time_stats_file: Option<PathBuf>,
    /// Core count consumed by multi-core machine templates.
    pub num_cores: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            machine_config: String::new(),
            threaded_simulation: false,
            cores_per_worker: 4,
            start_log_at_iteration: 0,
            log_user_only: false,
            loglevel: 0,
            log_file: None,
            log_file_size: 16 * 1024 * 1024,
            stop_at_user_insns: u64::MAX,
            wait_all_finished: false,
            cache_config_type: String::new(),
            time_stats_file: None,
            num_cores: 2,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("machine_config is empty: name a machine template")]
    MissingMachine,
    #[error("cores_per_worker must be positive")]
    ZeroCoresPerWorker,
}

impl SimConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        let config =
            serde_yaml::from_str(&content).context("failed to parse simulation config YAML")?;
        Ok(config)
    }

    /// Fatal-rule check, run once before assembly.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.machine_config.is_empty() {
            return Err(ConfigError::MissingMachine);
        }
        if self.cores_per_worker == 0 {
            return Err(ConfigError::ZeroCoresPerWorker);
        }
        Ok(())
    }

    /// Verbosity test: true when `loglevel` is at least `level`.
    pub fn logable(&self, level: u8) -> bool {
        self.loglevel >= level
    }
}
