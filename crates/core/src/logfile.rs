// Lockstep - Cycle-Accurate Multicore Simulation Driver
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! The simulation log.
//!
//! Distinct from the driver's diagnostic tracing: this is the (optionally
//! deferred) log stream the simulation itself writes to, with an internal
//! byte counter and rename-and-reopen rotation once it exceeds the
//! configured size. Orchestrator-only in threaded mode.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

pub struct SimLog {
    path: Option<PathBuf>,
    file: Option<BufWriter<File>>,
    enabled: bool,
    bytes_written: u64,
}

impl SimLog {
    /// Open the log stream. `None` means no simulation log; every write
    /// becomes a no-op but enable/disable state is still tracked.
    pub fn open(path: Option<PathBuf>) -> io::Result<Self> {
        let file = match &path {
            Some(p) => Some(BufWriter::new(File::create(p)?)),
            None => None,
        };
        Ok(Self {
            path,
            file,
            enabled: false,
            bytes_written: 0,
        })
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Append a driver event line. Events are written whether or not the
    /// deferred enable has fired; the enable gate is for simulation
    /// verbosity, which lives outside this driver.
    pub fn note(&mut self, line: &str) {
        if let Some(file) = &mut self.file {
            if writeln!(file, "{line}").is_ok() {
                self.bytes_written += line.len() as u64 + 1;
            }
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn needs_rotation(&self, max_bytes: u64) -> bool {
        self.file.is_some() && self.bytes_written > max_bytes
    }

    /// Rotate: rename the current file to `<path>.old` and reopen a fresh
    /// one at the original path.
    pub fn rotate(&mut self) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }
        let mut backup = path.clone().into_os_string();
        backup.push(".old");
        std::fs::rename(path, &backup)?;
        self.file = Some(BufWriter::new(File::create(path)?));
        self.bytes_written = 0;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = &mut self.file {
            file.flush()?;
        }
        Ok(())
    }
}
