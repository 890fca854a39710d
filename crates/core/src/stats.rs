// Lockstep - Cycle-Accurate Multicore Simulation Driver
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Statistics forwarding.
//!
//! The driver owns only aggregate counters; everything finer-grained
//! belongs to the cores and the memory subsystem. Periodic snapshots go
//! to an optional time-series file: one header line, then one row per
//! snapshot keyed by the global cycle. Snapshot I/O failures skip the
//! snapshot and never stop the loop.

use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Aggregate counters the driver maintains across a run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct SummaryStats {
    pub cycles: u64,
    pub insns_committed: u64,
}

/// Append-only time-series sink.
pub struct TimeSeriesWriter {
    out: BufWriter<File>,
    header_written: bool,
}

impl TimeSeriesWriter {
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self {
            out: BufWriter::new(File::create(path)?),
            header_written: false,
        })
    }

    pub fn header_written(&self) -> bool {
        self.header_written
    }

    /// Emit the column header. Tracked per writer so re-entry into the
    /// cycle loop never duplicates it.
    pub fn dump_header(&mut self) -> io::Result<()> {
        writeln!(self.out, "cycle,total_user_insns_committed")?;
        self.header_written = true;
        self.out.flush()
    }

    pub fn dump_periodic(&mut self, cycle: u64, insns_committed: u64) -> io::Result<()> {
        writeln!(self.out, "{cycle},{insns_committed}")?;
        self.out.flush()
    }
}
