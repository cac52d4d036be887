//! Per-mode science CSV output (C6).

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::mode::ModeConfig;
use crate::row::DecodedRow;

/// Writes decoded rows for a single, currently-active mode/rate
/// configuration to its own CSV file, flushing after every packet so a
/// reader tailing the file never sees a partially-written packet.
pub struct ScienceFileWriter {
    path: PathBuf,
    inner: csv::Writer<File>,
}

impl ScienceFileWriter {
    /// Open a new output file named after `config` and `start_timestamp`,
    /// writing the CSV header immediately.
    pub fn create(
        base_path: &Path,
        config: &ModeConfig,
        start_timestamp: DateTime<Utc>,
    ) -> io::Result<Self> {
        let path = base_path.join(Self::file_name(config, start_timestamp));
        let file = File::create(&path)?;
        let inner = csv::WriterBuilder::new().from_writer(file);
        Ok(ScienceFileWriter { path, inner })
    }

    pub fn file_name(config: &ModeConfig, start_timestamp: DateTime<Utc>) -> String {
        format!(
            "MAGScience-{}-({},{})-{}s-{}-{}.csv",
            config.mode.tag(),
            config.primary_rate,
            config.secondary_rate,
            config.seconds_per_packet,
            start_timestamp.format("%Y%m%d"),
            start_timestamp.format("%Hh%Mm%Ss"),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_row(&mut self, row: &DecodedRow) -> csv::Result<()> {
        self.inner.serialize(row)
    }

    /// Flush to disk; called once per decoded packet so output is visible
    /// to a concurrent reader (e.g. the gap checker) with packet granularity.
    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
