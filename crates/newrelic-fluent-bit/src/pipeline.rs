// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batch processing: normalize events, package them, hand units to a sink.

use std::path::{Path, PathBuf};

use nr_log_record::normalizer::Normalizer;
use nr_log_record::packager::Packager;
use nr_log_record::{PackageError, RawRecord, Timestamp, TransportUnit};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use crate::event::parse_event;
use crate::flusher::Flusher;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Package(#[from] PackageError),
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read events: {0}")]
    Read(#[source] std::io::Error),
}

/// Where packaged units go.
#[derive(Debug)]
pub enum Sink {
    /// Units are written as `unit-NNNNN.json.gz` files.
    Directory { dir: PathBuf, next_index: usize },
    /// Units are POSTed to the Logs API.
    Endpoint(Flusher),
}

impl Sink {
    #[must_use]
    pub fn directory(dir: impl Into<PathBuf>) -> Self {
        Sink::Directory {
            dir: dir.into(),
            next_index: 0,
        }
    }

    async fn accept(&mut self, units: Vec<TransportUnit>) -> Result<BatchSummary, PipelineError> {
        let mut summary = BatchSummary {
            units: units.len(),
            ..BatchSummary::default()
        };
        match self {
            Sink::Directory { dir, next_index } => {
                tokio::fs::create_dir_all(&dir)
                    .await
                    .map_err(|source| PipelineError::Write {
                        path: dir.clone(),
                        source,
                    })?;
                for unit in units {
                    let path = unit_path(dir, *next_index);
                    tokio::fs::write(&path, unit.as_bytes())
                        .await
                        .map_err(|source| PipelineError::Write { path, source })?;
                    *next_index += 1;
                    summary.records += unit.record_count();
                }
            }
            Sink::Endpoint(flusher) => {
                summary.records = units.iter().map(TransportUnit::record_count).sum();
                let failed = flusher.flush(units).await;
                summary.failed_units = failed.len();
                summary.records -= failed.iter().map(TransportUnit::record_count).sum::<usize>();
            }
        }
        Ok(summary)
    }
}

fn unit_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("unit-{index:05}.json.gz"))
}

/// Outcome of one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Units produced by the packager
    pub units: usize,
    /// Records written or delivered
    pub records: usize,
    /// Units the endpoint did not accept
    pub failed_units: usize,
}

impl std::ops::AddAssign for BatchSummary {
    fn add_assign(&mut self, other: Self) {
        self.units += other.units;
        self.records += other.records;
        self.failed_units += other.failed_units;
    }
}

pub struct Pipeline {
    normalizer: Normalizer,
    packager: Packager,
    sink: Sink,
    max_records: usize,
}

impl Pipeline {
    #[must_use]
    pub fn new(normalizer: Normalizer, packager: Packager, sink: Sink, max_records: usize) -> Self {
        Pipeline {
            normalizer,
            packager,
            sink,
            max_records: max_records.max(1),
        }
    }

    /// Normalizes and packages one batch, then hands the units to the sink.
    pub async fn process(
        &mut self,
        events: &[(RawRecord, Timestamp)],
    ) -> Result<BatchSummary, PipelineError> {
        if events.is_empty() {
            return Ok(BatchSummary::default());
        }
        let records: Vec<_> = events
            .iter()
            .map(|(raw, timestamp)| self.normalizer.normalize(raw, timestamp))
            .collect();
        let units = self.packager.package(&records)?;
        debug!(
            "LOGS | {} records packaged into {} units",
            records.len(),
            units.len()
        );
        self.sink.accept(units).await
    }

    /// Reads one event per line until EOF, processing them in batches of at
    /// most `max_records`. Lines that are not valid events are skipped.
    pub async fn run<R>(&mut self, reader: R) -> Result<BatchSummary, PipelineError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut batch = Vec::with_capacity(self.max_records);
        let mut total = BatchSummary::default();

        while let Some(line) = lines.next_line().await.map_err(PipelineError::Read)? {
            if line.trim().is_empty() {
                continue;
            }
            match parse_event(&line) {
                Ok(event) => batch.push(event),
                Err(e) => {
                    warn!("LOGS | Skipping invalid event: {}", e);
                    continue;
                }
            }
            if batch.len() >= self.max_records {
                total += self.process(&batch).await?;
                batch.clear();
            }
        }
        total += self.process(&batch).await?;

        info!(
            "LOGS | {} records sent in {} units, {} units failed",
            total.records, total.units, total.failed_units
        );
        Ok(total)
    }
}
