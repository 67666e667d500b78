//! Where finished flood records are written.

use crate::types::record::FloodRecord;
use log::info;
use polars::error::PolarsError;
use polars::prelude::*;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::task;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to open output file '{0}'")]
    FileOpen(PathBuf, #[source] std::io::Error),

    #[error("Failed to build the record table")]
    Table(#[source] PolarsError),

    #[error("Failed to write records to '{0}'")]
    CsvWrite(PathBuf, #[source] PolarsError),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Append-only destination for flood records.
#[allow(async_fn_in_trait)]
pub trait RecordSink {
    /// Appends `records`, preceded by a header row when `include_header` is set.
    async fn append(
        &mut self,
        records: &[FloodRecord],
        include_header: bool,
    ) -> Result<(), OutputError>;
}

impl<T: RecordSink + ?Sized> RecordSink for &mut T {
    async fn append(
        &mut self,
        records: &[FloodRecord],
        include_header: bool,
    ) -> Result<(), OutputError> {
        (**self).append(records, include_header).await
    }
}

/// The panel as a table with columns
/// `code_muni, year, period, flooded_pixels, valid_pixels, flood_ratio`.
pub fn records_to_frame(records: &[FloodRecord]) -> Result<DataFrame, OutputError> {
    df!(
        "code_muni" => records.iter().map(|r| r.code_muni.get()).collect::<Vec<i64>>(),
        "year" => records.iter().map(|r| r.year).collect::<Vec<i32>>(),
        "period" => records.iter().map(|r| r.period.to_string()).collect::<Vec<String>>(),
        "flooded_pixels" => records.iter().map(|r| r.flooded_pixels).collect::<Vec<u64>>(),
        "valid_pixels" => records.iter().map(|r| r.valid_pixels).collect::<Vec<u64>>(),
        "flood_ratio" => records.iter().map(|r| r.flood_ratio).collect::<Vec<f64>>(),
    )
    .map_err(OutputError::Table)
}

/// Appends records to a CSV file. The file is opened, written and closed on
/// every call, so earlier appends stay on disk if a later one fails.
#[derive(Debug, Clone)]
pub struct CsvRecordSink {
    path: PathBuf,
}

impl CsvRecordSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for CsvRecordSink {
    async fn append(
        &mut self,
        records: &[FloodRecord],
        include_header: bool,
    ) -> Result<(), OutputError> {
        let mut frame = records_to_frame(records)?;
        let path_buf = self.path.clone();
        task::spawn_blocking(move || {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path_buf)
                .map_err(|e| OutputError::FileOpen(path_buf.clone(), e))?;
            CsvWriter::new(&mut file)
                .include_header(include_header)
                .finish(&mut frame)
                .map_err(|e| OutputError::CsvWrite(path_buf, e))?;
            Ok::<(), OutputError>(())
        })
        .await??;
        info!(
            "Appended {} records to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Collects appended records in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryRecordSink {
    pub records: Vec<FloodRecord>,
    /// `include_header` of every append, in call order.
    pub headers: Vec<bool>,
}

impl RecordSink for MemoryRecordSink {
    async fn append(
        &mut self,
        records: &[FloodRecord],
        include_header: bool,
    ) -> Result<(), OutputError> {
        self.records.extend_from_slice(records);
        self.headers.push(include_header);
        Ok(())
    }
}
