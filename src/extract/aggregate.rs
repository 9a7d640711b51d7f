use anyhow::{Context, Result};
use csv::{QuoteStyle, Terminator, Writer, WriterBuilder};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::extract::record::MetricRecord;
use crate::path_utils;

/// Column set of the aggregated table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Schema {
    /// Includes the echoed protocol parameters
    #[default]
    Current,
    /// The earlier column set, without protocol parameters
    Legacy,
}

const CURRENT_HEADER: &[&str] = &[
    "bench",
    "run",
    "num_queries",
    "blowup_factor",
    "grinding_factor",
    "trace_build",
    "prove",
    "verify",
    "proof_size_readable",
    "proof_size_bytes",
];

const LEGACY_HEADER: &[&str] = &[
    "bench",
    "run",
    "trace_build",
    "prove",
    "verify",
    "proof_size_readable",
    "proof_size_bytes",
];

impl Schema {
    pub fn header(&self) -> &'static [&'static str] {
        match self {
            Schema::Current => CURRENT_HEADER,
            Schema::Legacy => LEGACY_HEADER,
        }
    }

    /// Render a record in this schema's column order
    pub fn row(&self, record: &MetricRecord) -> Vec<String> {
        let cell = |field: &Option<String>| field.clone().unwrap_or_default();
        let mut row = vec![record.bench.clone(), record.run.to_string()];
        if *self == Schema::Current {
            row.push(cell(&record.num_queries));
            row.push(cell(&record.blowup_factor));
            row.push(cell(&record.grinding_factor));
        }
        row.push(cell(&record.trace_build));
        row.push(cell(&record.prove));
        row.push(cell(&record.verify));
        row.push(cell(&record.proof_size_readable));
        row.push(cell(&record.proof_size_bytes));
        row
    }
}

/// Owner of the aggregated table for the length of one extraction.
///
/// Creating an aggregator truncates the destination and writes the header;
/// rows are appended as records arrive. The writer is flushed by
/// [`Aggregator::finish`], and on drop if an error cuts the run short.
pub struct Aggregator {
    writer: Writer<File>,
    schema: Schema,
    path: PathBuf,
    rows: usize,
}

impl Aggregator {
    pub fn create(path: &Path, schema: Schema) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            path_utils::ensure_directory(parent)?;
        }

        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .terminator(Terminator::Any(b'\n'))
            .from_path(path)
            .with_context(|| format!("Failed to create output table {path:?}"))?;
        writer
            .write_record(schema.header())
            .with_context(|| format!("Failed to write header to {path:?}"))?;
        debug!("Created {:?} table at {path:?}", schema);

        Ok(Self {
            writer,
            schema,
            path: path.to_path_buf(),
            rows: 0,
        })
    }

    pub fn append(&mut self, record: &MetricRecord) -> Result<()> {
        self.writer
            .write_record(self.schema.row(record))
            .with_context(|| format!("Failed to append row to {:?}", self.path))?;
        self.rows += 1;
        Ok(())
    }

    /// Rows written so far, header excluded
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn finish(mut self) -> Result<PathBuf> {
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush {:?}", self.path))?;
        Ok(self.path)
    }
}
