//! Race outcome journal
//!
//! Append-only record of every finished race, one JSON object per line.
//! Creates daily files: <dir>/races_YYYYMMDD.jsonl (UTC date).

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use super::types::{RaceOutcome, RaceReport};

/// One journal line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub timestamp: DateTime<Utc>,
    /// Raced pending tx
    pub target: String,
    /// confirmed_included | rejected_by_node | timed_out | superseded_by_target
    pub outcome: String,
    pub tx_hash: Option<String>,
    pub nonce: u64,
    pub gas_price_wei: u128,
    pub gas_limit: Option<u64>,
    pub deadline: u64,
    pub block_number: Option<u64>,
    pub reason: Option<String>,
    /// Sighting to broadcast
    #[serde(default)]
    pub broadcast_ms: Option<u64>,
    pub elapsed_ms: u64,
}

impl OutcomeRecord {
    pub fn from_report(report: &RaceReport, timestamp: DateTime<Utc>) -> Self {
        let (block_number, reason) = match &report.outcome {
            RaceOutcome::ConfirmedIncluded { block_number, .. } => (*block_number, None),
            RaceOutcome::RejectedByNode { reason, .. } => (None, Some(reason.clone())),
            RaceOutcome::TimedOut { .. } | RaceOutcome::SupersededByTarget { .. } => (None, None),
        };

        Self {
            timestamp,
            target: report.target.to_string(),
            outcome: report.outcome.kind().to_string(),
            tx_hash: report.outcome.tx_hash().map(|h| h.to_string()),
            nonce: report.nonce,
            gas_price_wei: report.bid.price,
            gas_limit: report.gas_limit,
            deadline: report.bid.deadline,
            block_number,
            reason,
            broadcast_ms: report.broadcast_after.map(|d| d.as_millis() as u64),
            elapsed_ms: report.elapsed.as_millis() as u64,
        }
    }
}

pub struct OutcomeJournal {
    base_dir: PathBuf,
}

impl OutcomeJournal {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)
            .with_context(|| format!("Failed to create outcome log directory: {:?}", base_dir))?;
        Ok(Self { base_dir })
    }

    fn file_path_for_date(&self, date: NaiveDate) -> PathBuf {
        self.base_dir
            .join(format!("races_{}.jsonl", date.format("%Y%m%d")))
    }

    /// Append a finished race, stamped now
    pub fn log(&mut self, report: &RaceReport) -> Result<()> {
        self.log_record(&OutcomeRecord::from_report(report, Utc::now()))
    }

    pub fn log_record(&mut self, record: &OutcomeRecord) -> Result<()> {
        let file_path = self.file_path_for_date(record.timestamp.date_naive());

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)
            .with_context(|| format!("Failed to open outcome log: {:?}", file_path))?;

        let json = serde_json::to_string(record).context("Failed to serialize race outcome")?;
        writeln!(file, "{}", json)?;
        Ok(())
    }

    /// Read every record logged on `date`
    pub fn read_all(&self, date: NaiveDate) -> Result<Vec<OutcomeRecord>> {
        let path = self.file_path_for_date(date);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: OutcomeRecord = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse outcome line: {}", line))?;
            records.push(record);
        }
        Ok(records)
    }
}
