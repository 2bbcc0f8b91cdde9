//! Transport outcome log
//!
//! Records whether each courier's batch was delivered. Implementations must
//! not panic and report whether the record was written.

use crate::types::{Consignment, TransportMethod};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Mutex;
use tracing::{info, warn};

pub trait TransportLog: Send + Sync {
    fn log_success(
        &self,
        courier_ref: &str,
        batch_date: NaiveDate,
        transport_method: &TransportMethod,
        consignments: &[Consignment],
    ) -> bool;

    fn log_error(
        &self,
        courier_ref: &str,
        batch_date: NaiveDate,
        transport_method: &TransportMethod,
        consignments: &[Consignment],
    ) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportLogEntry {
    pub kind: LogKind,
    pub courier_ref: String,
    pub batch_date: NaiveDate,
    pub transport_method: TransportMethod,
    pub consignment_numbers: Vec<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Keeps log entries in memory and mirrors each one to `tracing`
#[derive(Debug, Default)]
pub struct InMemoryTransportLog {
    entries: Mutex<Vec<TransportLogEntry>>,
}

impl InMemoryTransportLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<TransportLogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn successes(&self) -> Vec<TransportLogEntry> {
        self.entries_of(LogKind::Success)
    }

    pub fn errors(&self) -> Vec<TransportLogEntry> {
        self.entries_of(LogKind::Error)
    }

    fn entries_of(&self, kind: LogKind) -> Vec<TransportLogEntry> {
        self.entries().into_iter().filter(|e| e.kind == kind).collect()
    }

    fn record(
        &self,
        kind: LogKind,
        courier_ref: &str,
        batch_date: NaiveDate,
        transport_method: &TransportMethod,
        consignments: &[Consignment],
    ) -> bool {
        let entry = TransportLogEntry {
            kind,
            courier_ref: courier_ref.to_string(),
            batch_date,
            transport_method: transport_method.clone(),
            consignment_numbers: consignments
                .iter()
                .map(|c| c.consignment_number().to_string())
                .collect(),
            recorded_at: Utc::now(),
        };

        match kind {
            LogKind::Success => info!(
                courier = courier_ref,
                batch_date = %batch_date,
                method = %transport_method,
                consignments = entry.consignment_numbers.len(),
                "Batch transported"
            ),
            LogKind::Error => warn!(
                courier = courier_ref,
                batch_date = %batch_date,
                method = %transport_method,
                consignments = ?entry.consignment_numbers,
                "Batch transport failed, consignments need manual follow-up"
            ),
        }

        match self.entries.lock() {
            Ok(mut entries) => {
                entries.push(entry);
                true
            }
            Err(_) => false,
        }
    }
}

impl TransportLog for InMemoryTransportLog {
    fn log_success(
        &self,
        courier_ref: &str,
        batch_date: NaiveDate,
        transport_method: &TransportMethod,
        consignments: &[Consignment],
    ) -> bool {
        self.record(LogKind::Success, courier_ref, batch_date, transport_method, consignments)
    }

    fn log_error(
        &self,
        courier_ref: &str,
        batch_date: NaiveDate,
        transport_method: &TransportMethod,
        consignments: &[Consignment],
    ) -> bool {
        self.record(LogKind::Error, courier_ref, batch_date, transport_method, consignments)
    }
}
