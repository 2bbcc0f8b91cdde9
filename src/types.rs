use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque credential bundle handed to a courier's transport channel.
///
/// Keys depend on the transport method:
/// - email: `to`, `from`
/// - ftp: `server`, `username`, `password`
pub type TransportCredentials = BTreeMap<String, String>;

/// A single shipment record identified by a courier-issued number
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consignment {
    courier_ref: String,
    consignment_number: String,
}

impl Consignment {
    /// The courier reference is not checked against the registry here.
    pub fn new(courier_ref: impl Into<String>, consignment_number: impl Into<String>) -> Self {
        Self {
            courier_ref: courier_ref.into(),
            consignment_number: consignment_number.into(),
        }
    }

    pub fn courier_ref(&self) -> &str {
        &self.courier_ref
    }

    pub fn consignment_number(&self) -> &str {
        &self.consignment_number
    }
}

/// Channel used to deliver a batch's consignment numbers to a courier
///
/// Method names are matched exactly (`email`, `ftp`). Anything else, including
/// other casings, is kept verbatim so it can be reported; the dispatcher skips it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransportMethod {
    Email,
    Ftp,
    Unsupported(String),
}

impl TransportMethod {
    pub fn as_str(&self) -> &str {
        match self {
            TransportMethod::Email => "email",
            TransportMethod::Ftp => "ftp",
            TransportMethod::Unsupported(name) => name,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, TransportMethod::Unsupported(_))
    }
}

impl From<&str> for TransportMethod {
    fn from(value: &str) -> Self {
        match value {
            "email" => TransportMethod::Email,
            "ftp" => TransportMethod::Ftp,
            _ => TransportMethod::Unsupported(value.to_string()),
        }
    }
}

impl From<String> for TransportMethod {
    fn from(value: String) -> Self {
        TransportMethod::from(value.as_str())
    }
}

impl From<TransportMethod> for String {
    fn from(method: TransportMethod) -> Self {
        method.as_str().to_string()
    }
}

impl fmt::Display for TransportMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of the batch accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchState {
    Closed,
    Open,
}

/// Snapshot of the accumulator's state, as reported by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatus {
    pub state: BatchState,
    /// Date stamped by the most recent open, if any
    pub batch_date: Option<NaiveDate>,
}

/// How a single courier's transport attempt ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum DispatchOutcome {
    Delivered,
    Failed(String),
    /// Transport method not supported; nothing was sent or logged
    Skipped,
}

/// Result of transporting one courier's consignments at batch close
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReceipt {
    pub courier_ref: String,
    pub transport_method: TransportMethod,
    pub consignment_count: usize,
    pub attempts: u32,
    pub outcome: DispatchOutcome,
    /// Whether the transport log reported the record as written
    pub log_written: bool,
}

impl DispatchReceipt {
    pub fn is_delivered(&self) -> bool {
        self.outcome == DispatchOutcome::Delivered
    }
}

/// Summary of a closed batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub batch_date: NaiveDate,
    /// One receipt per dispatched courier, in registry order
    pub receipts: Vec<DispatchReceipt>,
    /// References that had pending consignments but no registered courier
    pub unrouted: Vec<String>,
}

impl BatchReport {
    pub fn delivered_count(&self) -> usize {
        self.receipts.iter().filter(|r| r.is_delivered()).count()
    }
}
