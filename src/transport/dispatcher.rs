//! Transport Dispatcher Module
//!
//! Routes one courier's consignments to the strategy matching the courier's
//! transport method, applies the per-attempt timeout and retry policy, and
//! writes the outcome to the transport log.

use super::{
    EmailStrategy, FileTransfer, FtpStrategy, MailSender, RetryPolicy, TransportError, TransportLog,
    TransportStrategy, with_retry,
};
use crate::config::TransportConfig;
use crate::courier::Courier;
use crate::types::{Consignment, DispatchOutcome, DispatchReceipt, TransportMethod};
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One courier's share of a closed batch
#[derive(Debug, Clone)]
pub struct DispatchJob {
    pub courier_ref: String,
    pub batch_date: NaiveDate,
    pub courier: Arc<Courier>,
    pub consignments: Vec<Consignment>,
}

impl DispatchJob {
    /// Consignment numbers, one per line, CRLF-terminated
    pub fn manifest(&self) -> String {
        self.consignments
            .iter()
            .map(|c| format!("{}\r\n", c.consignment_number()))
            .collect()
    }
}

/// Batch transport dispatcher
///
/// Holds one strategy per supported transport method. Couriers with any
/// other method are skipped without a log record.
pub struct TransportDispatcher {
    email: EmailStrategy,
    ftp: FtpStrategy,
    log: Arc<dyn TransportLog>,
    retry: RetryPolicy,
    attempt_timeout: Duration,
}

impl TransportDispatcher {
    /// Creates a new dispatcher
    ///
    /// # Arguments
    /// * `mailer` - Channel used by the email strategy
    /// * `file_transfer` - Channel used by the ftp strategy
    /// * `log` - Receives one success or error record per dispatched courier
    /// * `scratch_dir` - Where ftp batch files are written before upload
    /// * `config` - Attempt timeout and retry settings
    pub fn new(
        mailer: Arc<dyn MailSender>,
        file_transfer: Arc<dyn FileTransfer>,
        log: Arc<dyn TransportLog>,
        scratch_dir: impl Into<PathBuf>,
        config: &TransportConfig,
    ) -> Self {
        Self {
            email: EmailStrategy::new(mailer),
            ftp: FtpStrategy::new(file_transfer, scratch_dir),
            log,
            retry: RetryPolicy::from_config(config),
            attempt_timeout: config.timeout(),
        }
    }

    /// Replace the retry policy built from config
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn strategy_for(&self, method: &TransportMethod) -> Option<&dyn TransportStrategy> {
        match method {
            TransportMethod::Email => Some(&self.email),
            TransportMethod::Ftp => Some(&self.ftp),
            TransportMethod::Unsupported(_) => None,
        }
    }

    /// Transport one courier's consignments
    ///
    /// Never fails: every error is converted into a log record and reported
    /// in the receipt. Cancelling `cancel` abandons the in-flight attempt.
    pub async fn dispatch(&self, job: DispatchJob, cancel: CancellationToken) -> DispatchReceipt {
        let method = job.courier.transport_method().clone();
        let mut receipt = DispatchReceipt {
            courier_ref: job.courier_ref.clone(),
            transport_method: method.clone(),
            consignment_count: job.consignments.len(),
            attempts: 0,
            outcome: DispatchOutcome::Skipped,
            log_written: false,
        };

        let Some(strategy) = self.strategy_for(&method) else {
            debug!(courier = %job.courier_ref, method = %method, "Unsupported transport method, skipping");
            return receipt;
        };

        let attempts = &AtomicU32::new(0);
        let attempt_timeout = self.attempt_timeout;
        let job_ref = &job;
        let delivery = with_retry(&self.retry, method.as_str(), move || {
            attempts.fetch_add(1, Ordering::Relaxed);
            async move {
                match tokio::time::timeout(attempt_timeout, strategy.deliver(job_ref)).await {
                    Ok(result) => result,
                    Err(_) => Err(TransportError::Timeout(attempt_timeout)),
                }
            }
        });

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            result = delivery => result,
        };
        receipt.attempts = attempts.load(Ordering::Relaxed);

        match result {
            Ok(()) => {
                info!(
                    courier = %job.courier_ref,
                    method = %method,
                    consignments = job.consignments.len(),
                    attempts = receipt.attempts,
                    "Consignments delivered"
                );
                receipt.outcome = DispatchOutcome::Delivered;
                receipt.log_written =
                    self.log.log_success(&job.courier_ref, job.batch_date, &method, &job.consignments);
            }
            Err(e) => {
                warn!(courier = %job.courier_ref, method = %method, "Transport failed: {}", e);
                receipt.outcome = DispatchOutcome::Failed(e.to_string());
                receipt.log_written =
                    self.log.log_error(&job.courier_ref, job.batch_date, &method, &job.consignments);
            }
        }

        if !receipt.log_written {
            warn!(courier = %job.courier_ref, "Transport log record was not written");
        }

        receipt
    }
}
