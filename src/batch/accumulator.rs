//! Batch Accumulator Module
//!
//! This module implements the daily batch lifecycle. A batch is opened at the
//! start of the day, consignments are accumulated per courier while it is
//! open, and closing it hands each courier's consignments to the transport
//! dispatcher.
//!
//! # Lifecycle
//! 1. `open` stamps the batch date and clears the previous batch's consignments
//! 2. `add_consignment` / `allocate_consignment` accumulate consignments
//! 3. `close` transports every registered courier's consignments, in registry order
//! 4. Consignments stay readable after close until the next `open`

use crate::{
    clock::Clock,
    config::BatchConfig,
    error::{DispatchError, Result},
    registry::CourierRegistry,
    transport::{DispatchJob, TransportDispatcher},
    BatchReport, BatchState, BatchStatus, Consignment, DispatchOutcome, DispatchReceipt,
};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Mutable batch state, guarded by a single lock
#[derive(Debug)]
struct BatchBook {
    state: BatchState,
    batch_date: Option<NaiveDate>,
    /// Consignments per courier reference, in the order they were added
    pending: HashMap<String, Vec<Consignment>>,
    /// Every number handed out during this session, across batches
    used_numbers: HashSet<String>,
}

/// Batch accumulator
///
/// Owns the open/closed state machine and the consignments of the current
/// batch. Safe to share between tasks; all state changes go through one lock.
pub struct BatchAccumulator {
    registry: Arc<CourierRegistry>,
    dispatcher: Arc<TransportDispatcher>,
    clock: Arc<dyn Clock>,
    config: BatchConfig,
    book: RwLock<BatchBook>,
    /// Cancellation handles of transports still running, keyed by courier
    /// reference and tagged with the close that started them
    in_flight: Mutex<HashMap<String, (u64, CancellationToken)>>,
    closes: AtomicU64,
}

impl BatchAccumulator {
    /// Creates a new, closed batch accumulator
    ///
    /// # Arguments
    /// * `registry` - Couriers consignments can be added for
    /// * `dispatcher` - Transports each courier's consignments on close
    /// * `clock` - Supplies the batch date
    /// * `config` - Batch settings (number generation attempts)
    pub fn new(
        registry: Arc<CourierRegistry>,
        dispatcher: Arc<TransportDispatcher>,
        clock: Arc<dyn Clock>,
        config: BatchConfig,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            clock,
            config,
            book: RwLock::new(BatchBook {
                state: BatchState::Closed,
                batch_date: None,
                pending: HashMap::new(),
                used_numbers: HashSet::new(),
            }),
            in_flight: Mutex::new(HashMap::new()),
            closes: AtomicU64::new(0),
        }
    }

    /// Open a new batch
    ///
    /// Clears the previous batch's consignments and stamps today's date.
    /// Does nothing if a batch is already open.
    ///
    /// # Returns
    /// The date of the open batch
    pub async fn open(&self) -> NaiveDate {
        let mut book = self.book.write().await;

        if let (BatchState::Open, Some(date)) = (book.state, book.batch_date) {
            debug!(batch_date = %date, "Batch already open");
            return date;
        }

        let date = self.clock.today();
        book.pending.clear();
        book.batch_date = Some(date);
        book.state = BatchState::Open;
        info!(batch_date = %date, "Batch opened");
        date
    }

    /// Close the open batch and transport its consignments
    ///
    /// See [`BatchAccumulator::close_with`].
    pub async fn close(&self) -> Option<BatchReport> {
        self.close_with(CancellationToken::new()).await
    }

    /// Close the open batch, transporting with cancellation support
    ///
    /// Each registered courier with pending consignments is dispatched as its
    /// own task. Cancelling `cancel` abandons every transport still in flight,
    /// [`BatchAccumulator::cancel_transport`] abandons a single courier's. Both
    /// are logged as failures. The consignments themselves are left untouched
    /// until the next `open`.
    ///
    /// # Returns
    /// * `Some(BatchReport)` with one receipt per dispatched courier, in registry order
    /// * `None` if no batch was open
    pub async fn close_with(&self, cancel: CancellationToken) -> Option<BatchReport> {
        let (batch_date, jobs, unrouted) = {
            let mut book = self.book.write().await;
            if book.state == BatchState::Closed {
                debug!("No open batch to close");
                return None;
            }

            let Some(batch_date) = book.batch_date else {
                error!("Open batch has no date, closing without transport");
                book.state = BatchState::Closed;
                return None;
            };

            let jobs: Vec<DispatchJob> = self
                .registry
                .iter()
                .filter_map(|(reference, courier)| {
                    let consignments = book.pending.get(reference).filter(|c| !c.is_empty())?;
                    Some(DispatchJob {
                        courier_ref: reference.to_string(),
                        batch_date,
                        courier: courier.clone(),
                        consignments: consignments.clone(),
                    })
                })
                .collect();

            let mut unrouted: Vec<String> = book
                .pending
                .iter()
                .filter(|(reference, consignments)| {
                    !consignments.is_empty() && !self.registry.contains(reference)
                })
                .map(|(reference, _)| reference.clone())
                .collect();
            unrouted.sort();

            book.state = BatchState::Closed;
            (batch_date, jobs, unrouted)
        };

        for reference in &unrouted {
            warn!(courier = %reference, "Consignments held for an unregistered courier were not transported");
        }

        info!(batch_date = %batch_date, couriers = jobs.len(), "Batch closed, transporting consignments");

        let close_id = self.closes.fetch_add(1, Ordering::Relaxed);
        let mut in_flight = self.in_flight.lock().await;
        let handles: Vec<_> = jobs
            .into_iter()
            .map(|job| {
                let dispatcher = self.dispatcher.clone();
                let token = cancel.child_token();
                in_flight.insert(job.courier_ref.clone(), (close_id, token.clone()));
                let fallback = DispatchReceipt {
                    courier_ref: job.courier_ref.clone(),
                    transport_method: job.courier.transport_method().clone(),
                    consignment_count: job.consignments.len(),
                    attempts: 0,
                    outcome: DispatchOutcome::Failed("transport task aborted".into()),
                    log_written: false,
                };
                let handle = tokio::spawn(async move { dispatcher.dispatch(job, token).await });
                (handle, fallback)
            })
            .collect();
        drop(in_flight);

        let mut receipts = Vec::with_capacity(handles.len());
        for (handle, fallback) in handles {
            let receipt = match handle.await {
                Ok(receipt) => receipt,
                Err(e) => {
                    error!(courier = %fallback.courier_ref, "Transport task failed: {}", e);
                    fallback
                }
            };
            self.finish_transport(&receipt.courier_ref, close_id).await;
            receipts.push(receipt);
        }

        let report = BatchReport { batch_date, receipts, unrouted };
        info!(
            batch_date = %batch_date,
            delivered = report.delivered_count(),
            dispatched = report.receipts.len(),
            "Batch transport finished"
        );
        Some(report)
    }

    /// Abandon the in-flight transport of one courier's consignments
    ///
    /// The transport is logged as a failure and the rest of the close carries
    /// on. Returns `false` if no close is transporting consignments for
    /// `courier_ref`.
    pub async fn cancel_transport(&self, courier_ref: &str) -> bool {
        match self.in_flight.lock().await.get(courier_ref) {
            Some((_, token)) => {
                info!(courier = courier_ref, "Cancelling transport");
                token.cancel();
                true
            }
            None => false,
        }
    }

    async fn finish_transport(&self, courier_ref: &str, close_id: u64) {
        let mut in_flight = self.in_flight.lock().await;
        // a later close may have replaced the entry
        if in_flight.get(courier_ref).is_some_and(|(id, _)| *id == close_id) {
            in_flight.remove(courier_ref);
        }
    }

    /// Add a consignment to the open batch
    ///
    /// If no batch is open the consignment is dropped without error. The
    /// courier reference is not checked against the registry.
    pub async fn add_consignment(&self, consignment: Consignment) {
        let mut book = self.book.write().await;
        if book.state == BatchState::Closed {
            debug!(
                courier = consignment.courier_ref(),
                number = consignment.consignment_number(),
                "Batch not open, consignment dropped"
            );
            return;
        }

        book.used_numbers.insert(consignment.consignment_number().to_string());
        book.pending
            .entry(consignment.courier_ref().to_string())
            .or_default()
            .push(consignment);
    }

    /// Allocate a new consignment for `courier_ref` and add it to the open batch
    ///
    /// The number comes from the courier's generator and is unique across
    /// every number used this session.
    ///
    /// # Errors
    /// * `BatchNotStarted` if no batch is open
    /// * `UnknownCourier` if `courier_ref` is not registered
    /// * `GenerationExhausted` if no unused number could be generated
    ///
    /// No consignment is recorded when an error is returned.
    pub async fn allocate_consignment(&self, courier_ref: &str) -> Result<Consignment> {
        let mut book = self.book.write().await;
        if book.state == BatchState::Closed {
            return Err(DispatchError::BatchNotStarted);
        }

        let courier = self
            .registry
            .lookup(courier_ref)
            .ok_or_else(|| DispatchError::UnknownCourier {
                courier_ref: courier_ref.to_string(),
            })?;

        let number = courier.next_unique_number(&book.used_numbers, self.config.max_number_attempts)?;
        let consignment = Consignment::new(courier_ref, number.clone());

        book.used_numbers.insert(number);
        book.pending
            .entry(courier_ref.to_string())
            .or_default()
            .push(consignment.clone());

        debug!(courier = courier_ref, number = consignment.consignment_number(), "Consignment allocated");
        Ok(consignment)
    }

    /// Consignments accumulated so far for `courier_ref`, in the order added
    ///
    /// Callable in any state. After a close the last batch's consignments are
    /// returned until the next open.
    pub async fn consignments_so_far(&self, courier_ref: &str) -> Vec<Consignment> {
        let book = self.book.read().await;
        book.pending.get(courier_ref).cloned().unwrap_or_default()
    }

    pub async fn status(&self) -> BatchStatus {
        let book = self.book.read().await;
        BatchStatus {
            state: book.state,
            batch_date: book.batch_date,
        }
    }
}
