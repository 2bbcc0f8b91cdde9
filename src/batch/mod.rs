//! Dispatch Batch Module
//!
//! This module handles the daily dispatch batch:
//! - BatchAccumulator: Open/close state machine holding each courier's consignments
//!
//! Two ways of adding consignments are offered, each with its own contract:
//! - `add_consignment`: records a caller-built consignment, silently ignored while closed
//! - `allocate_consignment`: generates a unique number for a registered courier, errors while closed

mod accumulator;


pub use accumulator::BatchAccumulator;
