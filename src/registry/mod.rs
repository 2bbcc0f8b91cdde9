//! Courier Registry Module
//!
//! This module provides the registry of couriers known to the dispatch service.
//! Couriers are looked up by a caller-chosen reference string.

mod couriers;
pub use couriers::CourierRegistry;
