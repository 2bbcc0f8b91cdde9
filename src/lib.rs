//! This crate implements a daily courier dispatch batch service.
//! It includes modules for the shared data types, courier registration and
//! consignment numbering, the batch lifecycle, batch transport over email and
//! ftp, the JSON-RPC API, and configuration.

pub mod types; // Consignments, transport methods, batch status and dispatch receipts.
pub mod error; // Errors returned by the strict batch entry points.
pub mod clock; // Supplies the current date to batches and number generators.
pub mod config; // Defines and loads service configuration.
pub mod courier; // Couriers and their consignment number generators.
pub mod registry; // Lookup of couriers by reference.
pub mod batch; // The open/close batch state machine.
pub mod transport; // Transport of a closed batch and its audit log.
pub mod api; // JSON-RPC API over the batch.

// Re-export commonly used types for easier access.
pub use types::*;
pub use config::Config;
pub use error::DispatchError;
pub use registry::CourierRegistry;
pub use batch::BatchAccumulator;
