//! API Module
//!
//! This module handles the JSON-RPC API used by the depot to run the day's
//! batch: opening and closing it, adding consignments and reading back what
//! has been accumulated and transported.

mod server;
pub use server::{AppState, Server, router};
