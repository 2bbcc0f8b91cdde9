//! Error types for batch usage errors
//!
//! Transport failures have their own type in `transport` and never reach
//! callers of the batch API.

use thiserror::Error;

/// Errors returned by the strict batch entry points
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// A consignment was requested while no batch is open
    #[error("batch has not started")]
    BatchNotStarted,

    /// The courier reference is not present in the registry
    #[error("courier does not exist: {courier_ref}")]
    UnknownCourier { courier_ref: String },

    /// Every generated candidate collided with an already used number
    #[error("could not generate an unused consignment number for {courier} after {attempts} attempts")]
    GenerationExhausted { courier: String, attempts: usize },
}

pub type Result<T> = std::result::Result<T, DispatchError>;
