//! Batch Transport Module
//!
//! This module delivers a closed batch's consignment numbers to each courier
//! using the Strategy design pattern:
//! - Email: numbers are mailed to the courier's inbox
//! - FTP: numbers are written to a scratch file and uploaded to the courier's server
//!
//! The mail and file-transfer channels themselves are injected collaborators.
//! Every outcome ends up in the injected `TransportLog`; transport errors never
//! escape the dispatcher.

mod channels;
mod dispatcher;
mod email;
mod ftp;
mod log;
mod retry;

#[cfg(test)]
pub(crate) mod testing;


pub use channels::{DryRunFileTransfer, DryRunMailer};
pub use dispatcher::{DispatchJob, TransportDispatcher};
pub use email::EmailStrategy;
pub use ftp::{FtpStrategy, artifact_name};
pub use log::{InMemoryTransportLog, LogKind, TransportLog, TransportLogEntry};
pub use retry::{RetryDecision, RetryPolicy, RetryableError, with_retry};

use crate::courier::Courier;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("missing transport credential: {0}")]
    MissingCredential(&'static str),

    #[error("mail delivery failed: {0}")]
    Mail(String),

    #[error("could not connect to {server}: {reason}")]
    Connect { server: String, reason: String },

    #[error("login rejected for user {username}")]
    Login { username: String },

    #[error("upload of {remote_path} failed: {reason}")]
    Upload { remote_path: String, reason: String },

    #[error("scratch file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport cancelled")]
    Cancelled,
}

impl RetryableError for TransportError {
    fn retry_decision(&self) -> RetryDecision {
        match self {
            TransportError::Mail(_)
            | TransportError::Connect { .. }
            | TransportError::Upload { .. }
            | TransportError::Timeout(_) => RetryDecision::Retry,
            TransportError::MissingCredential(_)
            | TransportError::Login { .. }
            | TransportError::Io(_)
            | TransportError::Cancelled => RetryDecision::NoRetry,
        }
    }
}

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// A fully composed batch email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
    pub headers: String,
}

/// Outbound mail channel
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Outbound file-transfer channel
#[async_trait]
pub trait FileTransfer: Send + Sync {
    /// Open a connection to `server`
    async fn connect(&self, server: &str) -> Result<Box<dyn FileTransferSession>>;
}

/// An open file-transfer connection
#[async_trait]
pub trait FileTransferSession: Send {
    async fn login(&mut self, username: &str, password: &str) -> Result<()>;

    /// Upload the file at `local_path` to `remote_path` on the server
    async fn put_file(&mut self, remote_path: &str, local_path: &Path) -> Result<()>;

    async fn close(&mut self);
}

/// One delivery of a batch to a courier, as chosen by transport method
#[async_trait]
pub trait TransportStrategy: Send + Sync {
    async fn deliver(&self, job: &DispatchJob) -> Result<()>;
}

fn credential<'a>(courier: &'a Courier, key: &'static str) -> Result<&'a str> {
    courier
        .credential(key)
        .ok_or(TransportError::MissingCredential(key))
}
