//! Dry-run transport channels
//!
//! The service does not ship real SMTP or FTP clients. These channels log what
//! would have been sent and report success, so a deployment can be exercised
//! end to end before real channels are plugged in.

use super::{EmailMessage, FileTransfer, FileTransferSession, MailSender, Result, TransportError};
use async_trait::async_trait;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunMailer;

#[async_trait]
impl MailSender for DryRunMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to = %message.to,
            subject = %message.subject,
            lines = message.body.lines().count(),
            "[dry-run] batch email not sent"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunFileTransfer;

#[async_trait]
impl FileTransfer for DryRunFileTransfer {
    async fn connect(&self, server: &str) -> Result<Box<dyn FileTransferSession>> {
        info!(server, "[dry-run] file transfer connection opened");
        Ok(Box::new(DryRunSession {
            server: server.to_string(),
        }))
    }
}

struct DryRunSession {
    server: String,
}

#[async_trait]
impl FileTransferSession for DryRunSession {
    async fn login(&mut self, username: &str, _password: &str) -> Result<()> {
        info!(server = %self.server, username, "[dry-run] logged in");
        Ok(())
    }

    async fn put_file(&mut self, remote_path: &str, local_path: &Path) -> Result<()> {
        // the local artifact must exist even when nothing is uploaded
        let metadata = tokio::fs::metadata(local_path).await.map_err(TransportError::Io)?;
        info!(
            server = %self.server,
            remote_path,
            bytes = metadata.len(),
            "[dry-run] batch file not uploaded"
        );
        Ok(())
    }

    async fn close(&mut self) {
        info!(server = %self.server, "[dry-run] file transfer connection closed");
    }
}
