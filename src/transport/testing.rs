//! Recording collaborators for tests

use super::{EmailMessage, FileTransfer, FileTransferSession, MailSender, Result, TransportError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records every message; optionally fails the first `failures` sends
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    calls: AtomicUsize,
    failures: usize,
    delay: Option<Duration>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_first(failures: usize) -> Self {
        Self { failures, ..Self::default() }
    }

    pub fn always_failing() -> Self {
        Self::failing_first(usize::MAX)
    }

    /// Every send sleeps for `delay` before completing
    pub fn slow(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::default() }
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailSender for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if call < self.failures {
            return Err(TransportError::Mail("mailbox unavailable".into()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub server: String,
    pub username: String,
    pub password: String,
    pub remote_path: String,
    pub local_path: PathBuf,
    pub contents: String,
}

/// Records uploads, reading the local artifact at upload time
#[derive(Default)]
pub struct RecordingFileTransfer {
    uploads: Arc<Mutex<Vec<Upload>>>,
    closed: Arc<AtomicUsize>,
    reject_uploads: bool,
    login_delay: Option<Duration>,
}

impl RecordingFileTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting_uploads() -> Self {
        Self { reject_uploads: true, ..Self::default() }
    }

    /// Every login sleeps for `delay` before completing
    pub fn slow_login(delay: Duration) -> Self {
        Self { login_delay: Some(delay), ..Self::default() }
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn sessions_closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileTransfer for RecordingFileTransfer {
    async fn connect(&self, server: &str) -> Result<Box<dyn FileTransferSession>> {
        Ok(Box::new(RecordingSession {
            server: server.to_string(),
            credentials: None,
            uploads: self.uploads.clone(),
            closed: self.closed.clone(),
            reject_uploads: self.reject_uploads,
            login_delay: self.login_delay,
        }))
    }
}

struct RecordingSession {
    server: String,
    credentials: Option<(String, String)>,
    uploads: Arc<Mutex<Vec<Upload>>>,
    closed: Arc<AtomicUsize>,
    reject_uploads: bool,
    login_delay: Option<Duration>,
}

#[async_trait]
impl FileTransferSession for RecordingSession {
    async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        if let Some(delay) = self.login_delay {
            tokio::time::sleep(delay).await;
        }
        self.credentials = Some((username.to_string(), password.to_string()));
        Ok(())
    }

    async fn put_file(&mut self, remote_path: &str, local_path: &Path) -> Result<()> {
        let contents = tokio::fs::read_to_string(local_path).await?;
        if self.reject_uploads {
            return Err(TransportError::Upload {
                remote_path: remote_path.to_string(),
                reason: "550 permission denied".into(),
            });
        }
        let (username, password) = self.credentials.clone().unwrap_or_default();
        self.uploads.lock().unwrap().push(Upload {
            server: self.server.clone(),
            username,
            password,
            remote_path: remote_path.to_string(),
            local_path: local_path.to_path_buf(),
            contents,
        });
        Ok(())
    }

    async fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}
