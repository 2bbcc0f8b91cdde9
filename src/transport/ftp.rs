use super::{DispatchJob, FileTransfer, Result, TransportStrategy, credential};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Uploads the batch's consignment numbers to the courier's server as a text file
///
/// Each attempt writes its own uniquely named file under the scratch directory,
/// removed once the attempt ends whatever the outcome. The remote name is
/// always [`artifact_name`].
pub struct FtpStrategy {
    file_transfer: Arc<dyn FileTransfer>,
    scratch_dir: PathBuf,
}

/// File name used on the courier's server
pub fn artifact_name(batch_date: NaiveDate) -> String {
    format!("batch-{}.txt", batch_date)
}

impl FtpStrategy {
    pub fn new(file_transfer: Arc<dyn FileTransfer>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            file_transfer,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Create a fresh local file for `job` in the scratch directory
    ///
    /// The file is deleted when the returned handle is dropped, including
    /// when the attempt is timed out or cancelled mid-way.
    fn scratch_file(&self, job: &DispatchJob) -> std::io::Result<NamedTempFile> {
        std::fs::create_dir_all(&self.scratch_dir)?;
        tempfile::Builder::new()
            .prefix(&format!("batch-{}-", job.batch_date))
            .suffix(".txt")
            .tempfile_in(&self.scratch_dir)
    }
}

#[async_trait]
impl TransportStrategy for FtpStrategy {
    async fn deliver(&self, job: &DispatchJob) -> Result<()> {
        let server = credential(&job.courier, "server")?;
        let username = credential(&job.courier, "username")?;
        let password = credential(&job.courier, "password")?;

        let remote_path = artifact_name(job.batch_date);
        let artifact = self.scratch_file(job)?;
        let local_path = artifact.path().to_path_buf();
        tokio::fs::write(&local_path, job.manifest()).await?;
        debug!(courier = %job.courier_ref, path = %local_path.display(), "Batch file written");

        let mut session = self.file_transfer.connect(server).await?;
        let uploaded = match session.login(username, password).await {
            Ok(()) => session.put_file(&remote_path, &local_path).await,
            Err(e) => Err(e),
        };
        session.close().await;

        if let Err(e) = artifact.close() {
            warn!(path = %local_path.display(), "Could not remove batch file: {}", e);
        }
        uploaded
    }
}
