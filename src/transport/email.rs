use super::{DispatchJob, EmailMessage, MailSender, Result, TransportStrategy, credential};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Mails the batch's consignment numbers to the courier
///
/// Uses the courier's `to` and `from` credentials.
pub struct EmailStrategy {
    mailer: Arc<dyn MailSender>,
}

impl EmailStrategy {
    pub fn new(mailer: Arc<dyn MailSender>) -> Self {
        Self { mailer }
    }

    /// Compose the batch email without sending it
    pub fn compose(job: &DispatchJob) -> Result<EmailMessage> {
        let to = credential(&job.courier, "to")?;
        let from = credential(&job.courier, "from")?;

        Ok(EmailMessage {
            to: to.to_string(),
            from: from.to_string(),
            subject: format!("Batch {} {}", job.batch_date, job.courier.name()),
            body: job.manifest(),
            headers: format!("From: {}", from),
        })
    }
}

#[async_trait]
impl TransportStrategy for EmailStrategy {
    async fn deliver(&self, job: &DispatchJob) -> Result<()> {
        let message = Self::compose(job)?;
        debug!(courier = %job.courier_ref, to = %message.to, subject = %message.subject, "Sending batch email");
        self.mailer.send(&message).await
    }
}
