use chrono::Utc;

use crate::queue::{JobHandler, NotificationJob};

use super::{EmailComposer, EmailSender};

/// Job handler of the mail worker: compose, then send
pub struct MailerWorker<S> {
    composer: EmailComposer,
    sender: S,
}

impl<S: EmailSender> MailerWorker<S> {
    pub fn new(composer: EmailComposer, sender: S) -> Self {
        Self { composer, sender }
    }
}

#[async_trait::async_trait]
impl<S: EmailSender> JobHandler for MailerWorker<S> {
    #[tracing::instrument(
        name = "Send notification email",
        skip(self, job),
        fields(job = job.kind(), subscription.id = %job.subscription().id)
    )]
    async fn handle(&self, job: NotificationJob) -> anyhow::Result<()> {
        let email = self.composer.compose(&job, Utc::now())?;
        self.sender.send_email(&email).await?;
        tracing::info!(subject = %email.subject, "Email sent");
        Ok(())
    }
}
