//! Mail worker: renders notification jobs into emails and sends them

mod composer;
mod worker;

pub use composer::EmailComposer;
pub use worker::MailerWorker;

use crate::client::Email;

/// Outbound mail transport
#[async_trait::async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, email: &Email) -> anyhow::Result<()>;
}
