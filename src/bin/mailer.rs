use std::sync::Arc;

use anyhow::Context;

use tokio::sync::watch;
use tokio::task::JoinSet;

use weather_notify::client::EmailClient;
use weather_notify::mailer::{EmailComposer, MailerWorker};
use weather_notify::queue::{MessageBroker, NotificationConsumer, RedisStreamBroker};
use weather_notify::settings::Settings;
use weather_notify::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init("info")?;

    let settings = Settings::load()?;

    let email_client = EmailClient::new(
        settings.email.sender()?,
        settings.email.api_timeout(),
        settings.email.api_base_url()?,
        settings.email.api_auth_token(),
    )?;
    let worker = Arc::new(MailerWorker::new(
        EmailComposer::new(settings.app.base_url()?)?,
        email_client,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut consumers = JoinSet::new();

    for queue in settings.queue.queues().all() {
        // Blocking reads hold a connection, so every loop gets its own
        let broker = Arc::new(
            RedisStreamBroker::new(settings.redis.connect().await?, settings.queue.group())
                .with_batch_size(settings.queue.batch_size())
                .with_block(settings.queue.block()),
        );
        broker.declare_queue(queue).await?;

        let consumer = NotificationConsumer::new(broker, settings.queue.consumer());
        let queue = queue.to_string();
        let worker = worker.clone();
        let shutdown = shutdown_rx.clone();
        consumers.spawn(async move { consumer.consume(&queue, worker.as_ref(), shutdown).await });
    }

    let outcome = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
            signal.context("Failed to listen for the shutdown signal")
        }
        Some(finished) = consumers.join_next() => match finished {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e).context("Notification consumer failed"),
            Err(e) => Err(e).context("Notification consumer panicked"),
        },
    };

    // In-flight jobs finish before the consumers return
    let _ = shutdown_tx.send(true);
    while let Some(finished) = consumers.join_next().await {
        match finished {
            Ok(Err(error)) => tracing::error!(%error, "Notification consumer failed"),
            Err(error) => tracing::error!(%error, "Notification consumer panicked"),
            Ok(Ok(())) => {}
        }
    }
    tracing::info!("Mailer stopped");

    outcome
}
