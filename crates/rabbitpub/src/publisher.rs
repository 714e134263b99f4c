use std::time::Duration;

use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, info};

use crate::broker::{Broker, DeliveryMode, MessageChannel, OutboundMessage, PublishTarget};
use crate::config::PublishConfig;
use crate::error::RabbitPubError;
use crate::messages::resolve_messages;

/// Stand-in for "no deadline" when the timeout overflows the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Shared cancellation token bounding every publish in a batch.
///
/// The deadline is fixed when it is created; later publishes get whatever
/// time earlier ones left over.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    timeout: Duration,
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        let now = Instant::now();
        let at = now
            .checked_add(timeout)
            .unwrap_or_else(|| now + FAR_FUTURE);
        Self { at, timeout }
    }

    pub fn expired() -> Self {
        Self::after(Duration::ZERO)
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn exceeded(&self) -> RabbitPubError {
        RabbitPubError::DeadlineExceeded {
            timeout: self.timeout,
        }
    }
}

#[derive(Debug)]
pub struct DeliveryFailure {
    pub index: usize,
    pub error: RabbitPubError,
}

/// Outcome of one publish loop.
#[derive(Debug, Default)]
pub struct PublishReport {
    pub total: usize,
    pub published: usize,
    pub failures: Vec<DeliveryFailure>,
}

impl PublishReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Publish a single message, failing once the shared deadline has passed.
pub async fn publish_one<C: MessageChannel + ?Sized>(
    channel: &C,
    target: &PublishTarget,
    message: &OutboundMessage,
    deadline: &Deadline,
) -> Result<(), RabbitPubError> {
    if deadline.is_expired() {
        return Err(deadline.exceeded());
    }
    match timeout_at(deadline.at, channel.publish(target, message)).await {
        Ok(result) => result,
        Err(_) => Err(deadline.exceeded()),
    }
}

/// Publish every message in order. Per-message failures are logged and
/// collected; the loop always runs to the end of the list.
pub async fn publish_all<C: MessageChannel + ?Sized>(
    channel: &C,
    target: &PublishTarget,
    messages: &[String],
    delivery_mode: DeliveryMode,
    deadline: &Deadline,
) -> PublishReport {
    let total = messages.len();
    let mut report = PublishReport {
        total,
        ..Default::default()
    };

    for (index, body) in messages.iter().enumerate() {
        let message = OutboundMessage::text(body, delivery_mode);
        match publish_one(channel, target, &message, deadline).await {
            Ok(()) => {
                debug!(index, bytes = message.body.len(), "Published message");
                report.published += 1;
            }
            Err(e) => {
                error!(index, total, error = %e, "Failed to publish message");
                report.failures.push(DeliveryFailure { index, error: e });
            }
        }
    }

    report
}

/// Resolve messages, open a session, publish the batch, and close the session.
///
/// Everything before the publish loop is fatal. Once the loop starts,
/// failures only show up in the returned report.
pub async fn run<B: Broker>(
    config: &PublishConfig,
    broker: &B,
) -> Result<PublishReport, RabbitPubError> {
    let messages = resolve_messages(&config.source)?;

    let session = broker.open(&config.uri).await?;

    info!("{} messages to publish", messages.len());
    let deadline = Deadline::after(config.timeout);
    let report = publish_all(
        &session,
        &config.target,
        &messages,
        config.delivery_mode,
        &deadline,
    )
    .await;

    session.close().await;

    info!(
        published = report.published,
        failed = report.failed(),
        "Publishing complete"
    );
    Ok(report)
}
