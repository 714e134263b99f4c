//! Broker seam: the traits the publish loop depends on, plus the
//! `lapin`-backed implementation used by the binary.

use async_trait::async_trait;
use lapin::options::BasicPublishOptions;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use tracing::{info, warn};

use crate::error::{ConnectStage, RabbitPubError};

pub const CONTENT_TYPE_TEXT_PLAIN: &str = "text/plain";

const REPLY_SUCCESS: u16 = 200;

/// AMQP delivery mode applied uniformly to every message in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DeliveryMode {
    #[default]
    NonPersistent = 1,
    Persistent = 2,
}

impl DeliveryMode {
    pub fn from_persistent(persistent: bool) -> Self {
        if persistent {
            DeliveryMode::Persistent
        } else {
            DeliveryMode::NonPersistent
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Exchange and routing key every message in a run is published to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    pub exchange: String,
    pub routing_key: String,
}

impl PublishTarget {
    pub fn new(exchange: impl Into<String>, routing_key: impl Into<String>) -> Self {
        Self {
            exchange: exchange.into(),
            routing_key: routing_key.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub content_type: &'static str,
    pub delivery_mode: DeliveryMode,
    pub body: Vec<u8>,
}

impl OutboundMessage {
    pub fn text(body: &str, delivery_mode: DeliveryMode) -> Self {
        Self {
            content_type: CONTENT_TYPE_TEXT_PLAIN,
            delivery_mode,
            body: body.as_bytes().to_vec(),
        }
    }
}

/// A channel that messages can be published on.
///
/// Publishing is fire-and-forget: implementations return once the broker
/// client has accepted the frame and never wait for a confirmation.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    async fn publish(
        &self,
        target: &PublishTarget,
        message: &OutboundMessage,
    ) -> Result<(), RabbitPubError>;

    /// Release the channel and its connection. Failures are logged, not returned.
    async fn close(&self);
}

/// Opens one channel-bearing session per run.
#[async_trait]
pub trait Broker: Send + Sync {
    type Session: MessageChannel;

    async fn open(&self, uri: &str) -> Result<Self::Session, RabbitPubError>;
}

/// Broker backed by `lapin`.
#[derive(Clone, Default)]
pub struct AmqpBroker {
    properties: ConnectionProperties,
}

impl AmqpBroker {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Broker for AmqpBroker {
    type Session = AmqpSession;

    async fn open(&self, uri: &str) -> Result<AmqpSession, RabbitPubError> {
        let connection = Connection::connect(uri, self.properties.clone())
            .await
            .map_err(|e| RabbitPubError::connection(ConnectStage::Dial, e))?;
        info!("Connected to broker");

        let channel = match connection.create_channel().await {
            Ok(channel) => channel,
            Err(e) => {
                if let Err(close_err) = connection.close(REPLY_SUCCESS, "OK").await {
                    warn!(error = %close_err, "Failed to close connection");
                }
                return Err(RabbitPubError::connection(ConnectStage::OpenChannel, e));
            }
        };
        info!(channel_id = channel.id(), "Opened channel");

        Ok(AmqpSession {
            connection,
            channel,
        })
    }
}

/// One connection and the single channel opened on it.
pub struct AmqpSession {
    connection: Connection,
    channel: Channel,
}

#[async_trait]
impl MessageChannel for AmqpSession {
    async fn publish(
        &self,
        target: &PublishTarget,
        message: &OutboundMessage,
    ) -> Result<(), RabbitPubError> {
        let options = BasicPublishOptions {
            mandatory: false,
            immediate: false,
        };
        let properties = BasicProperties::default()
            .with_content_type(message.content_type.into())
            .with_delivery_mode(message.delivery_mode.as_u8());

        // The returned confirm is dropped: no acknowledgement wait.
        self.channel
            .basic_publish(
                &target.exchange,
                &target.routing_key,
                options,
                &message.body,
                properties,
            )
            .await
            .map_err(RabbitPubError::publish)?;
        Ok(())
    }

    async fn close(&self) {
        if let Err(e) = self.channel.close(REPLY_SUCCESS, "OK").await {
            warn!(error = %e, "Failed to close channel");
        }
        if let Err(e) = self.connection.close(REPLY_SUCCESS, "OK").await {
            warn!(error = %e, "Failed to close connection");
        }
    }
}
