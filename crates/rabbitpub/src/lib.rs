//! Publish messages to an AMQP 0-9-1 broker.
//!
//! The crate resolves a batch of message bodies from a literal body or a
//! newline-delimited file, opens one connection and one channel, and
//! publishes every message in order under a single shared deadline.

pub mod broker;
pub mod config;
pub mod error;
pub mod messages;
pub mod publisher;
pub mod telemetry;

pub use broker::{AmqpBroker, Broker, DeliveryMode, MessageChannel, OutboundMessage, PublishTarget};
pub use config::{Cli, MessageSource, PublishConfig};
pub use error::{ConnectStage, RabbitPubError};
pub use publisher::{Deadline, DeliveryFailure, PublishReport, publish_all, run};
