//! Command-line configuration.
//!
//! Flags are parsed once at startup into a [`Cli`], validated, and turned into
//! an immutable [`PublishConfig`] that is passed explicitly to the publisher.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};

use crate::broker::{DeliveryMode, PublishTarget};
use crate::error::RabbitPubError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Long flags that may also be spelled with a single dash (`-uri`).
const LONG_FLAGS: &[&str] = &[
    "uri",
    "exchange",
    "routing-key",
    "body",
    "input-file",
    "persistent",
    "timeout",
    "help",
];

/// Long flags that take a separate value argument when written without `=`.
const VALUE_FLAGS: &[&str] = &[
    "uri",
    "exchange",
    "routing-key",
    "body",
    "input-file",
    "timeout",
];

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "rabbitpub",
    version,
    about = "A command-line tool for publishing messages to a RabbitMQ server."
)]
pub struct Cli {
    /// AMQP URI amqp://<user>:<password>@<host>:<port>/[vhost]
    #[arg(long, env = "AMQP_URI", default_value = "", hide_default_value = true)]
    pub uri: String,

    /// Exchange name
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub exchange: String,

    /// Routing key. Use queue name with blank exchange to publish directly to queue.
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub routing_key: String,

    /// Message body
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub body: String,

    /// Input file path, one message per line
    #[arg(long, value_name = "PATH", default_value = "")]
    pub input_file: String,

    /// Use persistent delivery mode (default: non-persistent)
    #[arg(
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value_t = false,
        default_missing_value = "true"
    )]
    pub persistent: bool,

    /// Shared publish deadline for the whole batch, in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,
}

/// Where the message bodies for a run come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageSource {
    Body(String),
    InputFile(PathBuf),
}

/// Validated, immutable configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishConfig {
    pub uri: String,
    pub target: PublishTarget,
    pub source: MessageSource,
    pub delivery_mode: DeliveryMode,
    pub timeout: Duration,
}

impl Cli {
    /// Parse Go-style or clap-style arguments.
    pub fn parse_normalized<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Cli::parse_from(normalize_args(args))
    }

    pub fn try_parse_normalized<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Cli::try_parse_from(normalize_args(args))
    }

    pub fn validate(&self) -> Result<(), RabbitPubError> {
        if self.uri.trim().is_empty() {
            return Err(RabbitPubError::configuration("uri cannot be blank"));
        }
        if self.exchange.is_empty() && self.routing_key.is_empty() {
            return Err(RabbitPubError::configuration(
                "exchange and routing-key cannot both be blank",
            ));
        }
        if self.body.is_empty() && self.input_file.is_empty() {
            return Err(RabbitPubError::configuration(
                "body and input-file cannot both be blank",
            ));
        }
        Ok(())
    }

    pub fn into_config(self) -> Result<PublishConfig, RabbitPubError> {
        self.validate()?;

        // An input file takes precedence over a literal body.
        let source = if self.input_file.is_empty() {
            MessageSource::Body(self.body)
        } else {
            MessageSource::InputFile(PathBuf::from(self.input_file))
        };

        Ok(PublishConfig {
            uri: self.uri,
            target: PublishTarget::new(self.exchange, self.routing_key),
            source,
            delivery_mode: DeliveryMode::from_persistent(self.persistent),
            timeout: Duration::from_secs(self.timeout),
        })
    }
}

/// Rewrite single-dash long flags (`-uri x`, `-persistent=true`) into the
/// double-dash form clap expects.
///
/// Values following a value-taking flag and everything after `--` are left
/// untouched.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut out = Vec::new();
    let mut iter = args.into_iter().map(Into::into);

    if let Some(program) = iter.next() {
        out.push(program);
    }

    let mut expect_value = false;
    let mut passthrough = false;
    for arg in iter {
        if passthrough || expect_value {
            expect_value = false;
            out.push(arg);
            continue;
        }

        let Some(text) = arg.to_str() else {
            out.push(arg);
            continue;
        };

        if text == "--" {
            passthrough = true;
            out.push(arg);
            continue;
        }

        let Some(flag) = text.strip_prefix("--").or_else(|| text.strip_prefix('-')) else {
            out.push(arg);
            continue;
        };
        let (name, has_inline_value) = match flag.split_once('=') {
            Some((name, _)) => (name, true),
            None => (flag, false),
        };

        if !LONG_FLAGS.contains(&name) {
            out.push(arg);
            continue;
        }

        expect_value = !has_inline_value && VALUE_FLAGS.contains(&name);
        if text.starts_with("--") {
            out.push(arg);
        } else {
            out.push(OsString::from(format!("-{text}")));
        }
    }

    out
}
