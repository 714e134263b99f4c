use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Broker setup step that failed while opening a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStage {
    Dial,
    OpenChannel,
}

impl fmt::Display for ConnectStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectStage::Dial => write!(f, "dial"),
            ConnectStage::OpenChannel => write!(f, "open channel"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RabbitPubError {
    #[error("{message}")]
    Configuration { message: String },

    #[error("failed to read input file '{}': {source}", .path.display())]
    InputFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to {stage}: {reason}")]
    Connection { stage: ConnectStage, reason: String },

    #[error("publish failed: {reason}")]
    Publish { reason: String },

    #[error("publish deadline of {timeout:?} exceeded")]
    DeadlineExceeded { timeout: Duration },
}

impl RabbitPubError {
    pub fn configuration(message: impl Into<String>) -> Self {
        RabbitPubError::Configuration {
            message: message.into(),
        }
    }

    pub fn connection(stage: ConnectStage, reason: impl fmt::Display) -> Self {
        RabbitPubError::Connection {
            stage,
            reason: reason.to_string(),
        }
    }

    pub fn publish(reason: impl fmt::Display) -> Self {
        RabbitPubError::Publish {
            reason: reason.to_string(),
        }
    }

    /// Fatal errors end the run; per-message errors are reported and skipped.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            RabbitPubError::Publish { .. } | RabbitPubError::DeadlineExceeded { .. }
        )
    }
}
