use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::MessageSource;
use crate::error::RabbitPubError;

/// Resolve the ordered list of message bodies for a run.
///
/// A literal body yields exactly one message. An input file is read fully
/// into memory and yields its non-blank, trimmed lines in file order.
pub fn resolve_messages(source: &MessageSource) -> Result<Vec<String>, RabbitPubError> {
    match source {
        MessageSource::Body(body) => Ok(vec![body.clone()]),
        MessageSource::InputFile(path) => read_message_file(path),
    }
}

pub fn read_message_file(path: &Path) -> Result<Vec<String>, RabbitPubError> {
    let content = fs::read_to_string(path).map_err(|source| RabbitPubError::InputFile {
        path: path.to_path_buf(),
        source,
    })?;
    let messages = split_messages(&content);
    debug!(path = %path.display(), count = messages.len(), "Read input file");
    Ok(messages)
}

pub fn split_messages(content: &str) -> Vec<String> {
    content
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
