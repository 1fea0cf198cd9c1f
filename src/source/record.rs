use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Twenty positional fields of a load balancer access log line.
const ACCESS_LOG_PATTERN: &str = concat!(
    r#"(?i)([^ ]+) ([^ ]+) ([^ ]+) ([^ ]+) ([\d\.:]+) ([\d.]+) ([\d.]+) ([\d.]+) "#,
    r#"([\d]+) ([\d]+) ([\d]+) ([^ ]+) ("[^"]+") ("[^"]+") ([^ ]+) ([^ ]+) ([^ ]+) "#,
    r#"("[^"]+") ("[^"]+") ("[^"]+")"#
);

/// Longest prefix of an unparseable line kept in a `ParseError`.
pub const MAX_ERROR_LINE_CHARS: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line does not match access log grammar ({length} bytes): {line}")]
pub struct ParseError {
    /// The offending line, truncated to `MAX_ERROR_LINE_CHARS` characters
    pub line: String,
    /// Byte length of the original line
    pub length: usize,
}

impl ParseError {
    fn new(line: &str) -> Self {
        let truncated = match line.char_indices().nth(MAX_ERROR_LINE_CHARS) {
            Some((cut, _)) => format!("{}...", &line[..cut]),
            None => line.to_string(),
        };

        Self {
            line: truncated,
            length: line.len(),
        }
    }
}

/// One parsed access log line.
///
/// Field names follow the positional projection of the grammar; the
/// serialized key names are the indexing wire contract and must not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub schema: String,
    pub timestamp: String,
    #[serde(rename = "elb")]
    pub source_identifier: String,
    #[serde(rename = "client_ip")]
    pub client_address: String,
    #[serde(rename = "http_response")]
    pub http_status_code: String,
    #[serde(rename = "url")]
    pub request_url: String,
    #[serde(rename = "agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct RecordParser {
    pattern: Regex,
}

impl Default for RecordParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordParser {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(ACCESS_LOG_PATTERN).expect("access log grammar must compile"),
        }
    }

    /// Parse a raw line into a `LogRecord`.
    ///
    /// Projects fields 1, 2, 3, 4, 9, 13 and 14 of the grammar. Lines that do
    /// not match all twenty fields produce a `ParseError`.
    pub fn parse(&self, line: &str) -> Result<LogRecord, ParseError> {
        let Some(captures) = self.pattern.captures(line) else {
            return Err(ParseError::new(line));
        };

        let field = |index: usize| -> Result<String, ParseError> {
            captures
                .get(index)
                .map(|m| m.as_str().to_string())
                .ok_or_else(|| ParseError::new(line))
        };

        Ok(LogRecord {
            schema: field(1)?,
            timestamp: field(2)?,
            source_identifier: field(3)?,
            client_address: field(4)?,
            http_status_code: field(9)?,
            request_url: field(13)?,
            user_agent: field(14)?,
        })
    }
}
