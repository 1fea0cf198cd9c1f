pub mod reader;
pub mod record;

pub use reader::{LineSource, LineSourceError};
pub use record::{LogRecord, ParseError, RecordParser};
