use chrono::{DateTime, Utc};
use std::fmt;

/// Name of the index all documents of this process are written to.
///
/// Computed once at startup as `<prefix>-<YYYY.MM.DD>` from the UTC date, and
/// kept for the whole process lifetime even when processing crosses midnight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexName(String);

impl IndexName {
    pub fn for_date(prefix: &str, now: DateTime<Utc>) -> Self {
        Self(format!("{}-{}", prefix, now.format("%Y.%m.%d")))
    }

    pub fn at_startup(prefix: &str) -> Self {
        Self::for_date(prefix, Utc::now())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IndexName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
