//! Validation status and worst-severity aggregation

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Ordered severity: `Ok < Info < Warning < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Ok,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Result of validating a block: a severity and a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Status {
    severity: Severity,
    message: String,
}

impl Status {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    pub fn ok() -> Self {
        Self::default()
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_ok(&self) -> bool {
        self.severity == Severity::Ok
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.severity)
        } else {
            write!(f, "{}: {}", self.severity, self.message)
        }
    }
}

/// Callback receiving a block's (or page's) new status.
pub type StatusListener = Rc<dyn Fn(&Status)>;

/// The most severe of `statuses`; among equals the last one wins.
pub fn most_severe<'a>(statuses: impl IntoIterator<Item = &'a Status>) -> Status {
    statuses
        .into_iter()
        .fold(None::<&Status>, |worst, status| match worst {
            Some(current) if current.severity > status.severity => Some(current),
            _ => Some(status),
        })
        .cloned()
        .unwrap_or_default()
}

/// Tracks the last status reported by each of a fixed set of sources and
/// yields the worst of them.
///
/// Ties between equal severities go to the most recently reported status.
#[derive(Debug, Default)]
pub struct StatusAggregator {
    slots: Vec<Option<(Status, u64)>>,
    sequence: u64,
}

impl StatusAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a slot for a new source; it starts out reporting nothing.
    pub fn add_source(&mut self) -> usize {
        self.slots.push(None);
        self.slots.len() - 1
    }

    /// Record `status` for `source` and return the new aggregate.
    ///
    /// # Panics
    ///
    /// If `source` was not returned by [`add_source`](Self::add_source).
    pub fn report(&mut self, source: usize, status: Status) -> Status {
        assert!(source < self.slots.len(), "unknown status source {source}");
        self.sequence += 1;
        self.slots[source] = Some((status, self.sequence));
        self.aggregate()
    }

    /// Worst last-known status across all sources; `Ok` if none reported.
    pub fn aggregate(&self) -> Status {
        self.slots
            .iter()
            .flatten()
            .max_by_key(|(status, sequence)| (status.severity, *sequence))
            .map(|(status, _)| status.clone())
            .unwrap_or_default()
    }

    /// Whether the aggregate allows committing.
    pub fn can_commit(&self) -> bool {
        !self.aggregate().is_error()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
