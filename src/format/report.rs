//! Outcomes of save and load: what was written, what was skipped and why.

use std::fmt;
use std::path::PathBuf;

use crate::constants::MAX_MATCH_ID;
use crate::model::{Label, MatchId, Side};

/// Severity level for format warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    /// Informational message, not a problem.
    Info,
    /// Something was skipped or looks off.
    Warning,
}

/// Warning generated while saving or loading a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatWarning {
    /// File this warning relates to (if applicable).
    pub path: Option<PathBuf>,
    pub message: String,
    pub severity: WarningSeverity,
}

impl FormatWarning {
    pub fn new(message: impl Into<String>, severity: WarningSeverity) -> Self {
        Self {
            path: None,
            message: message.into(),
            severity,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Info)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Warning)
    }

    /// Set the file this warning relates to.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Why a match table row was not loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The row could not be parsed
    Malformed(String),
    /// A label column holds the background label
    Background { side: Side },
    /// The label does not occur in the loaded volume
    UnknownLabel { side: Side, label: Label },
    /// The id is above the accepted range
    IdOutOfRange(MatchId),
    /// An earlier row already used this id
    DuplicateId(MatchId),
    /// An earlier row already used this label on `side`
    DuplicateLabel { side: Side, label: Label },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Malformed(msg) => write!(f, "malformed row: {msg}"),
            SkipReason::Background { side } => write!(f, "label{side} is background (0)"),
            SkipReason::UnknownLabel { side, label } => {
                write!(f, "label {label} does not exist in volume {side}")
            }
            SkipReason::IdOutOfRange(id) => {
                write!(f, "match id {id} is above the maximum {MAX_MATCH_ID}")
            }
            SkipReason::DuplicateId(id) => write!(f, "duplicate match id {id}"),
            SkipReason::DuplicateLabel { side, label } => {
                write!(f, "label {label} on side {side} already matched by an earlier row")
            }
        }
    }
}

/// A match table row that was skipped during load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorruptRow {
    /// 1-based line number in the table
    pub line: usize,
    /// Line text as read
    pub raw: String,
    pub reason: SkipReason,
}

impl fmt::Display for CorruptRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} ({:?})", self.line, self.reason, self.raw)
    }
}

/// Result of a load operation.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Number of matches now active.
    pub matches_loaded: usize,
    /// Rows that were skipped, in file order.
    pub skipped: Vec<CorruptRow>,
    /// Sides whose structure property table was restored.
    pub properties_restored: Vec<Side>,
    pub warnings: Vec<FormatWarning>,
}

impl LoadReport {
    pub fn add_warning(&mut self, warning: FormatWarning) {
        self.warnings.push(warning);
    }

    pub fn has_skipped(&self) -> bool {
        !self.skipped.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Result of a save operation.
#[derive(Debug, Default)]
pub struct SaveResult {
    /// Number of match rows written.
    pub matches_saved: usize,
    /// Files created or overwritten, in write order.
    pub files_created: Vec<PathBuf>,
    pub warnings: Vec<FormatWarning>,
}

impl SaveResult {
    pub fn add_warning(&mut self, warning: FormatWarning) {
        self.warnings.push(warning);
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_reason_messages() {
        let reason = SkipReason::UnknownLabel {
            side: Side::A,
            label: 99,
        };
        assert_eq!(reason.to_string(), "label 99 does not exist in volume A");

        let row = CorruptRow {
            line: 3,
            raw: "4,99,2".into(),
            reason,
        };
        assert!(row.to_string().starts_with("line 3: label 99"));
    }

    #[test]
    fn test_warning_builders() {
        let warning = FormatWarning::warning("shape changed").with_path("session.json");
        assert_eq!(warning.severity, WarningSeverity::Warning);
        assert_eq!(warning.path, Some(PathBuf::from("session.json")));
    }
}
