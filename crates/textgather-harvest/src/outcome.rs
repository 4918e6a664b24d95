//! Terminal outcome for one collection member.

/// What happened to one member pid, entered exactly once per harvest
/// lineage (the listing is append-only and resume skips existing entries).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// The member's own text was fetched and appended.
    Appended { size: u64 },
    /// No extracted text found on the member or any child.
    NoText,
    /// Fetching the member's own resource was permission-denied.
    Forbidden,
    /// No own text; the first child attempted was permission-denied.
    ForbiddenViaChild { child_pid: String },
    /// No own text; a child's text was appended on the member's behalf.
    HandledViaChild { child_pid: String, size: u64 },
    /// Unexpected failure while handling the member; recorded with a null
    /// size and no status, and the run continues.
    Error,
}

impl ItemOutcome {
    /// Whether this member contributed text this run (counts toward the
    /// append cap).
    pub fn is_appended(&self) -> bool {
        matches!(self, Self::Appended { .. } | Self::HandledViaChild { .. })
    }

    pub fn appended_size(&self) -> Option<u64> {
        match self {
            Self::Appended { size } | Self::HandledViaChild { size, .. } => Some(*size),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appended_variants() {
        assert!(ItemOutcome::Appended { size: 1 }.is_appended());
        assert!(
            ItemOutcome::HandledViaChild { child_pid: "bdr:c1".into(), size: 1 }.is_appended()
        );
        assert!(!ItemOutcome::NoText.is_appended());
        assert!(!ItemOutcome::Forbidden.is_appended());
        assert!(!ItemOutcome::Error.is_appended());
    }

    #[test]
    fn appended_size_only_for_text_outcomes() {
        assert_eq!(ItemOutcome::Appended { size: 9 }.appended_size(), Some(9));
        assert_eq!(ItemOutcome::NoText.appended_size(), None);
        assert_eq!(
            ItemOutcome::ForbiddenViaChild { child_pid: "bdr:c1".into() }.appended_size(),
            None
        );
    }
}
