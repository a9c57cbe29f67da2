/// URL state definitions for tracking crawl progress
///
/// Every URL record moves through these states exactly once:
/// pending → in-flight → visited | failed | skipped.
use std::fmt;

/// Represents the current state of a URL record in the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlState {
    // ===== Active States =====
    /// Discovered and waiting for a worker
    Pending,

    /// Handed to a worker; a fetch may be underway
    InFlight,

    // ===== Terminal States =====
    /// Fetched, classified and extracted successfully
    Visited,

    /// Network error, timeout, non-2xx, unparseable document or robots denial
    Failed,

    /// Deliberately not processed (image or suspicious URL)
    Skipped,
}

impl UrlState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns true if this is an active state (the record may still change)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::InFlight)
    }

    /// Checks whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: UrlState) -> bool {
        match self {
            Self::Pending => next == Self::InFlight,
            Self::InFlight => next.is_terminal(),
            _ => false,
        }
    }

    /// Short lowercase label used in logs and output records
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InFlight => "in_flight",
            Self::Visited => "visited",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for UrlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!UrlState::Pending.is_terminal());
        assert!(!UrlState::InFlight.is_terminal());

        assert!(UrlState::Visited.is_terminal());
        assert!(UrlState::Failed.is_terminal());
        assert!(UrlState::Skipped.is_terminal());
    }

    #[test]
    fn test_transitions() {
        assert!(UrlState::Pending.can_transition_to(UrlState::InFlight));
        assert!(!UrlState::Pending.can_transition_to(UrlState::Visited));

        assert!(UrlState::InFlight.can_transition_to(UrlState::Visited));
        assert!(UrlState::InFlight.can_transition_to(UrlState::Failed));
        assert!(UrlState::InFlight.can_transition_to(UrlState::Skipped));
        assert!(!UrlState::InFlight.can_transition_to(UrlState::Pending));

        assert!(!UrlState::Visited.can_transition_to(UrlState::Failed));
        assert!(!UrlState::Skipped.can_transition_to(UrlState::InFlight));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", UrlState::InFlight), "in_flight");
        assert_eq!(format!("{}", UrlState::Visited), "visited");
    }
}
