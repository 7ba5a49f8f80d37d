/// Page state definitions for tracking one listing page through its cycle
///
/// A listing page moves `Fetching → Parsing → Deduplicating → Enriching →
/// Committed`. A fetch failure ends it in `Failed`, a page without listing
/// entries ends it in `Empty`, and listing markup that yields no parseable
/// entries ends it in `Failed` from `Parsing`.
use std::fmt;

/// Represents the current state of a listing page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    // ===== Active States =====
    /// Listing page request is in flight
    Fetching,

    /// Body received, extracting stub records
    Parsing,

    /// Filtering stubs by identity key
    Deduplicating,

    /// Detail fetches for admitted stubs are in flight
    Enriching,

    // ===== Terminal States =====
    /// Enriched records were appended to the working set
    Committed,

    /// Listing page had no entries
    Empty,

    /// Fetch failed or the markup could not be read
    Failed,
}

impl PageState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Empty | Self::Failed)
    }

    /// Returns true if moving from `self` to `next` is a legal step
    pub fn can_transition_to(&self, next: PageState) -> bool {
        matches!(
            (self, next),
            (Self::Fetching, Self::Parsing)
                | (Self::Fetching, Self::Failed)
                | (Self::Parsing, Self::Deduplicating)
                | (Self::Parsing, Self::Empty)
                | (Self::Parsing, Self::Failed)
                | (Self::Deduplicating, Self::Enriching)
                | (Self::Enriching, Self::Committed)
        )
    }

    /// Short lowercase name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::Parsing => "parsing",
            Self::Deduplicating => "deduplicating",
            Self::Enriching => "enriching",
            Self::Committed => "committed",
            Self::Empty => "empty",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible page states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Fetching,
            Self::Parsing,
            Self::Deduplicating,
            Self::Enriching,
            Self::Committed,
            Self::Empty,
            Self::Failed,
        ]
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
