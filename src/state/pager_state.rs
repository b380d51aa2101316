/// Pager state definitions for nearby-search pagination
///
/// `Initial --request--> HasToken --request--> HasToken --(no token)--> Done`.
/// A request from `Initial` may also go straight to `Done` when the first page
/// carries no continuation token, and any state may fail-stop into `Done`.
use std::fmt;

/// Represents where a pager is in its continuation-token chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PagerState {
    /// No request issued yet
    Initial,

    /// The last page returned a continuation token that has not been used
    HasToken,

    /// The chain is exhausted, capped, cancelled or failed
    Done,
}

impl PagerState {
    /// Returns true once no further requests will be issued
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if issuing the next request needs a continuation token
    pub fn needs_token(&self) -> bool {
        matches!(self, Self::HasToken)
    }

    /// Checks whether `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: PagerState) -> bool {
        matches!(
            (self, next),
            (Self::Initial | Self::HasToken, Self::HasToken | Self::Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::HasToken => "has_token",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for PagerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
