//! Poll domain: storage, voting, resolution and listing.
//!
//! Every operation takes the database connection and, where relevant, the
//! visitor's identity as explicit arguments.

pub mod listing;
pub mod resolution;
pub mod store;
pub mod voting;

pub use listing::{list_polls, most_active, most_mature, total_votes, Listing, ListingQuery, PollSummary, SortKey};
pub use resolution::{resolve, toggle_active, user_stats, UserStats, VoteRecord, VoteStatus};
pub use store::{add_comment, create_poll, delete_poll, get_poll, poll_detail, CreatedPoll, NewPoll, OptionTally, PollDetail};
pub use voting::{cast_vote, VoteOutcome};

use sea_orm::DbErr;

pub type PollResult<T> = Result<T, PollError>;

/// Errors raised by poll operations.
///
/// Everything except `Database` is request-scoped and safe to show to the
/// visitor as-is.
#[derive(Debug)]
pub enum PollError {
    /// User input failed validation
    Validation(String),
    /// No poll with the requested id
    NotFound,
    /// The poll is not accepting votes
    PollClosed,
    /// The option does not exist or belongs to another poll
    InvalidOption,
    /// The outcome option does not exist or belongs to another poll
    InvalidOutcome,
    Database(DbErr),
}

impl PollError {
    /// True for errors caused by the poll's current state rather than by the
    /// shape of the input.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            PollError::PollClosed | PollError::InvalidOption | PollError::InvalidOutcome
        )
    }
}

impl std::fmt::Display for PollError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollError::Validation(msg) => write!(f, "{}", msg),
            PollError::NotFound => write!(f, "Poll not found."),
            PollError::PollClosed => write!(f, "This poll is closed."),
            PollError::InvalidOption => write!(f, "Invalid poll option selected."),
            PollError::InvalidOutcome => write!(f, "Invalid outcome selected."),
            PollError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for PollError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PollError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DbErr> for PollError {
    fn from(e: DbErr) -> Self {
        PollError::Database(e)
    }
}
