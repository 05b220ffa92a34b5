//! Single-choice voting with one live vote per visitor per poll.

use super::{PollError, PollResult};
use crate::db::VOTE_UNIQUE_INDEX;
use crate::identity::VisitorId;
use crate::orm::{poll_options, poll_votes, polls};
use chrono::Utc;
use rand::Rng;
use sea_orm::{entity::*, query::*, ConnectionTrait, DatabaseConnection, DbErr, TransactionTrait};
use std::time::Duration;

/// What a successful `cast_vote` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// First vote by this visitor on the poll
    Recorded,
    /// Existing vote moved to a different option
    Changed,
    /// Existing vote already pointed at the option
    Unchanged,
}

/// Attempts before a contended vote is reported as a database error.
const MAX_VOTE_ATTEMPTS: u32 = 8;

/// Casts or changes a visitor's vote.
///
/// A visitor holds at most one vote per poll. Voting again moves the existing
/// vote instead of adding another. Errors leave votes untouched.
///
/// The unique index on `(poll_id, user_id)` rejects a second insert when two
/// requests from the same visitor race past the lookup. The loser's
/// transaction is rolled back and replayed, and the replay finds the winner's
/// row and updates it. Lock and serialization failures are replayed the same
/// way.
pub async fn cast_vote(
    db: &DatabaseConnection,
    poll_id: i32,
    option_id: i32,
    voter: &VisitorId,
) -> PollResult<VoteOutcome> {
    let mut attempt = 1;
    loop {
        match try_cast_vote(db, poll_id, option_id, voter).await {
            Err(PollError::Database(err)) if attempt < MAX_VOTE_ATTEMPTS && is_retryable(&err) => {
                log::warn!(
                    "Vote on poll {} hit contention on attempt {} ({}); retrying",
                    poll_id,
                    attempt,
                    err
                );
                actix_web::rt::time::sleep(retry_delay(attempt)).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Errors that a replay of the whole transaction can get past.
fn is_retryable(err: &DbErr) -> bool {
    let msg = err.to_string();
    // Postgres names the violated index, SQLite names the columns.
    msg.contains(VOTE_UNIQUE_INDEX)
        || msg.contains("UNIQUE constraint failed: poll_votes")
        || msg.contains("database is locked")
        || msg.contains("database table is locked")
        || msg.contains("could not serialize access")
        || msg.contains("deadlock detected")
}

fn retry_delay(attempt: u32) -> Duration {
    let jitter = rand::thread_rng().gen_range(5..=20);
    Duration::from_millis(jitter * u64::from(attempt))
}

async fn try_cast_vote(
    db: &DatabaseConnection,
    poll_id: i32,
    option_id: i32,
    voter: &VisitorId,
) -> PollResult<VoteOutcome> {
    let txn = db.begin().await?;

    let poll = polls::Entity::find_by_id(poll_id)
        .one(&txn)
        .await?
        .ok_or(PollError::NotFound)?;

    if !poll.is_active {
        return Err(PollError::PollClosed);
    }

    // An option id from another poll is as invalid as a missing one.
    let option = poll_options::Entity::find()
        .filter(poll_options::Column::Id.eq(option_id))
        .filter(poll_options::Column::PollId.eq(poll.id))
        .one(&txn)
        .await?
        .ok_or(PollError::InvalidOption)?;

    let outcome = match find_vote(&txn, poll.id, voter).await? {
        Some(vote) if vote.option_id == option.id => VoteOutcome::Unchanged,
        Some(vote) => {
            let previous = vote.option_id;
            let mut vote: poll_votes::ActiveModel = vote.into();
            vote.option_id = Set(option.id);
            vote.update(&txn).await?;
            log::debug!(
                "Visitor {} moved vote on poll {} from option {} to {}",
                voter,
                poll.id,
                previous,
                option.id
            );
            VoteOutcome::Changed
        }
        None => {
            poll_votes::ActiveModel {
                poll_id: Set(poll.id),
                option_id: Set(option.id),
                user_id: Set(voter.as_str().to_owned()),
                created_at: Set(Utc::now().naive_utc()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            log::debug!(
                "Visitor {} voted for option {} on poll {}",
                voter,
                option.id,
                poll.id
            );
            VoteOutcome::Recorded
        }
    };

    txn.commit().await?;
    Ok(outcome)
}

/// The visitor's current vote on a poll, if any.
async fn find_vote<C>(
    db: &C,
    poll_id: i32,
    voter: &VisitorId,
) -> Result<Option<poll_votes::Model>, DbErr>
where
    C: ConnectionTrait,
{
    poll_votes::Entity::find()
        .filter(poll_votes::Column::PollId.eq(poll_id))
        .filter(poll_votes::Column::UserId.eq(voter.as_str()))
        .one(db)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contention_errors_are_retryable() {
        assert!(is_retryable(&DbErr::Exec(format!(
            "duplicate key value violates unique constraint \"{}\"",
            VOTE_UNIQUE_INDEX
        ))));
        assert!(is_retryable(&DbErr::Exec(
            "UNIQUE constraint failed: poll_votes.poll_id, poll_votes.user_id".to_owned()
        )));
        assert!(is_retryable(&DbErr::Query("database is locked".to_owned())));
        assert!(is_retryable(&DbErr::Exec(
            "could not serialize access due to concurrent update".to_owned()
        )));
    }

    #[test]
    fn test_other_errors_are_not_retried() {
        assert!(!is_retryable(&DbErr::Exec(
            "FOREIGN KEY constraint failed".to_owned()
        )));
        assert!(!is_retryable(&DbErr::Conn("connection refused".to_owned())));
        assert!(!is_retryable(&DbErr::RecordNotFound("poll".to_owned())));
    }
}
