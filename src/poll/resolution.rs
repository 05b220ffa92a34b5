//! Resolving polls to an outcome and scoring visitors against outcomes.

use super::{PollError, PollResult};
use crate::identity::VisitorId;
use crate::orm::{poll_options, poll_votes, polls};
use sea_orm::{entity::*, query::*, DatabaseConnection, TransactionTrait};
use std::collections::{HashMap, HashSet};

/// Closes a poll and records the outcome option's text.
///
/// Resolving again overwrites the outcome. Scores are derived from the
/// outcome at read time, so earlier votes are reclassified automatically.
pub async fn resolve(
    db: &DatabaseConnection,
    poll_id: i32,
    outcome_option_id: i32,
) -> PollResult<polls::Model> {
    let txn = db.begin().await?;

    let poll = polls::Entity::find_by_id(poll_id)
        .one(&txn)
        .await?
        .ok_or(PollError::NotFound)?;

    let option = poll_options::Entity::find()
        .filter(poll_options::Column::Id.eq(outcome_option_id))
        .filter(poll_options::Column::PollId.eq(poll.id))
        .one(&txn)
        .await?
        .ok_or(PollError::InvalidOutcome)?;

    let mut poll: polls::ActiveModel = poll.into();
    poll.outcome = Set(Some(option.option_text));
    poll.is_active = Set(false);
    let poll = poll.update(&txn).await?;

    txn.commit().await?;

    log::info!(
        "Poll {} resolved with outcome '{}'",
        poll.id,
        poll.outcome.as_deref().unwrap_or_default()
    );
    Ok(poll)
}

/// Opens a closed poll or closes an open one. The outcome is left alone.
pub async fn toggle_active(db: &DatabaseConnection, poll_id: i32) -> PollResult<polls::Model> {
    let txn = db.begin().await?;

    let poll = polls::Entity::find_by_id(poll_id)
        .one(&txn)
        .await?
        .ok_or(PollError::NotFound)?;

    let is_active = !poll.is_active;
    let mut poll: polls::ActiveModel = poll.into();
    poll.is_active = Set(is_active);
    let poll = poll.update(&txn).await?;

    txn.commit().await?;

    log::info!(
        "Poll {} {}",
        poll.id,
        if poll.is_active { "reopened" } else { "closed" }
    );
    Ok(poll)
}

/// How a single vote scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteStatus {
    Correct,
    Incorrect,
    /// The poll has no outcome yet
    Open,
}

impl VoteStatus {
    pub fn classify(outcome: Option<&str>, choice: &str) -> Self {
        match outcome {
            Some(outcome) if outcome == choice => VoteStatus::Correct,
            Some(_) => VoteStatus::Incorrect,
            None => VoteStatus::Open,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VoteStatus::Correct => "Correct",
            VoteStatus::Incorrect => "Incorrect",
            VoteStatus::Open => "Pending",
        }
    }

    pub fn is_correct(&self) -> bool {
        *self == VoteStatus::Correct
    }

    pub fn is_incorrect(&self) -> bool {
        *self == VoteStatus::Incorrect
    }
}

/// One of the visitor's votes, joined with its poll.
#[derive(Debug, Clone)]
pub struct VoteRecord {
    pub poll_id: i32,
    pub poll_title: String,
    pub choice: String,
    pub outcome: Option<String>,
    pub status: VoteStatus,
    pub voted_at: chrono::NaiveDateTime,
}

/// Per-visitor correctness aggregates.
#[derive(Debug, Clone, Default)]
pub struct UserStats {
    pub correct: u32,
    pub incorrect: u32,
    pub open: u32,
    /// Distinct polls voted in
    pub participated: u32,
    /// Percentage of resolved votes that were correct; 0 with none resolved
    pub accuracy: f64,
    /// Newest first
    pub votes: Vec<VoteRecord>,
}

impl UserStats {
    pub fn from_records(votes: Vec<VoteRecord>) -> Self {
        let mut stats = UserStats::default();
        let mut polls = HashSet::new();

        for vote in &votes {
            match vote.status {
                VoteStatus::Correct => stats.correct += 1,
                VoteStatus::Incorrect => stats.incorrect += 1,
                VoteStatus::Open => stats.open += 1,
            }
            polls.insert(vote.poll_id);
        }

        stats.participated = polls.len() as u32;
        stats.accuracy = accuracy(stats.correct, stats.incorrect);
        stats.votes = votes;
        stats
    }

    pub fn resolved(&self) -> u32 {
        self.correct + self.incorrect
    }
}

/// correct / (correct + incorrect) * 100, or 0 when nothing is resolved.
pub fn accuracy(correct: u32, incorrect: u32) -> f64 {
    let resolved = correct + incorrect;
    if resolved == 0 {
        0.0
    } else {
        correct as f64 / resolved as f64 * 100.0
    }
}

/// Scores every vote the visitor has cast.
pub async fn user_stats(db: &DatabaseConnection, voter: &VisitorId) -> PollResult<UserStats> {
    let votes = poll_votes::Entity::find()
        .filter(poll_votes::Column::UserId.eq(voter.as_str()))
        .order_by_desc(poll_votes::Column::CreatedAt)
        .order_by_desc(poll_votes::Column::Id)
        .find_also_related(poll_options::Entity)
        .all(db)
        .await?;

    if votes.is_empty() {
        return Ok(UserStats::default());
    }

    let poll_ids: Vec<i32> = votes
        .iter()
        .map(|(vote, _)| vote.poll_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let polls_by_id: HashMap<i32, polls::Model> = polls::Entity::find()
        .filter(polls::Column::Id.is_in(poll_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let records = votes
        .into_iter()
        .filter_map(|(vote, option)| {
            let option = option?;
            let poll = polls_by_id.get(&option.poll_id)?;
            Some(VoteRecord {
                poll_id: poll.id,
                poll_title: poll.title.clone(),
                status: VoteStatus::classify(poll.outcome.as_deref(), &option.option_text),
                outcome: poll.outcome.clone(),
                choice: option.option_text,
                voted_at: vote.created_at,
            })
        })
        .collect();

    Ok(UserStats::from_records(records))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(poll_id: i32, choice: &str, outcome: Option<&str>) -> VoteRecord {
        VoteRecord {
            poll_id,
            poll_title: format!("Poll {}", poll_id),
            choice: choice.to_owned(),
            outcome: outcome.map(str::to_owned),
            status: VoteStatus::classify(outcome, choice),
            voted_at: chrono::Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(VoteStatus::classify(Some("Y"), "Y"), VoteStatus::Correct);
        assert_eq!(VoteStatus::classify(Some("Y"), "X"), VoteStatus::Incorrect);
        assert_eq!(VoteStatus::classify(None, "X"), VoteStatus::Open);
    }

    #[test]
    fn test_accuracy_without_resolved_votes_is_zero() {
        assert_eq!(accuracy(0, 0), 0.0);
    }

    #[test]
    fn test_accuracy_ratio() {
        assert_eq!(accuracy(1, 0), 100.0);
        assert_eq!(accuracy(0, 1), 0.0);
        assert_eq!(accuracy(1, 3), 25.0);
    }

    #[test]
    fn test_stats_from_records() {
        let stats = UserStats::from_records(vec![
            record(1, "Y", Some("Y")),
            record(2, "X", Some("Y")),
            record(3, "A", None),
            record(4, "B", Some("B")),
        ]);

        assert_eq!(stats.correct, 2);
        assert_eq!(stats.incorrect, 1);
        assert_eq!(stats.open, 1);
        assert_eq!(stats.participated, 4);
        assert_eq!(stats.resolved(), 3);
        assert!((stats.accuracy - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_participation_counts_distinct_polls() {
        let stats = UserStats::from_records(vec![record(7, "A", None), record(7, "A", None)]);
        assert_eq!(stats.participated, 1);
        assert_eq!(stats.open, 2);
    }
}
