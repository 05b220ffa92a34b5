//! Vote totals, poll listings and the front page highlights.

use super::PollResult;
use crate::orm::{poll_options, poll_votes, polls};
use sea_orm::{
    entity::*, query::*, sea_query::Expr, ConnectionTrait, DatabaseConnection, DbErr,
    FromQueryResult,
};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Listing row for a poll. Vote totals are computed per request and never
/// stored on the poll itself.
#[derive(Debug, Clone)]
pub struct PollSummary {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image_filename: Option<String>,
    pub event_date: Option<chrono::NaiveDate>,
    pub is_active: bool,
    pub outcome: Option<String>,
    pub created_at: chrono::NaiveDateTime,
    pub option_count: usize,
    pub total_votes: i64,
}

impl PollSummary {
    fn new(poll: polls::Model, option_count: usize, total_votes: i64) -> Self {
        Self {
            id: poll.id,
            title: poll.title,
            description: poll.description,
            category: poll.category,
            image_filename: poll.image_filename,
            event_date: poll.event_date,
            is_active: poll.is_active,
            outcome: poll.outcome,
            created_at: poll.created_at,
            option_count,
            total_votes,
        }
    }

    pub fn status_label(&self) -> &'static str {
        match (self.is_active, self.outcome.is_some()) {
            (_, true) => "Resolved",
            (true, false) => "Open",
            (false, false) => "Closed",
        }
    }

    fn matches_text(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self
                .description
                .as_ref()
                .map_or(false, |d| d.to_lowercase().contains(needle))
    }
}

/// Listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Most recently created first
    #[default]
    Newest,
    /// Most votes first
    Active,
    /// Earliest event date first, undated polls last
    Mature,
}

impl SortKey {
    /// Unknown keys fall back to `Newest`.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("active") => SortKey::Active,
            Some("mature") => SortKey::Mature,
            _ => SortKey::Newest,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Newest => "",
            SortKey::Active => "active",
            SortKey::Mature => "mature",
        }
    }

    fn compare(&self, a: &PollSummary, b: &PollSummary) -> Ordering {
        match self {
            SortKey::Newest => Ordering::Equal,
            SortKey::Active => b.total_votes.cmp(&a.total_votes),
            SortKey::Mature => match (a.event_date, b.event_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListingQuery {
    /// Case-insensitive substring of the title or description
    pub text: Option<String>,
    /// Exact category
    pub category: Option<String>,
    pub sort: SortKey,
}

/// Front page data.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    /// Polls matching the query, in the requested order
    pub polls: Vec<PollSummary>,
    /// Poll with the most votes across all polls
    pub most_active: Option<PollSummary>,
    /// Open poll whose event comes soonest
    pub most_mature: Option<PollSummary>,
}

#[derive(Debug, FromQueryResult)]
struct OptionVoteCount {
    option_id: i32,
    vote_count: i64,
}

/// Vote counts keyed by option id. Options without votes are absent.
pub(crate) async fn count_votes_by_option<C>(
    db: &C,
    option_ids: Vec<i32>,
) -> Result<HashMap<i32, i64>, DbErr>
where
    C: ConnectionTrait,
{
    if option_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = poll_votes::Entity::find()
        .select_only()
        .column(poll_votes::Column::OptionId)
        .column_as(Expr::col(poll_votes::Column::Id).count(), "vote_count")
        .filter(poll_votes::Column::OptionId.is_in(option_ids))
        .group_by(poll_votes::Column::OptionId)
        .into_model::<OptionVoteCount>()
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.option_id, row.vote_count))
        .collect())
}

/// Number of votes across all of a poll's options.
pub async fn total_votes(db: &DatabaseConnection, poll_id: i32) -> PollResult<i64> {
    let option_ids: Vec<i32> = poll_options::Entity::find()
        .filter(poll_options::Column::PollId.eq(poll_id))
        .all(db)
        .await?
        .into_iter()
        .map(|o| o.id)
        .collect();

    Ok(count_votes_by_option(db, option_ids).await?.values().sum())
}

/// Builds the front page: highlights over every poll, then the filtered and
/// sorted listing.
pub async fn list_polls(db: &DatabaseConnection, query: &ListingQuery) -> PollResult<Listing> {
    let all_polls = polls::Entity::find()
        .order_by_desc(polls::Column::CreatedAt)
        .order_by_desc(polls::Column::Id)
        .all(db)
        .await?;

    let options = poll_options::Entity::find()
        .all(db)
        .await?;
    let counts = count_votes_by_option(db, options.iter().map(|o| o.id).collect()).await?;

    let mut option_counts: HashMap<i32, usize> = HashMap::new();
    let mut vote_totals: HashMap<i32, i64> = HashMap::new();
    for option in &options {
        *option_counts.entry(option.poll_id).or_default() += 1;
        *vote_totals.entry(option.poll_id).or_default() +=
            counts.get(&option.id).copied().unwrap_or(0);
    }

    let summaries: Vec<PollSummary> = all_polls
        .into_iter()
        .map(|poll| {
            let option_count = option_counts.get(&poll.id).copied().unwrap_or(0);
            let total = vote_totals.get(&poll.id).copied().unwrap_or(0);
            PollSummary::new(poll, option_count, total)
        })
        .collect();

    let most_active = most_active(&summaries).cloned();
    let most_mature = most_mature(&summaries).cloned();

    Ok(Listing {
        polls: filter_and_sort(summaries, query),
        most_active,
        most_mature,
    })
}

/// Applies the text and category filters, then sorts. The sort is stable so
/// ties keep creation order.
pub fn filter_and_sort(polls: Vec<PollSummary>, query: &ListingQuery) -> Vec<PollSummary> {
    let needle = query
        .text
        .as_ref()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty());
    let category = query
        .category
        .as_ref()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty());

    let mut polls: Vec<PollSummary> = polls
        .into_iter()
        .filter(|p| needle.as_ref().map_or(true, |n| p.matches_text(n)))
        .filter(|p| category.map_or(true, |c| p.category.as_deref() == Some(c)))
        .collect();

    polls.sort_by(|a, b| query.sort.compare(a, b));
    polls
}

/// Poll with the highest vote total. The first one wins ties.
pub fn most_active(polls: &[PollSummary]) -> Option<&PollSummary> {
    polls.iter().fold(None, |best: Option<&PollSummary>, poll| match best {
        Some(b) if b.total_votes >= poll.total_votes => Some(b),
        _ => Some(poll),
    })
}

/// Active poll with the earliest event date. The first one wins ties.
pub fn most_mature(polls: &[PollSummary]) -> Option<&PollSummary> {
    polls
        .iter()
        .filter(|p| p.is_active)
        .filter_map(|p| p.event_date.map(|date| (date, p)))
        .min_by_key(|(date, _)| *date)
        .map(|(_, p)| p)
}
