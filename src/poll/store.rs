//! Poll creation, lookup, comments and deletion.

use super::listing::count_votes_by_option;
use super::{PollError, PollResult};
use crate::constants::{
    CATEGORIES, MAX_COMMENT_LENGTH, MAX_DESCRIPTION_LENGTH, MAX_OPTION_LENGTH, MAX_POLL_OPTIONS,
    MAX_TITLE_LENGTH, MIN_POLL_OPTIONS,
};
use crate::identity::VisitorId;
use crate::orm::{poll_comments, poll_options, poll_votes, polls};
use chrono::{NaiveDate, Utc};
use sea_orm::{entity::*, query::*, DatabaseConnection, TransactionTrait};
use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors};

/// Poll as submitted by the creation form, before normalization.
#[derive(Debug, Clone, Default)]
pub struct NewPoll {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image_filename: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub options: Vec<String>,
}

/// Normalized poll data ready for insertion.
#[derive(Debug, Clone, Validate)]
struct ValidatedPoll {
    #[validate(custom = "validate_title")]
    title: String,
    #[validate(custom = "validate_description")]
    description: Option<String>,
    category: Option<String>,
    image_filename: Option<String>,
    event_date: Option<NaiveDate>,
    options: Vec<String>,
}

impl NewPoll {
    /// Runs the same checks `create_poll` performs without touching storage.
    pub fn check(&self) -> PollResult<()> {
        self.clone().normalize().map(|_| ())
    }

    fn normalize(self) -> PollResult<ValidatedPoll> {
        let title = self.title.trim().to_owned();
        if title.is_empty() {
            return Err(PollError::Validation("Polls must have a title.".to_owned()));
        }

        let description = non_empty(self.description);
        let category = non_empty(self.category);
        if let Some(ref category) = category {
            if !CATEGORIES.contains(&category.as_str()) {
                return Err(PollError::Validation(format!(
                    "Unknown category '{}'.",
                    category
                )));
            }
        }

        // Blank options are dropped before counting.
        let options: Vec<String> = self
            .options
            .iter()
            .map(|o| o.trim().to_owned())
            .filter(|o| !o.is_empty())
            .collect();

        if options.len() < MIN_POLL_OPTIONS {
            return Err(PollError::Validation(format!(
                "Poll must have at least {} options.",
                MIN_POLL_OPTIONS
            )));
        }

        if options.len() > MAX_POLL_OPTIONS {
            return Err(PollError::Validation(format!(
                "Poll cannot have more than {} options.",
                MAX_POLL_OPTIONS
            )));
        }

        if options.iter().any(|o| o.chars().count() > MAX_OPTION_LENGTH) {
            return Err(PollError::Validation(format!(
                "Each poll option must be {} characters or less.",
                MAX_OPTION_LENGTH
            )));
        }

        let validated = ValidatedPoll {
            title,
            description,
            category,
            image_filename: self.image_filename,
            event_date: self.event_date,
            options,
        };
        validated
            .validate()
            .map_err(|errors| PollError::Validation(first_message(&errors)))?;

        Ok(validated)
    }
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    max_chars(title, MAX_TITLE_LENGTH, "Title")
}

fn validate_description(description: &str) -> Result<(), ValidationError> {
    max_chars(description, MAX_DESCRIPTION_LENGTH, "Description")
}

fn max_chars(value: &str, max: usize, label: &str) -> Result<(), ValidationError> {
    if value.chars().count() <= max {
        return Ok(());
    }
    let mut err = ValidationError::new("length");
    err.message = Some(Cow::from(format!(
        "{} must be {} characters or less.",
        label, max
    )));
    Err(err)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

/// Picks a stable, human readable message out of a validator report.
fn first_message(errors: &ValidationErrors) -> String {
    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.keys().copied().collect();
    fields.sort_unstable();

    fields
        .first()
        .and_then(|field| field_errors.get(field))
        .and_then(|errs| errs.first())
        .and_then(|err| err.message.as_ref())
        .map(|msg| msg.to_string())
        .unwrap_or_else(|| "Invalid poll.".to_owned())
}

/// A freshly persisted poll and its options, in display order.
#[derive(Debug, Clone)]
pub struct CreatedPoll {
    pub poll: polls::Model,
    pub options: Vec<poll_options::Model>,
}

/// Creates an active poll with its options.
///
/// Nothing is written unless the input validates.
pub async fn create_poll(db: &DatabaseConnection, new_poll: NewPoll) -> PollResult<CreatedPoll> {
    let validated = new_poll.normalize()?;
    let now = Utc::now().naive_utc();

    let txn = db.begin().await?;

    let poll = polls::ActiveModel {
        title: Set(validated.title),
        description: Set(validated.description),
        category: Set(validated.category),
        image_filename: Set(validated.image_filename),
        event_date: Set(validated.event_date),
        is_active: Set(true),
        outcome: Set(None),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut options = Vec::with_capacity(validated.options.len());
    for (i, option_text) in validated.options.into_iter().enumerate() {
        let option = poll_options::ActiveModel {
            poll_id: Set(poll.id),
            option_text: Set(option_text),
            display_order: Set(i as i32),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        options.push(option);
    }

    txn.commit().await?;

    log::info!(
        "Created poll {} '{}' with {} options",
        poll.id,
        poll.title,
        options.len()
    );

    Ok(CreatedPoll { poll, options })
}

pub async fn get_poll(db: &DatabaseConnection, poll_id: i32) -> PollResult<polls::Model> {
    polls::Entity::find_by_id(poll_id)
        .one(db)
        .await?
        .ok_or(PollError::NotFound)
}

/// Option with its current tally for display.
#[derive(Debug, Clone)]
pub struct OptionTally {
    pub id: i32,
    pub text: String,
    pub votes: i64,
    pub percentage: f64,
    /// This option's text is the poll's outcome
    pub is_outcome: bool,
    /// The requesting visitor's current vote points here
    pub is_user_choice: bool,
}

/// Everything the poll page shows.
#[derive(Debug, Clone)]
pub struct PollDetail {
    pub poll: polls::Model,
    pub options: Vec<OptionTally>,
    pub total_votes: i64,
    /// Option id of the visitor's current vote
    pub user_choice: Option<i32>,
    /// Newest first
    pub comments: Vec<poll_comments::Model>,
}

impl PollDetail {
    pub fn has_voted(&self) -> bool {
        self.user_choice.is_some()
    }
}

pub async fn poll_detail(
    db: &DatabaseConnection,
    poll_id: i32,
    visitor: Option<&VisitorId>,
) -> PollResult<PollDetail> {
    let poll = get_poll(db, poll_id).await?;

    let options = poll_options::Entity::find()
        .filter(poll_options::Column::PollId.eq(poll.id))
        .order_by_asc(poll_options::Column::DisplayOrder)
        .order_by_asc(poll_options::Column::Id)
        .all(db)
        .await?;

    let counts = count_votes_by_option(db, options.iter().map(|o| o.id).collect()).await?;
    let total_votes: i64 = options
        .iter()
        .map(|o| counts.get(&o.id).copied().unwrap_or(0))
        .sum();

    let user_choice = match visitor {
        Some(visitor) => poll_votes::Entity::find()
            .filter(poll_votes::Column::PollId.eq(poll.id))
            .filter(poll_votes::Column::UserId.eq(visitor.as_str()))
            .one(db)
            .await?
            .map(|v| v.option_id),
        None => None,
    };

    let options = options
        .into_iter()
        .map(|opt| {
            let votes = counts.get(&opt.id).copied().unwrap_or(0);
            let percentage = if total_votes > 0 {
                (votes as f64 / total_votes as f64) * 100.0
            } else {
                0.0
            };
            OptionTally {
                id: opt.id,
                is_outcome: poll.outcome.as_deref() == Some(opt.option_text.as_str()),
                is_user_choice: user_choice == Some(opt.id),
                text: opt.option_text,
                votes,
                percentage,
            }
        })
        .collect();

    let comments = poll_comments::Entity::find()
        .filter(poll_comments::Column::PollId.eq(poll.id))
        .order_by_desc(poll_comments::Column::CreatedAt)
        .order_by_desc(poll_comments::Column::Id)
        .all(db)
        .await?;

    Ok(PollDetail {
        poll,
        options,
        total_votes,
        user_choice,
        comments,
    })
}

/// Appends a comment to a poll. Closed and resolved polls still accept
/// discussion.
pub async fn add_comment(
    db: &DatabaseConnection,
    poll_id: i32,
    content: &str,
    visitor: Option<&VisitorId>,
) -> PollResult<poll_comments::Model> {
    let poll = get_poll(db, poll_id).await?;

    let content = content.trim();
    if content.is_empty() {
        return Err(PollError::Validation("Comments cannot be empty.".to_owned()));
    }
    if content.chars().count() > MAX_COMMENT_LENGTH {
        return Err(PollError::Validation(format!(
            "Comments must be {} characters or less.",
            MAX_COMMENT_LENGTH
        )));
    }

    let comment = poll_comments::ActiveModel {
        poll_id: Set(poll.id),
        content: Set(content.to_owned()),
        user_id: Set(visitor.map(|v| v.as_str().to_owned())),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    log::debug!("Comment {} added to poll {}", comment.id, poll.id);
    Ok(comment)
}

/// Deletes a poll together with its options, votes and comments.
pub async fn delete_poll(db: &DatabaseConnection, poll_id: i32) -> PollResult<()> {
    let txn = db.begin().await?;

    let poll = polls::Entity::find_by_id(poll_id)
        .one(&txn)
        .await?
        .ok_or(PollError::NotFound)?;

    // Children first so the foreign keys hold at every step.
    poll_votes::Entity::delete_many()
        .filter(poll_votes::Column::PollId.eq(poll.id))
        .exec(&txn)
        .await?;
    poll_options::Entity::delete_many()
        .filter(poll_options::Column::PollId.eq(poll.id))
        .exec(&txn)
        .await?;
    poll_comments::Entity::delete_many()
        .filter(poll_comments::Column::PollId.eq(poll.id))
        .exec(&txn)
        .await?;
    polls::Entity::delete_many()
        .filter(polls::Column::Id.eq(poll.id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    log::info!("Deleted poll {} '{}'", poll.id, poll.title);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_poll(title: &str, options: &[&str]) -> NewPoll {
        NewPoll {
            title: title.to_owned(),
            options: options.iter().map(|o| o.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_blank_options_are_dropped() {
        let validated = new_poll("Weather", &["A", "", "  ", "B"]).normalize().unwrap();
        assert_eq!(validated.options, vec!["A".to_owned(), "B".to_owned()]);
    }

    #[test]
    fn test_options_are_trimmed() {
        let validated = new_poll("Weather", &["  Rain ", "Sun\t"]).normalize().unwrap();
        assert_eq!(validated.options, vec!["Rain".to_owned(), "Sun".to_owned()]);
    }

    #[test]
    fn test_single_option_rejected() {
        let result = new_poll("Weather", &["Rain", "   "]).check();
        assert!(matches!(result, Err(PollError::Validation(_))));
    }

    #[test]
    fn test_blank_title_rejected() {
        let result = new_poll("   ", &["Rain", "Sun"]).check();
        match result {
            Err(PollError::Validation(msg)) => assert_eq!(msg, "Polls must have a title."),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_long_title_rejected() {
        let title = "x".repeat(MAX_TITLE_LENGTH + 1);
        let result = new_poll(&title, &["Rain", "Sun"]).check();
        match result {
            Err(PollError::Validation(msg)) => {
                assert_eq!(msg, "Title must be 255 characters or less.")
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_long_description_rejected() {
        let mut poll = new_poll("Weather", &["Rain", "Sun"]);
        poll.description = Some("d".repeat(MAX_DESCRIPTION_LENGTH + 1));
        match poll.check() {
            Err(PollError::Validation(msg)) => {
                assert_eq!(msg, "Description must be 2000 characters or less.")
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_lengths_at_limit_accepted() {
        let mut poll = new_poll(&"é".repeat(MAX_TITLE_LENGTH), &["Rain", "Sun"]);
        poll.description = Some("d".repeat(MAX_DESCRIPTION_LENGTH));
        assert!(poll.check().is_ok());
    }

    #[test]
    fn test_empty_category_is_absent() {
        let mut poll = new_poll("Weather", &["Rain", "Sun"]);
        poll.category = Some("  ".to_owned());
        poll.description = Some(String::new());
        let validated = poll.normalize().unwrap();
        assert_eq!(validated.category, None);
        assert_eq!(validated.description, None);
    }

    #[test]
    fn test_unknown_category_rejected() {
        let mut poll = new_poll("Weather", &["Rain", "Sun"]);
        poll.category = Some("Astrology".to_owned());
        assert!(matches!(poll.check(), Err(PollError::Validation(_))));
    }

    #[test]
    fn test_too_many_options_rejected() {
        let options: Vec<String> = (0..=MAX_POLL_OPTIONS).map(|i| format!("Option {}", i)).collect();
        let poll = NewPoll {
            title: "Crowded".to_owned(),
            options,
            ..Default::default()
        };
        assert!(matches!(poll.check(), Err(PollError::Validation(_))));
    }
}
