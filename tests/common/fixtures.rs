//! Test fixtures for creating test data
#![allow(dead_code)]

use pollcast::identity::VisitorId;
use pollcast::poll::{create_poll, CreatedPoll, NewPoll, PollResult};
use sea_orm::DatabaseConnection;

/// Create an active poll with the given options and no optional fields.
pub async fn create_test_poll(
    db: &DatabaseConnection,
    title: &str,
    options: &[&str],
) -> PollResult<CreatedPoll> {
    create_poll(
        db,
        NewPoll {
            title: title.to_owned(),
            options: options.iter().map(|o| o.to_string()).collect(),
            ..Default::default()
        },
    )
    .await
}

/// Option id by its text.
pub fn option_id(poll: &CreatedPoll, text: &str) -> i32 {
    poll.options
        .iter()
        .find(|o| o.option_text == text)
        .map(|o| o.id)
        .unwrap_or_else(|| panic!("option {} not found", text))
}

pub fn visitor(name: &str) -> VisitorId {
    VisitorId::new(name)
}
