mod common;

use common::database::{setup_file_database, setup_test_database};
use common::fixtures::{create_test_poll, option_id, visitor};
use futures::future::join_all;
use pollcast::orm::poll_votes;
use pollcast::poll::{cast_vote, poll_detail, toggle_active, total_votes, PollError, VoteOutcome};
use sea_orm::{entity::*, query::*};

async fn votes_for(db: &sea_orm::DatabaseConnection, poll_id: i32, user: &str) -> Vec<poll_votes::Model> {
    poll_votes::Entity::find()
        .filter(poll_votes::Column::PollId.eq(poll_id))
        .filter(poll_votes::Column::UserId.eq(user))
        .all(db)
        .await
        .unwrap()
}

#[actix_rt::test]
async fn test_first_vote_is_recorded() {
    let db = setup_test_database().await.unwrap();
    let poll = create_test_poll(&db, "Weather", &["Rain", "Sun"]).await.unwrap();
    let rain = option_id(&poll, "Rain");

    let outcome = cast_vote(&db, poll.poll.id, rain, &visitor("u1")).await.unwrap();
    assert_eq!(outcome, VoteOutcome::Recorded);

    let votes = votes_for(&db, poll.poll.id, "u1").await;
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].option_id, rain);
}

#[actix_rt::test]
async fn test_voting_again_moves_the_vote() {
    let db = setup_test_database().await.unwrap();
    let poll = create_test_poll(&db, "Weather", &["Rain", "Sun", "Snow"]).await.unwrap();
    let user = visitor("u1");

    cast_vote(&db, poll.poll.id, option_id(&poll, "Rain"), &user).await.unwrap();
    let outcome = cast_vote(&db, poll.poll.id, option_id(&poll, "Sun"), &user)
        .await
        .unwrap();
    assert_eq!(outcome, VoteOutcome::Changed);
    cast_vote(&db, poll.poll.id, option_id(&poll, "Snow"), &user).await.unwrap();

    let votes = votes_for(&db, poll.poll.id, "u1").await;
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].option_id, option_id(&poll, "Snow"));
    assert_eq!(total_votes(&db, poll.poll.id).await.unwrap(), 1);
}

#[actix_rt::test]
async fn test_repeating_the_same_vote_is_idempotent() {
    let db = setup_test_database().await.unwrap();
    let poll = create_test_poll(&db, "Weather", &["Rain", "Sun"]).await.unwrap();
    let rain = option_id(&poll, "Rain");
    let user = visitor("u1");

    cast_vote(&db, poll.poll.id, rain, &user).await.unwrap();
    let before = votes_for(&db, poll.poll.id, "u1").await;

    let outcome = cast_vote(&db, poll.poll.id, rain, &user).await.unwrap();
    assert_eq!(outcome, VoteOutcome::Unchanged);
    assert_eq!(votes_for(&db, poll.poll.id, "u1").await, before);
}

#[actix_rt::test]
async fn test_closed_poll_rejects_votes() {
    let db = setup_test_database().await.unwrap();
    let poll = create_test_poll(&db, "Weather", &["Rain", "Sun"]).await.unwrap();
    let user = visitor("u1");

    cast_vote(&db, poll.poll.id, option_id(&poll, "Rain"), &user).await.unwrap();
    toggle_active(&db, poll.poll.id).await.unwrap();

    let result = cast_vote(&db, poll.poll.id, option_id(&poll, "Sun"), &user).await;
    assert!(matches!(result, Err(PollError::PollClosed)));

    let votes = votes_for(&db, poll.poll.id, "u1").await;
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].option_id, option_id(&poll, "Rain"));
}

#[actix_rt::test]
async fn test_option_from_another_poll_is_rejected() {
    let db = setup_test_database().await.unwrap();
    let weather = create_test_poll(&db, "Weather", &["Rain", "Sun"]).await.unwrap();
    let election = create_test_poll(&db, "Election", &["X", "Y"]).await.unwrap();

    let result = cast_vote(&db, weather.poll.id, option_id(&election, "X"), &visitor("u1")).await;
    assert!(matches!(result, Err(PollError::InvalidOption)));

    let result = cast_vote(&db, weather.poll.id, 999_999, &visitor("u1")).await;
    assert!(matches!(result, Err(PollError::InvalidOption)));

    assert!(votes_for(&db, weather.poll.id, "u1").await.is_empty());
    assert!(votes_for(&db, election.poll.id, "u1").await.is_empty());
}

#[actix_rt::test]
async fn test_unknown_poll_is_not_found() {
    let db = setup_test_database().await.unwrap();
    let result = cast_vote(&db, 424_242, 1, &visitor("u1")).await;
    assert!(matches!(result, Err(PollError::NotFound)));
}

#[actix_rt::test]
async fn test_tallies_match_votes() {
    let db = setup_test_database().await.unwrap();
    let poll = create_test_poll(&db, "Weather", &["Rain", "Sun"]).await.unwrap();
    let rain = option_id(&poll, "Rain");
    let sun = option_id(&poll, "Sun");

    cast_vote(&db, poll.poll.id, rain, &visitor("u1")).await.unwrap();
    cast_vote(&db, poll.poll.id, rain, &visitor("u2")).await.unwrap();
    cast_vote(&db, poll.poll.id, sun, &visitor("u3")).await.unwrap();
    cast_vote(&db, poll.poll.id, sun, &visitor("u4")).await.unwrap();
    cast_vote(&db, poll.poll.id, rain, &visitor("u4")).await.unwrap();

    let detail = poll_detail(&db, poll.poll.id, Some(&visitor("u3"))).await.unwrap();
    assert_eq!(detail.total_votes, 4);
    assert_eq!(total_votes(&db, poll.poll.id).await.unwrap(), 4);
    assert_eq!(
        detail.options.iter().map(|o| o.votes).sum::<i64>(),
        detail.total_votes
    );

    let rain_tally = detail.options.iter().find(|o| o.id == rain).unwrap();
    assert_eq!(rain_tally.votes, 3);
    assert!((rain_tally.percentage - 75.0).abs() < f64::EPSILON);
    assert!(!rain_tally.is_user_choice);

    assert_eq!(detail.user_choice, Some(sun));
    assert!(detail.has_voted());
}

#[actix_rt::test]
async fn test_database_rejects_duplicate_vote_rows() {
    let db = setup_test_database().await.unwrap();
    let poll = create_test_poll(&db, "Weather", &["Rain", "Sun"]).await.unwrap();

    cast_vote(&db, poll.poll.id, option_id(&poll, "Rain"), &visitor("u1")).await.unwrap();

    let duplicate = poll_votes::ActiveModel {
        poll_id: Set(poll.poll.id),
        option_id: Set(option_id(&poll, "Sun")),
        user_id: Set("u1".to_owned()),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&db)
    .await;
    assert!(duplicate.is_err());
}

#[actix_rt::test]
async fn test_concurrent_votes_from_one_visitor_leave_one_row() {
    let dir = tempfile::tempdir().unwrap();
    let db = setup_file_database(dir.path(), 8).await.unwrap();
    let poll = create_test_poll(&db, "Weather", &["Rain", "Sun"]).await.unwrap();
    let rain = option_id(&poll, "Rain");
    let sun = option_id(&poll, "Sun");

    for round in 0..5 {
        let user = visitor(&format!("racer-{}", round));
        let choices: Vec<i32> = (0..8).map(|i| if i % 2 == 0 { rain } else { sun }).collect();

        let results = join_all(
            choices
                .iter()
                .map(|&choice| cast_vote(&db, poll.poll.id, choice, &user)),
        )
        .await;

        let outcomes: Vec<VoteOutcome> = results
            .into_iter()
            .map(|r| r.unwrap_or_else(|e| panic!("round {}: {}", round, e)))
            .collect();
        assert_eq!(
            outcomes.iter().filter(|o| **o == VoteOutcome::Recorded).count(),
            1,
            "round {}: {:?}",
            round,
            outcomes
        );

        let votes = votes_for(&db, poll.poll.id, user.as_str()).await;
        assert_eq!(votes.len(), 1, "round {}", round);
        assert!(votes[0].option_id == rain || votes[0].option_id == sun);
    }
}

#[actix_rt::test]
async fn test_concurrent_votes_from_many_visitors_are_all_kept() {
    let dir = tempfile::tempdir().unwrap();
    let db = setup_file_database(dir.path(), 8).await.unwrap();
    let poll = create_test_poll(&db, "Weather", &["Rain", "Sun"]).await.unwrap();
    let rain = option_id(&poll, "Rain");

    let users: Vec<_> = (0..8).map(|i| visitor(&format!("u{}", i))).collect();
    let results = join_all(users.iter().map(|u| cast_vote(&db, poll.poll.id, rain, u))).await;
    assert!(results.iter().all(|r| matches!(r, Ok(VoteOutcome::Recorded))));

    assert_eq!(total_votes(&db, poll.poll.id).await.unwrap(), 8);
}
