mod common;

use common::database::setup_test_database;
use common::fixtures::{create_test_poll, option_id, visitor};
use chrono::NaiveDate;
use pollcast::poll::{
    cast_vote, create_poll, list_polls, toggle_active, ListingQuery, NewPoll, SortKey,
};
use sea_orm::DatabaseConnection;

async fn dated_poll(
    db: &DatabaseConnection,
    title: &str,
    category: Option<&str>,
    event_date: Option<NaiveDate>,
) -> i32 {
    create_poll(
        db,
        NewPoll {
            title: title.to_owned(),
            category: category.map(str::to_owned),
            event_date,
            options: vec!["Yes".to_owned(), "No".to_owned()],
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .poll
    .id
}

fn ids(listing: &pollcast::poll::Listing) -> Vec<i32> {
    listing.polls.iter().map(|p| p.id).collect()
}

#[actix_rt::test]
async fn test_empty_listing() {
    let db = setup_test_database().await.unwrap();
    let listing = list_polls(&db, &ListingQuery::default()).await.unwrap();
    assert!(listing.polls.is_empty());
    assert!(listing.most_active.is_none());
    assert!(listing.most_mature.is_none());
}

#[actix_rt::test]
async fn test_default_order_is_newest_first() {
    let db = setup_test_database().await.unwrap();
    let first = dated_poll(&db, "First", None, None).await;
    let second = dated_poll(&db, "Second", None, None).await;

    let listing = list_polls(&db, &ListingQuery::default()).await.unwrap();
    assert_eq!(ids(&listing), vec![second, first]);

    let query = ListingQuery {
        sort: SortKey::parse(Some("sideways")),
        ..Default::default()
    };
    assert_eq!(ids(&list_polls(&db, &query).await.unwrap()), vec![second, first]);
}

#[actix_rt::test]
async fn test_most_active_and_active_sort() {
    let db = setup_test_database().await.unwrap();
    let quiet = create_test_poll(&db, "Quiet", &["A", "B"]).await.unwrap();
    let busy = create_test_poll(&db, "Busy", &["A", "B"]).await.unwrap();

    cast_vote(&db, quiet.poll.id, option_id(&quiet, "A"), &visitor("u1")).await.unwrap();
    for user in ["u1", "u2", "u3"] {
        cast_vote(&db, busy.poll.id, option_id(&busy, "B"), &visitor(user)).await.unwrap();
    }

    let query = ListingQuery {
        sort: SortKey::Active,
        ..Default::default()
    };
    let listing = list_polls(&db, &query).await.unwrap();
    assert_eq!(ids(&listing), vec![busy.poll.id, quiet.poll.id]);
    assert_eq!(listing.polls[0].total_votes, 3);
    assert_eq!(listing.polls[0].option_count, 2);

    let most_active = listing.most_active.unwrap();
    assert_eq!(most_active.id, busy.poll.id);
    assert_eq!(most_active.total_votes, 3);
}

#[actix_rt::test]
async fn test_most_mature_and_mature_sort() {
    let db = setup_test_database().await.unwrap();
    let undated = dated_poll(&db, "Undated", None, None).await;
    let later = dated_poll(&db, "Later", None, NaiveDate::from_ymd_opt(2031, 1, 1)).await;
    let sooner = dated_poll(&db, "Sooner", None, NaiveDate::from_ymd_opt(2030, 1, 1)).await;
    let closed = dated_poll(&db, "Closed", None, NaiveDate::from_ymd_opt(2029, 1, 1)).await;
    toggle_active(&db, closed).await.unwrap();

    let query = ListingQuery {
        sort: SortKey::Mature,
        ..Default::default()
    };
    let listing = list_polls(&db, &query).await.unwrap();
    assert_eq!(ids(&listing), vec![closed, sooner, later, undated]);
    assert_eq!(listing.most_mature.map(|p| p.id), Some(sooner));
}

#[actix_rt::test]
async fn test_search_and_category_filter() {
    let db = setup_test_database().await.unwrap();
    let final_match = dated_poll(&db, "Cup Final", Some("Sports"), None).await;
    let launch = dated_poll(&db, "Rocket launch", Some("Science"), None).await;
    let cup_noodles = dated_poll(&db, "CUP noodles price", Some("Markets"), None).await;

    let query = ListingQuery {
        text: Some("cup".to_owned()),
        ..Default::default()
    };
    let listing = list_polls(&db, &query).await.unwrap();
    assert_eq!(ids(&listing), vec![cup_noodles, final_match]);

    let query = ListingQuery {
        text: Some("cup".to_owned()),
        category: Some("Sports".to_owned()),
        ..Default::default()
    };
    assert_eq!(ids(&list_polls(&db, &query).await.unwrap()), vec![final_match]);

    let query = ListingQuery {
        category: Some("Science".to_owned()),
        ..Default::default()
    };
    let listing = list_polls(&db, &query).await.unwrap();
    assert_eq!(ids(&listing), vec![launch]);
    // Highlights ignore the filters.
    assert!(listing.most_active.is_some());
}
