//! End-to-end tests against a running server on localhost:3000 with its
//! database reachable via DATABASE_URL. Fixtures are inserted directly so the
//! tests do not depend on each other.
use chrono::{Duration, Utc};
use marketplace_service::account::model::User;
use marketplace_service::database::DatabaseManager;
use marketplace_service::listing::model::Listing;
use marketplace_service::query;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

const BASE_URL: &str = "http://localhost:3000";

static FIXTURE_SEQ: AtomicU64 = AtomicU64::new(0);

async fn setup() -> Arc<DatabaseManager> {
    Arc::new(DatabaseManager::new().await)
}

/// Unique suffix for usernames and emails across a test run
fn unique_tag() -> String {
    let n = FIXTURE_SEQ.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}", Utc::now().timestamp_nanos_opt().unwrap_or(0), n)
}

async fn create_test_user(
    db_manager: &DatabaseManager,
    account_type: &str,
    balance: i64,
) -> User {
    let tag = unique_tag();
    let account_type = account_type.to_string();
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, User>(
                    "INSERT INTO users (username, email, balance, account_type)
                     VALUES ($1, $2, $3, $4)
                     RETURNING *",
                )
                .bind(format!("user-{}", tag))
                .bind(format!("user-{}@test.local", tag))
                .bind(balance)
                .bind(&account_type)
                .fetch_one(&mut **tx)
                .await
            })
        })
        .await
        .unwrap()
}

async fn create_test_listing(db_manager: &DatabaseManager, poster_id: i64, price: i64) -> Listing {
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Listing>(
                    "INSERT INTO listings
                        (title, description, poster_id, starting_price, current_price, expires_at, status)
                     VALUES ($1, $2, $3, $4, $4, $5, 'ACTIVE')
                     RETURNING *",
                )
                .bind("test listing")
                .bind("listing created for an end-to-end test")
                .bind(poster_id)
                .bind(price)
                .bind(Utc::now() + Duration::hours(2))
                .fetch_one(&mut **tx)
                .await
            })
        })
        .await
        .unwrap()
}

/// Mark a listing as won by the given bidder so checkout can run
async fn set_leading_bidder(db_manager: &DatabaseManager, listing_id: i64, bidder_id: i64) {
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query("UPDATE listings SET leading_bidder = $1 WHERE id = $2")
                    .bind(bidder_id)
                    .bind(listing_id)
                    .execute(&mut **tx)
                    .await
            })
        })
        .await
        .unwrap();
}

fn shipping_json() -> Value {
    json!({
        "name": "Test Buyer",
        "street": "1 Main St",
        "city": "Springfield",
        "state": "IL",
        "zip": "62701"
    })
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_place_bid_updates_price_and_leader() {
    let db_manager = setup().await;
    let client = Client::new();

    let seller = create_test_user(&db_manager, "USER", 0).await;
    let bidder = create_test_user(&db_manager, "USER", 1_000_000).await;
    let listing = create_test_listing(&db_manager, seller.id, 10_000).await;

    let response = client
        .post(format!("{}/bid", BASE_URL))
        .header("x-user-id", bidder.id)
        .json(&json!({ "listing_id": listing.id, "bid_amount": 11_000 }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let updated = query::handlers::get_listing(&db_manager, listing.id)
        .await
        .unwrap();
    assert_eq!(updated.current_price, 11_000);
    assert_eq!(updated.leading_bidder, Some(bidder.id));
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_low_bid_rejected_with_current_price() {
    let db_manager = setup().await;
    let client = Client::new();

    let seller = create_test_user(&db_manager, "USER", 0).await;
    let bidder = create_test_user(&db_manager, "USER", 1_000_000).await;
    let listing = create_test_listing(&db_manager, seller.id, 10_000).await;

    let response = client
        .post(format!("{}/bid", BASE_URL))
        .header("x-user-id", bidder.id)
        .json(&json!({ "listing_id": listing.id, "bid_amount": 10_000 }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "BID_TOO_LOW");
    assert_eq!(body["current_price"], 10_000);

    let unchanged = query::handlers::get_listing(&db_manager, listing.id)
        .await
        .unwrap();
    assert_eq!(unchanged.current_price, 10_000);
    assert_eq!(unchanged.leading_bidder, None);
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_visitor_cannot_bid() {
    let db_manager = setup().await;
    let client = Client::new();

    let seller = create_test_user(&db_manager, "USER", 0).await;
    let visitor = create_test_user(&db_manager, "VISITOR", 1_000_000).await;
    let listing = create_test_listing(&db_manager, seller.id, 10_000).await;

    let response = client
        .post(format!("{}/bid", BASE_URL))
        .header("x-user-id", visitor.id)
        .json(&json!({ "listing_id": listing.id, "bid_amount": 11_000 }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "ACCOUNT_INELIGIBLE");
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_concurrent_bidding_settles_on_highest() {
    let db_manager = setup().await;

    let seller = create_test_user(&db_manager, "USER", 0).await;
    let listing = create_test_listing(&db_manager, seller.id, 10_000).await;

    let mut bidders = Vec::with_capacity(10);
    for _ in 0..10 {
        bidders.push(create_test_user(&db_manager, "USER", 1_000_000).await);
    }

    let mut handles = vec![];
    for (i, bidder) in bidders.iter().enumerate() {
        let client = Client::new();
        let bidder_id = bidder.id;
        let listing_id = listing.id;
        let bid_amount = 10_000 + (i as i64 + 1) * 1_000;

        handles.push(tokio::spawn(async move {
            let response = client
                .post(format!("{}/bid", BASE_URL))
                .header("x-user-id", bidder_id)
                .json(&json!({ "listing_id": listing_id, "bid_amount": bid_amount }))
                .send()
                .await
                .unwrap();
            (response.status(), bid_amount)
        }));
    }

    let mut successful_bids = 0;
    let mut highest_accepted = 0;
    for handle in handles {
        let (status, bid_amount) = handle.await.unwrap();
        if status.is_success() {
            successful_bids += 1;
            highest_accepted = highest_accepted.max(bid_amount);
        } else {
            assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
        }
    }
    info!("successful bids: {}", successful_bids);

    // The highest bid can never lose the price race
    assert!(successful_bids >= 1);
    assert_eq!(highest_accepted, 20_000);

    let updated = query::handlers::get_listing(&db_manager, listing.id)
        .await
        .unwrap();
    assert_eq!(updated.current_price, 20_000);

    let bids = query::handlers::get_listing_bids(&db_manager, listing.id)
        .await
        .unwrap();
    assert_eq!(bids.len(), successful_bids);
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_checkout_moves_money_and_completes_listing() {
    let db_manager = setup().await;
    let client = Client::new();

    let seller = create_test_user(&db_manager, "USER", 0).await;
    let buyer = create_test_user(&db_manager, "USER", 100_000).await;
    let listing = create_test_listing(&db_manager, seller.id, 12_000).await;
    set_leading_bidder(&db_manager, listing.id, buyer.id).await;

    let response = client
        .post(format!("{}/checkout", BASE_URL))
        .header("x-user-id", buyer.id)
        .json(&json!({ "listing_id": listing.id, "shipping": shipping_json() }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["quote"]["subtotal"], 12_000);
    assert_eq!(body["quote"]["service_fee"], 600);
    assert_eq!(body["quote"]["tax"], 1_065);
    assert_eq!(body["quote"]["total"], 13_665);
    assert_eq!(body["quote"]["seller_credit"], 10_800);

    let updated_buyer = query::handlers::get_user(&db_manager, buyer.id)
        .await
        .unwrap();
    let updated_seller = query::handlers::get_user(&db_manager, seller.id)
        .await
        .unwrap();
    assert_eq!(updated_buyer.balance, 100_000 - 13_665);
    assert_eq!(updated_seller.balance, 10_800);

    let updated_listing = query::handlers::get_listing(&db_manager, listing.id)
        .await
        .unwrap();
    assert_eq!(updated_listing.status, "COMPLETED");

    // A second checkout of the same listing must fail
    let response = client
        .post(format!("{}/checkout", BASE_URL))
        .header("x-user-id", buyer.id)
        .json(&json!({ "listing_id": listing.id, "shipping": shipping_json() }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "ALREADY_SETTLED");
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_vip_checkout_gets_discount() {
    let db_manager = setup().await;
    let client = Client::new();

    let seller = create_test_user(&db_manager, "USER", 0).await;
    let buyer = create_test_user(&db_manager, "VIP", 100_000).await;
    let listing = create_test_listing(&db_manager, seller.id, 12_000).await;
    set_leading_bidder(&db_manager, listing.id, buyer.id).await;

    let response = client
        .post(format!("{}/checkout", BASE_URL))
        .header("x-user-id", buyer.id)
        .json(&json!({ "listing_id": listing.id, "shipping": shipping_json() }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["quote"]["vip_discount"], 1_366);
    assert_eq!(body["quote"]["total"], 12_299);
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_third_bad_review_suspends_seller() {
    let db_manager = setup().await;
    let client = Client::new();

    let seller = create_test_user(&db_manager, "USER", 0).await;
    let buyer = create_test_user(&db_manager, "USER", 1_000_000).await;

    for i in 0..3 {
        let listing = create_test_listing(&db_manager, seller.id, 10_000).await;
        set_leading_bidder(&db_manager, listing.id, buyer.id).await;

        let response = client
            .post(format!("{}/checkout", BASE_URL))
            .header("x-user-id", buyer.id)
            .json(&json!({ "listing_id": listing.id, "shipping": shipping_json() }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        let order: Value = response.json().await.unwrap();
        let order_id = order["order"]["id"].as_i64().unwrap();

        let response = client
            .post(format!("{}/reviews", BASE_URL))
            .header("x-user-id", buyer.id)
            .json(&json!({ "order_id": order_id, "rate": 1, "comment": "bad" }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);

        let updated_seller = query::handlers::get_user(&db_manager, seller.id)
            .await
            .unwrap();
        if i < 2 {
            assert!(!updated_seller.suspended, "suspended after {} reviews", i + 1);
        } else {
            assert!(updated_seller.suspended);
            // The counter tracks paid reactivations, not suspensions
            assert_eq!(updated_seller.suspended_times, 0);
        }
    }
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_reactivation_charges_fine() {
    let db_manager = setup().await;
    let client = Client::new();

    let user = create_test_user(&db_manager, "USER", 4_000).await;
    db_manager
        .transaction(|tx| {
            let user_id = user.id;
            Box::pin(async move {
                sqlx::query(
                    "UPDATE users SET suspended = TRUE, suspended_times = 1 WHERE id = $1",
                )
                .bind(user_id)
                .execute(&mut **tx)
                .await
            })
        })
        .await
        .unwrap();

    // Fine is 5000, balance is 4000
    let response = client
        .post(format!("{}/me/reactivate", BASE_URL))
        .header("x-user-id", user.id)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "INSUFFICIENT_BALANCE");

    let response = client
        .post(format!("{}/me/reload", BASE_URL))
        .header("x-user-id", user.id)
        .json(&json!({ "amount": 2_000 }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .post(format!("{}/me/reactivate", BASE_URL))
        .header("x-user-id", user.id)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let updated = query::handlers::get_user(&db_manager, user.id).await.unwrap();
    assert!(!updated.suspended);
    assert_eq!(updated.balance, 1_000);
    assert_eq!(updated.suspended_times, 2);
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_reactivation_limit_is_terminal() {
    let db_manager = setup().await;
    let client = Client::new();

    // Three reactivations already consumed; balance is ample
    let user = create_test_user(&db_manager, "USER", 100_000).await;
    db_manager
        .transaction(|tx| {
            let user_id = user.id;
            Box::pin(async move {
                sqlx::query(
                    "UPDATE users SET suspended = TRUE, suspended_times = 3 WHERE id = $1",
                )
                .bind(user_id)
                .execute(&mut **tx)
                .await
            })
        })
        .await
        .unwrap();

    let response = client
        .post(format!("{}/me/reactivate", BASE_URL))
        .header("x-user-id", user.id)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "ACCOUNT_INELIGIBLE");

    let updated = query::handlers::get_user(&db_manager, user.id).await.unwrap();
    assert!(updated.suspended);
    assert_eq!(updated.balance, 100_000);
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_refund_reverses_settlement_and_resolves_issue() {
    let db_manager = setup().await;
    let client = Client::new();

    let seller = create_test_user(&db_manager, "USER", 0).await;
    let buyer = create_test_user(&db_manager, "USER", 100_000).await;
    let moderator = create_test_user(&db_manager, "SUPER_USER", 0).await;
    let listing = create_test_listing(&db_manager, seller.id, 12_000).await;
    set_leading_bidder(&db_manager, listing.id, buyer.id).await;

    let response = client
        .post(format!("{}/checkout", BASE_URL))
        .header("x-user-id", buyer.id)
        .json(&json!({ "listing_id": listing.id, "shipping": shipping_json() }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    let order: Value = response.json().await.unwrap();
    let order_id = order["order"]["id"].as_i64().unwrap();

    let response = client
        .post(format!("{}/issues", BASE_URL))
        .header("x-user-id", buyer.id)
        .json(&json!({ "order_id": order_id, "comments": "item never arrived" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    let issue: Value = response.json().await.unwrap();
    let issue_id = issue["id"].as_i64().unwrap();

    let response = client
        .post(format!("{}/issues/{}/refund", BASE_URL, issue_id))
        .header("x-user-id", moderator.id)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    // Buyer gets the full buyer-side total back; the seller payout is clawed
    // back with the late-reversal surcharge on top.
    let updated_buyer = query::handlers::get_user(&db_manager, buyer.id)
        .await
        .unwrap();
    let updated_seller = query::handlers::get_user(&db_manager, seller.id)
        .await
        .unwrap();
    assert_eq!(updated_buyer.balance, 100_000);
    assert_eq!(updated_seller.balance, 10_800 - (10_800 + 540));

    let updated_issue = query::handlers::get_issue(&db_manager, issue_id)
        .await
        .unwrap();
    assert_eq!(updated_issue.status, "RESOLVED");

    // A second refund of the same issue must be rejected
    let response = client
        .post(format!("{}/issues/{}/refund", BASE_URL, issue_id))
        .header("x-user-id", moderator.id)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_application_approval_promotes_visitor() {
    let db_manager = setup().await;
    let client = Client::new();

    let visitor = create_test_user(&db_manager, "VISITOR", 0).await;
    let moderator = create_test_user(&db_manager, "SUPER_USER", 0).await;

    let response = client
        .post(format!("{}/applications", BASE_URL))
        .header("x-user-id", visitor.id)
        .json(&json!({ "username": "applicant", "email": "applicant@test.local" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    let application: Value = response.json().await.unwrap();
    let application_id = application["id"].as_i64().unwrap();

    let response = client
        .post(format!("{}/applications/{}/review", BASE_URL, application_id))
        .header("x-user-id", moderator.id)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .post(format!("{}/applications/{}/resolve", BASE_URL, application_id))
        .header("x-user-id", moderator.id)
        .json(&json!({ "approve": true }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let updated = query::handlers::get_user(&db_manager, visitor.id)
        .await
        .unwrap();
    assert_eq!(updated.account_type, "USER");

    // Non-moderators cannot see the applications queue
    let response = client
        .get(format!("{}/applications", BASE_URL))
        .header("x-user-id", updated.id)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_unknown_or_missing_identity_is_unauthenticated() {
    let client = Client::new();

    let response = client
        .get(format!("{}/me", BASE_URL))
        .header("x-user-id", i64::MAX)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "UNAUTHENTICATED");

    let response = client
        .get(format!("{}/me", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn test_watchlist_toggle() {
    let db_manager = setup().await;
    let client = Client::new();

    let seller = create_test_user(&db_manager, "USER", 0).await;
    let watcher = create_test_user(&db_manager, "USER", 0).await;
    let listing = create_test_listing(&db_manager, seller.id, 10_000).await;

    let response = client
        .post(format!("{}/listings/{}/watch", BASE_URL, listing.id))
        .header("x-user-id", watcher.id)
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["watching"], true);

    let watchlist = query::handlers::get_watchlist(&db_manager, watcher.id)
        .await
        .unwrap();
    assert!(watchlist.iter().any(|l| l.id == listing.id));

    let response = client
        .post(format!("{}/listings/{}/watch", BASE_URL, listing.id))
        .header("x-user-id", watcher.id)
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["watching"], false);
}
