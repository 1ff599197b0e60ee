// region:    --- Imports
use super::queries;
use crate::account::model::User;
use crate::bidding::model::Bid;
use crate::database::DatabaseManager;
use crate::error::MarketError;
use crate::listing::model::{Listing, ListingComment};
use crate::moderation::model::{Application, Issue, IssueResponse};
use crate::settlement::model::Order;
use sqlx::Row;
use tracing::info;

// endregion: --- Imports

// region:    --- Query Handlers

pub async fn get_listing(db: &DatabaseManager, listing_id: i64) -> Result<Listing, MarketError> {
    info!("{:<12} --> get listing id: {}", "Query", listing_id);
    db.transaction(|tx| {
        Box::pin(async move {
            sqlx::query_as::<_, Listing>(queries::GET_LISTING)
                .bind(listing_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or(MarketError::NotFound("listing"))
        })
    })
    .await
}

pub async fn get_all_listings(db: &DatabaseManager) -> Result<Vec<Listing>, MarketError> {
    info!("{:<12} --> get all listings", "Query");
    db.transaction(|tx| {
        Box::pin(async move {
            sqlx::query_as::<_, Listing>(queries::GET_ALL_LISTINGS)
                .fetch_all(&mut **tx)
                .await
                .map_err(MarketError::from)
        })
    })
    .await
}

pub async fn get_highest_bid(
    db: &DatabaseManager,
    listing_id: i64,
) -> Result<Option<i64>, MarketError> {
    info!("{:<12} --> get highest bid id: {}", "Query", listing_id);
    db.transaction(|tx| {
        Box::pin(async move {
            let result = sqlx::query(queries::GET_HIGHEST_BID)
                .bind(listing_id)
                .fetch_one(&mut **tx)
                .await?;

            Ok(result.get("highest_bid"))
        })
    })
    .await
}

pub async fn get_listing_bids(
    db: &DatabaseManager,
    listing_id: i64,
) -> Result<Vec<Bid>, MarketError> {
    info!("{:<12} --> get listing bids id: {}", "Query", listing_id);
    db.transaction(|tx| {
        Box::pin(async move {
            sqlx::query_as::<_, Bid>(queries::GET_LISTING_BIDS)
                .bind(listing_id)
                .fetch_all(&mut **tx)
                .await
                .map_err(MarketError::from)
        })
    })
    .await
}

pub async fn get_listing_comments(
    db: &DatabaseManager,
    listing_id: i64,
) -> Result<Vec<ListingComment>, MarketError> {
    info!("{:<12} --> get listing comments id: {}", "Query", listing_id);
    db.transaction(|tx| {
        Box::pin(async move {
            sqlx::query_as::<_, ListingComment>(queries::GET_LISTING_COMMENTS)
                .bind(listing_id)
                .fetch_all(&mut **tx)
                .await
                .map_err(MarketError::from)
        })
    })
    .await
}

pub async fn get_user(db: &DatabaseManager, user_id: i64) -> Result<User, MarketError> {
    info!("{:<12} --> get user id: {}", "Query", user_id);
    db.transaction(|tx| {
        Box::pin(async move {
            sqlx::query_as::<_, User>(queries::GET_USER)
                .bind(user_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or(MarketError::NotFound("user"))
        })
    })
    .await
}

pub async fn get_orders_for_buyer(
    db: &DatabaseManager,
    buyer_id: i64,
) -> Result<Vec<Order>, MarketError> {
    info!("{:<12} --> get orders for buyer: {}", "Query", buyer_id);
    db.transaction(|tx| {
        Box::pin(async move {
            sqlx::query_as::<_, Order>(queries::GET_ORDERS_FOR_BUYER)
                .bind(buyer_id)
                .fetch_all(&mut **tx)
                .await
                .map_err(MarketError::from)
        })
    })
    .await
}

pub async fn get_bids_for_user(
    db: &DatabaseManager,
    user_id: i64,
) -> Result<Vec<Bid>, MarketError> {
    info!("{:<12} --> get bids for user: {}", "Query", user_id);
    db.transaction(|tx| {
        Box::pin(async move {
            sqlx::query_as::<_, Bid>(queries::GET_BIDS_FOR_USER)
                .bind(user_id)
                .fetch_all(&mut **tx)
                .await
                .map_err(MarketError::from)
        })
    })
    .await
}

pub async fn get_watchlist(
    db: &DatabaseManager,
    user_id: i64,
) -> Result<Vec<Listing>, MarketError> {
    info!("{:<12} --> get watchlist for user: {}", "Query", user_id);
    db.transaction(|tx| {
        Box::pin(async move {
            sqlx::query_as::<_, Listing>(queries::GET_WATCHLIST)
                .bind(user_id)
                .fetch_all(&mut **tx)
                .await
                .map_err(MarketError::from)
        })
    })
    .await
}

pub async fn get_issue(db: &DatabaseManager, issue_id: i64) -> Result<Issue, MarketError> {
    info!("{:<12} --> get issue id: {}", "Query", issue_id);
    db.transaction(|tx| {
        Box::pin(async move {
            sqlx::query_as::<_, Issue>(queries::GET_ISSUE)
                .bind(issue_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or(MarketError::NotFound("issue"))
        })
    })
    .await
}

pub async fn get_all_issues(db: &DatabaseManager) -> Result<Vec<Issue>, MarketError> {
    info!("{:<12} --> get all issues", "Query");
    db.transaction(|tx| {
        Box::pin(async move {
            sqlx::query_as::<_, Issue>(queries::GET_ALL_ISSUES)
                .fetch_all(&mut **tx)
                .await
                .map_err(MarketError::from)
        })
    })
    .await
}

pub async fn get_issues_for_user(
    db: &DatabaseManager,
    user_id: i64,
) -> Result<Vec<Issue>, MarketError> {
    info!("{:<12} --> get issues for user: {}", "Query", user_id);
    db.transaction(|tx| {
        Box::pin(async move {
            sqlx::query_as::<_, Issue>(queries::GET_ISSUES_FOR_USER)
                .bind(user_id)
                .fetch_all(&mut **tx)
                .await
                .map_err(MarketError::from)
        })
    })
    .await
}

pub async fn get_issue_responses(
    db: &DatabaseManager,
    issue_id: i64,
) -> Result<Vec<IssueResponse>, MarketError> {
    info!("{:<12} --> get issue responses id: {}", "Query", issue_id);
    db.transaction(|tx| {
        Box::pin(async move {
            sqlx::query_as::<_, IssueResponse>(queries::GET_ISSUE_RESPONSES)
                .bind(issue_id)
                .fetch_all(&mut **tx)
                .await
                .map_err(MarketError::from)
        })
    })
    .await
}

pub async fn get_application(
    db: &DatabaseManager,
    application_id: i64,
) -> Result<Application, MarketError> {
    info!("{:<12} --> get application id: {}", "Query", application_id);
    db.transaction(|tx| {
        Box::pin(async move {
            sqlx::query_as::<_, Application>(queries::GET_APPLICATION)
                .bind(application_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or(MarketError::NotFound("application"))
        })
    })
    .await
}

pub async fn get_all_applications(db: &DatabaseManager) -> Result<Vec<Application>, MarketError> {
    info!("{:<12} --> get all applications", "Query");
    db.transaction(|tx| {
        Box::pin(async move {
            sqlx::query_as::<_, Application>(queries::GET_ALL_APPLICATIONS)
                .fetch_all(&mut **tx)
                .await
                .map_err(MarketError::from)
        })
    })
    .await
}

// endregion: --- Query Handlers
