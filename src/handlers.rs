// region:    --- Imports
use crate::account::commands::{handle_reload, ReloadCommand};
use crate::bidding::commands::{handle_place_bid, PlaceBidCommand};
use crate::context::RequestContext;
use crate::error::MarketError;
use crate::listing::commands::{
    handle_add_comment, handle_create_listing, handle_toggle_watch, AddCommentCommand,
    CreateListingCommand,
};
use crate::listing::model::derive_status;
use crate::moderation::commands::{
    handle_apply, handle_refund_issue, handle_report_issue, handle_resolve_application,
    handle_resolve_issue, handle_respond_issue, handle_take_up_application, ApplyCommand,
    ReportIssueCommand, ResolveApplicationCommand, RespondCommand,
};
use crate::query;
use crate::reputation::commands::{handle_reactivate, handle_record_review, RecordReviewCommand};
use crate::settlement::commands::{handle_checkout, CheckoutCommand};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Listing Handlers

/// Create a listing
pub async fn create_listing(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(cmd): Json<CreateListingCommand>,
) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> create listing request", "Handler");
    let listing = handle_create_listing(cmd, &ctx, &state.db, &*state.producer).await?;
    Ok((StatusCode::CREATED, Json(listing)))
}

/// All listings, with the display status derived at read time
pub async fn list_listings(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> list listings request", "Handler");
    let listings = query::handlers::get_all_listings(&state.db).await?;
    let now = Utc::now();
    let body: Vec<_> = listings
        .iter()
        .map(|l| {
            json!({
                "listing": l,
                "display_status": derive_status(l, now),
            })
        })
        .collect();
    Ok(Json(body))
}

/// One listing
pub async fn get_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<i64>,
) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> get listing request id: {}", "Handler", listing_id);
    let listing = query::handlers::get_listing(&state.db, listing_id).await?;
    let display_status = derive_status(&listing, Utc::now());
    Ok(Json(json!({
        "listing": listing,
        "display_status": display_status,
    })))
}

/// Bid history for a listing
pub async fn get_listing_bids(
    State(state): State<AppState>,
    Path(listing_id): Path<i64>,
) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> listing bids request id: {}", "Handler", listing_id);
    let bids = query::handlers::get_listing_bids(&state.db, listing_id).await?;
    Ok(Json(bids))
}

/// Highest accepted bid for a listing
pub async fn get_highest_bid(
    State(state): State<AppState>,
    Path(listing_id): Path<i64>,
) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> highest bid request id: {}", "Handler", listing_id);
    let highest = query::handlers::get_highest_bid(&state.db, listing_id).await?;
    Ok(Json(json!({ "highest_bid": highest })))
}

/// Comment thread for a listing
pub async fn get_listing_comments(
    State(state): State<AppState>,
    Path(listing_id): Path<i64>,
) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> comments request id: {}", "Handler", listing_id);
    let comments = query::handlers::get_listing_comments(&state.db, listing_id).await?;
    Ok(Json(comments))
}

/// Append a comment
pub async fn add_comment(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(listing_id): Path<i64>,
    Json(cmd): Json<AddCommentCommand>,
) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> add comment request id: {}", "Handler", listing_id);
    let comment = handle_add_comment(listing_id, cmd, &ctx, &state.db).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Toggle the caller's watchlist entry
pub async fn toggle_watch(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(listing_id): Path<i64>,
) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> toggle watch request id: {}", "Handler", listing_id);
    let watching = handle_toggle_watch(listing_id, &ctx, &state.db).await?;
    Ok(Json(json!({ "watching": watching })))
}

/// Bid advice for a listing. Advisory only; failures map to a generic error.
pub async fn bid_advice(
    _ctx: RequestContext,
    State(state): State<AppState>,
    Path(listing_id): Path<i64>,
) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> bid advice request id: {}", "Handler", listing_id);
    let listing = query::handlers::get_listing(&state.db, listing_id).await?;
    match state
        .advisor
        .advise(&listing.title, &listing.description, listing.current_price)
        .await
    {
        Ok(analysis) => Ok(Json(json!({ "analysis": analysis })).into_response()),
        Err(e) => {
            warn!("{:<12} --> advice generation failed: {}", "Handler", e);
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to generate analysis" })),
            )
                .into_response())
        }
    }
}

// endregion: --- Listing Handlers

// region:    --- Bidding & Settlement Handlers

/// Place a bid
pub async fn place_bid(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(cmd): Json<PlaceBidCommand>,
) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> bid request: {:?}", "Handler", cmd);
    let receipt = handle_place_bid(cmd, &ctx, &state.db, &*state.producer).await?;
    Ok(Json(json!({
        "message": "bid accepted",
        "listing_id": receipt.listing_id,
        "bid_amount": receipt.bid_amount,
        "current_price": receipt.current_price,
    })))
}

/// Check out a won listing
pub async fn checkout(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(cmd): Json<CheckoutCommand>,
) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> checkout request: listing={}", "Handler", cmd.listing_id);
    let receipt = handle_checkout(cmd, &ctx, &state.db, &*state.producer).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// The caller's orders
pub async fn my_orders(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> my orders request", "Handler");
    let orders = query::handlers::get_orders_for_buyer(&state.db, ctx.user.id).await?;
    Ok(Json(orders))
}

/// The caller's bid history
pub async fn my_bids(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> my bids request", "Handler");
    let bids = query::handlers::get_bids_for_user(&state.db, ctx.user.id).await?;
    Ok(Json(bids))
}

/// The caller's watchlist
pub async fn my_watchlist(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> my watchlist request", "Handler");
    let listings = query::handlers::get_watchlist(&state.db, ctx.user.id).await?;
    Ok(Json(listings))
}

// endregion: --- Bidding & Settlement Handlers

// region:    --- Account Handlers

/// The caller's profile
pub async fn me(ctx: RequestContext) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> profile request: user={}", "Handler", ctx.user.id);
    Ok(Json(ctx.user))
}

/// Balance top-up
pub async fn reload_balance(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(cmd): Json<ReloadCommand>,
) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> reload request", "Handler");
    let balance = handle_reload(cmd, &ctx, &state.db).await?;
    Ok(Json(json!({ "balance": balance })))
}

/// Pay the fine and lift a suspension
pub async fn reactivate(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> reactivate request", "Handler");
    let balance = handle_reactivate(&ctx, &state.db).await?;
    Ok(Json(json!({
        "message": "account reactivated",
        "balance": balance,
    })))
}

/// Record a review for a settled order
pub async fn record_review(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(cmd): Json<RecordReviewCommand>,
) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> review request: order={}", "Handler", cmd.order_id);
    let review = handle_record_review(cmd, &ctx, &state.db, &*state.producer).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

// endregion: --- Account Handlers

// region:    --- Moderation Handlers

/// Report a dispute
pub async fn report_issue(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(cmd): Json<ReportIssueCommand>,
) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> report issue request", "Handler");
    let issue = handle_report_issue(cmd, &ctx, &state.db).await?;
    Ok((StatusCode::CREATED, Json(issue)))
}

/// Issues: all of them for moderators, the caller's own otherwise
pub async fn list_issues(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> list issues request", "Handler");
    let issues = if ctx.is_moderator() {
        query::handlers::get_all_issues(&state.db).await?
    } else {
        query::handlers::get_issues_for_user(&state.db, ctx.user.id).await?
    };
    Ok(Json(issues))
}

/// One issue with its response thread
pub async fn get_issue(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(issue_id): Path<i64>,
) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> get issue request id: {}", "Handler", issue_id);
    let issue = query::handlers::get_issue(&state.db, issue_id).await?;
    if !ctx.is_moderator() && ctx.user.id != issue.issuer_id && ctx.user.id != issue.issuee_id {
        return Err(MarketError::Unauthorized);
    }
    let responses = query::handlers::get_issue_responses(&state.db, issue_id).await?;
    Ok(Json(json!({
        "issue": issue,
        "responses": responses,
    })))
}

/// Append a response to an issue
pub async fn respond_issue(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(issue_id): Path<i64>,
    Json(cmd): Json<RespondCommand>,
) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> respond issue request id: {}", "Handler", issue_id);
    let response = handle_respond_issue(issue_id, cmd, &ctx, &state.db).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Resolve an issue without refund
pub async fn resolve_issue(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(issue_id): Path<i64>,
) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> resolve issue request id: {}", "Handler", issue_id);
    handle_resolve_issue(issue_id, &ctx, &state.db).await?;
    Ok(Json(json!({ "message": "issue resolved" })))
}

/// Refund the disputed order and resolve the issue
pub async fn refund_issue(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(issue_id): Path<i64>,
) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> refund issue request id: {}", "Handler", issue_id);
    let receipt = handle_refund_issue(issue_id, &ctx, &state.db, &*state.producer).await?;
    Ok(Json(receipt))
}

/// Apply for full user privilege
pub async fn apply(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(cmd): Json<ApplyCommand>,
) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> apply request", "Handler");
    let application = handle_apply(cmd, &ctx, &state.db).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

/// Applications overview (moderator only)
pub async fn list_applications(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> list applications request", "Handler");
    ctx.require_moderator()?;
    let applications = query::handlers::get_all_applications(&state.db).await?;
    Ok(Json(applications))
}

/// One application (moderator only)
pub async fn get_application(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(application_id): Path<i64>,
) -> Result<impl IntoResponse, MarketError> {
    info!(
        "{:<12} --> get application request id: {}",
        "Handler", application_id
    );
    ctx.require_moderator()?;
    let application = query::handlers::get_application(&state.db, application_id).await?;
    Ok(Json(application))
}

/// Take an application into review (moderator only)
pub async fn take_up_application(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(application_id): Path<i64>,
) -> Result<impl IntoResponse, MarketError> {
    info!(
        "{:<12} --> take up application request id: {}",
        "Handler", application_id
    );
    handle_take_up_application(application_id, &ctx, &state.db).await?;
    Ok(Json(json!({ "message": "application under review" })))
}

/// Approve or decline an application (moderator only)
pub async fn resolve_application(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(application_id): Path<i64>,
    Json(cmd): Json<ResolveApplicationCommand>,
) -> Result<impl IntoResponse, MarketError> {
    info!(
        "{:<12} --> resolve application request id: {}",
        "Handler", application_id
    );
    let application = handle_resolve_application(application_id, cmd, &ctx, &state.db).await?;
    Ok(Json(application))
}

// endregion: --- Moderation Handlers
