// region:    --- Imports
use crate::account::model::account_type;
use crate::context::RequestContext;
use crate::database::DatabaseManager;
use crate::error::MarketError;
use crate::events::{publish_or_log, EventPublisher, MarketEvent};
use crate::listing::model::{Listing, ListingComment};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

// endregion: --- Imports

// region:    --- Commands

/// Listing creation
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateListingCommand {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub pictures: Vec<String>,
    pub starting_price: i64,
    pub expires_at: DateTime<Utc>,
}

/// Comment on a listing
#[derive(Debug, Serialize, Deserialize)]
pub struct AddCommentCommand {
    pub body: String,
}

pub fn validate_new_listing(
    cmd: &CreateListingCommand,
    ctx: &RequestContext,
    now: DateTime<Utc>,
) -> Result<(), MarketError> {
    match ctx.user.account_type.as_str() {
        account_type::USER | account_type::VIP => {}
        _ => {
            return Err(MarketError::AccountIneligible(
                "only full members can create listings",
            ))
        }
    }
    if ctx.user.suspended {
        return Err(MarketError::AccountIneligible("account is suspended"));
    }
    if cmd.title.trim().is_empty() {
        return Err(MarketError::Validation("title must not be empty".into()));
    }
    if cmd.starting_price <= 0 {
        return Err(MarketError::Validation(
            "starting price must be positive".into(),
        ));
    }
    if cmd.expires_at <= now {
        return Err(MarketError::Validation(
            "expiry must be in the future".into(),
        ));
    }
    Ok(())
}

/// Create a listing with current price = starting price, status ACTIVE.
pub async fn handle_create_listing(
    cmd: CreateListingCommand,
    ctx: &RequestContext,
    db: &DatabaseManager,
    publisher: &impl EventPublisher,
) -> Result<Listing, MarketError> {
    info!(
        "{:<12} --> create listing: poster={} title={:?}",
        "Command", ctx.user.id, cmd.title
    );

    let now = Utc::now();
    validate_new_listing(&cmd, ctx, now)?;

    let poster_id = ctx.user.id;
    let listing = db
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Listing>(
                    "INSERT INTO listings
                        (title, description, pictures, poster_id, starting_price, current_price, expires_at, status)
                     VALUES ($1, $2, $3, $4, $5, $5, $6, 'ACTIVE')
                     RETURNING *",
                )
                .bind(&cmd.title)
                .bind(&cmd.description)
                .bind(&cmd.pictures)
                .bind(poster_id)
                .bind(cmd.starting_price)
                .bind(cmd.expires_at)
                .fetch_one(&mut **tx)
                .await
                .map_err(MarketError::from)
            })
        })
        .await?;

    publish_or_log(
        publisher,
        MarketEvent::ListingCreated {
            listing_id: listing.id,
            poster_id: listing.poster_id,
            starting_price: listing.starting_price,
            expires_at: listing.expires_at,
        },
    )
    .await;

    Ok(listing)
}

/// Append a comment to a listing. Comments are append-only.
pub async fn handle_add_comment(
    listing_id: i64,
    cmd: AddCommentCommand,
    ctx: &RequestContext,
    db: &DatabaseManager,
) -> Result<ListingComment, MarketError> {
    info!(
        "{:<12} --> add comment: listing={} author={}",
        "Command", listing_id, ctx.user.id
    );

    if ctx.user.suspended {
        return Err(MarketError::AccountIneligible("account is suspended"));
    }
    if cmd.body.trim().is_empty() {
        return Err(MarketError::Validation("comment must not be empty".into()));
    }

    let author_id = ctx.user.id;
    db.transaction(|tx| {
        Box::pin(async move {
            let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM listings WHERE id = $1")
                .bind(listing_id)
                .fetch_optional(&mut **tx)
                .await?;
            if exists.is_none() {
                return Err(MarketError::NotFound("listing"));
            }

            sqlx::query_as::<_, ListingComment>(
                "INSERT INTO listing_comments (listing_id, author_id, body)
                 VALUES ($1, $2, $3)
                 RETURNING *",
            )
            .bind(listing_id)
            .bind(author_id)
            .bind(&cmd.body)
            .fetch_one(&mut **tx)
            .await
            .map_err(MarketError::from)
        })
    })
    .await
}

/// Toggle the caller's watchlist entry for a listing. Returns whether the
/// listing is watched after the call.
pub async fn handle_toggle_watch(
    listing_id: i64,
    ctx: &RequestContext,
    db: &DatabaseManager,
) -> Result<bool, MarketError> {
    info!(
        "{:<12} --> toggle watch: listing={} user={}",
        "Command", listing_id, ctx.user.id
    );

    let user_id = ctx.user.id;
    db.transaction(|tx| {
        Box::pin(async move {
            let removed =
                sqlx::query("DELETE FROM watchlist WHERE user_id = $1 AND listing_id = $2")
                    .bind(user_id)
                    .bind(listing_id)
                    .execute(&mut **tx)
                    .await?;
            if removed.rows_affected() > 0 {
                return Ok(false);
            }

            let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM listings WHERE id = $1")
                .bind(listing_id)
                .fetch_optional(&mut **tx)
                .await?;
            if exists.is_none() {
                return Err(MarketError::NotFound("listing"));
            }

            sqlx::query(
                "INSERT INTO watchlist (user_id, listing_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(user_id)
            .bind(listing_id)
            .execute(&mut **tx)
            .await?;
            Ok(true)
        })
    })
    .await
}

// endregion: --- Commands
