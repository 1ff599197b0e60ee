//! Settlement & disbursement.
//!
//! Checkout is a single transaction: guarded buyer debit, seller credit,
//! listing status flip, order insert. Either all four land or none do.
// region:    --- Imports
use crate::account::model::User;
use crate::context::RequestContext;
use crate::database::DatabaseManager;
use crate::error::MarketError;
use crate::events::{publish_or_log, EventPublisher, MarketEvent};
use crate::listing::model::{status, Listing};
use crate::settlement::math::{checkout_quote, CheckoutQuote};
use crate::settlement::model::{Order, ShippingAddress};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

// endregion: --- Imports

// region:    --- Commands

/// Checkout command
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutCommand {
    pub listing_id: i64,
    pub shipping: ShippingAddress,
}

/// Outcome of a settled checkout
#[derive(Debug, Serialize)]
pub struct SettlementReceipt {
    pub order: Order,
    pub quote: CheckoutQuote,
}

/// Settle a won auction into a paid order.
pub async fn handle_checkout(
    cmd: CheckoutCommand,
    ctx: &RequestContext,
    db: &DatabaseManager,
    publisher: &impl EventPublisher,
) -> Result<SettlementReceipt, MarketError> {
    info!(
        "{:<12} --> checkout: listing={} buyer={}",
        "Command", cmd.listing_id, ctx.user.id
    );

    cmd.shipping.validate().map_err(MarketError::Validation)?;

    let buyer_id = ctx.user.id;
    let receipt = db
        .transaction(|tx| {
            Box::pin(async move {
                let listing = sqlx::query_as::<_, Listing>(
                    "SELECT * FROM listings WHERE id = $1 FOR UPDATE",
                )
                .bind(cmd.listing_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or(MarketError::NotFound("listing"))?;

                let buyer = sqlx::query_as::<_, User>(
                    "SELECT * FROM users WHERE id = $1 FOR UPDATE",
                )
                .bind(buyer_id)
                .fetch_one(&mut **tx)
                .await?;

                if buyer.is_visitor() {
                    return Err(MarketError::AccountIneligible("visitors cannot check out"));
                }
                if buyer.suspended {
                    return Err(MarketError::AccountIneligible("account is suspended"));
                }
                if listing.status == status::COMPLETED {
                    return Err(MarketError::AlreadySettled);
                }
                if listing.leading_bidder != Some(buyer.id) {
                    return Err(MarketError::NotHighestBidder);
                }

                let quote = checkout_quote(listing.current_price, buyer.is_vip());

                // Guarded debit keeps the balance non-negative under races.
                let debited = sqlx::query_scalar::<_, i64>(
                    "UPDATE users SET balance = balance - $1
                     WHERE id = $2 AND balance >= $1
                     RETURNING balance",
                )
                .bind(quote.total)
                .bind(buyer.id)
                .fetch_optional(&mut **tx)
                .await?;
                if debited.is_none() {
                    return Err(MarketError::InsufficientBalance);
                }

                sqlx::query("UPDATE users SET balance = balance + $1 WHERE id = $2")
                    .bind(quote.seller_credit)
                    .bind(listing.poster_id)
                    .execute(&mut **tx)
                    .await?;

                // Status CAS: a concurrent settlement loses here and the
                // whole transaction rolls back.
                let settled = sqlx::query_scalar::<_, i64>(
                    "UPDATE listings SET status = 'COMPLETED'
                     WHERE id = $1 AND status <> 'COMPLETED'
                     RETURNING id",
                )
                .bind(listing.id)
                .fetch_optional(&mut **tx)
                .await?;
                if settled.is_none() {
                    return Err(MarketError::AlreadySettled);
                }

                let order = sqlx::query_as::<_, Order>(
                    "INSERT INTO orders
                        (listing_id, buyer_id, seller_id,
                         shipping_name, shipping_street, shipping_city, shipping_state, shipping_zip)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                     RETURNING *",
                )
                .bind(listing.id)
                .bind(buyer.id)
                .bind(listing.poster_id)
                .bind(&cmd.shipping.name)
                .bind(&cmd.shipping.street)
                .bind(&cmd.shipping.city)
                .bind(&cmd.shipping.state)
                .bind(&cmd.shipping.zip)
                .fetch_one(&mut **tx)
                .await?;

                Ok(SettlementReceipt { order, quote })
            })
        })
        .await?;

    publish_or_log(
        publisher,
        MarketEvent::OrderSettled {
            order_id: receipt.order.id,
            listing_id: receipt.order.listing_id,
            buyer_id: receipt.order.buyer_id,
            seller_id: receipt.order.seller_id,
            total_charged: receipt.quote.total,
            seller_credit: receipt.quote.seller_credit,
            timestamp: Utc::now(),
        },
    )
    .await;

    Ok(receipt)
}

// endregion: --- Commands
