//! Bid acceptance.
//!
//! Two concurrent bids against the same listing must serialize so that only
//! a strictly higher bid lands and the loser gets a deterministic rejection.
//! The listing row is locked for the duration of the transaction and the
//! price update carries the compare-and-set guard, so a stale write can
//! never overwrite a higher price.
// region:    --- Imports
use crate::account::model::User;
use crate::context::RequestContext;
use crate::database::DatabaseManager;
use crate::error::MarketError;
use crate::events::{publish_or_log, EventPublisher, MarketEvent};
use crate::listing::model::{status, Listing};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

// endregion: --- Imports

// region:    --- Commands

/// Bid command
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlaceBidCommand {
    pub listing_id: i64,
    pub bid_amount: i64,
}

/// Outcome of an accepted bid
#[derive(Debug, Serialize)]
pub struct BidReceipt {
    pub listing_id: i64,
    pub bid_amount: i64,
    pub current_price: i64,
}

/// Preconditions from fresh rows. Funds are never reserved at bid time; the
/// balance check only rejects bids the bidder could not settle today.
pub fn validate_bid(
    bidder: &User,
    listing: &Listing,
    amount: i64,
    now: DateTime<Utc>,
) -> Result<(), MarketError> {
    if listing.status == status::COMPLETED {
        return Err(MarketError::AlreadySettled);
    }
    if listing.status == status::ENDED || now >= listing.expires_at {
        return Err(MarketError::ListingExpired);
    }
    if bidder.is_visitor() {
        return Err(MarketError::AccountIneligible("visitors cannot bid"));
    }
    if bidder.suspended {
        return Err(MarketError::AccountIneligible("account is suspended"));
    }
    if bidder.id == listing.poster_id {
        return Err(MarketError::Validation(
            "you cannot bid on your own listing".into(),
        ));
    }
    if amount <= listing.current_price {
        return Err(MarketError::BidTooLow {
            current_price: listing.current_price,
        });
    }
    if amount > bidder.balance {
        return Err(MarketError::InsufficientBalance);
    }
    Ok(())
}

/// Accept a bid: one transaction locking the listing row, validating against
/// the locked state, then applying the guarded price update and appending
/// the bid row.
pub async fn handle_place_bid(
    cmd: PlaceBidCommand,
    ctx: &RequestContext,
    db: &DatabaseManager,
    publisher: &impl EventPublisher,
) -> Result<BidReceipt, MarketError> {
    info!("{:<12} --> place bid: {:?}", "Command", cmd);

    let bidder_id = ctx.user.id;
    let now = Utc::now();

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

                // Re-read the bidder inside the transaction so a concurrent
                // suspension or balance change is respected.
                let bidder = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
                    .bind(bidder_id)
                    .fetch_one(&mut **tx)
                    .await?;

                validate_bid(&bidder, &listing, cmd.bid_amount, now)?;

                // Compare-and-set on the current price. With the row locked
                // this cannot miss, but the guard keeps a stale write
                // impossible under any access path.
                let new_price = sqlx::query_scalar::<_, i64>(
                    "UPDATE listings
                     SET current_price = $1, leading_bidder = $2
                     WHERE id = $3 AND current_price < $1
                       AND status = 'ACTIVE' AND expires_at > $4
                     RETURNING current_price",
                )
                .bind(cmd.bid_amount)
                .bind(bidder_id)
                .bind(cmd.listing_id)
                .bind(now)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or(MarketError::BidTooLow {
                    current_price: listing.current_price,
                })?;

                sqlx::query(
                    "INSERT INTO bids (listing_id, bidder_id, bid_amount, bid_time)
                     VALUES ($1, $2, $3, $4)",
                )
                .bind(cmd.listing_id)
                .bind(bidder_id)
                .bind(cmd.bid_amount)
                .bind(now)
                .execute(&mut **tx)
                .await?;

                Ok::<_, MarketError>(BidReceipt {
                    listing_id: cmd.listing_id,
                    bid_amount: cmd.bid_amount,
                    current_price: new_price,
                })
            })
        })
        .await?;

    publish_or_log(
        publisher,
        MarketEvent::BidAccepted {
            listing_id: receipt.listing_id,
            bidder_id,
            bid_amount: receipt.bid_amount,
            timestamp: now,
        },
    )
    .await;

    Ok(receipt)
}

// endregion: --- Commands

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::model::account_type;
    use chrono::Duration;

    fn bidder(id: i64, balance: i64) -> User {
        User {
            id,
            username: format!("user{id}"),
            email: format!("user{id}@example.com"),
            balance,
            rating: 0.0,
            account_type: account_type::USER.into(),
            suspended: false,
            warning: false,
            bad_reviews: 0,
            suspended_times: 0,
            created_at: Utc::now(),
        }
    }

    fn listing(current_price: i64, expires_in: Duration) -> Listing {
        Listing {
            id: 10,
            title: "camera".into(),
            description: "slightly used".into(),
            pictures: vec![],
            poster_id: 1,
            starting_price: 10000,
            current_price,
            leading_bidder: None,
            expires_at: Utc::now() + expires_in,
            status: status::ACTIVE.into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn accepts_strictly_higher_bid_within_balance() {
        let now = Utc::now();
        let l = listing(10000, Duration::hours(2));
        assert!(validate_bid(&bidder(2, 50000), &l, 10500, now).is_ok());
    }

    #[test]
    fn rejects_equal_or_lower_bid() {
        let now = Utc::now();
        let l = listing(10000, Duration::hours(2));
        let err = validate_bid(&bidder(2, 50000), &l, 10000, now).unwrap_err();
        assert_eq!(err.code(), "BID_TOO_LOW");
    }

    #[test]
    fn rejects_bid_beyond_balance() {
        let now = Utc::now();
        let l = listing(10000, Duration::hours(2));
        let err = validate_bid(&bidder(2, 10200), &l, 10500, now).unwrap_err();
        assert_eq!(err.code(), "INSUFFICIENT_BALANCE");
    }

    #[test]
    fn rejects_visitor_and_suspended() {
        let now = Utc::now();
        let l = listing(10000, Duration::hours(2));

        let mut visitor = bidder(2, 50000);
        visitor.account_type = account_type::VISITOR.into();
        assert_eq!(
            validate_bid(&visitor, &l, 10500, now).unwrap_err().code(),
            "ACCOUNT_INELIGIBLE"
        );

        let mut suspended = bidder(3, 50000);
        suspended.suspended = true;
        assert_eq!(
            validate_bid(&suspended, &l, 10500, now).unwrap_err().code(),
            "ACCOUNT_INELIGIBLE"
        );
    }

    #[test]
    fn rejects_poster_self_bid() {
        let now = Utc::now();
        let l = listing(10000, Duration::hours(2));
        let err = validate_bid(&bidder(1, 50000), &l, 10500, now).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn rejects_expired_and_settled_listings() {
        let now = Utc::now();

        let expired = listing(10000, Duration::seconds(-5));
        assert_eq!(
            validate_bid(&bidder(2, 50000), &expired, 10500, now)
                .unwrap_err()
                .code(),
            "LISTING_EXPIRED"
        );

        let mut settled = listing(10000, Duration::hours(2));
        settled.status = status::COMPLETED.into();
        assert_eq!(
            validate_bid(&bidder(2, 50000), &settled, 10500, now)
                .unwrap_err()
                .code(),
            "ALREADY_SETTLED"
        );
    }
}

// endregion: --- Tests
