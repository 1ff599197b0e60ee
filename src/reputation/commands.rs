//! Reputation & enforcement.
//!
//! Reviews feed the seller's mean rating; a rating of 2 or below is a bad
//! review and triggers the enforcement policy. Suspended accounts buy their
//! way back with a fixed fine, up to a hard limit of three reactivations.
// region:    --- Imports
use crate::account::model::{account_type, User};
use crate::context::RequestContext;
use crate::database::DatabaseManager;
use crate::error::MarketError;
use crate::events::{publish_or_log, EventPublisher, MarketEvent};
use crate::reputation::model::Review;
use crate::settlement::model::Order;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

// endregion: --- Imports

// region:    --- Policy

/// Reactivation fine, minor units
pub const REACTIVATION_FINE: i64 = 5000;

/// A third bad review suspends a non-VIP seller
pub const BAD_REVIEW_LIMIT: i64 = 3;

/// Paid reactivations are capped; past this the account stays disabled
pub const SUSPENSION_LIMIT: i64 = 3;

/// A review counts as bad at this rating or below
pub const BAD_REVIEW_THRESHOLD: i64 = 2;

/// Enforcement outcome of one bad review
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Penalty {
    /// VIP sellers lose their tier instead of collecting strikes
    DowngradeVip,
    /// The strike that reaches the limit suspends the seller
    Suspend,
    /// Otherwise: one more strike and a warning
    Warn,
}

pub fn penalty_for(seller: &User) -> Penalty {
    if seller.account_type == account_type::VIP {
        Penalty::DowngradeVip
    } else if seller.bad_reviews + 1 >= BAD_REVIEW_LIMIT {
        Penalty::Suspend
    } else {
        Penalty::Warn
    }
}

// endregion: --- Policy

// region:    --- Commands

/// Review command
#[derive(Debug, Serialize, Deserialize)]
pub struct RecordReviewCommand {
    pub order_id: i64,
    pub rate: i64,
    pub comment: Option<String>,
}

/// Record a review and apply the enforcement policy in the same transaction.
pub async fn handle_record_review(
    cmd: RecordReviewCommand,
    ctx: &RequestContext,
    db: &DatabaseManager,
    publisher: &impl EventPublisher,
) -> Result<Review, MarketError> {
    info!(
        "{:<12} --> record review: order={} rate={}",
        "Command", cmd.order_id, cmd.rate
    );

    if !(1..=5).contains(&cmd.rate) {
        return Err(MarketError::Validation(
            "rating must be between 1 and 5".into(),
        ));
    }

    let reviewer_id = ctx.user.id;
    let (review, suspended_seller) = db
        .transaction(|tx| {
            Box::pin(async move {
                let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
                    .bind(cmd.order_id)
                    .fetch_optional(&mut **tx)
                    .await?
                    .ok_or(MarketError::NotFound("order"))?;

                if order.buyer_id != reviewer_id {
                    return Err(MarketError::Unauthorized);
                }

                // One review per order
                let review = sqlx::query_as::<_, Review>(
                    "INSERT INTO reviews (order_id, reviewer_id, reviewee_id, rate, comment)
                     VALUES ($1, $2, $3, $4, $5)
                     ON CONFLICT (order_id) DO NOTHING
                     RETURNING *",
                )
                .bind(cmd.order_id)
                .bind(reviewer_id)
                .bind(order.seller_id)
                .bind(cmd.rate)
                .bind(&cmd.comment)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or_else(|| {
                    MarketError::Validation("order has already been reviewed".into())
                })?;

                // Simple arithmetic mean over all reviews for the seller
                sqlx::query(
                    "UPDATE users
                     SET rating = (SELECT AVG(rate)::float8 FROM reviews WHERE reviewee_id = $1)
                     WHERE id = $1",
                )
                .bind(order.seller_id)
                .execute(&mut **tx)
                .await?;

                let mut suspended_seller = None;
                if cmd.rate <= BAD_REVIEW_THRESHOLD {
                    let seller =
                        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
                            .bind(order.seller_id)
                            .fetch_one(&mut **tx)
                            .await?;

                    match penalty_for(&seller) {
                        Penalty::DowngradeVip => {
                            sqlx::query(
                                "UPDATE users
                                 SET account_type = 'USER', bad_reviews = 0, warning = TRUE
                                 WHERE id = $1",
                            )
                            .bind(seller.id)
                            .execute(&mut **tx)
                            .await?;
                        }
                        Penalty::Suspend => {
                            sqlx::query(
                                "UPDATE users
                                 SET suspended = TRUE, bad_reviews = 0, warning = TRUE
                                 WHERE id = $1",
                            )
                            .bind(seller.id)
                            .execute(&mut **tx)
                            .await?;
                            suspended_seller = Some(seller.id);
                        }
                        Penalty::Warn => {
                            sqlx::query(
                                "UPDATE users
                                 SET bad_reviews = bad_reviews + 1, warning = TRUE
                                 WHERE id = $1",
                            )
                            .bind(seller.id)
                            .execute(&mut **tx)
                            .await?;
                        }
                    }
                }

                Ok((review, suspended_seller))
            })
        })
        .await?;

    if let Some(user_id) = suspended_seller {
        publish_or_log(
            publisher,
            MarketEvent::AccountSuspended {
                user_id,
                timestamp: Utc::now(),
            },
        )
        .await;
    }

    Ok(review)
}

/// Pay the fine and lift a suspension. Each reactivation counts against the
/// limit; once it is reached the account stays disabled with no recovery
/// path.
pub async fn handle_reactivate(
    ctx: &RequestContext,
    db: &DatabaseManager,
) -> Result<i64, MarketError> {
    info!("{:<12} --> reactivate: user={}", "Command", ctx.user.id);

    let user_id = ctx.user.id;
    db.transaction(|tx| {
        Box::pin(async move {
            let balance = sqlx::query_scalar::<_, i64>(
                "UPDATE users
                 SET balance = balance - $1,
                     suspended = FALSE,
                     suspended_times = suspended_times + 1,
                     bad_reviews = 0
                 WHERE id = $2 AND suspended
                   AND suspended_times < $3 AND balance >= $1
                 RETURNING balance",
            )
            .bind(REACTIVATION_FINE)
            .bind(user_id)
            .bind(SUSPENSION_LIMIT)
            .fetch_optional(&mut **tx)
            .await?;

            if let Some(balance) = balance {
                return Ok(balance);
            }

            // Guard failed; classify against the current row
            let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_one(&mut **tx)
                .await?;
            if !user.suspended {
                Err(MarketError::Validation("account is not suspended".into()))
            } else if user.suspended_times >= SUSPENSION_LIMIT {
                Err(MarketError::AccountIneligible(
                    "account permanently disabled",
                ))
            } else {
                Err(MarketError::InsufficientBalance)
            }
        })
    })
    .await
}

// endregion: --- Commands

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn seller(account_type: &str, bad_reviews: i64) -> User {
        User {
            id: 7,
            username: "seller".into(),
            email: "seller@example.com".into(),
            balance: 0,
            rating: 4.0,
            account_type: account_type.into(),
            suspended: false,
            warning: false,
            bad_reviews,
            suspended_times: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn vip_is_downgraded_not_suspended() {
        assert_eq!(
            penalty_for(&seller(account_type::VIP, 5)),
            Penalty::DowngradeVip
        );
    }

    #[test]
    fn third_strike_suspends_non_vip() {
        // counter at 2, this bad review is the third strike
        assert_eq!(penalty_for(&seller(account_type::USER, 2)), Penalty::Suspend);
    }

    #[test]
    fn early_strikes_only_warn() {
        assert_eq!(penalty_for(&seller(account_type::USER, 0)), Penalty::Warn);
        assert_eq!(penalty_for(&seller(account_type::USER, 1)), Penalty::Warn);
    }
}

// endregion: --- Tests
