//! Moderation resolution workflow.
//!
//! Issues and applications share the INITIATED -> UNDER_REVIEW -> RESOLVED
//! machine. RESOLVED is terminal: every transition out of it is guarded by a
//! status compare-and-set, so a resolved ticket can never be refunded or
//! re-resolved.
// region:    --- Imports
use crate::account::model::{account_type, User};
use crate::context::RequestContext;
use crate::database::DatabaseManager;
use crate::error::MarketError;
use crate::events::{publish_or_log, EventPublisher, MarketEvent};
use crate::listing::model::Listing;
use crate::moderation::model::{status, Application, Issue, IssueResponse};
use crate::settlement::math::{refund_breakdown, RefundBreakdown};
use crate::settlement::model::Order;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

// endregion: --- Imports

// region:    --- Issue Commands

/// Dispute report. Either an order reference (the issuee is the order's
/// seller) or an explicit issuee is required.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportIssueCommand {
    pub order_id: Option<i64>,
    pub issuee_id: Option<i64>,
    pub comments: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RespondCommand {
    pub body: String,
}

pub async fn handle_report_issue(
    cmd: ReportIssueCommand,
    ctx: &RequestContext,
    db: &DatabaseManager,
) -> Result<Issue, MarketError> {
    info!(
        "{:<12} --> report issue: issuer={} order={:?}",
        "Command", ctx.user.id, cmd.order_id
    );

    if cmd.comments.trim().is_empty() {
        return Err(MarketError::Validation(
            "issue description must not be empty".into(),
        ));
    }

    let issuer_id = ctx.user.id;
    db.transaction(|tx| {
        Box::pin(async move {
            let issuee_id = match (cmd.order_id, cmd.issuee_id) {
                (Some(order_id), _) => {
                    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
                        .bind(order_id)
                        .fetch_optional(&mut **tx)
                        .await?
                        .ok_or(MarketError::NotFound("order"))?;
                    if order.buyer_id != issuer_id {
                        return Err(MarketError::Unauthorized);
                    }
                    order.seller_id
                }
                (None, Some(issuee_id)) => issuee_id,
                (None, None) => {
                    return Err(MarketError::Validation(
                        "an order or an issuee is required".into(),
                    ))
                }
            };

            sqlx::query_as::<_, Issue>(
                "INSERT INTO issues (issuer_id, issuee_id, order_id, comments, status)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING *",
            )
            .bind(issuer_id)
            .bind(issuee_id)
            .bind(cmd.order_id)
            .bind(&cmd.comments)
            .bind(status::INITIATED)
            .fetch_one(&mut **tx)
            .await
            .map_err(MarketError::from)
        })
    })
    .await
}

/// Append a response to an issue thread. The first response moves the issue
/// from INITIATED to UNDER_REVIEW.
pub async fn handle_respond_issue(
    issue_id: i64,
    cmd: RespondCommand,
    ctx: &RequestContext,
    db: &DatabaseManager,
) -> Result<IssueResponse, MarketError> {
    info!(
        "{:<12} --> respond issue: issue={} author={}",
        "Command", issue_id, ctx.user.id
    );

    if cmd.body.trim().is_empty() {
        return Err(MarketError::Validation("response must not be empty".into()));
    }

    let author_id = ctx.user.id;
    let is_moderator = ctx.is_moderator();
    db.transaction(|tx| {
        Box::pin(async move {
            let issue =
                sqlx::query_as::<_, Issue>("SELECT * FROM issues WHERE id = $1 FOR UPDATE")
                    .bind(issue_id)
                    .fetch_optional(&mut **tx)
                    .await?
                    .ok_or(MarketError::NotFound("issue"))?;

            if issue.status == status::RESOLVED {
                return Err(MarketError::Validation(
                    "issue has already been resolved".into(),
                ));
            }
            if !is_moderator && author_id != issue.issuer_id && author_id != issue.issuee_id {
                return Err(MarketError::Unauthorized);
            }

            let response = sqlx::query_as::<_, IssueResponse>(
                "INSERT INTO issue_responses (issue_id, author_id, moderator, body)
                 VALUES ($1, $2, $3, $4)
                 RETURNING *",
            )
            .bind(issue_id)
            .bind(author_id)
            .bind(is_moderator)
            .bind(&cmd.body)
            .fetch_one(&mut **tx)
            .await?;

            sqlx::query("UPDATE issues SET status = $2 WHERE id = $1 AND status = $3")
                .bind(issue_id)
                .bind(status::UNDER_REVIEW)
                .bind(status::INITIATED)
            .execute(&mut **tx)
            .await?;

            Ok(response)
        })
    })
    .await
}

/// Resolve an issue without a refund. Moderator only.
pub async fn handle_resolve_issue(
    issue_id: i64,
    ctx: &RequestContext,
    db: &DatabaseManager,
) -> Result<(), MarketError> {
    info!("{:<12} --> resolve issue: issue={}", "Command", issue_id);
    ctx.require_moderator()?;

    db.transaction(|tx| {
        Box::pin(async move {
            let resolved = sqlx::query_scalar::<_, i64>(
                "UPDATE issues SET status = 'RESOLVED'
                 WHERE id = $1 AND status <> 'RESOLVED'
                 RETURNING id",
            )
            .bind(issue_id)
            .fetch_optional(&mut **tx)
            .await?;
            if resolved.is_some() {
                return Ok(());
            }

            let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM issues WHERE id = $1")
                .bind(issue_id)
                .fetch_optional(&mut **tx)
                .await?;
            match exists {
                Some(_) => Err(MarketError::Validation(
                    "issue has already been resolved".into(),
                )),
                None => Err(MarketError::NotFound("issue")),
            }
        })
    })
    .await
}

/// Refund outcome
#[derive(Debug, Serialize)]
pub struct RefundReceipt {
    pub issue_id: i64,
    pub order_id: i64,
    pub breakdown: RefundBreakdown,
}

/// Compensating transaction for a bad settlement: credit the buyer the full
/// buyer-side total, debit the seller their payout side, and resolve the
/// issue, all atomically. Moderator only, and only before resolution.
pub async fn handle_refund_issue(
    issue_id: i64,
    ctx: &RequestContext,
    db: &DatabaseManager,
    publisher: &impl EventPublisher,
) -> Result<RefundReceipt, MarketError> {
    info!("{:<12} --> refund issue: issue={}", "Command", issue_id);
    ctx.require_moderator()?;

    let receipt = db
        .transaction(|tx| {
            Box::pin(async move {
                let issue =
                    sqlx::query_as::<_, Issue>("SELECT * FROM issues WHERE id = $1 FOR UPDATE")
                        .bind(issue_id)
                        .fetch_optional(&mut **tx)
                        .await?
                        .ok_or(MarketError::NotFound("issue"))?;

                if issue.status == status::RESOLVED {
                    return Err(MarketError::Validation(
                        "issue has already been resolved".into(),
                    ));
                }
                let order_id = issue.order_id.ok_or_else(|| {
                    MarketError::Validation("issue has no associated order".into())
                })?;

                let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
                    .bind(order_id)
                    .fetch_one(&mut **tx)
                    .await?;
                let listing =
                    sqlx::query_as::<_, Listing>("SELECT * FROM listings WHERE id = $1")
                        .bind(order.listing_id)
                        .fetch_one(&mut **tx)
                        .await?;

                // Recompute the original settlement sides from the final price
                let breakdown = refund_breakdown(listing.current_price);

                sqlx::query("UPDATE users SET balance = balance + $1 WHERE id = $2")
                    .bind(breakdown.buyer_credit)
                    .bind(order.buyer_id)
                    .execute(&mut **tx)
                    .await?;
                sqlx::query("UPDATE users SET balance = balance - $1 WHERE id = $2")
                    .bind(breakdown.seller_debit)
                    .bind(order.seller_id)
                    .execute(&mut **tx)
                    .await?;

                let resolved = sqlx::query_scalar::<_, i64>(
                    "UPDATE issues SET status = 'RESOLVED'
                     WHERE id = $1 AND status <> 'RESOLVED'
                     RETURNING id",
                )
                .bind(issue_id)
                .fetch_optional(&mut **tx)
                .await?;
                if resolved.is_none() {
                    return Err(MarketError::Validation(
                        "issue has already been resolved".into(),
                    ));
                }

                Ok(RefundReceipt {
                    issue_id,
                    order_id,
                    breakdown,
                })
            })
        })
        .await?;

    publish_or_log(
        publisher,
        MarketEvent::IssueRefunded {
            issue_id: receipt.issue_id,
            order_id: receipt.order_id,
            buyer_credit: receipt.breakdown.buyer_credit,
            seller_debit: receipt.breakdown.seller_debit,
            timestamp: Utc::now(),
        },
    )
    .await;

    Ok(receipt)
}

// endregion: --- Issue Commands

// region:    --- Application Commands

/// Privilege-upgrade request
#[derive(Debug, Serialize, Deserialize)]
pub struct ApplyCommand {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveApplicationCommand {
    pub approve: bool,
}

/// Submit an application to upgrade from visitor privilege.
pub async fn handle_apply(
    cmd: ApplyCommand,
    ctx: &RequestContext,
    db: &DatabaseManager,
) -> Result<Application, MarketError> {
    info!("{:<12} --> apply: user={}", "Command", ctx.user.id);

    if !ctx.user.is_visitor() {
        return Err(MarketError::AlreadyPrivileged);
    }
    if cmd.username.trim().is_empty() || cmd.email.trim().is_empty() {
        return Err(MarketError::Validation(
            "username and email are required".into(),
        ));
    }

    let user_id = ctx.user.id;
    db.transaction(|tx| {
        Box::pin(async move {
            sqlx::query_as::<_, Application>(
                "INSERT INTO applications (user_id, username, email, status)
                 VALUES ($1, $2, $3, 'INITIATED')
                 RETURNING *",
            )
            .bind(user_id)
            .bind(&cmd.username)
            .bind(&cmd.email)
            .fetch_one(&mut **tx)
            .await
            .map_err(MarketError::from)
        })
    })
    .await
}

/// A moderator takes up an application for review.
pub async fn handle_take_up_application(
    application_id: i64,
    ctx: &RequestContext,
    db: &DatabaseManager,
) -> Result<(), MarketError> {
    info!(
        "{:<12} --> take up application: id={}",
        "Command", application_id
    );
    ctx.require_moderator()?;

    db.transaction(|tx| {
        Box::pin(async move {
            let updated = sqlx::query_scalar::<_, i64>(
                "UPDATE applications SET status = 'UNDER_REVIEW'
                 WHERE id = $1 AND status = 'INITIATED'
                 RETURNING id",
            )
            .bind(application_id)
            .fetch_optional(&mut **tx)
            .await?;
            if updated.is_some() {
                return Ok(());
            }

            let exists =
                sqlx::query_scalar::<_, i64>("SELECT id FROM applications WHERE id = $1")
                    .bind(application_id)
                    .fetch_optional(&mut **tx)
                    .await?;
            match exists {
                Some(_) => Err(MarketError::Validation(
                    "application is not awaiting review".into(),
                )),
                None => Err(MarketError::NotFound("application")),
            }
        })
    })
    .await
}

/// Approve or decline an application. Approval promotes the requesting user
/// to full USER privilege; the application is resolved either way.
pub async fn handle_resolve_application(
    application_id: i64,
    cmd: ResolveApplicationCommand,
    ctx: &RequestContext,
    db: &DatabaseManager,
) -> Result<Application, MarketError> {
    info!(
        "{:<12} --> resolve application: id={} approve={}",
        "Command", application_id, cmd.approve
    );
    ctx.require_moderator()?;

    db.transaction(|tx| {
        Box::pin(async move {
            let application = sqlx::query_as::<_, Application>(
                "SELECT * FROM applications WHERE id = $1 FOR UPDATE",
            )
            .bind(application_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(MarketError::NotFound("application"))?;

            if application.status == status::RESOLVED {
                return Err(MarketError::Validation(
                    "application has already been resolved".into(),
                ));
            }

            let applicant = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
                .bind(application.user_id)
                .fetch_one(&mut **tx)
                .await?;
            if cmd.approve && applicant.account_type == account_type::USER {
                return Err(MarketError::AlreadyPrivileged);
            }

            let application = sqlx::query_as::<_, Application>(
                "UPDATE applications SET status = 'RESOLVED' WHERE id = $1 RETURNING *",
            )
            .bind(application_id)
            .fetch_one(&mut **tx)
            .await?;

            if cmd.approve {
                sqlx::query("UPDATE users SET account_type = 'USER' WHERE id = $1")
                    .bind(applicant.id)
                    .execute(&mut **tx)
                    .await?;
            }

            Ok(application)
        })
    })
    .await
}

// endregion: --- Application Commands
