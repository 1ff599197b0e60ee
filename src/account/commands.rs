// region:    --- Imports
use crate::context::RequestContext;
use crate::database::DatabaseManager;
use crate::error::MarketError;
use serde::{Deserialize, Serialize};
use tracing::info;

// endregion: --- Imports

// region:    --- Commands

/// Balance top-up
#[derive(Debug, Serialize, Deserialize)]
pub struct ReloadCommand {
    pub amount: i64,
}

/// Credit the caller's balance. Amounts are minor units and must be positive.
pub async fn handle_reload(
    cmd: ReloadCommand,
    ctx: &RequestContext,
    db: &DatabaseManager,
) -> Result<i64, MarketError> {
    info!(
        "{:<12} --> reload requested: user={} amount={}",
        "Command", ctx.user.id, cmd.amount
    );

    if cmd.amount <= 0 {
        return Err(MarketError::Validation(
            "reload amount must be positive".to_string(),
        ));
    }

    let user_id = ctx.user.id;
    let new_balance = db
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_scalar::<_, i64>(
                    "UPDATE users SET balance = balance + $1 WHERE id = $2 RETURNING balance",
                )
                .bind(cmd.amount)
                .bind(user_id)
                .fetch_one(&mut **tx)
                .await
                .map_err(MarketError::from)
            })
        })
        .await?;

    Ok(new_balance)
}

// endregion: --- Commands
