// region:    --- Imports
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

// endregion: --- Imports

// region:    --- Market Error

/// Error taxonomy for every user-triggered operation. Each variant maps to a
/// stable machine-readable code and an HTTP status; bodies keep the
/// `{"error", "code"}` shape the handlers respond with everywhere.
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("{0}")]
    Validation(String),

    #[error("account is not eligible: {0}")]
    AccountIneligible(&'static str),

    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("bid must be higher than the current price")]
    BidTooLow { current_price: i64 },

    #[error("listing has expired")]
    ListingExpired,

    #[error("only the leading bidder can check out this listing")]
    NotHighestBidder,

    #[error("listing has already been settled")]
    AlreadySettled,

    #[error("authentication required")]
    Unauthenticated,

    #[error("operation not permitted for this account")]
    Unauthorized,

    #[error("user already holds this privilege")]
    AlreadyPrivileged,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl MarketError {
    pub fn code(&self) -> &'static str {
        match self {
            MarketError::Validation(_) => "VALIDATION_ERROR",
            MarketError::AccountIneligible(_) => "ACCOUNT_INELIGIBLE",
            MarketError::InsufficientBalance => "INSUFFICIENT_BALANCE",
            MarketError::BidTooLow { .. } => "BID_TOO_LOW",
            MarketError::ListingExpired => "LISTING_EXPIRED",
            MarketError::NotHighestBidder => "NOT_HIGHEST_BIDDER",
            MarketError::AlreadySettled => "ALREADY_SETTLED",
            MarketError::Unauthenticated => "UNAUTHENTICATED",
            MarketError::Unauthorized => "UNAUTHORIZED",
            MarketError::AlreadyPrivileged => "ALREADY_PRIVILEGED",
            MarketError::NotFound(_) => "NOT_FOUND",
            MarketError::Database(_) => "DATABASE_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            MarketError::Validation(_)
            | MarketError::InsufficientBalance
            | MarketError::BidTooLow { .. }
            | MarketError::ListingExpired
            | MarketError::NotHighestBidder
            | MarketError::AlreadySettled
            | MarketError::AlreadyPrivileged => StatusCode::BAD_REQUEST,
            MarketError::AccountIneligible(_) | MarketError::Unauthorized => {
                StatusCode::FORBIDDEN
            }
            MarketError::Unauthenticated => StatusCode::UNAUTHORIZED,
            MarketError::NotFound(_) => StatusCode::NOT_FOUND,
            MarketError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for MarketError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => MarketError::NotFound("record"),
            other => MarketError::Database(other),
        }
    }
}

impl IntoResponse for MarketError {
    fn into_response(self) -> Response {
        let mut body = serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        if let MarketError::BidTooLow { current_price } = &self {
            body["current_price"] = serde_json::json!(current_price);
        }
        (self.status(), Json(body)).into_response()
    }
}

// endregion: --- Market Error

// region:    --- Tests


// endregion: --- Tests
