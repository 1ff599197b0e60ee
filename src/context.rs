// region:    --- Imports
use crate::account::model::User;
use crate::error::MarketError;
use crate::query;
use crate::state::AppState;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

// endregion: --- Imports

// region:    --- Request Context

/// Identity is resolved by the upstream gateway; the authenticated user id
/// arrives in the `x-user-id` header and is re-read from storage on every
/// request so suspension and account-type changes take effect immediately.
/// No ambient session state.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Request-scoped authenticated caller, passed explicitly into every command.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: User,
}

impl RequestContext {
    pub fn is_moderator(&self) -> bool {
        self.user.is_moderator()
    }

    pub fn require_moderator(&self) -> Result<(), MarketError> {
        if self.is_moderator() {
            Ok(())
        } else {
            Err(MarketError::Unauthorized)
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for RequestContext {
    type Rejection = MarketError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
            .ok_or(MarketError::Unauthenticated)?;

        // An unknown id is an identity failure; storage errors stay 500s.
        let user = query::handlers::get_user(&state.db, user_id)
            .await
            .map_err(|e| match e {
                MarketError::NotFound(_) => MarketError::Unauthenticated,
                other => other,
            })?;

        Ok(RequestContext { user })
    }
}

// endregion: --- Request Context
