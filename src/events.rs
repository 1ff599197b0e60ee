// region:    --- Imports
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

// endregion: --- Imports

// region:    --- Market Events

/// Domain events published after a transaction commits. Consumers
/// (notifications, analytics) are downstream; the source of truth for all
/// state is Postgres, so publishing is observational only.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum MarketEvent {
    ListingCreated {
        listing_id: i64,
        poster_id: i64,
        starting_price: i64,
        expires_at: DateTime<Utc>,
    },
    BidAccepted {
        listing_id: i64,
        bidder_id: i64,
        bid_amount: i64,
        timestamp: DateTime<Utc>,
    },
    OrderSettled {
        order_id: i64,
        listing_id: i64,
        buyer_id: i64,
        seller_id: i64,
        total_charged: i64,
        seller_credit: i64,
        timestamp: DateTime<Utc>,
    },
    AccountSuspended {
        user_id: i64,
        timestamp: DateTime<Utc>,
    },
    IssueRefunded {
        issue_id: i64,
        order_id: i64,
        buyer_credit: i64,
        seller_debit: i64,
        timestamp: DateTime<Utc>,
    },
}

impl MarketEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            MarketEvent::ListingCreated { .. } => "ListingCreated",
            MarketEvent::BidAccepted { .. } => "BidAccepted",
            MarketEvent::OrderSettled { .. } => "OrderSettled",
            MarketEvent::AccountSuspended { .. } => "AccountSuspended",
            MarketEvent::IssueRefunded { .. } => "IssueRefunded",
        }
    }

    /// Partition key: the entity the event is about
    pub fn key(&self) -> i64 {
        match self {
            MarketEvent::ListingCreated { listing_id, .. } => *listing_id,
            MarketEvent::BidAccepted { listing_id, .. } => *listing_id,
            MarketEvent::OrderSettled { listing_id, .. } => *listing_id,
            MarketEvent::AccountSuspended { user_id, .. } => *user_id,
            MarketEvent::IssueRefunded { issue_id, .. } => *issue_id,
        }
    }
}

// endregion: --- Market Events

// region:    --- Event Publisher

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &MarketEvent) -> Result<(), String>;
}

/// Publish after commit; a broker outage must never fail the user action.
pub async fn publish_or_log(publisher: &dyn EventPublisher, event: MarketEvent) {
    if let Err(e) = publisher.publish(&event).await {
        warn!(
            "{:<12} --> failed to publish {}: {}",
            "Events",
            event.kind(),
            e
        );
    }
}

// endregion: --- Event Publisher
