use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Persisted listing states. ENDING_SOON is display-only and never stored.
pub mod status {
    pub const ACTIVE: &str = "ACTIVE";
    pub const ENDED: &str = "ENDED";
    pub const COMPLETED: &str = "COMPLETED";
    pub const ENDING_SOON: &str = "ENDING_SOON";
}

// Listing model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Listing {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub pictures: Vec<String>,
    pub poster_id: i64,
    pub starting_price: i64,
    pub current_price: i64,
    pub leading_bidder: Option<i64>,
    pub expires_at: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

// Listing comment model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ListingComment {
    pub id: i64,
    pub listing_id: i64,
    pub author_id: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Read-time status projection. COMPLETED is authoritative once settlement
/// has written it; everything else derives from the expiry so the display
/// can never race the sweep.
pub fn derive_status(listing: &Listing, now: DateTime<Utc>) -> &'static str {
    if listing.status == status::COMPLETED {
        return status::COMPLETED;
    }
    if now >= listing.expires_at {
        return status::ENDED;
    }
    if listing.expires_at - now < Duration::hours(24) {
        return status::ENDING_SOON;
    }
    status::ACTIVE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(status: &str, expires_at: DateTime<Utc>) -> Listing {
        Listing {
            id: 1,
            title: "t".into(),
            description: "d".into(),
            pictures: vec![],
            poster_id: 1,
            starting_price: 1000,
            current_price: 1000,
            leading_bidder: None,
            expires_at,
            status: status.into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn active_until_threshold() {
        let now = Utc::now();
        let l = listing(status::ACTIVE, now + Duration::days(3));
        assert_eq!(derive_status(&l, now), status::ACTIVE);
    }

    #[test]
    fn ending_soon_under_24h() {
        let now = Utc::now();
        let l = listing(status::ACTIVE, now + Duration::hours(5));
        assert_eq!(derive_status(&l, now), status::ENDING_SOON);
    }

    #[test]
    fn ended_past_expiry() {
        let now = Utc::now();
        let l = listing(status::ACTIVE, now - Duration::seconds(1));
        assert_eq!(derive_status(&l, now), status::ENDED);
    }

    #[test]
    fn completed_wins_over_expiry() {
        let now = Utc::now();
        let l = listing(status::COMPLETED, now - Duration::days(1));
        assert_eq!(derive_status(&l, now), status::COMPLETED);
    }
}
