/// Listing lookup
pub const GET_LISTING: &str = "SELECT * FROM listings WHERE id = $1";

/// All listings, newest first
pub const GET_ALL_LISTINGS: &str = "SELECT * FROM listings ORDER BY created_at DESC";

/// Highest accepted bid for a listing
pub const GET_HIGHEST_BID: &str =
    "SELECT MAX(bid_amount) as highest_bid FROM bids WHERE listing_id = $1";

/// Bid history for a listing
pub const GET_LISTING_BIDS: &str = r#"
    SELECT id, listing_id, bidder_id, bid_amount, bid_time
    FROM bids
    WHERE listing_id = $1
    ORDER BY bid_time DESC
"#;

/// Comment thread for a listing, oldest first
pub const GET_LISTING_COMMENTS: &str = r#"
    SELECT id, listing_id, author_id, body, created_at
    FROM listing_comments
    WHERE listing_id = $1
    ORDER BY created_at ASC
"#;

/// User lookup
pub const GET_USER: &str = "SELECT * FROM users WHERE id = $1";

/// Orders where the user is the buyer, newest first
pub const GET_ORDERS_FOR_BUYER: &str =
    "SELECT * FROM orders WHERE buyer_id = $1 ORDER BY created_at DESC";

/// A user's bid history across listings
pub const GET_BIDS_FOR_USER: &str = r#"
    SELECT id, listing_id, bidder_id, bid_amount, bid_time
    FROM bids
    WHERE bidder_id = $1
    ORDER BY bid_time DESC
"#;

/// Listings on a user's watchlist
pub const GET_WATCHLIST: &str = r#"
    SELECT l.*
    FROM listings l
    JOIN watchlist w ON w.listing_id = l.id
    WHERE w.user_id = $1
    ORDER BY w.created_at DESC
"#;

/// Issue lookup
pub const GET_ISSUE: &str = "SELECT * FROM issues WHERE id = $1";

/// All issues, newest first (moderator view)
pub const GET_ALL_ISSUES: &str = "SELECT * FROM issues ORDER BY created_at DESC";

/// Issues the user is a party to
pub const GET_ISSUES_FOR_USER: &str = r#"
    SELECT * FROM issues
    WHERE issuer_id = $1 OR issuee_id = $1
    ORDER BY created_at DESC
"#;

/// Responses in an issue thread, oldest first
pub const GET_ISSUE_RESPONSES: &str = r#"
    SELECT id, issue_id, author_id, moderator, body, created_at
    FROM issue_responses
    WHERE issue_id = $1
    ORDER BY created_at ASC
"#;

/// Application lookup
pub const GET_APPLICATION: &str = "SELECT * FROM applications WHERE id = $1";

/// All applications, newest first (moderator view)
pub const GET_ALL_APPLICATIONS: &str = "SELECT * FROM applications ORDER BY created_at DESC";
