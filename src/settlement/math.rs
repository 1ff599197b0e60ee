//! Settlement arithmetic. All amounts are integer minor units (cents) and
//! every fractional rate rounds down, so the sums below are exact and
//! reproducible.

use serde::Serialize;

/// Service fee: 5% of subtotal
const SERVICE_FEE_NUM: i64 = 5;
const SERVICE_FEE_DEN: i64 = 100;

/// Sales tax: 8.875% of subtotal
const TAX_NUM: i64 = 8875;
const TAX_DEN: i64 = 100_000;

/// VIP discount: 10% of the pre-discount total
const VIP_DISCOUNT_NUM: i64 = 10;
const VIP_DISCOUNT_DEN: i64 = 100;

/// Seller share: 90% of subtotal; the platform keeps the rest plus the
/// service fee and tax.
const SELLER_SHARE_NUM: i64 = 90;
const SELLER_SHARE_DEN: i64 = 100;

/// Line items for a checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutQuote {
    pub subtotal: i64,
    pub service_fee: i64,
    pub tax: i64,
    pub vip_discount: i64,
    pub total: i64,
    pub seller_credit: i64,
}

pub fn checkout_quote(subtotal: i64, vip: bool) -> CheckoutQuote {
    let service_fee = subtotal * SERVICE_FEE_NUM / SERVICE_FEE_DEN;
    let tax = subtotal * TAX_NUM / TAX_DEN;
    let pre_discount = subtotal + service_fee + tax;
    let vip_discount = if vip {
        pre_discount * VIP_DISCOUNT_NUM / VIP_DISCOUNT_DEN
    } else {
        0
    };
    CheckoutQuote {
        subtotal,
        service_fee,
        tax,
        vip_discount,
        total: pre_discount - vip_discount,
        seller_credit: subtotal * SELLER_SHARE_NUM / SELLER_SHARE_DEN,
    }
}

/// Compensating amounts for a refunded settlement: the buyer gets back the
/// full buyer-side total (no VIP discount applied), the seller is debited
/// their payout plus a 5% fee on that share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefundBreakdown {
    pub buyer_credit: i64,
    pub seller_debit: i64,
}

pub fn refund_breakdown(subtotal: i64) -> RefundBreakdown {
    let tax = subtotal * TAX_NUM / TAX_DEN;
    let service_fee = subtotal * SERVICE_FEE_NUM / SERVICE_FEE_DEN;
    let seller_share = subtotal * SELLER_SHARE_NUM / SELLER_SHARE_DEN;
    let seller_fee = seller_share * SERVICE_FEE_NUM / SERVICE_FEE_DEN;
    RefundBreakdown {
        buyer_credit: subtotal + tax + service_fee,
        seller_debit: seller_share + seller_fee,
    }
}

// region:    --- Tests


// endregion: --- Tests
