//! Order totals derived from a cart snapshot.
//!
//! Everything here is a pure function of its inputs: no clock, locale or
//! shared state is consulted, so the same cart and policy always price the
//! same way.

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Cart, CartLine};

/// Storefront pricing rules, in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingPolicy {
    discount_rate: Decimal,
    /// Subtotals strictly above this ship for free.
    pub free_shipping_threshold: i64,
    pub flat_shipping_fee: i64,
}

impl PricingPolicy {
    /// Builds a policy; `discount_rate` is clamped to `[0, 1]`.
    pub fn new(discount_rate: Decimal, free_shipping_threshold: i64, flat_shipping_fee: i64) -> Self {
        Self {
            discount_rate: discount_rate.clamp(Decimal::ZERO, Decimal::ONE),
            free_shipping_threshold,
            flat_shipping_fee,
        }
    }

    pub fn discount_rate(&self) -> Decimal {
        self.discount_rate
    }
}

impl Default for PricingPolicy {
    /// 10% promotion, free delivery above 20.00, otherwise 5.00.
    fn default() -> Self {
        Self::new(Decimal::new(10, 2), 2_000, 500)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PricingSummary {
    pub subtotal: i64,
    pub discount_amount: i64,
    pub shipping_fee: i64,
    pub grand_total: i64,
}

impl PricingSummary {
    /// What the shopper pays for the goods alone, before delivery.
    pub fn merchandise_total(&self) -> i64 {
        self.subtotal - self.discount_amount
    }
}

pub fn summarize(cart: &Cart, policy: &PricingPolicy) -> PricingSummary {
    summarize_lines(&cart.lines, policy)
}

pub fn summarize_lines(lines: &[CartLine], policy: &PricingPolicy) -> PricingSummary {
    let subtotal = subtotal(lines);
    let discount_amount = discount_for(subtotal, policy.discount_rate);
    let shipping_fee = if subtotal > policy.free_shipping_threshold {
        0
    } else {
        policy.flat_shipping_fee
    };
    let grand_total = (subtotal - discount_amount + shipping_fee).max(0);

    PricingSummary {
        subtotal,
        discount_amount,
        shipping_fee,
        grand_total,
    }
}

pub fn subtotal(lines: &[CartLine]) -> i64 {
    lines.iter().map(|line| line.line_subtotal).sum()
}

// rate is already within [0, 1], so the product never exceeds the subtotal
fn discount_for(subtotal: i64, rate: Decimal) -> i64 {
    if subtotal <= 0 {
        return 0;
    }
    (Decimal::from(subtotal) * rate)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .map_or(0, |discount| discount.min(subtotal))
}
