//! Coupon discount computation. Pure, no I/O.

use crate::entities::CouponKind;
use crate::entities::coupons::Coupon;
use thiserror::Error;
use time::OffsetDateTime;

/// Why a coupon yields no discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DiscountRejection {
    #[error("this coupon is no longer active")]
    Inactive,
    #[error("this coupon has expired")]
    Expired,
    #[error("this coupon has reached its usage limit")]
    Exhausted,
    #[error("order subtotal is below the minimum of {minimum_cents} cents for this coupon")]
    BelowMinimum { minimum_cents: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscountOutcome {
    pub discount_cents: i64,
    pub rejection: Option<DiscountRejection>,
}

impl DiscountOutcome {
    fn rejected(reason: DiscountRejection) -> Self {
        Self {
            discount_cents: 0,
            rejection: Some(reason),
        }
    }

    pub fn is_applied(&self) -> bool {
        self.rejection.is_none()
    }
}

/// Compute the discount `coupon` grants on `subtotal_cents` at `now`.
///
/// Checks run in a fixed order: active, expiry, usage limit, minimum
/// purchase. The result never exceeds the subtotal.
pub fn compute_discount(coupon: &Coupon, subtotal_cents: i64, now: OffsetDateTime) -> DiscountOutcome {
    let subtotal = subtotal_cents.max(0);

    if !coupon.active {
        return DiscountOutcome::rejected(DiscountRejection::Inactive);
    }
    if coupon.expires_at.is_some_and(|expires_at| expires_at <= now) {
        return DiscountOutcome::rejected(DiscountRejection::Expired);
    }
    if coupon
        .usage_limit
        .is_some_and(|limit| coupon.usage_count >= limit)
    {
        return DiscountOutcome::rejected(DiscountRejection::Exhausted);
    }
    if let Some(minimum_cents) = coupon.min_purchase_cents
        && subtotal < minimum_cents
    {
        return DiscountOutcome::rejected(DiscountRejection::BelowMinimum { minimum_cents });
    }

    let discount = match coupon.kind {
        CouponKind::Percentage => {
            let percent = i128::from(coupon.value.clamp(0, 100));
            // floor; both operands are non-negative
            let raw = i128::from(subtotal) * percent / 100;
            let raw = i64::try_from(raw).unwrap_or(subtotal);
            match coupon.max_discount_cents {
                Some(max) => raw.min(max.max(0)),
                None => raw,
            }
        }
        CouponKind::Fixed => coupon.value.max(0).min(subtotal),
    };

    DiscountOutcome {
        discount_cents: discount.min(subtotal),
        rejection: None,
    }
}
