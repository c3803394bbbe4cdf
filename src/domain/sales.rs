//! Sale registration and point scoring.

use super::models::{from_record, to_record, NewSale, Sale};
use crate::collections::SALES;
use crate::database::Database;
use crate::error::{Result, StoreError};
use serde_json::Value;
use tracing::info;

/// Currency units per base point.
pub const AMOUNT_PER_POINT: f64 = 10.0;

/// Multiplier applied to cross-sell sales.
pub const CROSS_SELL_MULTIPLIER: i64 = 2;

/// Points a sale earns: one per full [`AMOUNT_PER_POINT`], doubled for
/// cross-sells.
///
/// `None` when the amount is negative, not finite, or earns more points
/// than an `i64` holds.
pub fn points_for_sale(amount: f64, is_cross_sell: bool) -> Option<i64> {
    if !amount.is_finite() || amount < 0.0 {
        return None;
    }

    let base = (amount / AMOUNT_PER_POINT).floor();
    // i64::MAX as f64 rounds up to 2^63, which is already out of range.
    if base >= i64::MAX as f64 {
        return None;
    }

    let base = base as i64;
    if is_cross_sell {
        base.checked_mul(CROSS_SELL_MULTIPLIER)
    } else {
        Some(base)
    }
}

impl Database {
    /// Record a sale and credit its points to the seller's ranking.
    ///
    /// The two writes are not atomic. The sale is written first; if crediting
    /// the points then fails, the error is returned and the sale stays.
    /// Amounts that cannot be scored are rejected before anything is written.
    pub fn register_sale(&self, sale: NewSale) -> Result<Sale> {
        let points = points_for_sale(sale.amount, sale.is_cross_sell).ok_or_else(|| {
            StoreError::InvalidRecord(format!(
                "sale amount must be a non-negative number within range, got {}",
                sale.amount
            ))
        })?;

        let mut fields = to_record(&sale)?;
        fields.insert("points_earned".into(), Value::from(points));

        let created: Sale = from_record(self.create(SALES, fields)?)?;
        info!(
            sale_id = created.id,
            user_id = created.user_id,
            points,
            "sale registered"
        );

        self.update_user_points(created.user_id, points)?;

        Ok(created)
    }
}
