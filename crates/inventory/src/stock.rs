//! Stock aggregates and the sale admission rule.
//!
//! The only domain invariant of the inventory: for every product, cumulative
//! sales never exceed cumulative purchases. It is enforced when a sale is
//! inserted (never retroactively), by running [`admit_sale`] on totals read
//! inside the same transaction that inserts the sale.

use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult};

use crate::movement::{Purchase, Quantity, Sale};

/// Cumulative purchased and sold quantities for one product.
///
/// Both default to zero when no records exist, so an unknown product simply
/// has `StockTotals::ZERO`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockTotals {
    pub purchased: u64,
    pub sold: u64,
}

impl StockTotals {
    pub const ZERO: StockTotals = StockTotals {
        purchased: 0,
        sold: 0,
    };

    pub fn new(purchased: u64, sold: u64) -> Self {
        Self { purchased, sold }
    }

    /// Sum quantities from already-filtered records of one product.
    pub fn from_records<'a>(
        purchases: impl IntoIterator<Item = &'a Purchase>,
        sales: impl IntoIterator<Item = &'a Sale>,
    ) -> Self {
        let purchased = purchases
            .into_iter()
            .map(|p| u64::from(p.quantity))
            .fold(0u64, u64::saturating_add);
        let sold = sales
            .into_iter()
            .map(|s| u64::from(s.quantity))
            .fold(0u64, u64::saturating_add);
        Self { purchased, sold }
    }

    pub fn on_hand(&self) -> u64 {
        self.purchased.saturating_sub(self.sold)
    }
}

/// Outcome of an approved admission check.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    /// Cumulative sold quantity once the sale is committed.
    pub projected_sold: u64,
    /// Stock left on hand once the sale is committed.
    pub remaining: u64,
}

/// Decide whether selling `proposed` more units keeps sales within purchases.
///
/// Rejects iff `sold + proposed > purchased`; equality is admitted (selling
/// down to exactly zero). Overflowing the addition counts as exceeding stock.
pub fn admit_quantity(totals: StockTotals, proposed: u64) -> DomainResult<Admission> {
    let projected_sold = match totals.sold.checked_add(proposed) {
        Some(v) if v <= totals.purchased => v,
        _ => return Err(DomainError::stock_exceeded(proposed, totals.on_hand())),
    };

    Ok(Admission {
        projected_sold,
        remaining: totals.purchased - projected_sold,
    })
}

/// Typed entry point of the admission check for a validated sale quantity.
pub fn admit_sale(totals: StockTotals, proposed: Quantity) -> DomainResult<Admission> {
    admit_quantity(totals, u64::from(proposed))
}
