//! Chronological stock ledger: purchases and sales of one product merged into
//! a single ordered sequence.
//!
//! Rows are ordered by `(timestamp, kind, id)` where purchases sort before
//! sales on equal timestamps. Every record yields exactly one row; rows are
//! never coalesced. The unit price is the product's price at query time,
//! not a snapshot taken when the movement was recorded.

use core::cmp::Ordering;
use core::iter::Peekable;
use std::vec::IntoIter;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::movement::{Purchase, Sale};

/// Discriminator of a ledger row. Declaration order is the tie-break order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerEntryKind {
    Purchase,
    Sale,
}

/// One row of the ledger view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub id: Uuid,
    pub quantity: u32,
    #[serde(rename = "type")]
    pub kind: LedgerEntryKind,
    pub timestamp: DateTime<Utc>,
    pub unit_price: u64,
}

impl LedgerRow {
    fn sort_key(&self) -> (DateTime<Utc>, LedgerEntryKind, Uuid) {
        (self.timestamp, self.kind, self.id)
    }
}

impl PartialOrd for LedgerRow {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LedgerRow {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key()
            .cmp(&other.sort_key())
            .then_with(|| self.quantity.cmp(&other.quantity))
            .then_with(|| self.unit_price.cmp(&other.unit_price))
    }
}

/// Lazy merge of two sorted row streams.
///
/// Finite and single-pass: once exhausted it stays exhausted. Rebuild it
/// (e.g. by querying again) to iterate a second time.
#[derive(Debug)]
pub struct LedgerMerge {
    purchases: Peekable<IntoIter<LedgerRow>>,
    sales: Peekable<IntoIter<LedgerRow>>,
}

impl LedgerMerge {
    /// A merge that yields nothing (e.g. the product does not exist).
    pub fn empty() -> Self {
        Self {
            purchases: Vec::new().into_iter().peekable(),
            sales: Vec::new().into_iter().peekable(),
        }
    }
}

impl Iterator for LedgerMerge {
    type Item = LedgerRow;

    fn next(&mut self) -> Option<Self::Item> {
        let take_purchase = match (self.purchases.peek(), self.sales.peek()) {
            (Some(p), Some(s)) => p <= s,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => return None,
        };

        if take_purchase {
            self.purchases.next()
        } else {
            self.sales.next()
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.purchases.len() + self.sales.len();
        (n, Some(n))
    }
}

impl ExactSizeIterator for LedgerMerge {}

impl core::iter::FusedIterator for LedgerMerge {}

/// Build the ledger of one product from its purchase and sale records.
///
/// Inputs need not be pre-sorted and must already be filtered to the product.
pub fn merge_ledger(purchases: Vec<Purchase>, sales: Vec<Sale>, unit_price: u64) -> LedgerMerge {
    let mut purchase_rows: Vec<LedgerRow> = purchases
        .into_iter()
        .map(|p| LedgerRow {
            id: *p.id.as_uuid(),
            quantity: p.quantity.get(),
            kind: LedgerEntryKind::Purchase,
            timestamp: p.purchase_date,
            unit_price,
        })
        .collect();
    let mut sale_rows: Vec<LedgerRow> = sales
        .into_iter()
        .map(|s| LedgerRow {
            id: *s.id.as_uuid(),
            quantity: s.quantity.get(),
            kind: LedgerEntryKind::Sale,
            timestamp: s.sales_date,
            unit_price,
        })
        .collect();

    purchase_rows.sort();
    sale_rows.sort();

    LedgerMerge {
        purchases: purchase_rows.into_iter().peekable(),
        sales: sale_rows.into_iter().peekable(),
    }
}
