//! Per-customer asset holdings.
//!
//! A holding splits into `usable` (free to trade) and `reserved` (locked by
//! PENDING orders). `size` is not stored on the struct: it is always
//! `usable + reserved`, so the two can never drift apart.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fixedpoint::Quantity;

/// The settlement currency every BUY is paid in.
pub const CASH_ASSET: &str = "TRY";

/// A balance move that would take a bucket below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortfall {
    pub available: Quantity,
    pub needed: Quantity,
}

impl fmt::Display for Shortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "needed {} but only {} available", self.needed, self.available)
    }
}

impl std::error::Error for Shortfall {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// `None` until the row has been stored.
    pub id: Option<Uuid>,
    pub customer_id: Uuid,
    pub asset_name: String,
    pub usable: Quantity,
    pub reserved: Quantity,
    /// Optimistic-lock version of the stored row. Ignored for new rows.
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Asset {
    pub fn new(
        customer_id: Uuid,
        asset_name: impl Into<String>,
        usable: Quantity,
        reserved: Quantity,
    ) -> Self {
        Self {
            id: None,
            customer_id,
            asset_name: asset_name.into(),
            usable,
            reserved,
            version: 0,
            created_at: Utc::now(),
        }
    }

    /// A zero-balance holding, used when a match credits an asset the
    /// customer has never held.
    pub fn empty(customer_id: Uuid, asset_name: impl Into<String>) -> Self {
        Self::new(customer_id, asset_name, Quantity::ZERO, Quantity::ZERO)
    }

    pub fn size(&self) -> Quantity {
        self.usable.saturating_add(self.reserved)
    }

    pub fn is_stored(&self) -> bool {
        self.id.is_some()
    }

    pub fn has_insufficient_funds(&self, needed: Quantity) -> bool {
        self.usable < needed
    }

    pub fn has_insufficient_reservation(&self, needed: Quantity) -> bool {
        self.reserved < needed
    }

    /// usable -> reserved.
    pub fn reserve(&mut self, amount: Quantity) -> Result<(), Shortfall> {
        if self.has_insufficient_funds(amount) {
            return Err(Shortfall {
                available: self.usable,
                needed: amount,
            });
        }
        self.usable = Quantity::from_raw(self.usable.raw() - amount.raw());
        self.reserved = self.reserved.saturating_add(amount);
        Ok(())
    }

    /// reserved -> usable.
    pub fn release(&mut self, amount: Quantity) -> Result<(), Shortfall> {
        if self.has_insufficient_reservation(amount) {
            return Err(Shortfall {
                available: self.reserved,
                needed: amount,
            });
        }
        self.reserved = Quantity::from_raw(self.reserved.raw() - amount.raw());
        self.usable = self.usable.saturating_add(amount);
        Ok(())
    }

    /// Remove `amount` from reserved without returning it to usable.
    pub fn burn_reserved(&mut self, amount: Quantity) -> Result<(), Shortfall> {
        if self.has_insufficient_reservation(amount) {
            return Err(Shortfall {
                available: self.reserved,
                needed: amount,
            });
        }
        self.reserved = Quantity::from_raw(self.reserved.raw() - amount.raw());
        Ok(())
    }

    /// Add `amount` to usable. `None` if the balance would overflow.
    pub fn credit(&mut self, amount: Quantity) -> Option<()> {
        self.usable = self.usable.checked_add(amount)?;
        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(n: i64) -> Quantity {
        Quantity::from_units(n).unwrap()
    }

    fn cash(usable: i64) -> Asset {
        Asset::new(Uuid::new_v4(), CASH_ASSET, units(usable), Quantity::ZERO)
    }

    #[test]
    fn size_is_usable_plus_reserved() {
        let mut a = cash(100);
        a.reserve(units(30)).unwrap();
        assert_eq!(a.usable, units(70));
        assert_eq!(a.reserved, units(30));
        assert_eq!(a.size(), units(100));
    }

    #[test]
    fn reserve_more_than_usable_fails_without_mutation() {
        let mut a = cash(10);
        let err = a.reserve(units(11)).unwrap_err();
        assert_eq!(err.available, units(10));
        assert_eq!(a.usable, units(10));
        assert_eq!(a.reserved, Quantity::ZERO);
    }

    #[test]
    fn release_returns_reservation_to_usable() {
        let mut a = cash(50);
        a.reserve(units(20)).unwrap();
        a.release(units(20)).unwrap();
        assert_eq!(a.usable, units(50));
        assert!(a.reserved.is_zero());
    }

    #[test]
    fn release_more_than_reserved_fails() {
        let mut a = cash(50);
        a.reserve(units(5)).unwrap();
        assert!(a.release(units(6)).is_err());
        assert_eq!(a.reserved, units(5));
    }

    #[test]
    fn burn_reserved_shrinks_size() {
        let mut a = cash(50);
        a.reserve(units(20)).unwrap();
        a.burn_reserved(units(20)).unwrap();
        assert_eq!(a.size(), units(30));
        assert!(a.reserved.is_zero());
    }

    #[test]
    fn credit_overflow_is_reported() {
        let mut a = Asset::empty(Uuid::new_v4(), "XYZ");
        a.usable = Quantity::MAX;
        assert_eq!(a.credit(Quantity::from_raw(1)), None);
    }
}
