//! Limit orders and the rules a new order must satisfy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::asset::CASH_ASSET;
use crate::error::OmsError;
use crate::fixedpoint::{Price, Quantity};
use crate::types::{OrderSide, OrderStatus};

pub const ASSET_NAME_PATTERN: &str = "[A-Z0-9_]{2,16}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub asset_name: String,
    pub side: OrderSide,
    pub size: Quantity,
    pub price: Price,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Build a new PENDING order after validating every field.
    pub fn place(
        customer_id: Uuid,
        asset_name: &str,
        side: OrderSide,
        size: Quantity,
        price: Price,
    ) -> Result<Self, OmsError> {
        validate_asset_name(asset_name)?;
        if asset_name == CASH_ASSET {
            return Err(OmsError::Validation(format!(
                "assetName must not be the cash asset {CASH_ASSET}"
            )));
        }
        if !size.is_positive() {
            return Err(OmsError::Validation("size must be > 0".to_string()));
        }
        if !price.is_positive() {
            return Err(OmsError::Validation("price must be > 0".to_string()));
        }

        let order = Self {
            id: Uuid::new_v4(),
            customer_id,
            asset_name: asset_name.to_string(),
            side,
            size,
            price,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };
        // Reject up front rather than at reservation time.
        order.notional()?;
        Ok(order)
    }

    /// `price × size` in cash.
    pub fn notional(&self) -> Result<Quantity, OmsError> {
        self.price
            .notional(self.size)
            .ok_or_else(|| OmsError::Validation("order notional is out of range".to_string()))
    }

    /// Asset whose balance this order locks while PENDING.
    pub fn reserved_asset(&self) -> &str {
        match self.side {
            OrderSide::Buy => CASH_ASSET,
            OrderSide::Sell => &self.asset_name,
        }
    }

    /// Amount of [`Order::reserved_asset`] locked while PENDING.
    pub fn reserved_amount(&self) -> Result<Quantity, OmsError> {
        match self.side {
            OrderSide::Buy => self.notional(),
            OrderSide::Sell => Ok(self.size),
        }
    }
}

/// `[A-Z0-9_]{2,16}`, non-blank.
pub fn validate_asset_name(name: &str) -> Result<(), OmsError> {
    if name.trim().is_empty() {
        return Err(OmsError::Validation("assetName is required".to_string()));
    }
    let well_formed = (2..=16).contains(&name.len())
        && name
            .bytes()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == b'_');
    if !well_formed {
        return Err(OmsError::Validation(format!(
            "assetName must match {ASSET_NAME_PATTERN}"
        )));
    }
    Ok(())
}
