//! Closed enums shared by orders, customers and the wire format.
//!
//! Each enum stores as the same upper-case text it serializes to, so the DB
//! CHECK constraints, JSON bodies and query strings all agree.

use serde::{Deserialize, Serialize};

use crate::error::OmsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }

    pub fn parse(s: &str) -> Result<Self, OmsError> {
        match s {
            "BUY" => Ok(OrderSide::Buy),
            "SELL" => Ok(OrderSide::Sell),
            other => Err(OmsError::Validation(format!("invalid order side: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Matched,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Matched => "MATCHED",
            OrderStatus::Canceled => "CANCELED",
        }
    }

    pub fn parse(s: &str) -> Result<Self, OmsError> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "MATCHED" => Ok(OrderStatus::Matched),
            "CANCELED" => Ok(OrderStatus::Canceled),
            other => Err(OmsError::Validation(format!("invalid order status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
    #[serde(rename = "ROLE_CUSTOMER")]
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ROLE_ADMIN",
            Role::Customer => "ROLE_CUSTOMER",
        }
    }

    pub fn parse(s: &str) -> Result<Self, OmsError> {
        match s {
            "ROLE_ADMIN" => Ok(Role::Admin),
            "ROLE_CUSTOMER" => Ok(Role::Customer),
            other => Err(OmsError::Validation(format!("invalid role: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_forms_match_serde_forms() {
        for side in [OrderSide::Buy, OrderSide::Sell] {
            let json = serde_json::to_string(&side).unwrap();
            assert_eq!(json, format!("\"{}\"", side.as_str()));
            assert_eq!(OrderSide::parse(side.as_str()).unwrap(), side);
        }
        for status in [OrderStatus::Pending, OrderStatus::Matched, OrderStatus::Canceled] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            assert_eq!(OrderStatus::parse(status.as_str()).unwrap(), status);
        }
        for role in [Role::Admin, Role::Customer] {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
            assert_eq!(Role::parse(role.as_str()).unwrap(), role);
        }
    }

    #[test]
    fn parse_is_case_sensitive() {
        assert!(OrderSide::parse("buy").is_err());
        assert!(OrderStatus::parse("pending").is_err());
    }
}
