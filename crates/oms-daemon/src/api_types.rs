//! Request and response bodies for every oms-daemon HTTP endpoint.
//!
//! JSON field names are camelCase. Amounts travel as decimal strings. No
//! business logic lives here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use oms_domain::{Asset, Order, OrderSide, OrderStatus, Page, Price, Quantity};

// ---------------------------------------------------------------------------
// /actuator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "UP" or "DOWN".
    pub status: String,
}

// ---------------------------------------------------------------------------
// /api/v1/auth/login
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token_type: String,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Orders and assets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub asset_name: String,
    pub status: OrderStatus,
    pub side: OrderSide,
    pub size: Quantity,
    pub price: Price,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        Self {
            order_id: o.id,
            customer_id: o.customer_id,
            asset_name: o.asset_name,
            status: o.status,
            side: o.side,
            size: o.size,
            price: o.price,
            created_at: o.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetResponse {
    pub customer_id: Uuid,
    pub asset_name: String,
    pub size: Quantity,
    pub usable: Quantity,
    pub reserved: Quantity,
}

impl From<Asset> for AssetResponse {
    fn from(a: Asset) -> Self {
        Self {
            size: a.size(),
            customer_id: a.customer_id,
            asset_name: a.asset_name,
            usable: a.usable,
            reserved: a.reserved,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResponse<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
    pub first: bool,
    pub last: bool,
}

impl<T> PagedResponse<T> {
    pub fn from_page<U>(page: Page<U>) -> Self
    where
        T: From<U>,
    {
        let page = page.map(T::from);
        Self {
            content: page.content,
            page: page.page,
            size: page.size,
            total_elements: page.total_elements,
            total_pages: page.total_pages,
            first: page.first,
            last: page.last,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub timestamp: DateTime<Utc>,
    pub status: u16,
    /// HTTP reason phrase, e.g. "Bad Request".
    pub error: String,
    pub message: String,
    pub path: String,
}
