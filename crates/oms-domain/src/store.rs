//! Persistence seam.
//!
//! Services talk to storage only through [`OmsStore`]. The Postgres store
//! and the in-memory test store both implement it, so every service path
//! runs unchanged against either.

use std::fmt;

use async_trait::async_trait;
use uuid::Uuid;

use crate::asset::Asset;
use crate::customer::Customer;
use crate::order::Order;
use crate::paging::{AssetFilter, OrderFilter, Page, PageRequest};
use crate::types::OrderStatus;

#[derive(Debug)]
pub enum StoreError {
    /// Row changed since it was read (stale version or unexpected status).
    Conflict { entity: &'static str, key: String },
    /// Unique key already present.
    Duplicate { entity: &'static str, key: String },
    Backend(anyhow::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Conflict { entity, key } => {
                write!(f, "concurrent modification of {entity} {key}")
            }
            StoreError::Duplicate { entity, key } => write!(f, "{entity} {key} already exists"),
            StoreError::Backend(e) => write!(f, "store backend error: {e:#}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<anyhow::Error> for StoreError {
    fn from(e: anyhow::Error) -> Self {
        StoreError::Backend(e)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The single order write in a [`UnitOfWork`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderWrite {
    Insert(Order),
    /// Applied only if the stored status is still `from`.
    Transition {
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    },
}

/// Asset upserts plus one order write, committed all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOfWork {
    pub assets: Vec<Asset>,
    pub order: OrderWrite,
}

#[async_trait]
pub trait OmsStore: Send + Sync {
    async fn customer_by_email(&self, email: &str) -> StoreResult<Option<Customer>>;

    async fn customer(&self, id: Uuid) -> StoreResult<Option<Customer>>;

    async fn insert_customer(&self, customer: &Customer) -> StoreResult<()>;

    async fn asset(&self, customer_id: Uuid, asset_name: &str) -> StoreResult<Option<Asset>>;

    async fn assets_page(&self, filter: &AssetFilter, page: PageRequest)
        -> StoreResult<Page<Asset>>;

    /// Insert when `asset.id` is `None`, else update guarded by `asset.version`.
    /// Returns the stored row with its new version.
    async fn upsert_asset(&self, asset: &Asset) -> StoreResult<Asset>;

    async fn order(&self, id: Uuid) -> StoreResult<Option<Order>>;

    async fn orders_page(&self, filter: &OrderFilter, page: PageRequest)
        -> StoreResult<Page<Order>>;

    async fn commit(&self, work: UnitOfWork) -> StoreResult<()>;

    /// Cheap liveness probe for health checks.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
