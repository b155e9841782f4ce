//! Core OMS domain: fixed-point money, holdings, orders and their lifecycle,
//! errors, paging and the storage seam.
//!
//! Pure and deterministic apart from id/time stamping in constructors. No IO.

pub mod asset;
pub mod customer;
pub mod error;
pub mod fixedpoint;
pub mod lifecycle;
pub mod order;
pub mod paging;
pub mod store;
pub mod types;

pub use asset::{Asset, Shortfall, CASH_ASSET};
pub use customer::Customer;
pub use error::{OmsError, CONCURRENT_UPDATE_MESSAGE};
pub use fixedpoint::{Price, Quantity, PRICE_SCALE, QUANTITY_SCALE};
pub use lifecycle::{OrderEvent, TransitionError};
pub use order::{validate_asset_name, Order, ASSET_NAME_PATTERN};
pub use paging::{AssetFilter, OrderFilter, Page, PageRequest, SortDirection};
pub use store::{OmsStore, OrderWrite, StoreError, StoreResult, UnitOfWork};
pub use types::{OrderSide, OrderStatus, Role};
