//! Application services over the [`oms_domain::OmsStore`] seam.
//!
//! Stateless apart from the store handle and configuration, so they are
//! cheap to clone into request handlers.

pub mod asset;
pub mod customer;
pub mod order;
pub mod retry;
pub mod seed;

pub use asset::AssetService;
pub use customer::{CustomerService, CUSTOMER_NOT_FOUND, INVALID_CREDENTIALS};
pub use order::{OrderService, NOT_CANCELLABLE_MESSAGE, NOT_MATCHABLE_MESSAGE};
pub use retry::{attempts_for, retrying};
pub use seed::{seed_demo_book, SeedReport, DEMO_ADMIN_ID, DEMO_CUSTOMER_ID};
