//! Demo book used by local runs and tests.
//!
//! Re-running is safe: rows that already exist are left as they are.

use uuid::Uuid;

use oms_domain::{Asset, Customer, OmsError, Quantity, Role, CASH_ASSET};

use crate::asset::AssetService;
use crate::customer::CustomerService;

pub const DEMO_CUSTOMER_ID: Uuid = Uuid::from_u128(1);
pub const DEMO_ADMIN_ID: Uuid = Uuid::from_u128(2);
pub const DEMO_CUSTOMER_EMAIL: &str = "customer@example.com";
pub const DEMO_ADMIN_EMAIL: &str = "admin@example.com";
pub const DEMO_SHARE_ASSET: &str = "XYZ";

const DEMO_CASH_UNITS: i64 = 100_000;
const DEMO_SHARE_UNITS: i64 = 1_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub customers_created: u32,
    pub assets_created: u32,
}

pub async fn seed_demo_book(
    customers: &CustomerService,
    assets: &AssetService,
    password: &str,
) -> Result<SeedReport, OmsError> {
    let mut report = SeedReport::default();

    for (id, email, role) in [
        (DEMO_CUSTOMER_ID, DEMO_CUSTOMER_EMAIL, Role::Customer),
        (DEMO_ADMIN_ID, DEMO_ADMIN_EMAIL, Role::Admin),
    ] {
        match customers.find(id).await {
            Ok(_) => continue,
            Err(OmsError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        let hash = customers.hash(password)?;
        let mut customer = Customer::new(email, role, hash);
        customer.id = id;
        customers.insert(&customer).await?;
        report.customers_created += 1;
    }

    for (name, units) in [(CASH_ASSET, DEMO_CASH_UNITS), (DEMO_SHARE_ASSET, DEMO_SHARE_UNITS)] {
        match assets.retrieve_customer_asset(DEMO_CUSTOMER_ID, name).await {
            Ok(_) => continue,
            Err(OmsError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        let usable = Quantity::from_units(units)
            .ok_or_else(|| OmsError::Internal("demo balance overflow".to_string()))?;
        assets
            .upsert_asset(&Asset::new(DEMO_CUSTOMER_ID, name, usable, Quantity::ZERO))
            .await?;
        report.assets_created += 1;
    }

    tracing::info!(
        customers_created = report.customers_created,
        assets_created = report.assets_created,
        "demo book seeded"
    );
    Ok(report)
}
