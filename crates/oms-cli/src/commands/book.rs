//! Operator commands against the order book: customers, deposits, matching
//! and the demo seed. Output is `key=value` lines on stdout.

use anyhow::{Context, Result};
use uuid::Uuid;

use oms_domain::Quantity;
use oms_service::{seed_demo_book, AssetService, CustomerService, OrderService};

use super::{connect_store, domain, parse_role, secret_from_env};

pub async fn customer_add(email: &str, role: &str, password_env: &str) -> Result<()> {
    let role = parse_role(role)?;
    let password = secret_from_env(password_env)?;
    let store = connect_store().await?;

    let customer = CustomerService::new(store)
        .register(email, role, &password)
        .await
        .map_err(domain)?;
    println!("customer_id={}", customer.id);
    println!("email={}", customer.email);
    println!("role={}", customer.role.as_str());
    Ok(())
}

pub async fn asset_deposit(customer_id: &str, asset: &str, amount: &str, max_retries: i32) -> Result<()> {
    let customer_id = Uuid::parse_str(customer_id).context("invalid customer_id uuid")?;
    let amount = Quantity::parse(amount, "amount").map_err(domain)?;
    let store = connect_store().await?;

    let stored = AssetService::new(store, max_retries)
        .deposit(customer_id, asset, amount)
        .await
        .map_err(domain)?;
    println!("customer_id={}", stored.customer_id);
    println!("asset={}", stored.asset_name);
    println!("usable={}", stored.usable);
    println!("reserved={}", stored.reserved);
    println!("size={}", stored.size());
    Ok(())
}

pub async fn order_match(order_id: &str, max_retries: i32) -> Result<()> {
    let order_id = Uuid::parse_str(order_id).context("invalid order_id uuid")?;
    let store = connect_store().await?;

    let order = OrderService::new(store, max_retries)
        .match_order(order_id)
        .await
        .map_err(domain)?;
    println!("order_id={} status={}", order.id, order.status.as_str());
    Ok(())
}

pub async fn seed_demo(password_env: &str, max_retries: i32) -> Result<()> {
    let password = secret_from_env(password_env)?;
    let store = connect_store().await?;

    let report = seed_demo_book(
        &CustomerService::new(store.clone()),
        &AssetService::new(store, max_retries),
        &password,
    )
    .await
    .map_err(domain)?;
    println!("customers_created={}", report.customers_created);
    println!("assets_created={}", report.assets_created);
    println!("demo_customer_id={}", oms_service::DEMO_CUSTOMER_ID);
    Ok(())
}
