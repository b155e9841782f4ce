//! Order listing filters against Postgres: required-only, by status, by
//! case-insensitive substring (with literal `_`), and combined.
//!
//! DB-backed test. Skips if `OMS_DATABASE_URL` is not set.

use chrono::{Duration, Utc};
use oms_db::PgStore;
use oms_domain::{
    Customer, OmsStore, Order, OrderFilter, OrderSide, OrderStatus, OrderWrite, PageRequest,
    Price, Quantity, Role, SortDirection, UnitOfWork,
};
use uuid::Uuid;

async fn insert(store: &PgStore, customer: Uuid, name: &str, status: OrderStatus) -> Order {
    let mut o = Order::place(
        customer,
        name,
        OrderSide::Buy,
        Quantity::from_units(1).unwrap(),
        Price::from_units(1).unwrap(),
    )
    .unwrap();
    o.status = status;
    store
        .commit(UnitOfWork {
            assets: vec![],
            order: OrderWrite::Insert(o.clone()),
        })
        .await
        .unwrap();
    o
}

#[tokio::test]
async fn filters_compose() -> anyhow::Result<()> {
    let url = match std::env::var(oms_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: OMS_DATABASE_URL not set");
            return Ok(());
        }
    };
    let pool = oms_db::connect(&url, 2).await?;
    oms_db::migrate(&pool).await?;
    let store = PgStore::new(pool);

    let c = Customer::new(
        format!("filter-{}@example.com", Uuid::new_v4()),
        Role::Customer,
        "$2b$04$notarealhashnotarealhashnotarealhashnotarealhas",
    );
    store.insert_customer(&c).await?;

    insert(&store, c.id, "BTC_USDT", OrderStatus::Pending).await;
    insert(&store, c.id, "BTCXUSDT", OrderStatus::Matched).await;
    insert(&store, c.id, "XYZ", OrderStatus::Pending).await;

    let now = Utc::now();
    let base = OrderFilter::new(c.id, now - Duration::hours(1), now + Duration::hours(1));
    let page = PageRequest::new(0, 50, SortDirection::Desc);

    let all = store.orders_page(&base, page).await?;
    assert_eq!(all.total_elements, 3);

    let pending = store
        .orders_page(&base.clone().with_status(Some(OrderStatus::Pending)), page)
        .await?;
    assert_eq!(pending.total_elements, 2);

    // `_` is literal: BTCXUSDT must not match "c_u".
    let sub = store
        .orders_page(&base.clone().with_asset_name(Some("c_u")), page)
        .await?;
    assert_eq!(sub.total_elements, 1);
    assert_eq!(sub.content[0].asset_name, "BTC_USDT");

    let combined = store
        .orders_page(
            &base
                .clone()
                .with_status(Some(OrderStatus::Matched))
                .with_asset_name(Some("btc")),
            page,
        )
        .await?;
    assert_eq!(combined.total_elements, 1);
    assert_eq!(combined.content[0].asset_name, "BTCXUSDT");

    let tiny = store
        .orders_page(&base, PageRequest::new(1, 2, SortDirection::Asc))
        .await?;
    assert_eq!(tiny.content.len(), 1);
    assert_eq!(tiny.total_pages, 2);
    assert!(tiny.last);

    Ok(())
}
