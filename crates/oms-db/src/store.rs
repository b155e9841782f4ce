//! Postgres implementation of [`OmsStore`].
//!
//! Balance rows are guarded by `version`; order transitions by the expected
//! status. Zero rows touched means another writer got there first and the
//! whole unit of work is rolled back with `StoreError::Conflict`.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use oms_domain::{
    Asset, AssetFilter, Customer, OmsStore, Order, OrderFilter, OrderSide, OrderStatus,
    OrderWrite, Page, PageRequest, Price, Quantity, Role, StoreError, StoreResult, UnitOfWork,
};

const UNIQUE_VIOLATION: &str = "23505";

const ASSET_COLUMNS: &str =
    "id, customer_id, asset_name, usable_micros, reserved_micros, version, created_at";

const ORDER_COLUMNS: &str =
    "id, customer_id, asset_name, side, size_micros, price_e4, status, created_at";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
    } else {
        false
    }
}

fn customer_from_row(r: &PgRow) -> anyhow::Result<Customer> {
    Ok(Customer {
        id: r.try_get::<Uuid, _>("id")?,
        email: r.try_get::<String, _>("email")?,
        password_hash: r.try_get::<String, _>("password_hash")?,
        role: Role::parse(&r.try_get::<String, _>("role")?)?,
        created_at: r.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn asset_from_row(r: &PgRow) -> anyhow::Result<Asset> {
    Ok(Asset {
        id: Some(r.try_get::<Uuid, _>("id")?),
        customer_id: r.try_get::<Uuid, _>("customer_id")?,
        asset_name: r.try_get::<String, _>("asset_name")?,
        usable: Quantity::from_raw(r.try_get::<i64, _>("usable_micros")?),
        reserved: Quantity::from_raw(r.try_get::<i64, _>("reserved_micros")?),
        version: r.try_get::<i64, _>("version")?,
        created_at: r.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn order_from_row(r: &PgRow) -> anyhow::Result<Order> {
    Ok(Order {
        id: r.try_get::<Uuid, _>("id")?,
        customer_id: r.try_get::<Uuid, _>("customer_id")?,
        asset_name: r.try_get::<String, _>("asset_name")?,
        side: OrderSide::parse(&r.try_get::<String, _>("side")?)?,
        size: Quantity::from_raw(r.try_get::<i64, _>("size_micros")?),
        price: Price::from_raw(r.try_get::<i64, _>("price_e4")?),
        status: OrderStatus::parse(&r.try_get::<String, _>("status")?)?,
        created_at: r.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

/// `%`, `_` and `\` are literal in the needle.
fn like_contains(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_order_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
    qb.push(" where customer_id = ")
        .push_bind(filter.customer_id)
        .push(" and created_at >= ")
        .push_bind(filter.from)
        .push(" and created_at <= ")
        .push_bind(filter.to);
    if let Some(status) = filter.status {
        qb.push(" and status = ").push_bind(status.as_str());
    }
    if let Some(needle) = filter.asset_needle() {
        qb.push(" and lower(asset_name) like ")
            .push_bind(like_contains(&needle));
    }
}

fn push_asset_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &AssetFilter) {
    qb.push(" where customer_id = ")
        .push_bind(filter.customer_id)
        .push(" and created_at >= ")
        .push_bind(filter.from)
        .push(" and created_at <= ")
        .push_bind(filter.to);
}

fn push_paging(qb: &mut QueryBuilder<'_, Postgres>, page: PageRequest) {
    let dir = page.direction.as_sql();
    qb.push(format!(" order by created_at {dir}, id {dir} limit "))
        .push_bind(i64::from(page.size))
        .push(" offset ")
        .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));
}

async fn upsert_asset_on(conn: &mut PgConnection, asset: &Asset) -> StoreResult<Asset> {
    let key = || format!("{}/{}", asset.customer_id, asset.asset_name);

    let row = match asset.id {
        None => {
            let res = sqlx::query(&format!(
                r#"
                insert into asset (id, customer_id, asset_name, usable_micros, reserved_micros, version, created_at)
                values ($1, $2, $3, $4, $5, 0, $6)
                returning {ASSET_COLUMNS}
                "#
            ))
            .bind(Uuid::new_v4())
            .bind(asset.customer_id)
            .bind(&asset.asset_name)
            .bind(asset.usable.raw())
            .bind(asset.reserved.raw())
            .bind(asset.created_at)
            .fetch_one(&mut *conn)
            .await;

            match res {
                Ok(row) => row,
                // Someone else created the same holding since we looked.
                Err(e) if is_unique_violation(&e) => {
                    return Err(StoreError::Conflict {
                        entity: "asset",
                        key: key(),
                    })
                }
                Err(e) => return Err(anyhow::Error::new(e).context("insert asset failed").into()),
            }
        }
        Some(id) => {
            let row = sqlx::query(&format!(
                r#"
                update asset
                   set usable_micros = $3,
                       reserved_micros = $4,
                       version = version + 1
                 where id = $1 and version = $2
                returning {ASSET_COLUMNS}
                "#
            ))
            .bind(id)
            .bind(asset.version)
            .bind(asset.usable.raw())
            .bind(asset.reserved.raw())
            .fetch_optional(&mut *conn)
            .await
            .context("update asset failed")?;

            row.ok_or_else(|| StoreError::Conflict {
                entity: "asset",
                key: key(),
            })?
        }
    };

    Ok(asset_from_row(&row)?)
}

async fn write_order_on(conn: &mut PgConnection, write: &OrderWrite) -> StoreResult<()> {
    match write {
        OrderWrite::Insert(order) => {
            let res = sqlx::query(
                r#"
                insert into orders (id, customer_id, asset_name, side, size_micros, price_e4, status, created_at)
                values ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(order.id)
            .bind(order.customer_id)
            .bind(&order.asset_name)
            .bind(order.side.as_str())
            .bind(order.size.raw())
            .bind(order.price.raw())
            .bind(order.status.as_str())
            .bind(order.created_at)
            .execute(&mut *conn)
            .await;

            match res {
                Ok(_) => Ok(()),
                Err(e) if is_unique_violation(&e) => Err(StoreError::Duplicate {
                    entity: "order",
                    key: order.id.to_string(),
                }),
                Err(e) => Err(anyhow::Error::new(e).context("insert order failed").into()),
            }
        }
        OrderWrite::Transition { order_id, from, to } => {
            let res = sqlx::query("update orders set status = $3 where id = $1 and status = $2")
                .bind(order_id)
                .bind(from.as_str())
                .bind(to.as_str())
                .execute(&mut *conn)
                .await
                .context("update order status failed")?;

            if res.rows_affected() == 0 {
                return Err(StoreError::Conflict {
                    entity: "order",
                    key: order_id.to_string(),
                });
            }
            Ok(())
        }
    }
}

#[async_trait]
impl OmsStore for PgStore {
    async fn customer_by_email(&self, email: &str) -> StoreResult<Option<Customer>> {
        let row = sqlx::query(
            "select id, email, password_hash, role, created_at from customer where email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("customer_by_email query failed")?;

        Ok(row.as_ref().map(customer_from_row).transpose()?)
    }

    async fn customer(&self, id: Uuid) -> StoreResult<Option<Customer>> {
        let row = sqlx::query(
            "select id, email, password_hash, role, created_at from customer where id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("customer query failed")?;

        Ok(row.as_ref().map(customer_from_row).transpose()?)
    }

    async fn insert_customer(&self, customer: &Customer) -> StoreResult<()> {
        let res = sqlx::query(
            r#"
            insert into customer (id, email, password_hash, role, created_at)
            values ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(customer.id)
        .bind(&customer.email)
        .bind(&customer.password_hash)
        .bind(customer.role.as_str())
        .bind(customer.created_at)
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::Duplicate {
                entity: "customer",
                key: customer.email.clone(),
            }),
            Err(e) => Err(anyhow::Error::new(e).context("insert_customer failed").into()),
        }
    }

    async fn asset(&self, customer_id: Uuid, asset_name: &str) -> StoreResult<Option<Asset>> {
        let row = sqlx::query(&format!(
            "select {ASSET_COLUMNS} from asset where customer_id = $1 and asset_name = $2"
        ))
        .bind(customer_id)
        .bind(asset_name)
        .fetch_optional(&self.pool)
        .await
        .context("asset query failed")?;

        Ok(row.as_ref().map(asset_from_row).transpose()?)
    }

    async fn assets_page(
        &self,
        filter: &AssetFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Asset>> {
        let mut count = QueryBuilder::<Postgres>::new("select count(*)::bigint from asset");
        push_asset_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .context("assets_page count failed")?;

        let mut select = QueryBuilder::<Postgres>::new(format!("select {ASSET_COLUMNS} from asset"));
        push_asset_filter(&mut select, filter);
        push_paging(&mut select, page);
        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .context("assets_page query failed")?;

        let mut content = Vec::with_capacity(rows.len());
        for r in &rows {
            content.push(asset_from_row(r)?);
        }
        Ok(Page::from_parts(content, page, total.max(0) as u64))
    }

    async fn upsert_asset(&self, asset: &Asset) -> StoreResult<Asset> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("acquire connection failed")?;
        upsert_asset_on(&mut *conn, asset).await
    }

    async fn order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let row = sqlx::query(&format!("select {ORDER_COLUMNS} from orders where id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("order query failed")?;

        Ok(row.as_ref().map(order_from_row).transpose()?)
    }

    async fn orders_page(
        &self,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Order>> {
        let mut count = QueryBuilder::<Postgres>::new("select count(*)::bigint from orders");
        push_order_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .context("orders_page count failed")?;

        let mut select =
            QueryBuilder::<Postgres>::new(format!("select {ORDER_COLUMNS} from orders"));
        push_order_filter(&mut select, filter);
        push_paging(&mut select, page);
        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .context("orders_page query failed")?;

        let mut content = Vec::with_capacity(rows.len());
        for r in &rows {
            content.push(order_from_row(r)?);
        }
        Ok(Page::from_parts(content, page, total.max(0) as u64))
    }

    async fn commit(&self, work: UnitOfWork) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.context("begin tx failed")?;

        for asset in &work.assets {
            upsert_asset_on(&mut *tx, asset).await?;
        }
        write_order_on(&mut *tx, &work.order).await?;

        tx.commit().await.context("commit tx failed")?;
        tracing::debug!(assets = work.assets.len(), "unit of work committed");
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("select 1")
            .execute(&self.pool)
            .await
            .context("ping failed")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_needle_escapes_wildcards() {
        assert_eq!(like_contains("usd"), "%usd%");
        assert_eq!(like_contains("btc_"), "%btc\\_%");
        assert_eq!(like_contains("50%"), "%50\\%%");
    }
}
