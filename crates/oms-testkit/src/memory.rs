//! In-process [`OmsStore`] with the same guard semantics as the Postgres
//! store: version-checked asset updates, status-checked order transitions
//! and all-or-nothing commits.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use oms_domain::{
    Asset, AssetFilter, Customer, OmsStore, Order, OrderFilter, OrderWrite, Page, PageRequest,
    SortDirection, StoreError, StoreResult, UnitOfWork,
};

#[derive(Default)]
struct State {
    customers: HashMap<Uuid, Customer>,
    assets: HashMap<(Uuid, String), Asset>,
    orders: HashMap<Uuid, Order>,
}

impl State {
    fn check_asset(&self, asset: &Asset) -> StoreResult<()> {
        let key = (asset.customer_id, asset.asset_name.clone());
        let conflict = || StoreError::Conflict {
            entity: "asset",
            key: format!("{}/{}", asset.customer_id, asset.asset_name),
        };
        match (asset.id, self.assets.get(&key)) {
            (None, None) => Ok(()),
            (None, Some(_)) => Err(conflict()),
            (Some(_), None) => Err(conflict()),
            (Some(id), Some(stored)) => {
                if stored.id == Some(id) && stored.version == asset.version {
                    Ok(())
                } else {
                    Err(conflict())
                }
            }
        }
    }

    fn apply_asset(&mut self, asset: &Asset) -> Asset {
        let mut stored = asset.clone();
        match stored.id {
            None => {
                stored.id = Some(Uuid::new_v4());
                stored.version = 0;
            }
            Some(_) => stored.version += 1,
        }
        self.assets.insert(
            (stored.customer_id, stored.asset_name.clone()),
            stored.clone(),
        );
        stored
    }

    fn check_order(&self, write: &OrderWrite) -> StoreResult<()> {
        match write {
            OrderWrite::Insert(order) => {
                if self.orders.contains_key(&order.id) {
                    return Err(StoreError::Duplicate {
                        entity: "order",
                        key: order.id.to_string(),
                    });
                }
                Ok(())
            }
            OrderWrite::Transition { order_id, from, .. } => match self.orders.get(order_id) {
                Some(o) if o.status == *from => Ok(()),
                _ => Err(StoreError::Conflict {
                    entity: "order",
                    key: order_id.to_string(),
                }),
            },
        }
    }

    fn apply_order(&mut self, write: OrderWrite) {
        match write {
            OrderWrite::Insert(order) => {
                self.orders.insert(order.id, order);
            }
            OrderWrite::Transition { order_id, to, .. } => {
                if let Some(o) = self.orders.get_mut(&order_id) {
                    o.status = to;
                }
            }
        }
    }
}

fn sorted_by_created<T: Clone>(
    mut items: Vec<T>,
    key: impl Fn(&T) -> (chrono::DateTime<chrono::Utc>, Uuid),
    direction: SortDirection,
) -> Vec<T> {
    items.sort_by_key(|t| key(t));
    if direction == SortDirection::Desc {
        items.reverse();
    }
    items
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend(anyhow::anyhow!("in-memory store poisoned")))
    }

    /// Overwrite a holding without any version check, bumping its version.
    /// Simulates a write made outside the services.
    pub fn tamper_asset(&self, customer_id: Uuid, asset_name: &str, edit: impl FnOnce(&mut Asset)) {
        let mut st = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(a) = st.assets.get_mut(&(customer_id, asset_name.to_string())) {
            edit(a);
            a.version += 1;
        }
    }

    pub fn order_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .orders
            .len()
    }
}

#[async_trait]
impl OmsStore for InMemoryStore {
    async fn customer_by_email(&self, email: &str) -> StoreResult<Option<Customer>> {
        let st = self.lock()?;
        Ok(st.customers.values().find(|c| c.email == email).cloned())
    }

    async fn customer(&self, id: Uuid) -> StoreResult<Option<Customer>> {
        Ok(self.lock()?.customers.get(&id).cloned())
    }

    async fn insert_customer(&self, customer: &Customer) -> StoreResult<()> {
        let mut st = self.lock()?;
        if st.customers.contains_key(&customer.id) {
            return Err(StoreError::Duplicate {
                entity: "customer",
                key: customer.id.to_string(),
            });
        }
        if st.customers.values().any(|c| c.email == customer.email) {
            return Err(StoreError::Duplicate {
                entity: "customer",
                key: customer.email.clone(),
            });
        }
        st.customers.insert(customer.id, customer.clone());
        Ok(())
    }

    async fn asset(&self, customer_id: Uuid, asset_name: &str) -> StoreResult<Option<Asset>> {
        let st = self.lock()?;
        Ok(st
            .assets
            .get(&(customer_id, asset_name.to_string()))
            .cloned())
    }

    async fn assets_page(
        &self,
        filter: &AssetFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Asset>> {
        let st = self.lock()?;
        let matching: Vec<Asset> = st
            .assets
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        let sorted = sorted_by_created(
            matching,
            |a| (a.created_at, a.id.unwrap_or_default()),
            page.direction,
        );
        Ok(page.slice(&sorted))
    }

    async fn upsert_asset(&self, asset: &Asset) -> StoreResult<Asset> {
        let mut st = self.lock()?;
        st.check_asset(asset)?;
        Ok(st.apply_asset(asset))
    }

    async fn order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        Ok(self.lock()?.orders.get(&id).cloned())
    }

    async fn orders_page(
        &self,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Order>> {
        let st = self.lock()?;
        let matching: Vec<Order> = st
            .orders
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        let sorted = sorted_by_created(matching, |o| (o.created_at, o.id), page.direction);
        Ok(page.slice(&sorted))
    }

    async fn commit(&self, work: UnitOfWork) -> StoreResult<()> {
        let mut st = self.lock()?;
        // Validate everything before touching anything.
        for asset in &work.assets {
            st.check_asset(asset)?;
        }
        st.check_order(&work.order)?;

        for asset in &work.assets {
            st.apply_asset(asset);
        }
        st.apply_order(work.order);
        Ok(())
    }
}
