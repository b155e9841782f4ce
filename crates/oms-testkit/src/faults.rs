//! Fault-injecting wrapper around [`InMemoryStore`].
//!
//! Lets tests lose optimistic-lock races on demand, either by having a
//! "concurrent writer" touch a holding just before a commit (so the commit
//! fails on a genuinely stale version) or by failing commits outright.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use oms_domain::{
    Asset, AssetFilter, Customer, OmsStore, Order, OrderFilter, Page, PageRequest, StoreError,
    StoreResult, UnitOfWork,
};

use crate::memory::InMemoryStore;

struct Race {
    customer_id: Uuid,
    asset_name: String,
    remaining: u32,
}

pub struct FaultyStore {
    inner: Arc<InMemoryStore>,
    race: Mutex<Option<Race>>,
    forced_conflicts: AtomicU32,
    backend_down: AtomicBool,
    commit_attempts: AtomicU32,
}

impl FaultyStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            race: Mutex::new(None),
            forced_conflicts: AtomicU32::new(0),
            backend_down: AtomicBool::new(false),
            commit_attempts: AtomicU32::new(0),
        }
    }

    pub fn inner(&self) -> &Arc<InMemoryStore> {
        &self.inner
    }

    /// Before each of the next `times` commits, another writer updates the
    /// given holding, leaving the caller's copy stale.
    pub fn race_on_asset(&self, customer_id: Uuid, asset_name: &str, times: u32) {
        let mut race = self.race.lock().unwrap_or_else(|p| p.into_inner());
        *race = Some(Race {
            customer_id,
            asset_name: asset_name.to_string(),
            remaining: times,
        });
    }

    /// Fail the next `times` commits with a conflict without touching data.
    pub fn fail_next_commits(&self, times: u32) {
        self.forced_conflicts.store(times, Ordering::SeqCst);
    }

    /// Every store call fails with a backend error while set.
    pub fn set_backend_down(&self, down: bool) {
        self.backend_down.store(down, Ordering::SeqCst);
    }

    pub fn commit_attempts(&self) -> u32 {
        self.commit_attempts.load(Ordering::SeqCst)
    }

    fn check_backend(&self) -> StoreResult<()> {
        if self.backend_down.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(anyhow::anyhow!(
                "connection refused (injected)"
            )));
        }
        Ok(())
    }

    fn run_race(&self) {
        let mut guard = self.race.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(race) = guard.as_mut() {
            if race.remaining > 0 {
                race.remaining -= 1;
                self.inner
                    .tamper_asset(race.customer_id, &race.asset_name, |_| {});
            }
        }
    }
}

#[async_trait]
impl OmsStore for FaultyStore {
    async fn customer_by_email(&self, email: &str) -> StoreResult<Option<Customer>> {
        self.check_backend()?;
        self.inner.customer_by_email(email).await
    }

    async fn customer(&self, id: Uuid) -> StoreResult<Option<Customer>> {
        self.check_backend()?;
        self.inner.customer(id).await
    }

    async fn insert_customer(&self, customer: &Customer) -> StoreResult<()> {
        self.check_backend()?;
        self.inner.insert_customer(customer).await
    }

    async fn asset(&self, customer_id: Uuid, asset_name: &str) -> StoreResult<Option<Asset>> {
        self.check_backend()?;
        self.inner.asset(customer_id, asset_name).await
    }

    async fn assets_page(
        &self,
        filter: &AssetFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Asset>> {
        self.check_backend()?;
        self.inner.assets_page(filter, page).await
    }

    async fn upsert_asset(&self, asset: &Asset) -> StoreResult<Asset> {
        self.check_backend()?;
        self.inner.upsert_asset(asset).await
    }

    async fn order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        self.check_backend()?;
        self.inner.order(id).await
    }

    async fn orders_page(
        &self,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Order>> {
        self.check_backend()?;
        self.inner.orders_page(filter, page).await
    }

    async fn commit(&self, work: UnitOfWork) -> StoreResult<()> {
        self.commit_attempts.fetch_add(1, Ordering::SeqCst);
        self.check_backend()?;

        let forced = self
            .forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if forced {
            return Err(StoreError::Conflict {
                entity: "asset",
                key: "injected".to_string(),
            });
        }

        self.run_race();
        self.inner.commit(work).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check_backend()
    }
}
