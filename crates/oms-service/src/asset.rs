use std::sync::Arc;

use uuid::Uuid;

use oms_domain::{
    validate_asset_name, Asset, AssetFilter, OmsError, OmsStore, Page, PageRequest, Quantity,
};

use crate::customer::CUSTOMER_NOT_FOUND;
use crate::retry::retrying;

#[derive(Clone)]
pub struct AssetService {
    store: Arc<dyn OmsStore>,
    max_retries: i32,
}

impl AssetService {
    pub fn new(store: Arc<dyn OmsStore>, max_retries: i32) -> Self {
        Self { store, max_retries }
    }

    pub async fn retrieve_customer_asset(
        &self,
        customer_id: Uuid,
        asset_name: &str,
    ) -> Result<Asset, OmsError> {
        self.store
            .asset(customer_id, asset_name)
            .await?
            .ok_or_else(|| OmsError::NotFound(format!("{asset_name} asset not found")))
    }

    pub async fn fetch_customer_assets(
        &self,
        filter: &AssetFilter,
        page: PageRequest,
    ) -> Result<Page<Asset>, OmsError> {
        Ok(self.store.assets_page(filter, page).await?)
    }

    /// Version-checked write of a single holding. A stale copy fails with
    /// `Conflict`.
    pub async fn upsert_asset(&self, asset: &Asset) -> Result<Asset, OmsError> {
        let stored = self.store.upsert_asset(asset).await?;
        tracing::debug!(
            customer_id = %stored.customer_id,
            asset = %stored.asset_name,
            version = stored.version,
            "asset written"
        );
        Ok(stored)
    }

    /// The stored holding, or an unsaved zero-balance one.
    pub async fn get_or_create_asset(
        &self,
        customer_id: Uuid,
        asset_name: &str,
    ) -> Result<Asset, OmsError> {
        Ok(self
            .store
            .asset(customer_id, asset_name)
            .await?
            .unwrap_or_else(|| Asset::empty(customer_id, asset_name)))
    }

    /// Credit `amount` to usable, creating the holding if needed. The
    /// customer must exist.
    pub async fn deposit(
        &self,
        customer_id: Uuid,
        asset_name: &str,
        amount: Quantity,
    ) -> Result<Asset, OmsError> {
        validate_asset_name(asset_name)?;
        if !amount.is_positive() {
            return Err(OmsError::Validation("amount must be > 0".to_string()));
        }
        if self.store.customer(customer_id).await?.is_none() {
            return Err(OmsError::NotFound(CUSTOMER_NOT_FOUND.to_string()));
        }
        retrying("deposit", self.max_retries, || async {
            let mut asset = self.get_or_create_asset(customer_id, asset_name).await?;
            asset
                .credit(amount)
                .ok_or_else(|| OmsError::Validation("deposit overflows balance".to_string()))?;
            self.upsert_asset(&asset).await
        })
        .await
    }
}
