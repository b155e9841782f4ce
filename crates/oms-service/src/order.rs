//! Order placement, cancellation and settlement.
//!
//! Every balance-changing operation re-reads the order and the holdings it
//! touches on each attempt, applies the change in memory and hands the whole
//! result to [`OmsStore::commit`] as one unit. A stale holding version or an
//! order that left PENDING in the meantime fails the commit with `Conflict`,
//! which [`retrying`] turns into another attempt.

use std::sync::Arc;

use uuid::Uuid;

use oms_auth::{AuthorizationGuard, Principal};
use oms_domain::{
    OmsError, OmsStore, Order, OrderEvent, OrderFilter, OrderSide, OrderWrite, Page,
    PageRequest, Quantity, Shortfall, UnitOfWork, CASH_ASSET,
};

use crate::asset::AssetService;
use crate::retry::retrying;

pub const NOT_CANCELLABLE_MESSAGE: &str = "Only PENDING orders can be canceled";
pub const NOT_MATCHABLE_MESSAGE: &str = "Only PENDING orders can be matched";

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OmsStore>,
    assets: AssetService,
    guard: AuthorizationGuard,
    max_retries: i32,
}

impl OrderService {
    pub fn new(store: Arc<dyn OmsStore>, max_retries: i32) -> Self {
        Self {
            assets: AssetService::new(store.clone(), max_retries),
            store,
            guard: AuthorizationGuard,
            max_retries,
        }
    }

    pub async fn find_order(&self, order_id: Uuid) -> Result<Order, OmsError> {
        self.store
            .order(order_id)
            .await?
            .ok_or_else(|| OmsError::NotFound(format!("Order {order_id} not found")))
    }

    /// Reserve funds for `order` and store it as PENDING.
    pub async fn create_order(&self, order: Order) -> Result<Order, OmsError> {
        let amount = order.reserved_amount()?;
        retrying("create_order", self.max_retries, || {
            let order = order.clone();
            async move {
                let mut holding = self
                    .assets
                    .retrieve_customer_asset(order.customer_id, order.reserved_asset())
                    .await?;
                if let Err(shortfall) = holding.reserve(amount) {
                    tracing::warn!(
                        customer_id = %order.customer_id,
                        asset = %holding.asset_name,
                        %shortfall,
                        "order rejected"
                    );
                    return Err(OmsError::InsufficientFunds(format!(
                        "Insufficient {} usable balance to place {}",
                        holding.asset_name,
                        order.side.as_str()
                    )));
                }
                self.store
                    .commit(UnitOfWork {
                        assets: vec![holding],
                        order: OrderWrite::Insert(order.clone()),
                    })
                    .await?;
                tracing::info!(
                    order_id = %order.id,
                    customer_id = %order.customer_id,
                    side = order.side.as_str(),
                    asset = %order.asset_name,
                    size = %order.size,
                    price = %order.price,
                    "order placed"
                );
                Ok(order)
            }
        })
        .await
    }

    /// Release the reservation of a PENDING order and mark it CANCELED.
    /// Only the owner or an admin may cancel.
    pub async fn cancel_order(
        &self,
        principal: Option<&Principal>,
        order_id: Uuid,
    ) -> Result<Order, OmsError> {
        retrying("cancel_order", self.max_retries, || async move {
            let order = self.find_order(order_id).await?;
            self.guard
                .check_customer_access(principal, order.customer_id)?;
            let next = order.status.apply(OrderEvent::Cancel).map_err(|e| {
                tracing::warn!(%order_id, error = %e, "cancel rejected");
                OmsError::NotCancellable(NOT_CANCELLABLE_MESSAGE.to_string())
            })?;

            let amount = order.reserved_amount()?;
            let mut holding = self
                .assets
                .retrieve_customer_asset(order.customer_id, order.reserved_asset())
                .await?;
            if let Err(shortfall) = holding.release(amount) {
                return Err(inconsistent(&order, "cancel", &shortfall));
            }

            self.store
                .commit(UnitOfWork {
                    assets: vec![holding],
                    order: OrderWrite::Transition {
                        order_id,
                        from: order.status,
                        to: next,
                    },
                })
                .await?;
            tracing::info!(%order_id, customer_id = %order.customer_id, "order canceled");
            Ok(Order {
                status: next,
                ..order
            })
        })
        .await
    }

    /// Settle a PENDING order: burn the reservation, credit the counter
    /// asset (creating the holding if needed) and mark it MATCHED.
    pub async fn match_order(&self, order_id: Uuid) -> Result<Order, OmsError> {
        retrying("match_order", self.max_retries, || async move {
            let order = self.find_order(order_id).await?;
            let next = order.status.apply(OrderEvent::Match).map_err(|e| {
                tracing::warn!(%order_id, error = %e, "match rejected");
                OmsError::Validation(NOT_MATCHABLE_MESSAGE.to_string())
            })?;

            let amount = order.reserved_amount()?;
            let mut debited = self
                .assets
                .retrieve_customer_asset(order.customer_id, order.reserved_asset())
                .await?;
            if let Err(shortfall) = debited.burn_reserved(amount) {
                return Err(inconsistent(&order, "match", &shortfall));
            }

            let (credit_asset, credit_amount) = counter_leg(&order)?;
            let mut credited = self
                .assets
                .get_or_create_asset(order.customer_id, credit_asset)
                .await?;
            credited.credit(credit_amount).ok_or_else(|| {
                OmsError::Validation(format!("{credit_asset} balance would overflow"))
            })?;

            self.store
                .commit(UnitOfWork {
                    assets: vec![debited, credited],
                    order: OrderWrite::Transition {
                        order_id,
                        from: order.status,
                        to: next,
                    },
                })
                .await?;
            tracing::info!(
                %order_id,
                customer_id = %order.customer_id,
                side = order.side.as_str(),
                "order matched"
            );
            Ok(Order {
                status: next,
                ..order
            })
        })
        .await
    }

    pub async fn fetch_orders(
        &self,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> Result<Page<Order>, OmsError> {
        Ok(self.store.orders_page(filter, page).await?)
    }

    pub fn assets(&self) -> &AssetService {
        &self.assets
    }
}

/// What a match credits: the bought asset for BUY, cash for SELL.
fn counter_leg(order: &Order) -> Result<(&str, Quantity), OmsError> {
    match order.side {
        OrderSide::Buy => Ok((order.asset_name.as_str(), order.size)),
        OrderSide::Sell => Ok((CASH_ASSET, order.notional()?)),
    }
}

fn inconsistent(order: &Order, action: &str, shortfall: &Shortfall) -> OmsError {
    tracing::warn!(
        order_id = %order.id,
        asset = order.reserved_asset(),
        %shortfall,
        "reservation does not cover order"
    );
    OmsError::InconsistentReservation(format!(
        "Inconsistent {} reserved balance to {action} {}",
        order.reserved_asset(),
        order.side.as_str()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use oms_domain::Price;

    #[test]
    fn counter_leg_credits_bought_asset_or_cash() {
        let c = Uuid::new_v4();
        let size = Quantity::from_units(3).unwrap();
        let price = Price::from_units(2).unwrap();

        let buy = Order::place(c, "XYZ", OrderSide::Buy, size, price).unwrap();
        assert_eq!(counter_leg(&buy).unwrap(), ("XYZ", size));

        let sell = Order::place(c, "XYZ", OrderSide::Sell, size, price).unwrap();
        assert_eq!(
            counter_leg(&sell).unwrap(),
            (CASH_ASSET, Quantity::from_units(6).unwrap())
        );
    }

    #[test]
    fn inconsistent_message_names_reserved_asset() {
        let c = Uuid::new_v4();
        let size = Quantity::from_units(1).unwrap();
        let price = Price::from_units(1).unwrap();
        let shortfall = Shortfall {
            available: Quantity::ZERO,
            needed: size,
        };

        let buy = Order::place(c, "XYZ", OrderSide::Buy, size, price).unwrap();
        assert_eq!(
            inconsistent(&buy, "cancel", &shortfall).message(),
            "Inconsistent TRY reserved balance to cancel BUY"
        );
        let sell = Order::place(c, "XYZ", OrderSide::Sell, size, price).unwrap();
        assert_eq!(
            inconsistent(&sell, "match", &shortfall).message(),
            "Inconsistent XYZ reserved balance to match SELL"
        );
    }
}
