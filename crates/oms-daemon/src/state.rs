//! Shared application state handed to every handler.

use std::sync::Arc;

use oms_auth::{AdminAccount, AuthorizationGuard, TokenService};
use oms_config::{OmsConfig, ResolvedSecrets};
use oms_domain::OmsStore;
use oms_service::{AssetService, CustomerService, OrderService};

#[derive(Clone, Copy, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

pub struct AppState {
    pub build: BuildInfo,
    pub store: Arc<dyn OmsStore>,
    pub customers: CustomerService,
    pub assets: AssetService,
    pub orders: OrderService,
    pub tokens: TokenService,
    pub admin: AdminAccount,
    pub guard: AuthorizationGuard,
}

impl AppState {
    pub fn new(
        store: Arc<dyn OmsStore>,
        tokens: TokenService,
        admin: AdminAccount,
        max_retries: i32,
    ) -> Self {
        Self {
            build: BuildInfo {
                service: "oms-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            customers: CustomerService::new(store.clone()),
            assets: AssetService::new(store.clone(), max_retries),
            orders: OrderService::new(store.clone(), max_retries),
            store,
            tokens,
            admin,
            guard: AuthorizationGuard,
        }
    }

    pub fn from_config(store: Arc<dyn OmsStore>, config: &OmsConfig, secrets: &ResolvedSecrets) -> Self {
        let tokens = TokenService::new(&secrets.jwt_secret, config.security.jwt_ttl_seconds);
        let admin = match &secrets.admin_password {
            Some(pw) => AdminAccount::new(config.security.admin_user.clone(), Some(pw.clone())),
            None => AdminAccount::disabled(),
        };
        Self::new(
            store,
            tokens,
            admin,
            config.order_service.optimistic_lock_max_retries,
        )
    }
}
