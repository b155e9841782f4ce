use std::sync::Arc;

use oms_auth::password::DEFAULT_COST;
use oms_auth::{hash_password_with_cost, verify_password, IssuedToken, TokenService};
use oms_domain::{Customer, OmsError, OmsStore, Role};

pub const CUSTOMER_NOT_FOUND: &str = "Customer not found";
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Clone)]
pub struct CustomerService {
    store: Arc<dyn OmsStore>,
    hash_cost: u32,
}

impl CustomerService {
    pub fn new(store: Arc<dyn OmsStore>) -> Self {
        Self {
            store,
            hash_cost: DEFAULT_COST,
        }
    }

    /// Lower bcrypt cost. Tests use this to keep hashing fast.
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Customer, OmsError> {
        self.store
            .customer_by_email(email)
            .await?
            .ok_or_else(|| OmsError::NotFound(CUSTOMER_NOT_FOUND.to_string()))
    }

    pub async fn find(&self, id: uuid::Uuid) -> Result<Customer, OmsError> {
        self.store
            .customer(id)
            .await?
            .ok_or_else(|| OmsError::NotFound(CUSTOMER_NOT_FOUND.to_string()))
    }

    /// Hash `password` and store a new customer.
    pub async fn register(&self, email: &str, role: Role, password: &str) -> Result<Customer, OmsError> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(OmsError::Validation("email: must be a well-formed email address".to_string()));
        }
        let customer = Customer::new(email, role, self.hash(password)?);
        self.insert(&customer).await?;
        Ok(customer)
    }

    pub fn hash(&self, password: &str) -> Result<String, OmsError> {
        hash_password_with_cost(password, self.hash_cost)
    }

    /// Store a customer built elsewhere (fixed ids for seeding).
    pub async fn insert(&self, customer: &Customer) -> Result<(), OmsError> {
        self.store.insert_customer(customer).await?;
        tracing::info!(customer_id = %customer.id, role = customer.role.as_str(), "customer registered");
        Ok(())
    }

    /// Check credentials and issue a bearer token.
    ///
    /// An unknown email is a 404 and a wrong password a 403.
    pub async fn login(
        &self,
        tokens: &TokenService,
        email: &str,
        password: &str,
    ) -> Result<IssuedToken, OmsError> {
        let customer = self.find_by_email(email).await?;
        if !verify_password(password, &customer.password_hash) {
            tracing::warn!(customer_id = %customer.id, "login rejected: bad password");
            return Err(OmsError::Forbidden(INVALID_CREDENTIALS.to_string()));
        }
        let token = tokens.issue(&customer)?;
        tracing::info!(customer_id = %customer.id, expires_at = %token.expires_at, "token issued");
        Ok(token)
    }
}
