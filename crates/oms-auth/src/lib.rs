//! Authentication and authorization: bearer tokens, password hashes, the
//! Basic admin account and the customer-access guard.

pub mod guard;
pub mod password;
pub mod principal;
pub mod token;

pub use guard::{AuthorizationGuard, ACCESS_DENIED_MESSAGE, UNAUTHENTICATED_MESSAGE};
pub use password::{hash_password, hash_password_with_cost, verify_password};
pub use principal::{AdminAccount, BasicCredentials, Principal};
pub use token::{Claims, IssuedToken, TokenService};
