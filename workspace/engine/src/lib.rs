//! Request-independent core of cardhub: identity, slug resolution,
//! authorization, quotas and licenses, plus the card and account services
//! built on them. Everything runs over `sea_orm::ConnectionTrait` so callers
//! choose between a plain connection and a transaction.

pub mod accounts;
pub mod authz;
pub mod cards;
pub mod error;
pub mod identity;
pub mod license;
pub mod password;
pub mod quota;
pub mod session;
pub mod slug;

#[cfg(test)]
mod testing;

pub use authz::{AuthorizationEngine, Decision, Grant, GrantPath};
pub use error::{EngineError, Result};
pub use identity::{Credentials, IdentityResolver, Principal};
pub use password::PasswordPolicy;
pub use session::SessionStore;
pub use slug::{ReservedWords, SlugResolution, SlugResolver};
