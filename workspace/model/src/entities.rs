//! Root of the SeaORM entity modules.

pub mod card;
pub mod enterprise;
pub mod license_request;
pub mod session;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::card::Entity as Card;
    pub use super::enterprise::Entity as Enterprise;
    pub use super::license_request::Entity as LicenseRequest;
    pub use super::session::Entity as Session;
    pub use super::user::Entity as User;
}
