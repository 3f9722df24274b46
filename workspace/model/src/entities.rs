//! Root of the SeaORM entity modules.

pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::user::Entity as User;
}
