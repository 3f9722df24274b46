//! Account holders: creation, credentials and profile images.

pub mod error;
pub mod manager;
pub mod password;
pub mod profile_image;
pub mod storage;
pub mod store;
pub mod validation;

#[cfg(test)]
mod testing;

pub use error::{AccountError, Result};
pub use manager::{AccountManager, ExtraFields};
pub use profile_image::ImageUpload;
pub use storage::{FileStorage, LocalFileStorage, MemoryStorage};
pub use store::AccountStore;
