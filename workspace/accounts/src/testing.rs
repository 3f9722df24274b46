//! Shared fixtures for the crate's tests.

use std::sync::Arc;

use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};

use crate::manager::AccountManager;
use crate::storage::MemoryStorage;
use crate::store::AccountStore;

/// Media URL used by the in-memory storage of all fixtures.
pub const MEDIA_URL: &str = "/media/";

/// Create an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// A store over a fresh database and in-memory storage.
pub async fn memory_store() -> (AccountStore, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new(MEDIA_URL));
    let store = AccountStore::new(setup_test_db().await, storage.clone());
    (store, storage)
}

/// A manager over a fresh database and in-memory storage.
pub async fn memory_manager() -> (AccountManager, Arc<MemoryStorage>) {
    let (store, storage) = memory_store().await;
    (AccountManager::new(store), storage)
}
