use std::path::{Path, PathBuf};
use std::sync::Arc;

use accounts::{AccountManager, AccountStore, LocalFileStorage};
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use sea_orm::Database;
use serde::Deserialize;

/// Optional configuration file, looked up in the working directory.
pub const CONFIG_FILE: &str = "userbase.toml";

/// Prefix of environment variables overriding configuration values.
const ENV_PREFIX: &str = "USERBASE";

/// Application settings
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// Database URL, e.g. `sqlite://userbase.db?mode=rwc`
    pub database_url: String,
    /// Directory profile images are stored in
    pub media_root: PathBuf,
    /// Public base URL of `media_root`
    pub media_url: String,
}

impl Settings {
    /// Load settings from defaults, `userbase.toml` and `USERBASE_*` variables.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_sources(Path::new(CONFIG_FILE), Environment::with_prefix(ENV_PREFIX))
    }

    fn from_sources(file: &Path, env: Environment) -> Result<Self> {
        Config::builder()
            .set_default("database_url", "sqlite://userbase.db?mode=rwc")?
            .set_default("media_root", "media")?
            .set_default("media_url", "/media/")?
            .add_source(File::from(file).required(false))
            .add_source(env)
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

/// Application state shared by the commands
#[derive(Clone)]
pub struct AppState {
    pub manager: AccountManager,
}

/// Connect to the database and set up media storage
pub async fn initialize_app_state(settings: &Settings) -> Result<AppState> {
    tracing::info!("Connecting to database: {}", settings.database_url);
    let db = Database::connect(&settings.database_url)
        .await
        .with_context(|| format!("Failed to connect to '{}'", settings.database_url))?;

    tracing::debug!(
        "Storing media in {} served from {}",
        settings.media_root.display(),
        settings.media_url
    );
    let storage = Arc::new(LocalFileStorage::new(
        &settings.media_root,
        &settings.media_url,
    ));

    let manager = AccountManager::new(AccountStore::new(db, storage));
    Ok(AppState { manager })
}
