use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, DatabaseConnection};
use tracing::{debug, error, info, trace};

/// Apply all pending migrations.
pub async fn init_database(db: &DatabaseConnection) -> Result<()> {
    trace!("Entering init_database function");
    info!("Initializing database");
    debug!("Database backend: {:?}", db.get_database_backend());

    info!("Running database migrations");
    trace!("Executing migration up command");
    match Migrator::up(db, None).await {
        Ok(_) => {
            info!("Database migrations completed successfully");
            debug!("All pending migrations have been applied");
        }
        Err(e) => {
            error!("Failed to run database migrations: {}", e);
            return Err(e.into());
        }
    }

    info!("Database initialization completed successfully!");
    trace!("init_database function completed");

    Ok(())
}
