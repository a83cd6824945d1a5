use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use tracing::{debug, error, info, trace};

use crate::config::{AppConfig, connect_database};

pub async fn init_database(config: &AppConfig) -> Result<()> {
    trace!("Entering init_database function");
    info!("Initializing database");

    let db = match connect_database(&config.database).await {
        Ok(connection) => {
            info!("Successfully connected to database");
            connection
        }
        Err(e) => {
            error!("{}", e);
            return Err(e);
        }
    };

    info!("Running database migrations");
    match Migrator::up(&db, None).await {
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
    Ok(())
}
