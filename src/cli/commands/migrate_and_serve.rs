use anyhow::Result;
use tracing::{error, info, trace};

use super::{init_database, serve};
use crate::config::AppConfig;

pub async fn migrate_and_serve(config: AppConfig) -> Result<()> {
    trace!("Entering migrate_and_serve function");
    info!("Applying database migrations and starting server");

    if let Err(e) = init_database(&config).await {
        error!("Migrations failed; not starting the server");
        return Err(e);
    }

    serve(config).await
}
