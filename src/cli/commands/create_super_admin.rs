use anyhow::{Context, Result};
use engine::accounts::{self, RegisterInput};
use tracing::{error, info, trace};

use crate::config::{AppConfig, build_app_state, connect_database};

pub async fn create_super_admin(
    config: AppConfig,
    email: String,
    name: String,
    password: String,
) -> Result<()> {
    trace!("Entering create_super_admin function");

    let db = connect_database(&config.database).await?;
    let state = build_app_state(db, config);

    let input = RegisterInput {
        name,
        email,
        password,
        template_id: None,
    };
    let admin = match accounts::create_super_admin(&state.db, state.accounts(), input).await {
        Ok(admin) => admin,
        Err(e) => {
            error!("Failed to create super admin: {}", e);
            return Err(e).context("create-super-admin failed");
        }
    };

    info!("Super admin {} created with id {}", admin.email, admin.id);
    Ok(())
}
