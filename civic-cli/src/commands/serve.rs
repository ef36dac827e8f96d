use anyhow::{Context, Result};
use std::path::Path;

use civic_cms::prelude::*;

use crate::utils;

pub async fn execute(config_path: Option<&Path>) -> Result<()> {
    let config = utils::load_config(config_path)?;
    init_tracing(&config).context("Failed to initialize tracing")?;

    let state = AppState::from_config(config.clone())
        .await
        .context("Failed to build application state")?;

    utils::info(&format!(
        "Serving audit routes for {} on port {}",
        config.service.name, config.service.port
    ));

    Server::new(config)
        .serve(router(state))
        .await
        .context("Server stopped with an error")?;

    Ok(())
}
