//! Hub config loader (strict parsing).

pub mod schema;

use std::fs;

use callhub_core::error::{HubError, Result};

pub use schema::{HubConfig, HubSection};

pub fn load_from_file(path: &str) -> Result<HubConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| HubError::ConfigInvalid(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<HubConfig> {
    let cfg: HubConfig = serde_yaml::from_str(s)
        .map_err(|e| HubError::ConfigInvalid(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
