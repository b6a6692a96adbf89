use std::collections::BTreeMap;

use serde::Deserialize;
use callhub_core::error::{HubError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HubConfig {
    pub version: u32,

    #[serde(default)]
    pub hub: HubSection,

    /// consumer -> allowed method patterns
    #[serde(default)]
    pub acl: BTreeMap<String, Vec<String>>,
}

impl HubConfig {
    /// Config with default hub settings around an already-parsed ACL.
    pub fn with_acl(acl: BTreeMap<String, Vec<String>>) -> Self {
        Self { version: 1, hub: HubSection::default(), acl }
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(HubError::ConfigInvalid(format!(
                "unsupported config version: {}",
                self.version
            )));
        }
        if self.acl.is_empty() {
            return Err(HubError::ConfigInvalid("acl must not be empty".into()));
        }

        self.hub.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HubSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Queue depth per log subscriber.
    #[serde(default = "default_log_buffer")]
    pub log_buffer: usize,

    /// Queue depth per statistics subscriber.
    #[serde(default = "default_stats_buffer")]
    pub stats_buffer: usize,

    #[serde(default = "default_max_stat_interval_secs")]
    pub max_stat_interval_secs: u64,

    /// Fail startup when an exact ACL pattern names an unregistered service.
    #[serde(default)]
    pub strict_acl: bool,
}

impl Default for HubSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_buffer: default_log_buffer(),
            stats_buffer: default_stats_buffer(),
            max_stat_interval_secs: default_max_stat_interval_secs(),
            strict_acl: false,
        }
    }
}

impl HubSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=65536).contains(&self.log_buffer) {
            return Err(HubError::ConfigInvalid(
                "hub.log_buffer must be between 1 and 65536".into(),
            ));
        }
        if !(1..=1024).contains(&self.stats_buffer) {
            return Err(HubError::ConfigInvalid(
                "hub.stats_buffer must be between 1 and 1024".into(),
            ));
        }
        if self.max_stat_interval_secs == 0 {
            return Err(HubError::ConfigInvalid(
                "hub.max_stat_interval_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "127.0.0.1:8082".into()
}
fn default_log_buffer() -> usize {
    64
}
fn default_stats_buffer() -> usize {
    8
}
fn default_max_stat_interval_secs() -> u64 {
    3600
}
