// SPDX-License-Identifier: MIT

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use log::debug;
use serde::Deserialize;
use vsddev::prelude::DeviceConfig;
use vsdproto::prelude::RetryPolicy;

/// Where the link runs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkConfig {
    /// TCP address the device side listens on.
    pub listen: Option<String>,
    /// TCP address the host side connects to.
    pub connect: Option<String>,
    /// Serial device node, used by either side when set.
    pub serial: Option<PathBuf>,
    /// Host read timeout per frame.
    pub timeout_ms: u64,
    pub retries: u32,
    pub backoff_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            listen: None,
            connect: None,
            serial: None,
            timeout_ms: 1000,
            retries: policy.attempts - 1,
            backoff_ms: policy.backoff.as_millis() as u64,
        }
    }
}

impl LinkConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retries.saturating_add(1),
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    pub device: DeviceConfig,
    pub link: LinkConfig,
}

impl BridgeConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: BridgeConfig =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Loads `path`, or defaults when the file does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            debug!("no {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::from_file(path)
    }
}
