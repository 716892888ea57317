//! Discovery configuration.
//!
//! Environment variables:
//! - `DEVDISC_EXPOSE_HOST` (`1`/`0`): append the built-in host device when no
//!   backend reports one. Default off: results hold exactly what the
//!   backends report.
//! - `DEVDISC_TOLERATE_UNAVAILABLE` (`1`/`0`): skip unreachable backends
//!   instead of failing enumeration. Default off.
//! - `DEVDISC_DEVICE_TYPE`: comma-separated classes to keep visible
//!   (`host,cpu,gpu,acc`); `all` or `*` disables filtering.

use std::env;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::class::DeviceClass;
use crate::error::{DiscoveryError, Result};

pub const ENV_EXPOSE_HOST: &str = "DEVDISC_EXPOSE_HOST";
pub const ENV_TOLERATE_UNAVAILABLE: &str = "DEVDISC_TOLERATE_UNAVAILABLE";
pub const ENV_DEVICE_TYPE: &str = "DEVDISC_DEVICE_TYPE";

/// Enumeration policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Append [`Device::host`](crate::Device::host) when no backend reports a
    /// host device.
    pub expose_host_device: bool,
    pub tolerate_unavailable_backends: bool,
    /// `None` keeps every class visible.
    pub visible_classes: Option<Vec<DeviceClass>>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            expose_host_device: false,
            tolerate_unavailable_backends: false,
            visible_classes: None,
        }
    }
}

impl DiscoveryConfig {
    /// Read the environment, falling back to defaults on malformed values.
    pub fn from_env() -> Self {
        match Self::try_from_env() {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, "ignoring malformed discovery environment; using defaults");
                Self::default()
            }
        }
    }

    /// Read the environment, reporting malformed values.
    pub fn try_from_env() -> Result<Self> {
        let defaults = Self::default();
        let visible_classes = match read_var(ENV_DEVICE_TYPE)? {
            Some(value) => parse_class_list(&value)?,
            None => defaults.visible_classes,
        };
        Ok(Self {
            expose_host_device: read_bool(ENV_EXPOSE_HOST)?
                .unwrap_or(defaults.expose_host_device),
            tolerate_unavailable_backends: read_bool(ENV_TOLERATE_UNAVAILABLE)?
                .unwrap_or(defaults.tolerate_unavailable_backends),
            visible_classes,
        })
    }

    pub fn with_expose_host_device(mut self, expose: bool) -> Self {
        self.expose_host_device = expose;
        self
    }

    pub fn with_tolerate_unavailable_backends(mut self, tolerate: bool) -> Self {
        self.tolerate_unavailable_backends = tolerate;
        self
    }

    pub fn with_visible_classes(mut self, classes: impl IntoIterator<Item = DeviceClass>) -> Self {
        let mut visible: Vec<DeviceClass> = classes.into_iter().collect();
        visible.sort_unstable();
        visible.dedup();
        self.visible_classes = Some(visible);
        self
    }

    /// Whether devices of `class` survive the visibility filter.
    pub fn is_visible(&self, class: DeviceClass) -> bool {
        self.visible_classes.as_ref().is_none_or(|visible| visible.contains(&class))
    }
}

fn read_var(name: &str) -> Result<Option<String>> {
    match env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(DiscoveryError::InvalidConfig {
            message: format!("{name} is not valid unicode"),
        }),
    }
}

fn read_bool(name: &str) -> Result<Option<bool>> {
    let Some(value) = read_var(name)? else {
        return Ok(None);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        other => Err(DiscoveryError::InvalidConfig {
            message: format!("{name}={other} is not a boolean"),
        }),
    }
}

/// Parse `host,cpu,...`. `all`, `*` or an empty list means no filter.
pub fn parse_class_list(value: &str) -> Result<Option<Vec<DeviceClass>>> {
    let mut classes = Vec::new();
    for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if part == "*" || part.eq_ignore_ascii_case("all") {
            return Ok(None);
        }
        let class: DeviceClass = part
            .parse()
            .map_err(|err| DiscoveryError::InvalidConfig { message: format!("{err}") })?;
        if !classes.contains(&class) {
            classes.push(class);
        }
    }
    Ok((!classes.is_empty()).then_some(classes))
}
