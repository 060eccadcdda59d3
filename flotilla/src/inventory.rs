//! Device inventory.
//!
//! The inventory is an in-memory catalog of the managed fleet, keyed by
//! device name. It is loaded once at startup and immutable afterwards;
//! every other component borrows devices from it.

use std::path::Path;

use indexmap::IndexMap;
use secrecy::SecretString;
use serde::Deserialize;

use crate::error::{InventoryError, Result};

/// A username/password pair for device or server authentication.
#[derive(Debug, Clone, Deserialize)]
pub struct Credential {
    /// Account name.
    pub username: String,

    /// Account password. Redacted in Debug output.
    pub password: SecretString,
}

impl Credential {
    /// Create a credential from plain strings.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into().into(),
        }
    }
}

/// Classification of a device within the network hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum DeviceLevel {
    /// Router.
    #[serde(rename = "R")]
    Router,
    /// Layer-3 switch.
    #[serde(rename = "L3")]
    L3Switch,
    /// Layer-2 switch.
    #[serde(rename = "L2")]
    L2Switch,
}

/// One managed network device.
///
/// Immutable after inventory load.
#[derive(Debug, Clone)]
pub struct Device {
    /// Unique device name.
    pub name: String,

    /// Management IP address or hostname.
    pub address: String,

    /// Platform tag selecting the command dialect (e.g. "cisco_ios").
    pub platform: String,

    /// Classification level.
    pub level: DeviceLevel,

    /// Network segment the device belongs to.
    pub segment: String,

    /// Primary credential for this device.
    pub credential: Credential,
}

/// Conjunctive selection filter over the inventory.
///
/// Omitted criteria match everything.
#[derive(Debug, Clone, Default)]
pub struct DeviceFilter {
    platforms: Option<Vec<String>>,
    levels: Option<Vec<DeviceLevel>>,
    segment: Option<String>,
}

impl DeviceFilter {
    /// Match everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to the given platform tags.
    pub fn platforms<I, S>(mut self, platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.platforms = Some(platforms.into_iter().map(Into::into).collect());
        self
    }

    /// Restrict to the given classification levels.
    pub fn levels(mut self, levels: impl IntoIterator<Item = DeviceLevel>) -> Self {
        self.levels = Some(levels.into_iter().collect());
        self
    }

    /// Restrict to one network segment.
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segment = Some(segment.into());
        self
    }

    fn matches(&self, device: &Device) -> bool {
        if let Some(ref platforms) = self.platforms {
            if !platforms.iter().any(|p| p == &device.platform) {
                return false;
            }
        }
        if let Some(ref levels) = self.levels {
            if !levels.contains(&device.level) {
                return false;
            }
        }
        if let Some(ref segment) = self.segment {
            if segment != &device.segment {
                return false;
            }
        }
        true
    }
}

/// On-disk shape of one inventory entry.
#[derive(Debug, Deserialize)]
struct DeviceEntry {
    address: String,
    platform: String,
    level: DeviceLevel,
    segment: String,
    /// Optional per-device credential override.
    credential: Option<Credential>,
}

#[derive(Debug, Deserialize)]
struct InventoryFile {
    devices: IndexMap<String, DeviceEntry>,
}

/// The device catalog.
#[derive(Debug, Default)]
pub struct Inventory {
    devices: IndexMap<String, Device>,
}

impl Inventory {
    /// Load the catalog from a YAML file.
    ///
    /// Devices without an explicit credential get `default_credential`.
    pub fn load(path: impl AsRef<Path>, default_credential: &Credential) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(InventoryError::Io)?;
        let file: InventoryFile = serde_yaml::from_str(&text).map_err(InventoryError::Parse)?;

        let devices = file
            .devices
            .into_iter()
            .map(|(name, entry)| {
                let device = Device {
                    name: name.clone(),
                    address: entry.address,
                    platform: entry.platform,
                    level: entry.level,
                    segment: entry.segment,
                    credential: entry.credential.unwrap_or_else(|| default_credential.clone()),
                };
                (name, device)
            })
            .collect();

        Ok(Self { devices })
    }

    /// Build a catalog from already-constructed devices.
    pub fn from_devices(devices: impl IntoIterator<Item = Device>) -> Self {
        Self {
            devices: devices
                .into_iter()
                .map(|d| (d.name.clone(), d))
                .collect(),
        }
    }

    /// Look up a device by name.
    pub fn resolve(&self, name: &str) -> Result<&Device> {
        self.devices.get(name).ok_or_else(|| {
            InventoryError::NotFound {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Look up a device by management address.
    pub fn resolve_address(&self, address: &str) -> Option<&Device> {
        self.devices.values().find(|d| d.address == address)
    }

    /// Select devices matching the filter, in catalog order.
    pub fn select(&self, filter: &DeviceFilter) -> Vec<&Device> {
        self.devices
            .values()
            .filter(|d| filter.matches(d))
            .collect()
    }

    /// All device names, in catalog order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    /// Number of devices in the catalog.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
