//! Last-used parameters, persisted per user
//!
//! Used as the fallback when no network is given on the command line.

use std::fmt;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::config::{AttachRequest, MacAddress, VlanId};
use crate::{Error, Result};

const APP_DIR: &str = "WSLAttachSwitch";
const PARAMS_FILE: &str = "params.json";

/// Saved attach parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Params {
    pub network: String,
    #[serde(default)]
    pub mac_address: Option<String>,
    #[serde(default)]
    pub vlan: Option<i64>,
}

impl Params {
    /// Params given on the command line, if they name a network
    pub fn explicit(network: Option<&str>, mac_address: Option<&str>, vlan: Option<i64>) -> Option<Self> {
        let params = Self {
            network: network.unwrap_or_default().to_string(),
            mac_address: mac_address.map(str::to_string),
            vlan,
        };
        params.is_valid().then_some(params)
    }

    pub fn is_valid(&self) -> bool {
        !self.network.trim().is_empty()
    }

    /// Validate into an attach request
    pub fn to_request(&self) -> Result<AttachRequest> {
        let mac = self
            .mac_address
            .as_deref()
            .map(str::parse::<MacAddress>)
            .transpose()?;
        let vlan = self.vlan.map(VlanId::try_from).transpose()?;
        AttachRequest::builder()
            .network(&self.network)
            .mac_address(mac)
            .vlan_id(vlan)
            .build()
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "network: {}", self.network)?;
        if let Some(mac) = &self.mac_address {
            write!(f, ", mac: {}", mac)?;
        }
        if let Some(vlan) = self.vlan {
            write!(f, ", vlan: {}", vlan)?;
        }
        Ok(())
    }
}

/// JSON file holding the last-used [`Params`]
pub struct ParamStore {
    path: PathBuf,
}

impl ParamStore {
    /// Store in the per-user application data directory
    pub fn user_default() -> Result<Self> {
        let base = default_app_data()
            .ok_or_else(|| Error::Config("cannot locate the user application data directory".into()))?;
        Ok(Self::at(base.join(APP_DIR).join(PARAMS_FILE)))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load saved params; `None` if nothing has been saved yet
    pub fn load(&self) -> Result<Option<Params>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&self.path)?;
        let params: Params = serde_json::from_str(&json)?;
        tracing::info!(%params, path = %self.path.display(), "Loaded saved parameters");
        Ok(Some(params))
    }

    pub fn save(&self, params: &Params) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(params)?;
        std::fs::write(&self.path, json)?;
        tracing::debug!(path = %self.path.display(), "Saved parameters");
        Ok(())
    }

    /// Pick the params for this run: explicit ones when a network was given,
    /// otherwise whatever was saved last.
    pub fn resolve(
        &self,
        network: Option<&str>,
        mac_address: Option<&str>,
        vlan: Option<i64>,
    ) -> Result<Params> {
        if let Some(passed) = Params::explicit(network, mac_address, vlan) {
            return Ok(passed);
        }

        match self.load() {
            Ok(Some(saved)) if saved.is_valid() => Ok(saved),
            Ok(_) => Err(no_network()),
            Err(e) => {
                tracing::warn!(error = %e, "Error while loading saved parameters");
                Err(no_network())
            }
        }
    }
}

fn no_network() -> Error {
    Error::Config(
        "no network specified and no saved parameters found; pass a network name or GUID".into(),
    )
}

fn default_app_data() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os("APPDATA") {
        return Some(PathBuf::from(dir));
    }
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(dir));
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
}
