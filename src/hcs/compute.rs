//! HCS Compute System wrapper

use windows::{
    core::{HSTRING, PCWSTR},
    Win32::System::HostComputeSystem::*,
};
use crate::{Error, Result};
use super::operation::Operation;

/// GENERIC_ALL
const SYSTEM_ACCESS: u32 = 0x10000000;

/// Wrapper around HCS_SYSTEM handle
pub struct ComputeSystem {
    handle: HCS_SYSTEM,
    id: String,
}

impl ComputeSystem {
    /// Create a new compute system with the given JSON configuration
    pub fn create(id: &str, config_json: &str) -> Result<Self> {
        unsafe {
            let id_hstring = HSTRING::from(id);
            let config_hstring = HSTRING::from(config_json);
            let mut operation = Operation::new("create compute system");

            let handle = HcsCreateComputeSystem(
                PCWSTR(id_hstring.as_ptr()),
                PCWSTR(config_hstring.as_ptr()),
                operation.handle(),
                None,
            )
            .map_err(|e| Error::from_windows("create compute system", e, ""))?;

            let system = Self {
                handle,
                id: id.to_string(),
            };
            operation.wait()?;
            Ok(system)
        }
    }

    /// Open an existing compute system by ID
    pub fn open(id: &str) -> Result<Self> {
        unsafe {
            let id_hstring = HSTRING::from(id);

            let handle = HcsOpenComputeSystem(PCWSTR(id_hstring.as_ptr()), SYSTEM_ACCESS)
                .map_err(|e| Error::from_windows("open compute system", e, ""))?;

            Ok(Self {
                handle,
                id: id.to_string(),
            })
        }
    }

    /// Get compute system properties
    pub fn get_properties(&self, query: Option<&str>) -> Result<String> {
        unsafe {
            let mut operation = Operation::new("query compute system");
            let query_hstring = query.map(HSTRING::from);
            let query_pcwstr = query_hstring
                .as_ref()
                .map(|h| PCWSTR(h.as_ptr()))
                .unwrap_or(PCWSTR::null());

            HcsGetComputeSystemProperties(self.handle, operation.handle(), query_pcwstr)
                .map_err(|e| Error::from_windows("query compute system", e, ""))?;

            operation.wait()
        }
    }

    /// Modify compute system configuration
    pub fn modify(&self, config: &str) -> Result<String> {
        unsafe {
            let mut operation = Operation::new("modify compute system");
            let config_hstring = HSTRING::from(config);

            HcsModifyComputeSystem(
                self.handle,
                operation.handle(),
                PCWSTR(config_hstring.as_ptr()),
                windows::Win32::Foundation::HANDLE::default(),
            )
            .map_err(|e| Error::from_windows("modify compute system", e, ""))?;

            operation.wait()
        }
    }

    /// Get the ID
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for ComputeSystem {
    fn drop(&mut self) {
        unsafe {
            HcsCloseComputeSystem(self.handle);
        }
    }
}

/// Enumerate compute systems, returning the raw result document
pub fn enumerate_compute_systems(query: Option<&str>) -> Result<String> {
    unsafe {
        let query_hstring = query.map(HSTRING::from);
        let query_pcwstr = query_hstring
            .as_ref()
            .map(|h| PCWSTR(h.as_ptr()))
            .unwrap_or(PCWSTR::null());
        let mut operation = Operation::new("enumerate compute systems");

        HcsEnumerateComputeSystems(query_pcwstr, operation.handle())
            .map_err(|e| Error::from_windows("enumerate compute systems", e, ""))?;

        operation.wait()
    }
}
