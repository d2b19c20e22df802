//! HCN network and endpoint wrappers
//!
//! Unlike HCS, the HCN calls complete synchronously and hand back an error
//! record document on failure.

use std::ffi::c_void;
use windows::{
    core::{GUID, HSTRING, PCWSTR, PWSTR},
    Win32::System::HostComputeNetwork::*,
};
use uuid::Uuid;
use crate::{Error, Result};
use super::operation::take_pwstr;

fn guid(id: &Uuid) -> GUID {
    GUID::from_u128(id.as_u128())
}

fn query_pcwstr(query: &Option<HSTRING>) -> PCWSTR {
    query
        .as_ref()
        .map(|h| PCWSTR(h.as_ptr()))
        .unwrap_or(PCWSTR::null())
}

/// Run an HCN call, turning its error record into the error detail
fn hcn_call<F>(context: &str, call: F) -> Result<()>
where
    F: FnOnce(*mut PWSTR) -> windows::core::Result<()>,
{
    let mut record = PWSTR::null();
    let status = call(&mut record as *mut PWSTR);
    let detail = take_pwstr(&mut record);
    status.map_err(|e| Error::from_windows(context, e, detail))
}

/// Wrapper around an HCN network handle
pub struct HcnNetwork {
    handle: *mut c_void,
    id: Uuid,
}

impl HcnNetwork {
    pub fn open(id: &Uuid) -> Result<Self> {
        let mut handle: *mut c_void = std::ptr::null_mut();
        hcn_call("open network", |record| unsafe {
            HcnOpenNetwork(&guid(id), &mut handle, Some(record))
        })?;
        Ok(Self { handle, id: *id })
    }

    pub fn create(id: &Uuid, settings: &str) -> Result<Self> {
        let settings = HSTRING::from(settings);
        let mut handle: *mut c_void = std::ptr::null_mut();
        hcn_call("create network", |record| unsafe {
            HcnCreateNetwork(
                &guid(id),
                PCWSTR(settings.as_ptr()),
                &mut handle,
                Some(record),
            )
        })?;
        Ok(Self { handle, id: *id })
    }

    pub fn get_properties(&self, query: Option<&str>) -> Result<String> {
        let query = query.map(HSTRING::from);
        let mut properties = PWSTR::null();
        hcn_call("query network", |record| unsafe {
            HcnQueryNetworkProperties(self.handle, query_pcwstr(&query), &mut properties, Some(record))
        })?;
        Ok(take_pwstr(&mut properties))
    }

    pub fn modify(&self, settings: &str) -> Result<String> {
        let settings = HSTRING::from(settings);
        hcn_call("modify network", |record| unsafe {
            HcnModifyNetwork(self.handle, PCWSTR(settings.as_ptr()), Some(record))
        })?;
        Ok(String::new())
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }

    pub(crate) fn raw(&self) -> *mut c_void {
        self.handle
    }
}

impl Drop for HcnNetwork {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = HcnCloseNetwork(self.handle) {
                tracing::warn!(network = %self.id, error = %e, "Failed to close network handle");
            }
        }
    }
}

/// Wrapper around an HCN endpoint handle
pub struct HcnEndpoint {
    handle: *mut c_void,
    id: Uuid,
}

impl HcnEndpoint {
    pub fn open(id: &Uuid) -> Result<Self> {
        let mut handle: *mut c_void = std::ptr::null_mut();
        hcn_call("open endpoint", |record| unsafe {
            HcnOpenEndpoint(&guid(id), &mut handle, Some(record))
        })?;
        Ok(Self { handle, id: *id })
    }

    /// Create an endpoint on `network`
    pub fn create(network: &HcnNetwork, id: &Uuid, settings: &str) -> Result<Self> {
        let settings = HSTRING::from(settings);
        let mut handle: *mut c_void = std::ptr::null_mut();
        hcn_call("create endpoint", |record| unsafe {
            HcnCreateEndpoint(
                network.raw(),
                &guid(id),
                PCWSTR(settings.as_ptr()),
                &mut handle,
                Some(record),
            )
        })?;
        Ok(Self { handle, id: *id })
    }

    pub fn get_properties(&self, query: Option<&str>) -> Result<String> {
        let query = query.map(HSTRING::from);
        let mut properties = PWSTR::null();
        hcn_call("query endpoint", |record| unsafe {
            HcnQueryEndpointProperties(self.handle, query_pcwstr(&query), &mut properties, Some(record))
        })?;
        Ok(take_pwstr(&mut properties))
    }

    pub fn modify(&self, settings: &str) -> Result<String> {
        let settings = HSTRING::from(settings);
        hcn_call("modify endpoint", |record| unsafe {
            HcnModifyEndpoint(self.handle, PCWSTR(settings.as_ptr()), Some(record))
        })?;
        Ok(String::new())
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }
}

impl Drop for HcnEndpoint {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = HcnCloseEndpoint(self.handle) {
                tracing::warn!(endpoint = %self.id, error = %e, "Failed to close endpoint handle");
            }
        }
    }
}

/// List network ids as a JSON array document
pub fn enumerate_networks(query: Option<&str>) -> Result<String> {
    let query = query.map(HSTRING::from);
    let mut networks = PWSTR::null();
    hcn_call("enumerate networks", |record| unsafe {
        HcnEnumerateNetworks(query_pcwstr(&query), &mut networks, Some(record))
    })?;
    Ok(take_pwstr(&mut networks))
}

/// List endpoint ids as a JSON array document
pub fn enumerate_endpoints(query: Option<&str>) -> Result<String> {
    let query = query.map(HSTRING::from);
    let mut endpoints = PWSTR::null();
    hcn_call("enumerate endpoints", |record| unsafe {
        HcnEnumerateEndpoints(query_pcwstr(&query), &mut endpoints, Some(record))
    })?;
    Ok(take_pwstr(&mut endpoints))
}

pub fn delete_network(id: &Uuid) -> Result<()> {
    hcn_call("delete network", |record| unsafe {
        HcnDeleteNetwork(&guid(id), Some(record))
    })
}

pub fn delete_endpoint(id: &Uuid) -> Result<()> {
    hcn_call("delete endpoint", |record| unsafe {
        HcnDeleteEndpoint(&guid(id), Some(record))
    })
}
