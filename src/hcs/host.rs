//! [`HostControl`] over the native HCS and HCN APIs

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;
use crate::host::{HostControl, RawHandle, ResourceKind};
use crate::{Error, Result};
use super::compute::{self, ComputeSystem};
use super::network::{self, HcnEndpoint, HcnNetwork};

enum NativeHandle {
    System(ComputeSystem),
    Network(HcnNetwork),
    Endpoint(HcnEndpoint),
}

/// Host backed by `computecore.dll` and `computenetwork.dll`.
///
/// Native handles live in a table keyed by [`RawHandle`] tokens; closing a
/// token drops the wrapper, which releases the native handle.
pub struct WindowsHost {
    handles: Mutex<HashMap<RawHandle, NativeHandle>>,
    next: AtomicU64,
}

impl WindowsHost {
    pub fn new() -> Self {
        Self {
            handles: Mutex::new(HashMap::new()),
            next: AtomicU64::new(1),
        }
    }

    fn insert(&self, native: NativeHandle) -> RawHandle {
        let raw = RawHandle(self.next.fetch_add(1, Ordering::Relaxed));
        self.handles.lock().insert(raw, native);
        raw
    }

    fn with_handle<T>(
        &self,
        kind: ResourceKind,
        handle: RawHandle,
        f: impl FnOnce(&NativeHandle) -> Result<T>,
    ) -> Result<T> {
        let handles = self.handles.lock();
        let native = handles
            .get(&handle)
            .ok_or_else(|| Error::InvalidRequest(format!("unknown {} handle {:?}", kind, handle)))?;
        f(native)
    }
}

impl Default for WindowsHost {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_guid(kind: ResourceKind, id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).map_err(|e| Error::InvalidRequest(format!("invalid {} id '{}': {}", kind, id, e)))
}

fn parse_document(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(text)?)
}

fn kind_mismatch(kind: ResourceKind) -> Error {
    Error::InvalidRequest(format!("handle does not refer to a {}", kind))
}

impl HostControl for WindowsHost {
    fn enumerate(&self, kind: ResourceKind, query: Option<Value>) -> Result<Value> {
        let query = query.map(|q| q.to_string());
        let result = match kind {
            ResourceKind::ComputeSystem => compute::enumerate_compute_systems(query.as_deref())?,
            ResourceKind::Network => network::enumerate_networks(query.as_deref())?,
            ResourceKind::NetworkEndpoint => network::enumerate_endpoints(query.as_deref())?,
        };
        parse_document(&result)
    }

    fn open(&self, kind: ResourceKind, id: &str) -> Result<RawHandle> {
        let native = match kind {
            ResourceKind::ComputeSystem => NativeHandle::System(ComputeSystem::open(id)?),
            ResourceKind::Network => NativeHandle::Network(HcnNetwork::open(&parse_guid(kind, id)?)?),
            ResourceKind::NetworkEndpoint => {
                NativeHandle::Endpoint(HcnEndpoint::open(&parse_guid(kind, id)?)?)
            }
        };
        Ok(self.insert(native))
    }

    fn query_properties(
        &self,
        kind: ResourceKind,
        handle: RawHandle,
        query: Option<Value>,
    ) -> Result<Value> {
        let query = query.map(|q| q.to_string());
        let result = self.with_handle(kind, handle, |native| match (kind, native) {
            (ResourceKind::ComputeSystem, NativeHandle::System(s)) => s.get_properties(query.as_deref()),
            (ResourceKind::Network, NativeHandle::Network(n)) => n.get_properties(query.as_deref()),
            (ResourceKind::NetworkEndpoint, NativeHandle::Endpoint(e)) => {
                e.get_properties(query.as_deref())
            }
            _ => Err(kind_mismatch(kind)),
        })?;
        parse_document(&result)
    }

    fn create(
        &self,
        kind: ResourceKind,
        parent: Option<RawHandle>,
        id: &str,
        settings: &Value,
    ) -> Result<RawHandle> {
        let settings = settings.to_string();
        let native = match kind {
            ResourceKind::ComputeSystem => NativeHandle::System(ComputeSystem::create(id, &settings)?),
            ResourceKind::Network => {
                NativeHandle::Network(HcnNetwork::create(&parse_guid(kind, id)?, &settings)?)
            }
            ResourceKind::NetworkEndpoint => {
                let parent = parent.ok_or_else(|| {
                    Error::InvalidRequest("endpoint creation requires a network handle".into())
                })?;
                let endpoint_id = parse_guid(kind, id)?;
                let endpoint = self.with_handle(ResourceKind::Network, parent, |native| match native {
                    NativeHandle::Network(n) => HcnEndpoint::create(n, &endpoint_id, &settings),
                    _ => Err(kind_mismatch(ResourceKind::Network)),
                })?;
                NativeHandle::Endpoint(endpoint)
            }
        };
        Ok(self.insert(native))
    }

    fn modify(&self, kind: ResourceKind, handle: RawHandle, request: &Value) -> Result<Value> {
        let request = request.to_string();
        let result = self.with_handle(kind, handle, |native| match (kind, native) {
            (ResourceKind::ComputeSystem, NativeHandle::System(s)) => s.modify(&request),
            (ResourceKind::Network, NativeHandle::Network(n)) => n.modify(&request),
            (ResourceKind::NetworkEndpoint, NativeHandle::Endpoint(e)) => e.modify(&request),
            _ => Err(kind_mismatch(kind)),
        })?;
        parse_document(&result)
    }

    fn delete(&self, kind: ResourceKind, id: &str) -> Result<()> {
        match kind {
            ResourceKind::ComputeSystem => Err(Error::Unsupported(
                "compute systems cannot be deleted through this host".into(),
            )),
            ResourceKind::Network => network::delete_network(&parse_guid(kind, id)?),
            ResourceKind::NetworkEndpoint => network::delete_endpoint(&parse_guid(kind, id)?),
        }
    }

    fn close(&self, kind: ResourceKind, handle: RawHandle) {
        if self.handles.lock().remove(&handle).is_none() {
            tracing::debug!(%kind, ?handle, "Handle already closed");
        }
    }
}
