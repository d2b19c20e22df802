//! Host control surface
//!
//! [`HostControl`] is the seam between the attach workflow and the platform:
//! every resource kind (compute system, network, endpoint) shares the same
//! enumerate/open/query/create/modify/delete/close capability set, and every
//! payload is a JSON document. [`Handle`] owns an opened resource and closes
//! it on drop.

pub mod handle;
pub mod settings;

pub use handle::Handle;
pub use settings::{
    EndpointPolicy, EndpointSettings, ModifyRequestType, ModifySettingRequest, NetworkAdapter,
    SystemQuery, VlanPolicySettings,
};

use serde_json::Value;
use crate::Result;

/// Kind of host resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    ComputeSystem,
    Network,
    NetworkEndpoint,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::ComputeSystem => write!(f, "compute system"),
            ResourceKind::Network => write!(f, "network"),
            ResourceKind::NetworkEndpoint => write!(f, "endpoint"),
        }
    }
}

/// Opaque token for a resource opened through a [`HostControl`].
///
/// Only meaningful to the host that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(pub u64);

/// Platform API managing compute systems, networks and endpoints.
///
/// Calls block until the host answers. Implementations must make `close`
/// idempotent and infallible; failures to release are only logged.
#[cfg_attr(test, mockall::automock)]
pub trait HostControl {
    /// List resources of `kind`, optionally filtered by a query document.
    fn enumerate(&self, kind: ResourceKind, query: Option<Value>) -> Result<Value>;

    /// Open an existing resource by id.
    fn open(&self, kind: ResourceKind, id: &str) -> Result<RawHandle>;

    fn query_properties(
        &self,
        kind: ResourceKind,
        handle: RawHandle,
        query: Option<Value>,
    ) -> Result<Value>;

    /// Create a resource with a caller-chosen id. Endpoints need their parent
    /// network handle.
    fn create(
        &self,
        kind: ResourceKind,
        parent: Option<RawHandle>,
        id: &str,
        settings: &Value,
    ) -> Result<RawHandle>;

    /// Apply a modify request document and return the result document.
    fn modify(&self, kind: ResourceKind, handle: RawHandle, request: &Value) -> Result<Value>;

    fn delete(&self, kind: ResourceKind, id: &str) -> Result<()>;

    fn close(&self, kind: ResourceKind, handle: RawHandle);
}

/// Enumerate resources and return the listed entries.
///
/// An empty or null result document is an empty list.
pub fn enumerate(
    host: &dyn HostControl,
    kind: ResourceKind,
    query: Option<Value>,
) -> Result<Vec<Value>> {
    tracing::debug!(%kind, "Enumerating");
    match host.enumerate(kind, query)? {
        Value::Null => Ok(Vec::new()),
        Value::Array(entries) => Ok(entries),
        other => Err(crate::Error::Conflict(format!(
            "unexpected {} enumeration document: {}",
            kind, other
        ))),
    }
}

/// Enumerate resources whose listing is a plain array of GUID strings.
pub fn enumerate_ids(
    host: &dyn HostControl,
    kind: ResourceKind,
    query: Option<Value>,
) -> Result<Vec<uuid::Uuid>> {
    enumerate(host, kind, query)?
        .iter()
        .map(|entry| {
            let text = match entry {
                Value::String(s) => s.as_str(),
                other => crate::properties::get_str(other, "Id")?,
            };
            uuid::Uuid::parse_str(text).map_err(|e| {
                crate::Error::Conflict(format!("invalid {} id '{}': {}", kind, text, e))
            })
        })
        .collect()
}

/// Delete a resource by id.
pub fn delete(host: &dyn HostControl, kind: ResourceKind, id: &str) -> Result<()> {
    tracing::debug!(%kind, id, "Deleting");
    host.delete(kind, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enumerate_null_is_empty() {
        let mut host = MockHostControl::new();
        host.expect_enumerate().returning(|_, _| Ok(Value::Null));
        assert!(enumerate(&host, ResourceKind::Network, None).unwrap().is_empty());
    }

    #[test]
    fn test_enumerate_ids_accepts_strings_and_documents() {
        let mut host = MockHostControl::new();
        host.expect_enumerate().returning(|_, _| {
            Ok(json!([
                "11111111-1111-1111-1111-111111111111",
                { "ID": "{22222222-2222-2222-2222-222222222222}" }
            ]))
        });
        let ids = enumerate_ids(&host, ResourceKind::NetworkEndpoint, None).unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[1].to_string(), "22222222-2222-2222-2222-222222222222");
    }

    #[test]
    fn test_enumerate_rejects_objects() {
        let mut host = MockHostControl::new();
        host.expect_enumerate().returning(|_, _| Ok(json!({ "Id": "x" })));
        assert!(enumerate(&host, ResourceKind::Network, None).is_err());
    }
}
