//! Scoped ownership of opened host resources

use serde::Serialize;
use serde_json::Value;
use super::{HostControl, ModifyRequestType, ModifySettingRequest, RawHandle, ResourceKind};
use crate::Result;

/// An open host resource, closed when dropped.
pub struct Handle<'h> {
    host: &'h dyn HostControl,
    kind: ResourceKind,
    raw: Option<RawHandle>,
    id: String,
}

impl<'h> Handle<'h> {
    /// Open an existing resource by id
    pub fn open(host: &'h dyn HostControl, kind: ResourceKind, id: &str) -> Result<Self> {
        tracing::debug!(%kind, id, "Opening");
        let raw = host.open(kind, id)?;
        Ok(Self {
            host,
            kind,
            raw: Some(raw),
            id: id.to_string(),
        })
    }

    /// Create a resource, optionally under `parent`
    pub fn create<S: Serialize>(
        host: &'h dyn HostControl,
        kind: ResourceKind,
        parent: Option<&Handle<'_>>,
        id: &str,
        settings: &S,
    ) -> Result<Self> {
        let settings = serde_json::to_value(settings)?;
        tracing::debug!(%kind, id, %settings, "Creating");
        let raw = host.create(kind, parent.and_then(|p| p.raw), id, &settings)?;
        Ok(Self {
            host,
            kind,
            raw: Some(raw),
            id: id.to_string(),
        })
    }

    /// Query the resource's property document
    pub fn properties(&self, query: Option<Value>) -> Result<Value> {
        self.host.query_properties(self.kind, self.raw()?, query)
    }

    /// Send a modify request for `resource_path`
    pub fn modify<S: Serialize>(
        &self,
        resource_path: &str,
        request_type: ModifyRequestType,
        settings: &S,
        guest_request: Option<&Value>,
    ) -> Result<Value> {
        let request = serde_json::to_value(ModifySettingRequest {
            resource_path,
            request_type,
            settings,
            guest_request,
        })?;
        tracing::debug!(kind = %self.kind, id = %self.id, %request, "Modifying");
        self.host.modify(self.kind, self.raw()?, &request)
    }

    /// Release the native handle. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(raw) = self.raw.take() {
            self.host.close(self.kind, raw);
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn is_open(&self) -> bool {
        self.raw.is_some()
    }

    fn raw(&self) -> Result<RawHandle> {
        self.raw.ok_or_else(|| {
            crate::Error::InvalidRequest(format!("{} {} is already closed", self.kind, self.id))
        })
    }
}

impl Drop for Handle<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Handle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("raw", &self.raw)
            .finish()
    }
}
