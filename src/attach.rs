//! Attach reconciliation
//!
//! Converges the guest's network attachment in one pass:
//!
//! 1. find the single compute system carrying the owner tag,
//! 2. resolve the target network by GUID or by name,
//! 3. derive the bridge endpoint id from the network id,
//! 4. reuse an endpoint already attached to this guest, or delete one that
//!    belongs elsewhere,
//! 5. create the endpoint and add it to the guest as a network adapter.
//!
//! Any failure aborts the run; only handles are cleaned up. If adding the
//! adapter fails, the freshly created endpoint stays behind and is picked up
//! (deleted and recreated) by the next run.

use serde_json::Value;
use uuid::Uuid;
use crate::config::{AttachRequest, NetworkRef};
use crate::endpoint_id::derive_endpoint_id;
use crate::host::{
    self, EndpointSettings, Handle, HostControl, ModifyRequestType, NetworkAdapter, ResourceKind,
    SystemQuery,
};
use crate::properties::{eq_ignore_case, find_property, get_str};
use crate::{Error, Result};

/// Owner tag of the WSL2 utility VM
pub const WSL_OWNER: &str = "WSL";

const NETWORK_ADAPTERS_PATH: &str = "VirtualMachine/Devices/NetworkAdapters";

/// Guest-side resource path of the bridge adapter for `network_id`
pub fn device_path(network_id: &Uuid) -> String {
    format!("{}/bridge_{}", NETWORK_ADAPTERS_PATH, network_id.simple())
}

/// What an existing endpoint at the derived id is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointState {
    Absent,
    AttachedToTarget,
    AttachedElsewhere { guest: Option<String> },
}

/// Result of a successful attach run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachOutcome {
    /// Nothing to do; the endpoint was already on this guest
    AlreadyAttached { endpoint_id: Uuid },
    Attached {
        endpoint_id: Uuid,
        device_path: String,
        /// A stale endpoint was deleted first
        replaced: bool,
    },
}

impl AttachOutcome {
    pub fn endpoint_id(&self) -> &Uuid {
        match self {
            AttachOutcome::AlreadyAttached { endpoint_id } => endpoint_id,
            AttachOutcome::Attached { endpoint_id, .. } => endpoint_id,
        }
    }
}

/// Runs the attach workflow against a host
pub struct Attacher<'h> {
    host: &'h dyn HostControl,
    owner: String,
}

impl<'h> Attacher<'h> {
    pub fn new(host: &'h dyn HostControl) -> Self {
        Self {
            host,
            owner: WSL_OWNER.to_string(),
        }
    }

    /// Target guests carrying a different owner tag
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    /// Converge the guest's attachment to `request`.
    ///
    /// Host calls block the calling thread, so async callers must run this
    /// through `tokio::task::spawn_blocking`.
    pub fn attach(&self, request: &AttachRequest) -> Result<AttachOutcome> {
        request.validate()?;

        let system_id = self.find_target_system()?;
        let system = Handle::open(self.host, ResourceKind::ComputeSystem, &system_id)?;
        let props = system.properties(None)?;
        tracing::debug!(system = %system_id, %props, "Target compute system");

        let (network, network_id) = self.resolve_network(&request.network)?;
        let endpoint_id = derive_endpoint_id(&network_id);
        tracing::info!(network = %network_id, endpoint = %endpoint_id, "Resolved network");

        let replaced = match self.inspect_endpoint(&endpoint_id, &system_id)? {
            EndpointState::AttachedToTarget => {
                tracing::info!(endpoint = %endpoint_id, system = %system_id, "Endpoint already attached to current WSL2 VM");
                return Ok(AttachOutcome::AlreadyAttached { endpoint_id });
            }
            EndpointState::AttachedElsewhere { guest } => {
                tracing::info!(
                    endpoint = %endpoint_id,
                    guest = guest.as_deref().unwrap_or("-"),
                    "Endpoint not attached to current WSL2 VM, recreating"
                );
                host::delete(self.host, ResourceKind::NetworkEndpoint, &endpoint_id.to_string())?;
                true
            }
            EndpointState::Absent => false,
        };

        let mac = request.mac_address.as_ref().map(|m| m.as_str().to_string());
        let settings = EndpointSettings::new(&network_id)
            .mac_address(mac.clone())
            .vlan(request.vlan_id.map(|v| v.get()));
        let _endpoint = Handle::create(
            self.host,
            ResourceKind::NetworkEndpoint,
            Some(&network),
            &endpoint_id.to_string(),
            &settings,
        )?;
        tracing::info!(endpoint = %endpoint_id, "Created endpoint");

        let path = device_path(&network_id);
        let adapter = NetworkAdapter {
            endpoint_id: endpoint_id.to_string(),
            mac_address: mac,
        };
        system.modify(&path, ModifyRequestType::Add, &adapter, None)?;
        tracing::info!(system = %system_id, device = %path, "Added network adapter to guest");

        Ok(AttachOutcome::Attached {
            endpoint_id,
            device_path: path,
            replaced,
        })
    }

    /// Exactly one running compute system must carry the owner tag
    fn find_target_system(&self) -> Result<String> {
        let query = serde_json::to_value(SystemQuery::owned_by(&self.owner))?;
        let systems = host::enumerate(self.host, ResourceKind::ComputeSystem, Some(query))?;

        match systems.as_slice() {
            [system] => {
                let id = get_str(system, "Id")?;
                if id.is_empty() {
                    return Err(Error::PreconditionFailed(format!(
                        "can't detect ID of the {} VM",
                        self.owner
                    )));
                }
                Ok(id.to_string())
            }
            [] => Err(Error::PreconditionFailed(format!(
                "no compute system owned by '{}' found; is WSL2 running?",
                self.owner
            ))),
            many => Err(Error::PreconditionFailed(format!(
                "{} compute systems owned by '{}' found; can't pick a unique VM",
                many.len(),
                self.owner
            ))),
        }
    }

    /// Open the target network and return it with its id
    fn resolve_network(&self, network: &NetworkRef) -> Result<(Handle<'h>, Uuid)> {
        match network {
            NetworkRef::Id(id) => {
                let handle = Handle::open(self.host, ResourceKind::Network, &id.to_string())?;
                Ok((handle, *id))
            }
            NetworkRef::Name(name) => {
                let handle = self.find_network_by_name(name)?;
                let props = handle.properties(None)?;
                let id = parse_id(get_str(&props, "Id")?)?;
                Ok((handle, id))
            }
        }
    }

    /// First network whose name matches, ignoring case. Non-matching
    /// networks are closed as the scan moves on.
    fn find_network_by_name(&self, name: &str) -> Result<Handle<'h>> {
        for id in host::enumerate_ids(self.host, ResourceKind::Network, None)? {
            let network = Handle::open(self.host, ResourceKind::Network, &id.to_string())?;
            let props = network.properties(None)?;
            if network_name(&props).is_some_and(|n| eq_ignore_case(n, name)) {
                return Ok(network);
            }
        }
        Err(Error::NotFound(format!("network '{}'", name)))
    }

    fn inspect_endpoint(&self, endpoint_id: &Uuid, system_id: &str) -> Result<EndpointState> {
        let existing = host::enumerate_ids(self.host, ResourceKind::NetworkEndpoint, None)?;
        if !existing.contains(endpoint_id) {
            return Ok(EndpointState::Absent);
        }

        let endpoint = Handle::open(self.host, ResourceKind::NetworkEndpoint, &endpoint_id.to_string())?;
        let props = endpoint.properties(None)?;
        let guest = find_property(&props, "VirtualMachine")
            .and_then(Value::as_str)
            .map(str::to_string);

        match guest {
            Some(guest) if guest.eq_ignore_ascii_case(system_id) => Ok(EndpointState::AttachedToTarget),
            guest => Ok(EndpointState::AttachedElsewhere { guest }),
        }
    }
}

fn network_name(props: &Value) -> Option<&str> {
    find_property(props, "Name").and_then(Value::as_str)
}

fn parse_id(text: &str) -> Result<Uuid> {
    Uuid::parse_str(text).map_err(|e| Error::Conflict(format!("invalid network id '{}': {}", text, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VlanId;
    use crate::host::{MockHostControl, RawHandle};
    use mockall::predicate::*;
    use serde_json::json;

    fn request() -> AttachRequest {
        AttachRequest::builder().network("Ethernet").build().unwrap()
    }

    #[test]
    fn test_device_path() {
        let id = Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap();
        assert_eq!(
            device_path(&id),
            "VirtualMachine/Devices/NetworkAdapters/bridge_11111111111111111111111111111111"
        );
    }

    #[test]
    fn test_no_guest_is_precondition_failure() {
        let mut host = MockHostControl::new();
        host.expect_enumerate()
            .with(eq(ResourceKind::ComputeSystem), eq(Some(json!({ "Owners": ["WSL"] }))))
            .times(1)
            .returning(|_, _| Ok(json!([])));

        let err = Attacher::new(&host).attach(&request()).unwrap_err();
        assert!(matches!(err, Error::PreconditionFailed(_)));
    }

    #[test]
    fn test_two_guests_is_precondition_failure() {
        let mut host = MockHostControl::new();
        host.expect_enumerate()
            .times(1)
            .returning(|_, _| Ok(json!([{ "Id": "a" }, { "Id": "b" }])));

        let err = Attacher::new(&host).attach(&request()).unwrap_err();
        assert!(matches!(err, Error::PreconditionFailed(msg) if msg.contains("2 compute systems")));
    }

    #[test]
    fn test_custom_owner_filter() {
        let mut host = MockHostControl::new();
        host.expect_enumerate()
            .with(eq(ResourceKind::ComputeSystem), eq(Some(json!({ "Owners": ["other"] }))))
            .times(1)
            .returning(|_, _| Ok(Value::Null));

        let err = Attacher::new(&host).with_owner("other").attach(&request()).unwrap_err();
        assert!(matches!(err, Error::PreconditionFailed(_)));
    }

    #[test]
    fn test_endpoint_without_guest_is_recreated() {
        let network_id = Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap();
        let endpoint_id = derive_endpoint_id(&network_id);
        let mut seq = mockall::Sequence::new();
        let mut host = MockHostControl::new();

        host.expect_enumerate()
            .with(eq(ResourceKind::ComputeSystem), always())
            .returning(|_, _| Ok(json!([{ "Id": "vm" }])));
        host.expect_enumerate()
            .with(eq(ResourceKind::NetworkEndpoint), always())
            .returning(move |_, _| Ok(json!([endpoint_id.to_string()])));
        host.expect_open().returning(|kind, _| {
            Ok(match kind {
                ResourceKind::ComputeSystem => RawHandle(1),
                ResourceKind::Network => RawHandle(2),
                ResourceKind::NetworkEndpoint => RawHandle(3),
            })
        });
        host.expect_query_properties().returning(|kind, _, _| {
            Ok(match kind {
                ResourceKind::NetworkEndpoint => json!({ "ID": "ep" }),
                _ => json!({}),
            })
        });
        host.expect_delete()
            .withf(move |kind, id| {
                *kind == ResourceKind::NetworkEndpoint && id == endpoint_id.to_string()
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        host.expect_create()
            .withf(|kind, parent, _, settings| {
                *kind == ResourceKind::NetworkEndpoint
                    && *parent == Some(RawHandle(2))
                    && settings["Policies"][0]["Settings"]["IsolationId"] == 7
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| Ok(RawHandle(4)));
        host.expect_modify()
            .withf(|kind, handle, request| {
                *kind == ResourceKind::ComputeSystem
                    && *handle == RawHandle(1)
                    && request["RequestType"] == "Add"
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(Value::Null));
        host.expect_close().return_const(());

        let request = AttachRequest::builder()
            .network_id(network_id)
            .vlan_id(Some(VlanId::try_from(7).unwrap()))
            .build()
            .unwrap();
        let outcome = Attacher::new(&host).attach(&request).unwrap();
        assert_eq!(
            outcome,
            AttachOutcome::Attached {
                endpoint_id,
                device_path: device_path(&network_id),
                replaced: true,
            }
        );
    }
}
