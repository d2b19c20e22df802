//! Typed request documents for host calls
//! Based on: https://learn.microsoft.com/en-us/virtualization/api/hcs/schemareference
//! and the HCN v2 endpoint schema

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Compute system enumeration filter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SystemQuery {
    pub owners: Vec<String>,
}

impl SystemQuery {
    pub fn owned_by(owner: impl Into<String>) -> Self {
        Self {
            owners: vec![owner.into()],
        }
    }
}

/// Endpoint policy entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type", content = "Settings")]
pub enum EndpointPolicy {
    #[serde(rename = "VLAN")]
    Vlan(VlanPolicySettings),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VlanPolicySettings {
    pub isolation_id: u16,
}

/// Settings for creating a network endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointSettings {
    /// Owning network id
    pub virtual_network: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    /// Omitted entirely when no policy applies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policies: Option<Vec<EndpointPolicy>>,
}

impl EndpointSettings {
    pub fn new(network_id: &uuid::Uuid) -> Self {
        Self {
            virtual_network: network_id.to_string(),
            mac_address: None,
            policies: None,
        }
    }

    pub fn mac_address(mut self, mac: Option<String>) -> Self {
        self.mac_address = mac;
        self
    }

    pub fn vlan(mut self, isolation_id: Option<u16>) -> Self {
        self.policies = isolation_id
            .map(|id| vec![EndpointPolicy::Vlan(VlanPolicySettings { isolation_id: id })]);
        self
    }
}

/// Kind of change in a modify request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModifyRequestType {
    Add,
    Remove,
    Update,
}

/// Modify request envelope
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModifySettingRequest<'a, S: Serialize> {
    pub resource_path: &'a str,
    pub request_type: ModifyRequestType,
    pub settings: &'a S,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_request: Option<&'a Value>,
}

/// Guest network adapter bound to an endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkAdapter {
    pub endpoint_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_system_query() {
        let query = serde_json::to_value(SystemQuery::owned_by("WSL")).unwrap();
        assert_eq!(query, json!({ "Owners": ["WSL"] }));
    }

    #[test]
    fn test_endpoint_settings_without_vlan_has_no_policies() {
        let id = uuid::Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap();
        let doc = serde_json::to_value(EndpointSettings::new(&id).vlan(None)).unwrap();
        assert_eq!(doc, json!({ "VirtualNetwork": "11111111-1111-1111-1111-111111111111" }));
        assert!(doc.get("Policies").is_none());
    }

    #[test]
    fn test_endpoint_settings_with_vlan() {
        let id = uuid::Uuid::new_v4();
        let settings = EndpointSettings::new(&id)
            .mac_address(Some("00-15-5D-01-02-03".into()))
            .vlan(Some(42));
        let doc = serde_json::to_value(&settings).unwrap();
        assert_eq!(doc["MacAddress"], "00-15-5D-01-02-03");
        assert_eq!(
            doc["Policies"],
            json!([{ "Type": "VLAN", "Settings": { "IsolationId": 42 } }])
        );
    }

    #[test]
    fn test_modify_request_shape() {
        let adapter = NetworkAdapter {
            endpoint_id: "ep".into(),
            mac_address: None,
        };
        let request = ModifySettingRequest {
            resource_path: "VirtualMachine/Devices/NetworkAdapters/bridge_x",
            request_type: ModifyRequestType::Add,
            settings: &adapter,
            guest_request: None,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "ResourcePath": "VirtualMachine/Devices/NetworkAdapters/bridge_x",
                "RequestType": "Add",
                "Settings": { "EndpointId": "ep" }
            })
        );
    }
}
