//! Attach request with builder pattern

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::{Error, Result};

/// Highest VLAN isolation id the host accepts
pub const MAX_VLAN_ID: u16 = 4095;

/// VLAN isolation id, 0..=4095
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct VlanId(u16);

impl VlanId {
    pub fn get(self) -> u16 {
        self.0
    }
}

impl TryFrom<i64> for VlanId {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        if (0..=MAX_VLAN_ID as i64).contains(&value) {
            Ok(Self(value as u16))
        } else {
            Err(Error::InvalidRequest(format!(
                "VLAN ID must be between 0 and {}, got {}",
                MAX_VLAN_ID, value
            )))
        }
    }
}

impl From<VlanId> for i64 {
    fn from(id: VlanId) -> Self {
        id.0 as i64
    }
}

impl FromStr for VlanId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| Error::InvalidRequest(format!("invalid VLAN ID '{}'", s)))?;
        Self::try_from(value)
    }
}

impl fmt::Display for VlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Physical address in the host's `XX-XX-XX-XX-XX-XX` form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress(String);

impl MacAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_separator(c: u8) -> bool {
    matches!(c, b':' | b'-' | b'.')
}

/// Split `input` into hex groups of `group` digits joined by one separator.
fn hex_groups(input: &[u8], group: usize) -> Option<Vec<u8>> {
    let sep = *input.get(group)?;
    if !is_separator(sep) {
        return None;
    }
    let mut digits = Vec::with_capacity(12);
    for (i, &c) in input.iter().enumerate() {
        if (i + 1) % (group + 1) == 0 {
            if c != sep {
                return None;
            }
        } else if c.is_ascii_hexdigit() {
            digits.push(c);
        } else {
            return None;
        }
    }
    Some(digits)
}

impl FromStr for MacAddress {
    type Err = Error;

    /// Accepts `XX:XX:XX:XX:XX:XX`, `XXXX.XXXX.XXXX` and `XXXXXXXXXXXX`,
    /// with `:`, `-` or `.` as separator.
    fn from_str(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        let digits = match bytes.len() {
            17 => hex_groups(bytes, 2),
            14 => hex_groups(bytes, 4),
            12 if bytes.iter().all(u8::is_ascii_hexdigit) => Some(bytes.to_vec()),
            _ => None,
        }
        .filter(|d| d.len() == 12)
        .ok_or_else(|| Error::InvalidRequest(format!("invalid MAC address '{}'", s)))?;

        let normalized = digits
            .chunks(2)
            .map(|pair| String::from_utf8_lossy(pair).to_ascii_uppercase())
            .collect::<Vec<_>>()
            .join("-");
        Ok(Self(normalized))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the target virtual switch is named
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkRef {
    Id(Uuid),
    Name(String),
}

impl NetworkRef {
    /// A token that parses as a GUID is an id, anything else a name
    pub fn parse(token: &str) -> Self {
        match Uuid::parse_str(token.trim()) {
            Ok(id) => NetworkRef::Id(id),
            Err(_) => NetworkRef::Name(token.to_string()),
        }
    }
}

impl fmt::Display for NetworkRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkRef::Id(id) => write!(f, "{}", id),
            NetworkRef::Name(name) => f.write_str(name),
        }
    }
}

/// Input of one attach run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachRequest {
    pub network: NetworkRef,
    pub mac_address: Option<MacAddress>,
    pub vlan_id: Option<VlanId>,
}

impl AttachRequest {
    pub fn builder() -> AttachRequestBuilder {
        AttachRequestBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if let NetworkRef::Name(name) = &self.network {
            if name.trim().is_empty() {
                return Err(Error::InvalidRequest("network name cannot be empty".into()));
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct AttachRequestBuilder {
    network: Option<NetworkRef>,
    mac_address: Option<MacAddress>,
    vlan_id: Option<VlanId>,
}

impl AttachRequestBuilder {
    /// Network name or GUID
    pub fn network(mut self, token: impl AsRef<str>) -> Self {
        self.network = Some(NetworkRef::parse(token.as_ref()));
        self
    }

    pub fn network_id(mut self, id: Uuid) -> Self {
        self.network = Some(NetworkRef::Id(id));
        self
    }

    pub fn mac_address(mut self, mac: Option<MacAddress>) -> Self {
        self.mac_address = mac;
        self
    }

    pub fn vlan_id(mut self, vlan: Option<VlanId>) -> Self {
        self.vlan_id = vlan;
        self
    }

    pub fn build(self) -> Result<AttachRequest> {
        let request = AttachRequest {
            network: self
                .network
                .ok_or_else(|| Error::InvalidRequest("no network specified".into()))?,
            mac_address: self.mac_address,
            vlan_id: self.vlan_id,
        };
        request.validate()?;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vlan_bounds() {
        assert_eq!(VlanId::try_from(0).unwrap().get(), 0);
        assert_eq!(VlanId::try_from(4095).unwrap().get(), 4095);
        assert!(VlanId::try_from(-1).is_err());
        assert!(VlanId::try_from(4096).is_err());
        assert!("4096".parse::<VlanId>().is_err());
        assert!("abc".parse::<VlanId>().is_err());
        assert_eq!(" 42".parse::<VlanId>().unwrap().get(), 42);
    }

    #[test]
    fn test_mac_formats() {
        for input in [
            "00:15:5d:01:02:0a",
            "00-15-5D-01-02-0A",
            "00.15.5d.01.02.0a",
            "0015.5d01.020a",
            "0015-5D01-020A",
            "00155d01020a",
        ] {
            let mac: MacAddress = input.parse().unwrap();
            assert_eq!(mac.as_str(), "00-15-5D-01-02-0A", "input {}", input);
        }
    }

    #[test]
    fn test_mac_rejects_malformed() {
        for input in [
            "",
            "00:15:5d:01:02",
            "00:15-5d:01:02:0a",
            "00_15_5d_01_02_0a",
            "0015.5d01-020a",
            "00155d01020g",
            "00:15:5d:01:02:0az",
            "0:015:5d:01:02:0a",
        ] {
            assert!(input.parse::<MacAddress>().is_err(), "input {}", input);
        }
    }

    #[test]
    fn test_network_ref_parse() {
        assert_eq!(
            NetworkRef::parse("{11111111-1111-1111-1111-111111111111}"),
            NetworkRef::Id(Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap())
        );
        assert_eq!(NetworkRef::parse("Ethernet"), NetworkRef::Name("Ethernet".into()));
    }

    #[test]
    fn test_builder() {
        let request = AttachRequest::builder()
            .network("Ethernet")
            .mac_address(Some("00155d01020a".parse().unwrap()))
            .vlan_id(Some(VlanId::try_from(10).unwrap()))
            .build()
            .unwrap();

        assert_eq!(request.network, NetworkRef::Name("Ethernet".into()));
        assert_eq!(request.mac_address.unwrap().as_str(), "00-15-5D-01-02-0A");
        assert_eq!(request.vlan_id.unwrap().get(), 10);
    }

    #[test]
    fn test_builder_validation() {
        assert!(AttachRequest::builder().build().is_err());
        assert!(AttachRequest::builder().network("  ").build().is_err());
    }
}
