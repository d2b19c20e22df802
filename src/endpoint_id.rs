//! Deterministic endpoint identity
//!
//! The bridge endpoint for a network gets an id derived from the network id,
//! so a later run can recognize the endpoint it created without keeping any
//! state of its own.

use uuid::Uuid;

/// Salt XORed over the leading bytes of the network id.
pub const ENDPOINT_SALT: &[u8; 10] = b"WSL2BrdgEp";

/// Derive the bridge endpoint id for `network_id`.
///
/// The salt is applied to the GUID's native memory layout (little-endian
/// `Data1`..`Data3`), which is how the host hands GUIDs around. Bytes past the
/// salt length pass through unchanged. Applying the derivation twice yields
/// the original id.
pub fn derive_endpoint_id(network_id: &Uuid) -> Uuid {
    xor_guid(network_id, ENDPOINT_SALT)
}

fn xor_guid(input: &Uuid, key: &[u8]) -> Uuid {
    let mut bytes = input.to_bytes_le();
    for (b, k) in bytes.iter_mut().zip(key) {
        *b ^= k;
    }
    Uuid::from_bytes_le(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ethernet_id() -> Uuid {
        Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap()
    }

    #[test]
    fn test_derivation_matches_known_bytes() {
        let derived = derive_endpoint_id(&ethernet_id());
        assert_eq!(
            derived.to_bytes_le(),
            [
                0x46, 0x42, 0x5D, 0x23, 0x53, 0x63, 0x75, 0x76, 0x54, 0x61, 0x11, 0x11, 0x11, 0x11,
                0x11, 0x11
            ]
        );
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let id = Uuid::new_v4();
        assert_eq!(derive_endpoint_id(&id), derive_endpoint_id(&id));
    }

    #[test]
    fn test_derivation_is_an_involution() {
        for _ in 0..32 {
            let id = Uuid::new_v4();
            let derived = derive_endpoint_id(&id);
            assert_ne!(derived, id);
            assert_eq!(derive_endpoint_id(&derived), id);
        }
    }

    #[test]
    fn test_trailing_bytes_pass_through() {
        let id = Uuid::new_v4();
        let before = id.to_bytes_le();
        let after = derive_endpoint_id(&id).to_bytes_le();
        assert_eq!(before[10..], after[10..]);
        for i in 0..10 {
            assert_eq!(before[i] ^ ENDPOINT_SALT[i], after[i]);
        }
    }

    #[test]
    fn test_uses_native_guid_layout() {
        // Data1 is little-endian in memory, so the first salt byte lands on
        // the lowest byte of the first group.
        let id = Uuid::parse_str("00000000-0000-0000-0000-000000000000").unwrap();
        let derived = derive_endpoint_id(&id);
        assert_eq!(derived.to_string(), "324c5357-7242-6764-4570-000000000000");
    }
}
