//! Chain Addresses and Transaction Hashes
//!
//! Thin newtypes over raw byte arrays. Addresses order by their numeric
//! value, which is what keeps validator lists canonical (sorted, no
//! duplicates) before they are written back on-chain.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A 20-byte contract or account address.
///
/// `Ord` compares the raw bytes big-endian, i.e. by numeric value.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    /// The zero address, used by contracts to signal "no entry".
    pub const ZERO: Address = Address([0u8; 20]);

    /// Wrap raw address bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Build an address whose trailing bytes hold `value` big-endian.
    ///
    /// Mostly useful for tests and local tooling.
    #[must_use]
    pub fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// The raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Whether this is the zero address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

/// Error parsing an [`Address`] or [`TxHash`] from a hex string.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid hex for {kind}: {input:?}")]
pub struct ParseAddressError {
    /// What was being parsed ("address" or "transaction hash").
    pub kind: &'static str,
    /// The offending input.
    pub input: String,
}

fn decode_fixed<const N: usize>(kind: &'static str, s: &str) -> Result<[u8; N], ParseAddressError> {
    let raw = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(raw).map_err(|_| ParseAddressError {
        kind,
        input: s.to_string(),
    })?;
    bytes.try_into().map_err(|_| ParseAddressError {
        kind,
        input: s.to_string(),
    })
}

impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fixed("address", s).map(Self)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A 32-byte transaction hash.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxHash([u8; 32]);

impl TxHash {
    /// Wrap raw hash bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Build a hash whose trailing bytes hold `value` big-endian.
    #[must_use]
    pub fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// The raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({self})")
    }
}

impl FromStr for TxHash {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fixed("transaction hash", s).map(Self)
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Serde helpers for amounts and byte payloads crossing the provider
/// boundary.
///
/// JSON numbers cannot hold a full `u256`-range token amount, so amounts
/// travel as decimal strings and byte payloads as `0x`-prefixed hex.
pub mod wire {
    /// `u128` as a decimal string.
    pub mod u128_string {
        use serde::{Deserialize, Deserializer, Serializer};

        /// Serialize a `u128` as a decimal string.
        pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&value.to_string())
        }

        /// Deserialize a `u128` from a decimal string.
        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        }
    }

    /// `Vec<u8>` as a `0x`-prefixed hex string.
    pub mod hex_bytes {
        use serde::{Deserialize, Deserializer, Serializer};

        /// Serialize bytes as `0x`-prefixed hex.
        pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&format!("0x{}", hex::encode(value)))
        }

        /// Deserialize bytes from `0x`-prefixed hex.
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<u8>, D::Error> {
            let s = String::deserialize(deserializer)?;
            hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(serde::de::Error::custom)
        }
    }

    /// `Vec<Vec<u8>>` as a list of `0x`-prefixed hex strings.
    pub mod hex_bytes_list {
        use serde::{Deserialize, Deserializer, Serializer};
        use serde::ser::SerializeSeq;

        /// Serialize a list of byte payloads as hex strings.
        pub fn serialize<S: Serializer>(
            value: &[Vec<u8>],
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            let mut seq = serializer.serialize_seq(Some(value.len()))?;
            for item in value {
                seq.serialize_element(&format!("0x{}", hex::encode(item)))?;
            }
            seq.end()
        }

        /// Deserialize a list of byte payloads from hex strings.
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<Vec<u8>>, D::Error> {
            let items = Vec::<String>::deserialize(deserializer)?;
            items
                .into_iter()
                .map(|s| {
                    hex::decode(s.strip_prefix("0x").unwrap_or(&s))
                        .map_err(serde::de::Error::custom)
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_roundtrip() {
        let addr = Address::from_low_u64(0xdead_beef);
        let parsed: Address = addr.to_string().parse().unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn test_address_ordering_is_numeric() {
        let low = Address::from_low_u64(1);
        let high = Address::from_low_u64(0x1_0000_0000);
        assert!(low < high);

        let mut list = vec![high, low, low];
        list.sort_unstable();
        list.dedup();
        assert_eq!(list, vec![low, high]);
    }

    #[test]
    fn test_address_rejects_bad_hex() {
        assert!("0x1234".parse::<Address>().is_err());
        assert!("not-an-address".parse::<Address>().is_err());
    }

    #[test]
    fn test_zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::from_low_u64(7).is_zero());
    }

    #[test]
    fn test_address_serde_as_string() {
        let addr = Address::from_low_u64(42);
        let json = serde_json::to_string(&addr).unwrap();
        assert!(json.starts_with("\"0x"));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
