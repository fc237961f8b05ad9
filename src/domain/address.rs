use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{DashError, Result};

/// Lowercased form of a chain address, used as the key of every
/// address-indexed map so lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalAddress(String);

impl CanonicalAddress {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse into a typed address; fails for anything that is not 20 hex bytes
    pub fn parse(&self) -> Result<Address> {
        parse_address(&self.0)
    }
}

impl std::fmt::Display for CanonicalAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CanonicalAddress {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

pub fn parse_address(raw: &str) -> Result<Address> {
    Address::from_str(raw.trim()).map_err(|e| DashError::AddressParsing(format!("{raw}: {e}")))
}

/// Deduplicate by canonical form, keeping first-seen order
pub fn dedup_canonical<'a, I>(addresses: I) -> Vec<CanonicalAddress>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for raw in addresses {
        let canonical = CanonicalAddress::new(raw);
        if canonical.as_str().is_empty() {
            continue;
        }
        if seen.insert(canonical.clone()) {
            out.push(canonical);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_is_case_insensitive() {
        let a = CanonicalAddress::new("0xAbCdEf0000000000000000000000000000000001");
        let b = CanonicalAddress::new(" 0xabcdef0000000000000000000000000000000001 ");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "0xabcdef0000000000000000000000000000000001");
    }

    #[test]
    fn test_dedup_keeps_first_order() {
        let out = dedup_canonical([
            "0xB000000000000000000000000000000000000002",
            "0xa000000000000000000000000000000000000001",
            "0xb000000000000000000000000000000000000002",
            "",
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_str(), "0xb000000000000000000000000000000000000002");
        assert_eq!(out[1].as_str(), "0xa000000000000000000000000000000000000001");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(CanonicalAddress::new("not-an-address").parse().is_err());
        assert!(CanonicalAddress::new("0xcA11bde05977b3631167028862bE2a173976CA11")
            .parse()
            .is_ok());
    }
}
