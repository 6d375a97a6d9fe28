//! Host address model: validated IPv4/IPv6 values with numeric ordering
//! and network-membership matching.

use crate::error::{ReportError, Result};
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// An immutable, validated host address.
///
/// Ordering is by (version, numeric value): all IPv4 addresses sort before
/// IPv6, and within a version addresses compare by integer value rather
/// than by string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(IpAddr);

impl Address {
    /// Parse an address, trying IPv4 first and then IPv6.
    ///
    /// The attempts are an explicit ordered list; if none succeeds the
    /// result is an `AddressParse` error carrying the raw input.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if let Ok(v4) = raw.parse::<Ipv4Addr>() {
            return Ok(Self(IpAddr::V4(v4)));
        }
        if let Ok(v6) = raw.parse::<Ipv6Addr>() {
            return Ok(Self(IpAddr::V6(v6)));
        }
        Err(ReportError::AddressParse(raw.to_string()))
    }

    pub fn ip(&self) -> IpAddr {
        self.0
    }

    pub fn is_ipv4(&self) -> bool {
        self.0.is_ipv4()
    }

    pub fn is_ipv6(&self) -> bool {
        self.0.is_ipv6()
    }

    /// Numeric form of the address, zero-extended to 128 bits.
    pub fn numeric(&self) -> u128 {
        match self.0 {
            IpAddr::V4(v4) => u128::from(u32::from(v4)),
            IpAddr::V6(v6) => u128::from_be_bytes(v6.octets()),
        }
    }

    /// True when this address falls inside `network`.
    pub fn in_network(&self, network: &IpNetwork) -> bool {
        network.contains(self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        Self(ip)
    }
}

impl Ord for Address {
    fn cmp(&self, other: &Self) -> Ordering {
        let version = |a: &Address| u8::from(a.is_ipv6());
        version(self)
            .cmp(&version(other))
            .then_with(|| self.numeric().cmp(&other.numeric()))
    }
}

impl PartialOrd for Address {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One entry in an address filter: either an exact address or a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMatcher {
    Exact(Address),
    Network(IpNetwork),
}

impl AddressMatcher {
    /// Parse a filter entry. Plain addresses become exact matchers, CIDR
    /// forms (`10.0.0.0/24`, `fd00::/8`) become network matchers.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if let Ok(address) = Address::parse(raw) {
            return Ok(Self::Exact(address));
        }
        if raw.contains('/') {
            if let Ok(network) = raw.parse::<IpNetwork>() {
                return Ok(Self::Network(network));
            }
        }
        Err(ReportError::AddressParse(raw.to_string()))
    }

    /// Exact equality, or network membership for CIDR matchers.
    pub fn matches(&self, candidate: &Address) -> bool {
        match self {
            Self::Exact(address) => address == candidate,
            Self::Network(network) => candidate.in_network(network),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ipv4() {
        let a = Address::parse("10.0.0.1").unwrap();
        assert!(a.is_ipv4());
        assert_eq!(a.to_string(), "10.0.0.1");
    }

    #[test]
    fn test_parse_ipv6() {
        let a = Address::parse("fd00::1").unwrap();
        assert!(a.is_ipv6());
    }

    #[test]
    fn test_parse_invalid() {
        let err = Address::parse("not-an-ip").unwrap_err();
        assert_eq!(err.to_string(), "Error parsing address: not-an-ip");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert!(Address::parse(" 192.168.1.1 ").is_ok());
    }

    #[test]
    fn test_numeric_ordering() {
        let a = Address::parse("10.0.0.2").unwrap();
        let b = Address::parse("10.0.0.10").unwrap();
        // String ordering would put "10.0.0.10" first.
        assert!(a < b);
    }

    #[test]
    fn test_ipv4_sorts_before_ipv6() {
        let v4 = Address::parse("255.255.255.255").unwrap();
        let v6 = Address::parse("::1").unwrap();
        assert!(v4 < v6);
    }

    #[test]
    fn test_in_network() {
        let a = Address::parse("10.0.0.52").unwrap();
        let net: IpNetwork = "10.0.0.0/24".parse().unwrap();
        assert!(a.in_network(&net));

        let outside = Address::parse("10.0.1.1").unwrap();
        assert!(!outside.in_network(&net));
    }

    #[test]
    fn test_matcher_exact() {
        let m = AddressMatcher::parse("10.0.0.1").unwrap();
        assert!(m.matches(&Address::parse("10.0.0.1").unwrap()));
        assert!(!m.matches(&Address::parse("10.0.0.2").unwrap()));
    }

    #[test]
    fn test_matcher_network() {
        let m = AddressMatcher::parse("10.0.0.0/24").unwrap();
        assert!(m.matches(&Address::parse("10.0.0.200").unwrap()));
        assert!(!m.matches(&Address::parse("10.0.1.1").unwrap()));
    }

    #[test]
    fn test_matcher_invalid() {
        assert!(AddressMatcher::parse("10.0.0.0/99").is_err());
        assert!(AddressMatcher::parse("garbage").is_err());
    }
}
