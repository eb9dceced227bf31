// SPDX-License-Identifier: Apache-2.0

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ErrorKind, NetCfgError};

const IPV4_ADDR_LEN: u8 = 32;
const IPV6_ADDR_LEN: u8 = 128;
// Used when an address arrives with neither prefix nor netmask.
const DEFAULT_IPV4_PREFIX: u8 = 24;
const DEFAULT_IPV6_PREFIX: u8 = 64;

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum AddressFamily {
    IPv4,
    IPv6,
}

impl Default for AddressFamily {
    fn default() -> Self {
        Self::IPv4
    }
}

impl std::fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::IPv4 => "ipv4",
                Self::IPv6 => "ipv6",
            }
        )
    }
}

impl AddressFamily {
    pub(crate) fn of_addr(addr: &str) -> Self {
        if is_ipv6_addr(addr) {
            Self::IPv6
        } else {
            Self::IPv4
        }
    }

    pub(crate) fn max_prefix(&self) -> u8 {
        match self {
            Self::IPv4 => IPV4_ADDR_LEN,
            Self::IPv6 => IPV6_ADDR_LEN,
        }
    }
}

pub(crate) fn is_ipv6_addr(addr: &str) -> bool {
    addr.contains(':')
}

/// Convert an IPv4 netmask such as `255.255.255.0` into a prefix length by
/// summing the set bits of the four octets. A value without any dot is taken
/// as an already numeric prefix.
pub fn ipv4_mask_to_net_prefix(mask: &str) -> Result<u8, NetCfgError> {
    let mask = mask.trim();
    if !mask.contains('.') {
        return parse_prefix(mask, AddressFamily::IPv4);
    }
    let addr = Ipv4Addr::from_str(mask).map_err(|e| {
        NetCfgError::new(
            ErrorKind::InvalidArgument,
            format!("Invalid IPv4 netmask {mask}: {e}"),
        )
    })?;
    Ok(addr.octets().iter().map(|o| o.count_ones() as u8).sum())
}

/// Standard 32 bits mask of given prefix length in dotted quad format.
pub fn net_prefix_to_ipv4_mask(prefix: u8) -> Result<String, NetCfgError> {
    if prefix > IPV4_ADDR_LEN {
        return Err(NetCfgError::new(
            ErrorKind::InvalidArgument,
            format!("Invalid IPv4 prefix length {prefix}"),
        ));
    }
    let mask: u32 = if prefix == 0 {
        0
    } else {
        u32::MAX << (IPV4_ADDR_LEN - prefix)
    };
    Ok(Ipv4Addr::from(mask).to_string())
}

/// Accept either an integer prefix or a hex group netmask like
/// `ffff:ffff:ffff:ffff::`. Hex masks are converted by counting the leading
/// one bits of each 16 bits group.
pub fn ipv6_mask_to_net_prefix(mask: &str) -> Result<u8, NetCfgError> {
    let mask = mask.trim();
    if !mask.contains(':') {
        return parse_prefix(mask, AddressFamily::IPv6);
    }
    let addr = Ipv6Addr::from_str(mask).map_err(|e| {
        NetCfgError::new(
            ErrorKind::InvalidArgument,
            format!("Invalid IPv6 netmask {mask}: {e}"),
        )
    })?;
    let mut prefix: u8 = 0;
    let mut ended = false;
    for group in addr.segments() {
        if ended {
            if group != 0 {
                return Err(invalid_ipv6_mask(mask));
            }
            continue;
        }
        let ones = group.leading_ones() as u8;
        // Remaining bits of a partial group must all be zero
        if ones < 16 && group.checked_shl(ones as u32).unwrap_or(0) != 0 {
            return Err(invalid_ipv6_mask(mask));
        }
        prefix += ones;
        if ones < 16 {
            ended = true;
        }
    }
    Ok(prefix)
}

pub fn net_prefix_to_ipv6_mask(prefix: u8) -> Result<String, NetCfgError> {
    if prefix > IPV6_ADDR_LEN {
        return Err(NetCfgError::new(
            ErrorKind::InvalidArgument,
            format!("Invalid IPv6 prefix length {prefix}"),
        ));
    }
    let mask: u128 = if prefix == 0 {
        0
    } else {
        u128::MAX << (IPV6_ADDR_LEN - prefix)
    };
    Ok(Ipv6Addr::from(mask).to_string())
}

fn invalid_ipv6_mask(mask: &str) -> NetCfgError {
    NetCfgError::new(
        ErrorKind::InvalidArgument,
        format!("Invalid IPv6 netmask {mask}: bits are not contiguous"),
    )
}

fn parse_prefix(value: &str, family: AddressFamily) -> Result<u8, NetCfgError> {
    match value.parse::<u8>() {
        Ok(p) if p <= family.max_prefix() => Ok(p),
        _ => Err(NetCfgError::new(
            ErrorKind::InvalidArgument,
            format!("Invalid {family} prefix length {value}"),
        )),
    }
}

/// Address with its prefix length, netmask is derived on demand so that it
/// can never disagree with the prefix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct IpNetwork {
    pub(crate) addr: IpAddr,
    pub(crate) prefix: u8,
}

impl IpNetwork {
    /// Resolve the address, prefix and netmask keys of a v1 entry.
    ///
    /// Priority: a `/N` suffix on the address, then explicit `prefix`, then
    /// `netmask`, then 24 for IPv4 or 64 for IPv6.
    pub(crate) fn normalize(
        address: &str,
        prefix: Option<&str>,
        netmask: Option<&str>,
    ) -> Result<Self, NetCfgError> {
        let (addr_str, cidr_prefix) = match address.split_once('/') {
            Some((a, p)) => (a.trim(), Some(p.trim())),
            None => (address.trim(), None),
        };
        let addr = IpAddr::from_str(addr_str).map_err(|e| {
            NetCfgError::new(
                ErrorKind::InvalidArgument,
                format!("Address {address} is not a valid ip network: {e}"),
            )
        })?;
        let family = if addr.is_ipv6() {
            AddressFamily::IPv6
        } else {
            AddressFamily::IPv4
        };
        let mask_to_prefix = |m: &str| match family {
            AddressFamily::IPv4 => ipv4_mask_to_net_prefix(m),
            AddressFamily::IPv6 => ipv6_mask_to_net_prefix(m),
        };

        let prefix_len = if let Some(p) = cidr_prefix {
            let p = mask_to_prefix(p)?;
            if let Some(explicit) = prefix {
                if explicit.trim() != p.to_string() {
                    log::warn!(
                        "Overwriting existing prefix {explicit} with {p} \
                        for address {address}"
                    );
                }
            }
            p
        } else if let Some(p) = prefix {
            parse_prefix(p.trim(), family)?
        } else if let Some(m) = netmask {
            mask_to_prefix(m)?
        } else {
            match family {
                AddressFamily::IPv4 => DEFAULT_IPV4_PREFIX,
                AddressFamily::IPv6 => DEFAULT_IPV6_PREFIX,
            }
        };
        Ok(Self {
            addr,
            prefix: prefix_len,
        })
    }

    pub(crate) fn family(&self) -> AddressFamily {
        if self.addr.is_ipv6() {
            AddressFamily::IPv6
        } else {
            AddressFamily::IPv4
        }
    }

    /// Netmask in dotted quad format, IPv4 only.
    pub(crate) fn netmask(&self) -> Option<String> {
        match self.family() {
            AddressFamily::IPv4 => net_prefix_to_ipv4_mask(self.prefix).ok(),
            AddressFamily::IPv6 => None,
        }
    }

    pub(crate) fn contains(&self, ip: &IpAddr) -> bool {
        match (self.addr, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let mask = if self.prefix == 0 {
                    0
                } else {
                    u32::MAX << (IPV4_ADDR_LEN - self.prefix)
                };
                u32::from(net) & mask == u32::from(*ip) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let mask = if self.prefix == 0 {
                    0
                } else {
                    u128::MAX << (IPV6_ADDR_LEN - self.prefix)
                };
                u128::from(net) & mask == u128::from(*ip) & mask
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for IpNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}
