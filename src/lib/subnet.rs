// SPDX-License-Identifier: Apache-2.0

use std::net::IpAddr;

use serde::{Deserialize, Serialize, Serializer};

use crate::{
    ip::IpNetwork, AddressFamily, DnsConfig, ErrorKind, NetCfgError, Route,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SubnetType {
    #[serde(rename = "static")]
    Static,
    #[serde(rename = "static6")]
    Static6,
    #[serde(rename = "dhcp4", alias = "dhcp")]
    Dhcp4,
    #[serde(rename = "dhcp6")]
    Dhcp6,
    #[serde(rename = "ipv6_slaac")]
    Ipv6Slaac,
    #[serde(rename = "ipv6_dhcpv6-stateless")]
    Ipv6DhcpStateless,
    #[serde(rename = "ipv6_dhcpv6-stateful")]
    Ipv6DhcpStateful,
    #[serde(rename = "manual")]
    Manual,
}

impl std::fmt::Display for SubnetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Static => "static",
                Self::Static6 => "static6",
                Self::Dhcp4 => "dhcp4",
                Self::Dhcp6 => "dhcp6",
                Self::Ipv6Slaac => "ipv6_slaac",
                Self::Ipv6DhcpStateless => "ipv6_dhcpv6-stateless",
                Self::Ipv6DhcpStateful => "ipv6_dhcpv6-stateful",
                Self::Manual => "manual",
            }
        )
    }
}

impl SubnetType {
    pub fn is_static(&self) -> bool {
        matches!(self, Self::Static | Self::Static6)
    }

    /// Whether this subnet asks for any kind of dynamic configuration of
    /// given address family.
    pub fn is_dhcp(&self, family: AddressFamily) -> bool {
        match family {
            AddressFamily::IPv4 => *self == Self::Dhcp4,
            AddressFamily::IPv6 => matches!(
                self,
                Self::Dhcp6
                    | Self::Ipv6DhcpStateful
                    | Self::Ipv6DhcpStateless
                    | Self::Ipv6Slaac
            ),
        }
    }

    /// Family implied by the type alone, `None` for `static` and `manual`.
    pub fn implied_family(&self) -> Option<AddressFamily> {
        match self {
            Self::Dhcp4 => Some(AddressFamily::IPv4),
            Self::Static | Self::Manual => None,
            _ => Some(AddressFamily::IPv6),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
/// When the interface holding the subnet is brought up.
pub enum Control {
    Auto,
    Hotplug,
    Manual,
}

impl Default for Control {
    fn default() -> Self {
        Self::Auto
    }
}

impl std::fmt::Display for Control {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Auto => "auto",
                Self::Hotplug => "hotplug",
                Self::Manual => "manual",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Subnet {
    pub(crate) kind: SubnetType,
    pub(crate) address: Option<IpNetwork>,
    pub(crate) gateway: Option<IpAddr>,
    pub(crate) routes: Vec<Route>,
    pub(crate) dns: DnsConfig,
    pub(crate) control: Control,
    pub(crate) metric: Option<u32>,
    pub(crate) mtu: Option<u32>,
}

impl Subnet {
    pub(crate) fn new(kind: SubnetType) -> Self {
        Self {
            kind,
            address: None,
            gateway: None,
            routes: Vec::new(),
            dns: DnsConfig::new(),
            control: Control::default(),
            metric: None,
            mtu: None,
        }
    }

    /// Drop or reject fields which the subnet type does not allow.
    pub(crate) fn sanitize(&mut self) -> Result<(), NetCfgError> {
        if self.kind.is_static() {
            let addr = match self.address.as_ref() {
                Some(a) => a,
                None => {
                    return Err(NetCfgError::new(
                        ErrorKind::InvalidCommand,
                        format!(
                            "Subnet type {} requires an address",
                            self.kind
                        ),
                    ));
                }
            };
            if self.kind == SubnetType::Static6
                && addr.family() != AddressFamily::IPv6
            {
                return Err(NetCfgError::new(
                    ErrorKind::InvalidCommand,
                    format!("Subnet type static6 got IPv4 address {addr}"),
                ));
            }
            if let Some(gw) = self.gateway.as_ref() {
                if gw.is_ipv6() != addr.addr.is_ipv6() {
                    return Err(NetCfgError::new(
                        ErrorKind::InvalidCommand,
                        format!(
                            "Gateway {gw} is not in the address family \
                            of {addr}"
                        ),
                    ));
                }
            }
        } else {
            if let Some(addr) = self.address.take() {
                log::warn!(
                    "Ignoring address {addr} of {} subnet",
                    self.kind
                );
            }
            if let Some(gw) = self.gateway.take() {
                log::warn!(
                    "Ignoring gateway {gw} of {} subnet",
                    self.kind
                );
            }
        }
        Ok(())
    }

    pub fn kind(&self) -> SubnetType {
        self.kind
    }

    pub fn family(&self) -> AddressFamily {
        match self.address.as_ref() {
            Some(a) => a.family(),
            None => self.kind.implied_family().unwrap_or_default(),
        }
    }

    pub fn is_static(&self) -> bool {
        self.kind.is_static()
    }

    pub fn is_ipv6(&self) -> bool {
        self.family() == AddressFamily::IPv6
    }

    /// Address without prefix.
    pub fn address(&self) -> Option<String> {
        self.address.as_ref().map(|a| a.addr.to_string())
    }

    pub fn prefix(&self) -> Option<u8> {
        self.address.as_ref().map(|a| a.prefix)
    }

    pub fn netmask(&self) -> Option<String> {
        self.address.as_ref().and_then(|a| a.netmask())
    }

    pub(crate) fn cidr(&self) -> Option<String> {
        self.address.as_ref().map(|a| a.to_string())
    }

    pub fn gateway(&self) -> Option<String> {
        self.gateway.map(|g| g.to_string())
    }

    pub fn routes(&self) -> &[Route] {
        self.routes.as_slice()
    }

    pub fn dns(&self) -> &DnsConfig {
        &self.dns
    }

    pub fn control(&self) -> Control {
        self.control
    }

    pub fn metric(&self) -> Option<u32> {
        self.metric
    }

    pub fn mtu(&self) -> Option<u32> {
        self.mtu
    }

    pub(crate) fn contains(&self, ip: &IpAddr) -> bool {
        self.address
            .as_ref()
            .map(|a| a.contains(ip))
            .unwrap_or_default()
    }
}

#[derive(Serialize)]
struct SubnetShow<'a> {
    #[serde(rename = "type")]
    kind: SubnetType,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prefix: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    netmask: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gateway: Option<String>,
    #[serde(skip_serializing_if = "<[Route]>::is_empty")]
    routes: &'a [Route],
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    dns_nameservers: &'a [String],
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    dns_search: &'a [String],
    control: Control,
    #[serde(skip_serializing_if = "Option::is_none")]
    metric: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mtu: Option<u32>,
}

impl Serialize for Subnet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        SubnetShow {
            kind: self.kind,
            address: self.address(),
            prefix: self.prefix(),
            netmask: self.netmask(),
            gateway: self.gateway(),
            routes: self.routes.as_slice(),
            dns_nameservers: self.dns.nameservers.as_slice(),
            dns_search: self.dns.search.as_slice(),
            control: self.control,
            metric: self.metric,
            mtu: self.mtu,
        }
        .serialize(serializer)
    }
}
