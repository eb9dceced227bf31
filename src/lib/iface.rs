// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::{
    AddressFamily, BondConfig, BridgeConfig, DnsConfig, Subnet, VlanConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum InterfaceType {
    Physical,
    Bond,
    Bridge,
    Vlan,
    Loopback,
    Infiniband,
}

impl Default for InterfaceType {
    fn default() -> Self {
        Self::Physical
    }
}

impl std::fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                InterfaceType::Physical => "physical",
                InterfaceType::Bond => "bond",
                InterfaceType::Bridge => "bridge",
                InterfaceType::Vlan => "vlan",
                InterfaceType::Loopback => "loopback",
                InterfaceType::Infiniband => "infiniband",
            }
        )
    }
}

impl InterfaceType {
    // Devices must be declared before the controllers and VLANs using them.
    pub(crate) fn creation_order(&self) -> u8 {
        match self {
            InterfaceType::Loopback => 0,
            InterfaceType::Physical => 1,
            InterfaceType::Infiniband => 2,
            InterfaceType::Bond => 3,
            InterfaceType::Bridge => 4,
            InterfaceType::Vlan => 5,
        }
    }
}

/// Per address family `dhcp4-overrides`/`dhcp6-overrides` of netplan.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct DhcpOverrides {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    pub use_dns: Option<bool>,
    /// `true`, `false` or `route`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::deserializer::option_scalar_as_string"
    )]
    pub use_domains: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    pub use_hostname: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    pub use_ntp: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    pub send_hostname: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    pub route_metric: Option<u32>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    pub use_mtu: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    pub use_routes: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[non_exhaustive]
pub struct Interface {
    pub name: String,
    #[serde(rename = "type")]
    pub iface_type: InterfaceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subnets: Vec<Subnet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bond: Option<BondConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge: Option<BridgeConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan: Option<VlanConfig>,
    /// Name of the bond this interface is a member of.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bond_master: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept_ra: Option<bool>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub wakeonlan: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    /// Kernel driver to match the device by.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    /// Resolver settings bound to this device.
    #[serde(skip_serializing_if = "DnsConfig::is_empty")]
    pub dns: DnsConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhcp4_overrides: Option<DhcpOverrides>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhcp6_overrides: Option<DhcpOverrides>,
    /// Legacy `dhcp4domain`: `true`, `false` or `route`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhcp4_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhcp6_domain: Option<String>,
    // Auto-created for a bond or bridge member nobody declared.
    #[serde(skip)]
    pub(crate) placeholder: bool,
}

impl Interface {
    pub fn new(name: &str, iface_type: InterfaceType) -> Self {
        Self {
            name: name.to_string(),
            iface_type,
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn has_dhcp(&self, family: AddressFamily) -> bool {
        self.subnets.iter().any(|s| s.kind().is_dhcp(family))
    }

    pub fn has_family(&self, family: AddressFamily) -> bool {
        self.subnets.iter().any(|s| s.family() == family)
    }

    /// Static subnets carrying a gateway of given family.
    pub(crate) fn gateway_of(&self, family: AddressFamily) -> Option<String> {
        self.subnets
            .iter()
            .filter(|s| s.is_static() && s.family() == family)
            .find_map(|s| s.gateway())
    }

    pub(crate) fn dhcp_overrides(
        &self,
        family: AddressFamily,
    ) -> Option<&DhcpOverrides> {
        match family {
            AddressFamily::IPv4 => self.dhcp4_overrides.as_ref(),
            AddressFamily::IPv6 => self.dhcp6_overrides.as_ref(),
        }
    }

    pub(crate) fn dhcp_domain(&self, family: AddressFamily) -> Option<&str> {
        match family {
            AddressFamily::IPv4 => self.dhcp4_domain.as_deref(),
            AddressFamily::IPv6 => self.dhcp6_domain.as_deref(),
        }
    }

    // Subnet level DNS first, then device level.
    pub(crate) fn all_dns(&self) -> DnsConfig {
        let mut dns = DnsConfig::new();
        for subnet in self.subnets.iter() {
            dns.extend(&subnet.dns().nameservers, &subnet.dns().search);
        }
        dns.extend(&self.dns.nameservers, &self.dns.search);
        dns
    }
}
