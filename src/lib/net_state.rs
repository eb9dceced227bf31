// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;

use crate::{
    AddressFamily, DnsConfig, Interface, InterfaceType, NetCfgError,
    ParseOptions, Route, Subnet,
};

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[non_exhaustive]
/// Canonical network model built by the interpreter and consumed read-only
/// by every renderer.
///
/// Use [NetworkState::from_yaml] or [crate::parse_net_config] to build one:
/// ```
/// let state = netcfg::NetworkState::from_yaml(
///     r#"
/// version: 1
/// config:
///   - type: physical
///     name: eth0
///     subnets:
///       - type: dhcp4
/// "#,
/// )
/// .unwrap();
/// assert_eq!(state.get_iface("eth0").map(|i| i.name()), Some("eth0"));
/// ```
pub struct NetworkState {
    pub(crate) version: u8,
    pub(crate) interfaces: Vec<Interface>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) routes: Vec<Route>,
    #[serde(skip_serializing_if = "DnsConfig::is_empty")]
    pub(crate) dns: DnsConfig,
    // Untouched v2 input, re-emitted by the netplan renderer
    #[serde(skip)]
    pub(crate) v2_config: Option<serde_json::Value>,
}

impl NetworkState {
    /// Parse v1 or v2 network configuration in YAML or JSON format with
    /// default [ParseOptions].
    pub fn from_yaml(content: &str) -> Result<Self, NetCfgError> {
        let value: serde_json::Value = serde_yaml::from_str(content)?;
        crate::parse_net_config(&value, &ParseOptions::default())
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// Interfaces in the order they were first referenced.
    pub fn interfaces(&self) -> impl Iterator<Item = &Interface> {
        self.interfaces.iter()
    }

    /// Interfaces sorted so that every device comes after the devices it is
    /// built upon, name as tie breaker.
    pub(crate) fn interfaces_in_creation_order(&self) -> Vec<&Interface> {
        let mut ifaces: Vec<&Interface> = self.interfaces.iter().collect();
        ifaces.sort_unstable_by(|a, b| {
            (a.iface_type.creation_order(), a.name.as_str())
                .cmp(&(b.iface_type.creation_order(), b.name.as_str()))
        });
        ifaces
    }

    pub fn get_iface(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    /// Global routes, not bound to any subnet.
    pub fn routes(&self) -> &[Route] {
        self.routes.as_slice()
    }

    pub fn dns(&self) -> &DnsConfig {
        &self.dns
    }

    pub fn v2_config(&self) -> Option<&serde_json::Value> {
        self.v2_config.as_ref()
    }

    /// Names of interfaces declaring `bond_master` as given bond, sorted.
    pub fn bond_members(&self, bond_name: &str) -> Vec<&str> {
        let mut ret: Vec<&str> = self
            .interfaces
            .iter()
            .filter(|i| i.bond_master.as_deref() == Some(bond_name))
            .map(|i| i.name.as_str())
            .collect();
        ret.sort_unstable();
        ret
    }

    pub fn bridge_ports(&self, bridge_name: &str) -> Vec<&str> {
        let mut ret: Vec<&str> = self
            .get_iface(bridge_name)
            .and_then(|i| i.bridge.as_ref())
            .map(|b| b.ports.iter().map(String::as_str).collect())
            .unwrap_or_default();
        ret.sort_unstable();
        ret.dedup();
        ret
    }

    /// Name of the bridge using given interface as port.
    pub fn bridge_of(&self, iface_name: &str) -> Option<&str> {
        self.interfaces
            .iter()
            .filter(|i| i.iface_type == InterfaceType::Bridge)
            .find(|i| {
                i.bridge
                    .as_ref()
                    .map(|b| b.ports.iter().any(|p| p == iface_name))
                    .unwrap_or_default()
            })
            .map(|i| i.name.as_str())
    }

    /// Interface holding a static subnet which contains the gateway of given
    /// route. The lowest interface name wins when several match.
    pub fn route_owner(&self, route: &Route) -> Option<&str> {
        let gw = route.gateway.as_ref()?;
        let mut owners: Vec<&str> = self
            .interfaces
            .iter()
            .filter(|i| {
                i.subnets.iter().any(|s| s.is_static() && s.contains(gw))
            })
            .map(|i| i.name.as_str())
            .collect();
        owners.sort_unstable();
        owners.first().copied()
    }

    /// Interface explicitly declaring a default route of given family, either
    /// as a subnet route or as a global route owned by it.
    pub fn explicit_default_route_iface(
        &self,
        family: AddressFamily,
    ) -> Option<&str> {
        let is_family_default =
            |r: &Route| r.is_default() && r.family() == family;
        let mut names: Vec<&str> = self
            .interfaces
            .iter()
            .filter(|i| {
                i.subnets
                    .iter()
                    .any(|s| s.routes.iter().any(is_family_default))
            })
            .map(|i| i.name.as_str())
            .collect();
        names.sort_unstable();
        if let Some(name) = names.first().copied() {
            return Some(name);
        }
        self.routes
            .iter()
            .filter(|r| is_family_default(*r))
            .find_map(|r| self.route_owner(r))
    }

    /// The one interface expected to carry the default route of given
    /// family: the explicit declarer, otherwise the lowest named interface
    /// holding a static gateway of that family.
    pub fn default_route_iface(&self, family: AddressFamily) -> Option<&str> {
        if let Some(name) = self.explicit_default_route_iface(family) {
            return Some(name);
        }
        let mut names: Vec<&str> = self
            .interfaces
            .iter()
            .filter(|i| i.gateway_of(family).is_some())
            .map(|i| i.name.as_str())
            .collect();
        names.sort_unstable();
        names.first().copied()
    }

    /// Gateway of a static subnet to render as default route. Only the
    /// first gateway of the [Self::default_route_iface] interface qualifies,
    /// so at most one default route per family reaches the backend.
    pub(crate) fn default_gateway_of(
        &self,
        iface: &Interface,
        subnet: &Subnet,
    ) -> Option<String> {
        if !subnet.is_static() {
            return None;
        }
        let gw = subnet.gateway()?;
        let family = subnet.family();
        let is_first = iface
            .subnets
            .iter()
            .find(|s| {
                s.is_static() && s.family() == family && s.gateway().is_some()
            })
            .map(|s| std::ptr::eq(s, subnet))
            .unwrap_or_default();
        if is_first
            && self.default_route_iface(family) == Some(iface.name.as_str())
        {
            Some(gw)
        } else {
            log::info!(
                "Not using gateway {gw} of interface {} as {family} default \
                route",
                iface.name
            );
            None
        }
    }

    /// Global routes owned by given interface.
    pub(crate) fn global_routes_of(&self, iface_name: &str) -> Vec<&Route> {
        self.routes
            .iter()
            .filter(|r| self.route_owner(r) == Some(iface_name))
            .collect()
    }

    pub(crate) fn unowned_global_routes(&self) -> Vec<&Route> {
        self.routes
            .iter()
            .filter(|r| self.route_owner(r).is_none())
            .collect()
    }

    pub(crate) fn uses_ipv6(&self) -> bool {
        self.interfaces
            .iter()
            .any(|i| i.has_family(AddressFamily::IPv6))
    }
}
