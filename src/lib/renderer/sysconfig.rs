// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{RenderedFile, Renderer, RendererKind};
use crate::{
    files::DEFAULT_FILE_MODE, AddressFamily, BridgeOption, Control,
    DnsConfig, Interface, InterfaceType, NetCfgError, NetworkState,
    Route, SubnetType,
};

const HEADER: &str = "# Created by netcfg automatically, do not edit.\n#\n";
const MAX_NAMESERVERS: usize = 3;
const RHEL_AUTOCONNECT_PRIORITY: &str = "120";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum SysconfigFlavor {
    Rhel,
    Suse,
}

impl Default for SysconfigFlavor {
    fn default() -> Self {
        Self::Rhel
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
#[non_exhaustive]
pub struct SysconfigOptions {
    pub flavor: SysconfigFlavor,
    /// Folder holding `ifcfg-*` and route files. Defaults per flavor.
    pub sourceparts_path: Option<String>,
    /// Resolver file.
    pub sourcelist_path: String,
    /// Global networking switches, RHEL only.
    pub network_conf_path: String,
}

impl Default for SysconfigOptions {
    fn default() -> Self {
        Self {
            flavor: SysconfigFlavor::default(),
            sourceparts_path: None,
            sourcelist_path: "etc/resolv.conf".to_string(),
            network_conf_path: "etc/sysconfig/network".to_string(),
        }
    }
}

impl SysconfigOptions {
    pub fn ifcfg_dir(&self) -> &str {
        match self.sourceparts_path.as_deref() {
            Some(p) => p,
            None => match self.flavor {
                SysconfigFlavor::Rhel => "etc/sysconfig/network-scripts",
                SysconfigFlavor::Suse => "etc/sysconfig/network",
            },
        }
    }
}

/// Sorted `KEY=value` file of the ifcfg family.
#[derive(Debug, Default)]
struct ConfigMap {
    entries: BTreeMap<String, String>,
}

impl ConfigMap {
    fn set(&mut self, key: &str, value: impl ToString) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn to_content(&self) -> String {
        let mut content = HEADER.to_string();
        for (key, value) in self.entries.iter() {
            if value.contains(char::is_whitespace) {
                content += &format!("{key}=\"{value}\"\n");
            } else {
                content += &format!("{key}={value}\n");
            }
        }
        content
    }
}

/// RHEL and SUSE `ifcfg` renderer.
#[derive(Debug, Clone, Default)]
pub struct SysconfigRenderer {
    opts: SysconfigOptions,
}

impl SysconfigRenderer {
    pub fn new(opts: SysconfigOptions) -> Self {
        Self { opts }
    }

    fn is_suse(&self) -> bool {
        self.opts.flavor == SysconfigFlavor::Suse
    }

    fn path(&self, file_name: &str) -> String {
        format!("{}/{file_name}", self.opts.ifcfg_dir().trim_end_matches('/'))
    }

    fn render_iface(
        &self,
        state: &NetworkState,
        iface: &Interface,
    ) -> Vec<RenderedFile> {
        let mut ret = Vec::new();
        let mut cfg = ConfigMap::default();
        let mut aliases: Vec<ConfigMap> = Vec::new();
        if self.is_suse() {
            self.suse_base(&mut cfg, iface);
        } else {
            self.rhel_base(&mut cfg, iface);
        }
        self.render_subnets(&mut cfg, &mut aliases, iface);
        self.render_default_route(&mut cfg, state, iface);
        self.render_dns(&mut cfg, iface);
        self.render_bond(&mut cfg, state, iface);
        self.render_bridge(&mut cfg, state, iface);
        self.render_vlan(&mut cfg, iface);

        ret.push(RenderedFile::new(
            &self.path(&format!("ifcfg-{}", iface.name)),
            cfg.to_content(),
            DEFAULT_FILE_MODE,
        ));
        for (index, alias) in aliases.into_iter().enumerate() {
            ret.push(RenderedFile::new(
                &self.path(&format!("ifcfg-{}:{}", iface.name, index + 1)),
                alias.to_content(),
                DEFAULT_FILE_MODE,
            ));
        }
        ret.extend(self.render_routes(state, iface));
        ret
    }

    fn rhel_base(&self, cfg: &mut ConfigMap, iface: &Interface) {
        cfg.set("DEVICE", &iface.name);
        cfg.set("AUTOCONNECT_PRIORITY", RHEL_AUTOCONNECT_PRIORITY);
        cfg.set("BOOTPROTO", "none");
        cfg.set("USERCTL", "no");
        let onboot = iface
            .subnets
            .first()
            .map(|s| s.control() != Control::Manual)
            .unwrap_or(true);
        cfg.set("ONBOOT", yes_no(onboot));
        match iface.iface_type {
            InterfaceType::Physical => cfg.set("TYPE", "Ethernet"),
            InterfaceType::Bond => cfg.set("TYPE", "Bond"),
            InterfaceType::Bridge => cfg.set("TYPE", "Bridge"),
            InterfaceType::Infiniband => cfg.set("TYPE", "InfiniBand"),
            _ => (),
        }
        if let Some(mac) = iface.mac_address.as_deref() {
            match iface.iface_type {
                InterfaceType::Physical | InterfaceType::Infiniband => {
                    cfg.set("HWADDR", mac)
                }
                _ => cfg.set("MACADDR", mac),
            }
        }
        if let Some(mtu) = iface.mtu {
            cfg.set("MTU", mtu);
        }
    }

    fn suse_base(&self, cfg: &mut ConfigMap, iface: &Interface) {
        cfg.set("BOOTPROTO", "static");
        let startmode = if iface.bond_master.is_some() {
            "hotplug"
        } else {
            match iface.subnets.first().map(|s| s.control()) {
                Some(Control::Hotplug) => "hotplug",
                Some(Control::Manual) => "manual",
                _ => "auto",
            }
        };
        cfg.set("STARTMODE", startmode);
        if let Some(mac) = iface.mac_address.as_deref() {
            cfg.set("LLADDR", mac);
        }
        if let Some(mtu) = iface.mtu {
            cfg.set("MTU", mtu);
        }
        if iface.bond_master.is_some() {
            cfg.set("BOOTPROTO", "none");
        }
    }

    fn render_subnets(
        &self,
        cfg: &mut ConfigMap,
        aliases: &mut Vec<ConfigMap>,
        iface: &Interface,
    ) {
        let mut dhcp4 = false;
        let mut dhcp6 = false;
        let mut v4_index = 0usize;
        let mut v6_addrs: Vec<String> = Vec::new();
        let mut suse_index = 0usize;
        for subnet in iface.subnets.iter() {
            match subnet.kind() {
                SubnetType::Dhcp4 => dhcp4 = true,
                SubnetType::Dhcp6 | SubnetType::Ipv6DhcpStateful => {
                    dhcp6 = true;
                    if self.is_suse() {
                        cfg.set("DHCLIENT6_MODE", "managed");
                    } else {
                        cfg.set("IPV6INIT", "yes");
                        cfg.set("DHCPV6C", "yes");
                    }
                }
                SubnetType::Ipv6DhcpStateless => {
                    dhcp6 = true;
                    if self.is_suse() {
                        cfg.set("DHCLIENT6_MODE", "info");
                    } else {
                        cfg.set("IPV6INIT", "yes");
                        cfg.set("IPV6_AUTOCONF", "yes");
                        cfg.set("DHCPV6C", "yes");
                        cfg.set("DHCPV6C_OPTIONS", "-S");
                    }
                }
                SubnetType::Ipv6Slaac => {
                    if self.is_suse() {
                        dhcp6 = true;
                        cfg.set("DHCLIENT6_MODE", "info");
                    } else {
                        cfg.set("IPV6INIT", "yes");
                        cfg.set("IPV6_AUTOCONF", "yes");
                    }
                }
                SubnetType::Manual => (),
                SubnetType::Static | SubnetType::Static6 => {
                    if self.is_suse() {
                        let suffix = if suse_index == 0 {
                            String::new()
                        } else {
                            format!("_{suse_index}")
                        };
                        suse_index += 1;
                        match subnet.family() {
                            AddressFamily::IPv4 => {
                                if let Some(a) = subnet.address() {
                                    cfg.set(&format!("IPADDR{suffix}"), a);
                                }
                                if let Some(m) = subnet.netmask() {
                                    cfg.set(&format!("NETMASK{suffix}"), m);
                                }
                            }
                            AddressFamily::IPv6 => {
                                if let Some(a) = subnet.cidr() {
                                    cfg.set(&format!("IPADDR6{suffix}"), a);
                                }
                            }
                        }
                        continue;
                    }
                    match subnet.family() {
                        AddressFamily::IPv4 => {
                            let target = if v4_index == 0 {
                                &mut *cfg
                            } else {
                                aliases.push(ConfigMap::default());
                                let alias = match aliases.last_mut() {
                                    Some(a) => a,
                                    None => continue,
                                };
                                alias.set(
                                    "DEVICE",
                                    format!("{}:{}", iface.name, v4_index),
                                );
                                alias.set("ONBOOT", "yes");
                                alias
                            };
                            if let Some(a) = subnet.address() {
                                target.set("IPADDR", a);
                            }
                            if let Some(m) = subnet.netmask() {
                                target.set("NETMASK", m);
                            }
                            if v4_index == 0 {
                                if let Some(gw) = subnet.gateway() {
                                    target.set("GATEWAY", gw);
                                }
                                if let Some(metric) = subnet.metric() {
                                    target.set("METRIC", metric);
                                }
                            }
                            v4_index += 1;
                        }
                        AddressFamily::IPv6 => {
                            cfg.set("IPV6INIT", "yes");
                            if !cfg.contains("IPV6_AUTOCONF") {
                                cfg.set("IPV6_AUTOCONF", "no");
                            }
                            if let Some(a) = subnet.cidr() {
                                v6_addrs.push(a);
                            }
                            if let Some(gw) = subnet.gateway() {
                                if !cfg.contains("IPV6_DEFAULTGW") {
                                    cfg.set("IPV6_DEFAULTGW", gw);
                                }
                            }
                        }
                    }
                }
            }
            if let Some(mtu) = subnet.mtu() {
                if subnet.is_ipv6() && !self.is_suse() {
                    cfg.set("IPV6_MTU", mtu);
                } else {
                    cfg.set("MTU", mtu);
                }
            }
        }
        if let Some((first, others)) = v6_addrs.split_first() {
            cfg.set("IPV6ADDR", first);
            if !others.is_empty() {
                cfg.set("IPV6ADDR_SECONDARIES", others.join(" "));
            }
        }
        if self.is_suse() {
            match (dhcp4, dhcp6) {
                (true, true) => cfg.set("BOOTPROTO", "dhcp"),
                (true, false) => cfg.set("BOOTPROTO", "dhcp4"),
                (false, true) => cfg.set("BOOTPROTO", "dhcp6"),
                (false, false) => (),
            }
        } else if dhcp4 {
            cfg.set("BOOTPROTO", "dhcp");
        }
        if dhcp6 && !self.is_suse() {
            cfg.set("IPV6INIT", "yes");
        }
    }

    // Only one interface per family gets DEFROUTE=yes, other gateway holders
    // are told explicitly not to install a default route.
    fn render_default_route(
        &self,
        cfg: &mut ConfigMap,
        state: &NetworkState,
        iface: &Interface,
    ) {
        if self.is_suse() {
            return;
        }
        for family in [AddressFamily::IPv4, AddressFamily::IPv6] {
            let explicit = explicit_default_route(state, iface, family);
            let is_candidate =
                explicit.is_some() || iface.gateway_of(family).is_some();
            if !is_candidate {
                continue;
            }
            let is_owner =
                state.default_route_iface(family) == Some(iface.name.as_str());
            let (defroute_key, gw_key) = match family {
                AddressFamily::IPv4 => ("DEFROUTE", "GATEWAY"),
                AddressFamily::IPv6 => ("IPV6_DEFROUTE", "IPV6_DEFAULTGW"),
            };
            cfg.set(defroute_key, yes_no(is_owner));
            if is_owner && !cfg.contains(gw_key) {
                if let Some(gw) = explicit.and_then(|r| r.gateway()) {
                    cfg.set(gw_key, gw);
                }
            }
        }
    }

    fn render_dns(&self, cfg: &mut ConfigMap, iface: &Interface) {
        let dns: DnsConfig = iface.all_dns();
        if dns.nameservers.len() > MAX_NAMESERVERS {
            log::warn!(
                "Interface {} has more than {MAX_NAMESERVERS} nameservers, \
                ignoring {}",
                iface.name,
                dns.nameservers[MAX_NAMESERVERS..].join(" ")
            );
        }
        for (index, ns) in
            dns.nameservers.iter().take(MAX_NAMESERVERS).enumerate()
        {
            cfg.set(&format!("DNS{}", index + 1), ns);
        }
        if !dns.search.is_empty() {
            cfg.set("DOMAIN", dns.search.join(" "));
        }
    }

    fn render_bond(
        &self,
        cfg: &mut ConfigMap,
        state: &NetworkState,
        iface: &Interface,
    ) {
        if let Some(bond_master) = iface.bond_master.as_deref() {
            if !self.is_suse() {
                cfg.set("MASTER", bond_master);
                cfg.set("SLAVE", "yes");
            }
        }
        let bond = match iface.bond.as_ref() {
            Some(b) => b,
            None => return,
        };
        let opts: Vec<String> = bond
            .iter()
            .map(|(opt, value)| format!("{opt}={value}"))
            .collect();
        if self.is_suse() {
            cfg.set("BONDING_MASTER", "yes");
            if !opts.is_empty() {
                cfg.set("BONDING_MODULE_OPTS", opts.join(" "));
            }
            for (index, member) in
                state.bond_members(&iface.name).iter().enumerate()
            {
                cfg.set(&format!("BONDING_SLAVE_{index}"), member);
            }
        } else {
            cfg.set("BONDING_MASTER", "yes");
            if !opts.is_empty() {
                cfg.set("BONDING_OPTS", opts.join(" "));
            }
        }
    }

    fn render_bridge(
        &self,
        cfg: &mut ConfigMap,
        state: &NetworkState,
        iface: &Interface,
    ) {
        if let Some(br_name) = state.bridge_of(&iface.name) {
            if !self.is_suse() {
                cfg.set("BRIDGE", br_name);
            }
        }
        let br = match iface.bridge.as_ref() {
            Some(b) => b,
            None => return,
        };
        if self.is_suse() {
            cfg.set("BRIDGE", "yes");
            cfg.set("BRIDGE_PORTS", state.bridge_ports(&iface.name).join(" "));
            if let Some(stp) = br.stp {
                cfg.set("BRIDGE_STP", if stp { "on" } else { "off" });
            }
            if let Some(v) = br.options.get(&BridgeOption::ForwardDelay) {
                cfg.set("BRIDGE_FORWARDDELAY", v);
            }
            if let Some(v) = br.options.get(&BridgeOption::Priority) {
                cfg.set("BRIDGE_PRIORITY", v);
            }
        } else {
            if let Some(stp) = br.stp {
                cfg.set("STP", yes_no(stp));
            }
            if let Some(v) = br.options.get(&BridgeOption::AgeingTime) {
                cfg.set("AGEING", v);
            }
            if let Some(v) = br.options.get(&BridgeOption::Priority) {
                cfg.set("PRIO", v);
            }
            if let Some(v) = br.options.get(&BridgeOption::ForwardDelay) {
                cfg.set("DELAY", v);
            }
        }
    }

    fn render_vlan(&self, cfg: &mut ConfigMap, iface: &Interface) {
        if let Some(vlan) = iface.vlan.as_ref() {
            if self.is_suse() {
                cfg.set("ETHERDEVICE", &vlan.base_iface);
                cfg.set("VLAN_ID", vlan.id);
            } else {
                cfg.set("VLAN", "yes");
                cfg.set("PHYSDEV", &vlan.base_iface);
            }
        }
    }

    fn render_routes(
        &self,
        state: &NetworkState,
        iface: &Interface,
    ) -> Vec<RenderedFile> {
        let mut routes: Vec<&Route> = iface
            .subnets
            .iter()
            .flat_map(|s| s.routes().iter())
            .collect();
        routes.extend(state.global_routes_of(&iface.name));
        let mut ret = Vec::new();
        if self.is_suse() {
            let mut lines = Vec::new();
            if state.default_route_iface(AddressFamily::IPv4)
                == Some(iface.name.as_str())
                || state.default_route_iface(AddressFamily::IPv6)
                    == Some(iface.name.as_str())
            {
                for family in [AddressFamily::IPv4, AddressFamily::IPv6] {
                    if state.default_route_iface(family)
                        != Some(iface.name.as_str())
                    {
                        continue;
                    }
                    let gw = explicit_default_route(state, iface, family)
                        .and_then(|r| r.gateway())
                        .or_else(|| iface.gateway_of(family));
                    if let Some(gw) = gw {
                        lines.push(format!("default {gw} - {}", iface.name));
                    }
                }
            }
            for route in routes.iter().filter(|r| !r.is_default()) {
                let gw = route.gateway().unwrap_or_else(|| "-".to_string());
                let mut line = match route.family() {
                    AddressFamily::IPv4 => format!(
                        "{} {gw} {} {}",
                        route.network(),
                        route.netmask().unwrap_or_default(),
                        iface.name
                    ),
                    AddressFamily::IPv6 => {
                        format!("{} {gw} - {}", route.cidr(), iface.name)
                    }
                };
                if let Some(metric) = route.metric() {
                    line += &format!(" - metric {metric}");
                }
                lines.push(line);
            }
            if !lines.is_empty() {
                ret.push(RenderedFile::new(
                    &self.path(&format!("ifroute-{}", iface.name)),
                    format!("{HEADER}{}\n", lines.join("\n")),
                    DEFAULT_FILE_MODE,
                ));
            }
            return ret;
        }

        let mut v4_content = String::new();
        let mut v6_lines = Vec::new();
        let mut index = 0;
        for route in routes.iter().filter(|r| !r.is_default()) {
            match route.family() {
                AddressFamily::IPv4 => {
                    v4_content +=
                        &format!("ADDRESS{index}={}\n", route.network());
                    if let Some(gw) = route.gateway() {
                        v4_content += &format!("GATEWAY{index}={gw}\n");
                    }
                    if let Some(metric) = route.metric() {
                        v4_content += &format!("METRIC{index}={metric}\n");
                    }
                    v4_content += &format!(
                        "NETMASK{index}={}\n",
                        route.netmask().unwrap_or_default()
                    );
                    index += 1;
                }
                AddressFamily::IPv6 => {
                    let mut line = route.cidr();
                    if let Some(gw) = route.gateway() {
                        line += &format!(" via {gw}");
                    }
                    if let Some(metric) = route.metric() {
                        line += &format!(" metric {metric}");
                    }
                    line += &format!(" dev {}", iface.name);
                    v6_lines.push(line);
                }
            }
        }
        if !v4_content.is_empty() {
            ret.push(RenderedFile::new(
                &self.path(&format!("route-{}", iface.name)),
                format!("{HEADER}{v4_content}"),
                DEFAULT_FILE_MODE,
            ));
        }
        if !v6_lines.is_empty() {
            ret.push(RenderedFile::new(
                &self.path(&format!("route6-{}", iface.name)),
                format!("{HEADER}{}\n", v6_lines.join("\n")),
                DEFAULT_FILE_MODE,
            ));
        }
        ret
    }

    fn render_resolv_conf(&self, state: &NetworkState) -> Option<RenderedFile> {
        let mut dns = state.dns().clone();
        for iface in state.interfaces() {
            let iface_dns = iface.all_dns();
            dns.extend(&iface_dns.nameservers, &iface_dns.search);
        }
        if dns.is_empty() {
            return None;
        }
        let mut content = "; Created by netcfg automatically, do not edit.\n"
            .to_string();
        for ns in dns.nameservers.iter() {
            content += &format!("nameserver {ns}\n");
        }
        if !dns.search.is_empty() {
            content += &format!("search {}\n", dns.search.join(" "));
        }
        Some(RenderedFile::new(
            &self.opts.sourcelist_path,
            content,
            DEFAULT_FILE_MODE,
        ))
    }

    fn render_network_conf(&self, state: &NetworkState) -> RenderedFile {
        let mut content = format!("{HEADER}NETWORKING=yes\n");
        if state.uses_ipv6() {
            content += "NETWORKING_IPV6=yes\nIPV6_AUTOCONF=no\n";
        }
        RenderedFile::new(
            &self.opts.network_conf_path,
            content,
            DEFAULT_FILE_MODE,
        )
    }
}

impl Renderer for SysconfigRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::Sysconfig
    }

    fn gen_conf(
        &self,
        state: &NetworkState,
    ) -> Result<Vec<RenderedFile>, NetCfgError> {
        let mut ret = Vec::new();
        for iface in state.interfaces_in_creation_order() {
            if iface.iface_type == InterfaceType::Loopback {
                continue;
            }
            ret.extend(self.render_iface(state, iface));
        }
        for route in state.unowned_global_routes() {
            log::warn!(
                "Skipping route {route} as no interface holds its gateway"
            );
        }
        if let Some(f) = self.render_resolv_conf(state) {
            ret.push(f);
        }
        if !self.is_suse() {
            ret.push(self.render_network_conf(state));
        }
        Ok(ret)
    }
}

// Default route of given family declared on the interface, either inside a
// subnet or as global route whose gateway the interface holds.
fn explicit_default_route<'a>(
    state: &'a NetworkState,
    iface: &'a Interface,
    family: AddressFamily,
) -> Option<&'a Route> {
    iface
        .subnets
        .iter()
        .flat_map(|s| s.routes().iter())
        .chain(state.global_routes_of(&iface.name))
        .find(|r| r.is_default() && r.family() == family)
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
