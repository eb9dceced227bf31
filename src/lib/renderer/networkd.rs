// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use super::{RenderedFile, Renderer, RendererKind};
use crate::{
    files::DEFAULT_FILE_MODE, AddressFamily, BondOption, BridgeOption,
    DhcpOverrides, ErrorKind, Interface, InterfaceType, NetCfgError,
    NetworkState, Route, SubnetType,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
#[non_exhaustive]
pub struct NetworkdOptions {
    pub network_conf_dir: String,
    /// Receives global DNS as a `[Resolve]` section.
    pub resolve_conf_fn: String,
}

impl Default for NetworkdOptions {
    fn default() -> Self {
        Self {
            network_conf_dir: "etc/systemd/network".to_string(),
            resolve_conf_fn: "etc/systemd/resolved.conf".to_string(),
        }
    }
}

/// One `[Section]` of a systemd unit. Keys may repeat.
#[derive(Debug)]
struct UnitSection {
    name: &'static str,
    entries: Vec<(String, String)>,
}

impl UnitSection {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Vec::new(),
        }
    }

    fn add(&mut self, key: &str, value: impl ToString) {
        self.entries.push((key.to_string(), value.to_string()));
    }

    fn add_opt<T: ToString>(&mut self, key: &str, value: Option<T>) {
        if let Some(v) = value {
            self.add(key, v);
        }
    }
}

// Sections in given order, keys sorted inside each section.
fn to_unit(sections: Vec<UnitSection>) -> String {
    sections
        .into_iter()
        .filter(|s| !s.entries.is_empty())
        .map(|mut s| {
            s.entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut content = format!("[{}]\n", s.name);
            for (key, value) in s.entries {
                content += &format!("{key}={value}\n");
            }
            content
        })
        .collect::<Vec<String>>()
        .join("\n")
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// systemd-networkd `.network`/`.netdev` renderer.
#[derive(Debug, Clone, Default)]
pub struct NetworkdRenderer {
    opts: NetworkdOptions,
}

impl NetworkdRenderer {
    pub fn new(opts: NetworkdOptions) -> Self {
        Self { opts }
    }

    fn path(&self, iface_name: &str, suffix: &str) -> String {
        format!(
            "{}/10-cloud-init-{iface_name}.{suffix}",
            self.opts.network_conf_dir.trim_end_matches('/')
        )
    }
}

impl Renderer for NetworkdRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::Networkd
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
            if let Some(netdev) = gen_netdev(iface) {
                ret.push(RenderedFile::new(
                    &self.path(&iface.name, "netdev"),
                    netdev,
                    DEFAULT_FILE_MODE,
                ));
            }
            ret.push(RenderedFile::new(
                &self.path(&iface.name, "network"),
                gen_network(state, iface)?,
                DEFAULT_FILE_MODE,
            ));
        }
        for route in state.unowned_global_routes() {
            log::warn!(
                "Skipping route {route} as no interface holds its gateway"
            );
        }
        let dns = state.dns();
        if !dns.is_empty() {
            let mut resolve = UnitSection::new("Resolve");
            if !dns.nameservers.is_empty() {
                resolve.add("DNS", dns.nameservers.join(" "));
            }
            if !dns.search.is_empty() {
                resolve.add("Domains", dns.search.join(" "));
            }
            ret.push(RenderedFile::new(
                &self.opts.resolve_conf_fn,
                to_unit(vec![resolve]),
                DEFAULT_FILE_MODE,
            ));
        }
        Ok(ret)
    }
}

fn gen_network(
    state: &NetworkState,
    iface: &Interface,
) -> Result<String, NetCfgError> {
    let mut match_sec = UnitSection::new("Match");
    let mut link = UnitSection::new("Link");
    let mut network = UnitSection::new("Network");
    let mut addresses = Vec::new();
    let mut routes = Vec::new();

    match_sec.add("Name", &iface.name);
    if iface.iface_type == InterfaceType::Physical {
        match_sec.add_opt("MACAddress", iface.mac_address.as_deref());
        match_sec.add_opt("Driver", iface.driver.as_deref());
    }

    link.add_opt("MTUBytes", iface.mtu);
    if iface.optional {
        link.add("RequiredForOnline", "no");
    }

    let dhcp4 = iface.has_dhcp(AddressFamily::IPv4);
    let dhcp6 = iface.subnets.iter().any(|s| {
        matches!(
            s.kind(),
            SubnetType::Dhcp6
                | SubnetType::Ipv6DhcpStateful
                | SubnetType::Ipv6DhcpStateless
        )
    });
    match (dhcp4, dhcp6) {
        (true, true) => network.add("DHCP", "yes"),
        (true, false) => network.add("DHCP", "ipv4"),
        (false, true) => network.add("DHCP", "ipv6"),
        (false, false) => (),
    }
    let accept_ra = iface.accept_ra.or_else(|| {
        iface
            .subnets
            .iter()
            .any(|s| {
                matches!(
                    s.kind(),
                    SubnetType::Ipv6Slaac | SubnetType::Ipv6DhcpStateless
                )
            })
            .then_some(true)
    });
    network.add_opt("IPv6AcceptRA", accept_ra.map(yes_no));

    let mut dhcp_metric = [None, None];
    for subnet in iface.subnets.iter() {
        if subnet.is_static() {
            if let Some(cidr) = subnet.cidr() {
                let mut addr = UnitSection::new("Address");
                addr.add("Address", cidr);
                addresses.push(addr);
            }
            network.add_opt(
                "Gateway",
                state.default_gateway_of(iface, subnet),
            );
        } else if let Some(metric) = subnet.metric() {
            let index = match subnet.family() {
                AddressFamily::IPv4 => 0,
                AddressFamily::IPv6 => 1,
            };
            dhcp_metric[index] = dhcp_metric[index].or(Some(metric));
        }
        if let Some(mtu) = subnet.mtu() {
            if !link.entries.iter().any(|(k, _)| k == "MTUBytes") {
                link.add("MTUBytes", mtu);
            }
        }
        routes.extend(subnet.routes().iter().map(route_section));
    }
    routes.extend(
        state
            .global_routes_of(&iface.name)
            .into_iter()
            .map(route_section),
    );

    let dns = iface.all_dns();
    if !dns.nameservers.is_empty() {
        network.add("DNS", dns.nameservers.join(" "));
    }
    if !dns.search.is_empty() {
        network.add("Domains", dns.search.join(" "));
    }

    network.add_opt("Bond", iface.bond_master.as_deref());
    network.add_opt("Bridge", state.bridge_of(&iface.name));
    let mut vlans: Vec<&str> = state
        .interfaces()
        .filter(|i| {
            i.vlan.as_ref().map(|v| v.base_iface.as_str())
                == Some(iface.name.as_str())
        })
        .map(|i| i.name.as_str())
        .collect();
    vlans.sort_unstable();
    for vlan in vlans {
        network.add("VLAN", vlan);
    }
    let mut bridge_port = UnitSection::new("Bridge");
    if let Some(br) = state
        .bridge_of(&iface.name)
        .and_then(|br_name| state.get_iface(br_name))
        .and_then(|i| i.bridge.as_ref())
    {
        bridge_port.add_opt("Cost", br.path_cost.get(&iface.name));
        bridge_port.add_opt("Priority", br.port_priority.get(&iface.name));
    }

    let mut sections = vec![match_sec, link, network];
    sections.extend(addresses);
    sections.extend(routes);
    sections.push(bridge_port);
    for (family, enabled, metric) in [
        (AddressFamily::IPv4, dhcp4, dhcp_metric[0]),
        (AddressFamily::IPv6, dhcp6, dhcp_metric[1]),
    ] {
        if enabled {
            sections.push(dhcp_section(iface, family, metric)?);
        }
    }
    Ok(to_unit(sections))
}

fn route_section(route: &Route) -> UnitSection {
    let mut section = UnitSection::new("Route");
    if !route.is_default() {
        section.add("Destination", route.cidr());
    }
    section.add_opt("Gateway", route.gateway());
    section.add_opt("Metric", route.metric());
    section
}

fn dhcp_section(
    iface: &Interface,
    family: AddressFamily,
    subnet_metric: Option<u32>,
) -> Result<UnitSection, NetCfgError> {
    let (name, ver) = match family {
        AddressFamily::IPv4 => ("DHCPv4", 4),
        AddressFamily::IPv6 => ("DHCPv6", 6),
    };
    let mut section = UnitSection::new(name);
    let empty = DhcpOverrides::default();
    let overrides = iface.dhcp_overrides(family).unwrap_or(&empty);
    let domain = iface.dhcp_domain(family);
    if domain.is_some() && overrides.use_domains.is_some() {
        return Err(NetCfgError::new(
            ErrorKind::ConfigConflict,
            format!(
                "Device {} sets both dhcp{ver}domain and \
                dhcp{ver}-overrides.use-domains",
                iface.name
            ),
        ));
    }
    section.add_opt("UseDNS", overrides.use_dns.map(yes_no));
    section.add_opt(
        "UseDomains",
        overrides.use_domains.as_deref().or(domain).map(domains_value),
    );
    section.add_opt("UseHostname", overrides.use_hostname.map(yes_no));
    section.add_opt("UseNTP", overrides.use_ntp.map(yes_no));
    if family == AddressFamily::IPv4 {
        section.add_opt("SendHostname", overrides.send_hostname.map(yes_no));
        section.add_opt("Hostname", overrides.hostname.as_deref());
        section
            .add_opt("RouteMetric", overrides.route_metric.or(subnet_metric));
        section.add_opt("UseMTU", overrides.use_mtu.map(yes_no));
        section.add_opt("UseRoutes", overrides.use_routes.map(yes_no));
    }
    Ok(section)
}

// networkd takes yes/no/route for UseDomains.
fn domains_value(value: &str) -> &str {
    match crate::deserializer::parse_bool_str(value) {
        Some(b) => yes_no(b),
        None => value,
    }
}

fn gen_netdev(iface: &Interface) -> Option<String> {
    let mut netdev = UnitSection::new("NetDev");
    netdev.add("Name", &iface.name);
    let mut sections = Vec::new();
    match iface.iface_type {
        InterfaceType::Bond => {
            netdev.add("Kind", "bond");
            let mut bond_sec = UnitSection::new("Bond");
            if let Some(bond) = iface.bond.as_ref() {
                for (opt, value) in bond.iter() {
                    if let Some((key, value)) = bond_netdev_option(opt, &value)
                    {
                        bond_sec.add(key, value);
                    }
                }
            }
            sections.push(bond_sec);
        }
        InterfaceType::Bridge => {
            netdev.add("Kind", "bridge");
            let mut br_sec = UnitSection::new("Bridge");
            if let Some(br) = iface.bridge.as_ref() {
                br_sec.add_opt("STP", br.stp.map(yes_no));
                for (opt, value) in br.options.iter() {
                    let key = match opt {
                        BridgeOption::AgeingTime => "AgeingTimeSec",
                        BridgeOption::Priority => "Priority",
                        BridgeOption::ForwardDelay => "ForwardDelaySec",
                        BridgeOption::HelloTime => "HelloTimeSec",
                        BridgeOption::MaxAge => "MaxAgeSec",
                        _ => {
                            log::debug!(
                                "Bridge option {opt} has no networkd \
                                counterpart"
                            );
                            continue;
                        }
                    };
                    br_sec.add(key, value);
                }
            }
            sections.push(br_sec);
        }
        InterfaceType::Vlan => {
            netdev.add("Kind", "vlan");
            let mut vlan_sec = UnitSection::new("VLAN");
            vlan_sec.add_opt("Id", iface.vlan.as_ref().map(|v| v.id));
            sections.push(vlan_sec);
        }
        _ => return None,
    }
    netdev.add_opt("MACAddress", iface.mac_address.as_deref());
    sections.insert(0, netdev);
    Some(to_unit(sections))
}

fn bond_netdev_option(
    opt: BondOption,
    value: &str,
) -> Option<(&'static str, String)> {
    let key = match opt {
        BondOption::Mode => "Mode",
        BondOption::AdSelect => "AdSelect",
        BondOption::ArpInterval => {
            return Some(("ARPIntervalSec", format!("{value}ms")))
        }
        BondOption::ArpIpTarget => {
            return Some(("ARPIPTargets", value.replace(',', " ")))
        }
        BondOption::ArpValidate => "ARPValidate",
        BondOption::Downdelay => {
            return Some(("DownDelaySec", format!("{value}ms")))
        }
        BondOption::FailOverMac => "FailOverMACPolicy",
        BondOption::LacpRate => "LACPTransmitRate",
        BondOption::Miimon => {
            return Some(("MIIMonitorSec", format!("{value}ms")))
        }
        BondOption::MinLinks => "MinLinks",
        BondOption::NumGratArp => "GratuitousARP",
        BondOption::PrimaryReselect => "PrimaryReselectPolicy",
        BondOption::Updelay => {
            return Some(("UpDelaySec", format!("{value}ms")))
        }
        BondOption::XmitHashPolicy => "TransmitHashPolicy",
        BondOption::Primary => {
            log::debug!("Bond option {opt} has no networkd counterpart");
            return None;
        }
    };
    Some((key, value.to_string()))
}
