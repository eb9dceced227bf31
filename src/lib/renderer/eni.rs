// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use super::{RenderedFile, Renderer, RendererKind};
use crate::{
    files::DEFAULT_FILE_MODE, AddressFamily, Control, Interface,
    InterfaceType, NetCfgError, NetworkState, Route, Subnet, SubnetType,
};

const LOOPBACK_NAME: &str = "lo";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
#[non_exhaustive]
pub struct EniOptions {
    pub eni_path: String,
    /// Text placed verbatim at the top of the interfaces file.
    pub eni_header: Option<String>,
    /// udev rules file mapping MAC addresses to interface names.
    pub netrules_path: Option<String>,
}

impl Default for EniOptions {
    fn default() -> Self {
        Self {
            eni_path: "etc/network/interfaces.d/50-cloud-init.cfg".to_string(),
            eni_header: None,
            netrules_path: Some(
                "etc/udev/rules.d/70-persistent-net.rules".to_string(),
            ),
        }
    }
}

/// Debian ifupdown `interfaces(5)` renderer.
#[derive(Debug, Clone, Default)]
pub struct EniRenderer {
    opts: EniOptions,
}

impl EniRenderer {
    pub fn new(opts: EniOptions) -> Self {
        Self { opts }
    }
}

impl Renderer for EniRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::Eni
    }

    fn gen_conf(
        &self,
        state: &NetworkState,
    ) -> Result<Vec<RenderedFile>, NetCfgError> {
        let mut ret = vec![RenderedFile::new(
            &self.opts.eni_path,
            render_interfaces(state, self.opts.eni_header.as_deref()),
            DEFAULT_FILE_MODE,
        )];
        if let Some(rules_path) = self.opts.netrules_path.as_deref() {
            let rules = render_persistent_net(state);
            if !rules.is_empty() {
                ret.push(RenderedFile::new(
                    rules_path,
                    rules,
                    DEFAULT_FILE_MODE,
                ));
            }
        }
        Ok(ret)
    }
}

fn render_persistent_net(state: &NetworkState) -> String {
    let mut ifaces: Vec<&Interface> = state
        .interfaces()
        .filter(|i| i.iface_type == InterfaceType::Physical)
        .collect();
    ifaces.sort_unstable_by(|a, b| a.name.cmp(&b.name));
    let mut content = String::new();
    for iface in ifaces {
        if let Some(mac) = iface.mac_address.as_deref() {
            content += &format!(
                "SUBSYSTEM==\"net\", ACTION==\"add\", DRIVERS==\"?*\", \
                ATTR{{address}}==\"{}\", NAME=\"{}\"\n",
                mac.to_lowercase(),
                iface.name
            );
        }
    }
    content
}

fn render_interfaces(state: &NetworkState, header: Option<&str>) -> String {
    let mut sections: Vec<Vec<String>> = Vec::new();
    sections.push(loopback_stanzas(state));
    for iface in state.interfaces_in_creation_order() {
        if iface.iface_type == InterfaceType::Loopback {
            continue;
        }
        sections.extend(iface_stanzas(state, iface));
    }
    let unowned: Vec<&Route> = state.unowned_global_routes();
    if !unowned.is_empty() {
        let mut lines = Vec::new();
        for route in unowned {
            lines.extend(route_lines(route, ""));
        }
        sections.push(lines);
    }

    let mut content = String::new();
    if let Some(header) = header {
        content += header.trim_end();
        content += "\n\n";
    }
    content += &sections
        .iter()
        .map(|lines| lines.join("\n"))
        .collect::<Vec<String>>()
        .join("\n\n");
    content += "\n";
    content
}

fn loopback_stanzas(state: &NetworkState) -> Vec<String> {
    let lo = state
        .interfaces()
        .find(|i| i.iface_type == InterfaceType::Loopback);
    let name = lo.map(|i| i.name.as_str()).unwrap_or(LOOPBACK_NAME);
    let mut lines =
        vec![format!("auto {name}"), format!("iface {name} inet loopback")];
    let dns = state.dns();
    if !dns.nameservers.is_empty() {
        lines.push(format!(" dns-nameservers {}", dns.nameservers.join(" ")));
    }
    if !dns.search.is_empty() {
        lines.push(format!(" dns-search {}", dns.search.join(" ")));
    }
    if let Some(lo) = lo {
        for subnet in lo.subnets.iter().filter(|s| s.is_static()) {
            lines.push(String::new());
            lines.push(format!("# control-alias {name}"));
            lines.extend(subnet_lines(state, lo, subnet));
        }
    }
    lines
}

fn iface_stanzas(state: &NetworkState, iface: &Interface) -> Vec<Vec<String>> {
    let mut sections = Vec::new();
    if iface.subnets.is_empty() {
        let mut lines = Vec::new();
        // ifenslave expects bond and its members to be auto started
        if iface.bond_master.is_some()
            || iface.iface_type == InterfaceType::Bond
        {
            lines.push(format!("auto {}", iface.name));
        }
        lines.push(format!("iface {} inet manual", iface.name));
        lines.extend(iface_attrs(state, iface, None));
        lines.extend(owned_route_lines(state, iface));
        sections.push(lines);
        return sections;
    }
    for (index, subnet) in iface.subnets.iter().enumerate() {
        let mut lines = Vec::new();
        if index == 0 {
            lines.push(match subnet.control() {
                Control::Auto => format!("auto {}", iface.name),
                Control::Hotplug => format!("allow-hotplug {}", iface.name),
                Control::Manual => format!("# control-manual {}", iface.name),
            });
        } else {
            lines.push(format!("# control-alias {}", iface.name));
        }
        lines.extend(subnet_lines(state, iface, subnet));
        if index == 0 {
            lines.extend(iface_attrs(state, iface, Some(subnet)));
            lines.extend(owned_route_lines(state, iface));
        }
        sections.push(lines);
    }
    sections
}

fn subnet_lines(
    state: &NetworkState,
    iface: &Interface,
    subnet: &Subnet,
) -> Vec<String> {
    let inet = if subnet.is_ipv6() { "inet6" } else { "inet" };
    let mode = match subnet.kind() {
        SubnetType::Dhcp4
        | SubnetType::Dhcp6
        | SubnetType::Ipv6DhcpStateful => "dhcp",
        SubnetType::Ipv6DhcpStateless | SubnetType::Ipv6Slaac => "auto",
        SubnetType::Static | SubnetType::Static6 => "static",
        SubnetType::Manual => "manual",
    };
    let mut lines = vec![format!("iface {} {inet} {mode}", iface.name)];
    match subnet.kind() {
        SubnetType::Ipv6DhcpStateless => lines.push(" dhcp 1".to_string()),
        SubnetType::Ipv6Slaac => lines.push(" dhcp 0".to_string()),
        _ => (),
    }
    if subnet.is_static() {
        match subnet.family() {
            AddressFamily::IPv4 => {
                if let Some(addr) = subnet.address() {
                    lines.push(format!(" address {addr}"));
                }
                if let Some(mask) = subnet.netmask() {
                    lines.push(format!(" netmask {mask}"));
                }
            }
            AddressFamily::IPv6 => {
                if let Some(cidr) = subnet.cidr() {
                    lines.push(format!(" address {cidr}"));
                }
            }
        }
        if let Some(gw) = state.default_gateway_of(iface, subnet) {
            lines.push(format!(" gateway {gw}"));
        }
    }
    let mut extra = Vec::new();
    if !subnet.dns().nameservers.is_empty() {
        extra.push(format!(
            " dns-nameservers {}",
            subnet.dns().nameservers.join(" ")
        ));
    }
    if !subnet.dns().search.is_empty() {
        extra.push(format!(" dns-search {}", subnet.dns().search.join(" ")));
    }
    if let Some(metric) = subnet.metric() {
        extra.push(format!(" metric {metric}"));
    }
    if let Some(mtu) = subnet.mtu() {
        extra.push(format!(" mtu {mtu}"));
    }
    if subnet.is_ipv6() {
        if let Some(accept_ra) = iface.accept_ra {
            extra.push(format!(" accept_ra {}", u8::from(accept_ra)));
        }
    }
    extra.sort_unstable();
    lines.extend(extra);
    for route in subnet.routes() {
        lines.extend(route_lines(route, " "));
    }
    lines
}

// Device wide attributes, sorted, emitted on the first stanza only.
fn iface_attrs(
    state: &NetworkState,
    iface: &Interface,
    first_subnet: Option<&Subnet>,
) -> Vec<String> {
    let mut attrs = Vec::new();
    if let Some(mac) = iface.mac_address.as_deref() {
        if matches!(
            iface.iface_type,
            InterfaceType::Bond
                | InterfaceType::Bridge
                | InterfaceType::Vlan
                | InterfaceType::Infiniband
        ) {
            attrs.push(format!(" hwaddress {mac}"));
        }
    }
    if let Some(bond_master) = iface.bond_master.as_deref() {
        attrs.push(format!(" bond-master {bond_master}"));
    }
    if let Some(bond) = iface.bond.as_ref() {
        for (opt, value) in bond.iter() {
            attrs.push(format!(
                " {} {}",
                opt.eni_name(),
                value.replace(',', " ")
            ));
        }
        attrs.push(" bond-slaves none".to_string());
    }
    if let Some(br) = iface.bridge.as_ref() {
        let ports = state.bridge_ports(&iface.name);
        attrs.push(format!(
            " bridge_ports {}",
            if ports.is_empty() {
                "none".to_string()
            } else {
                ports.join(" ")
            }
        ));
        if let Some(stp) = br.stp {
            let stp = if stp { "on" } else { "off" };
            attrs.push(format!(" bridge_stp {stp}"));
        }
        for (opt, value) in br.options.iter() {
            attrs.push(format!(" {} {value}", opt.eni_name()));
        }
        for (port, cost) in br.path_cost.iter() {
            attrs.push(format!(" bridge_pathcost {port} {cost}"));
        }
        for (port, prio) in br.port_priority.iter() {
            attrs.push(format!(" bridge_portprio {port} {prio}"));
        }
    }
    if let Some(vlan) = iface.vlan.as_ref() {
        attrs.push(format!(" vlan-raw-device {}", vlan.base_iface));
        attrs.push(format!(" vlan_id {}", vlan.id));
    }
    // Subnet level MTU wins over the device one
    if let Some(mtu) = iface.mtu {
        if first_subnet.and_then(|s| s.mtu()).is_none() {
            attrs.push(format!(" mtu {mtu}"));
        }
    }
    attrs.sort_unstable();
    attrs
}

fn owned_route_lines(state: &NetworkState, iface: &Interface) -> Vec<String> {
    state
        .global_routes_of(&iface.name)
        .into_iter()
        .flat_map(|r| route_lines(r, " "))
        .collect()
}

/// `post-up`/`pre-down` pair of one route. Failures are tolerated so that
/// re-applying an already present route does not fail the interface.
fn route_lines(route: &Route, indent: &str) -> Vec<String> {
    let mut args = match route.family() {
        AddressFamily::IPv4 => {
            if route.is_default() {
                "default".to_string()
            } else {
                format!(
                    "-net {} netmask {}",
                    route.network(),
                    route.netmask().unwrap_or_default()
                )
            }
        }
        AddressFamily::IPv6 => {
            if route.is_default() {
                "-A inet6 default".to_string()
            } else {
                format!("-A inet6 {}", route.cidr())
            }
        }
    };
    if let Some(gw) = route.gateway() {
        args += &format!(" gw {gw}");
    }
    if let Some(metric) = route.metric() {
        args += &format!(" metric {metric}");
    }
    vec![
        format!("{indent}post-up route add {args} || true"),
        format!("{indent}pre-down route del {args} || true"),
    ]
}
