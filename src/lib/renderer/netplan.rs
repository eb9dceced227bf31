// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{
    write_rendered, RenderContext, RenderedFile, Renderer, RendererKind,
};
use crate::{
    files::{read_file, remove_file, target_path, PRIVATE_FILE_MODE},
    AddressFamily, BondOption, Interface, InterfaceType, NetCfgError,
    NetworkState, Route, SubnetType,
};

const SNAPD_CONFIG_PATH: &str = "etc/netplan/00-snapd-config.yaml";
const SNAPD_DERIVED_FILES: [&str; 3] = [
    "run/systemd/network/10-netplan-all-en.network",
    "run/systemd/network/10-netplan-all-eth.network",
    "run/systemd/generator/netplan.stamp",
];
const KNOWN_SNAPD_CONFIG: &str = r#"# This is the initial network config.
# It can be overwritten by cloud-init or console-conf.
network:
    version: 2
    ethernets:
        all-en:
            match:
                name: "en*"
            dhcp4: true
        all-eth:
            match:
                name: "eth*"
            dhcp4: true
"#;
const SYS_CLASS_NET: &str = "sys/class/net";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
#[non_exhaustive]
pub struct NetplanOptions {
    pub netplan_path: String,
    pub netplan_header: Option<String>,
    /// Run `netplan generate` and re-trigger udev link setup after a change.
    pub postcmds: bool,
    /// Remove the stock snapd configuration when still unmodified.
    pub clean_default: bool,
}

impl Default for NetplanOptions {
    fn default() -> Self {
        Self {
            netplan_path: "etc/netplan/50-cloud-init.yaml".to_string(),
            netplan_header: None,
            postcmds: false,
            clean_default: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NetplanRenderer {
    opts: NetplanOptions,
}

impl NetplanRenderer {
    pub fn new(opts: NetplanOptions) -> Self {
        Self { opts }
    }

    fn run_postcmds(&self, ctx: &RenderContext) -> Result<(), NetCfgError> {
        let root = ctx.target_root.to_string_lossy().to_string();
        let mut cmd = vec!["netplan", "generate"];
        if !ctx.is_root_fs() {
            cmd.push("--root-dir");
            cmd.push(root.as_str());
        }
        ctx.runner.run(&cmd)?;
        ctx.runner.run(&["udevadm", "settle"])?;
        for dev in physical_devices(ctx.target_root)? {
            let sys_path = format!("/{SYS_CLASS_NET}/{dev}");
            if let Err(e) = ctx.runner.run(&[
                "udevadm",
                "test-builtin",
                "net_setup_link",
                sys_path.as_str(),
            ]) {
                log::warn!("Failed to re-apply link settings of {dev}: {e}");
            }
        }
        Ok(())
    }
}

impl Renderer for NetplanRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::Netplan
    }

    fn gen_conf(
        &self,
        state: &NetworkState,
    ) -> Result<Vec<RenderedFile>, NetCfgError> {
        let network = match state.v2_config() {
            Some(v2) => v2.clone(),
            None => gen_v2(state),
        };
        let mut root = Map::new();
        root.insert("network".to_string(), network);
        let mut content = String::new();
        if let Some(header) = self.opts.netplan_header.as_deref() {
            content += header.trim_end();
            content += "\n";
        }
        content += &serde_yaml::to_string(&Value::Object(root))?;
        Ok(vec![RenderedFile::new(
            &self.opts.netplan_path,
            content,
            PRIVATE_FILE_MODE,
        )])
    }

    fn render(
        &self,
        state: &NetworkState,
        ctx: &RenderContext,
    ) -> Result<bool, NetCfgError> {
        let files = self.gen_conf(state)?;
        let changed = write_rendered(&files, ctx.target_root)?;
        if self.opts.clean_default {
            clean_default(ctx.target_root)?;
        }
        if self.opts.postcmds {
            if changed {
                self.run_postcmds(ctx)?;
            } else {
                log::debug!(
                    "Netplan configuration unchanged, skipping netplan generate"
                );
            }
        }
        Ok(changed)
    }
}

fn clean_default(root: &Path) -> Result<(), NetCfgError> {
    let snapd_path = target_path(root, SNAPD_CONFIG_PATH);
    if read_file(&snapd_path)?.as_deref() != Some(KNOWN_SNAPD_CONFIG) {
        return Ok(());
    }
    remove_file(&snapd_path)?;
    for derived in SNAPD_DERIVED_FILES {
        remove_file(&target_path(root, derived))?;
    }
    Ok(())
}

// Devices under sys/class/net backed by real hardware, sorted.
fn physical_devices(root: &Path) -> Result<Vec<String>, NetCfgError> {
    let dir = target_path(root, SYS_CLASS_NET);
    let entries = match std::fs::read_dir(&dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Vec::new())
        }
        Err(e) => return Err(e.into()),
    };
    let mut devs = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.path().join("device").exists() {
            devs.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    devs.sort_unstable();
    Ok(devs)
}

fn gen_v2(state: &NetworkState) -> Value {
    let mut ethernets = BTreeMap::new();
    let mut bonds = BTreeMap::new();
    let mut bridges = BTreeMap::new();
    let mut vlans = BTreeMap::new();
    for iface in state.interfaces() {
        let mut dev = Map::new();
        match iface.iface_type {
            InterfaceType::Loopback => {
                log::debug!(
                    "Loopback {} is not managed by netplan",
                    iface.name
                );
                continue;
            }
            InterfaceType::Physical | InterfaceType::Infiniband => {
                let mut matches = Map::new();
                if let Some(mac) = iface.mac_address.as_deref() {
                    matches
                        .insert("macaddress".into(), mac.to_lowercase().into());
                }
                if let Some(driver) = iface.driver.as_deref() {
                    matches.insert("driver".into(), driver.into());
                }
                if !matches.is_empty() {
                    dev.insert("match".into(), Value::Object(matches));
                    dev.insert("set-name".into(), iface.name.as_str().into());
                }
            }
            InterfaceType::Bond => {
                let members = state.bond_members(&iface.name);
                if !members.is_empty() {
                    dev.insert("interfaces".into(), members.into());
                }
                if let Some(bond) = iface.bond.as_ref() {
                    let mut params = Map::new();
                    for (opt, value) in bond.iter() {
                        params.insert(
                            opt.netplan_name().to_string(),
                            bond_param_value(opt, &value),
                        );
                    }
                    if !params.is_empty() {
                        dev.insert("parameters".into(), Value::Object(params));
                    }
                }
                if let Some(mac) = iface.mac_address.as_deref() {
                    dev.insert("macaddress".into(), mac.to_lowercase().into());
                }
            }
            InterfaceType::Bridge => {
                let ports = state.bridge_ports(&iface.name);
                if !ports.is_empty() {
                    dev.insert("interfaces".into(), ports.into());
                }
                if let Some(br) = iface.bridge.as_ref() {
                    let mut params = Map::new();
                    if let Some(stp) = br.stp {
                        params.insert("stp".into(), stp.into());
                    }
                    for (opt, value) in br.options.iter() {
                        if let Some(name) = opt.netplan_name() {
                            params.insert(
                                name.to_string(),
                                number_or_str(value),
                            );
                        }
                    }
                    if !br.path_cost.is_empty() {
                        params.insert(
                            "path-cost".into(),
                            port_map(&br.path_cost),
                        );
                    }
                    if !br.port_priority.is_empty() {
                        params.insert(
                            "port-priority".into(),
                            port_map(&br.port_priority),
                        );
                    }
                    if !params.is_empty() {
                        dev.insert("parameters".into(), Value::Object(params));
                    }
                }
                if let Some(mac) = iface.mac_address.as_deref() {
                    dev.insert("macaddress".into(), mac.to_lowercase().into());
                }
            }
            InterfaceType::Vlan => {
                if let Some(vlan) = iface.vlan.as_ref() {
                    dev.insert("id".into(), vlan.id.into());
                    dev.insert("link".into(), vlan.base_iface.as_str().into());
                }
                if let Some(mac) = iface.mac_address.as_deref() {
                    dev.insert("macaddress".into(), mac.to_lowercase().into());
                }
            }
        }
        ip_config(state, iface, &mut dev);
        let section = match iface.iface_type {
            InterfaceType::Bond => &mut bonds,
            InterfaceType::Bridge => &mut bridges,
            InterfaceType::Vlan => &mut vlans,
            _ => &mut ethernets,
        };
        section.insert(iface.name.clone(), Value::Object(dev));
    }
    for route in state.unowned_global_routes() {
        log::warn!("Skipping route {route} as no interface holds its gateway");
    }

    let mut network = Map::new();
    network.insert("version".into(), 2.into());
    for (name, devs) in [
        ("ethernets", ethernets),
        ("bonds", bonds),
        ("bridges", bridges),
        ("vlans", vlans),
    ] {
        if !devs.is_empty() {
            network.insert(
                name.into(),
                Value::Object(devs.into_iter().collect()),
            );
        }
    }
    Value::Object(network)
}

fn ip_config(
    state: &NetworkState,
    iface: &Interface,
    dev: &mut Map<String, Value>,
) {
    let mut addresses: Vec<Value> = Vec::new();
    let mut routes: Vec<Value> = Vec::new();
    let mut dhcp4_metric = None;
    let mut dhcp6_metric = None;
    for subnet in iface.subnets.iter() {
        match subnet.kind() {
            SubnetType::Dhcp4 => {
                dev.insert("dhcp4".into(), true.into());
                dhcp4_metric = dhcp4_metric.or(subnet.metric());
            }
            SubnetType::Dhcp6 | SubnetType::Ipv6DhcpStateful => {
                dev.insert("dhcp6".into(), true.into());
                dhcp6_metric = dhcp6_metric.or(subnet.metric());
            }
            SubnetType::Ipv6DhcpStateless => {
                dev.insert("dhcp6".into(), true.into());
                dev.insert("accept-ra".into(), true.into());
            }
            SubnetType::Ipv6Slaac => {
                dev.insert("accept-ra".into(), true.into());
            }
            SubnetType::Static | SubnetType::Static6 => {
                if let Some(cidr) = subnet.cidr() {
                    addresses.push(cidr.into());
                }
                if let Some(gw) = state.default_gateway_of(iface, subnet) {
                    let mut route = Map::new();
                    route.insert("to".into(), "default".into());
                    route.insert("via".into(), gw.into());
                    if let Some(metric) = subnet.metric() {
                        route.insert("metric".into(), metric.into());
                    }
                    routes.push(Value::Object(route));
                }
            }
            SubnetType::Manual => (),
        }
        if let Some(mtu) = subnet.mtu() {
            dev.insert("mtu".into(), mtu.into());
        }
        routes.extend(subnet.routes().iter().map(route_to_v2));
    }
    routes.extend(
        state
            .global_routes_of(&iface.name)
            .into_iter()
            .map(route_to_v2),
    );
    if !addresses.is_empty() {
        dev.insert("addresses".into(), addresses.into());
    }
    if !routes.is_empty() {
        dev.insert("routes".into(), routes.into());
    }
    if let Some(mtu) = iface.mtu {
        dev.entry("mtu").or_insert_with(|| mtu.into());
    }
    if let Some(accept_ra) = iface.accept_ra {
        dev.insert("accept-ra".into(), accept_ra.into());
    }
    if iface.wakeonlan {
        dev.insert("wakeonlan".into(), true.into());
    }
    if iface.optional {
        dev.insert("optional".into(), true.into());
    }

    for (family, metric) in [
        (AddressFamily::IPv4, dhcp4_metric),
        (AddressFamily::IPv6, dhcp6_metric),
    ] {
        let mut overrides =
            iface.dhcp_overrides(family).cloned().unwrap_or_default();
        if overrides.route_metric.is_none() {
            overrides.route_metric = metric;
        }
        if overrides != Default::default() {
            if let Ok(v) = serde_json::to_value(&overrides) {
                let key = match family {
                    AddressFamily::IPv4 => "dhcp4-overrides",
                    AddressFamily::IPv6 => "dhcp6-overrides",
                };
                dev.insert(key.into(), v);
            }
        }
    }

    let mut dns = iface.all_dns();
    // Global resolvers apply to every addressed device lacking its own
    if dns.is_empty() && !iface.subnets.is_empty() {
        dns = state.dns().clone();
    }
    let mut nameservers = Map::new();
    if !dns.nameservers.is_empty() {
        nameservers.insert("addresses".into(), dns.nameservers.into());
    }
    if !dns.search.is_empty() {
        nameservers.insert("search".into(), dns.search.into());
    }
    if !nameservers.is_empty() {
        dev.insert("nameservers".into(), Value::Object(nameservers));
    }
}

fn route_to_v2(route: &Route) -> Value {
    let mut ret = Map::new();
    ret.insert(
        "to".into(),
        if route.is_default() {
            "default".into()
        } else {
            route.cidr().into()
        },
    );
    if let Some(gw) = route.gateway() {
        ret.insert("via".into(), gw.into());
    }
    if let Some(metric) = route.metric() {
        ret.insert("metric".into(), metric.into());
    }
    Value::Object(ret)
}

fn bond_param_value(opt: BondOption, value: &str) -> Value {
    if opt == BondOption::ArpIpTarget {
        value.split(',').map(Value::from).collect()
    } else if opt.is_numeric() {
        number_or_str(value)
    } else {
        value.into()
    }
}

fn number_or_str(value: &str) -> Value {
    match value.parse::<u64>() {
        Ok(n) => n.into(),
        Err(_) => value.into(),
    }
}

fn port_map(values: &BTreeMap<String, u32>) -> Value {
    Value::Object(
        values
            .iter()
            .map(|(port, v)| (port.clone(), Value::from(*v)))
            .collect(),
    )
}
