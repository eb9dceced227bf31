// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{RenderedFile, Renderer, RendererKind};
use crate::{
    files::PRIVATE_FILE_MODE, AddressFamily, BridgeOption, DnsConfig,
    Interface, InterfaceType, NetCfgError, NetworkState, Route, SubnetType,
};

// Namespace of the per device connection UUIDs.
const UUID_NAMESPACE: Uuid =
    Uuid::from_u128(0xa3924cb8_09e0_43e9_890b_77972a800108);
const AUTOCONNECT_PRIORITY: u32 = 120;
const WAKE_ON_LAN_MAGIC: u32 = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
#[non_exhaustive]
pub struct NetworkManagerOptions {
    pub connection_dir: String,
}

impl Default for NetworkManagerOptions {
    fn default() -> Self {
        Self {
            connection_dir: "etc/NetworkManager/system-connections"
                .to_string(),
        }
    }
}

pub(crate) fn connection_file_path(
    connection_dir: &str,
    name: &str,
) -> String {
    format!(
        "{}/cloud-init-{name}.nmconnection",
        connection_dir.trim_end_matches('/')
    )
}

// Deterministic UUID of the connection profile of given interface.
pub(crate) fn connection_uuid(iface_name: &str) -> String {
    Uuid::new_v5(&UUID_NAMESPACE, iface_name.as_bytes()).to_string()
}

trait ToKeyfile {
    fn to_keyfile(&self) -> BTreeMap<String, String>;
}

fn insert_opt<T: ToString>(
    ret: &mut BTreeMap<String, String>,
    key: &str,
    value: Option<T>,
) {
    if let Some(v) = value {
        ret.insert(key.to_string(), v.to_string());
    }
}

// NM list values are `;` terminated.
fn to_list(items: &[String]) -> String {
    items.iter().map(|i| format!("{i};")).collect()
}

#[derive(Debug, Default)]
struct NmSettingConnection {
    id: String,
    uuid: String,
    iface_type: &'static str,
    iface_name: Option<String>,
    controller: Option<String>,
    port_type: Option<&'static str>,
}

impl ToKeyfile for NmSettingConnection {
    fn to_keyfile(&self) -> BTreeMap<String, String> {
        let mut ret = BTreeMap::new();
        ret.insert("id".to_string(), self.id.clone());
        ret.insert("uuid".to_string(), self.uuid.clone());
        ret.insert("type".to_string(), self.iface_type.to_string());
        ret.insert(
            "autoconnect-priority".to_string(),
            AUTOCONNECT_PRIORITY.to_string(),
        );
        insert_opt(&mut ret, "interface-name", self.iface_name.as_deref());
        insert_opt(&mut ret, "controller", self.controller.as_deref());
        insert_opt(&mut ret, "port-type", self.port_type);
        ret
    }
}

#[derive(Debug, Default)]
struct NmSettingWired {
    mac_address: Option<String>,
    mtu: Option<u32>,
    wake_on_lan: bool,
}

impl ToKeyfile for NmSettingWired {
    fn to_keyfile(&self) -> BTreeMap<String, String> {
        let mut ret = BTreeMap::new();
        insert_opt(&mut ret, "mac-address", self.mac_address.as_deref());
        insert_opt(&mut ret, "mtu", self.mtu);
        if self.wake_on_lan {
            ret.insert(
                "wake-on-lan".to_string(),
                WAKE_ON_LAN_MAGIC.to_string(),
            );
        }
        ret
    }
}

#[derive(Debug, Default)]
struct NmSettingInfiniBand {
    mac_address: Option<String>,
    mtu: Option<u32>,
}

impl ToKeyfile for NmSettingInfiniBand {
    fn to_keyfile(&self) -> BTreeMap<String, String> {
        let mut ret = BTreeMap::new();
        ret.insert("transport-mode".to_string(), "datagram".to_string());
        insert_opt(&mut ret, "mac-address", self.mac_address.as_deref());
        insert_opt(&mut ret, "mtu", self.mtu);
        ret
    }
}

#[derive(Debug, Default)]
struct NmSettingBond {
    options: BTreeMap<String, String>,
}

impl ToKeyfile for NmSettingBond {
    fn to_keyfile(&self) -> BTreeMap<String, String> {
        self.options.clone()
    }
}

#[derive(Debug, Default)]
struct NmSettingBridge {
    stp: Option<bool>,
    options: BTreeMap<String, String>,
}

impl ToKeyfile for NmSettingBridge {
    fn to_keyfile(&self) -> BTreeMap<String, String> {
        let mut ret = self.options.clone();
        insert_opt(&mut ret, "stp", self.stp);
        ret
    }
}

#[derive(Debug, Default)]
struct NmSettingBridgePort {
    path_cost: Option<u32>,
    priority: Option<u32>,
}

impl ToKeyfile for NmSettingBridgePort {
    fn to_keyfile(&self) -> BTreeMap<String, String> {
        let mut ret = BTreeMap::new();
        insert_opt(&mut ret, "path-cost", self.path_cost);
        insert_opt(&mut ret, "priority", self.priority);
        ret
    }
}

#[derive(Debug, Default)]
struct NmSettingVlan {
    id: u16,
    parent: String,
}

impl ToKeyfile for NmSettingVlan {
    fn to_keyfile(&self) -> BTreeMap<String, String> {
        let mut ret = BTreeMap::new();
        ret.insert("id".to_string(), self.id.to_string());
        ret.insert("parent".to_string(), self.parent.clone());
        ret
    }
}

#[derive(Debug, Default)]
struct NmSettingIp {
    method: &'static str,
    addresses: Vec<String>,
    gateway: Option<String>,
    routes: Vec<String>,
    dns: DnsConfig,
    route_metric: Option<u32>,
    mtu: Option<u32>,
}

impl NmSettingIp {
    fn new(method: &'static str) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }
}

impl ToKeyfile for NmSettingIp {
    fn to_keyfile(&self) -> BTreeMap<String, String> {
        let mut ret = BTreeMap::new();
        ret.insert("method".to_string(), self.method.to_string());
        for (index, addr) in self.addresses.iter().enumerate() {
            ret.insert(format!("address{}", index + 1), addr.clone());
        }
        for (index, route) in self.routes.iter().enumerate() {
            ret.insert(format!("route{}", index + 1), route.clone());
        }
        insert_opt(&mut ret, "gateway", self.gateway.as_deref());
        insert_opt(&mut ret, "route-metric", self.route_metric);
        insert_opt(&mut ret, "mtu", self.mtu);
        if !self.dns.nameservers.is_empty() {
            ret.insert("dns".to_string(), to_list(&self.dns.nameservers));
        }
        if !self.dns.search.is_empty() {
            ret.insert("dns-search".to_string(), to_list(&self.dns.search));
        }
        ret
    }
}

#[derive(Debug, Default)]
struct NmSettingUser {
    data: BTreeMap<String, String>,
}

impl ToKeyfile for NmSettingUser {
    fn to_keyfile(&self) -> BTreeMap<String, String> {
        self.data.clone()
    }
}

#[derive(Debug, Default)]
struct NmConnection {
    connection: NmSettingConnection,
    wired: Option<NmSettingWired>,
    infiniband: Option<NmSettingInfiniBand>,
    bond: Option<NmSettingBond>,
    bridge: Option<NmSettingBridge>,
    bridge_port: Option<NmSettingBridgePort>,
    vlan: Option<NmSettingVlan>,
    ipv4: Option<NmSettingIp>,
    ipv6: Option<NmSettingIp>,
    user: NmSettingUser,
}

impl NmConnection {
    fn to_keyfile(&self) -> String {
        let mut sections: Vec<(&str, BTreeMap<String, String>)> =
            vec![("connection", self.connection.to_keyfile())];
        if let Some(wired) = &self.wired {
            sections.push(("ethernet", wired.to_keyfile()));
        }
        if let Some(ib) = &self.infiniband {
            sections.push(("infiniband", ib.to_keyfile()));
        }
        if let Some(bond) = &self.bond {
            sections.push(("bond", bond.to_keyfile()));
        }
        if let Some(br) = &self.bridge {
            sections.push(("bridge", br.to_keyfile()));
        }
        if let Some(br_port) = &self.bridge_port {
            sections.push(("bridge-port", br_port.to_keyfile()));
        }
        if let Some(vlan) = &self.vlan {
            sections.push(("vlan", vlan.to_keyfile()));
        }
        if let Some(ipv4) = &self.ipv4 {
            sections.push(("ipv4", ipv4.to_keyfile()));
        }
        if let Some(ipv6) = &self.ipv6 {
            sections.push(("ipv6", ipv6.to_keyfile()));
        }
        sections.push(("user", self.user.to_keyfile()));
        keyfile_sections_to_string(&sections)
    }
}

fn keyfile_sections_to_string(
    sections: &[(&str, BTreeMap<String, String>)],
) -> String {
    let mut ret = Vec::new();
    for (name, settings) in sections {
        let mut section = format!("[{name}]\n");
        for (key, value) in settings {
            section += &format!("{key}={value}\n");
        }
        ret.push(section);
    }
    ret.join("\n")
}

/// NetworkManager keyfile renderer.
#[derive(Debug, Clone, Default)]
pub struct NetworkManagerRenderer {
    opts: NetworkManagerOptions,
}

impl NetworkManagerRenderer {
    pub fn new(opts: NetworkManagerOptions) -> Self {
        Self { opts }
    }
}

impl Renderer for NetworkManagerRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::NetworkManager
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
            ret.push(RenderedFile::new(
                &connection_file_path(&self.opts.connection_dir, &iface.name),
                iface_to_nm_conn(state, iface).to_keyfile(),
                PRIVATE_FILE_MODE,
            ));
        }
        for route in state.unowned_global_routes() {
            log::warn!(
                "Skipping route {route} as no interface holds its gateway"
            );
        }
        Ok(ret)
    }
}

fn iface_to_nm_conn(state: &NetworkState, iface: &Interface) -> NmConnection {
    let mut nm_conn = NmConnection::default();
    let mac = iface.mac_address.as_ref().map(|m| m.to_uppercase());
    nm_conn.connection = NmSettingConnection {
        id: format!("cloud-init {}", iface.name),
        uuid: connection_uuid(&iface.name),
        iface_type: match iface.iface_type {
            InterfaceType::Bond => "bond",
            InterfaceType::Bridge => "bridge",
            InterfaceType::Vlan => "vlan",
            InterfaceType::Infiniband => "infiniband",
            _ => "ethernet",
        },
        // Physical devices with a MAC address are matched by it
        iface_name: if iface.iface_type == InterfaceType::Physical
            && mac.is_some()
        {
            None
        } else {
            Some(iface.name.clone())
        },
        ..Default::default()
    };
    nm_conn.user.data.insert(
        "org.freedesktop.NetworkManager.origin".to_string(),
        "netcfg".to_string(),
    );

    match iface.iface_type {
        InterfaceType::Infiniband => {
            nm_conn.infiniband = Some(NmSettingInfiniBand {
                mac_address: mac,
                mtu: iface.mtu,
            });
        }
        InterfaceType::Bond => {
            let mut bond = NmSettingBond::default();
            if let Some(bond_conf) = iface.bond.as_ref() {
                for (opt, value) in bond_conf.iter() {
                    bond.options.insert(opt.to_string(), value);
                }
            }
            nm_conn.bond = Some(bond);
            nm_conn.wired = Some(wired_setting(iface, mac));
        }
        InterfaceType::Bridge => {
            let mut br = NmSettingBridge::default();
            if let Some(br_conf) = iface.bridge.as_ref() {
                br.stp = br_conf.stp;
                for (opt, value) in br_conf.options.iter() {
                    let key = match opt {
                        BridgeOption::AgeingTime => "ageing-time",
                        BridgeOption::Priority => "priority",
                        BridgeOption::ForwardDelay => "forward-delay",
                        BridgeOption::HelloTime => "hello-time",
                        BridgeOption::MaxAge => "max-age",
                        _ => {
                            log::debug!(
                                "Bridge option {opt} is not supported by \
                                NetworkManager"
                            );
                            continue;
                        }
                    };
                    br.options.insert(key.to_string(), value.clone());
                }
            }
            nm_conn.bridge = Some(br);
            nm_conn.wired = Some(wired_setting(iface, mac));
        }
        InterfaceType::Vlan => {
            if let Some(vlan) = iface.vlan.as_ref() {
                nm_conn.vlan = Some(NmSettingVlan {
                    id: vlan.id,
                    parent: connection_uuid(&vlan.base_iface),
                });
            }
            nm_conn.wired = Some(wired_setting(iface, mac));
        }
        _ => {
            nm_conn.wired = Some(wired_setting(iface, mac));
        }
    }

    if let Some(bond_name) = iface.bond_master.as_deref() {
        nm_conn.connection.controller = Some(connection_uuid(bond_name));
        nm_conn.connection.port_type = Some("bond");
        return nm_conn;
    }
    if let Some(br_name) = state.bridge_of(&iface.name) {
        nm_conn.connection.controller = Some(connection_uuid(br_name));
        nm_conn.connection.port_type = Some("bridge");
        if let Some(br_conf) =
            state.get_iface(br_name).and_then(|i| i.bridge.as_ref())
        {
            nm_conn.bridge_port = Some(NmSettingBridgePort {
                path_cost: br_conf.path_cost.get(&iface.name).copied(),
                priority: br_conf.port_priority.get(&iface.name).copied(),
            });
        }
        return nm_conn;
    }

    nm_conn.ipv4 = Some(ip_setting(state, iface, AddressFamily::IPv4));
    nm_conn.ipv6 = Some(ip_setting(state, iface, AddressFamily::IPv6));
    nm_conn
}

fn wired_setting(iface: &Interface, mac: Option<String>) -> NmSettingWired {
    NmSettingWired {
        mac_address: mac,
        mtu: iface.mtu,
        wake_on_lan: iface.wakeonlan,
    }
}

fn ip_setting(
    state: &NetworkState,
    iface: &Interface,
    family: AddressFamily,
) -> NmSettingIp {
    let mut method = match family {
        AddressFamily::IPv4 => "disabled",
        AddressFamily::IPv6 => "ignore",
    };
    let mut addresses = Vec::new();
    let mut gateway = None;
    let mut routes: Vec<&Route> = Vec::new();
    let mut route_metric = None;
    let mut mtu = None;
    let mut dns = DnsConfig::new();
    for subnet in iface.subnets.iter().filter(|s| s.family() == family) {
        match subnet.kind() {
            SubnetType::Dhcp4 | SubnetType::Ipv6DhcpStateless => {
                method = "auto"
            }
            SubnetType::Ipv6Slaac => method = "auto",
            SubnetType::Dhcp6 | SubnetType::Ipv6DhcpStateful => {
                if method != "auto" {
                    method = "dhcp";
                }
            }
            SubnetType::Static | SubnetType::Static6 => {
                if !matches!(method, "auto" | "dhcp") {
                    method = "manual";
                }
                if let Some(cidr) = subnet.cidr() {
                    addresses.push(cidr);
                }
                if gateway.is_none() {
                    gateway = state.default_gateway_of(iface, subnet);
                }
            }
            SubnetType::Manual => (),
        }
        if !subnet.is_static() {
            route_metric = route_metric.or(subnet.metric());
        }
        if family == AddressFamily::IPv6 {
            mtu = mtu.or(subnet.mtu());
        }
        dns.extend(&subnet.dns().nameservers, &subnet.dns().search);
        routes.extend(subnet.routes().iter());
    }
    routes.extend(
        state
            .global_routes_of(&iface.name)
            .into_iter()
            .filter(|r| r.family() == family),
    );
    if method == "ignore" || method == "disabled" {
        return NmSettingIp::new(method);
    }

    let family_dns: Vec<String> = iface
        .dns
        .nameservers
        .iter()
        .filter(|ns| AddressFamily::of_addr(ns) == family)
        .cloned()
        .collect();
    dns.extend(&family_dns, &iface.dns.search);
    if dns.is_empty() {
        let global_ns: Vec<String> = state
            .dns()
            .nameservers
            .iter()
            .filter(|ns| AddressFamily::of_addr(ns) == family)
            .cloned()
            .collect();
        dns.extend(&global_ns, &state.dns().search);
    }

    NmSettingIp {
        method,
        addresses,
        gateway,
        routes: routes.into_iter().map(route_to_nm).collect(),
        dns,
        route_metric,
        mtu,
    }
}

fn route_to_nm(route: &Route) -> String {
    let mut ret = route.cidr();
    match (route.gateway(), route.metric()) {
        (Some(gw), Some(metric)) => ret += &format!(",{gw},{metric}"),
        (Some(gw), None) => ret += &format!(",{gw}"),
        (None, Some(metric)) => ret += &format!(",,{metric}"),
        (None, None) => (),
    }
    ret
}
