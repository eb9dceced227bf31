// SPDX-License-Identifier: Apache-2.0

use std::net::IpAddr;
use std::str::FromStr;

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{Map, Value};

use super::builder::NetworkStateBuilder;
use crate::{
    ip::IpNetwork, BondConfig, BondOption, BridgeConfig, Control,
    DhcpOverrides, ErrorKind, Interface, InterfaceType, NetCfgError,
    ParseOptions, Route, Subnet, SubnetType, VlanConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommandType {
    Physical,
    Bond,
    Bridge,
    Vlan,
    Route,
    Nameserver,
    Loopback,
    Infiniband,
}

impl FromStr for CommandType {
    type Err = NetCfgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "physical" => Ok(Self::Physical),
            "bond" => Ok(Self::Bond),
            "bridge" => Ok(Self::Bridge),
            "vlan" => Ok(Self::Vlan),
            "route" => Ok(Self::Route),
            "nameserver" => Ok(Self::Nameserver),
            "loopback" => Ok(Self::Loopback),
            "infiniband" => Ok(Self::Infiniband),
            _ => Err(NetCfgError::new(
                ErrorKind::UnknownCommandType,
                format!(
                    "No handler found for command type '{s}', supported: \
                    physical, bond, bridge, vlan, route, nameserver, \
                    loopback, infiniband"
                ),
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RouteCommand {
    #[serde(default)]
    destination: Option<String>,
    #[serde(default)]
    network: Option<String>,
    #[serde(
        default,
        deserialize_with = "crate::deserializer::option_scalar_as_string"
    )]
    netmask: Option<String>,
    #[serde(
        default,
        deserialize_with = "crate::deserializer::option_scalar_as_string"
    )]
    prefix: Option<String>,
    #[serde(default)]
    gateway: Option<String>,
    #[serde(
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    metric: Option<u32>,
}

impl RouteCommand {
    fn to_route(&self) -> Result<Route, NetCfgError> {
        let network = self
            .destination
            .as_deref()
            .or(self.network.as_deref())
            .ok_or_else(|| {
                NetCfgError::new(
                    ErrorKind::InvalidCommand,
                    "Route requires destination or network".to_string(),
                )
            })?;
        Route::new(
            network,
            self.prefix.as_deref(),
            self.netmask.as_deref(),
            self.gateway.as_deref(),
            self.metric,
        )
        .map_err(as_invalid_command)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SubnetCommand {
    #[serde(rename = "type")]
    kind: SubnetType,
    #[serde(
        default,
        deserialize_with = "crate::deserializer::option_scalar_as_string"
    )]
    address: Option<String>,
    #[serde(
        default,
        deserialize_with = "crate::deserializer::option_scalar_as_string"
    )]
    netmask: Option<String>,
    #[serde(
        default,
        deserialize_with = "crate::deserializer::option_scalar_as_string"
    )]
    prefix: Option<String>,
    #[serde(default)]
    gateway: Option<String>,
    #[serde(default)]
    routes: Vec<RouteCommand>,
    #[serde(
        default,
        deserialize_with = "crate::deserializer::option_string_list"
    )]
    dns_nameservers: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "crate::deserializer::option_string_list"
    )]
    dns_search: Option<Vec<String>>,
    #[serde(default)]
    control: Option<Control>,
    #[serde(
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    metric: Option<u32>,
    #[serde(
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    mtu: Option<u32>,
}

impl SubnetCommand {
    fn to_subnet(&self) -> Result<Subnet, NetCfgError> {
        let mut subnet = Subnet::new(self.kind);
        if let Some(addr) = self.address.as_deref() {
            subnet.address = Some(
                IpNetwork::normalize(
                    addr,
                    self.prefix.as_deref(),
                    self.netmask.as_deref(),
                )
                .map_err(as_invalid_command)?,
            );
        }
        if let Some(gw) = self.gateway.as_deref() {
            subnet.gateway = Some(IpAddr::from_str(gw.trim()).map_err(|e| {
                NetCfgError::new(
                    ErrorKind::InvalidCommand,
                    format!("Invalid gateway {gw}: {e}"),
                )
            })?);
        }
        for route in self.routes.iter() {
            subnet.routes.push(route.to_route()?);
        }
        subnet.dns.extend(
            self.dns_nameservers.as_deref().unwrap_or_default(),
            self.dns_search.as_deref().unwrap_or_default(),
        );
        subnet.control = self.control.unwrap_or_default();
        subnet.metric = self.metric;
        subnet.mtu = self.mtu;
        subnet.sanitize()?;
        Ok(subnet)
    }
}

/// Fields shared by every interface declaring command. Type specific keys
/// are optional here and checked by the handlers.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct IfaceCommand {
    name: String,
    #[serde(default, alias = "mac-address")]
    mac_address: Option<String>,
    #[serde(
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    mtu: Option<u32>,
    #[serde(default)]
    subnets: Vec<SubnetCommand>,
    #[serde(default)]
    params: Map<String, Value>,
    #[serde(
        default,
        deserialize_with = "crate::deserializer::option_string_list"
    )]
    bond_interfaces: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "crate::deserializer::option_string_list"
    )]
    bridge_interfaces: Option<Vec<String>>,
    #[serde(default, alias = "bond-master")]
    bond_master: Option<String>,
    #[serde(default, alias = "vlan-raw-device")]
    vlan_link: Option<String>,
    #[serde(
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    vlan_id: Option<u32>,
    #[serde(
        default,
        alias = "accept-ra",
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    accept_ra: Option<bool>,
    #[serde(
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    wakeonlan: Option<bool>,
    #[serde(
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    optional: Option<bool>,
    #[serde(default)]
    driver: Option<String>,
    #[serde(
        default,
        deserialize_with = "crate::deserializer::option_string_list"
    )]
    dns_nameservers: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "crate::deserializer::option_string_list"
    )]
    dns_search: Option<Vec<String>>,
    #[serde(default, rename = "dhcp4-overrides")]
    dhcp4_overrides: Option<DhcpOverrides>,
    #[serde(default, rename = "dhcp6-overrides")]
    dhcp6_overrides: Option<DhcpOverrides>,
    #[serde(
        default,
        rename = "dhcp4domain",
        deserialize_with = "crate::deserializer::option_scalar_as_string"
    )]
    dhcp4_domain: Option<String>,
    #[serde(
        default,
        rename = "dhcp6domain",
        deserialize_with = "crate::deserializer::option_scalar_as_string"
    )]
    dhcp6_domain: Option<String>,
}

impl IfaceCommand {
    fn to_iface(
        &self,
        iface_type: InterfaceType,
    ) -> Result<Interface, NetCfgError> {
        let mut iface = Interface::new(&self.name, iface_type);
        iface.mac_address = self.mac_address.clone();
        iface.mtu = self.mtu;
        for subnet in self.subnets.iter() {
            iface.subnets.push(subnet.to_subnet()?);
        }
        iface.bond_master = self.bond_master.clone().or_else(|| {
            ["bond-master", "bond_master"]
                .iter()
                .find_map(|k| self.params.get(*k))
                .map(param_to_string)
        });
        iface.accept_ra = self.accept_ra;
        iface.wakeonlan = self.wakeonlan.unwrap_or_default();
        iface.optional = self.optional.unwrap_or_default();
        iface.driver = self.driver.clone();
        iface.dns.extend(
            self.dns_nameservers.as_deref().unwrap_or_default(),
            self.dns_search.as_deref().unwrap_or_default(),
        );
        iface.dhcp4_overrides = self.dhcp4_overrides.clone();
        iface.dhcp6_overrides = self.dhcp6_overrides.clone();
        iface.dhcp4_domain = self.dhcp4_domain.clone();
        iface.dhcp6_domain = self.dhcp6_domain.clone();
        Ok(iface)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NameserverCommand {
    #[serde(
        default,
        deserialize_with = "crate::deserializer::option_string_list"
    )]
    address: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "crate::deserializer::option_string_list"
    )]
    search: Option<Vec<String>>,
    #[serde(default)]
    interface: Option<String>,
}

/// A v1 command with its payload already deserialized.
#[derive(Debug, Clone)]
pub(crate) enum Command {
    Physical(IfaceCommand),
    Bond(IfaceCommand),
    Bridge(IfaceCommand),
    Vlan(IfaceCommand),
    Route(RouteCommand),
    Nameserver(NameserverCommand),
    Loopback(IfaceCommand),
    Infiniband(IfaceCommand),
}

impl Command {
    /// Unknown `type` is [ErrorKind::UnknownCommandType], everything else
    /// wrong with the command is [ErrorKind::InvalidCommand].
    pub(crate) fn parse(value: &Value) -> Result<Self, NetCfgError> {
        let cmd_type = match value.get("type") {
            Some(Value::String(t)) => CommandType::from_str(t)?,
            _ => {
                return Err(NetCfgError::new(
                    ErrorKind::InvalidCommand,
                    format!("Command has no type: {value}"),
                ))
            }
        };
        Ok(match cmd_type {
            CommandType::Physical => Self::Physical(from_value(value)?),
            CommandType::Bond => Self::Bond(from_value(value)?),
            CommandType::Bridge => Self::Bridge(from_value(value)?),
            CommandType::Vlan => Self::Vlan(from_value(value)?),
            CommandType::Route => Self::Route(from_value(value)?),
            CommandType::Nameserver => Self::Nameserver(from_value(value)?),
            CommandType::Loopback => Self::Loopback(from_value(value)?),
            CommandType::Infiniband => Self::Infiniband(from_value(value)?),
        })
    }

    pub(crate) fn apply(
        &self,
        builder: &mut NetworkStateBuilder,
    ) -> Result<(), NetCfgError> {
        match self {
            Self::Physical(cmd) => {
                handle_physical(builder, cmd, InterfaceType::Physical)
            }
            Self::Loopback(cmd) => {
                handle_physical(builder, cmd, InterfaceType::Loopback)
            }
            Self::Infiniband(cmd) => {
                handle_physical(builder, cmd, InterfaceType::Infiniband)
            }
            Self::Bond(cmd) => handle_bond(builder, cmd),
            Self::Bridge(cmd) => handle_bridge(builder, cmd),
            Self::Vlan(cmd) => handle_vlan(builder, cmd),
            Self::Route(cmd) => builder.add_route(cmd.to_route()?),
            Self::Nameserver(cmd) => {
                builder.add_dns(
                    cmd.interface.as_deref(),
                    cmd.address.as_deref().unwrap_or_default(),
                    cmd.search.as_deref().unwrap_or_default(),
                );
                Ok(())
            }
        }
    }
}

/// Interpret a list of v1 commands in order.
pub(crate) fn interpret_v1(
    builder: &mut NetworkStateBuilder,
    commands: &[Value],
    opts: &ParseOptions,
) -> Result<(), NetCfgError> {
    for value in commands {
        if let Err(e) = Command::parse(value).and_then(|c| c.apply(builder)) {
            if opts.skip_broken && e.kind().is_recoverable() {
                log::warn!("Skipping invalid command: {e}");
                log::debug!("Invalid command content: {value}");
            } else {
                return Err(e);
            }
        }
    }
    Ok(())
}

fn handle_physical(
    builder: &mut NetworkStateBuilder,
    cmd: &IfaceCommand,
    iface_type: InterfaceType,
) -> Result<(), NetCfgError> {
    let iface = cmd.to_iface(iface_type)?;
    builder.add_iface(iface)
}

fn handle_bond(
    builder: &mut NetworkStateBuilder,
    cmd: &IfaceCommand,
) -> Result<(), NetCfgError> {
    let mut iface = cmd.to_iface(InterfaceType::Bond)?;
    iface.bond_master = None;
    let mut bond_conf = BondConfig::new();
    let mut members: Vec<String> =
        cmd.bond_interfaces.clone().unwrap_or_default();
    for (key, value) in cmd.params.iter() {
        let value = param_to_string(value);
        match key.as_str() {
            "bond-slaves" | "bond_slaves" => {
                if value != "none" {
                    members.extend(value.split_whitespace().map(String::from));
                }
            }
            "bond-master" | "bond_master" => (),
            _ => match BondOption::from_v1_key(key) {
                Some(opt) => bond_conf
                    .set(opt, &value)
                    .map_err(as_invalid_command)?,
                None => log::warn!(
                    "Ignoring unknown parameter {key} of bond {}",
                    cmd.name
                ),
            },
        }
    }
    iface.bond = Some(bond_conf);
    builder.validate_iface(&iface)?;
    for member in members.iter() {
        if member == &cmd.name {
            return Err(NetCfgError::new(
                ErrorKind::InvalidCommand,
                format!("Bond {} cannot hold itself", cmd.name),
            ));
        }
    }
    builder.add_iface(iface)?;
    for member in members {
        builder.set_bond_master(&member, &cmd.name)?;
    }
    Ok(())
}

fn handle_bridge(
    builder: &mut NetworkStateBuilder,
    cmd: &IfaceCommand,
) -> Result<(), NetCfgError> {
    let mut iface = cmd.to_iface(InterfaceType::Bridge)?;
    let mut br_conf = BridgeConfig::new();
    br_conf.ports = cmd.bridge_interfaces.clone().unwrap_or_default();
    for (key, value) in cmd.params.iter() {
        let value = param_to_string(value);
        if key == "bridge_ports" || key == "bridge-ports" {
            br_conf
                .ports
                .extend(value.split_whitespace().map(String::from));
        } else if !br_conf
            .set_v1_param(key, &value)
            .map_err(as_invalid_command)?
        {
            log::warn!(
                "Ignoring unknown parameter {key} of bridge {}",
                cmd.name
            );
        }
    }
    br_conf.ports.dedup();
    let ports = br_conf.ports.clone();
    iface.bridge = Some(br_conf);
    builder.add_iface(iface)?;
    for port in ports {
        builder.ensure_iface(&port);
    }
    Ok(())
}

fn handle_vlan(
    builder: &mut NetworkStateBuilder,
    cmd: &IfaceCommand,
) -> Result<(), NetCfgError> {
    let mut iface = cmd.to_iface(InterfaceType::Vlan)?;
    let link = cmd.vlan_link.as_deref().ok_or_else(|| {
        NetCfgError::new(
            ErrorKind::InvalidCommand,
            format!("VLAN {} requires vlan_link", cmd.name),
        )
    })?;
    let id = cmd.vlan_id.ok_or_else(|| {
        NetCfgError::new(
            ErrorKind::InvalidCommand,
            format!("VLAN {} requires vlan_id", cmd.name),
        )
    })?;
    iface.vlan = Some(VlanConfig::new(link, id)?);
    builder.add_iface(iface)
}

fn from_value<T>(value: &Value) -> Result<T, NetCfgError>
where
    T: DeserializeOwned,
{
    serde_json::from_value(value.clone()).map_err(|e| {
        NetCfgError::new(
            ErrorKind::InvalidCommand,
            format!("Invalid command {value}: {e}"),
        )
    })
}

// Parameters may be given as scalar or list, lists are joined by space.
pub(crate) fn param_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_string(),
        Value::Array(items) => items
            .iter()
            .map(param_to_string)
            .collect::<Vec<String>>()
            .join(" "),
        Value::Null => String::new(),
        v => v.to_string(),
    }
}

// Bad values inside a command make the whole command invalid.
fn as_invalid_command(e: NetCfgError) -> NetCfgError {
    if e.kind() == ErrorKind::InvalidArgument {
        NetCfgError::new(ErrorKind::InvalidCommand, e.msg().to_string())
    } else {
        e
    }
}
