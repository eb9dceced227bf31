// SPDX-License-Identifier: Apache-2.0

use serde_json::{json, Map, Value};

use super::{builder::NetworkStateBuilder, v1::interpret_v1};
use crate::{
    BondOption, BridgeOption, ErrorKind, NetCfgError, ParseOptions,
};

const V2_SECTIONS: [&str; 5] =
    ["ethernets", "wifis", "bonds", "bridges", "vlans"];

/// Adapt every v2 section into v1 commands and run them through the v1
/// handlers.
pub(crate) fn interpret_v2(
    builder: &mut NetworkStateBuilder,
    config: &Map<String, Value>,
    opts: &ParseOptions,
) -> Result<(), NetCfgError> {
    for key in config.keys() {
        if !V2_SECTIONS.contains(&key.as_str())
            && !["version", "renderer", "routes", "nameservers"]
                .contains(&key.as_str())
        {
            return Err(NetCfgError::new(
                ErrorKind::UnknownCommandType,
                format!(
                    "No handler found for v2 section '{key}', supported: \
                    {}, routes, nameservers",
                    V2_SECTIONS.join(", ")
                ),
            ));
        }
    }

    let mut commands = Vec::new();
    if let Some(devs) = section(config, "ethernets")? {
        for (name, dev) in devs {
            commands.push(v2_ethernet_to_v1(name, dev)?);
        }
    }
    if let Some(devs) = section(config, "wifis")? {
        if opts.netplan_target {
            log::debug!(
                "Leaving {} wifi devices to netplan passthrough",
                devs.len()
            );
        } else {
            log::warn!(
                "Ignoring wifis section of {} devices, only netplan \
                supports wifi configuration",
                devs.len()
            );
        }
    }
    if let Some(devs) = section(config, "bonds")? {
        for (name, dev) in devs {
            commands.push(v2_bond_to_v1(name, dev)?);
        }
    }
    if let Some(devs) = section(config, "bridges")? {
        for (name, dev) in devs {
            commands.push(v2_bridge_to_v1(name, dev)?);
        }
    }
    if let Some(devs) = section(config, "vlans")? {
        for (name, dev) in devs {
            let mut cmd = v2_common_to_v1("vlan", name, dev)?;
            cmd.insert("vlan_id".to_string(), dev_get(dev, "id"));
            cmd.insert("vlan_link".to_string(), dev_get(dev, "link"));
            commands.push(Value::Object(cmd));
        }
    }
    if let Some(routes) = config.get("routes") {
        for route in as_list(routes, "routes")? {
            let mut cmd = v2_route_to_v1(route);
            cmd.insert("type".to_string(), json!("route"));
            commands.push(Value::Object(cmd));
        }
    }
    if let Some(ns) = config.get("nameservers") {
        commands.push(json!({
            "type": "nameserver",
            "address": ns.get("addresses").cloned().unwrap_or(Value::Null),
            "search": ns.get("search").cloned().unwrap_or(Value::Null),
        }));
    }
    interpret_v1(builder, &commands, opts)
}

fn section<'a>(
    config: &'a Map<String, Value>,
    name: &str,
) -> Result<Option<&'a Map<String, Value>>, NetCfgError> {
    match config.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(m)) => Ok(Some(m)),
        Some(v) => Err(NetCfgError::new(
            ErrorKind::InvalidArgument,
            format!("Section {name} should be a mapping, got {v}"),
        )),
    }
}

fn as_list<'a>(
    value: &'a Value,
    name: &str,
) -> Result<&'a Vec<Value>, NetCfgError> {
    value.as_array().ok_or_else(|| {
        NetCfgError::new(
            ErrorKind::InvalidArgument,
            format!("{name} should be a list, got {value}"),
        )
    })
}

fn dev_get(dev: &Value, key: &str) -> Value {
    dev.get(key).cloned().unwrap_or(Value::Null)
}

fn v2_ethernet_to_v1(name: &str, dev: &Value) -> Result<Value, NetCfgError> {
    let mut cmd = v2_common_to_v1("physical", name, dev)?;
    if let Some(matches) = dev.get("match") {
        if let Some(mac) = matches.get("macaddress") {
            cmd.insert("mac_address".to_string(), mac.clone());
        }
        if let Some(driver) = matches.get("driver") {
            cmd.insert("driver".to_string(), driver.clone());
        }
    }
    Ok(Value::Object(cmd))
}

fn v2_bond_to_v1(name: &str, dev: &Value) -> Result<Value, NetCfgError> {
    let mut cmd = v2_common_to_v1("bond", name, dev)?;
    cmd.insert("bond_interfaces".to_string(), dev_get(dev, "interfaces"));
    let mut params = Map::new();
    if let Some(Value::Object(v2_params)) = dev.get("parameters") {
        for (key, value) in v2_params {
            match BondOption::from_netplan_key(key) {
                Some(opt) => {
                    params.insert(opt.eni_name(), value.clone());
                }
                None => log::warn!(
                    "Ignoring unknown parameter {key} of bond {name}"
                ),
            }
        }
    }
    cmd.insert("params".to_string(), Value::Object(params));
    Ok(Value::Object(cmd))
}

fn v2_bridge_to_v1(name: &str, dev: &Value) -> Result<Value, NetCfgError> {
    let mut cmd = v2_common_to_v1("bridge", name, dev)?;
    cmd.insert("bridge_interfaces".to_string(), dev_get(dev, "interfaces"));
    let mut params = Map::new();
    if let Some(Value::Object(v2_params)) = dev.get("parameters") {
        for (key, value) in v2_params {
            match key.as_str() {
                "stp" => {
                    params.insert("bridge_stp".to_string(), value.clone());
                }
                "path-cost" | "port-priority" => {
                    let eni_key = if key == "path-cost" {
                        "bridge_pathcost"
                    } else {
                        "bridge_portprio"
                    };
                    let pairs: Vec<Value> = value
                        .as_object()
                        .map(|m| {
                            m.iter()
                                .map(|(port, v)| {
                                    json!(format!(
                                        "{port} {}",
                                        super::v1::param_to_string(v)
                                    ))
                                })
                                .collect()
                        })
                        .unwrap_or_default();
                    params.insert(eni_key.to_string(), Value::Array(pairs));
                }
                _ => match BridgeOption::from_netplan_key(key) {
                    Some(opt) => {
                        params.insert(
                            opt.eni_name().to_string(),
                            value.clone(),
                        );
                    }
                    None => log::warn!(
                        "Ignoring unknown parameter {key} of bridge {name}"
                    ),
                },
            }
        }
    }
    cmd.insert("params".to_string(), Value::Object(params));
    Ok(Value::Object(cmd))
}

// Keys common to every v2 device class
fn v2_common_to_v1(
    cmd_type: &str,
    name: &str,
    dev: &Value,
) -> Result<Map<String, Value>, NetCfgError> {
    let mut cmd = Map::new();
    cmd.insert("type".to_string(), json!(cmd_type));
    let iface_name = dev
        .get("set-name")
        .and_then(Value::as_str)
        .unwrap_or(name);
    cmd.insert("name".to_string(), json!(iface_name));
    if let Some(mac) = dev.get("macaddress") {
        cmd.insert("mac_address".to_string(), mac.clone());
    }
    for (v2_key, v1_key) in [
        ("mtu", "mtu"),
        ("wakeonlan", "wakeonlan"),
        ("accept-ra", "accept_ra"),
        ("optional", "optional"),
        ("dhcp4-overrides", "dhcp4-overrides"),
        ("dhcp6-overrides", "dhcp6-overrides"),
        ("dhcp4domain", "dhcp4domain"),
        ("dhcp6domain", "dhcp6domain"),
    ] {
        if let Some(v) = dev.get(v2_key) {
            cmd.insert(v1_key.to_string(), v.clone());
        }
    }
    if let Some(ns) = dev.get("nameservers") {
        cmd.insert("dns_nameservers".to_string(), dev_get(ns, "addresses"));
        cmd.insert("dns_search".to_string(), dev_get(ns, "search"));
    }
    cmd.insert("subnets".to_string(), Value::Array(v2_to_v1_ipcfg(dev)?));
    Ok(cmd)
}

/// Turn the addressing keys of a v2 device into v1 subnets.
fn v2_to_v1_ipcfg(dev: &Value) -> Result<Vec<Value>, NetCfgError> {
    let mut subnets: Vec<Map<String, Value>> = Vec::new();
    for ver in [4, 6] {
        let enabled = dev
            .get(format!("dhcp{ver}").as_str())
            .map(is_true)
            .unwrap_or_default();
        if enabled {
            let mut subnet = Map::new();
            subnet.insert("type".to_string(), json!(format!("dhcp{ver}")));
            if let Some(metric) = dev
                .get(format!("dhcp{ver}-overrides").as_str())
                .and_then(|o| o.get("route-metric"))
            {
                subnet.insert("metric".to_string(), metric.clone());
            }
            subnets.push(subnet);
        }
    }

    let mut gateway4 = dev.get("gateway4").cloned();
    let mut gateway6 = dev.get("gateway6").cloned();
    let nameservers = dev.get("nameservers");
    if let Some(addrs) = dev.get("addresses") {
        for addr in as_list(addrs, "addresses")? {
            let addr_str = match addr {
                Value::String(s) => s.as_str(),
                // netplan allows `- 10.0.0.1/24: {lifetime: 0}`
                Value::Object(m) if m.len() == 1 => {
                    m.keys().next().map(String::as_str).unwrap_or_default()
                }
                _ => {
                    return Err(NetCfgError::new(
                        ErrorKind::InvalidArgument,
                        format!("Invalid address {addr}"),
                    ))
                }
            };
            let mut subnet = Map::new();
            subnet.insert("address".to_string(), json!(addr_str));
            if addr_str.contains(':') {
                subnet.insert("type".to_string(), json!("static6"));
                if let Some(gw) = gateway6.take() {
                    subnet.insert("gateway".to_string(), gw);
                }
            } else {
                subnet.insert("type".to_string(), json!("static"));
                if let Some(gw) = gateway4.take() {
                    subnet.insert("gateway".to_string(), gw);
                }
            }
            if let Some(ns) = nameservers {
                subnet.insert(
                    "dns_nameservers".to_string(),
                    dev_get(ns, "addresses"),
                );
                subnet.insert("dns_search".to_string(), dev_get(ns, "search"));
            }
            subnets.push(subnet);
        }
    }
    for (key, gw) in [("gateway4", gateway4), ("gateway6", gateway6)] {
        if let Some(gw) = gw {
            log::warn!(
                "Ignoring {key} {gw} as no static address of that family \
                is defined"
            );
        }
    }

    if let Some(routes) = dev.get("routes") {
        let mut v1_routes = Vec::new();
        for route in as_list(routes, "routes")? {
            v1_routes.push(Value::Object(v2_route_to_v1(route)));
        }
        match subnets.first_mut() {
            Some(subnet) => {
                subnet.insert("routes".to_string(), Value::Array(v1_routes));
            }
            None => log::warn!(
                "Ignoring routes of device without any address or DHCP"
            ),
        }
    }
    Ok(subnets.into_iter().map(Value::Object).collect())
}

// A route without `to` is passed on without destination, so that the v1
// handler rejects it as an invalid command.
fn v2_route_to_v1(route: &Value) -> Map<String, Value> {
    let mut ret = Map::new();
    let via = route.get("via");
    if let Some(to) = route.get("to").and_then(Value::as_str) {
        let destination = if to == "default" {
            let is_v6 = via
                .and_then(Value::as_str)
                .map(|v| v.contains(':'))
                .unwrap_or_default();
            if is_v6 {
                "::/0"
            } else {
                "0.0.0.0/0"
            }
        } else {
            to
        };
        ret.insert("destination".to_string(), json!(destination));
    }
    if let Some(via) = via {
        ret.insert("gateway".to_string(), via.clone());
    }
    if let Some(metric) = route.get("metric") {
        ret.insert("metric".to_string(), metric.clone());
    }
    ret
}

fn is_true(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => {
            crate::deserializer::parse_bool_str(s).unwrap_or_default()
        }
        _ => false,
    }
}
