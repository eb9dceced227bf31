// SPDX-License-Identifier: Apache-2.0

use crate::{
    unit_tests::testlib::{parse_yaml, parse_yaml_with, strict, TWO_NICS_V1},
    AddressFamily, BondMode, BondOption, Control, ErrorKind, InterfaceType,
    ParseOptions, SubnetType,
};

#[test]
fn test_v1_two_nics() {
    let state = parse_yaml(TWO_NICS_V1);
    assert_eq!(state.version(), 1);
    let names: Vec<&str> = state.interfaces().map(|i| i.name()).collect();
    assert_eq!(names, vec!["eth0", "eth1"]);

    let eth0 = state.get_iface("eth0").unwrap();
    assert_eq!(eth0.iface_type, InterfaceType::Physical);
    assert_eq!(eth0.mac_address.as_deref(), Some("52:54:00:12:34:00"));
    let subnet = &eth0.subnets[0];
    assert_eq!(subnet.kind(), SubnetType::Static);
    assert_eq!(subnet.address().as_deref(), Some("192.168.1.5"));
    assert_eq!(subnet.prefix(), Some(24));
    assert_eq!(subnet.netmask().as_deref(), Some("255.255.255.0"));
    assert_eq!(subnet.gateway().as_deref(), Some("192.168.1.254"));
    assert_eq!(subnet.control(), Control::Auto);

    let eth1 = state.get_iface("eth1").unwrap();
    assert!(eth1.has_dhcp(AddressFamily::IPv4));
    assert!(!eth1.has_dhcp(AddressFamily::IPv6));
}

#[test]
fn test_v1_unknown_type_strict() {
    let result = parse_yaml_with(
        r#"---
version: 1
config:
  - type: wireguard
    name: wg0
"#,
        &strict(),
    );
    let e = result.unwrap_err();
    assert_eq!(e.kind(), ErrorKind::UnknownCommandType);
    assert!(e.msg().contains("wireguard"));
}

#[test]
fn test_v1_unknown_type_not_skipped() {
    let result = parse_yaml_with(
        r#"---
version: 1
config:
  - type: wireguard
    name: wg0
"#,
        &ParseOptions::default(),
    );
    assert_eq!(result.unwrap_err().kind(), ErrorKind::UnknownCommandType);
}

const BROKEN_VLAN: &str = r#"---
version: 1
config:
  - type: physical
    name: eth0
  - type: vlan
    name: eth0.5000
    vlan_link: eth0
    vlan_id: 5000
  - type: physical
    name: eth1
"#;

#[test]
fn test_v1_skip_broken_command() {
    let state = parse_yaml(BROKEN_VLAN);
    let names: Vec<&str> = state.interfaces().map(|i| i.name()).collect();
    assert_eq!(names, vec!["eth0", "eth1"]);
}

#[test]
fn test_v1_broken_command_strict() {
    let e = parse_yaml_with(BROKEN_VLAN, &strict()).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidCommand);
    assert!(e.msg().contains("5000"));
}

#[test]
fn test_v1_vlan_id_range() {
    let state = parse_yaml(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
  - type: vlan
    name: eth0.4094
    vlan_link: eth0
    vlan_id: "4094"
"#,
    );
    let vlan = state.get_iface("eth0.4094").unwrap().vlan.as_ref().unwrap();
    assert_eq!(vlan.id, 4094);
    assert_eq!(vlan.base_iface, "eth0");

    for id in ["0", "4095"] {
        let content = format!(
            "version: 1\nconfig:\n  - type: vlan\n    name: v\n    \
            vlan_link: eth0\n    vlan_id: {id}\n"
        );
        let e = parse_yaml_with(&content, &strict()).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::InvalidCommand);
    }
}

#[test]
fn test_v1_static_without_address() {
    let e = parse_yaml_with(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
    subnets:
      - type: static
"#,
        &strict(),
    )
    .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidCommand);
}

#[test]
fn test_v1_duplicate_interface() {
    let e = parse_yaml_with(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
  - type: physical
    name: eth0
"#,
        &ParseOptions::default(),
    )
    .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::ConfigConflict);
    assert_eq!(e.msg(), "Interface eth0 is declared more than once");
}

#[test]
fn test_v1_two_default_routes() {
    let e = parse_yaml_with(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
    subnets:
      - type: static
        address: 10.0.0.2/24
        routes:
          - network: 0.0.0.0
            prefix: 0
            gateway: 10.0.0.1
  - type: route
    destination: 0.0.0.0/0
    gateway: 10.0.0.254
"#,
        &ParseOptions::default(),
    )
    .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::ConfigConflict);
    assert!(e.msg().starts_with("Only one ipv4 default route is allowed"));
}

#[test]
fn test_v1_default_routes_of_both_families() {
    let state = parse_yaml(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
    subnets:
      - type: static
        address: 10.0.0.2/24
      - type: static6
        address: 2001:db8::2/64
  - type: route
    destination: 0.0.0.0/0
    gateway: 10.0.0.1
  - type: route
    destination: ::/0
    gateway: 2001:db8::1
"#,
    );
    assert_eq!(state.routes().len(), 2);
    assert_eq!(
        state.default_route_iface(AddressFamily::IPv4),
        Some("eth0")
    );
    assert_eq!(
        state.default_route_iface(AddressFamily::IPv6),
        Some("eth0")
    );
}

#[test]
fn test_v1_bond_member_forms_are_equivalent() {
    let by_list = parse_yaml(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
  - type: physical
    name: eth1
  - type: bond
    name: bond0
    bond_interfaces: [eth0, eth1]
    params:
      bond-mode: active-backup
      bond-miimon: 100
"#,
    );
    let by_param = parse_yaml(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
    params:
      bond-master: bond0
  - type: physical
    name: eth1
    bond-master: bond0
  - type: bond
    name: bond0
    params:
      bond_mode: active-backup
      bond_miimon: "100"
"#,
    );
    for state in [&by_list, &by_param] {
        assert_eq!(state.bond_members("bond0"), vec!["eth0", "eth1"]);
        let bond = state.get_iface("bond0").unwrap().bond.as_ref().unwrap();
        assert_eq!(bond.mode, Some(BondMode::ActiveBackup));
        assert_eq!(bond.get(BondOption::Miimon).as_deref(), Some("100"));
    }
    assert_eq!(
        by_list.get_iface("bond0").unwrap().bond,
        by_param.get_iface("bond0").unwrap().bond
    );
}

#[test]
fn test_v1_bond_slaves_param_creates_placeholders() {
    let state = parse_yaml(
        r#"---
version: 1
config:
  - type: bond
    name: bond0
    params:
      bond-slaves: eth0 eth1
      bond-mode: 802.3ad
      bond-xmit-hash-policy: layer3+4
  - type: physical
    name: eth1
    mtu: 9000
"#,
    );
    let eth0 = state.get_iface("eth0").unwrap();
    assert!(eth0.is_placeholder());
    assert_eq!(eth0.bond_master.as_deref(), Some("bond0"));
    let eth1 = state.get_iface("eth1").unwrap();
    assert!(!eth1.is_placeholder());
    assert_eq!(eth1.mtu, Some(9000));
    assert_eq!(eth1.bond_master.as_deref(), Some("bond0"));
    let bond = state.get_iface("bond0").unwrap().bond.as_ref().unwrap();
    assert_eq!(bond.mode, Some(BondMode::LACP));
    assert_eq!(
        bond.get(BondOption::XmitHashPolicy).as_deref(),
        Some("layer3+4")
    );
}

#[test]
fn test_v1_bond_member_of_two_bonds() {
    let e = parse_yaml_with(
        r#"---
version: 1
config:
  - type: bond
    name: bond0
    bond_interfaces: [eth0]
  - type: bond
    name: bond1
    bond_interfaces: [eth0]
"#,
        &ParseOptions::default(),
    )
    .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::ConfigConflict);
    assert_eq!(
        e.msg(),
        "Interface eth0 is member of both bond bond0 and bond1"
    );
}

#[test]
fn test_v1_member_bond_master_disagrees_with_bond() {
    let e = parse_yaml_with(
        r#"---
version: 1
config:
  - type: bond
    name: bond0
    bond_interfaces: [eth0]
  - type: bond
    name: bond1
  - type: physical
    name: eth0
    params:
      bond-master: bond1
"#,
        &ParseOptions::default(),
    )
    .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::ConfigConflict);
    assert_eq!(
        e.msg(),
        "Interface eth0 is member of both bond bond0 and bond1"
    );
}

#[test]
fn test_v1_member_bond_master_declared_before_bond() {
    let e = parse_yaml_with(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
    bond-master: bond1
  - type: bond
    name: bond0
    bond_interfaces: [eth0]
  - type: bond
    name: bond1
"#,
        &ParseOptions::default(),
    )
    .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::ConfigConflict);
    assert_eq!(
        e.msg(),
        "Interface eth0 is member of both bond bond1 and bond0"
    );
}

#[test]
fn test_v1_bond_master_not_defined() {
    let e = parse_yaml_with(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
    bond-master: bond9
"#,
        &ParseOptions::default(),
    )
    .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidCommand);
    assert_eq!(
        e.msg(),
        "Interface eth0 declares bond master bond9 which is not defined"
    );
}

#[test]
fn test_v1_bond_master_is_not_a_bond() {
    let e = parse_yaml_with(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
    bond-master: eth1
  - type: physical
    name: eth1
"#,
        &ParseOptions::default(),
    )
    .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidCommand);
    assert!(e.msg().starts_with(
        "Interface eth0 declares bond master eth1 which is a "
    ));
}

#[test]
fn test_v1_bond_invalid_mode() {
    let e = parse_yaml_with(
        r#"---
version: 1
config:
  - type: bond
    name: bond0
    params:
      bond-mode: fastest
"#,
        &strict(),
    )
    .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidCommand);
}

#[test]
fn test_v1_bridge_params() {
    let state = parse_yaml(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
  - type: bridge
    name: br0
    bridge_interfaces: [eth0, eth1]
    params:
      bridge_stp: "off"
      bridge_fd: 15
      bridge_pathcost: [eth0 50, eth1 75]
      bridge_portprio: eth0 28
    subnets:
      - type: dhcp4
"#,
    );
    assert_eq!(state.bridge_ports("br0"), vec!["eth0", "eth1"]);
    assert_eq!(state.bridge_of("eth1"), Some("br0"));
    assert!(state.get_iface("eth1").unwrap().is_placeholder());
    let br = state.get_iface("br0").unwrap().bridge.as_ref().unwrap();
    assert_eq!(br.stp, Some(false));
    assert_eq!(br.path_cost.get("eth0"), Some(&50));
    assert_eq!(br.path_cost.get("eth1"), Some(&75));
    assert_eq!(br.port_priority.get("eth0"), Some(&28));
    assert_eq!(
        br.options.get(&crate::BridgeOption::ForwardDelay).map(String::as_str),
        Some("15")
    );
}

#[test]
fn test_v1_nameservers() {
    let state = parse_yaml(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
    subnets:
      - type: static
        address: 10.0.0.2/24
        dns_nameservers: 10.0.0.53
        dns_search: [example.com]
  - type: nameserver
    address: [8.8.8.8, 8.8.4.4]
    search: corp.example.com
  - type: nameserver
    interface: eth0
    address: 1.1.1.1
  - type: nameserver
    address: 8.8.8.8
"#,
    );
    assert_eq!(state.dns().nameservers, vec!["8.8.8.8", "8.8.4.4"]);
    assert_eq!(state.dns().search, vec!["corp.example.com"]);
    let eth0 = state.get_iface("eth0").unwrap();
    assert_eq!(eth0.dns.nameservers, vec!["1.1.1.1"]);
    let all = eth0.all_dns();
    assert_eq!(all.nameservers, vec!["10.0.0.53", "1.1.1.1"]);
    assert_eq!(all.search, vec!["example.com"]);
}

#[test]
fn test_v1_global_route_owner() {
    let state = parse_yaml(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
    subnets:
      - type: static
        address: 10.0.0.2
        netmask: 255.255.255.0
  - type: physical
    name: eth1
    subnets:
      - type: dhcp
  - type: route
    network: 192.168.0.0
    netmask: 255.255.0.0
    gateway: 10.0.0.1
    metric: 3
  - type: route
    destination: 172.16.0.0/12
    gateway: 10.9.9.1
"#,
    );
    let routes = state.routes();
    assert_eq!(routes.len(), 2);
    assert_eq!(routes[0].prefix(), 16);
    assert_eq!(routes[0].metric(), Some(3));
    assert_eq!(state.route_owner(&routes[0]), Some("eth0"));
    assert_eq!(state.route_owner(&routes[1]), None);
    assert_eq!(state.unowned_global_routes().len(), 1);
    assert!(state
        .get_iface("eth1")
        .unwrap()
        .has_dhcp(AddressFamily::IPv4));
}

#[test]
fn test_v1_subnet_control_and_ipv6_types() {
    let state = parse_yaml(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
    accept-ra: true
    subnets:
      - type: ipv6_slaac
        control: manual
      - type: ipv6_dhcpv6-stateless
      - type: static6
        address: 2001:db8::5
        prefix: 48
        gateway: 2001:db8::1
"#,
    );
    let eth0 = state.get_iface("eth0").unwrap();
    assert_eq!(eth0.accept_ra, Some(true));
    assert_eq!(eth0.subnets[0].control(), Control::Manual);
    assert!(eth0.has_dhcp(AddressFamily::IPv6));
    assert_eq!(eth0.subnets[2].prefix(), Some(48));
    assert_eq!(
        state.default_route_iface(AddressFamily::IPv6),
        Some("eth0")
    );
    assert_eq!(state.default_route_iface(AddressFamily::IPv4), None);
}

#[test]
fn test_v1_gateway_family_mismatch() {
    let e = parse_yaml_with(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
    subnets:
      - type: static
        address: 10.0.0.2/24
        gateway: 2001:db8::1
"#,
        &strict(),
    )
    .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidCommand);
}

#[test]
fn test_unsupported_version() {
    let e = parse_yaml_with("version: 3\nconfig: []\n", &strict())
        .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    assert!(e.msg().starts_with("Unsupported network configuration version"));
}

#[test]
fn test_network_key_wrapper() {
    let state = parse_yaml(
        r#"---
network:
  version: 1
  config:
    - type: loopback
      name: lo
"#,
    );
    assert_eq!(
        state.get_iface("lo").unwrap().iface_type,
        InterfaceType::Loopback
    );
}

#[test]
fn test_creation_order() {
    let state = parse_yaml(
        r#"---
version: 1
config:
  - type: vlan
    name: bond0.10
    vlan_link: bond0
    vlan_id: 10
  - type: bridge
    name: br0
    bridge_interfaces: [eth2]
  - type: bond
    name: bond0
    bond_interfaces: [eth1, eth0]
"#,
    );
    let names: Vec<&str> = state
        .interfaces_in_creation_order()
        .into_iter()
        .map(|i| i.name())
        .collect();
    assert_eq!(
        names,
        vec!["eth0", "eth1", "eth2", "bond0", "br0", "bond0.10"]
    );
}
