// SPDX-License-Identifier: Apache-2.0

use crate::{
    unit_tests::testlib::{
        find_file, has_file, parse_yaml, FakeRunner, TWO_GATEWAYS_V1,
        TWO_NICS_V1,
    },
    DhcpOverrides, ErrorKind, NetworkdRenderer, RenderContext, RenderedFile,
    Renderer,
};

fn gen_networkd(content: &str) -> Vec<RenderedFile> {
    NetworkdRenderer::default()
        .gen_conf(&parse_yaml(content))
        .unwrap()
}

fn network_path(name: &str) -> String {
    format!("etc/systemd/network/10-cloud-init-{name}.network")
}

fn netdev_path(name: &str) -> String {
    format!("etc/systemd/network/10-cloud-init-{name}.netdev")
}

#[test]
fn test_networkd_two_nics() {
    let files = gen_networkd(TWO_NICS_V1);
    assert_eq!(files.len(), 2);
    assert_eq!(
        find_file(&files, &network_path("eth0")).content,
        "[Match]\n\
        MACAddress=52:54:00:12:34:00\n\
        Name=eth0\n\
        \n\
        [Network]\n\
        Gateway=192.168.1.254\n\
        \n\
        [Address]\n\
        Address=192.168.1.5/24\n"
    );
    assert_eq!(
        find_file(&files, &network_path("eth1")).content,
        "[Match]\n\
        MACAddress=52:54:00:12:34:01\n\
        Name=eth1\n\
        \n\
        [Network]\n\
        DHCP=ipv4\n"
    );
    assert_eq!(find_file(&files, &network_path("eth0")).mode, 0o644);
    assert!(!has_file(&files, "etc/systemd/resolved.conf"));
}

#[test]
fn test_networkd_dhcp_modes() {
    let files = gen_networkd(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
    subnets:
      - type: dhcp4
      - type: dhcp6
  - type: physical
    name: eth1
    subnets:
      - type: dhcp6
  - type: physical
    name: eth2
    subnets:
      - type: ipv6_slaac
"#,
    );
    assert!(find_file(&files, &network_path("eth0"))
        .content
        .contains("DHCP=yes\n"));
    assert!(find_file(&files, &network_path("eth1"))
        .content
        .contains("DHCP=ipv6\n"));
    let eth2 = &find_file(&files, &network_path("eth2")).content;
    assert!(!eth2.contains("DHCP="));
    assert!(eth2.contains("IPv6AcceptRA=yes\n"));
}

#[test]
fn test_networkd_addresses_routes_dns() {
    let files = gen_networkd(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
    mtu: 9000
    subnets:
      - type: static
        address: 10.0.0.2/24
        dns_nameservers: [10.0.0.53]
        dns_search: [corp.example.com]
        routes:
          - network: 192.168.0.0
            netmask: 255.255.0.0
            gateway: 10.0.0.1
            metric: 3
      - type: static6
        address: 2001:db8::2/64
  - type: nameserver
    address: [8.8.8.8, 1.1.1.1]
    search: [example.com]
"#,
    );
    assert_eq!(
        find_file(&files, &network_path("eth0")).content,
        "[Match]\n\
        Name=eth0\n\
        \n\
        [Link]\n\
        MTUBytes=9000\n\
        \n\
        [Network]\n\
        DNS=10.0.0.53\n\
        Domains=corp.example.com\n\
        \n\
        [Address]\n\
        Address=10.0.0.2/24\n\
        \n\
        [Address]\n\
        Address=2001:db8::2/64\n\
        \n\
        [Route]\n\
        Destination=192.168.0.0/16\n\
        Gateway=10.0.0.1\n\
        Metric=3\n"
    );
    assert_eq!(
        find_file(&files, "etc/systemd/resolved.conf").content,
        "[Resolve]\nDNS=8.8.8.8 1.1.1.1\nDomains=example.com\n"
    );
}

#[test]
fn test_networkd_bond() {
    let files = gen_networkd(
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
      bond-mode: 802.3ad
      bond-miimon: 100
    subnets:
      - type: dhcp4
"#,
    );
    assert_eq!(
        find_file(&files, &netdev_path("bond0")).content,
        "[NetDev]\n\
        Kind=bond\n\
        Name=bond0\n\
        \n\
        [Bond]\n\
        MIIMonitorSec=100ms\n\
        Mode=802.3ad\n"
    );
    assert!(find_file(&files, &network_path("eth1"))
        .content
        .contains("[Network]\nBond=bond0\n"));
    assert!(find_file(&files, &network_path("bond0"))
        .content
        .contains("DHCP=ipv4\n"));
    assert!(!has_file(&files, &netdev_path("eth0")));
}

#[test]
fn test_networkd_bridge_and_vlan() {
    let files = gen_networkd(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
  - type: physical
    name: eth1
  - type: bridge
    name: br0
    bridge_interfaces: [eth1]
    params:
      bridge_stp: "off"
      bridge_fd: 4
      bridge_pathcost: eth1 50
  - type: vlan
    name: eth0.100
    vlan_link: eth0
    vlan_id: 100
"#,
    );
    assert_eq!(
        find_file(&files, &netdev_path("br0")).content,
        "[NetDev]\n\
        Kind=bridge\n\
        Name=br0\n\
        \n\
        [Bridge]\n\
        ForwardDelaySec=4\n\
        STP=no\n"
    );
    assert_eq!(
        find_file(&files, &network_path("eth1")).content,
        "[Match]\n\
        Name=eth1\n\
        \n\
        [Network]\n\
        Bridge=br0\n\
        \n\
        [Bridge]\n\
        Cost=50\n"
    );
    assert_eq!(
        find_file(&files, &netdev_path("eth0.100")).content,
        "[NetDev]\nKind=vlan\nName=eth0.100\n\n[VLAN]\nId=100\n"
    );
    assert_eq!(
        find_file(&files, &network_path("eth0")).content,
        "[Match]\nName=eth0\n\n[Network]\nVLAN=eth0.100\n"
    );
    // netdev files come before the network file of the same device
    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    let netdev_pos = paths
        .iter()
        .position(|p| *p == netdev_path("br0"))
        .unwrap();
    let network_pos = paths
        .iter()
        .position(|p| *p == network_path("br0"))
        .unwrap();
    assert!(netdev_pos < network_pos);
}

#[test]
fn test_networkd_dhcp_overrides() {
    let files = gen_networkd(
        r#"---
version: 2
ethernets:
  eth0:
    dhcp4: true
    dhcp6: true
    dhcp4-overrides:
      use-dns: false
      use-domains: route
      route-metric: 200
"#,
    );
    let content = &find_file(&files, &network_path("eth0")).content;
    assert!(content.contains("DHCP=yes\n"));
    assert!(content.ends_with(
        "[DHCPv4]\nRouteMetric=200\nUseDNS=no\nUseDomains=route\n"
    ));
}

#[test]
fn test_networkd_domain_conflict_writes_nothing() {
    let mut state = parse_yaml(
        r#"---
version: 2
ethernets:
  eth0:
    dhcp4: true
    dhcp4-overrides:
      use-domains: true
"#,
    );
    for iface in state.interfaces.iter_mut() {
        iface.dhcp4_domain = Some("example.com".to_string());
    }
    let root = tempfile::tempdir().unwrap();
    let runner = FakeRunner::new();
    let ctx = RenderContext::new(root.path(), &runner);
    let e = NetworkdRenderer::default().render(&state, &ctx).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::ConfigConflict);
    assert_eq!(
        e.msg(),
        "Device eth0 sets both dhcp4domain and dhcp4-overrides.use-domains"
    );
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}

#[test]
fn test_networkd_dhcp6_domain() {
    let mut state = parse_yaml(
        r#"---
version: 2
ethernets:
  eth0:
    dhcp6: true
"#,
    );
    for iface in state.interfaces.iter_mut() {
        iface.dhcp6_domain = Some("true".to_string());
        iface.dhcp6_overrides = Some(DhcpOverrides::default());
    }
    let files = NetworkdRenderer::default().gen_conf(&state).unwrap();
    assert!(find_file(&files, &network_path("eth0"))
        .content
        .ends_with("[DHCPv6]\nUseDomains=yes\n"));
}

#[test]
fn test_networkd_single_default_gateway() {
    let files = gen_networkd(TWO_GATEWAYS_V1);
    assert_eq!(
        find_file(&files, &network_path("eth0")).content,
        "[Match]\n\
        Name=eth0\n\
        \n\
        [Network]\n\
        Gateway=10.0.0.1\n\
        \n\
        [Address]\n\
        Address=10.0.0.2/24\n"
    );
    assert_eq!(
        find_file(&files, &network_path("eth1")).content,
        "[Match]\n\
        Name=eth1\n\
        \n\
        [Address]\n\
        Address=10.1.0.2/24\n"
    );
}
