// SPDX-License-Identifier: Apache-2.0

use crate::{
    unit_tests::testlib::{find_file, has_file, parse_yaml, TWO_NICS_V1},
    RenderedFile, Renderer, SysconfigFlavor, SysconfigOptions,
    SysconfigRenderer,
};

const HEADER: &str = "# Created by netcfg automatically, do not edit.\n#\n";
const RHEL_DIR: &str = "etc/sysconfig/network-scripts";
const SUSE_DIR: &str = "etc/sysconfig/network";

fn gen_rhel(content: &str) -> Vec<RenderedFile> {
    SysconfigRenderer::default()
        .gen_conf(&parse_yaml(content))
        .unwrap()
}

fn gen_suse(content: &str) -> Vec<RenderedFile> {
    let mut opts = SysconfigOptions::default();
    opts.flavor = SysconfigFlavor::Suse;
    SysconfigRenderer::new(opts)
        .gen_conf(&parse_yaml(content))
        .unwrap()
}

fn rhel_file<'a>(files: &'a [RenderedFile], name: &str) -> &'a str {
    find_file(files, &format!("{RHEL_DIR}/{name}")).content.as_str()
}

fn suse_file<'a>(files: &'a [RenderedFile], name: &str) -> &'a str {
    find_file(files, &format!("{SUSE_DIR}/{name}")).content.as_str()
}

#[test]
fn test_rhel_two_nics() {
    let files = gen_rhel(TWO_NICS_V1);
    assert_eq!(
        rhel_file(&files, "ifcfg-eth0"),
        format!(
            "{HEADER}AUTOCONNECT_PRIORITY=120\n\
            BOOTPROTO=none\n\
            DEFROUTE=yes\n\
            DEVICE=eth0\n\
            GATEWAY=192.168.1.254\n\
            HWADDR=52:54:00:12:34:00\n\
            IPADDR=192.168.1.5\n\
            NETMASK=255.255.255.0\n\
            ONBOOT=yes\n\
            TYPE=Ethernet\n\
            USERCTL=no\n"
        )
    );
    assert_eq!(
        rhel_file(&files, "ifcfg-eth1"),
        format!(
            "{HEADER}AUTOCONNECT_PRIORITY=120\n\
            BOOTPROTO=dhcp\n\
            DEVICE=eth1\n\
            HWADDR=52:54:00:12:34:01\n\
            ONBOOT=yes\n\
            TYPE=Ethernet\n\
            USERCTL=no\n"
        )
    );
    assert_eq!(
        find_file(&files, "etc/sysconfig/network").content,
        format!("{HEADER}NETWORKING=yes\n")
    );
    assert!(!has_file(&files, "etc/resolv.conf"));
}

#[test]
fn test_rhel_no_defroute_without_gateway() {
    let files = gen_rhel(
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
"#,
    );
    let content = rhel_file(&files, "ifcfg-eth0");
    assert!(!content.contains("DEFROUTE"));
    assert!(!content.contains("GATEWAY"));
}

#[test]
fn test_rhel_single_default_route_owner() {
    let files = gen_rhel(
        r#"---
version: 1
config:
  - type: physical
    name: eth1
    subnets:
      - type: static
        address: 10.1.0.2/24
        gateway: 10.1.0.1
  - type: physical
    name: eth0
    subnets:
      - type: static
        address: 10.0.0.2/24
        gateway: 10.0.0.1
"#,
    );
    assert!(rhel_file(&files, "ifcfg-eth0").contains("DEFROUTE=yes\n"));
    assert!(rhel_file(&files, "ifcfg-eth1").contains("DEFROUTE=no\n"));
}

#[test]
fn test_rhel_explicit_default_route_wins() {
    let files = gen_rhel(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
    subnets:
      - type: static
        address: 10.0.0.2/24
        gateway: 10.0.0.1
  - type: physical
    name: eth1
    subnets:
      - type: static
        address: 10.1.0.2/24
  - type: route
    destination: 0.0.0.0/0
    gateway: 10.1.0.254
"#,
    );
    let eth0 = rhel_file(&files, "ifcfg-eth0");
    let eth1 = rhel_file(&files, "ifcfg-eth1");
    assert!(eth0.contains("DEFROUTE=no\n"));
    assert!(eth1.contains("DEFROUTE=yes\n"));
    assert!(eth1.contains("GATEWAY=10.1.0.254\n"));
    let yes_count = files
        .iter()
        .filter(|f| f.content.contains("DEFROUTE=yes"))
        .count();
    assert_eq!(yes_count, 1);
}

#[test]
fn test_rhel_aliases_and_ipv6() {
    let files = gen_rhel(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
    subnets:
      - type: static
        address: 10.0.0.2/24
        metric: 100
      - type: static
        address: 10.0.1.2/24
      - type: static
        address: 10.0.2.2/16
      - type: static6
        address: 2001:db8::2/64
        gateway: 2001:db8::1
      - type: static6
        address: 2001:db8::3/64
      - type: static6
        address: 2001:db8::4/64
"#,
    );
    let eth0 = rhel_file(&files, "ifcfg-eth0");
    assert!(eth0.contains("IPADDR=10.0.0.2\n"));
    assert!(eth0.contains("METRIC=100\n"));
    assert!(eth0.contains("IPV6INIT=yes\n"));
    assert!(eth0.contains("IPV6_AUTOCONF=no\n"));
    assert!(eth0.contains("IPV6ADDR=2001:db8::2/64\n"));
    assert!(eth0.contains(
        "IPV6ADDR_SECONDARIES=\"2001:db8::3/64 2001:db8::4/64\"\n"
    ));
    assert!(eth0.contains("IPV6_DEFAULTGW=2001:db8::1\n"));
    assert!(eth0.contains("IPV6_DEFROUTE=yes\n"));
    assert_eq!(
        rhel_file(&files, "ifcfg-eth0:1"),
        format!(
            "{HEADER}DEVICE=eth0:1\nIPADDR=10.0.1.2\n\
            NETMASK=255.255.255.0\nONBOOT=yes\n"
        )
    );
    assert!(rhel_file(&files, "ifcfg-eth0:2").contains("NETMASK=255.255.0.0"));
    assert!(find_file(&files, "etc/sysconfig/network")
        .content
        .ends_with("NETWORKING=yes\nNETWORKING_IPV6=yes\nIPV6_AUTOCONF=no\n"));
}

#[test]
fn test_rhel_dhcp6_variants() {
    let files = gen_rhel(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
    subnets:
      - type: ipv6_dhcpv6-stateless
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
    let eth0 = rhel_file(&files, "ifcfg-eth0");
    assert!(eth0.contains("DHCPV6C=yes\nDHCPV6C_OPTIONS=-S\n"));
    assert!(eth0.contains("IPV6_AUTOCONF=yes\n"));
    let eth1 = rhel_file(&files, "ifcfg-eth1");
    assert!(eth1.contains("BOOTPROTO=none\n"));
    assert!(eth1.contains("DHCPV6C=yes\n"));
    assert!(eth1.contains("IPV6INIT=yes\n"));
    let eth2 = rhel_file(&files, "ifcfg-eth2");
    assert!(eth2.contains("IPV6_AUTOCONF=yes\n"));
    assert!(!eth2.contains("DHCPV6C"));
}

#[test]
fn test_rhel_route_files() {
    let files = gen_rhel(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
    subnets:
      - type: static
        address: 10.0.0.2/24
        routes:
          - network: 192.168.0.0
            netmask: 255.255.0.0
            gateway: 10.0.0.1
            metric: 3
      - type: static6
        address: 2001:db8::2/64
        routes:
          - network: "2001:db8:1::"
            prefix: 48
            gateway: 2001:db8::1
  - type: route
    destination: 172.16.0.0/12
    gateway: 10.0.0.254
"#,
    );
    assert_eq!(
        rhel_file(&files, "route-eth0"),
        format!(
            "{HEADER}ADDRESS0=192.168.0.0\n\
            GATEWAY0=10.0.0.1\n\
            METRIC0=3\n\
            NETMASK0=255.255.0.0\n\
            ADDRESS1=172.16.0.0\n\
            GATEWAY1=10.0.0.254\n\
            NETMASK1=255.240.0.0\n"
        )
    );
    assert_eq!(
        rhel_file(&files, "route6-eth0"),
        format!("{HEADER}2001:db8:1::/48 via 2001:db8::1 dev eth0\n")
    );
}

#[test]
fn test_rhel_bond_bridge_vlan() {
    let files = gen_rhel(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
  - type: physical
    name: eth1
  - type: bond
    name: bond0
    mac_address: "aa:bb:cc:dd:ee:ff"
    bond_interfaces: [eth0, eth1]
    params:
      bond-mode: active-backup
      bond-miimon: 100
  - type: bridge
    name: br0
    bridge_interfaces: [bond0]
    params:
      bridge_stp: "off"
      bridge_fd: 4
      bridge_bridgeprio: 1000
    subnets:
      - type: dhcp4
  - type: vlan
    name: eth2.10
    vlan_link: eth2
    vlan_id: 10
"#,
    );
    let eth0 = rhel_file(&files, "ifcfg-eth0");
    assert!(eth0.contains("MASTER=bond0\n"));
    assert!(eth0.contains("SLAVE=yes\n"));
    let bond0 = rhel_file(&files, "ifcfg-bond0");
    assert!(bond0.contains("BONDING_MASTER=yes\n"));
    assert!(
        bond0.contains("BONDING_OPTS=\"miimon=100 mode=active-backup\"\n")
    );
    assert!(bond0.contains("MACADDR=aa:bb:cc:dd:ee:ff\n"));
    assert!(bond0.contains("TYPE=Bond\n"));
    assert!(bond0.contains("BRIDGE=br0\n"));
    let br0 = rhel_file(&files, "ifcfg-br0");
    assert!(br0.contains("BOOTPROTO=dhcp\n"));
    assert!(br0.contains("DELAY=4\n"));
    assert!(br0.contains("PRIO=1000\n"));
    assert!(br0.contains("STP=no\n"));
    assert!(br0.contains("TYPE=Bridge\n"));
    let vlan = rhel_file(&files, "ifcfg-eth2.10");
    assert!(vlan.contains("PHYSDEV=eth2\n"));
    assert!(vlan.contains("VLAN=yes\n"));
    assert!(!vlan.contains("TYPE="));
}

#[test]
fn test_rhel_dns_and_resolv_conf() {
    let files = gen_rhel(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
    subnets:
      - type: static
        address: 10.0.0.2/24
        dns_nameservers: [10.0.0.51, 10.0.0.52, 10.0.0.53, 10.0.0.54]
        dns_search: [a.example.com, b.example.com]
  - type: nameserver
    address: 8.8.8.8
"#,
    );
    let eth0 = rhel_file(&files, "ifcfg-eth0");
    assert!(eth0.contains("DNS1=10.0.0.51\nDNS2=10.0.0.52\nDNS3=10.0.0.53\n"));
    assert!(!eth0.contains("DNS4"));
    assert!(eth0.contains("DOMAIN=\"a.example.com b.example.com\"\n"));
    assert_eq!(
        find_file(&files, "etc/resolv.conf").content,
        "; Created by netcfg automatically, do not edit.\n\
        nameserver 8.8.8.8\n\
        nameserver 10.0.0.51\n\
        nameserver 10.0.0.52\n\
        nameserver 10.0.0.53\n\
        nameserver 10.0.0.54\n\
        search a.example.com b.example.com\n"
    );
}

#[test]
fn test_rhel_manual_control() {
    let files = gen_rhel(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
    subnets:
      - type: dhcp4
        control: manual
"#,
    );
    assert!(rhel_file(&files, "ifcfg-eth0").contains("ONBOOT=no\n"));
}

#[test]
fn test_suse_two_nics() {
    let files = gen_suse(TWO_NICS_V1);
    assert_eq!(
        suse_file(&files, "ifcfg-eth0"),
        format!(
            "{HEADER}BOOTPROTO=static\n\
            IPADDR=192.168.1.5\n\
            LLADDR=52:54:00:12:34:00\n\
            NETMASK=255.255.255.0\n\
            STARTMODE=auto\n"
        )
    );
    assert_eq!(
        suse_file(&files, "ifroute-eth0"),
        format!("{HEADER}default 192.168.1.254 - eth0\n")
    );
    assert!(suse_file(&files, "ifcfg-eth1").contains("BOOTPROTO=dhcp4\n"));
    assert!(!has_file(&files, "etc/sysconfig/network"));
}

#[test]
fn test_suse_addresses_and_bond() {
    let files = gen_suse(
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
    subnets:
      - type: static
        address: 10.0.0.2/24
      - type: static6
        address: 2001:db8::2/64
      - type: dhcp6
"#,
    );
    let eth0 = suse_file(&files, "ifcfg-eth0");
    assert!(eth0.contains("BOOTPROTO=none\n"));
    assert!(eth0.contains("STARTMODE=hotplug\n"));
    let bond0 = suse_file(&files, "ifcfg-bond0");
    assert!(bond0.contains("BONDING_MASTER=yes\n"));
    assert!(bond0.contains("BONDING_MODULE_OPTS=mode=802.3ad\n"));
    assert!(bond0.contains("BONDING_SLAVE_0=eth0\nBONDING_SLAVE_1=eth1\n"));
    assert!(bond0.contains("BOOTPROTO=dhcp6\n"));
    assert!(bond0.contains("DHCLIENT6_MODE=managed\n"));
    assert!(bond0.contains("IPADDR=10.0.0.2\n"));
    assert!(bond0.contains("IPADDR6_1=2001:db8::2/64\n"));
}
