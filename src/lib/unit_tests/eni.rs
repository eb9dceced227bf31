// SPDX-License-Identifier: Apache-2.0

use crate::{
    unit_tests::testlib::{
        find_file, has_file, parse_yaml, TWO_GATEWAYS_V1, TWO_NICS_V1,
    },
    EniOptions, EniRenderer, RenderedFile, Renderer,
};

const ENI_PATH: &str = "etc/network/interfaces.d/50-cloud-init.cfg";
const RULES_PATH: &str = "etc/udev/rules.d/70-persistent-net.rules";

fn gen_eni(content: &str) -> Vec<RenderedFile> {
    EniRenderer::default().gen_conf(&parse_yaml(content)).unwrap()
}

fn eni_content(content: &str) -> String {
    find_file(&gen_eni(content), ENI_PATH).content.clone()
}

#[test]
fn test_eni_two_nics() {
    let files = gen_eni(TWO_NICS_V1);
    assert_eq!(
        find_file(&files, ENI_PATH).content,
        "auto lo\n\
        iface lo inet loopback\n\
        \n\
        auto eth0\n\
        iface eth0 inet static\n \
        address 192.168.1.5\n \
        netmask 255.255.255.0\n \
        gateway 192.168.1.254\n\
        \n\
        auto eth1\n\
        iface eth1 inet dhcp\n"
    );
    assert_eq!(
        find_file(&files, RULES_PATH).content,
        "SUBSYSTEM==\"net\", ACTION==\"add\", DRIVERS==\"?*\", \
        ATTR{address}==\"52:54:00:12:34:00\", NAME=\"eth0\"\n\
        SUBSYSTEM==\"net\", ACTION==\"add\", DRIVERS==\"?*\", \
        ATTR{address}==\"52:54:00:12:34:01\", NAME=\"eth1\"\n"
    );
    assert_eq!(find_file(&files, ENI_PATH).mode, 0o644);
}

#[test]
fn test_eni_no_rules_without_mac() {
    let files = gen_eni(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
    subnets:
      - type: dhcp
"#,
    );
    assert!(!has_file(&files, RULES_PATH));
}

#[test]
fn test_eni_header_and_custom_path() {
    let opts: EniOptions = serde_yaml::from_str(
        r##"---
eni_path: etc/network/interfaces
eni_header: "# generated"
netrules_path: null
"##,
    )
    .unwrap();
    let files = EniRenderer::new(opts)
        .gen_conf(&parse_yaml(TWO_NICS_V1))
        .unwrap();
    assert_eq!(files.len(), 1);
    assert!(find_file(&files, "etc/network/interfaces")
        .content
        .starts_with("# generated\n\nauto lo\n"));
}

#[test]
fn test_eni_control_and_aliases() {
    let content = eni_content(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
    subnets:
      - type: static
        address: 10.0.0.2/24
        control: manual
        metric: 10
      - type: static6
        address: 2001:db8::2/64
      - type: ipv6_slaac
  - type: physical
    name: eth1
    subnets:
      - type: dhcp6
        control: hotplug
"#,
    );
    assert!(content.contains(
        "# control-manual eth0\n\
        iface eth0 inet static\n \
        address 10.0.0.2\n \
        netmask 255.255.255.0\n \
        metric 10\n"
    ));
    assert!(content.contains(
        "# control-alias eth0\n\
        iface eth0 inet6 static\n \
        address 2001:db8::2/64\n"
    ));
    assert!(content.contains(
        "# control-alias eth0\niface eth0 inet6 auto\n dhcp 0\n"
    ));
    assert!(content.contains("allow-hotplug eth1\niface eth1 inet6 dhcp\n"));
}

#[test]
fn test_eni_bond() {
    let content = eni_content(
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
    subnets:
      - type: dhcp4
"#,
    );
    assert!(content.contains(
        "auto eth0\niface eth0 inet manual\n bond-master bond0\n"
    ));
    assert!(content.contains(
        "auto bond0\n\
        iface bond0 inet dhcp\n \
        bond-miimon 100\n \
        bond-mode active-backup\n \
        bond-slaves none\n \
        hwaddress aa:bb:cc:dd:ee:ff\n"
    ));
}

#[test]
fn test_eni_bridge_and_vlan() {
    let content = eni_content(
        r#"---
version: 1
config:
  - type: physical
    name: eth0
  - type: vlan
    name: eth0.100
    vlan_link: eth0
    vlan_id: 100
    subnets:
      - type: static
        address: 10.100.0.2/24
  - type: bridge
    name: br0
    bridge_interfaces: [eth1]
    params:
      bridge_stp: "on"
      bridge_pathcost: eth1 50
"#,
    );
    assert!(content.contains(
        "iface eth0.100 inet static\n \
        address 10.100.0.2\n \
        netmask 255.255.255.0\n \
        vlan-raw-device eth0\n \
        vlan_id 100\n"
    ));
    assert!(content.contains(
        "iface br0 inet manual\n \
        bridge_pathcost eth1 50\n \
        bridge_ports eth1\n \
        bridge_stp on\n"
    ));
    // Lower devices are declared first
    let eth1_pos = content.find("iface eth1 ").unwrap();
    let br0_pos = content.find("iface br0 ").unwrap();
    let vlan_pos = content.find("iface eth0.100 ").unwrap();
    assert!(eth1_pos < br0_pos);
    assert!(br0_pos < vlan_pos);
}

#[test]
fn test_eni_routes() {
    let content = eni_content(
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
  - type: route
    destination: 0.0.0.0/0
    gateway: 10.0.0.254
  - type: route
    destination: 2001:db8:1::/48
    gateway: 2001:db8::1
"#,
    );
    assert!(content.contains(
        " post-up route add -net 192.168.0.0 netmask 255.255.0.0 \
        gw 10.0.0.1 metric 3 || true\n \
        pre-down route del -net 192.168.0.0 netmask 255.255.0.0 \
        gw 10.0.0.1 metric 3 || true\n"
    ));
    assert!(content.contains(
        " post-up route add default gw 10.0.0.254 || true\n"
    ));
    // No interface holds the IPv6 gateway, route goes last without indent
    assert!(content.ends_with(
        "\n\npost-up route add -A inet6 2001:db8:1::/48 \
        gw 2001:db8::1 || true\n\
        pre-down route del -A inet6 2001:db8:1::/48 \
        gw 2001:db8::1 || true\n"
    ));
}

#[test]
fn test_eni_global_dns_on_loopback() {
    let content = eni_content(
        r#"---
version: 1
config:
  - type: nameserver
    address: [8.8.8.8, 1.1.1.1]
    search: [example.com]
"#,
    );
    assert_eq!(
        content,
        "auto lo\n\
        iface lo inet loopback\n \
        dns-nameservers 8.8.8.8 1.1.1.1\n \
        dns-search example.com\n"
    );
}

#[test]
fn test_eni_single_default_gateway() {
    let content = eni_content(TWO_GATEWAYS_V1);
    assert!(content.contains(
        "iface eth0 inet static\n \
        address 10.0.0.2\n \
        netmask 255.255.255.0\n \
        gateway 10.0.0.1\n"
    ));
    assert!(content.contains(
        "iface eth1 inet static\n \
        address 10.1.0.2\n \
        netmask 255.255.255.0\n"
    ));
    assert!(!content.contains("gateway 10.1.0.1"));
}

#[test]
fn test_eni_explicit_default_route_wins_over_gateway() {
    let content = eni_content(
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
        routes:
          - network: 0.0.0.0
            netmask: 0.0.0.0
            gateway: 10.1.0.1
"#,
    );
    assert!(!content.contains("gateway 10.0.0.1"));
    assert!(content.contains(" post-up route add default gw 10.1.0.1"));
}
