// SPDX-License-Identifier: Apache-2.0

use crate::{
    unit_tests::testlib::{parse_yaml, FakeRunner},
    Activator, ActivatorKind, ErrorKind, IfUpDownActivator, NetplanActivator,
    NetworkManagerActivator, NetworkdActivator, RendererOptions,
};

const BOND_V1: &str = r#"---
version: 1
config:
  - type: bond
    name: bond0
    bond_interfaces: [eth1, eth0]
    subnets:
      - type: dhcp4
  - type: physical
    name: eth0
  - type: physical
    name: eth1
"#;

#[test]
fn test_netplan_apply_once() {
    let runner = FakeRunner::new();
    let activator = NetplanActivator::new(&runner);
    assert!(activator.bring_up_interfaces(&["eth0", "eth1"]));
    assert!(activator.bring_up_all_interfaces(&parse_yaml(BOND_V1)));
    assert_eq!(runner.calls(), vec!["netplan apply", "netplan apply"]);
}

#[test]
fn test_netplan_apply_failure() {
    let runner = FakeRunner::new().fail_on("netplan apply", "broken");
    assert!(!NetplanActivator::new(&runner).bring_up_interfaces(&["eth0"]));
}

#[test]
fn test_already_up_is_success() {
    let runner = FakeRunner::new().fail_on("ifup eth0", "eth0: Already Up");
    let activator = IfUpDownActivator::new(&runner);
    assert!(activator.bring_up_interface("eth0").is_ok());
}

#[test]
fn test_failure_does_not_stop_others() {
    let runner = FakeRunner::new().fail_on("ifup eth0", "no such device");
    let activator = IfUpDownActivator::new(&runner);
    let e = activator.bring_up_interface("eth0").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::ExecutionError);

    assert!(!activator.bring_up_all_interfaces(&parse_yaml(BOND_V1)));
    // Lower devices first
    assert_eq!(
        runner.calls(),
        vec!["ifup eth0", "ifup eth0", "ifup eth1", "ifup bond0"]
    );
}

#[test]
fn test_bring_down() {
    let runner = FakeRunner::new();
    assert!(IfUpDownActivator::new(&runner)
        .bring_down_all_interfaces(&parse_yaml(BOND_V1)));
    assert!(NetplanActivator::new(&runner).bring_down_interfaces(&["eth0"]));
    assert!(NetworkManagerActivator::new(
        &runner,
        "etc/NetworkManager/system-connections"
    )
    .bring_down_interfaces(&["eth1"]));
    assert_eq!(
        runner.calls(),
        vec![
            "ifdown eth0",
            "ifdown eth1",
            "ifdown bond0",
            "ip link set dev eth0 down",
            "nmcli device disconnect eth1",
        ]
    );
}

#[test]
fn test_nm_activate_by_file() {
    let runner = FakeRunner::new();
    let activator = NetworkManagerActivator::new(
        &runner,
        "etc/NetworkManager/system-connections",
    );
    activator.bring_up_interface("eth0").unwrap();
    assert_eq!(
        runner.calls(),
        vec![
            "nmcli connection load /etc/NetworkManager/system-connections/\
            cloud-init-eth0.nmconnection",
            "nmcli connection up filename /etc/NetworkManager/\
            system-connections/cloud-init-eth0.nmconnection",
        ]
    );
}

#[test]
fn test_nm_activate_fallback_to_ifname() {
    let runner =
        FakeRunner::new().fail_on("nmcli connection load", "unknown file");
    let activator = NetworkManagerActivator::new(&runner, "/run/nm");
    activator.bring_up_interface("eth0").unwrap();
    assert_eq!(
        runner.calls(),
        vec![
            "nmcli connection load /run/nm/cloud-init-eth0.nmconnection",
            "nmcli connection reload",
            "nmcli connection up ifname eth0",
        ]
    );
}

#[test]
fn test_networkd_restart_all() {
    let runner = FakeRunner::new();
    let activator = NetworkdActivator::new(&runner);
    assert!(activator.bring_up_all_interfaces(&parse_yaml(BOND_V1)));
    assert!(activator.bring_up_interfaces(&["eth0"]));
    assert_eq!(
        runner.calls(),
        vec![
            "systemctl restart systemd-networkd systemd-resolved",
            "ip link set dev eth0 up",
        ]
    );
}

#[test]
fn test_build_activator() {
    let runner = FakeRunner::new();
    let opts = RendererOptions::default();
    for kind in ActivatorKind::DEFAULT_PRIORITY {
        assert_eq!(kind.build(&runner, &opts).kind(), kind);
    }
}
