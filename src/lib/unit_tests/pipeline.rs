// SPDX-License-Identifier: Apache-2.0

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use serde_json::Value;

use crate::{
    apply_network_config, apply_network_config_with_probe,
    unit_tests::testlib::{FakeRunner, TWO_NICS_V1},
    ActivatorKind, ApplyOptions, ErrorKind, RendererKind, SystemProbe,
};

fn add_binary(root: &Path, name: &str) {
    let dir = root.join("usr/sbin");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, "#!/bin/sh\n").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .unwrap();
}

fn eni_root() -> tempfile::TempDir {
    let root = tempfile::tempdir().unwrap();
    for binary in ["ifup", "ifdown", "ifquery"] {
        add_binary(root.path(), binary);
    }
    std::fs::create_dir_all(root.path().join("etc/network")).unwrap();
    std::fs::write(root.path().join("etc/network/interfaces"), "").unwrap();
    root
}

fn opts_for(root: &Path) -> ApplyOptions {
    let mut opts = ApplyOptions::default();
    opts.target_root = root.to_path_buf();
    opts
}

fn two_nics() -> Value {
    serde_yaml::from_str(TWO_NICS_V1).unwrap()
}

#[test]
fn test_apply_eni_then_unchanged() {
    let root = eni_root();
    let opts = opts_for(root.path());
    let runner = FakeRunner::new();

    let probe = SystemProbe::with_path(root.path(), Vec::new());
    let result =
        apply_network_config_with_probe(&two_nics(), &opts, &probe, &runner)
            .unwrap();
    assert_eq!(result.renderer, RendererKind::Eni);
    assert!(result.changed);
    assert_eq!(result.activator, Some(ActivatorKind::Eni));
    assert!(result.all_up);
    assert_eq!(runner.calls(), vec!["ifup eth0", "ifup eth1"]);
    assert!(root
        .path()
        .join("etc/network/interfaces.d/50-cloud-init.cfg")
        .is_file());

    let probe = SystemProbe::with_path(root.path(), Vec::new());
    let result =
        apply_network_config_with_probe(&two_nics(), &opts, &probe, &runner)
            .unwrap();
    assert!(!result.changed);
    assert_eq!(result.activator, None);
    assert_eq!(runner.calls().len(), 2);
}

#[test]
fn test_apply_netplan_v2() {
    let root = tempfile::tempdir().unwrap();
    add_binary(root.path(), "netplan");
    let opts = opts_for(root.path());
    let runner = FakeRunner::new();
    let probe = SystemProbe::with_path(root.path(), Vec::new());
    let config: Value = serde_yaml::from_str(
        r#"---
network:
  version: 2
  wifis:
    wlan0:
      dhcp4: true
"#,
    )
    .unwrap();
    let result =
        apply_network_config_with_probe(&config, &opts, &probe, &runner)
            .unwrap();
    assert_eq!(result.renderer, RendererKind::Netplan);
    assert_eq!(result.activator, Some(ActivatorKind::Netplan));
    assert_eq!(runner.calls(), vec!["netplan apply"]);
    let content = std::fs::read_to_string(
        root.path().join("etc/netplan/50-cloud-init.yaml"),
    )
    .unwrap();
    assert!(content.contains("wlan0"));
}

#[test]
fn test_apply_without_activation() {
    let root = eni_root();
    let mut opts = opts_for(root.path());
    opts.activate = false;
    let runner = FakeRunner::new();
    let probe = SystemProbe::with_path(root.path(), Vec::new());
    let result =
        apply_network_config_with_probe(&two_nics(), &opts, &probe, &runner)
            .unwrap();
    assert!(result.changed);
    assert_eq!(result.activator, None);
    assert!(runner.calls().is_empty());
}

#[test]
fn test_apply_under_target_root_skips_activation() {
    let root = eni_root();
    let runner = FakeRunner::new();
    let result =
        apply_network_config(&two_nics(), &opts_for(root.path()), &runner)
            .unwrap();
    assert_eq!(result.renderer, RendererKind::Eni);
    assert!(result.changed);
    assert_eq!(result.activator, None);
    assert!(result.all_up);
    assert!(runner.calls().is_empty());
    assert!(root
        .path()
        .join("etc/network/interfaces.d/50-cloud-init.cfg")
        .is_file());
}

#[test]
fn test_apply_reports_failed_interfaces() {
    let root = eni_root();
    let opts = opts_for(root.path());
    let runner = FakeRunner::new().fail_on("ifup eth0", "link not ready");
    let probe = SystemProbe::with_path(root.path(), Vec::new());
    let result =
        apply_network_config_with_probe(&two_nics(), &opts, &probe, &runner)
            .unwrap();
    assert!(!result.all_up);
    assert_eq!(runner.calls(), vec!["ifup eth0", "ifup eth1"]);
}

#[test]
fn test_apply_no_renderer() {
    let root = tempfile::tempdir().unwrap();
    let opts = opts_for(root.path());
    let runner = FakeRunner::new();
    let probe = SystemProbe::with_path(root.path(), Vec::new());
    let e = apply_network_config_with_probe(&two_nics(), &opts, &probe, &runner)
        .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::RendererNotFound);
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}

#[test]
fn test_apply_invalid_config_writes_nothing() {
    let root = eni_root();
    let opts = opts_for(root.path());
    let runner = FakeRunner::new();
    let probe = SystemProbe::with_path(root.path(), Vec::new());
    let config: Value = serde_yaml::from_str(
        "version: 1\nconfig:\n  - type: tunnel\n    name: tun0\n",
    )
    .unwrap();
    let e = apply_network_config_with_probe(&config, &opts, &probe, &runner)
        .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::UnknownCommandType);
    assert!(!root.path().join("etc/network/interfaces.d").exists());
    assert!(runner.calls().is_empty());
}

#[test]
fn test_apply_no_activator() {
    let root = eni_root();
    let mut opts = opts_for(root.path());
    opts.activator_priority = vec![ActivatorKind::Netplan];
    let runner = FakeRunner::new();
    let probe = SystemProbe::with_path(root.path(), Vec::new());
    let e = apply_network_config_with_probe(&two_nics(), &opts, &probe, &runner)
        .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::NoActivator);
}

#[test]
fn test_apply_options_from_yaml() {
    let opts: ApplyOptions = serde_yaml::from_str(
        r#"---
target-root: /mnt/sysimage
renderer-priority: [netplan, networkd]
activate: false
parse:
  skip-broken: false
renderers:
  netplan:
    postcmds: true
"#,
    )
    .unwrap();
    assert_eq!(opts.target_root, Path::new("/mnt/sysimage"));
    assert_eq!(
        opts.renderer_priority,
        vec![RendererKind::Netplan, RendererKind::Networkd]
    );
    assert_eq!(
        opts.activator_priority,
        ActivatorKind::DEFAULT_PRIORITY.to_vec()
    );
    assert!(!opts.activate);
    assert!(!opts.parse.skip_broken);
    assert!(opts.renderers.netplan.postcmds);
    assert!(opts.renderers.netplan.clean_default);

    assert!(serde_yaml::from_str::<ApplyOptions>("render: [eni]\n").is_err());
}
