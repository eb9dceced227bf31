// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    parse_net_config, select_activator, select_renderer, ActivatorKind,
    CommandRunner, NetCfgError, ParseOptions, RenderContext, RendererKind,
    RendererOptions, SystemProbe,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
#[non_exhaustive]
pub struct ApplyOptions {
    pub target_root: PathBuf,
    pub parse: ParseOptions,
    pub renderer_priority: Vec<RendererKind>,
    pub activator_priority: Vec<ActivatorKind>,
    pub renderers: RendererOptions,
    /// Bring interfaces up after files changed.
    pub activate: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            target_root: PathBuf::from("/"),
            parse: ParseOptions::default(),
            renderer_priority: RendererKind::DEFAULT_PRIORITY.to_vec(),
            activator_priority: ActivatorKind::DEFAULT_PRIORITY.to_vec(),
            renderers: RendererOptions::default(),
            activate: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct ApplyResult {
    pub renderer: RendererKind,
    /// Whether any rendered file changed.
    pub changed: bool,
    /// `None` when activation was skipped.
    pub activator: Option<ActivatorKind>,
    /// Whether every interface came up, `true` when activation was skipped.
    pub all_up: bool,
}

/// Parse, render with the first available renderer and, when some file
/// changed, bring every interface up with the first available activator.
///
/// Activation only happens when the target root is `/`: activators act on
/// the running system, not on the tree under the target root.
pub fn apply_network_config(
    config: &Value,
    opts: &ApplyOptions,
    runner: &dyn CommandRunner,
) -> Result<ApplyResult, NetCfgError> {
    let probe = SystemProbe::new(&opts.target_root);
    if opts.activate && opts.target_root != Path::new("/") {
        log::info!(
            "Target root {} is not the running system, files will be \
            written without activation",
            opts.target_root.display()
        );
        let mut opts = opts.clone();
        opts.activate = false;
        return apply_network_config_with_probe(config, &opts, &probe, runner);
    }
    apply_network_config_with_probe(config, opts, &probe, runner)
}

/// Same as [apply_network_config] with caller provided probe. The
/// activation step runs whatever the target root is, through the given
/// runner.
pub fn apply_network_config_with_probe(
    config: &Value,
    opts: &ApplyOptions,
    probe: &SystemProbe,
    runner: &dyn CommandRunner,
) -> Result<ApplyResult, NetCfgError> {
    let renderer_kind = select_renderer(&opts.renderer_priority, probe)?;
    let parse_opts = opts
        .parse
        .clone()
        .netplan_target(renderer_kind == RendererKind::Netplan);
    let state = parse_net_config(config, &parse_opts)?;

    let renderer = renderer_kind.build(&opts.renderers);
    let ctx = RenderContext::new(&opts.target_root, runner);
    let changed = renderer.render(&state, &ctx)?;

    let mut ret = ApplyResult {
        renderer: renderer_kind,
        changed,
        activator: None,
        all_up: true,
    };
    if !opts.activate {
        log::info!("Activation disabled, not bringing up interfaces");
        return Ok(ret);
    }
    if !changed {
        log::info!("Network configuration unchanged, skipping activation");
        return Ok(ret);
    }
    let activator_kind = select_activator(&opts.activator_priority, probe)?;
    let activator = activator_kind.build(runner, &opts.renderers);
    ret.activator = Some(activator_kind);
    ret.all_up = activator.bring_up_all_interfaces(&state);
    if !ret.all_up {
        log::warn!("Some interfaces failed to come up");
    }
    Ok(ret)
}
