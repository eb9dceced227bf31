// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use netcfg::{
    select_renderer, ParseOptions, RenderContext, RendererKind, SystemProbe,
    SystemRunner,
};

use crate::{config::Config, error::CliError, state::state_from_file};

fn file_path_of(matches: &clap::ArgMatches) -> Result<&str, CliError> {
    matches
        .value_of("CONFIG_FILE")
        .ok_or_else(|| "Please define the network configuration file".into())
}

// Renderer named on command line, or the first available one under root
fn pick_renderer(
    matches: &clap::ArgMatches,
    config: &Config,
    root: &Path,
) -> Result<RendererKind, CliError> {
    match matches.value_of("RENDERER") {
        Some(name) => Ok(name.parse::<RendererKind>()?),
        None => {
            let probe = SystemProbe::new(root);
            Ok(select_renderer(&config.renderer_priority()?, &probe)?)
        }
    }
}

fn parse_options_for(config: &Config, kind: RendererKind) -> ParseOptions {
    config
        .parse_options()
        .netplan_target(kind == RendererKind::Netplan)
}

/// Print the files a renderer would write, touching nothing.
pub(crate) fn gen_conf(
    matches: &clap::ArgMatches,
    config: &Config,
) -> Result<String, CliError> {
    let file_path = file_path_of(matches)?;
    let kind = pick_renderer(matches, config, Path::new("/"))?;
    let net_state =
        state_from_file(file_path, &parse_options_for(config, kind))?;
    let files = kind.build(&config.renderer_options()).gen_conf(&net_state)?;
    Ok(serde_yaml::to_string(&files)?)
}

/// Write rendered files under the target root without activating them.
pub(crate) fn render(
    matches: &clap::ArgMatches,
    config: &Config,
) -> Result<String, CliError> {
    let file_path = file_path_of(matches)?;
    let root = Path::new(matches.value_of("TARGET_ROOT").unwrap_or("/"));
    let kind = pick_renderer(matches, config, root)?;
    let net_state =
        state_from_file(file_path, &parse_options_for(config, kind))?;
    let runner = SystemRunner::new();
    let ctx = RenderContext::new(root, &runner);
    let changed = kind
        .build(&config.renderer_options())
        .render(&net_state, &ctx)?;
    Ok(format!(
        "{kind} configuration under {} {}",
        root.display(),
        if changed { "updated" } else { "unchanged" }
    ))
}
