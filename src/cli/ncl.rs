// SPDX-License-Identifier: Apache-2.0

mod apply;
mod config;
mod error;
mod gen_conf;
mod query;
mod result;
mod state;

use env_logger::Builder;
use log::LevelFilter;

use crate::config::Config;
use crate::result::print_result_and_exit;

const APP_NAME: &str = "netcfgctl";

const SUB_CMD_GEN_CONF: &str = "gc";
const SUB_CMD_SHOW: &str = "show";
const SUB_CMD_RENDER: &str = "render";
const SUB_CMD_APPLY: &str = "apply";
const SUB_CMD_VERSION: &str = "version";

fn config_file_arg() -> clap::Arg<'static> {
    clap::Arg::new("CONFIG_FILE")
        .required(true)
        .index(1)
        .help("Network configuration file in v1 or v2 format, - for stdin")
}

fn renderer_arg() -> clap::Arg<'static> {
    clap::Arg::new("RENDERER")
        .short('r')
        .long("renderer")
        .takes_value(true)
        .help(
            "Renderer to use instead of the first available one: eni, \
            sysconfig, netplan, network-manager or networkd",
        )
}

fn target_root_arg() -> clap::Arg<'static> {
    clap::Arg::new("TARGET_ROOT")
        .short('t')
        .long("target")
        .takes_value(true)
        .help("Root folder of the system to configure")
}

fn main() {
    let matches = clap::Command::new(APP_NAME)
        .version(clap::crate_version!())
        .about("Render network configuration for the running OS")
        .subcommand_required(true)
        .arg(
            clap::Arg::new("verbose")
                .short('v')
                .multiple_occurrences(true)
                .help("Set verbose level")
                .global(true),
        )
        .arg(
            clap::Arg::new("quiet")
                .short('q')
                .help("Disable logging")
                .global(true),
        )
        .arg(
            clap::Arg::new("CONFIG")
                .short('c')
                .long("config")
                .takes_value(true)
                .help("Configuration file of netcfgctl")
                .global(true),
        )
        .subcommand(
            clap::Command::new(SUB_CMD_SHOW)
                .about("Show the interpreted network state")
                .arg(config_file_arg())
                .arg(
                    clap::Arg::new("JSON")
                        .long("json")
                        .takes_value(false)
                        .help("Show state in json format"),
                ),
        )
        .subcommand(
            clap::Command::new(SUB_CMD_GEN_CONF)
                .about("Generate OS configuration files without writing them")
                .arg(config_file_arg())
                .arg(renderer_arg()),
        )
        .subcommand(
            clap::Command::new(SUB_CMD_RENDER)
                .about("Write OS configuration files under target root")
                .arg(config_file_arg())
                .arg(renderer_arg())
                .arg(target_root_arg().required(true)),
        )
        .subcommand(
            clap::Command::new(SUB_CMD_APPLY)
                .about("Render network configuration and bring it up")
                .arg(config_file_arg())
                .arg(target_root_arg())
                .arg(
                    clap::Arg::new("NO_ACTIVATE")
                        .long("no-activate")
                        .takes_value(false)
                        .help("Only write files, do not bring interfaces up"),
                ),
        )
        .subcommand(
            clap::Command::new(SUB_CMD_VERSION).about("Show version"),
        )
        .get_matches();

    let (log_module_filters, log_level) =
        match matches.occurrences_of("verbose") {
            0 => (vec!["netcfg", "netcfgctl"], LevelFilter::Info),
            1 => (vec!["netcfg", "netcfgctl"], LevelFilter::Debug),
            _ => (vec![""], LevelFilter::Debug),
        };

    if !matches.is_present("quiet") {
        let mut log_builder = Builder::new();
        for log_module_filter in log_module_filters {
            if !log_module_filter.is_empty() {
                log_builder.filter(Some(log_module_filter), log_level);
            } else {
                log_builder.filter(None, log_level);
            }
        }
        log_builder.init();
    }

    let (sub_cmd, sub_matches) = match matches.subcommand() {
        Some(s) => s,
        None => return,
    };
    if sub_cmd == SUB_CMD_VERSION {
        print_result_and_exit(Ok(format!(
            "{} {}",
            APP_NAME,
            clap::crate_version!()
        )));
    }

    let config = match Config::load(
        sub_matches
            .value_of("CONFIG")
            .unwrap_or(Config::DEFAULT_CONFIG_PATH),
    ) {
        Ok(c) => c,
        Err(e) => print_result_and_exit(Err(e)),
    };

    print_result_and_exit(match sub_cmd {
        SUB_CMD_SHOW => query::show(sub_matches, &config),
        SUB_CMD_GEN_CONF => gen_conf::gen_conf(sub_matches, &config),
        SUB_CMD_RENDER => gen_conf::render(sub_matches, &config),
        SUB_CMD_APPLY => apply::apply(sub_matches, &config),
        _ => Err(format!("Unknown sub command {sub_cmd}").into()),
    });
}
