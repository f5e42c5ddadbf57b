//! Clap command tree definition

use clap::{Arg, ArgAction, Command};

/// Build the complete CLI command tree
pub fn build_cli() -> Command {
    Command::new("cadastre")
        .about("Cadastral record-lifecycle engine")
        .subcommand_required(true)
        .arg(
            Arg::new("data")
                .long("data")
                .help("Engine state file (default: registry.json)")
                .global(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Configuration file (default: cadastre.toml)")
                .global(true),
        )
        .arg(
            Arg::new("user")
                .long("user")
                .help("Editing user name (default: $USER)")
                .global(true),
        )
        .arg(
            Arg::new("report")
                .long("report")
                .help("Write the run report as JSON into the process shelf")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("validate")
                .about("Run the pre-flight checklist for a process")
                .arg(Arg::new("process").required(true).help("Process name, e.g. 15/2024")),
        )
        .subcommand(
            Command::new("open")
                .about("Open an edit session: branch, record, shelf entry")
                .arg(Arg::new("process").required(true).help("Process name")),
        )
        .subcommand(
            Command::new("pipeline")
                .about("Run the retire/create pipeline in the open session")
                .arg(Arg::new("process").required(true).help("Process name")),
        )
        .subcommand(
            Command::new("retire")
                .about("Retire eligible unsettled parcels per the configured policy")
                .arg(Arg::new("process").required(true).help("Process name")),
        )
        .subcommand(
            Command::new("update-attributes")
                .about("Recompute derived block stated areas from active parcels")
                .arg(
                    Arg::new("block")
                        .long("block")
                        .help("Single block key, e.g. 2069/0 (default: all active blocks)"),
                ),
        )
        .subcommand(
            Command::new("import-points")
                .about("Import border points from a JSON file into the open session")
                .arg(Arg::new("process").required(true).help("Process name"))
                .arg(
                    Arg::new("file")
                        .long("file")
                        .required(true)
                        .help("JSON array of staged points"),
                )
                .arg(
                    Arg::new("mode")
                        .long("mode")
                        .value_parser(["update", "create", "update-and-create"])
                        .default_value("update-and-create")
                        .help("What to do with matched and unmatched points"),
                )
                .arg(
                    Arg::new("tolerance")
                        .long("tolerance")
                        .value_parser(clap::value_parser!(f64))
                        .help("Matching tolerance in meters (default: from config)"),
                ),
        )
        .subcommand(
            Command::new("blocks-repair")
                .about("Rebuild block geometry from active parcels")
                .arg(Arg::new("process").required(true).help(
                    "Process whose record stamps any block retirement",
                ))
                .arg(
                    Arg::new("block")
                        .long("block")
                        .help("Single block key, e.g. 2069/0 (default: all touched blocks)"),
                )
                .arg(
                    Arg::new("independent")
                        .long("independent")
                        .help("Continue past per-block failures")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("close")
                .about("Finalize, reconcile/post and notify the case system")
                .arg(Arg::new("process").required(true).help("Process name")),
        )
}
