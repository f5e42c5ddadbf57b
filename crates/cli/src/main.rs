//! `cadastre` — CLI over the cadastral record-lifecycle engine
//!
//! One subcommand per top-level operation: validate, open, pipeline,
//! retire, update-attributes, import-points, blocks-repair, close.
//! Engine state persists between invocations in a JSON file (`--data`);
//! per-process identity lives in the shelf under the configured library
//! directory.

mod commands;
mod format;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use tracing::error;

use cadastre_core::{BlockKey, Error as CoreError, InProcessPoint, ProcessName};
use cadastre_engine::{
    import_points, reconcile_block, refresh_stated_area, sweep_unsettled, validate_pipeline,
    BlockOutcome, Config, EditSession, ImportMode, Notifier, RecordContext, RecordingTransport,
};
use cadastre_store::{BranchEngine, Dataset, EngineState};

use format::{format_import, format_pipeline, format_reconcile, format_validation};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    match run() {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("{e:#}");
            eprintln!("error: {e:#}");
            process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let matches = commands::build_cli().get_matches();
    let (sub, sub_m) = matches
        .subcommand()
        .context("a subcommand is required")?;

    let data_path = PathBuf::from(
        sub_m
            .get_one::<String>("data")
            .map(String::as_str)
            .unwrap_or("registry.json"),
    );
    let config_path = PathBuf::from(
        sub_m
            .get_one::<String>("config")
            .map(String::as_str)
            .unwrap_or("cadastre.toml"),
    );
    let config = Config::load_or_default(&config_path)?;
    let user = sub_m
        .get_one::<String>("user")
        .cloned()
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_else(|| "operator".to_string());

    let engine = load_engine(&data_path)?;
    let code = dispatch(sub, sub_m, &engine, &config, &user)?;
    save_engine(&engine, &data_path)?;
    Ok(code)
}

fn dispatch(
    sub: &str,
    m: &ArgMatches,
    engine: &BranchEngine,
    config: &Config,
    user: &str,
) -> Result<i32> {
    match sub {
        "validate" => {
            let name = process_arg(m)?;
            let report = engine.with_baseline(|ds| validate_pipeline(ds, &name));
            print!("{}", format_validation(&report));
            Ok(if report.is_valid() { 0 } else { 2 })
        }
        "open" => {
            let name = process_arg(m)?;
            let session = EditSession::open(engine, config, &name, user)?;
            println!(
                "process {name} open in branch {} (record {})",
                session.branch(),
                session.record_id()
            );
            Ok(0)
        }
        "pipeline" => {
            let name = process_arg(m)?;
            let session = EditSession::open(engine, config, &name, user)?;
            let report = session.run_pipeline(engine, config)?;
            print!("{}", format_pipeline(&report));
            if m.get_flag("report") {
                let path = write_report(config, &name, &report)?;
                println!("report written to {}", path.display());
            }
            Ok(if report.is_fatal() { 3 } else { 0 })
        }
        "retire" => {
            let name = process_arg(m)?;
            let session = EditSession::open(engine, config, &name, user)?;
            let record_id = session.record_id();
            let branch = session.branch().to_string();
            let policy = config.retirement_policy;
            let pname = name.clone();
            let count = engine.with_branch_mut(session.branch(), move |ds| {
                let process = ds
                    .processes_named(&pname)
                    .first()
                    .map(|p| (*p).clone())
                    .ok_or_else(|| CoreError::ProcessNotFound(pname.clone()))?;
                let ctx = RecordContext {
                    record_id,
                    process,
                    branch,
                };
                Ok::<_, CoreError>(sweep_unsettled(ds, &ctx, policy))
            })??;
            println!("{count} unsettled parcel(s) retired in branch {}", session.branch());
            Ok(0)
        }
        "update-attributes" => {
            let keys = block_keys(m, engine)?;
            let count = engine.with_baseline_mut(|ds| {
                keys.iter()
                    .filter(|key| refresh_stated_area(ds, key).is_some())
                    .count()
            });
            println!("stated area refreshed on {count} block(s)");
            Ok(0)
        }
        "blocks-repair" => {
            let name = process_arg(m)?;
            let independent = m.get_flag("independent");
            let record_id = engine
                .with_baseline(|ds| ds.record_named(&name).map(|r| r.id))
                .ok_or_else(|| {
                    anyhow::anyhow!("process {name} has no record; open it first")
                })?;
            let cancel = engine.with_baseline(|ds| {
                ds.processes_named(&name)
                    .first()
                    .map(|p| p.process_type.cancel_type())
                    .ok_or_else(|| CoreError::ProcessNotFound(name.clone()))
            })?;
            let keys = block_keys(m, engine)?;
            let mut failures = Vec::new();
            engine.with_baseline_mut(|ds| {
                for key in &keys {
                    match reconcile_block(ds, key, record_id, cancel) {
                        BlockOutcome::Updated | BlockOutcome::RetiredNoActiveParcels => {}
                        outcome => {
                            failures.push(format!("{key}: {outcome:?}"));
                            if !independent {
                                break;
                            }
                        }
                    }
                }
            });
            for f in &failures {
                eprintln!("block repair failed: {f}");
            }
            println!("{} block(s) repaired", keys.len() - failures.len());
            Ok(if failures.is_empty() { 0 } else { 2 })
        }
        "import-points" => {
            let name = process_arg(m)?;
            let file = m
                .get_one::<String>("file")
                .context("--file is required")?;
            let incoming: Vec<InProcessPoint> = serde_json::from_str(
                &fs::read_to_string(file).with_context(|| format!("reading {file}"))?,
            )
            .with_context(|| format!("parsing {file}"))?;
            let tolerance = m
                .get_one::<f64>("tolerance")
                .copied()
                .unwrap_or(config.point_tolerance_m);
            let mode = match m.get_one::<String>("mode").map(String::as_str) {
                Some("update") => ImportMode::UpdateMatched,
                Some("create") => ImportMode::CreateUnmatched,
                _ => ImportMode::UpdateAndCreate,
            };
            let session = EditSession::open(engine, config, &name, user)?;
            let record_id = session.record_id();
            let create = engine.with_baseline(|ds| {
                ds.processes_named(&name)
                    .first()
                    .map(|p| p.process_type.create_type())
                    .ok_or_else(|| CoreError::ProcessNotFound(name.clone()))
            })?;
            let report = engine.with_branch_mut(session.branch(), |ds| {
                import_points(ds, &incoming, tolerance, mode, record_id, create)
            })?;
            print!("{}", format_import(&report));
            Ok(if report.matching.conflicts.is_empty() { 0 } else { 2 })
        }
        "close" => {
            let name = process_arg(m)?;
            let mut session = EditSession::open(engine, config, &name, user)?;
            let report = session.close(engine, config)?;
            print!("{}", format_reconcile(&report));
            let notifier = Notifier::new(config.cms_base_url.clone(), RecordingTransport::new());
            let outcome = engine.with_baseline(|ds| {
                ds.processes_named(&name)
                    .first()
                    .map(|p| notifier.notify(p, p.status))
            });
            match outcome {
                Some(o) => println!("case system: {o:?}"),
                None => eprintln!("process row missing after post; case system not notified"),
            }
            Ok(0)
        }
        other => bail!("unknown subcommand {other:?}"),
    }
}

fn process_arg(m: &ArgMatches) -> Result<ProcessName> {
    let raw = m
        .get_one::<String>("process")
        .context("a process name is required")?;
    Ok(ProcessName::parse(raw)?)
}

/// Block keys from `--block`, or every block in the baseline
fn block_keys(m: &ArgMatches, engine: &BranchEngine) -> Result<Vec<BlockKey>> {
    if let Some(raw) = m.get_one::<String>("block") {
        let parsed = ProcessName::parse(raw)
            .map_err(|_| anyhow::anyhow!("--block expects <block>/<subblock>, got {raw:?}"))?;
        return Ok(vec![BlockKey::new(parsed.first(), parsed.second())]);
    }
    Ok(engine.with_baseline(|ds| {
        ds.blocks
            .iter()
            .filter(|(_, b)| b.is_active())
            .map(|(_, b)| b.key)
            .collect()
    }))
}

fn load_engine(path: &Path) -> Result<BranchEngine> {
    if !path.exists() {
        return Ok(BranchEngine::new(Dataset::new()));
    }
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let state: EngineState =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok(BranchEngine::from_state(state))
}

fn save_engine(engine: &BranchEngine, path: &Path) -> Result<()> {
    let text = serde_json::to_string_pretty(&engine.to_state())?;
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Write the pipeline report into the process shelf as JSON
fn write_report(
    config: &Config,
    name: &ProcessName,
    report: &cadastre_engine::PipelineReport,
) -> Result<PathBuf> {
    let dir = config.library_dir.join(name.sanitized());
    fs::create_dir_all(&dir)?;
    let path = dir.join("report.json");
    fs::write(&path, serde_json::to_string_pretty(report)?)?;
    Ok(path)
}
