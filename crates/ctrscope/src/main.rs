#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;
use clap::error::ErrorKind;
use ctrscope::cli::app::{Cli, Command, RuntimeArgs};
use ctrscope::cli::commands;
use ctrscope::config::{RuntimePaths, bucket_config_path, load_bucket_config};
use ctrscope::models::QueryEnvelopeCommandFailure;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

const EXIT_SUCCESS: i32 = 0;
const EXIT_RUNTIME_FAILURE: i32 = 1;
const EXIT_USAGE_ERROR: i32 = 64;

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => return exit_code_for_parse_error(error),
    };
    init_tracing();
    let command_name = command_name(&cli.command);
    println!("ctrscope: starting `{command_name}`");

    match execute(cli) {
        Ok(()) => {
            println!("ctrscope: completed `{command_name}` (exit_code={EXIT_SUCCESS})");
            EXIT_SUCCESS
        }
        Err(error) => {
            if let Some(failure) = error.downcast_ref::<QueryEnvelopeCommandFailure>() {
                if let Err(emit_error) = failure.envelope().emit() {
                    eprintln!("{emit_error:#}");
                }
            }
            eprintln!("ctrscope: failed `{command_name}` (exit_code={EXIT_RUNTIME_FAILURE})");
            eprintln!("{error:#}");
            EXIT_RUNTIME_FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

fn execute(cli: Cli) -> Result<()> {
    let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
    match cli.command {
        Command::Load(args) => {
            let bucket_config = load_bucket_config(&bucket_config_path(&runtime_paths.cwd))?;
            commands::load::run(&args, &runtime_paths, bucket_config.as_ref())
        }
        Command::Visualize(args) => commands::visualize::run(&args, &runtime_paths),
        Command::Search(args) => commands::search::run(&args, &runtime_paths),
        Command::Export(args) => commands::export::run(&args, &runtime_paths),
        Command::Schema(args) => commands::schema::run(&args),
    }
}

fn exit_code_for_parse_error(error: clap::Error) -> i32 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = error.print();
            EXIT_SUCCESS
        }
        _ => {
            let _ = error.print();
            EXIT_USAGE_ERROR
        }
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Load(_) => "load",
        Command::Visualize(_) => "visualize",
        Command::Search(_) => "search",
        Command::Export(_) => "export",
        Command::Schema(_) => "schema",
    }
}

fn resolve_runtime_paths(args: &RuntimeArgs) -> Result<RuntimePaths> {
    let home_dir = match &args.home_dir {
        Some(path) => path.clone(),
        None => std::env::var_os("HOME")
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("HOME is not set; pass --home-dir"))?,
    };

    let cwd = match &args.cwd {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };

    ctrscope::config::resolve_runtime_paths(
        &home_dir,
        &cwd,
        args.data_dir.as_deref(),
        args.store_root.as_deref(),
    )
}
