//! Godot exporter CLI entrypoint.
//!
//! Resolves configuration once, then either prints the plan (`--dry-run`),
//! reports cache status (`status`), or runs the export pipeline. Any failure
//! is printed as a single `[godot] export failed:` line with exit status 1.

use clap::Parser;
use godot_export::cli::{Cli, Command, ExportArgs};
use godot_export::config::{ExportConfig, RunFlags};
use godot_export::dirs::SystemBaseDirs;
use godot_export::download::Downloader;
use godot_export::error::Result;
use godot_export::output::Progress;
use godot_export::pipeline::{Pipeline, report_failure};
use godot_export::process::SystemCommandRunner;
use godot_export::status::run_status;
use std::io::Write;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.export_args());
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn init_logging(args: &ExportArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("godot_export={}", log_level(args))));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn log_level(args: &ExportArgs) -> &'static str {
    match (args.quiet, args.verbosity) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<()> {
    match &cli.command {
        Some(Command::Status(args)) => run_status(args, stdout),
        _ => run_export(cli.export_args(), stdout, stderr),
    }
}

fn run_export(args: &ExportArgs, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<()> {
    let flags = RunFlags {
        skip: args.skip,
        builtin_unzip: args.builtin_unzip,
        no_system_sync: args.no_system_sync,
        quiet: args.quiet,
    };
    let config = ExportConfig::resolve(&args.source, flags)?;
    let downloader = Downloader::from_env(config.max_redirects)?;
    let pipeline = Pipeline::new(&config, &downloader, &SystemCommandRunner, &SystemBaseDirs);

    if args.dry_run {
        return pipeline.describe(stdout);
    }
    pipeline.run(&mut Progress::new(stderr, config.quiet))?;
    Ok(())
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            report_failure(&err, stderr);
            1
        }
    }
}
