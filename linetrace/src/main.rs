//! # linetrace - Main Entry Point
//!
//! ```text
//! vmlinux ──DWARF──▶ probe set ──▶ kprobe_events ──▶ trace-cmd record ──▶ teardown
//! ```
//!
//! With `--dry-run` the run stops after the probe set is printed.

use anyhow::{Context, Result};
use clap::Parser;
use log::warn;
use std::collections::{BTreeSet, HashSet};
use std::io::ErrorKind;
use std::path::Path;

use linetrace::capture::{
    eligible_noise, run_capture_session, CaptureStatus, SessionOutcome, TraceCmd,
};
use linetrace::cli::Args;
use linetrace::config::Config;
use linetrace::debuginfo::DwarfDebugInfo;
use linetrace::domain::{ProbeDescriptor, SessionError};
use linetrace::interrupt::InterruptHandler;
use linetrace::kernel::read_eligible_functions;
use linetrace::preflight::run_preflight_checks;
use linetrace::probes::build_probe_set;
use linetrace::session::{ProbeSession, Tracefs};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_NOPERM: i32 = 77;

fn main() {
    // Usage errors exit with 2 from inside clap
    let args = Args::parse();
    init_logging(args.verbose);

    std::process::exit(match run(args) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(SessionError::ControlUnavailable { source, .. }) =
        err.downcast_ref::<SessionError>()
    {
        if source.kind() == ErrorKind::PermissionDenied {
            return EXIT_NOPERM;
        }
    }
    let msg = err.to_string().to_lowercase();
    if msg.contains("permission denied") || msg.contains("requires root") {
        EXIT_NOPERM
    } else {
        EXIT_ERROR
    }
}

fn run(args: Args) -> Result<()> {
    let config = Config::from_args(args)?;
    run_preflight_checks(&config)?;

    if !config.quiet {
        eprintln!("linetrace v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("vmlinux: {}", config.vmlinux.display());
    }

    // The decoded image is dropped here, before any probe goes live
    let probes = {
        let debug_info = DwarfDebugInfo::from_path(&config.vmlinux).with_context(|| {
            format!("Failed to load debug info from {}", config.vmlinux.display())
        })?;
        build_probe_set(&debug_info, &config.functions)?
    };

    if !config.quiet {
        let functions: BTreeSet<&str> =
            probes.iter().map(|p| p.function_name.as_str()).collect();
        eprintln!("probes: {} in {} functions", probes.len(), functions.len());
    }

    if config.dry_run {
        return print_probes(&probes, config.json);
    }

    let tracefs = config.tracefs.as_deref().context("No tracefs mount found")?;
    let eligible = read_eligible_functions(tracefs).unwrap_or_else(|e| {
        warn!("Cannot read available_filter_functions, not excluding interrupt noise: {e}");
        HashSet::new()
    });
    let noise = eligible_noise(&config.arch, &eligible);

    // From here on Ctrl+C must end in teardown, not in the default SIGINT action
    let interrupts = InterruptHandler::install().context("Failed to install the Ctrl+C handler")?;

    let control = Tracefs::open(tracefs)?;
    let total = probes.len();
    let (session, report) =
        ProbeSession::install_until(control, probes, || interrupts.is_interrupted());
    if !config.quiet {
        eprintln!(
            "installed: {}/{total} ({} rejected by the kernel)",
            report.installed,
            report.rejected.len()
        );
    }
    if session.installed().is_empty() && !report.interrupted {
        return Err(SessionError::NoProbesInstalled.into());
    }

    if !config.quiet && !report.interrupted {
        eprintln!("recording with {} (Ctrl+C to stop)", config.tool);
    }
    let mut runner = TraceCmd::new(
        config.tool.clone(),
        noise,
        config.passthrough.clone(),
        &interrupts,
    );
    let outcome = run_capture_session(session, &mut runner, &interrupts.interrupt());

    finish(outcome, tracefs, config.quiet)
}

fn print_probes(probes: &[ProbeDescriptor], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(probes)?);
    } else {
        for probe in probes {
            println!("{}", probe.definition());
        }
    }
    Ok(())
}

fn finish(outcome: SessionOutcome, tracefs: &Path, quiet: bool) -> Result<()> {
    if !outcome.enable_failures.is_empty() {
        eprintln!("warning: {} probes could not be enabled", outcome.enable_failures.len());
    }

    let removal_failures = outcome.teardown.remove_failures.len();
    if removal_failures > 0 {
        eprintln!("warning: {removal_failures} probes are still defined; remove them with:");
        for failure in &outcome.teardown.remove_failures {
            eprintln!(
                "    echo '-:{}' >> {}",
                failure.identifier,
                tracefs.join("kprobe_events").display()
            );
        }
    } else if !quiet {
        eprintln!("removed: {} probes", outcome.teardown.removed);
    }

    match outcome.capture? {
        CaptureStatus::Completed => {}
        CaptureStatus::Interrupted => {
            if !quiet {
                eprintln!("capture interrupted");
            }
        }
    }

    if removal_failures > 0 {
        anyhow::bail!("Failed to remove {removal_failures} probes");
    }
    Ok(())
}
