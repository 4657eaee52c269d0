//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

use crate::capture::DEFAULT_TOOL;

#[derive(Parser, Debug)]
#[command(
    name = "linetrace",
    version,
    about = "Trace every source line executed in chosen kernel functions",
    after_help = "\
EXAMPLES:
    sudo linetrace -f vfs_read                        Record until Ctrl+C
    sudo linetrace -f tcp_sendmsg -f tcp_recvmsg      Several functions at once
    linetrace -f vfs_read --dry-run                   Print probe definitions only
    sudo linetrace -f vfs_read -- -o read.dat         Pass options to trace-cmd"
)]
pub struct Args {
    /// Kernel function to trace (repeatable)
    #[arg(short = 'f', long = "function", value_name = "NAME", required = true)]
    pub functions: Vec<String>,

    /// Kernel image with DWARF debug info (auto-detected if omitted)
    #[arg(long, value_name = "PATH")]
    pub vmlinux: Option<PathBuf>,

    /// Tracefs mount point (auto-detected if omitted)
    #[arg(long, value_name = "DIR")]
    pub tracefs: Option<PathBuf>,

    /// Capture tool to run while probes are live
    #[arg(long, default_value = DEFAULT_TOOL)]
    pub tool: String,

    /// Print probe definitions without installing them
    #[arg(long)]
    pub dry_run: bool,

    /// Print probes as JSON (with --dry-run)
    #[arg(long, requires = "dry_run")]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Extra arguments for the capture tool, after `--`
    #[arg(last = true, value_name = "TOOL_ARGS")]
    pub passthrough: Vec<String>,
}
