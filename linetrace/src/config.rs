//! Resolved run configuration

use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::cli::Args;
use crate::kernel;

/// Everything a run needs, with defaults and kernel paths resolved
#[derive(Debug, Clone)]
pub struct Config {
    pub functions: Vec<String>,
    pub vmlinux: PathBuf,
    /// `None` only when no tracefs mount was found; fatal unless dry-running
    pub tracefs: Option<PathBuf>,
    pub tool: String,
    pub arch: String,
    pub dry_run: bool,
    pub json: bool,
    pub quiet: bool,
    pub passthrough: Vec<String>,
}

impl Config {
    /// Resolve CLI arguments against the running kernel
    ///
    /// # Errors
    /// Returns an error if `--vmlinux` was omitted and no debug image is
    /// installed for the running kernel
    pub fn from_args(args: Args) -> Result<Self> {
        let Some(vmlinux) = args.vmlinux.or_else(kernel::locate_vmlinux) else {
            let release = kernel::kernel_release().unwrap_or_else(|_| "<unknown>".to_string());
            bail!(
                "No kernel debug image found for {release}.\n\n\
                 Install your distribution's kernel debug symbols package,\n\
                 or pass the image explicitly: linetrace --vmlinux /path/to/vmlinux ..."
            );
        };
        let tracefs = args.tracefs.or_else(kernel::locate_tracefs);

        Ok(Self {
            functions: args.functions,
            vmlinux,
            tracefs,
            tool: args.tool,
            arch: std::env::consts::ARCH.to_string(),
            dry_run: args.dry_run,
            json: args.json,
            quiet: args.quiet,
            passthrough: args.passthrough,
        })
    }
}
