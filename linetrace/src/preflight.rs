//! Pre-flight checks for linetrace
//!
//! Validates system requirements before any probe is defined, with clear,
//! actionable messages when they aren't met.

#![allow(unsafe_code)] // geteuid() requires unsafe

use anyhow::{bail, Context, Result};
use object::read::ReadCache;
use object::{Object, ObjectSection};
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::config::Config;

/// Run every check that applies to this configuration
///
/// A dry run only reads the debug image, so it needs neither root nor tracefs.
///
/// # Errors
/// Returns the first unmet requirement
pub fn run_preflight_checks(config: &Config) -> Result<()> {
    check_debug_image(&config.vmlinux)?;
    if !config.dry_run {
        check_privileges()?;
        check_tracefs(config.tracefs.as_deref())?;
    }
    Ok(())
}

/// Defining kprobes requires root
fn check_privileges() -> Result<()> {
    if unsafe { libc::geteuid() } == 0 {
        return Ok(());
    }

    bail!(
        "Permission denied: linetrace requires root privileges to define kprobes.\n\n\
         Run with: sudo linetrace ...\n\
         Or list the probes without installing them: linetrace --dry-run ..."
    );
}

/// Tracefs must be mounted and expose the kprobe interface
fn check_tracefs(tracefs: Option<&Path>) -> Result<PathBuf> {
    let Some(root) = tracefs else {
        bail!(
            "No tracefs mount found.\n\n\
             Mount it with: mount -t tracefs nodev /sys/kernel/tracing\n\
             or pass its location with --tracefs"
        );
    };
    if !root.join("kprobe_events").exists() {
        bail!(
            "{} has no kprobe_events.\n\n\
             Is this a tracefs mount? Is the kernel built with CONFIG_KPROBE_EVENTS?",
            root.display()
        );
    }
    Ok(root.to_path_buf())
}

/// The image must be a readable file carrying DWARF
fn check_debug_image(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!(
            "Kernel image not found: {}\n\n\
             Make sure the path is correct and the kernel debug symbols are installed.",
            path.display()
        );
    }
    if !path.is_file() {
        bail!(
            "Not a file: {}\n\n\
             --vmlinux must point to an uncompressed kernel image, not a directory.",
            path.display()
        );
    }

    // Only the ELF and section headers are read, not the whole image
    let file = File::open(path)
        .with_context(|| format!("Failed to open kernel image: {}", path.display()))?;
    let cache = ReadCache::new(file);
    let Ok(obj) = object::File::parse(&cache) else {
        bail!(
            "Not an ELF image: {}\n\n\
             Compressed images (vmlinuz) carry no debug info; \
             use the vmlinux from the debug package.",
            path.display()
        );
    };

    if !obj.section_by_name(".debug_info").is_some_and(|s| s.size() > 0) {
        bail!(
            "No DWARF debug info in {}\n\n\
             The image is stripped; use the vmlinux from the kernel debug symbols package.",
            path.display()
        );
    }

    Ok(())
}
