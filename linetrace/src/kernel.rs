//! Running-kernel discovery: release string, debug image, tracefs mount

use log::debug;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Tracefs mount points, preferred first
pub const TRACEFS_CANDIDATES: [&str; 2] = ["/sys/kernel/tracing", "/sys/kernel/debug/tracing"];

/// Release of the running kernel, e.g. `6.8.0-45-generic`
///
/// # Errors
/// Returns an error if `/proc/sys/kernel/osrelease` cannot be read
pub fn kernel_release() -> io::Result<String> {
    Ok(std::fs::read_to_string("/proc/sys/kernel/osrelease")?.trim().to_string())
}

/// Where distributions install the uncompressed debug image for `release`
#[must_use]
pub fn vmlinux_candidates(release: &str) -> Vec<PathBuf> {
    vec![
        PathBuf::from(format!("/usr/lib/debug/boot/vmlinux-{release}")),
        PathBuf::from(format!("/usr/lib/debug/lib/modules/{release}/vmlinux")),
        PathBuf::from(format!("/lib/modules/{release}/build/vmlinux")),
        PathBuf::from(format!("/boot/vmlinux-{release}")),
    ]
}

/// First candidate that exists as a regular file
#[must_use]
pub fn first_existing_file(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|path| path.is_file()).cloned()
}

/// Debug image of the running kernel, if one is installed
#[must_use]
pub fn locate_vmlinux() -> Option<PathBuf> {
    let release = kernel_release().ok()?;
    let found = first_existing_file(&vmlinux_candidates(&release));
    debug!("vmlinux for {release}: {found:?}");
    found
}

/// First candidate directory that exposes `kprobe_events`
#[must_use]
pub fn find_tracefs<P: AsRef<Path>>(candidates: &[P]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(AsRef::as_ref)
        .find(|root| root.join("kprobe_events").exists())
        .map(Path::to_path_buf)
}

/// Mounted tracefs root on this system
#[must_use]
pub fn locate_tracefs() -> Option<PathBuf> {
    find_tracefs(&TRACEFS_CANDIDATES)
}

/// Function names from `available_filter_functions` content
///
/// Lines look like `vfs_read` or `nf_hook_slow [nf_tables]`; only the name
/// is kept.
#[must_use]
pub fn parse_eligible_functions<R: BufRead>(reader: R) -> HashSet<String> {
    reader
        .lines()
        .map_while(Result::ok)
        .filter_map(|line| line.split_whitespace().next().map(str::to_string))
        .collect()
}

/// Functions the kernel allows to be traced or filtered
///
/// # Errors
/// Returns an error if `<tracefs>/available_filter_functions` cannot be opened
pub fn read_eligible_functions(tracefs: &Path) -> io::Result<HashSet<String>> {
    let file = File::open(tracefs.join("available_filter_functions"))?;
    Ok(parse_eligible_functions(BufReader::new(file)))
}
