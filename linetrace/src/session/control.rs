//! Kernel dynamic-probe control interface

use log::debug;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::domain::{ProbeDescriptor, SessionError};

/// Event group the kernel assigns to `p:` definitions without an explicit group
pub const KPROBE_GROUP: &str = "kprobes";

/// Line-oriented control over dynamic probes
///
/// Every call is one independent kernel request: an error rejects that probe
/// only and leaves the interface usable for the next call.
pub trait ProbeControl {
    /// Append a probe definition
    ///
    /// # Errors
    /// Returns the kernel's rejection of the definition
    fn define(&mut self, probe: &ProbeDescriptor) -> io::Result<()>;

    /// Toggle trace generation for a defined probe
    ///
    /// # Errors
    /// Returns an error if the probe's enable switch cannot be written
    fn set_enabled(&mut self, probe: &ProbeDescriptor, enabled: bool) -> io::Result<()>;

    /// Delete a defined probe
    ///
    /// # Errors
    /// Returns the kernel's rejection of the removal (e.g. probe still enabled)
    fn remove(&mut self, probe: &ProbeDescriptor) -> io::Result<()>;
}

/// Probe control through tracefs (`kprobe_events` and per-event `enable` files)
#[derive(Debug)]
pub struct Tracefs {
    root: PathBuf,
    // Opened once for append: truncating kprobe_events would drop every kprobe
    // on the system, and each write() is parsed as one definition.
    kprobe_events: File,
}

impl Tracefs {
    /// Open `<root>/kprobe_events` for the lifetime of the session
    ///
    /// # Errors
    /// Returns [`SessionError::ControlUnavailable`] if the file cannot be opened
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, SessionError> {
        let root = root.as_ref().to_path_buf();
        let path = root.join("kprobe_events");
        let kprobe_events = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|source| SessionError::ControlUnavailable {
                path: path.clone(),
                source,
            })?;
        debug!("Opened {}", path.display());
        Ok(Self {
            root,
            kprobe_events,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/events/kprobes/<identifier>/enable`
    #[must_use]
    pub fn enable_path(&self, identifier: &str) -> PathBuf {
        self.root.join("events").join(KPROBE_GROUP).join(identifier).join("enable")
    }

    fn write_command(&mut self, command: &str) -> io::Result<()> {
        self.kprobe_events.write_all(format!("{command}\n").as_bytes())
    }
}

impl ProbeControl for Tracefs {
    fn define(&mut self, probe: &ProbeDescriptor) -> io::Result<()> {
        self.write_command(&probe.definition())
    }

    fn set_enabled(&mut self, probe: &ProbeDescriptor, enabled: bool) -> io::Result<()> {
        fs::write(self.enable_path(&probe.identifier), if enabled { "1" } else { "0" })
    }

    fn remove(&mut self, probe: &ProbeDescriptor) -> io::Result<()> {
        self.write_command(&probe.removal())
    }
}
