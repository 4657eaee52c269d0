//! Probe install/enable/teardown around one capture session
//!
//! ```text
//! ProbeDescriptor --define--> accepted --> InstalledProbe --disable, remove--> gone
//!                         \-> rejected (logged, never touched again)
//! ```

use log::{info, warn};
use std::io;

use super::control::ProbeControl;
use crate::domain::{InstalledProbe, ProbeDescriptor};

/// A probe definition the kernel refused
#[derive(Debug)]
pub struct RejectedProbe {
    pub probe: ProbeDescriptor,
    pub error: io::Error,
}

/// A failed enable, disable or remove request
#[derive(Debug)]
pub struct ProbeFailure {
    pub identifier: String,
    pub error: io::Error,
}

/// Per-probe outcome of the install pass
#[derive(Debug, Default)]
pub struct InstallReport {
    pub installed: usize,
    pub rejected: Vec<RejectedProbe>,
    /// Probes never offered to the kernel because of an interrupt
    pub skipped: usize,
    pub interrupted: bool,
}

/// Per-probe outcome of the teardown pass
#[derive(Debug, Default)]
pub struct TeardownReport {
    pub removed: usize,
    pub disable_failures: Vec<ProbeFailure>,
    pub remove_failures: Vec<ProbeFailure>,
}

impl TeardownReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.disable_failures.is_empty() && self.remove_failures.is_empty()
    }
}

/// The set of probes live in the kernel, bound to one control handle
///
/// Dropping a session that was not explicitly torn down disables and removes
/// every installed probe, so early returns and panics clean up too.
pub struct ProbeSession<C: ProbeControl> {
    control: C,
    installed: Vec<InstalledProbe>,
    torn_down: bool,
}

impl<C: ProbeControl> ProbeSession<C> {
    /// Define every probe in order through `control`
    ///
    /// Rejections are expected (unprobeable addresses, blacklisted functions)
    /// and only exclude that probe.
    pub fn install(control: C, probes: Vec<ProbeDescriptor>) -> (Self, InstallReport) {
        Self::install_until(control, probes, || false)
    }

    /// Like [`ProbeSession::install`], checking `stop` before each definition
    ///
    /// Once `stop` returns true no further probe is defined; the ones already
    /// accepted stay in the session for teardown.
    pub fn install_until<F>(
        control: C,
        probes: Vec<ProbeDescriptor>,
        stop: F,
    ) -> (Self, InstallReport)
    where
        F: Fn() -> bool,
    {
        let total = probes.len();
        let mut session = Self {
            control,
            installed: Vec::with_capacity(total),
            torn_down: false,
        };
        let mut report = InstallReport::default();

        for probe in probes {
            if stop() {
                report.interrupted = true;
                break;
            }
            match session.control.define(&probe) {
                Ok(()) => session.installed.push(InstalledProbe::new(probe)),
                Err(error) => {
                    warn!("Kernel rejected {}: {error}", probe.definition());
                    report.rejected.push(RejectedProbe { probe, error });
                }
            }
        }

        report.installed = session.installed.len();
        report.skipped = total - report.installed - report.rejected.len();
        info!(
            "Installed {} probes, {} rejected, {} skipped",
            report.installed,
            report.rejected.len(),
            report.skipped
        );
        (session, report)
    }

    /// Probes accepted by the kernel, in install order
    pub fn installed(&self) -> &[InstalledProbe] {
        &self.installed
    }

    /// Turn on trace generation for every installed probe
    pub fn enable_all(&mut self) -> Vec<ProbeFailure> {
        self.enable_until(|| false)
    }

    /// Like [`ProbeSession::enable_all`], checking `stop` before each probe
    pub fn enable_until<F>(&mut self, stop: F) -> Vec<ProbeFailure>
    where
        F: Fn() -> bool,
    {
        let mut failures = Vec::new();
        for probe in &self.installed {
            if stop() {
                break;
            }
            if let Err(error) = self.control.set_enabled(probe.descriptor(), true) {
                warn!("Failed to enable {}: {error}", probe.identifier());
                failures.push(ProbeFailure {
                    identifier: probe.identifier().to_string(),
                    error,
                });
            }
        }
        failures
    }

    /// Disable, then remove, every installed probe
    ///
    /// Failures are collected rather than returned early: each probe gets its
    /// removal attempt regardless of what happened to the others.
    pub fn teardown(mut self) -> TeardownReport {
        self.teardown_in_place()
    }

    fn teardown_in_place(&mut self) -> TeardownReport {
        self.torn_down = true;
        let mut report = TeardownReport::default();

        // The kernel refuses to remove an enabled probe
        for probe in &self.installed {
            if let Err(error) = self.control.set_enabled(probe.descriptor(), false) {
                warn!("Failed to disable {}: {error}", probe.identifier());
                report.disable_failures.push(ProbeFailure {
                    identifier: probe.identifier().to_string(),
                    error,
                });
            }
        }

        for probe in self.installed.drain(..) {
            match self.control.remove(probe.descriptor()) {
                Ok(()) => report.removed += 1,
                Err(error) => {
                    warn!("Failed to remove {}: {error}", probe.identifier());
                    report.remove_failures.push(ProbeFailure {
                        identifier: probe.identifier().to_string(),
                        error,
                    });
                }
            }
        }

        info!("Removed {} probes", report.removed);
        report
    }
}

impl<C: ProbeControl> Drop for ProbeSession<C> {
    fn drop(&mut self) {
        if !self.torn_down {
            let report = self.teardown_in_place();
            if !report.is_clean() {
                warn!(
                    "Cleanup left {} probes that failed to remove",
                    report.remove_failures.len()
                );
            }
        }
    }
}
