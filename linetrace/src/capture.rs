//! # Trace Capture
//!
//! Runs the external capture tool while the probes are live:
//!
//! ```text
//! trace-cmd record -e kprobes:<id> ... -n <noise> ... <passthrough...>
//! ```
//!
//! The tool runs in the foreground. Ctrl+C stops the capture, not linetrace:
//! the interrupt is forwarded to the tool, its exit is awaited, and the probes
//! are torn down as after a normal run. A tool that dies from SIGINT on its
//! own counts as interrupted too, since a terminal Ctrl+C reaches both.

use log::{info, warn};
use std::collections::HashSet;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use tokio::process::Command;
use tokio::runtime::Handle;

use crate::domain::{InstalledProbe, SessionError};
use crate::interrupt::{Interrupt, InterruptHandler};
use crate::session::{ProbeControl, ProbeFailure, ProbeSession, TeardownReport, KPROBE_GROUP};

/// Default capture tool
pub const DEFAULT_TOOL: &str = "trace-cmd";

/// Interrupt and softirq entry points that flood a capture on each architecture
#[must_use]
pub fn noise_functions(arch: &str) -> &'static [&'static str] {
    match arch {
        "x86_64" => &[
            "__sysvec_apic_timer_interrupt",
            "sysvec_apic_timer_interrupt",
            "asm_sysvec_apic_timer_interrupt",
            "irq_enter_rcu",
            "irq_exit_rcu",
            "__do_softirq",
        ],
        "aarch64" => &[
            "gic_handle_irq",
            "el1_interrupt",
            "irq_enter_rcu",
            "irq_exit_rcu",
            "__do_softirq",
        ],
        _ => &[],
    }
}

/// Noise functions for `arch` that the running kernel can actually filter
#[must_use]
pub fn eligible_noise(arch: &str, eligible: &HashSet<String>) -> Vec<String> {
    noise_functions(arch)
        .iter()
        .filter(|name| eligible.contains(**name))
        .map(|name| (*name).to_string())
        .collect()
}

/// Arguments for `trace-cmd`: subcommand, event selectors, exclusions, passthrough
#[must_use]
pub fn capture_command_args(
    probes: &[InstalledProbe],
    noise: &[String],
    passthrough: &[String],
) -> Vec<String> {
    let mut args = vec!["record".to_string()];
    for probe in probes {
        args.push("-e".to_string());
        args.push(format!("{KPROBE_GROUP}:{}", probe.identifier()));
    }
    for function in noise {
        args.push("-n".to_string());
        args.push(function.clone());
    }
    args.extend(passthrough.iter().cloned());
    args
}

/// How a capture ended, when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    Completed,
    Interrupted,
}

/// Something that records trace events for a set of live probes
pub trait CaptureRunner {
    /// Block until the capture ends
    ///
    /// # Errors
    /// Returns an error if the capture could not run or exited unsuccessfully
    fn run(&mut self, probes: &[InstalledProbe]) -> Result<CaptureStatus, SessionError>;
}

/// `trace-cmd record` as a foreground child process
#[derive(Debug, Clone)]
pub struct TraceCmd {
    pub program: String,
    pub noise: Vec<String>,
    pub passthrough: Vec<String>,
    runtime: Handle,
    interrupt: Interrupt,
}

impl TraceCmd {
    /// A runner driven by `handler`'s runtime and stopped by its interrupt flag
    #[must_use]
    pub fn new(
        program: impl Into<String>,
        noise: Vec<String>,
        passthrough: Vec<String>,
        handler: &InterruptHandler,
    ) -> Self {
        Self {
            program: program.into(),
            noise,
            passthrough,
            runtime: handler.handle().clone(),
            interrupt: handler.interrupt(),
        }
    }

    fn spawn_error(&self, source: std::io::Error) -> SessionError {
        SessionError::CaptureSpawn {
            program: self.program.clone(),
            source,
        }
    }

    fn exit_status(&self, status: ExitStatus) -> Result<CaptureStatus, SessionError> {
        if status.success() {
            Ok(CaptureStatus::Completed)
        } else if status.signal() == Some(libc::SIGINT) {
            info!("{} stopped by SIGINT", self.program);
            Ok(CaptureStatus::Interrupted)
        } else {
            Err(SessionError::CaptureFailed {
                program: self.program.clone(),
                status,
            })
        }
    }

    async fn record(&self, args: Vec<String>) -> Result<CaptureStatus, SessionError> {
        let mut child = Command::new(&self.program)
            .args(&args)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;
        let mut interrupt = self.interrupt.clone();

        tokio::select! {
            biased;

            () = interrupt.wait() => {
                info!("Interrupted, waiting for {} to finish", self.program);
                if let Some(pid) = child.id() {
                    forward_interrupt(pid);
                }
                if let Err(e) = child.wait().await {
                    warn!("Failed to wait for {}: {e}", self.program);
                }
                Ok(CaptureStatus::Interrupted)
            }
            status = child.wait() => {
                let status = status.map_err(|e| self.spawn_error(e))?;
                self.exit_status(status)
            }
        }
    }
}

impl CaptureRunner for TraceCmd {
    fn run(&mut self, probes: &[InstalledProbe]) -> Result<CaptureStatus, SessionError> {
        let args = capture_command_args(probes, &self.noise, &self.passthrough);
        info!("Running {} {}", self.program, args.join(" "));
        self.runtime.block_on(self.record(args))
    }
}

/// Pass SIGINT on to the capture tool
///
/// A terminal Ctrl+C already reaches the whole foreground process group; this
/// covers an interrupt sent to linetrace alone.
#[allow(unsafe_code)]
fn forward_interrupt(pid: u32) {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: kill(2) has no memory-safety preconditions
    if unsafe { libc::kill(pid, libc::SIGINT) } != 0 {
        let error = std::io::Error::last_os_error();
        warn!("Failed to forward SIGINT to {pid}: {error}");
    }
}

/// Everything that happened between install and teardown
#[derive(Debug)]
pub struct SessionOutcome {
    pub enable_failures: Vec<ProbeFailure>,
    pub capture: Result<CaptureStatus, SessionError>,
    pub teardown: TeardownReport,
}

/// Enable the installed probes, run the capture, then tear every probe down
///
/// An interrupt raised before the capture starts skips it and goes straight
/// to teardown. Teardown happens whatever the capture returns; if the runner
/// panics the session's `Drop` performs it during unwinding.
pub fn run_capture_session<C, R>(
    mut session: ProbeSession<C>,
    runner: &mut R,
    interrupt: &Interrupt,
) -> SessionOutcome
where
    C: ProbeControl,
    R: CaptureRunner + ?Sized,
{
    let enable_failures = session.enable_until(|| interrupt.is_set());
    let capture = if interrupt.is_set() {
        info!("Interrupted before capture started");
        Ok(CaptureStatus::Interrupted)
    } else {
        runner.run(session.installed())
    };
    let teardown = session.teardown();
    SessionOutcome {
        enable_failures,
        capture,
        teardown,
    }
}
