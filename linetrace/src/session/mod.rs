//! # Probe Lifecycle
//!
//! Owns the kernel side of a run:
//!
//! - [`control`]: the [`ProbeControl`] seam and its tracefs implementation
//!   (`p:<id> <func>+0x<off>` / `-:<id>` lines into `kprobe_events`, `1`/`0`
//!   into `events/kprobes/<id>/enable`)
//! - [`lifecycle`]: [`ProbeSession`], which installs a probe set, keeps only
//!   what the kernel accepted, and guarantees teardown
//!
//! The control interface is written by one handle, sequentially, for the whole
//! session.

pub mod control;
pub mod lifecycle;

pub use control::{ProbeControl, Tracefs, KPROBE_GROUP};
pub use lifecycle::{InstallReport, ProbeFailure, ProbeSession, RejectedProbe, TeardownReport};

#[cfg(test)]
pub(crate) mod testing {
    //! A [`ProbeControl`] that records every request

    use super::ProbeControl;
    use crate::domain::ProbeDescriptor;
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::io;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Define(String),
        Enable(String, bool),
        Remove(String),
    }

    #[derive(Debug, Default)]
    pub struct RecordingControl {
        pub calls: Rc<RefCell<Vec<Call>>>,
        pub reject_define: HashSet<String>,
        pub fail_disable: HashSet<String>,
    }

    impl RecordingControl {
        pub fn rejecting(identifiers: &[&str]) -> Self {
            Self {
                reject_define: identifiers.iter().map(|s| (*s).to_string()).collect(),
                ..Self::default()
            }
        }

        /// Identifiers removed so far, in order
        pub fn removed(calls: &Rc<RefCell<Vec<Call>>>) -> Vec<String> {
            calls
                .borrow()
                .iter()
                .filter_map(|c| match c {
                    Call::Remove(id) => Some(id.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    impl ProbeControl for RecordingControl {
        fn define(&mut self, probe: &ProbeDescriptor) -> io::Result<()> {
            self.calls.borrow_mut().push(Call::Define(probe.identifier.clone()));
            if self.reject_define.contains(&probe.identifier) {
                return Err(io::Error::from_raw_os_error(libc::EINVAL));
            }
            Ok(())
        }

        fn set_enabled(&mut self, probe: &ProbeDescriptor, enabled: bool) -> io::Result<()> {
            self.calls.borrow_mut().push(Call::Enable(probe.identifier.clone(), enabled));
            if !enabled && self.fail_disable.contains(&probe.identifier) {
                return Err(io::Error::from(io::ErrorKind::NotFound));
            }
            Ok(())
        }

        fn remove(&mut self, probe: &ProbeDescriptor) -> io::Result<()> {
            self.calls.borrow_mut().push(Call::Remove(probe.identifier.clone()));
            Ok(())
        }
    }

    pub fn descriptors(identifiers: &[&str]) -> Vec<ProbeDescriptor> {
        identifiers
            .iter()
            .enumerate()
            .map(|(i, id)| ProbeDescriptor {
                identifier: (*id).to_string(),
                function_name: "target_fn".to_string(),
                offset: (i as u64) * 4,
            })
            .collect()
    }
}
