//! # Ctrl+C Handling
//!
//! The SIGINT handler is installed before the first probe is defined and stays
//! installed until linetrace exits, so an interrupt at any point after that
//! ends in teardown instead of killing the process with probes left behind.
//!
//! ```text
//! SIGINT ──▶ signal task ──▶ watch<bool> = true ──▶ install / enable loops stop
//!                                                └─▶ capture forwards SIGINT to the tool
//! ```

use log::info;
use std::io;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;

/// Read side of the interrupt flag
#[derive(Debug, Clone)]
pub struct Interrupt {
    rx: watch::Receiver<bool>,
}

impl Interrupt {
    /// A flag that is never raised
    #[must_use]
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    /// A flag that is already raised
    #[cfg(test)]
    pub(crate) fn raised() -> Self {
        let (tx, rx) = watch::channel(false);
        tx.send_replace(true);
        Self { rx }
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the flag is raised, immediately if it already is
    pub async fn wait(&mut self) {
        if self.rx.wait_for(|set| *set).await.is_err() {
            // Sender gone without an interrupt: nothing will ever raise it
            std::future::pending::<()>().await;
        }
    }
}

/// Owns the runtime whose signal task listens for SIGINT
pub struct InterruptHandler {
    runtime: Runtime,
    interrupt: Interrupt,
}

impl InterruptHandler {
    /// Replace the default SIGINT action with the interrupt flag
    ///
    /// # Errors
    /// Returns an error if the runtime or the signal handler cannot be set up
    pub fn install() -> io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;

        // Registered here, not on first poll
        let mut sigint = {
            let _guard = runtime.enter();
            signal(SignalKind::interrupt())?
        };

        let (tx, rx) = watch::channel(false);
        runtime.spawn(async move {
            while sigint.recv().await.is_some() {
                info!("Interrupt received");
                tx.send_replace(true);
            }
        });

        Ok(Self {
            runtime,
            interrupt: Interrupt { rx },
        })
    }

    #[must_use]
    pub fn interrupt(&self) -> Interrupt {
        self.interrupt.clone()
    }

    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.interrupt.is_set()
    }

    pub fn handle(&self) -> &Handle {
        self.runtime.handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_is_not_set() {
        assert!(!Interrupt::never().is_set());
        assert!(Interrupt::raised().is_set());
    }

    #[test]
    fn test_wait_returns_once_raised() {
        let (tx, rx) = watch::channel(false);
        let mut interrupt = Interrupt { rx };
        tx.send_replace(true);

        let runtime = Builder::new_current_thread().build().unwrap();
        runtime.block_on(interrupt.wait());

        assert!(interrupt.is_set());
    }
}
