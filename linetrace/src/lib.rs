//! # linetrace - Statement-Level Kernel Function Tracing
//!
//! linetrace places one kprobe on every source statement of the kernel
//! functions you name, then records them with an external capture tool
//! (`trace-cmd`), so the trace shows which lines actually ran.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  vmlinux (DWARF debug info)                     │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ per compile unit
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Probe Set Builder                          │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │    Range     │──▶│     Line     │──▶│    Dedup     │         │
//! │  │   Resolver   │   │    Walker    │   │ (first seen) │         │
//! │  └──────────────┘   └──────────────┘   └──────────────┘         │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ p:<id> <func>+0x<off>
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Probe Session (tracefs)                     │
//! │   define ──▶ enable ──▶ capture (trace-cmd) ──▶ disable/remove  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`debuginfo`]: the decoder seam ([`debuginfo::DebugSource`],
//!   [`debuginfo::UnitSource`]) and its `gimli`/`object` implementation
//! - [`probes`]: range resolution, line-table walking and probe set building
//! - [`session`]: probe control through tracefs and the install/teardown lifecycle
//! - [`capture`]: the `trace-cmd record` invocation
//! - [`interrupt`]: the SIGINT handler installed before any probe goes live
//! - [`kernel`]: running-kernel discovery (release, vmlinux, tracefs)
//! - [`preflight`]: requirement checks with actionable messages
//! - [`cli`] and [`config`]: argument parsing and resolved configuration
//! - [`domain`]: core types and error taxonomy
//!
//! ## Typical Usage
//!
//! ```bash
//! # Trace every line of vfs_read until Ctrl+C
//! sudo linetrace -f vfs_read
//!
//! # Inspect the probe set without touching the kernel
//! linetrace -f vfs_read --dry-run
//! ```

pub mod capture;
pub mod cli;
pub mod config;
pub mod debuginfo;
pub mod domain;
pub mod interrupt;
pub mod kernel;
pub mod preflight;
pub mod probes;
pub mod session;
