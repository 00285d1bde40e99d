//! Debugging of UPMEM DPUs from a debugger attached to the host program.
//!
//! The host runtime describes every allocated rank in its own memory. This
//! crate reads those descriptors to find DPUs, hands a DPU's debug registers
//! over to `lldb-server-dpu` and connects a second debug session to it, either
//! immediately or right before the DPU boots.

pub mod arbiter;
pub mod boot;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod host;
pub mod listing;
pub mod pid;
pub mod stub;
pub mod target;
pub mod topology;

#[cfg(test)]
mod mock;

pub use commands::Command;
pub use config::DpuDebugConfig;
pub use controller::{Attached, Controller, Selection};
pub use error::DpuError;
pub use host::{HostSession, HostValue};
pub use pid::{DpuCoordinate, GlobalPid};
