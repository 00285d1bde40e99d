//! Ownership of a rank's hardware debug registers.
//!
//! While debug mode is set the host runtime keeps its hands off the rank and
//! the stub may drive the debug registers. The flag lives in the host
//! process; the only way to flip it is to call the runtime's entry point
//! through the host session.

use crate::{config::DpuDebugConfig, error::DpuError, host::HostSession};

fn debug_mode_expression(cfg: &DpuDebugConfig, rank: u64, enable: bool) -> String {
    format!(
        "{}(({} *){:#x}, {})",
        cfg.debug_mode_function, cfg.rank_type, rank, enable as u8
    )
}

fn set_debug_mode<H: HostSession>(
    host: &mut H,
    cfg: &DpuDebugConfig,
    rank: u64,
    enable: bool,
) -> Result<(), DpuError> {
    let expression = debug_mode_expression(cfg, rank, enable);
    log::debug!("evaluating {}", expression);
    host.evaluate(&expression)
        .map(|_| ())
        .map_err(|err| DpuError::Arbitration {
            enable,
            reason: format!("{:?}", err),
        })
}

/// Proof that debug mode was set on a rank. Must be handed back through
/// [`DebugModeLease::release`].
#[must_use = "debug mode stays set until the lease is released"]
#[derive(Debug)]
pub struct DebugModeLease {
    rank: u64,
}

impl DebugModeLease {
    pub fn rank(&self) -> u64 {
        self.rank
    }

    /// Clears debug mode. On failure the flag is still set in the host.
    pub fn release<H: HostSession>(self, host: &mut H, cfg: &DpuDebugConfig) -> Result<(), DpuError> {
        set_debug_mode(host, cfg, self.rank, false)
    }
}

pub fn acquire<H: HostSession>(
    host: &mut H,
    cfg: &DpuDebugConfig,
    rank: u64,
) -> Result<DebugModeLease, DpuError> {
    set_debug_mode(host, cfg, rank, true)?;
    Ok(DebugModeLease { rank })
}
