use thiserror::Error;

use crate::pid::PidError;

#[derive(Error, Debug)]
pub enum DpuError {
    #[error("command not allowed on dpu target")]
    DpuTargetSelected,
    #[error("current target is not a DPU target")]
    NotDpuTarget,
    #[error("could not attach to simulator (hardware only)")]
    NotHardwareTarget,
    #[error("host session is not selected")]
    HostNotSelected,

    #[error("could not find {0}")]
    Resolution(String),
    #[error("could not interpret '{0}'")]
    UnknownCoordinate(String),
    #[error(transparent)]
    Pid(#[from] PidError),

    #[error("could not {} debug mode: {reason}", debug_mode_verb(.enable))]
    Arbitration { enable: bool, reason: String },

    #[error("could not spawn debug stub: {0}")]
    Spawn(String),
    #[error("could not create dpu target: {0}")]
    TargetCreation(String),
    #[error("could not connect to dpu: {0}")]
    Connect(String),

    #[error("{0}")]
    NoMatch(String),
    #[error("could not restore entry of dpu {address:#x}: {reason}")]
    EntryNotRestored { address: u64, reason: String },

    #[error("host session: {0}")]
    Host(String),
    #[error("dpu session: {0}")]
    Remote(String),
    #[error("no dpu session {0}")]
    UnknownSession(usize),
}

fn debug_mode_verb(enable: &bool) -> &'static str {
    if *enable {
        "set dpu in"
    } else {
        "unset dpu from"
    }
}

impl DpuError {
    pub(crate) fn host(err: impl std::fmt::Debug) -> Self {
        DpuError::Host(format!("{:?}", err))
    }

    pub(crate) fn remote(err: impl std::fmt::Debug) -> Self {
        DpuError::Remote(format!("{:?}", err))
    }
}
