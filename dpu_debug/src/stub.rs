use std::{
    error::Error,
    fmt::Debug,
    net::TcpStream,
    process::{Command, Stdio},
};

use crate::pid::GlobalPid;

/// Out-of-band configuration copied from the rank's slice descriptor and
/// handed to the stub when it is spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StubConfig {
    pub pid: GlobalPid,
    pub structure_value: u64,
    pub slice_target: u64,
    pub host_mux_mram_state: u64,
}

impl StubConfig {
    pub fn environment(&self) -> [(&'static str, String); 3] {
        [
            ("UPMEM_LLDB_STRUCTURE_VALUE", self.structure_value.to_string()),
            ("UPMEM_LLDB_SLICE_TARGET", self.slice_target.to_string()),
            (
                "UPMEM_LLDB_HOST_MUX_MRAM_STATE",
                self.host_mux_mram_state.to_string(),
            ),
        ]
    }
}

/// Starts the process that exposes one DPU over the remote protocol.
pub trait StubLauncher {
    type Error: Debug;

    /// Spawns the stub and returns without waiting for it.
    fn spawn(&mut self, config: &StubConfig, port: u16) -> Result<(), Self::Error>;
}

/// Runs `lldb-server-dpu gdbserver --attach <pid> :<port>`.
pub struct LldbServerLauncher {
    program: String,
}

impl LldbServerLauncher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl StubLauncher for LldbServerLauncher {
    type Error = std::io::Error;

    fn spawn(&mut self, config: &StubConfig, port: u16) -> Result<(), Self::Error> {
        let mut command = Command::new(&self.program);
        command
            .arg("gdbserver")
            .arg("--attach")
            .arg(config.pid.to_string())
            .arg(format!(":{}", port))
            .stdin(Stdio::null());
        for (key, value) in config.environment() {
            command.env(key, value);
        }
        let child = command.spawn()?;
        log::debug!(
            "spawned {} (os pid {}) for dpu pid {}",
            self.program,
            child.id(),
            config.pid
        );
        // the stub lives on its own; readiness is observed through the socket
        drop(child);
        Ok(())
    }
}

/// Opens the transport to a stub. `Ok(None)` means the stub is not
/// listening yet and the caller may retry.
pub type CreateConnection<C> = Box<dyn FnMut(&str) -> Result<Option<C>, Box<dyn Error>>>;

pub fn tcp_connector() -> CreateConnection<TcpStream> {
    Box::new(
        |endpoint: &str| -> Result<Option<TcpStream>, Box<dyn Error>> {
            match TcpStream::connect(endpoint) {
                Ok(stream) => Ok(Some(stream)),
                Err(err) if err.kind() == std::io::ErrorKind::ConnectionRefused => Ok(None),
                Err(err) => Err(err.into()),
            }
        },
    )
}
