use std::io;

use gdb::connection::Connection;
use thiserror::Error;

use crate::{
    controller::{Attached, Controller},
    host::HostSession,
    listing::write_table,
    stub::StubLauncher,
};

/// Operator commands, as typed at the debugger prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Attach(String),
    AttachOnBoot(Option<String>),
    Detach,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandParseError> {
        let line = line.trim();
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };
        let argument = (!rest.is_empty()).then(|| rest.to_string());

        match name {
            "" => Err(CommandParseError::Empty),
            "list" | "dpu_list" => match argument {
                None => Ok(Command::List),
                Some(_) => Err(CommandParseError::Usage("list")),
            },
            "attach" | "dpu_attach" => argument
                .map(Command::Attach)
                .ok_or(CommandParseError::Usage("attach <struct dpu_t *>")),
            "attach-on-boot" | "dpu_attach_on_boot" => Ok(Command::AttachOnBoot(argument)),
            "detach" | "dpu_detach" => match argument {
                None => Ok(Command::Detach),
                Some(_) => Err(CommandParseError::Usage("detach")),
            },
            other => Err(CommandParseError::Unknown(other.to_string())),
        }
    }
}

impl<H, L, C> Controller<H, L, C>
where
    H: HostSession,
    L: StubLauncher,
    C: Connection,
{
    /// Runs one command, reporting the outcome on `out`. Failures are
    /// printed, never returned; only a failing `out` is an error.
    pub fn run(&mut self, command: &Command, out: &mut impl io::Write) -> io::Result<()> {
        match command {
            Command::List => match self.list_dpus() {
                Ok(records) => write_table(out, &records),
                Err(err) => writeln!(out, "dpu_list: {}", err),
            },
            Command::Attach(token) => {
                writeln!(out, "Attaching to dpu '{}'", token)?;
                match self.attach(token) {
                    Ok(attached) => self.report(&attached, out),
                    Err(err) => writeln!(out, "{}", capitalize(&err.to_string())),
                }
            }
            Command::AttachOnBoot(token) => match self.attach_on_boot(token.as_deref()) {
                Ok(attached) => self.report(&attached, out),
                Err(err) => writeln!(out, "{}", capitalize(&err.to_string())),
            },
            Command::Detach => match self.detach() {
                Ok(()) => writeln!(out, "Detached"),
                Err(err) => writeln!(out, "{}", capitalize(&err.to_string())),
            },
        }
    }

    /// The session line first, then one line per warning.
    fn report(&self, attached: &Attached, out: &mut impl io::Write) -> io::Result<()> {
        writeln!(out, "{}", self.describe(attached.id))?;
        for warning in &attached.warnings {
            writeln!(out, "{}", capitalize(&warning.to_string()))?;
        }
        Ok(())
    }

    fn describe(&self, id: usize) -> String {
        match self.session(id) {
            Some(session) => format!(
                "Attached to dpu {:#x} ({}) as session {}",
                session.address(),
                session.coordinate(),
                id
            ),
            None => format!("Attached as session {}", id),
        }
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
