//! The debugger side of DPU debugging: one host session, any number of DPU
//! sessions, exactly one of them selected.

use std::{collections::BTreeMap, path::Path, sync::OnceLock};

use gdb::connection::Connection;
use regex::Regex;

use crate::{
    arbiter,
    boot::intercept_next_boot,
    config::DpuDebugConfig,
    error::DpuError,
    host::HostSession,
    listing::{list_dpus, DpuRecord},
    pid::{DpuCoordinate, GlobalPid},
    stub::{CreateConnection, StubConfig, StubLauncher},
    target::DpuTarget,
    topology::DpuHandle,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Host,
    Dpu(usize),
}

/// How an operator supplied DPU reference is to be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Hexadecimal address of a `struct dpu_t`.
    Address(u64),
    /// `region.rank.slice.dpu`
    Dotted(String),
    /// Anything else is handed to the host for evaluation.
    Expression(String),
}

impl TokenKind {
    pub fn classify(token: &str) -> Self {
        static DOTTED: OnceLock<Regex> = OnceLock::new();
        let dotted = DOTTED.get_or_init(|| {
            Regex::new(r"^-?\d+\.-?\d+\.\d+\.\d+$").expect("dotted pattern is valid")
        });

        let token = token.trim();
        let digits = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        if let Ok(address) = u64::from_str_radix(digits, 16) {
            TokenKind::Address(address)
        } else if dotted.is_match(token) {
            TokenKind::Dotted(token.to_string())
        } else {
            TokenKind::Expression(token.to_string())
        }
    }
}

/// A live debug session on one DPU.
pub struct DpuSession<C: Connection> {
    address: u64,
    coordinate: DpuCoordinate,
    pid: GlobalPid,
    target: DpuTarget<C>,
}

impl<C: Connection> DpuSession<C> {
    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn coordinate(&self) -> DpuCoordinate {
        self.coordinate
    }

    pub fn pid(&self) -> GlobalPid {
        self.pid
    }

    pub fn target(&self) -> &DpuTarget<C> {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut DpuTarget<C> {
        &mut self.target
    }
}

/// First instruction bytes saved before the trap was written over them.
#[must_use = "the dpu keeps spinning on the trap until the entry is restored"]
struct EntryPatch {
    address: u64,
    original: Vec<u8>,
}

impl EntryPatch {
    fn apply<C: Connection>(
        target: &mut DpuTarget<C>,
        address: u64,
        trap: &[u8],
    ) -> Result<Self, DpuError> {
        let original = target.read_memory(address, trap.len())?;
        target.write_memory(address, trap)?;
        Ok(Self { address, original })
    }

    fn restore<C: Connection>(self, target: &mut DpuTarget<C>) -> Result<(), DpuError> {
        target.write_memory(self.address, &self.original)
    }
}

/// A usable session, plus whatever went wrong around it that the operator
/// still has to hear about.
#[derive(Debug)]
pub struct Attached {
    pub id: usize,
    pub warnings: Vec<DpuError>,
}

pub struct Controller<H, L, C: Connection> {
    host: H,
    launcher: L,
    connect: CreateConnection<C>,
    cfg: DpuDebugConfig,
    sessions: BTreeMap<usize, DpuSession<C>>,
    next_session: usize,
    selection: Selection,
}

impl<H, L, C> Controller<H, L, C>
where
    H: HostSession,
    L: StubLauncher,
    C: Connection,
{
    pub fn new(host: H, launcher: L, connect: CreateConnection<C>, cfg: DpuDebugConfig) -> Self {
        Self {
            host,
            launcher,
            connect,
            cfg,
            sessions: BTreeMap::new(),
            next_session: 1,
            selection: Selection::Host,
        }
    }

    pub fn config(&self) -> &DpuDebugConfig {
        &self.cfg
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn select_host(&mut self) {
        self.selection = Selection::Host;
    }

    pub fn select(&mut self, id: usize) -> Result<(), DpuError> {
        if !self.sessions.contains_key(&id) {
            return Err(DpuError::UnknownSession(id));
        }
        self.selection = Selection::Dpu(id);
        Ok(())
    }

    pub fn session(&self, id: usize) -> Option<&DpuSession<C>> {
        self.sessions.get(&id)
    }

    pub fn session_mut(&mut self, id: usize) -> Option<&mut DpuSession<C>> {
        self.sessions.get_mut(&id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// The host session, for inspection only. Does not change selection.
    pub fn host_session(&self) -> &H {
        &self.host
    }

    /// Triple of whichever session is selected.
    pub fn selected_triple(&self) -> String {
        match self.selection {
            Selection::Host => self.host.triple(),
            Selection::Dpu(id) => self
                .sessions
                .get(&id)
                .map(|s| s.target.triple().to_string())
                .unwrap_or_default(),
        }
    }

    fn host(&self) -> Result<&H, DpuError> {
        match self.selection {
            Selection::Host => Ok(&self.host),
            Selection::Dpu(_) => Err(DpuError::HostNotSelected),
        }
    }

    /// Mutable host access, paired with the configuration so both can be
    /// borrowed at once.
    fn host_mut(&mut self) -> Result<(&mut H, &DpuDebugConfig), DpuError> {
        match self.selection {
            Selection::Host => Ok((&mut self.host, &self.cfg)),
            Selection::Dpu(_) => Err(DpuError::HostNotSelected),
        }
    }

    /// Host side commands make no sense from inside a DPU session.
    fn ensure_host_command(&self) -> Result<(), DpuError> {
        if self.selected_triple() == self.cfg.dpu_triple {
            return Err(DpuError::DpuTargetSelected);
        }
        Ok(())
    }

    pub fn list_dpus(&self) -> Result<Vec<DpuRecord>, DpuError> {
        self.ensure_host_command()?;
        list_dpus(self.host()?, &self.cfg)
    }

    /// Turns an operator token into the address of a `struct dpu_t`.
    pub fn resolve_token(&mut self, token: &str) -> Result<u64, DpuError> {
        match TokenKind::classify(token) {
            TokenKind::Address(address) => Ok(address),
            TokenKind::Expression(expression) => {
                let (host, _) = self.host_mut()?;
                match host.evaluate(&expression) {
                    Ok(Some(address)) => Ok(address),
                    Ok(None) => Err(DpuError::UnknownCoordinate(expression)),
                    Err(err) => {
                        log::debug!("'{}' does not evaluate: {:?}", expression, err);
                        Err(DpuError::UnknownCoordinate(expression))
                    }
                }
            }
            TokenKind::Dotted(dotted) => list_dpus(self.host()?, &self.cfg)?
                .into_iter()
                .find(|record| record.id().to_string() == dotted)
                .map(|record| record.address)
                .ok_or(DpuError::UnknownCoordinate(dotted)),
        }
    }

    /// Attaches to a DPU and selects the new session.
    pub fn attach(&mut self, token: &str) -> Result<Attached, DpuError> {
        self.ensure_host_command()?;
        let address = self.resolve_token(token)?;
        self.attach_address(address)
    }

    fn attach_address(&mut self, address: u64) -> Result<Attached, DpuError> {
        log::info!("attaching to dpu {:#x}", address);
        let host = self.host()?;
        let dpu = DpuHandle::from_pointer(host, &self.cfg, address)?;
        let program = dpu.program_path()?;
        let rank = dpu.rank()?;
        let coordinate = dpu
            .coordinate(host, &self.cfg)?
            .ok_or(DpuError::NotHardwareTarget)?;
        let slice = rank.slice_descriptor(coordinate.slice_id)?;
        let stub = StubConfig {
            pid: GlobalPid::encode(coordinate)?,
            structure_value: slice.structure_value,
            slice_target: slice.slice_target,
            host_mux_mram_state: slice.host_mux_mram_state,
        };

        let lease = {
            let (host, cfg) = self.host_mut()?;
            arbiter::acquire(host, cfg, rank.address())?
        };
        match self.start_session(&stub, program.as_deref()) {
            Ok(target) => {
                let id = self.next_session;
                self.next_session += 1;
                self.sessions.insert(
                    id,
                    DpuSession {
                        address,
                        coordinate,
                        pid: stub.pid,
                        target,
                    },
                );

                // the flag is owned by the host, release it from there
                self.select_host();
                let released = self
                    .host_mut()
                    .and_then(|(host, cfg)| lease.release(host, cfg));
                let mut warnings = Vec::new();
                if let Err(err) = released {
                    log::warn!("{}, dpu session {} is still usable", err, id);
                    warnings.push(err);
                }
                self.selection = Selection::Dpu(id);
                log::info!("attached to dpu {} (pid {})", coordinate, stub.pid);
                Ok(Attached { id, warnings })
            }
            Err(err) => {
                let released = self
                    .host_mut()
                    .and_then(|(host, cfg)| lease.release(host, cfg));
                if let Err(release) = released {
                    log::warn!("{}", release);
                }
                Err(err)
            }
        }
    }

    fn start_session(
        &mut self,
        stub: &StubConfig,
        program: Option<&str>,
    ) -> Result<DpuTarget<C>, DpuError> {
        self.launcher
            .spawn(stub, self.cfg.stub_port)
            .map_err(|err| DpuError::Spawn(format!("{:?}", err)))?;

        let program =
            program.ok_or_else(|| DpuError::TargetCreation("no program loaded".into()))?;
        let mut target = DpuTarget::create(Path::new(program), &self.cfg.dpu_triple)?;

        let connection = self.connect_stub()?;
        target.connect(connection)?;
        target.bind_print_capture();
        Ok(target)
    }

    /// The stub was just spawned and may not listen yet.
    fn connect_stub(&mut self) -> Result<C, DpuError> {
        let endpoint = self.cfg.stub_endpoint();
        for attempt in 1..=self.cfg.connect_attempts {
            match (self.connect)(&endpoint) {
                Ok(Some(connection)) => return Ok(connection),
                Ok(None) => {
                    log::trace!("{} not listening yet (attempt {})", endpoint, attempt);
                    std::thread::sleep(self.cfg.connect_retry_delay);
                }
                Err(err) => return Err(DpuError::Connect(err.to_string())),
            }
        }
        Err(DpuError::Connect(format!(
            "nothing listening on {} after {} attempts",
            endpoint, self.cfg.connect_attempts
        )))
    }

    /// Waits for a DPU to boot and attaches to it before it runs its first
    /// instruction. With a token, boots of other DPUs are let through.
    ///
    /// The token is resolved at the first boot stop, with the launch frame
    /// selected: ranks are only allocated by then, and the token may name a
    /// local of that frame.
    pub fn attach_on_boot(&mut self, token: Option<&str>) -> Result<Attached, DpuError> {
        self.ensure_host_command()?;

        let mut wanted = None;
        let mut booting = None;
        for _ in 0..self.cfg.max_boot_intercepts {
            let (host, cfg) = self.host_mut()?;
            let boot = intercept_next_boot(host, cfg)?;
            if boot.is_empty() {
                continue;
            }
            let chosen = match token {
                Some(token) => {
                    let target = match wanted {
                        Some(address) => address,
                        None => {
                            let address = self.resolve_token(token)?;
                            wanted = Some(address);
                            address
                        }
                    };
                    boot.addresses.iter().copied().find(|a| *a == target)
                }
                None => boot.addresses.first().copied(),
            };
            if let Some(address) = chosen {
                booting = Some((address, boot.frame));
                break;
            }
        }
        let Some((address, frame)) = booting else {
            return Err(DpuError::NoMatch(match token {
                Some(_) => "could not find the dpu booting".into(),
                None => "could not find any dpu booting".into(),
            }));
        };
        log::info!("setting up dpu {:#x} for attach on boot", address);

        let pre_boot = self.attach_address(address)?;
        let mut warnings = pre_boot.warnings;
        let patch = self.patch_entry(pre_boot.id)?;

        let resumed = self
            .host_mut()
            .and_then(|(host, _)| host.step_out_of_frame(frame).map_err(DpuError::host));
        log::info!("dpu {:#x} has booted", address);
        match resumed.and_then(|()| self.attach_address(address)) {
            Ok(Attached { id, warnings: later }) => {
                warnings.extend(later);
                let restored = match self.sessions.get_mut(&id) {
                    Some(session) => patch.restore(&mut session.target),
                    None => Err(DpuError::UnknownSession(id)),
                };
                if let Err(err) = restored {
                    log::warn!("could not restore entry of dpu {:#x}: {}", address, err);
                    warnings.push(DpuError::EntryNotRestored {
                        address,
                        reason: err.to_string(),
                    });
                }
                Ok(Attached { id, warnings })
            }
            Err(err) => {
                self.recover_entry(address, patch);
                Err(err)
            }
        }
    }

    /// Traps the entry of a pre-boot session, then drops that session.
    fn patch_entry(&mut self, id: usize) -> Result<EntryPatch, DpuError> {
        let mut session = self
            .sessions
            .remove(&id)
            .ok_or(DpuError::UnknownSession(id))?;
        self.select_host();

        let patch = EntryPatch::apply(
            &mut session.target,
            self.cfg.entry_address,
            &self.cfg.entry_trap,
        );
        if let Err(err) = session.target.detach() {
            log::warn!("pre-boot session did not detach cleanly: {}", err);
        }
        patch
    }

    /// One more attach whose only purpose is putting the entry back.
    fn recover_entry(&mut self, address: u64, patch: EntryPatch) {
        self.select_host();
        let restored = self.attach_address(address).and_then(|Attached { id, .. }| {
            let mut session = self
                .sessions
                .remove(&id)
                .ok_or(DpuError::UnknownSession(id))?;
            self.select_host();
            let restored = patch.restore(&mut session.target);
            session.target.detach()?;
            restored
        });
        if let Err(err) = restored {
            log::warn!("entry of dpu {:#x} left patched: {}", address, err);
        }
    }

    /// Detaches the selected DPU session and returns to the host.
    pub fn detach(&mut self) -> Result<(), DpuError> {
        if self.selected_triple() != self.cfg.dpu_triple {
            return Err(DpuError::NotDpuTarget);
        }
        let Selection::Dpu(id) = self.selection else {
            return Err(DpuError::NotDpuTarget);
        };
        let session = self
            .sessions
            .remove(&id)
            .ok_or(DpuError::UnknownSession(id))?;
        self.select_host();
        session.target.detach()
    }
}
