use crate::{
    connection::Connection,
    packets::{
        psm::{Frame, PacketStateMachine},
        reply::{decode_hex, Reply, ReplyParseError, StopReply},
        request::Request,
    },
};

/// How many times a packet is resent after the stub answers `-`.
const MAX_RESENDS: usize = 3;

pub enum RemoteError<C: Connection> {
    ConnectionRead(C::Error),
    ConnectionWrite(C::Error),
    ConnectionFlush(C::Error),
    ReplyParse(ReplyParseError),
    StubSentNack,
    CorruptReply,
    StubError(u8),
    Unsupported(&'static str),
    UnexpectedReply(Reply),
    ShortRead { expected: usize, actual: usize },
}

impl<C: Connection> std::fmt::Debug for RemoteError<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionRead(e) => f.debug_tuple("ConnectionRead").field(e).finish(),
            Self::ConnectionWrite(e) => f.debug_tuple("ConnectionWrite").field(e).finish(),
            Self::ConnectionFlush(e) => f.debug_tuple("ConnectionFlush").field(e).finish(),
            Self::ReplyParse(e) => f.debug_tuple("ReplyParse").field(e).finish(),
            Self::StubSentNack => write!(f, "StubSentNack"),
            Self::CorruptReply => write!(f, "CorruptReply"),
            Self::StubError(code) => f.debug_tuple("StubError").field(code).finish(),
            Self::Unsupported(what) => f.debug_tuple("Unsupported").field(what).finish(),
            Self::UnexpectedReply(reply) => f.debug_tuple("UnexpectedReply").field(reply).finish(),
            Self::ShortRead { expected, actual } => f
                .debug_struct("ShortRead")
                .field("expected", expected)
                .field("actual", actual)
                .finish(),
        }
    }
}

struct RemoteClientCfg {
    no_ack_mode: bool,
}

#[allow(clippy::derivable_impls)]
impl Default for RemoteClientCfg {
    fn default() -> Self {
        Self { no_ack_mode: false }
    }
}

/// Client half of a remote debug session, talking to a stub over `C`.
pub struct RemoteClient<C: Connection> {
    connection: C,
    ptm: PacketStateMachine,
    cfg: RemoteClientCfg,
    packets_sent: usize,
}

impl<C: Connection> RemoteClient<C> {
    pub fn new(connection: C) -> Self {
        Self {
            connection,
            ptm: PacketStateMachine::new(),
            cfg: Default::default(),
            packets_sent: 0,
        }
    }

    /// Starts a session: switches to no-ack mode when the stub allows it and
    /// asks why the target is stopped.
    pub fn connect(mut connection: C) -> Result<(Self, StopReply), RemoteError<C>> {
        connection
            .on_session_start()
            .map_err(RemoteError::ConnectionWrite)?;
        let mut client = Self::new(connection);

        match client.request(&Request::StartNoAckMode)? {
            Reply::Ok => client.cfg.no_ack_mode = true,
            Reply::Empty => log::debug!("stub does not support no-ack mode"),
            other => return Err(RemoteError::UnexpectedReply(other)),
        }

        match client.request(&Request::StopReason)? {
            Reply::Stop(stop) => Ok((client, stop)),
            other => Err(RemoteError::UnexpectedReply(other)),
        }
    }

    pub fn request(&mut self, request: &Request) -> Result<Reply, RemoteError<C>> {
        let bytes = request.encode();
        for _ in 0..=MAX_RESENDS {
            log::trace!("--> {}", String::from_utf8_lossy(&bytes));
            self.connection
                .write_all(&bytes)
                .map_err(RemoteError::ConnectionWrite)?;
            self.connection
                .flush()
                .map_err(RemoteError::ConnectionFlush)?;
            self.packets_sent += 1;

            if !self.cfg.no_ack_mode && !self.read_ack()? {
                log::debug!("stub sent nack, resending");
                continue;
            }
            let body = self.read_packet()?;
            return Reply::parse(&body).map_err(RemoteError::ReplyParse);
        }
        Err(RemoteError::StubSentNack)
    }

    fn read_ack(&mut self) -> Result<bool, RemoteError<C>> {
        loop {
            let byte = self.connection.read().map_err(RemoteError::ConnectionRead)?;
            match self.ptm.incomming_data(byte) {
                Some(Frame::Ack) => return Ok(true),
                Some(Frame::Nack) => return Ok(false),
                Some(Frame::Packet(_)) | Some(Frame::Corrupt { .. }) => {
                    log::debug!("dropping packet received while waiting for ack")
                }
                None => {}
            }
        }
    }

    fn read_packet(&mut self) -> Result<Vec<u8>, RemoteError<C>> {
        loop {
            let byte = self.connection.read().map_err(RemoteError::ConnectionRead)?;
            let body = match self.ptm.incomming_data(byte) {
                Some(Frame::Packet(body)) => Some(body.to_vec()),
                Some(Frame::Corrupt { expected, actual }) => {
                    log::debug!(
                        "reply checksum mismatch: expected {:02x}, got {:02x}",
                        expected,
                        actual
                    );
                    None
                }
                _ => continue,
            };

            match body {
                Some(body) => {
                    if !self.cfg.no_ack_mode {
                        self.connection
                            .write(b'+')
                            .map_err(RemoteError::ConnectionWrite)?;
                        self.connection
                            .flush()
                            .map_err(RemoteError::ConnectionFlush)?;
                    }
                    return Ok(body);
                }
                None if self.cfg.no_ack_mode => return Err(RemoteError::CorruptReply),
                None => {
                    self.connection
                        .write(b'-')
                        .map_err(RemoteError::ConnectionWrite)?;
                    self.connection
                        .flush()
                        .map_err(RemoteError::ConnectionFlush)?;
                }
            }
        }
    }

    pub fn read_memory(&mut self, addr: u64, len: usize) -> Result<Vec<u8>, RemoteError<C>> {
        match self.request(&Request::ReadMemory { addr, len })? {
            Reply::Data(hex) => {
                let data = decode_hex(&hex).map_err(RemoteError::ReplyParse)?;
                if data.len() != len {
                    return Err(RemoteError::ShortRead {
                        expected: len,
                        actual: data.len(),
                    });
                }
                Ok(data)
            }
            Reply::Error(code) => Err(RemoteError::StubError(code)),
            other => Err(RemoteError::UnexpectedReply(other)),
        }
    }

    pub fn write_memory(&mut self, addr: u64, data: &[u8]) -> Result<(), RemoteError<C>> {
        match self.request(&Request::WriteMemory { addr, data })? {
            Reply::Ok => Ok(()),
            Reply::Error(code) => Err(RemoteError::StubError(code)),
            other => Err(RemoteError::UnexpectedReply(other)),
        }
    }

    pub fn set_dpu_print_info(
        &mut self,
        open_sequence: u64,
        close_sequence: u64,
        buffer: u64,
        buffer_size: u64,
        buffer_state: u64,
    ) -> Result<(), RemoteError<C>> {
        let request = Request::DpuPrintInfo {
            open_sequence,
            close_sequence,
            buffer,
            buffer_size,
            buffer_state,
        };
        match self.request(&request)? {
            Reply::Ok => Ok(()),
            Reply::Empty => Err(RemoteError::Unsupported("QDpuPrintInfo")),
            Reply::Error(code) => Err(RemoteError::StubError(code)),
            other => Err(RemoteError::UnexpectedReply(other)),
        }
    }

    /// Leaves the target running and closes the session.
    pub fn detach(mut self) -> Result<(), RemoteError<C>> {
        match self.request(&Request::Detach)? {
            Reply::Ok => {}
            Reply::Error(code) => return Err(RemoteError::StubError(code)),
            other => return Err(RemoteError::UnexpectedReply(other)),
        }
        self.connection
            .on_session_end()
            .map_err(RemoteError::ConnectionWrite)
    }

    pub fn is_no_ack_mode(&self) -> bool {
        self.cfg.no_ack_mode
    }

    pub fn packets_sent(&self) -> usize {
        self.packets_sent
    }
}
