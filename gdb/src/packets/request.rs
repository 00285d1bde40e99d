use super::writer::PacketWriter;

/// Packets this client sends to a stub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request<'a> {
    StartNoAckMode,
    StopReason,
    ReadMemory {
        addr: u64,
        len: usize,
    },
    WriteMemory {
        addr: u64,
        data: &'a [u8],
    },
    Detach,
    /// Registers the DPU print buffer with the stub so it can surface
    /// `printf` output of the program.
    DpuPrintInfo {
        open_sequence: u64,
        close_sequence: u64,
        buffer: u64,
        buffer_size: u64,
        buffer_state: u64,
    },
}

impl<'a> Request<'a> {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = PacketWriter::new();
        match self {
            Request::StartNoAckMode => w.write_str("QStartNoAckMode"),
            Request::StopReason => w.write(b'?'),
            Request::ReadMemory { addr, len } => {
                w.write(b'm');
                w.write_num(*addr);
                w.write(b',');
                w.write_num(*len as u64);
            }
            Request::WriteMemory { addr, data } => {
                w.write(b'M');
                w.write_num(*addr);
                w.write(b',');
                w.write_num(data.len() as u64);
                w.write(b':');
                w.write_hex_buff(data);
            }
            Request::Detach => w.write(b'D'),
            Request::DpuPrintInfo {
                open_sequence,
                close_sequence,
                buffer,
                buffer_size,
                buffer_state,
            } => {
                w.write_str("QDpuPrintInfo:");
                let fields = [open_sequence, close_sequence, buffer, buffer_size, buffer_state];
                for (i, field) in fields.iter().enumerate() {
                    if i != 0 {
                        w.write(b',');
                    }
                    w.write_num(**field);
                }
            }
        }
        w.finish()
    }
}
