/// What the state machine produced once a frame is complete.
#[derive(Debug, PartialEq, Eq)]
pub enum Frame<'a> {
    Ack,
    Nack,
    /// Body of a `$...#xx` packet whose checksum matched.
    Packet(&'a [u8]),
    /// Body of a `$...#xx` packet whose checksum did not match.
    Corrupt { expected: u8, actual: u8 },
}

pub struct PacketStateMachine {
    buf: Vec<u8>,
    check_sum: u8,
    received_sum: u8,
    state: PacketStateMachineStates,
}

impl Default for PacketStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketStateMachine {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            check_sum: 0,
            received_sum: 0,
            state: PacketStateMachineStates::Ready,
        }
    }

    pub fn incomming_data(&mut self, data: u8) -> Option<Frame<'_>> {
        use PacketStateMachineStates as State;
        match self.state {
            State::Ready => match data {
                b'$' => {
                    self.buf.clear();
                    self.check_sum = 0;
                    self.state = State::CommandBody;
                }
                b'+' => return Some(Frame::Ack),
                b'-' => return Some(Frame::Nack),
                other => log::debug!("<-- stray byte outside of packet: {:#04x}", other),
            },
            State::CommandBody if data == b'#' => self.state = State::CheckSum1,
            State::CommandBody => {
                self.check_sum = self.check_sum.wrapping_add(data);
                self.buf.push(data);
            }
            State::CheckSum1 => {
                self.received_sum = hex_digit(data) << 4;
                self.state = State::CheckSum2;
            }
            State::CheckSum2 => {
                self.received_sum |= hex_digit(data);
                self.state = State::Ready;

                match std::str::from_utf8(self.buf.as_slice()) {
                    Ok(str) => log::trace!("<-- ${}", str),
                    Err(err) => log::debug!(
                        "<-- INVALID UFT8 PACKET: {}: {:?}",
                        err,
                        self.buf.as_slice()
                    ),
                }
                if self.received_sum != self.check_sum {
                    return Some(Frame::Corrupt {
                        expected: self.check_sum,
                        actual: self.received_sum,
                    });
                }
                return Some(Frame::Packet(self.buf.as_slice()));
            }
        }
        None
    }
}

fn hex_digit(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => 0,
    }
}

enum PacketStateMachineStates {
    Ready,
    CommandBody,
    CheckSum1,
    CheckSum2,
}
