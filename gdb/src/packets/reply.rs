/// A decoded reply from the stub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok,
    /// Empty packet, the stub does not support the request.
    Empty,
    Error(u8),
    Stop(StopReply),
    /// Any other payload, already unescaped and run-length expanded.
    Data(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReply {
    Signal(u8),
    Exited(u8),
    Terminated(u8),
}

#[derive(Debug, PartialEq, Eq)]
pub enum ReplyParseError {
    DanglingEscape,
    RunLengthWithoutPrefix,
    InvalidHex(u8),
    OddHexLength(usize),
}

impl Reply {
    pub fn parse(raw: &[u8]) -> Result<Self, ReplyParseError> {
        let body = expand(raw)?;
        Ok(match body.as_slice() {
            [] => Reply::Empty,
            b"OK" => Reply::Ok,
            [b'E', hi, lo] if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {
                Reply::Error(hex_byte(*hi, *lo)?)
            }
            [kind @ (b'S' | b'T' | b'W' | b'X'), hi, lo, ..]
                if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() =>
            {
                let code = hex_byte(*hi, *lo)?;
                Reply::Stop(match kind {
                    b'W' => StopReply::Exited(code),
                    b'X' => StopReply::Terminated(code),
                    _ => StopReply::Signal(code),
                })
            }
            _ => Reply::Data(body.clone()),
        })
    }
}

/// Undoes `}` escaping and `*` run-length encoding.
fn expand(raw: &[u8]) -> Result<Vec<u8>, ReplyParseError> {
    let mut out = Vec::with_capacity(raw.len());
    let mut iter = raw.iter();
    while let Some(&b) = iter.next() {
        match b {
            b'}' => {
                let escaped = iter.next().ok_or(ReplyParseError::DanglingEscape)?;
                out.push(escaped ^ 0x20);
            }
            b'*' => {
                let count = iter.next().ok_or(ReplyParseError::RunLengthWithoutPrefix)?;
                let last = *out.last().ok_or(ReplyParseError::RunLengthWithoutPrefix)?;
                for _ in 0..count.saturating_sub(29) {
                    out.push(last);
                }
            }
            _ => out.push(b),
        }
    }
    Ok(out)
}

fn hex_nibble(c: u8) -> Result<u8, ReplyParseError> {
    (c as char)
        .to_digit(16)
        .map(|d| d as u8)
        .ok_or(ReplyParseError::InvalidHex(c))
}

fn hex_byte(hi: u8, lo: u8) -> Result<u8, ReplyParseError> {
    Ok(hex_nibble(hi)? << 4 | hex_nibble(lo)?)
}

/// Decodes a hex string payload, as returned for memory reads.
pub fn decode_hex(data: &[u8]) -> Result<Vec<u8>, ReplyParseError> {
    if data.len() % 2 != 0 {
        return Err(ReplyParseError::OddHexLength(data.len()));
    }
    data.chunks(2).map(|pair| hex_byte(pair[0], pair[1])).collect()
}
