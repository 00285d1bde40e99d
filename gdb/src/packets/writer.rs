/// Builds one `$<body>#<checksum>` frame.
pub struct PacketWriter {
    started: bool,
    check_sum: u8,
    msg: Vec<u8>,
}

impl Default for PacketWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketWriter {
    pub fn new() -> Self {
        Self {
            started: false,
            check_sum: 0,
            msg: Vec::new(),
        }
    }

    /// Closes the frame and hands back the bytes to put on the wire.
    pub fn finish(mut self) -> Vec<u8> {
        if !self.started {
            self.started = true;
            self.msg.push(b'$');
        }
        let checksum = self.check_sum;
        self.msg.push(b'#');
        self.push_hex(checksum);
        self.msg
    }

    fn inner_write(&mut self, byte: u8) {
        if !self.started {
            self.started = true;
            self.msg.push(b'$');
        }
        self.msg.push(byte);
        self.check_sum = self.check_sum.wrapping_add(byte);
    }

    fn push_hex(&mut self, byte: u8) {
        for digit in [(byte & 0xf0) >> 4, byte & 0x0f] {
            self.msg.push(hex_char(digit));
        }
    }

    pub fn write(&mut self, byte: u8) {
        self.inner_write(byte)
    }

    pub fn write_hex(&mut self, byte: u8) {
        for digit in [(byte & 0xf0) >> 4, byte & 0x0f] {
            self.write(hex_char(digit));
        }
    }

    pub fn write_str(&mut self, str: &str) {
        for &b in str.as_bytes().iter() {
            self.write(b)
        }
    }

    pub fn write_hex_buff(&mut self, data: &[u8]) {
        for &b in data {
            self.write_hex(b);
        }
    }

    /// Writes a number in lowercase hex without leading zeros.
    pub fn write_num(&mut self, num: u64) {
        self.write_str(&format!("{:x}", num));
    }
}

fn hex_char(digit: u8) -> u8 {
    match digit {
        0..=9 => b'0' + digit,
        _ => b'a' + digit - 10,
    }
}
