//! The reference emitter: consumes resolved text and the opcode catalogue
//! and produces a byte image. This is deliberately a cursor state machine
//! with the same working set as the self-hosting assembler (source cursor,
//! output pointer, effective-address pointer, relocation base), so the two
//! emitters stay structurally equivalent.

use crate::opcodes::{self, Shape, END_OPCODE};

/// The product of an assembly run: a sparse 64 KiB output buffer plus the
/// (effective address, byte) listing in emission order.
pub struct Assembly {
    memory: Box<[u8; 0x10000]>,
    written: Option<(u16, u16)>,
    listing: Vec<(u16, u8)>,
}

impl Assembly {
    fn new() -> Assembly {
        Assembly {
            memory: Box::new([0; 0x10000]),
            written: None,
            listing: Vec::new(),
        }
    }

    /// The lowest output address written, if anything was emitted.
    pub fn origin(&self) -> Option<u16> {
        self.written.map(|(min, _)| min)
    }

    /// The highest output address written.
    pub fn limit(&self) -> Option<u16> {
        self.written.map(|(_, max)| max)
    }

    /// The contiguous image from the lowest to the highest written address.
    /// Holes left by `@` skips read back as zero.
    pub fn image(&self) -> &[u8] {
        match self.written {
            Some((min, max)) => &self.memory[min as usize..=max as usize],
            None => &[],
        }
    }

    pub fn read(&self, address: u16) -> u8 {
        self.memory[address as usize]
    }

    /// The (effective address, byte) pairs in the order they were emitted.
    pub fn listing(&self) -> &[(u16, u8)] {
        &self.listing
    }

    pub fn render_listing(&self) -> String {
        let mut out = String::new();
        for (effective, byte) in &self.listing {
            out.push_str(&format!("{:04X}: {:02X}\n", effective, byte));
        }
        out
    }
}

/// Assemble resolved text into a byte image.
pub fn assemble(resolved: &str) -> Result<Assembly, String> {
    let mut emitter = Emitter {
        bytes: resolved.as_bytes(),
        pos: 0,
        out: 0,
        effective: 0,
        base: 0,
        assembly: Assembly::new(),
    };
    emitter.run()?;
    Ok(emitter.assembly)
}

struct Emitter<'a> {
    bytes: &'a [u8],
    pos: usize,
    /// Where the next byte lands in the output buffer.
    out: u16,
    /// The address the next byte is intended to execute at.
    effective: u16,
    /// `out = effective + base`, maintained by `!` and `@`.
    base: u16,
    assembly: Assembly,
}

impl<'a> Emitter<'a> {
    fn run(&mut self) -> Result<(), String> {
        while let Some(byte) = self.peek() {
            match byte {
                b'!' => {
                    self.bump();
                    self.base = self.hex_word()?;
                }
                b'@' => {
                    self.bump();
                    self.effective = self.hex_word()?;
                    self.out = self.effective.wrapping_add(self.base);
                }
                b'#' => {
                    self.bump();
                    let value = self.hex_byte()?;
                    self.write(value);
                }
                b'"' => {
                    self.bump();
                    loop {
                        match self.peek() {
                            Some(b'"') => {
                                self.bump();
                                break;
                            }
                            Some(byte) => {
                                self.bump();
                                self.write(byte);
                            }
                            None => return Err("Unterminated string literal".to_string()),
                        }
                    }
                }
                b' ' | b'\n' => {
                    self.bump();
                }
                _ => {
                    if self.mnemonic_unit()? {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Assemble one instruction. Returns true on the end-of-input sentinel.
    fn mnemonic_unit(&mut self) -> Result<bool, String> {
        let mut mnemonic = [0; 4];
        for byte in mnemonic.iter_mut() {
            *byte = self
                .peek()
                .ok_or_else(|| "Truncated mnemonic at end of input".to_string())?;
            self.bump();
        }

        let entry = opcodes::lookup(&mnemonic).ok_or_else(|| {
            format!(
                "Unrecognized mnemonic \"{}\"",
                String::from_utf8_lossy(&mnemonic)
            )
        })?;
        if entry.opcode == END_OPCODE {
            return Ok(true);
        }

        self.skip_whitespace();
        match entry.shape {
            Shape::Implied => {
                self.write(entry.opcode);
            }
            Shape::Byte | Shape::Branch => {
                let value = self.hex_byte()?;
                self.write(entry.opcode);
                self.write(value);
            }
            Shape::Word => {
                // Four digits in the text, high byte first; emitted
                // little-endian.
                let hi = self.hex_byte()?;
                let lo = self.hex_byte()?;
                self.write(entry.opcode);
                self.write(lo);
                self.write(hi);
            }
        }
        Ok(false)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ') | Some(b'\n') = self.peek() {
            self.bump();
        }
    }

    fn hex_nibble(&mut self) -> Result<u8, String> {
        let byte = self
            .peek()
            .ok_or_else(|| "Malformed hex literal: end of input".to_string())?;
        self.bump();
        match byte {
            b'0'..=b'9' => Ok(byte - 0x30),
            b'A'..=b'F' => Ok(byte - 0x37),
            _ => Err(format!("Malformed hex literal: {:?}", byte as char)),
        }
    }

    fn hex_byte(&mut self) -> Result<u8, String> {
        let hi = self.hex_nibble()?;
        let lo = self.hex_nibble()?;
        Ok(hi << 4 | lo)
    }

    fn hex_word(&mut self) -> Result<u16, String> {
        let hi = self.hex_byte()?;
        let lo = self.hex_byte()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    fn write(&mut self, value: u8) {
        self.assembly.memory[self.out as usize] = value;
        self.assembly.listing.push((self.effective, value));
        self.assembly.written = Some(match self.assembly.written {
            Some((min, max)) => (min.min(self.out), max.max(self.out)),
            None => (self.out, self.out),
        });
        self.out = self.out.wrapping_add(1);
        self.effective = self.effective.wrapping_add(1);
    }
}
