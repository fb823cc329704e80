use std::collections::VecDeque;
use std::fmt;

use crate::bus::Bus;
use crate::constants::{memory_range, InterruptVectors, RESET_STACK_POINTER};
use crate::opcodes;

pub mod opcodes_jump;
pub mod opcodes_logical;
pub mod opcodes_move;

#[cfg(test)]
mod test_helpers;

// Test must be after test_helpers, rust format tries to move things around.
#[cfg(test)]
mod test;

use opcodes_jump::*;
use opcodes_logical::*;
use opcodes_move::*;

/// How many instructions of history are kept for the post-mortem trace.
pub const TRACE_RING_LEN: usize = 32;

#[rustfmt::skip]
#[derive(Clone, Copy)]
pub enum StatusFlag {
  Carry            = 0b00000001,
  Zero             = 0b00000010,
  InterruptDisable = 0b00000100,
  Decimal          = 0b00001000,
  Break            = 0b00010000,
  Push             = 0b00100000,
  Overflow         = 0b01000000,
  Negative         = 0b10000000,
}

/// The addressing modes the interpreter knows. This is the subset the
/// catalogue can express, not the full 6502 matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Absolute,         // abs
    AbsoluteIndexedX, // abx
    AbsoluteIndexedY, // aby
    Immediate,        // imm
    Implied,          // imp
    IndirectY,        // izy
    RegisterA,        // acc
    Relative,         // rel
    ZeroPage,         // zp
}

/// Why execution stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// A BRK instruction was executed while BRK-halting was enabled.
    Break,
    /// The program counter entered the trap region.
    Trap { pc: u16 },
    /// The configured instruction cap was reached.
    CycleLimit,
    /// An opcode outside the implemented subset was fetched.
    UndefinedOpcode { pc: u16, opcode: u8 },
}

impl Halt {
    /// Trap and BRK halts are how well-behaved programs finish; the other
    /// variants are runtime errors.
    pub fn is_runtime_error(&self) -> bool {
        matches!(self, Halt::CycleLimit | Halt::UndefinedOpcode { .. })
    }
}

/// One executed instruction, captured before it ran.
#[derive(Clone, Copy)]
pub struct TraceLine {
    pub pc: u16,
    pub bytes: [u8; 3],
    pub len: u8,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub s: u8,
    pub p: u8,
}

impl fmt::Display for TraceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut raw = String::new();
        for i in 0..self.len as usize {
            if i > 0 {
                raw.push(' ');
            }
            raw.push_str(&format!("{:02X}", self.bytes[i]));
        }

        let text = match opcodes::decode(self.bytes[0]) {
            Some(entry) => {
                let operand = match entry.shape.operand_bytes() {
                    0 => String::new(),
                    1 => format!(" {:02X}", self.bytes[1]),
                    _ => format!(" {:04X}", u16::from_le_bytes([self.bytes[1], self.bytes[2]])),
                };
                format!("{}{}", entry.name(), operand)
            }
            None => String::from("????"),
        };

        write!(
            f,
            "{:04X}  {:<8}  {:<9}  A:{:02X} X:{:02X} Y:{:02X} S:{:02X} P:{:08b}",
            self.pc, raw, text, self.a, self.x, self.y, self.s, self.p
        )
    }
}

macro_rules! mode_to_type {
    (abs) => {
        Mode::Absolute
    };
    (abx) => {
        Mode::AbsoluteIndexedX
    };
    (aby) => {
        Mode::AbsoluteIndexedY
    };
    (imm) => {
        Mode::Immediate
    };
    (imp) => {
        Mode::Implied
    };
    (izy) => {
        Mode::IndirectY
    };
    (acc) => {
        Mode::RegisterA
    };
    (rel) => {
        Mode::Relative
    };
    (zp) => {
        Mode::ZeroPage
    };
}

/// Usage:
/// match_opcode!(self, opcode, [
///   { 0x00, brk, imp, 7 },
/// ]);
///
/// Expands to a match that runs the operation and evaluates to true, or
/// false when the opcode is not part of the implemented subset.
macro_rules! match_opcode {
    (
        $self:expr,
        $opcode:expr,
        [
            $({
                $byte:expr,
                $op_name:ident,
                $addressing_mode:ident,
                $cycles:expr
            }),* $(,)?
        ]
    ) => {
        match $opcode {
            $(
                $byte => {
                    $self.cycles += $cycles;
                    $op_name($self, mode_to_type!($addressing_mode));
                    true
                }
            )*
            _ => false,
        }
    };
}

/// The MOS 6502 register file and interpreter for the catalogue subset.
///
/// http://www.6502.org/
/// https://en.wikipedia.org/wiki/MOS_Technology_6502
pub struct Cpu6502 {
    // All memory access goes through the bus.
    pub bus: Bus,
    // "A" register - The accumulator. Typical results of operations are
    // stored here.
    pub a: u8,
    /// "X" index register.
    pub x: u8,
    /// "Y" index register. The self-hosting assembler leans on this one for
    /// its (zp),Y pointer walks.
    pub y: u8,

    /// "PC" - Program counter.
    pub pc: u16,

    /// "S" - Stack pointer.
    ///
    /// Indexes the hardware stack page at 0x0100-0x01FF and grows down.
    pub s: u8,

    /// "P" - Status register.
    ///
    ///   7  bit  0
    /// ---- ----
    /// NVss DIZC
    /// |||| ||||
    /// |||| |||+- Carry
    /// |||| ||+-- Zero
    /// |||| |+--- Interrupt Disable
    /// |||| +---- Decimal
    /// ||++------ No CPU effect, see: the B flag
    /// |+-------- Overflow
    /// +--------- Negative
    ///
    /// Decimal and Interrupt Disable are carried structurally but nothing in
    /// the core programs exercises them.
    pub p: u8,

    /// Accumulated nominal machine cycles, for the trace output only. The
    /// execution cap counts instructions, not cycles.
    pub cycles: u64,

    /// Executed instruction count.
    pub tick_count: u64,

    /// Stop running after this many instructions.
    pub max_ticks: Option<u64>,

    /// Halt when the program counter reaches this address or beyond.
    pub trap_base: Option<u16>,

    /// Treat BRK as a halt instead of taking the interrupt vector.
    pub halt_on_brk: bool,

    /// Print one line per executed instruction.
    pub trace: bool,

    trace_ring: VecDeque<TraceLine>,
    pending_halt: Option<Halt>,
}

impl Cpu6502 {
    pub fn new(bus: Bus) -> Cpu6502 {
        Cpu6502 {
            bus,
            a: 0,
            x: 0,
            y: 0,
            pc: 0,
            s: RESET_STACK_POINTER,
            p: 0,
            cycles: 0,
            tick_count: 0,
            max_ticks: None,
            trap_base: None,
            halt_on_brk: true,
            trace: false,
            trace_ring: VecDeque::with_capacity(TRACE_RING_LEN),
            pending_halt: None,
        }
    }

    /// Put the register file back into the documented power-on state and
    /// start execution at the given address. Memory is left untouched.
    pub fn reset(&mut self, start: u16) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.pc = start;
        self.s = RESET_STACK_POINTER;
        self.p = 0;
        self.cycles = 0;
        self.tick_count = 0;
        self.pending_halt = None;
        self.trace_ring.clear();
    }

    /// Increment the program counter and read the next u8 value following
    /// the current pc.
    fn next_u8(&mut self) -> u8 {
        let value = self.bus.read_u8(self.pc);
        self.pc = self.pc.wrapping_add(1);
        value
    }

    /// Increment the program counter and read the next u16 value following
    /// the current pc.
    fn next_u16(&mut self) -> u16 {
        let value = self.bus.read_u16(self.pc);
        self.pc = self.pc.wrapping_add(2);
        value
    }

    /// Execute instructions until something halts the machine.
    pub fn run(&mut self) -> Halt {
        loop {
            if let Some(halt) = self.step() {
                return halt;
            }
        }
    }

    /// Execute one instruction. Returns the halt reason when execution can
    /// not continue.
    pub fn step(&mut self) -> Option<Halt> {
        if let Some(trap_base) = self.trap_base {
            if self.pc >= trap_base {
                return Some(Halt::Trap { pc: self.pc });
            }
        }
        if let Some(max_ticks) = self.max_ticks {
            if self.tick_count >= max_ticks {
                return Some(Halt::CycleLimit);
            }
        }

        self.record_trace();
        self.tick_count += 1;

        let pc = self.pc;
        let opcode = self.next_u8();
        if !self.dispatch(opcode) {
            return Some(Halt::UndefinedOpcode { pc, opcode });
        }

        self.pending_halt.take()
    }

    fn dispatch(&mut self, opcode: u8) -> bool {
        match_opcode!(self, opcode, [
            { 0x00, brk, imp, 7 },
            { 0x05, ora, zp,  3 },
            { 0x06, asl, zp,  5 },
            { 0x09, ora, imm, 2 },
            { 0x0A, asl, acc, 2 },
            { 0x10, bpl, rel, 2 },
            { 0x18, clc, imp, 2 },
            { 0x20, jsr, abs, 6 },
            { 0x25, and, zp,  3 },
            { 0x29, and, imm, 2 },
            { 0x30, bmi, rel, 2 },
            { 0x38, sec, imp, 2 },
            { 0x48, pha, imp, 3 },
            { 0x4C, jmp, abs, 3 },
            { 0x60, rts, imp, 6 },
            { 0x65, adc, zp,  3 },
            { 0x68, pla, imp, 4 },
            { 0x69, adc, imm, 2 },
            { 0x6D, adc, abs, 4 },
            { 0x84, sty, zp,  3 },
            { 0x85, sta, zp,  3 },
            { 0x86, stx, zp,  3 },
            { 0x88, dey, imp, 2 },
            { 0x8A, txa, imp, 2 },
            { 0x8C, sty, abs, 4 },
            { 0x8D, sta, abs, 4 },
            { 0x8E, stx, abs, 4 },
            { 0x90, bcc, rel, 2 },
            { 0x91, sta, izy, 6 },
            { 0x98, tya, imp, 2 },
            { 0x99, sta, aby, 5 },
            { 0x9A, txs, imp, 2 },
            { 0x9D, sta, abx, 5 },
            { 0xA0, ldy, imm, 2 },
            { 0xA2, ldx, imm, 2 },
            { 0xA4, ldy, zp,  3 },
            { 0xA5, lda, zp,  3 },
            { 0xA6, ldx, zp,  3 },
            { 0xA8, tay, imp, 2 },
            { 0xA9, lda, imm, 2 },
            { 0xAA, tax, imp, 2 },
            { 0xAC, ldy, abs, 4 },
            { 0xAD, lda, abs, 4 },
            { 0xAE, ldx, abs, 4 },
            { 0xB0, bcs, rel, 2 },
            { 0xB1, lda, izy, 5 },
            { 0xB9, lda, aby, 4 },
            { 0xBA, tsx, imp, 2 },
            { 0xBD, lda, abx, 4 },
            { 0xC0, cpy, imm, 2 },
            { 0xC4, cpy, zp,  3 },
            { 0xC5, cmp, zp,  3 },
            { 0xC6, dec, zp,  5 },
            { 0xC8, iny, imp, 2 },
            { 0xC9, cmp, imm, 2 },
            { 0xCA, dex, imp, 2 },
            { 0xD0, bne, rel, 2 },
            { 0xE0, cpx, imm, 2 },
            { 0xE4, cpx, zp,  3 },
            { 0xE5, sbc, zp,  3 },
            { 0xE6, inc, zp,  5 },
            { 0xE8, inx, imp, 2 },
            { 0xE9, sbc, imm, 2 },
            { 0xEA, nop, imp, 2 },
            { 0xED, sbc, abs, 4 },
            { 0xF0, beq, rel, 2 },
        ])
    }

    fn record_trace(&mut self) {
        let pc = self.pc;
        let opcode = self.bus.read_u8(pc);
        let len = opcodes::decode(opcode)
            .map(|entry| entry.shape.encoded_len() as u8)
            .unwrap_or(1);
        let mut bytes = [0; 3];
        for (i, byte) in bytes.iter_mut().enumerate().take(len as usize) {
            *byte = self.bus.read_u8(pc.wrapping_add(i as u16));
        }
        let line = TraceLine {
            pc,
            bytes,
            len,
            a: self.a,
            x: self.x,
            y: self.y,
            s: self.s,
            p: self.p,
        };
        if self.trace {
            println!("{line}");
        }
        if self.trace_ring.len() == TRACE_RING_LEN {
            self.trace_ring.pop_front();
        }
        self.trace_ring.push_back(line);
    }

    /// The most recently executed instructions, oldest first.
    pub fn recent_trace(&self) -> impl Iterator<Item = &TraceLine> {
        self.trace_ring.iter()
    }

    fn get_operand_address(&mut self, mode: Mode) -> u16 {
        match mode {
            // The two bytes after the opcode, little-endian.
            Mode::Absolute => self.next_u16(),
            Mode::AbsoluteIndexedX => {
                let base_address = self.next_u16();
                base_address.wrapping_add(self.x as u16)
            }
            Mode::AbsoluteIndexedY => {
                let base_address = self.next_u16();
                base_address.wrapping_add(self.y as u16)
            }
            // The operand is the byte after the opcode itself, so the
            // address is the current program counter.
            Mode::Immediate => {
                let address = self.pc;
                self.pc = self.pc.wrapping_add(1);
                address
            }
            // The byte after the opcode names a zero-page location holding a
            // 16-bit pointer; Y indexes off that pointer. The pointer's high
            // byte wraps within the zero page.
            Mode::IndirectY => {
                let zero_page_address = self.next_u8();
                let lo = self.bus.read_u8(zero_page_address as u16);
                let hi = self.bus.read_u8(zero_page_address.wrapping_add(1) as u16);
                u16::from_le_bytes([lo, hi]).wrapping_add(self.y as u16)
            }
            // The byte after the opcode is a signed displacement from the
            // program counter already advanced past the instruction.
            Mode::Relative => {
                let relative_offset = self.next_u8() as i8;
                self.pc.wrapping_add(relative_offset as u16)
            }
            Mode::ZeroPage => self.next_u8() as u16,
            Mode::Implied => panic!("An implied mode has no operand address."),
            Mode::RegisterA => panic!("Register A has no address."),
        }
    }

    fn get_operand(&mut self, mode: Mode) -> (u16, u8) {
        let address = self.get_operand_address(mode);
        let value = self.bus.read_u8(address);
        (address, value)
    }

    /// These flags are commonly set together.
    fn update_zero_and_negative_flag(&mut self, value: u8) {
        let negative = 0b1000_0000;
        self.set_status_flag(StatusFlag::Zero, value == 0);
        self.set_status_flag(StatusFlag::Negative, value & negative == negative);
    }

    /// ADC and SBC operate on 9 bits, the 9th being the carry flag.
    fn update_carry_flag(&mut self, result: u16) {
        let carry = 0b1_0000_0000;
        self.set_status_flag(StatusFlag::Carry, result & carry == carry);
    }

    /// Overflow indicates the signed result no longer fits a u8, flipping
    /// the sign bit.
    /// e.g. 0b0111_1111 + 0b0000_0001 = 0b1000_0000
    fn update_overflow_flag(&mut self, operand: u8, result: u8) {
        let bit_7_mask = 0b1000_0000;
        let does_overflow = (
            // Only look at bit 7, the most significant bit.
            bit_7_mask &
            // A and operand have the same MSB.
            !(self.a ^ operand) &
            // A and result have a different MSB.
            (self.a ^ result)
        ) == bit_7_mask;
        self.set_status_flag(StatusFlag::Overflow, does_overflow);
    }

    fn set_status_flag(&mut self, status_flag: StatusFlag, value: bool) {
        if value {
            self.p |= status_flag as u8;
        } else {
            self.p &= !(status_flag as u8);
        }
    }

    fn get_carry(&self) -> u8 {
        self.p & (StatusFlag::Carry as u8)
    }

    pub fn is_status_flag_set(&self, status_flag: StatusFlag) -> bool {
        let flag = status_flag as u8;
        self.p & flag == flag
    }

    fn halt(&mut self, halt: Halt) {
        self.pending_halt = Some(halt);
    }

    /// Push one byte onto the hardware stack page; the stack grows down.
    fn push_stack_u8(&mut self, value: u8) {
        let address = u16::from_le_bytes([self.s, memory_range::STACK_PAGE]);
        self.bus.set_u8(address, value);
        self.s = self.s.wrapping_sub(1);
    }

    fn pull_stack_u8(&mut self) -> u8 {
        self.s = self.s.wrapping_add(1);
        let address = u16::from_le_bytes([self.s, memory_range::STACK_PAGE]);
        self.bus.read_u8(address)
    }

    /// Push high byte first so the value reads back little-endian.
    fn push_stack_u16(&mut self, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.push_stack_u8(hi);
        self.push_stack_u8(lo);
    }

    fn pull_stack_u16(&mut self) -> u16 {
        let lo = self.pull_stack_u8();
        let hi = self.pull_stack_u8();
        u16::from_le_bytes([lo, hi])
    }

    /// The non-halting BRK path: take the IRQ/BRK vector like hardware does.
    fn take_brk_interrupt(&mut self) {
        let return_address = self.pc.wrapping_add(1);
        self.push_stack_u16(return_address);
        self.push_stack_u8(self.p | StatusFlag::Break as u8);
        self.set_status_flag(StatusFlag::InterruptDisable, true);
        self.pc = self.bus.read_u16(InterruptVectors::IrqBrkVector as u16);
    }
}
