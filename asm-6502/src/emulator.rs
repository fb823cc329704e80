use crate::bus::Bus;
use crate::cpu_6502::{Cpu6502, Halt};

/// Couples the CPU and its memory image into the unit the harness drives:
/// load regions, reset, run to a halt, dump regions. The memory image is
/// owned here for the whole run; loading happens before reset and dumping
/// after the halt.
pub struct Emulator {
    pub cpu: Cpu6502,
}

impl Emulator {
    pub fn new() -> Emulator {
        Emulator {
            cpu: Cpu6502::new(Bus::new()),
        }
    }

    pub fn load(&mut self, address: u16, bytes: &[u8]) {
        self.cpu.bus.load(address, bytes);
    }

    pub fn dump(&self, min: u16, max: u16) -> Vec<u8> {
        self.cpu.bus.dump(min, max)
    }

    pub fn reset(&mut self, start: u16) {
        self.cpu.reset(start);
    }

    pub fn run(&mut self) -> Halt {
        self.cpu.run()
    }

    /// Render the register file for a post-mortem report.
    pub fn registers(&self) -> String {
        format!(
            "PC:{:04X} A:{:02X} X:{:02X} Y:{:02X} S:{:02X} P:{:08b}",
            self.cpu.pc, self.cpu.a, self.cpu.x, self.cpu.y, self.cpu.s, self.cpu.p
        )
    }
}
