use crate::cpu_6502::*;

fn branch(cpu: &mut Cpu6502, mode: Mode, do_branch: bool) {
    // The displacement is consumed either way; only the landing changes.
    let target = cpu.get_operand_address(mode);
    if do_branch {
        cpu.pc = target;
    }
}

/// Branch if plus
/// Function: branch on N=0
/// Flags:
pub fn bpl(cpu: &mut Cpu6502, mode: Mode) {
    branch(cpu, mode, !cpu.is_status_flag_set(StatusFlag::Negative));
}

/// Branch if minus
/// Function: branch on N=1
/// Flags:
pub fn bmi(cpu: &mut Cpu6502, mode: Mode) {
    branch(cpu, mode, cpu.is_status_flag_set(StatusFlag::Negative));
}

/// Branch if Carry Clear
/// Function: branch on C=0
/// Flags:
pub fn bcc(cpu: &mut Cpu6502, mode: Mode) {
    branch(cpu, mode, !cpu.is_status_flag_set(StatusFlag::Carry));
}

/// Branch if Carry Set
/// Function: branch on C=1
/// Flags:
pub fn bcs(cpu: &mut Cpu6502, mode: Mode) {
    branch(cpu, mode, cpu.is_status_flag_set(StatusFlag::Carry));
}

/// Branch if Not Equal
/// Function: branch on Z=0
/// Flags:
pub fn bne(cpu: &mut Cpu6502, mode: Mode) {
    branch(cpu, mode, !cpu.is_status_flag_set(StatusFlag::Zero));
}

/// Branch if Equal
/// Function: branch on Z=1
/// Flags:
pub fn beq(cpu: &mut Cpu6502, mode: Mode) {
    branch(cpu, mode, cpu.is_status_flag_set(StatusFlag::Zero));
}

/// Jump
/// Function: PC:={adr}
/// Flags:
pub fn jmp(cpu: &mut Cpu6502, mode: Mode) {
    let address = cpu.get_operand_address(mode);
    cpu.pc = address;
}

/// Jump to subroutine. The address of the last byte of the JSR instruction
/// is pushed, high byte first; RTS undoes this and adds one.
/// Function: (S)-:=PC-1 PC:={adr}
/// Flags:
pub fn jsr(cpu: &mut Cpu6502, mode: Mode) {
    let address = cpu.get_operand_address(mode);
    let return_address = cpu.pc.wrapping_sub(1);
    cpu.push_stack_u16(return_address);
    cpu.pc = address;
}

/// Return from Sub Routine
/// Function: PC:=+(S)+1
/// Flags:
pub fn rts(cpu: &mut Cpu6502, _mode: Mode) {
    cpu.pc = cpu.pull_stack_u16().wrapping_add(1);
}

/// Break. In halt mode this stops the machine; otherwise it takes the
/// IRQ/BRK vector the way the hardware would.
/// Function: (S)-:=PC,P PC:=($FFFE)
/// Flags: B I
pub fn brk(cpu: &mut Cpu6502, _mode: Mode) {
    if cpu.halt_on_brk {
        cpu.halt(Halt::Break);
    } else {
        cpu.take_brk_interrupt();
    }
}

/// Clear Carry flag
/// Function: C:=0
/// Flags: C
pub fn clc(cpu: &mut Cpu6502, _mode: Mode) {
    cpu.set_status_flag(StatusFlag::Carry, false);
}

/// Set Carry flag
/// Function: C:=1
/// Flags: C
pub fn sec(cpu: &mut Cpu6502, _mode: Mode) {
    cpu.set_status_flag(StatusFlag::Carry, true);
}

/// No operation
/// Function:
/// Flags:
pub fn nop(_cpu: &mut Cpu6502, _mode: Mode) {}
