use crate::cpu_6502::*;

/// Apply the logical "or" operator on the accumulator.
/// Function: A:=A or {adr}
/// Flags: N Z
pub fn ora(cpu: &mut Cpu6502, mode: Mode) {
    let (_, operand) = cpu.get_operand(mode);
    cpu.a |= operand;
    cpu.update_zero_and_negative_flag(cpu.a);
}

/// Apply the logical "and" operator on the accumulator.
/// Function: A:=A&{adr}
/// Flags: N Z
pub fn and(cpu: &mut Cpu6502, mode: Mode) {
    let (_, operand) = cpu.get_operand(mode);
    cpu.a &= operand;
    cpu.update_zero_and_negative_flag(cpu.a);
}

/// Arithmetic shift left, on the accumulator or a memory location.
/// Function: {adr}:={adr}*2
/// Flags: N Z C
pub fn asl(cpu: &mut Cpu6502, mode: Mode) {
    if mode == Mode::RegisterA {
        cpu.set_status_flag(StatusFlag::Carry, cpu.a & 0b1000_0000 != 0);
        cpu.a <<= 1;
        cpu.update_zero_and_negative_flag(cpu.a);
        return;
    }
    let (address, operand) = cpu.get_operand(mode);
    cpu.set_status_flag(StatusFlag::Carry, operand & 0b1000_0000 != 0);
    let result = operand << 1;
    cpu.update_zero_and_negative_flag(result);
    cpu.bus.set_u8(address, result);
}

fn add_impl(cpu: &mut Cpu6502, operand: u8) {
    // Work in u16 space so the 9th bit lands in the result rather than
    // wrapping away.
    let result_u16 = cpu.get_carry() as u16 + cpu.a as u16 + operand as u16;
    let result_u8 = result_u16 as u8;

    cpu.update_zero_and_negative_flag(result_u8);
    cpu.update_carry_flag(result_u16);
    cpu.update_overflow_flag(operand, result_u8);
    cpu.a = result_u8;
}

/// Add with Carry
/// Function: A:=A+{adr}+C
/// Flags: N V Z C
pub fn adc(cpu: &mut Cpu6502, mode: Mode) {
    let (_, operand) = cpu.get_operand(mode);
    add_impl(cpu, operand);
}

/// Subtract with Carry
/// Function: A:=A-{adr}+C
/// Flags: N V Z C
pub fn sbc(cpu: &mut Cpu6502, mode: Mode) {
    let (_, operand) = cpu.get_operand(mode);
    // Subtraction is addition of the inverted operand, with the carry flag
    // supplying the +1 of the two's complement. Callers are expected to SEC
    // before a lone subtract.
    add_impl(cpu, !operand);
}

/// Compare A with source
/// http://6502.org/tutorials/compare_instructions.html
/// Function: A-{adr}
/// Flags: N Z C
pub fn cmp(cpu: &mut Cpu6502, mode: Mode) {
    let (_, operand) = cpu.get_operand(mode);
    cpu.update_zero_and_negative_flag(cpu.a.wrapping_sub(operand));
    cpu.set_status_flag(StatusFlag::Carry, cpu.a >= operand);
}

/// Compare X with source
/// Function: X-{adr}
/// Flags: N Z C
pub fn cpx(cpu: &mut Cpu6502, mode: Mode) {
    let (_, operand) = cpu.get_operand(mode);
    cpu.update_zero_and_negative_flag(cpu.x.wrapping_sub(operand));
    cpu.set_status_flag(StatusFlag::Carry, cpu.x >= operand);
}

/// Compare Y with source
/// Function: Y-{adr}
/// Flags: N Z C
pub fn cpy(cpu: &mut Cpu6502, mode: Mode) {
    let (_, operand) = cpu.get_operand(mode);
    cpu.update_zero_and_negative_flag(cpu.y.wrapping_sub(operand));
    cpu.set_status_flag(StatusFlag::Carry, cpu.y >= operand);
}

/// Increment the address
/// Function: {adr}:={adr}+1
/// Flags: N Z
pub fn inc(cpu: &mut Cpu6502, mode: Mode) {
    let (address, operand) = cpu.get_operand(mode);
    let result = operand.wrapping_add(1);
    cpu.update_zero_and_negative_flag(result);
    cpu.bus.set_u8(address, result);
}

/// Decrement at an address
/// Function: {adr}:={adr}-1
/// Flags: N Z
pub fn dec(cpu: &mut Cpu6502, mode: Mode) {
    let (address, operand) = cpu.get_operand(mode);
    let result = operand.wrapping_sub(1);
    cpu.update_zero_and_negative_flag(result);
    cpu.bus.set_u8(address, result);
}

/// Increment X
/// Function: X:=X+1
/// Flags: N Z
pub fn inx(cpu: &mut Cpu6502, _mode: Mode) {
    cpu.x = cpu.x.wrapping_add(1);
    cpu.update_zero_and_negative_flag(cpu.x);
}

/// Increment Y
/// Function: Y:=Y+1
/// Flags: N Z
pub fn iny(cpu: &mut Cpu6502, _mode: Mode) {
    cpu.y = cpu.y.wrapping_add(1);
    cpu.update_zero_and_negative_flag(cpu.y);
}

/// Decrement X
/// Function: X:=X-1
/// Flags: N Z
pub fn dex(cpu: &mut Cpu6502, _mode: Mode) {
    cpu.x = cpu.x.wrapping_sub(1);
    cpu.update_zero_and_negative_flag(cpu.x);
}

/// Decrement Y
/// Function: Y:=Y-1
/// Flags: N Z
pub fn dey(cpu: &mut Cpu6502, _mode: Mode) {
    cpu.y = cpu.y.wrapping_sub(1);
    cpu.update_zero_and_negative_flag(cpu.y);
}
