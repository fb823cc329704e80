use super::test_helpers::*;
use super::*;
use crate::emulator::Emulator;

macro_rules! register_a {
    ($name:ident, $text:expr, $a:expr, $p:expr) => {
        #[test]
        fn $name() {
            assert_register_a($text, $a, $p);
        }
    };
}

macro_rules! register_x {
    ($name:ident, $text:expr, $x:expr, $p:expr) => {
        #[test]
        fn $name() {
            assert_register_x($text, $x, $p);
        }
    };
}

macro_rules! register_y {
    ($name:ident, $text:expr, $y:expr, $p:expr) => {
        #[test]
        fn $name() {
            assert_register_y($text, $y, $p);
        }
    };
}

#[rustfmt::skip]
mod imm {
    use super::*;
    use StatusFlag::*;

    // All flags are clear after a reset.
    const P: u8 = 0;

    const C: u8 = Carry as u8;
    const Z: u8 = Zero as u8;
    const V: u8 = Overflow as u8;
    const N: u8 = Negative as u8;

    register_a!(test_lda, "LDA# 22", 0x22, P);
    register_a!(test_lda_zero, "LDA# 00", 0x00, P | Z);
    register_a!(test_lda_negative, "LDA# 80", 0x80, P | N);
    register_x!(test_ldx, "LDX# 22", 0x22, P);
    register_y!(test_ldy, "LDY# 22", 0x22, P);

    register_a!(test_adc1, "LDA# 22\nADC# 11", 0x33, P);
    register_a!(test_adc2, "LDA# FF\nADC# 00", 0xFF, P | N);
    register_a!(test_adc_carry, "SEC\nLDA# 11\nADC# 22", 0x34, P);

    mod adc_overflow_carry {
        // These are the adc cases from:
        // http://www.6502.org/tutorials/vflag.html
        use super::*;
        register_a!(test_1_1, "CLC\nLDA# 01\nADC# 01", 0x02, P);
        register_a!(test_1_neg1, "CLC\nLDA# 01\nADC# FF", 0x00, P | C | Z);
        register_a!(test_127_1, "CLC\nLDA# 7F\nADC# 01", 0x80, P | V | N);
        register_a!(test_neg128_neg1, "CLC\nLDA# 80\nADC# FF", 0x7F, P | C | V);
        register_a!(test_carry_in, "SEC\nLDA# 3F\nADC# 40", 0x80, P | V | N);
    }

    mod sbc_overflow_carry {
        // The sbc cases from the same tutorial.
        use super::*;
        register_a!(test_0_minus_1, "SEC\nLDA# 00\nSBC# 01", 0xFF, P | N);
        register_a!(test_neg128_minus_1, "SEC\nLDA# 80\nSBC# 01", 0x7F, P | C | V);
        register_a!(test_127_minus_neg1, "SEC\nLDA# 7F\nSBC# FF", 0x80, P | V | N);
        register_a!(test_clc_borrow, "CLC\nLDA# C0\nSBC# 40", 0x7F, P | C | V);
    }

    register_a!(test_sbc1, "SEC\nLDA# 33\nSBC# 11", 0x22, P | C);
    register_a!(test_sbc2, "SEC\nLDA# 33\nSBC# 33", 0x00, P | Z | C);

    register_a!(test_ora, "LDA# 0F\nORA# F0", 0xFF, P | N);
    register_a!(test_and, "LDA# AA\nAND# F0", 0xA0, P | N);
    register_a!(test_asl, "LDA# 81\nASLA", 0x02, P | C);

    register_a!(test_cmp_equal, "LDA# 10\nCMP# 10", 0x10, P | Z | C);
    register_a!(test_cmp_greater, "LDA# 10\nCMP# 0F", 0x10, P | C);
    register_a!(test_cmp_less, "LDA# 10\nCMP# 11", 0x10, P | N);
    register_x!(test_cpx, "LDX# 05\nCPX# 05", 0x05, P | Z | C);
    register_y!(test_cpy, "LDY# 05\nCPY# 06", 0x05, P | N);

    register_x!(test_inx, "LDX# FF\nINX", 0x00, P | Z);
    register_y!(test_iny, "LDY# 7F\nINY", 0x80, P | N);
    register_x!(test_dex, "LDX# 01\nDEX", 0x00, P | Z);
    register_y!(test_dey, "LDY# 00\nDEY", 0xFF, P | N);

    register_x!(test_tax, "LDA# 44\nTAX", 0x44, P);
    register_a!(test_txa, "LDX# 45\nTXA", 0x45, P);
    register_y!(test_tay, "LDA# 46\nTAY", 0x46, P);
    register_a!(test_tya, "LDY# 47\nTYA", 0x47, P);
    register_x!(test_tsx, "TSX", 0xFD, P | N);

    register_a!(test_pha_pla, "LDA# 5A\nPHA\nLDA# 00\nPLA", 0x5A, P);
    register_a!(test_nop, "NOP\nLDA# 13", 0x13, P);
}

#[test]
fn zero_page_loads_and_stores() {
    let emulator = run_snippet("LDA# 2A\nSTAZ 80\nLDA# 00\nLDAZ 80");
    assert_eq!(emulator.cpu.a, 0x2A);
    assert_eq!(emulator.cpu.bus.read_u8(0x0080), 0x2A);
}

#[test]
fn absolute_loads_and_stores() {
    let emulator = run_snippet("LDX# 99\nSTX  0300\nLDA  0300");
    assert_eq!(emulator.cpu.a, 0x99);
    assert_eq!(emulator.cpu.bus.read_u8(0x0300), 0x99);
}

#[test]
fn absolute_indexed_stores() {
    let emulator = run_snippet("LDY# 02\nLDA# 07\nSTAY 0300\nLDX# 03\nLDA# 08\nSTAX 0300");
    assert_eq!(emulator.cpu.bus.read_u8(0x0302), 0x07);
    assert_eq!(emulator.cpu.bus.read_u8(0x0303), 0x08);
}

#[test]
fn zero_page_increments_and_decrements() {
    let emulator = run_snippet("LDA# 05\nSTAZ 10\nINCZ 10\nINCZ 10\nDECZ 10");
    assert_eq!(emulator.cpu.bus.read_u8(0x0010), 0x06);
}

#[test]
fn zero_page_shift_carries_out_the_high_bit() {
    let emulator = run_snippet("LDA# C1\nSTAZ 10\nASLZ 10");
    assert_eq!(emulator.cpu.bus.read_u8(0x0010), 0x82);
    assert!(emulator.cpu.is_status_flag_set(StatusFlag::Carry));
}

#[test]
fn indirect_indexed_by_y_walks_a_pointer() {
    // Pointer at $10 -> $0300; write and read back through it at Y=2.
    let emulator = run_snippet(
        "LDA# 00\nSTAZ 10\nLDA# 03\nSTAZ 11\nLDY# 02\nLDA# AA\nSTIY 10\nLDA# 00\nLDIY 10",
    );
    assert_eq!(emulator.cpu.bus.read_u8(0x0302), 0xAA);
    assert_eq!(emulator.cpu.a, 0xAA);
}

#[test]
fn jsr_pushes_the_return_address_and_rts_resumes() {
    let emulator = run_program(
        "@0200\nJSR :SUB\nLDA# 01\nBRK\nSUB: LDX# 05\nRTS\nEND\n",
    );
    assert_eq!(emulator.cpu.x, 0x05);
    assert_eq!(emulator.cpu.a, 0x01);
    // The stack is balanced again after the return.
    assert_eq!(emulator.cpu.s, 0xFD);
}

#[test]
fn a_counter_loop_with_a_backward_branch_terminates() {
    let emulator = run_program(
        "
        @0200
        LDA# 00
        STAZ 80
        L:
        INCZ 80
        LDAZ 80
        CMP# 0A
        BNE :L
        BRK
        END
        ",
    );
    assert_eq!(emulator.cpu.bus.read_u8(0x0080), 0x0A);
}

#[test]
fn forward_branches_skip_over_code() {
    let emulator = run_program(
        "@0200\nLDA# 01\nBNE :SKIP\nLDA# FF\nSKIP: BRK\nEND\n",
    );
    assert_eq!(emulator.cpu.a, 0x01);
}

#[test]
fn undefined_opcodes_halt_and_report() {
    let mut emulator = Emulator::new();
    // 0x02 is not part of the implemented subset.
    emulator.load(0x0200, &[0x02]);
    emulator.reset(0x0200);
    assert_eq!(
        emulator.run(),
        Halt::UndefinedOpcode {
            pc: 0x0200,
            opcode: 0x02
        }
    );
}

#[test]
fn the_cycle_cap_stops_a_runaway_program() {
    let mut emulator = Emulator::new();
    // An infinite loop: JMP $0200.
    emulator.load(0x0200, &[0x4C, 0x00, 0x02]);
    emulator.reset(0x0200);
    emulator.cpu.max_ticks = Some(1000);
    assert_eq!(emulator.run(), Halt::CycleLimit);
    assert_eq!(emulator.cpu.tick_count, 1000);
}

#[test]
fn the_trap_region_halts_when_entered() {
    let mut emulator = Emulator::new();
    // JMP $9000 into the trap region.
    emulator.load(0x0200, &[0x4C, 0x00, 0x90]);
    emulator.reset(0x0200);
    emulator.cpu.trap_base = Some(0x9000);
    assert_eq!(emulator.run(), Halt::Trap { pc: 0x9000 });
}

#[test]
fn the_trace_ring_remembers_recent_instructions() {
    let mut emulator = Emulator::new();
    emulator.load(0x0200, &[0xA9, 0x2A, 0x00]);
    emulator.reset(0x0200);
    assert_eq!(emulator.run(), Halt::Break);
    let lines: Vec<String> = emulator
        .cpu
        .recent_trace()
        .map(|line| line.to_string())
        .collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("0200  A9 2A"));
    assert!(lines[0].contains("LDA# 2A"));
    assert!(lines[1].starts_with("0202  00"));
    assert!(lines[1].contains("BRK"));
}
