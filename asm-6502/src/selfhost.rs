//! The assembler, written in its own dialect.
//!
//! This is the single-pass half of the toolchain: a 6502 program that reads
//! resolved source text at $2000 and emits machine code through a relocated
//! output pointer, using the opcode catalogue laid out at $1000. It is the
//! same state machine as [`crate::assembler`], expressed in the dialect so
//! it can assemble itself. Its working set lives in the zero page (see
//! [`crate::constants::zero_page`]).
//!
//! The program makes no attempt to diagnose bad input. The only failure it
//! can notice is running off the end of the catalogue without a match, and
//! it reports that by executing BRK. On the `END ` sentinel it jumps to the
//! fixed hand-off address, where the harness keeps its trap.

use crate::assembler::{self, Assembly};
use crate::constants::{memory_range, HANDOFF_ADDRESS};
use crate::cpu_6502::Halt;
use crate::emulator::Emulator;
use crate::opcodes;
use crate::resolver;

/// Instruction budget for a self-assembly run. Generous: a full run over the
/// assembler's own source needs well under a million instructions.
pub const SELF_ASSEMBLY_CYCLE_CAP: u64 = 10_000_000;

/// The in-dialect assembler, in friendly form. The leading `!`/`@` pair
/// places the code at effective $0200 and the output at $8000.
///
/// Zero page layout: $F0 source cursor, $F2 output pointer, $F4 effective
/// address, $F6 relocation base (16-bit little-endian pairs each), $E0-$E3
/// mnemonic buffer, $E4 opcode, $E5 shape, $E6/$E7 operand low/high,
/// $E8 table cursor, $EA hex scratch.
pub const SOURCE: &str = r#"
; The single-pass assembler for the resolved form, in its own dialect.
!7E00
@0200

; Point the source cursor at $2000 and clear the output, effective and
; base pointers.
START:  LDA# 00
        STAZ F0
        LDA# 20
        STAZ F1
        LDA# 00
        STAZ F2
        STAZ F3
        STAZ F4
        STAZ F5
        STAZ F6
        STAZ F7

; Dispatch on the byte under the source cursor.
MAIN:   LDY# 00
        LDIY F0
        CMP# 21         ; '!'
        BNE :M1
        JMP :DOBASE
M1:     CMP# 40         ; '@'
        BNE :M2
        JMP :DOORG
M2:     CMP# 23         ; '#'
        BNE :M3
        JMP :DOBYTE
M3:     CMP# 22         ; '"'
        BNE :M4
        JMP :DOTEXT
M4:     CMP# 20         ; space
        BEQ :MSKIP
        CMP# 0A         ; newline
        BEQ :MSKIP
        JMP :DOMNEM
MSKIP:  JSR :NEXTSRC
        JMP :MAIN

; ! - four hex digits, high byte first, into the relocation base.
; The output pointer is not moved.
DOBASE: JSR :NEXTSRC
        JSR :HEXBYTE
        STAZ F7
        JSR :HEXBYTE
        STAZ F6
        JMP :MAIN

; @ - four hex digits into the effective address, then
; output = effective + base.
DOORG:  JSR :NEXTSRC
        JSR :HEXBYTE
        STAZ F5
        JSR :HEXBYTE
        STAZ F4
        CLC
        LDAZ F4
        ADCZ F6
        STAZ F2
        LDAZ F5
        ADCZ F7
        STAZ F3
        JMP :MAIN

; # - emit one literal byte.
DOBYTE: JSR :NEXTSRC
        JSR :HEXBYTE
        JSR :EMIT
        JMP :MAIN

; " - copy bytes through until the closing quote.
DOTEXT: JSR :NEXTSRC
TLOOP:  LDY# 00
        LDIY F0
        CMP# 22
        BEQ :TDONE
        JSR :EMIT
        JSR :NEXTSRC
        JMP :TLOOP
TDONE:  JSR :NEXTSRC
        JMP :MAIN

; Anything else starts a mnemonic: four bytes into the buffer, then a
; linear scan of the catalogue records.
DOMNEM: STAZ E0
        JSR :NEXTSRC
        LDY# 00
        LDIY F0
        STAZ E1
        JSR :NEXTSRC
        LDY# 00
        LDIY F0
        STAZ E2
        JSR :NEXTSRC
        LDY# 00
        LDIY F0
        STAZ E3
        JSR :NEXTSRC
        LDA# 00
        STAZ E8
        LDA# 10
        STAZ E9
SCAN:   LDY# 00
        LDIY E8
        BNE :SCMP
        BRK             ; ran off the table: no such mnemonic
SCMP:   CMPZ E0
        BNE :SNEXT
        LDY# 01
        LDIY E8
        CMPZ E1
        BNE :SNEXT
        LDY# 02
        LDIY E8
        CMPZ E2
        BNE :SNEXT
        LDY# 03
        LDIY E8
        CMPZ E3
        BNE :SNEXT
        LDY# 04
        LDIY E8
        STAZ E4
        LDY# 05
        LDIY E8
        STAZ E5
        JMP :FOUND
SNEXT:  CLC
        LDAZ E8
        ADC# 06
        STAZ E8
        LDAZ E9
        ADC# 00
        STAZ E9
        JMP :SCAN

; The sentinel hands the machine back to the caller; otherwise emit per
; the entry's shape.
FOUND:  LDAZ E4
        CMP# FF
        BNE :NOTEND
        JMP 9000
NOTEND: LDAZ E5
        BNE :FBYTE
        LDAZ E4
        JSR :EMIT
        JMP :MAIN
FBYTE:  CMP# 02
        BEQ :FWORD
        JSR :SKIPWS
        JSR :HEXBYTE
        STAZ E6
        LDAZ E4
        JSR :EMIT
        LDAZ E6
        JSR :EMIT
        JMP :MAIN
FWORD:  JSR :SKIPWS
        JSR :HEXBYTE
        STAZ E7
        JSR :HEXBYTE
        STAZ E6
        LDAZ E4
        JSR :EMIT
        LDAZ E6
        JSR :EMIT
        LDAZ E7
        JSR :EMIT
        JMP :MAIN

; Advance the 16-bit source cursor.
NEXTSRC: INCZ F0
        BNE :NS1
        INCZ F1
NS1:    RTS

; Write A through the output pointer and advance both the output and the
; effective-address pointers.
EMIT:   LDY# 00
        STIY F2
        INCZ F2
        BNE :EM1
        INCZ F3
EM1:    INCZ F4
        BNE :EM2
        INCZ F5
EM2:    RTS

; Step the cursor past spaces and newlines.
SKIPWS: LDY# 00
        LDIY F0
        CMP# 20
        BEQ :WSADV
        CMP# 0A
        BEQ :WSADV
        RTS
WSADV:  JSR :NEXTSRC
        JMP :SKIPWS

; Two hex digits into one byte, high nibble first.
HEXBYTE: JSR :HEXNIB
        ASLA
        ASLA
        ASLA
        ASLA
        STAZ EA
        JSR :HEXNIB
        ORAZ EA
        RTS

; One hex digit to a nibble: subtract $37 at 'A' and above, else $30.
HEXNIB: LDY# 00
        LDIY F0
        JSR :NEXTSRC
        CMP# 41
        BCC :HDIG
        SBC# 37
        RTS
HDIG:   SEC
        SBC# 30
        RTS

END
"#;

/// The in-dialect source in resolved (punch) form.
pub fn resolved_source() -> Result<String, String> {
    resolver::resolve(SOURCE).map_err(|error| error.to_string())
}

/// The reference path: assemble the resolved source in-process. The image
/// lands at the output region, offset from its effective addresses by the
/// program's own `!` base.
pub fn reference_assembly() -> Result<Assembly, String> {
    assembler::assemble(&resolved_source()?)
}

/// The self-hosting path: load an image of the in-dialect assembler at the
/// code origin, the catalogue and the resolved text at their conventional
/// regions, and run until the hand-off trap. The caller dumps the output
/// region from the returned emulator.
pub fn run_on_emulator(image: &[u8], resolved: &str) -> Result<Emulator, String> {
    let mut emulator = Emulator::new();
    emulator.load(memory_range::CODE.min, image);
    emulator.load(memory_range::OPCODE_TABLE.min, &opcodes::table_image());
    emulator.load(memory_range::SOURCE.min, resolved.as_bytes());
    emulator.reset(memory_range::CODE.min);
    emulator.cpu.trap_base = Some(HANDOFF_ADDRESS);
    emulator.cpu.max_ticks = Some(SELF_ASSEMBLY_CYCLE_CAP);

    match emulator.run() {
        Halt::Trap { .. } => Ok(emulator),
        halt => Err(format!("Self-hosted assembly stopped abnormally: {:?}", halt)),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn the_program_fits_its_conventional_regions() {
        let resolved = resolved_source().unwrap();
        let source_region =
            (memory_range::SOURCE.max - memory_range::SOURCE.min + 1) as usize;
        assert!(
            resolved.len() <= source_region,
            "resolved source is {} bytes, the region holds {}",
            resolved.len(),
            source_region
        );

        let assembly = reference_assembly().unwrap();
        assert_eq!(assembly.origin(), Some(memory_range::OUTPUT.min));
        let output_region =
            (memory_range::OUTPUT.max - memory_range::OUTPUT.min + 1) as usize;
        assert!(assembly.image().len() <= output_region);
    }

    #[test]
    fn the_table_region_holds_the_catalogue() {
        let table = opcodes::table_image();
        let region =
            (memory_range::OPCODE_TABLE.max - memory_range::OPCODE_TABLE.min + 1) as usize;
        assert!(table.len() <= region);
    }

    #[test]
    fn the_code_region_holds_the_program() {
        let assembly = reference_assembly().unwrap();
        let code_region = (memory_range::CODE.max - memory_range::CODE.min + 1) as usize;
        assert!(assembly.image().len() <= code_region);
    }
}
