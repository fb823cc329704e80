//! The equivalence harness: for the same resolved input, the reference
//! assembler and the self-hosting assembler executed on the emulator must
//! produce byte-identical output.

use asm_6502::constants::memory_range;
use asm_6502::resolver;
use asm_6502::{assembler, selfhost};

/// Run one resolved text through both paths and compare every byte of the
/// output region.
fn assert_both_paths_agree(resolved: &str) {
    let reference = assembler::assemble(resolved).unwrap();

    let image = selfhost::reference_assembly().unwrap();
    let emulator = selfhost::run_on_emulator(image.image(), resolved).unwrap();

    let min = memory_range::OUTPUT.min;
    let max = memory_range::OUTPUT.max;
    let emulated = emulator.dump(min, max);
    for (offset, byte) in emulated.iter().enumerate() {
        let address = min + offset as u16;
        assert_eq!(
            *byte,
            reference.read(address),
            "output differs at {:04X}",
            address
        );
    }
}

#[test]
fn small_programs_assemble_identically_on_both_paths() {
    // Each input relocates its output into the output region so the
    // self-hosting run does not write over its own code.
    assert_both_paths_agree("!7E00\n@0200\nLDA# 2A\nSTAZ 80\nBRK \nEND \n");
    assert_both_paths_agree(
        "!7E00\n@0200\nLDA# 00\nSTAZ 80\nINCZ 80\nLDAZ 80\nCMP# 0A\nBNE  F8\nBRK \nEND \n",
    );
    assert_both_paths_agree("!7C00\n@0400\n\"HI\"\n#FF\nEND \n");
    assert_both_paths_agree("!7E00\n@0200\nJSR  0234\nJMP  0200\nRTS \nEND \n");
    assert_both_paths_agree("!7E00\n@0200\n\"\"\n#01\nEND \n");
}

#[test]
fn the_assembler_assembles_itself() {
    // Reference-assemble the in-dialect assembler...
    let resolved = selfhost::resolved_source().unwrap();
    let reference = selfhost::reference_assembly().unwrap();
    assert_eq!(reference.origin(), Some(memory_range::OUTPUT.min));

    // ...then have that image assemble its own source on the emulator.
    let emulator = selfhost::run_on_emulator(reference.image(), &resolved).unwrap();

    let min = memory_range::OUTPUT.min;
    let max = memory_range::OUTPUT.max;
    let emulated = emulator.dump(min, max);
    let mut mismatches = 0;
    for (offset, byte) in emulated.iter().enumerate() {
        let address = min + offset as u16;
        if *byte != reference.read(address) {
            mismatches += 1;
        }
    }
    assert_eq!(mismatches, 0, "the two assembly paths diverged");

    // The self-assembled product is the very image we started from.
    let limit = reference.limit().unwrap();
    assert_eq!(
        emulator.dump(min, limit),
        reference.image(),
        "the fixed point is not byte-identical"
    );
}

#[test]
fn the_resolved_source_length_matches_the_prefix_invariant() {
    // The emitted byte count equals the sum of the encoded unit lengths for
    // every line prefix of the resolved source.
    let resolved = selfhost::resolved_source().unwrap();
    let mut text = String::new();
    let mut expected = 0;
    for line in resolved.lines() {
        text.push_str(line);
        text.push('\n');
        expected += match line.as_bytes().first() {
            None | Some(b'!') | Some(b'@') => 0,
            Some(b'#') => 1,
            Some(b'"') => line.len() - 2,
            Some(_) => {
                let mut mnemonic = [0; 4];
                mnemonic.copy_from_slice(&line.as_bytes()[..4]);
                let entry = asm_6502::opcodes::lookup(&mnemonic).unwrap();
                if entry.opcode == asm_6502::opcodes::END_OPCODE {
                    0
                } else {
                    entry.shape.encoded_len() as usize
                }
            }
        };
        let assembly = assembler::assemble(&text).unwrap();
        assert_eq!(assembly.listing().len(), expected, "prefix ending {:?}", line);
    }
}

#[test]
fn resolving_is_idempotent_over_the_punch_form() {
    // The resolved form contains no labels or comments, so resolving it
    // again reproduces it exactly.
    let resolved = selfhost::resolved_source().unwrap();
    let again = resolver::resolve(&resolved).unwrap();
    assert_eq!(resolved, again);
}
