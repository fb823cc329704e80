use crate::assembler;
use crate::cpu_6502::{Halt, StatusFlag};
use crate::emulator::Emulator;
use crate::resolver;

/// Resolve and assemble a friendly dialect program, load it at its origin,
/// and run it until it halts via BRK.
pub fn run_program(text: &str) -> Emulator {
    let resolved = match resolver::resolve(text) {
        Ok(resolved) => resolved,
        Err(error) => panic!("{}", error.nice_message()),
    };
    let assembly = assembler::assemble(&resolved).unwrap();
    let origin = assembly.origin().expect("the program emitted no bytes");

    let mut emulator = Emulator::new();
    emulator.load(origin, assembly.image());
    emulator.reset(origin);
    emulator.cpu.max_ticks = Some(100_000);

    let halt = emulator.run();
    assert_eq!(halt, Halt::Break, "expected the program to halt via BRK");
    emulator
}

/// Run a snippet with the standard origin, halt and sentinel wrapped on.
pub fn run_snippet(body: &str) -> Emulator {
    run_program(&format!("@0200\n{}\nBRK\nEND\n", body))
}

pub fn assert_status(emulator: &Emulator, expected: u8) {
    let cpu = &emulator.cpu;
    if cpu.p == expected {
        return;
    }
    let mut report = String::new();
    let flags = [
        ("Carry", StatusFlag::Carry),
        ("Zero", StatusFlag::Zero),
        ("InterruptDisable", StatusFlag::InterruptDisable),
        ("Decimal", StatusFlag::Decimal),
        ("Break", StatusFlag::Break),
        ("Push", StatusFlag::Push),
        ("Overflow", StatusFlag::Overflow),
        ("Negative", StatusFlag::Negative),
    ];
    for (name, flag) in flags {
        let expected_flag = expected & flag as u8 == flag as u8;
        let actual_flag = cpu.is_status_flag_set(flag);
        if expected_flag != actual_flag {
            report.push_str(&format!(
                "Expected StatusFlag::{} to be {} but received {}\n",
                name, expected_flag, actual_flag
            ));
        }
    }
    panic!(
        "\nExpected cpu status 0b{:08b} to match 0b{:08b}\n{}",
        cpu.p, expected, report
    );
}

pub fn assert_register_a(text: &str, value: u8, status: u8) {
    let emulator = run_snippet(text);
    if emulator.cpu.a != value {
        panic!(
            "\n{}\nExpected register A to be {:#x} ({:#b}) but it was {:#x} ({:#b})",
            text, value, value, emulator.cpu.a, emulator.cpu.a
        );
    }
    assert_status(&emulator, status);
}

pub fn assert_register_x(text: &str, value: u8, status: u8) {
    let emulator = run_snippet(text);
    if emulator.cpu.x != value {
        panic!(
            "\n{}\nExpected register X to be {:#x} ({:#b}) but it was {:#x} ({:#b})",
            text, value, value, emulator.cpu.x, emulator.cpu.x
        );
    }
    assert_status(&emulator, status);
}

pub fn assert_register_y(text: &str, value: u8, status: u8) {
    let emulator = run_snippet(text);
    if emulator.cpu.y != value {
        panic!(
            "\n{}\nExpected register Y to be {:#x} ({:#b}) but it was {:#x} ({:#b})",
            text, value, value, emulator.cpu.y, emulator.cpu.y
        );
    }
    assert_status(&emulator, status);
}
