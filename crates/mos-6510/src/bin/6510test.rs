//! Klaus Dormann 6502 test suite runner.
//!
//! Runs the functional or decimal suite against the CPU core. Binaries
//! are not checked in; assemble them from
//! <https://github.com/Klaus2m5/6502_65C02_functional_tests> and pass
//! the path on the command line.
//!
//! - Functional: loaded at $0000, started at $0400, passes at PC $3469.
//! - Decimal (`--decimal`): loaded at $0200, started at $0200, finishes
//!   at PC $024B with the error flag at $000B equal to zero.
//!
//! A trap (PC stuck on itself) means a failed test case.

use emu_core::{Cpu, RamBus};
use mos_6510::Mos6510;
use std::fs;
use std::process::ExitCode;

const FUNCTIONAL_LOAD: u16 = 0x0000;
const FUNCTIONAL_START: u16 = 0x0400;
const FUNCTIONAL_SUCCESS: u16 = 0x3469;

const DECIMAL_LOAD: u16 = 0x0200;
const DECIMAL_START: u16 = 0x0200;
const DECIMAL_DONE: u16 = 0x024B;
const DECIMAL_ERROR_FLAG: u16 = 0x000B;

/// Generous upper bound; the functional suite needs ~96M cycles.
const MAX_CYCLES: u64 = 200_000_000;

fn main() -> ExitCode {
    let mut decimal = false;
    let mut path = None;
    for arg in std::env::args().skip(1) {
        if arg == "--decimal" {
            decimal = true;
        } else {
            path = Some(arg);
        }
    }
    let path = path.unwrap_or_else(|| {
        if decimal {
            "test-roms/6502_decimal_test.bin".to_string()
        } else {
            "test-roms/6502_functional_test.bin".to_string()
        }
    });

    let image = match fs::read(&path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Failed to load test binary {path}: {e}");
            eprintln!();
            eprintln!("Assemble the Dormann suites from");
            eprintln!("https://github.com/Klaus2m5/6502_65C02_functional_tests");
            eprintln!("and pass the binary path, e.g.:");
            eprintln!("  cargo run -p mos-6510 --bin 6510test -- path/to/test.bin");
            return ExitCode::FAILURE;
        }
    };

    let (load, start) = if decimal {
        (DECIMAL_LOAD, DECIMAL_START)
    } else {
        (FUNCTIONAL_LOAD, FUNCTIONAL_START)
    };

    println!(
        "Running Dormann {} test: {path} ({} bytes)",
        if decimal { "decimal" } else { "functional" },
        image.len()
    );

    let mut cpu = Mos6510::new();
    let mut bus = RamBus::new();
    bus.load(load, &image);
    cpu.set_pc(start);
    cpu.set_sp(0xFD);
    cpu.set_status(0x24);

    let mut last_pc = cpu.pc();
    let mut stuck = 0u32;
    let mut total_cycles = 0u64;
    let mut instructions = 0u64;
    let started = std::time::Instant::now();

    loop {
        total_cycles += u64::from(cpu.step(&mut bus));
        instructions += 1;

        if decimal && cpu.pc() == DECIMAL_DONE {
            let error = bus.peek(DECIMAL_ERROR_FLAG);
            if error == 0 {
                println!("SUCCESS: decimal test passed ({instructions} instructions)");
                return ExitCode::SUCCESS;
            }
            println!("FAILED: decimal error flag = ${error:02X}");
            return ExitCode::FAILURE;
        }
        if !decimal && cpu.pc() == FUNCTIONAL_SUCCESS {
            let elapsed = started.elapsed();
            println!("SUCCESS: functional test passed");
            println!("  instructions: {instructions}");
            println!("  cycles:       {total_cycles}");
            println!(
                "  speed:        {:.2} MHz emulated",
                total_cycles as f64 / elapsed.as_secs_f64() / 1_000_000.0
            );
            return ExitCode::SUCCESS;
        }

        if cpu.pc() == last_pc {
            stuck += 1;
            if stuck >= 3 {
                println!("TRAP at PC=${:04X}", cpu.pc());
                println!(
                    "  A=${:02X} X=${:02X} Y=${:02X} SP=${:02X} P=${:02X}",
                    cpu.a(),
                    cpu.x(),
                    cpu.y(),
                    cpu.sp(),
                    cpu.status()
                );
                println!("  instructions: {instructions}");
                return ExitCode::FAILURE;
            }
        } else {
            stuck = 0;
        }
        last_pc = cpu.pc();

        if total_cycles > MAX_CYCLES {
            println!("TIMEOUT after {total_cycles} cycles at PC=${:04X}", cpu.pc());
            return ExitCode::FAILURE;
        }
    }
}
