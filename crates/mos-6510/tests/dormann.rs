//! Klaus Dormann suite integration tests.
//!
//! These need the assembled test binaries at `test-roms/` in the
//! workspace root and take a while, so they are ignored by default:
//!
//! ```text
//! cargo test -p mos-6510 -- --ignored
//! ```

use emu_core::{Cpu, RamBus};
use mos_6510::Mos6510;
use std::fs;

fn run_until(cpu: &mut Mos6510, bus: &mut RamBus, target: u16, max_cycles: u64) -> bool {
    let mut cycles = 0u64;
    let mut last_pc = cpu.pc();
    let mut stuck = 0u32;

    while cycles < max_cycles {
        cycles += u64::from(cpu.step(bus));
        if cpu.pc() == target {
            return true;
        }
        if cpu.pc() == last_pc {
            stuck += 1;
            if stuck >= 3 {
                panic!(
                    "trap at PC=${:04X} A=${:02X} X=${:02X} Y=${:02X} SP=${:02X} P=${:02X}",
                    cpu.pc(),
                    cpu.a(),
                    cpu.x(),
                    cpu.y(),
                    cpu.sp(),
                    cpu.status()
                );
            }
        } else {
            stuck = 0;
        }
        last_pc = cpu.pc();
    }
    false
}

#[test]
#[ignore] // Requires 6502_functional_test.bin at test-roms/
fn dormann_functional() {
    let image = fs::read("../../test-roms/6502_functional_test.bin")
        .expect("6502_functional_test.bin not found at test-roms/");

    let mut bus = RamBus::new();
    bus.load(0x0000, &image);
    let mut cpu = Mos6510::new();
    cpu.set_pc(0x0400);
    cpu.set_sp(0xFD);
    cpu.set_status(0x24);

    assert!(
        run_until(&mut cpu, &mut bus, 0x3469, 200_000_000),
        "functional test did not reach the success address"
    );
}

#[test]
#[ignore] // Requires 6502_decimal_test.bin at test-roms/
fn dormann_decimal() {
    let image = fs::read("../../test-roms/6502_decimal_test.bin")
        .expect("6502_decimal_test.bin not found at test-roms/");

    let mut bus = RamBus::new();
    bus.load(0x0200, &image);
    let mut cpu = Mos6510::new();
    cpu.set_pc(0x0200);
    cpu.set_sp(0xFD);
    cpu.set_status(0x24);

    assert!(
        run_until(&mut cpu, &mut bus, 0x024B, 100_000_000),
        "decimal test did not finish"
    );
    assert_eq!(bus.peek(0x000B), 0, "decimal test error flag");
}
