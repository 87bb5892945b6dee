//! Bitbang mode example.
//!
//! Toggles the low byte of an MPSSE chip in asynchronous bitbang mode.
//! Connect LEDs (with appropriate resistors) to observe the output.
//!
//! Usage: cargo run --example bitbang

use std::thread;
use std::time::Duration;

use mpsse::{Level, Mode, Mpsse, NativeTransport, OpenParams};

fn main() -> Result<(), mpsse::Error> {
    env_logger::init();

    let mut mpsse = Mpsse::open(NativeTransport::new(), &OpenParams::new(Mode::Bitbang))?;
    println!("Opened {}", mpsse.description());

    mpsse.direction(0xFF)?;
    for cycle in 0..10u32 {
        let val = if cycle % 2 == 0 { 0xFF } else { 0x00 };
        mpsse.write_pins(val)?;
        let pins = mpsse.read_pins()?;
        println!("Cycle {cycle}: wrote 0x{val:02X}, pins=0x{pins:02X}");
        thread::sleep(Duration::from_millis(500));
    }

    mpsse.pin_mode(0, Level::High)?;
    println!("Pin 0 is {:?}", mpsse.pin_state(0, None)?);

    Ok(())
}
