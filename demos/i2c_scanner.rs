//! I2C bus scanner.
//!
//! Pings every 7-bit address at 100 kHz and 400 kHz and prints the ones that
//! acknowledge.
//!
//! # Wiring
//!
//! | FT232H Pin | I2C Signal | Notes |
//! |------------|-----------|-------|
//! | ADBUS0 (SK) | SCL      | Pull-up to 3.3V via 4.7k |
//! | ADBUS1 (DO) | SDA      | Connect to ADBUS2, pull-up via 4.7k |
//! | ADBUS2 (DI) | SDA      | Connected to ADBUS1 externally |
//!
//! # Usage
//!
//! ```sh
//! cargo run --example i2c_scanner
//! ```

use mpsse::{ClockRate, I2cConfig, I2cDevice, NativeTransport};

fn scan(clock_rate: ClockRate) -> Result<Vec<u8>, mpsse::Error> {
    let mut found = Vec::new();
    for address in 0..=0x7F {
        let config = I2cConfig::new(address).clock_rate(clock_rate);
        let mut dev = I2cDevice::open(NativeTransport::new(), &config)?;
        if dev.ping()? {
            found.push(address);
        }
    }
    Ok(found)
}

fn main() -> Result<(), mpsse::Error> {
    env_logger::init();

    for clock_rate in [ClockRate::Khz100, ClockRate::Khz400] {
        println!("I2C bus frequency: {clock_rate}");
        let found = scan(clock_rate)?;
        if found.is_empty() {
            println!("None found");
        } else {
            let list: Vec<String> = found.iter().map(|a| format!("0x{a:02x}")).collect();
            println!("{}", list.join(", "));
        }
    }

    Ok(())
}
