//! Read one 8- or 16-bit I2C register.
//!
//! # Usage
//!
//! ```sh
//! cargo run --example i2c_read -- <address> <register> [8|16]
//! cargo run --example i2c_read -- 0x48 0x00 16
//! ```
//!
//! Numbers may be decimal or `0x`-prefixed hex.

use std::env;
use std::process;

use mpsse::{I2cConfig, I2cDevice, NativeTransport};

fn parse_number(arg: &str) -> Option<u8> {
    match arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).ok(),
        None => arg.parse().ok(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let (Some(address), Some(register)) = (
        args.first().and_then(|a| parse_number(a)),
        args.get(1).and_then(|a| parse_number(a)),
    ) else {
        eprintln!("usage: i2c_read <address> <register> [8|16]");
        process::exit(2);
    };
    let width = args.get(2).map(String::as_str).unwrap_or("8");

    let mut dev = I2cDevice::open(NativeTransport::new(), &I2cConfig::new(address))?;
    match width {
        "16" => {
            let value = dev.read16(register)?;
            println!("address: 0x{address:02x}: register: 0x{register:04x}: 0x{value:04x}");
        }
        _ => {
            let value = dev.read8(register)?;
            println!("address: 0x{address:02x}: register: 0x{register:02x}: 0x{value:02x}");
        }
    }

    Ok(())
}
