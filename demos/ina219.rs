//! INA219 bus voltage monitor over I2C.
//!
//! # Usage
//!
//! ```sh
//! cargo run --example ina219 -- 0x40
//! ```

use std::env;

use mpsse::{I2cConfig, I2cDevice, NativeTransport};

const REG_CONFIG: u8 = 0x00;
const REG_BUS_VOLTAGE: u8 = 0x02;
const CONFIG_DEFAULT: u16 = 0x399F;
const CONFIG_RESET: u16 = 1 << 15;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let arg = env::args().nth(1).unwrap_or_else(|| "0x40".to_string());
    let address = match arg.strip_prefix("0x") {
        Some(hex) => u8::from_str_radix(hex, 16)?,
        None => arg.parse()?,
    };

    let mut ina219 = I2cDevice::open(NativeTransport::new(), &I2cConfig::new(address))?;
    if !ina219.ping()? {
        return Err(format!("address 0x{address:02X} does not respond to ping").into());
    }
    println!("Device responded to ping");

    ina219.write(REG_CONFIG, &(CONFIG_DEFAULT | CONFIG_RESET).to_be_bytes())?;

    let config = ina219.read16(REG_CONFIG)?;
    if config != CONFIG_DEFAULT {
        return Err(format!(
            "expected config 0x{CONFIG_DEFAULT:04X} after reset, found 0x{config:04X}"
        )
        .into());
    }

    // Bits 0-2 are flags; 4 mV per LSB.
    let raw = ina219.read16(REG_BUS_VOLTAGE)?;
    let v_bus = f32::from(raw >> 3) * 0.004;
    println!("Vbus: {v_bus:.3} V");

    Ok(())
}
