//! BME280 register access over SPI.
//!
//! Verifies the chip ID, resets the sensor and round-trips the `ctrl_meas`
//! register.
//!
//! # Wiring
//!
//! | FT232H Pin  | SPI Signal | BME280 Pin |
//! |-------------|-----------|------------|
//! | ADBUS0 (SK) | SCK       | SCK        |
//! | ADBUS1 (DO) | MOSI      | SDI        |
//! | ADBUS2 (DI) | MISO      | SDO        |
//! | ADBUS3 (CS) | CS        | CSB        |
//!
//! # Usage
//!
//! ```sh
//! cargo run --example spi_register
//! ```

use mpsse::{
    ClockRate, Mode, NativeTransport, Result, SerialProtocol, SpiConfig, SpiDevice, Transport,
};

const CHIP_ID: u8 = 0x60;
const REG_CHIP_ID: u8 = 0xD0;
const REG_RESET: u8 = 0xE0;
const REG_CTRL_MEAS: u8 = 0xF4;
const RESET_COMMAND: u8 = 0xB6;

struct Bme280<T: Transport> {
    spi: SpiDevice<T>,
}

impl<T: Transport> Bme280<T> {
    fn read_register(&mut self, register: u8) -> Result<u8> {
        let data = self.spi.transaction(|spi| {
            spi.write(register)?;
            spi.read(1)
        })?;
        Ok(data[0])
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<()> {
        // Bit 7 of the register address is cleared for writes.
        self.spi
            .transaction(|spi| spi.write(&[register & 0x7F, value]))
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = SpiConfig::new(Mode::Spi0).clock_rate(ClockRate::Khz100);
    let mut bme280 = Bme280 {
        spi: SpiDevice::open(NativeTransport::new(), &config)?,
    };
    println!("Opened {}", bme280.spi.mpsse().description());

    let id = bme280.read_register(REG_CHIP_ID)?;
    if id != CHIP_ID {
        return Err(format!("unexpected chip ID 0x{id:02x}, expected 0x{CHIP_ID:02x}").into());
    }
    println!("Chip ID: 0x{id:02x}");

    bme280.write_register(REG_RESET, RESET_COMMAND)?;
    let after_reset = bme280.read_register(REG_CTRL_MEAS)?;
    if after_reset != 0 {
        return Err(format!("ctrl_meas is 0b{after_reset:08b} after reset").into());
    }

    let value = (0b001 << 5) | (0b001 << 2) | 0b01;
    println!("Setting ctrl_meas to 0b{value:08b}");
    bme280.write_register(REG_CTRL_MEAS, value)?;

    let readback = bme280.read_register(REG_CTRL_MEAS)?;
    if readback != value {
        return Err(format!("ctrl_meas read back 0b{readback:08b}").into());
    }

    println!("Done.");
    Ok(())
}
