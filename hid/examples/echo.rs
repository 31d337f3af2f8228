//! Talks to the Microchip "Simple HID Device" demo firmware: reads its
//! strings, toggles an LED and asks for the button state.

use std::env;
use std::error::Error;
use std::time::Duration;

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = env::args().skip(1);
    let vid = args.next().map(|v| parse_id(&v)).transpose()?.unwrap_or(0x04d8);
    let pid = args.next().map(|v| parse_id(&v)).transpose()?.unwrap_or(0x003f);

    hid::init()?;
    let device = hid::open_first(vid, pid)?;

    println!("Manufacturer String: {}", device.manufacturer_string()?);
    println!("Product String: {}", device.product_string()?);
    println!("Serial Number String: {}", device.serial_number()?);
    println!("Indexed String 1: {}", device.indexed_string(1)?);

    // Report ID 0, command 0x80: toggle LED.
    let mut report = [0u8; 65];
    report[1] = 0x80;
    device.write(&report)?;

    // Command 0x81: request button state.
    report[1] = 0x81;
    device.write(&report)?;

    let mut buf = [0u8; 65];
    let n = device.read_with_timeout(&mut buf, Duration::from_secs(1))?;
    for (i, byte) in buf[..n.min(4)].iter().enumerate() {
        println!("buf[{i}]: {byte}");
    }

    device.close();
    hid::exit()?;
    Ok(())
}

/// Same rule as `lshid --vid`: `0x` hex, leading `0` octal, else decimal.
fn parse_id(value: &str) -> Result<u16, std::num::ParseIntError> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16)
    } else if value.len() > 1 && value.starts_with('0') {
        u16::from_str_radix(&value[1..], 8)
    } else {
        value.parse()
    }
}
