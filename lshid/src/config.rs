use std::num::ParseIntError;
use std::path::PathBuf;

#[derive(clap::Parser, Debug, Clone)]
#[command(name = "lshid", about = "List HID devices", disable_version_flag = true)]
pub struct Config {
    /// Increase verbosity (show device information)
    #[arg(short, long)]
    pub verbose: bool,
    /// Show only devices with the specified vendor ID
    #[arg(long, value_name = "VENDOR", default_value = "0", value_parser = parse_id)]
    pub vid: u16,
    /// Show only devices with the specified product ID
    #[arg(long, value_name = "PRODUCT", default_value = "0", value_parser = parse_id)]
    pub pid: u16,
    /// hidapi library to load instead of the platform default
    #[arg(long, value_name = "PATH", env = hid::LIBRARY_ENV)]
    pub library: Option<PathBuf>,
    /// Print the tool and hidapi versions, then exit
    #[arg(short = 'V', long)]
    pub version: bool,
}

impl Config {
    pub fn hid_config(&self) -> hid::Config {
        match &self.library {
            Some(library) => hid::Config::new().with_library(library),
            None => hid::Config::new(),
        }
    }
}

/// Parses a USB ID. A `0x` prefix selects hex, `0o` or a bare leading `0`
/// octal, `0b` binary; anything else is decimal.
pub fn parse_id(value: &str) -> Result<u16, ParseIntError> {
    let value = value.trim();
    let (digits, radix) = match value.get(..2) {
        Some("0x" | "0X") => (&value[2..], 16),
        Some("0o" | "0O") => (&value[2..], 8),
        Some("0b" | "0B") => (&value[2..], 2),
        _ if value.len() > 1 && value.starts_with('0') => (&value[1..], 8),
        _ => (value, 10),
    };
    u16::from_str_radix(digits, radix)
}
