mod config;

use std::fmt::Write as _;

use anyhow::Context as _;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

fn main() -> anyhow::Result<()> {
    let cfg = Config::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if cfg.version {
        println!("lshid {}", env!("CARGO_PKG_VERSION"));
    }
    let context = hid::Context::load(&cfg.hid_config()).context("cannot load hidapi")?;
    if cfg.version {
        println!("hidapi {}", context.version_str());
        return Ok(());
    }

    context.init().context("cannot initialize hidapi")?;
    debug!(vid = cfg.vid, pid = cfg.pid, "listing devices");
    context
        .enumerate(cfg.vid, cfg.pid, |info| {
            print!("{}", summary_line(info));
            if cfg.verbose {
                print!("{}", device_block(info));
            }
            Ok::<_, anyhow::Error>(())
        })
        .context("cannot list devices")?;
    context.shutdown().context("cannot release hidapi")?;
    Ok(())
}

fn summary_line(info: &hid::DeviceInfo) -> String {
    format!(
        "{}: ID {:04x}:{:04x} {} {}\n",
        info.path, info.vendor_id, info.product_id, info.manufacturer_string, info.product_string
    )
}

fn device_block(info: &hid::DeviceInfo) -> String {
    let (major, minor) = info.release();
    let mut out = String::from("Device Information:\n");
    let mut field = |name: &str, value: String| {
        let _ = writeln!(out, "\t{name:<12} {value}");
    };
    field("Path", or_empty(&info.path));
    field("VendorID", format!("{:#06x}", info.vendor_id));
    field("ProductID", format!("{:#06x}", info.product_id));
    field("SerialNbr", or_empty(&info.serial_number));
    field("ReleaseNbr", format!("{major:x}.{minor:x}"));
    field("MfrStr", or_empty(&info.manufacturer_string));
    field("ProductStr", or_empty(&info.product_string));
    field("UsagePage", format!("{:#x}", info.usage_page));
    field("Usage", format!("{:#x}", info.usage));
    field("InterfaceNbr", info.interface_number.to_string());
    field("BusType", info.bus_type.to_string());
    out.push('\n');
    out
}

fn or_empty(value: &str) -> String {
    if value.is_empty() {
        "(empty)".to_string()
    } else {
        value.to_string()
    }
}
