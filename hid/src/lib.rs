//! Access to HID devices attached over USB, Bluetooth, I2C or SPI.
//!
//! The platform work is done by [hidapi], which is loaded at runtime the
//! first time it is needed. Set `HIDAPI_LIBRARY` to pick a particular build,
//! or load one explicitly with [`Context::load`].
//!
//! ```no_run
//! use std::time::Duration;
//!
//! fn main() -> Result<(), hid::Error> {
//!     hid::enumerate(hid::VENDOR_ID_ANY, hid::PRODUCT_ID_ANY, |info| {
//!         println!("{}: {:04x}:{:04x}", info.path, info.vendor_id, info.product_id);
//!         Ok::<_, hid::Error>(())
//!     })?;
//!
//!     let device = hid::open_first(0x04d8, 0x003f)?;
//!     device.write(&[0x00, 0x80])?;
//!     let mut report = [0u8; 65];
//!     let n = device.read_with_timeout(&mut report, Duration::from_millis(500))?;
//!     println!("{:02x?}", &report[..n]);
//!     Ok(())
//! }
//! ```
//!
//! Free functions operate on one process-wide [`Context`]. Code that wants
//! its own transport, such as tests driving an in-memory device, creates a
//! `Context` from any [`Transport`] instead.
//!
//! [hidapi]: https://github.com/libusb/hidapi

mod capability;
mod config;
mod context;
mod device;
mod error;
mod platform;
mod transport;
mod wide;

use parking_lot::{const_mutex, Mutex};

pub use crate::capability::{
    Capability, ContainerId, DescriptorReconstruct, ExclusiveMode, LocationId, OpenExclusive,
    SysDeviceOpen, INTERFACE_ANY,
};
pub use crate::config::{Config, LIBRARY_ENV};
pub use crate::context::Context;
pub use crate::device::{BusType, DeviceHandle, DeviceInfo};
pub use crate::error::{Error, UNSPECIFIED_ERROR};
pub use crate::platform::{NativeDevice, NativeEnumeration, NativeTransport};
pub use crate::transport::{
    ApiVersion, DarwinTransport, Guid, LibusbTransport, RawDeviceInfo, StringDescriptor,
    Transport, WinapiTransport,
};
pub use crate::wide::{decode, encode, WChar, WideString, MAX_STRING_LEN};

/// Matches devices from any vendor.
pub const VENDOR_ID_ANY: u16 = 0;
/// Matches any product.
pub const PRODUCT_ID_ANY: u16 = 0;

static NATIVE: Mutex<Option<Context<NativeTransport>>> = const_mutex(None);

/// The process-wide native context, loading hidapi on first use with
/// [`Config::from_env`].
///
/// A failed load is not remembered; the next call tries again.
pub fn context() -> Result<Context, Error> {
    let mut native = NATIVE.lock();
    if let Some(context) = native.as_ref() {
        return Ok(context.clone());
    }
    let context = Context::load(&Config::from_env())?;
    *native = Some(context.clone());
    Ok(context)
}

fn loaded() -> Option<Context> {
    NATIVE.lock().clone()
}

/// Initializes the native transport. See [`Context::init`].
pub fn init() -> Result<(), Error> {
    context()?.init()
}

/// Releases the native transport. See [`Context::shutdown`]. Does nothing
/// if the library was never loaded.
pub fn exit() -> Result<(), Error> {
    match loaded() {
        Some(context) => context.shutdown(),
        None => Ok(()),
    }
}

/// Visits attached devices. See [`Context::enumerate`]. Failing to load or
/// initialize the library is reported through `E`.
pub fn enumerate<F, E>(vendor_id: u16, product_id: u16, visit: F) -> Result<(), E>
where
    F: FnMut(&DeviceInfo) -> Result<(), E>,
    E: From<Error>,
{
    context()?.enumerate(vendor_id, product_id, visit)
}

/// Collects attached devices. See [`Context::devices`].
pub fn devices(vendor_id: u16, product_id: u16) -> Result<Vec<DeviceInfo>, Error> {
    context()?.devices(vendor_id, product_id)
}

/// Opens a device by IDs and serial number. See [`Context::open`].
pub fn open(vendor_id: u16, product_id: u16, serial_number: &str) -> Result<DeviceHandle, Error> {
    context()?.open(vendor_id, product_id, serial_number)
}

/// Opens the first device with matching IDs.
pub fn open_first(vendor_id: u16, product_id: u16) -> Result<DeviceHandle, Error> {
    context()?.open_first(vendor_id, product_id)
}

/// Opens a device by platform path.
pub fn open_path(path: &str) -> Result<DeviceHandle, Error> {
    context()?.open_path(path)
}

/// The last error not tied to an open device. `None` if nothing failed or
/// the library was never loaded.
pub fn last_error() -> Option<String> {
    loaded().and_then(|context| context.last_error())
}

/// Version of the loaded hidapi. See [`Context::version`].
pub fn version() -> Result<ApiVersion, Error> {
    Ok(context()?.version())
}

/// Version string of the loaded hidapi. See [`Context::version_str`].
pub fn version_str() -> Result<String, Error> {
    Ok(context()?.version_str())
}
