//! The boundary to the platform HID transport.
//!
//! The trait mirrors the C interface of hidapi: counts come back as `c_int`
//! with `-1` for failure, missing objects as `None`, and the reason for the
//! last failure is fetched separately through [`Transport::error`]. The
//! device layer turns these signals into typed results. Implementations
//! other than the native library (for example an in-memory device for tests)
//! only need to follow the same conventions.

use std::ffi::{c_int, CStr, CString};
use std::fmt;

use crate::capability::Capability;
use crate::wide::{WChar, WideString};

/// A device record as reported by the transport, before string decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDeviceInfo {
    pub path: CString,
    pub vendor_id: u16,
    pub product_id: u16,
    pub serial_number: Option<WideString>,
    pub release_number: u16,
    pub manufacturer_string: Option<WideString>,
    pub product_string: Option<WideString>,
    pub usage_page: u16,
    pub usage: u16,
    pub interface_number: c_int,
    pub bus_type: c_int,
}

/// Selects which string descriptor [`Transport::get_string`] retrieves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringDescriptor {
    Manufacturer,
    Product,
    SerialNumber,
    Indexed(c_int),
}

/// Version of the transport library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ApiVersion {
    pub major: i32,
    pub minor: i32,
    pub patch: i32,
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A platform HID transport.
///
/// Methods follow hidapi's conventions: counts are returned as non-negative
/// values and `-1` signals a failure whose text is available from
/// [`Transport::error`]. Calls on one `Device` are never issued concurrently
/// by this crate.
pub trait Transport: Send + Sync + 'static {
    /// Native handle for one open device.
    type Device: Send;
    /// One enumeration pass. Dropping it releases the native device list.
    type Enumeration: Iterator<Item = RawDeviceInfo>;

    /// Prepares the backend; `0` on success.
    fn init(&self) -> c_int;
    /// Releases everything `init` acquired; `0` on success.
    fn exit(&self) -> c_int;

    /// Lists attached devices; `0` filters match any ID.
    fn enumerate(&self, vendor_id: u16, product_id: u16) -> Self::Enumeration;

    /// Opens the first device matching the IDs and, if given, the serial
    /// number.
    fn open(
        &self,
        vendor_id: u16,
        product_id: u16,
        serial_number: Option<&WideString>,
    ) -> Option<Self::Device>;
    /// Opens the device at a path returned by enumeration.
    fn open_path(&self, path: &CStr) -> Option<Self::Device>;
    /// Closes `device`. It is never used again.
    fn close(&self, device: Self::Device);

    /// Sends an output report; `data[0]` is the report ID.
    fn write(&self, device: &Self::Device, data: &[u8]) -> c_int;
    /// Reads honouring the device's non-blocking flag. `0` means no data.
    fn read(&self, device: &Self::Device, data: &mut [u8]) -> c_int;
    /// Reads waiting at most `milliseconds`; `0` does not block and `-1`
    /// blocks indefinitely. `0` returned means no data.
    fn read_timeout(&self, device: &Self::Device, data: &mut [u8], milliseconds: c_int) -> c_int;
    /// Switches `read` between polling and waiting for data.
    fn set_nonblocking(&self, device: &Self::Device, nonblocking: bool) -> c_int;

    // Report transfers over the control endpoint. `data[0]` is the report ID.
    fn send_feature_report(&self, device: &Self::Device, data: &[u8]) -> c_int;
    fn get_feature_report(&self, device: &Self::Device, data: &mut [u8]) -> c_int;
    fn get_input_report(&self, device: &Self::Device, data: &mut [u8]) -> c_int;

    /// Copies the raw report descriptor, truncated to `data.len()`.
    fn get_report_descriptor(&self, device: &Self::Device, data: &mut [u8]) -> c_int;

    /// Writes at most `buffer.len() - 1` units followed by a NUL.
    fn get_string(
        &self,
        device: &Self::Device,
        which: StringDescriptor,
        buffer: &mut [WChar],
    ) -> c_int;
    /// The enumeration record of an open device.
    fn get_device_info(&self, device: &Self::Device) -> Option<RawDeviceInfo>;

    /// Last error on `device`, or the last error not tied to a device.
    fn error(&self, device: Option<&Self::Device>) -> Option<WideString>;

    /// Library version; callable without `init`.
    fn version(&self) -> ApiVersion;
    /// Library version as text, e.g. `0.14.0`.
    fn version_str(&self) -> String;

    /// Whether a platform extension is available at runtime.
    fn supports(&self, _capability: Capability) -> bool {
        false
    }
}

/// macOS extensions.
pub trait DarwinTransport: Transport {
    /// Stores the IOKit location ID in `location_id`.
    fn location_id(&self, device: &Self::Device, location_id: &mut u32) -> c_int;
    /// Default open mode for later opens.
    fn set_open_exclusive(&self, exclusive: bool);
    fn open_exclusive(&self) -> bool;
    /// `1` exclusive, `0` shared, `-1` failure.
    fn is_device_open_exclusive(&self, device: &Self::Device) -> c_int;
}

/// Extensions of the libusb backend.
pub trait LibusbTransport: Transport {
    /// Wraps a platform file descriptor known to libusb.
    fn wrap_sys_device(&self, sys_dev: isize, interface_num: c_int) -> Option<Self::Device>;
}

/// Windows extensions.
pub trait WinapiTransport: Transport {
    /// Stores the device's container GUID in `container_id`.
    fn container_id(&self, device: &Self::Device, container_id: &mut Guid) -> c_int;
    /// Rebuilds a report descriptor from opaque `HIDP_PREPARSED_DATA`.
    fn reconstruct_descriptor(&self, pp_data: &[u8], buffer: &mut [u8]) -> c_int;
}

/// A Windows GUID, laid out like the C `GUID` structure.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.data4;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.data1, self.data2, self.data3, d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7]
        )
    }
}
