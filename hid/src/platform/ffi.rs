//! C layout of the hidapi interface and the table of resolved entry points.

#![allow(non_camel_case_types)]

use std::ffi::{c_char, c_int, c_uchar, c_ushort, c_void};

use libloading::Library;
use tracing::trace;

use crate::transport::Guid;
use crate::wide::WChar;

/// Opaque device owned by hidapi.
#[repr(C)]
pub struct hid_device {
    _private: [u8; 0],
}

/// One node of the list returned by `hid_enumerate`.
#[repr(C)]
pub struct hid_device_info {
    pub path: *mut c_char,
    pub vendor_id: c_ushort,
    pub product_id: c_ushort,
    pub serial_number: *mut WChar,
    pub release_number: c_ushort,
    pub manufacturer_string: *mut WChar,
    pub product_string: *mut WChar,
    pub usage_page: c_ushort,
    pub usage: c_ushort,
    pub interface_number: c_int,
    pub next: *mut hid_device_info,
    /// `hid_bus_type`, present since hidapi 0.13.
    pub bus_type: c_int,
}

/// Returned by `hid_version`.
#[repr(C)]
pub struct hid_api_version {
    pub major: c_int,
    pub minor: c_int,
    pub patch: c_int,
}

/// The `hid_device *` every per-device call takes.
pub type Device = *mut hid_device;

/// Entry points resolved from the loaded library. Symbols that only exist in
/// some backends are optional.
pub struct Api {
    pub init: unsafe extern "C" fn() -> c_int,
    pub exit: unsafe extern "C" fn() -> c_int,
    pub enumerate: unsafe extern "C" fn(c_ushort, c_ushort) -> *mut hid_device_info,
    pub free_enumeration: unsafe extern "C" fn(*mut hid_device_info),
    pub open: unsafe extern "C" fn(c_ushort, c_ushort, *const WChar) -> Device,
    pub open_path: unsafe extern "C" fn(*const c_char) -> Device,
    pub close: unsafe extern "C" fn(Device),
    pub write: unsafe extern "C" fn(Device, *const c_uchar, usize) -> c_int,
    pub read: unsafe extern "C" fn(Device, *mut c_uchar, usize) -> c_int,
    pub read_timeout: unsafe extern "C" fn(Device, *mut c_uchar, usize, c_int) -> c_int,
    pub set_nonblocking: unsafe extern "C" fn(Device, c_int) -> c_int,
    pub send_feature_report: unsafe extern "C" fn(Device, *const c_uchar, usize) -> c_int,
    pub get_feature_report: unsafe extern "C" fn(Device, *mut c_uchar, usize) -> c_int,
    pub get_input_report: unsafe extern "C" fn(Device, *mut c_uchar, usize) -> c_int,
    pub get_report_descriptor: unsafe extern "C" fn(Device, *mut c_uchar, usize) -> c_int,
    pub get_manufacturer_string: unsafe extern "C" fn(Device, *mut WChar, usize) -> c_int,
    pub get_product_string: unsafe extern "C" fn(Device, *mut WChar, usize) -> c_int,
    pub get_serial_number_string: unsafe extern "C" fn(Device, *mut WChar, usize) -> c_int,
    pub get_indexed_string: unsafe extern "C" fn(Device, c_int, *mut WChar, usize) -> c_int,
    pub get_device_info: unsafe extern "C" fn(Device) -> *mut hid_device_info,
    pub error: unsafe extern "C" fn(Device) -> *const WChar,
    pub version: unsafe extern "C" fn() -> *const hid_api_version,
    pub version_str: unsafe extern "C" fn() -> *const c_char,

    pub darwin_get_location_id: Option<unsafe extern "C" fn(Device, *mut u32) -> c_int>,
    pub darwin_set_open_exclusive: Option<unsafe extern "C" fn(c_int)>,
    pub darwin_get_open_exclusive: Option<unsafe extern "C" fn() -> c_int>,
    pub darwin_is_device_open_exclusive: Option<unsafe extern "C" fn(Device) -> c_int>,

    pub libusb_wrap_sys_device: Option<unsafe extern "C" fn(isize, c_int) -> Device>,

    pub winapi_get_container_id: Option<unsafe extern "C" fn(Device, *mut Guid) -> c_int>,
    pub winapi_descriptor_reconstruct_pp_data:
        Option<unsafe extern "C" fn(*mut c_void, *mut c_uchar, usize) -> c_int>,

    // Keeps the entry points above valid.
    _lib: Library,
}

impl Api {
    /// Resolves every entry point from `lib`.
    ///
    /// # Safety
    ///
    /// `lib` must be a build of hidapi 0.14 or later, so that the resolved
    /// symbols have the signatures declared above.
    pub unsafe fn resolve(lib: Library) -> Result<Self, libloading::Error> {
        Ok(Self {
            init: *lib.get(b"hid_init\0")?,
            exit: *lib.get(b"hid_exit\0")?,
            enumerate: *lib.get(b"hid_enumerate\0")?,
            free_enumeration: *lib.get(b"hid_free_enumeration\0")?,
            open: *lib.get(b"hid_open\0")?,
            open_path: *lib.get(b"hid_open_path\0")?,
            close: *lib.get(b"hid_close\0")?,
            write: *lib.get(b"hid_write\0")?,
            read: *lib.get(b"hid_read\0")?,
            read_timeout: *lib.get(b"hid_read_timeout\0")?,
            set_nonblocking: *lib.get(b"hid_set_nonblocking\0")?,
            send_feature_report: *lib.get(b"hid_send_feature_report\0")?,
            get_feature_report: *lib.get(b"hid_get_feature_report\0")?,
            get_input_report: *lib.get(b"hid_get_input_report\0")?,
            get_report_descriptor: *lib.get(b"hid_get_report_descriptor\0")?,
            get_manufacturer_string: *lib.get(b"hid_get_manufacturer_string\0")?,
            get_product_string: *lib.get(b"hid_get_product_string\0")?,
            get_serial_number_string: *lib.get(b"hid_get_serial_number_string\0")?,
            get_indexed_string: *lib.get(b"hid_get_indexed_string\0")?,
            get_device_info: *lib.get(b"hid_get_device_info\0")?,
            error: *lib.get(b"hid_error\0")?,
            version: *lib.get(b"hid_version\0")?,
            version_str: *lib.get(b"hid_version_str\0")?,

            darwin_get_location_id: optional(&lib, b"hid_darwin_get_location_id\0"),
            darwin_set_open_exclusive: optional(&lib, b"hid_darwin_set_open_exclusive\0"),
            darwin_get_open_exclusive: optional(&lib, b"hid_darwin_get_open_exclusive\0"),
            darwin_is_device_open_exclusive: optional(
                &lib,
                b"hid_darwin_is_device_open_exclusive\0",
            ),

            libusb_wrap_sys_device: optional(&lib, b"hid_libusb_wrap_sys_device\0"),

            winapi_get_container_id: optional(&lib, b"hid_winapi_get_container_id\0"),
            winapi_descriptor_reconstruct_pp_data: optional(
                &lib,
                b"hid_winapi_descriptor_reconstruct_pp_data\0",
            ),

            _lib: lib,
        })
    }
}

/// Resolves a symbol only some hidapi backends export.
///
/// # Safety
///
/// `T` must match the symbol's C signature.
unsafe fn optional<T: Copy>(lib: &Library, name: &[u8]) -> Option<T> {
    match lib.get::<T>(name) {
        Ok(symbol) => Some(*symbol),
        Err(_) => {
            let symbol = String::from_utf8_lossy(name.strip_suffix(b"\0").unwrap_or(name));
            trace!(%symbol, "optional symbol not exported");
            None
        }
    }
}
