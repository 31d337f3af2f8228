//! The hidapi shared library as a [`Transport`].

mod ffi;

#[cfg(any(target_os = "linux", target_os = "freebsd"))]
mod linux;
#[cfg(any(target_os = "linux", target_os = "freebsd"))]
use self::linux::LIBRARY_NAMES;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
use self::macos::LIBRARY_NAMES;

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
use self::windows::LIBRARY_NAMES;

#[cfg(not(any(
    target_os = "linux",
    target_os = "freebsd",
    target_os = "macos",
    target_os = "windows"
)))]
mod not_supported;
#[cfg(not(any(
    target_os = "linux",
    target_os = "freebsd",
    target_os = "macos",
    target_os = "windows"
)))]
use self::not_supported::LIBRARY_NAMES;

use std::ffi::{c_int, CStr};
use std::fmt;
use std::path::PathBuf;
use std::ptr::{self, NonNull};
use std::sync::Arc;

use libloading::Library;
use tracing::{debug, trace};

use crate::capability::Capability;
use crate::config::Config;
use crate::transport::{ApiVersion, RawDeviceInfo, StringDescriptor, Transport};
use crate::wide::{WChar, WideString};
use crate::Error;

use self::ffi::{hid_device, hid_device_info, Api};

/// hidapi reports this instead of a null pointer when nothing failed.
const NO_ERROR: &str = "Success";

/// The hidapi library loaded at runtime.
///
/// Cloning shares the loaded library.
#[derive(Clone)]
pub struct NativeTransport {
    api: Arc<Api>,
}

/// An open `hid_device *`.
pub struct NativeDevice(NonNull<hid_device>);

// SAFETY: hidapi devices are not tied to the opening thread; `DeviceHandle`
// keeps calls on one device from overlapping.
unsafe impl Send for NativeDevice {}

impl NativeDevice {
    fn as_ptr(&self) -> *mut hid_device {
        self.0.as_ptr()
    }
}

impl NativeTransport {
    /// Loads hidapi as described by `config`, trying each candidate name in
    /// turn.
    pub fn load(config: &Config) -> Result<Self, Error> {
        Self::load_first(config.candidates(LIBRARY_NAMES))
    }

    /// Takes the first candidate that loads and exports every required
    /// symbol.
    fn load_first(candidates: Vec<PathBuf>) -> Result<Self, Error> {
        let mut failures = Vec::new();
        for candidate in candidates {
            // SAFETY: loading hidapi runs no initialisation code with
            // preconditions; its symbols are checked in `Api::resolve`.
            let lib = match unsafe { Library::new(&candidate) } {
                Ok(lib) => lib,
                Err(err) => {
                    trace!(library = %candidate.display(), %err, "candidate not loadable");
                    failures.push(format!("{}: {err}", candidate.display()));
                    continue;
                }
            };
            // SAFETY: the symbols are declared with the hidapi 0.14 signatures.
            let api = match unsafe { Api::resolve(lib) } {
                Ok(api) => api,
                Err(err) => {
                    debug!(library = %candidate.display(), %err, "candidate lacks hidapi symbols");
                    failures.push(format!("{}: {err}", candidate.display()));
                    continue;
                }
            };
            debug!(library = %candidate.display(), "loaded hidapi");
            return Ok(Self { api: Arc::new(api) });
        }
        if failures.is_empty() {
            return Err(Error::Load("no hidapi library known for this platform".into()));
        }
        Err(Error::Load(failures.join("; ")))
    }

    fn wrap(device: *mut hid_device) -> Option<NativeDevice> {
        NonNull::new(device).map(NativeDevice)
    }
}

impl fmt::Debug for NativeTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeTransport").finish_non_exhaustive()
    }
}

/// Copies one node of a device list.
///
/// # Safety
///
/// `node` must point to a valid `hid_device_info`.
unsafe fn raw_info(node: *const hid_device_info) -> RawDeviceInfo {
    let node = &*node;
    RawDeviceInfo {
        path: if node.path.is_null() {
            Default::default()
        } else {
            CStr::from_ptr(node.path).to_owned()
        },
        vendor_id: node.vendor_id,
        product_id: node.product_id,
        serial_number: WideString::from_ptr(node.serial_number),
        release_number: node.release_number,
        manufacturer_string: WideString::from_ptr(node.manufacturer_string),
        product_string: WideString::from_ptr(node.product_string),
        usage_page: node.usage_page,
        usage: node.usage,
        interface_number: node.interface_number,
        bus_type: node.bus_type,
    }
}

/// A device list from `hid_enumerate`, freed when dropped.
pub struct NativeEnumeration {
    api: Arc<Api>,
    head: *mut hid_device_info,
    cursor: *mut hid_device_info,
}

impl Iterator for NativeEnumeration {
    type Item = RawDeviceInfo;

    fn next(&mut self) -> Option<RawDeviceInfo> {
        if self.cursor.is_null() {
            return None;
        }
        // SAFETY: `cursor` walks the list owned by `head`, which stays alive
        // until drop.
        unsafe {
            let info = raw_info(self.cursor);
            self.cursor = (*self.cursor).next;
            Some(info)
        }
    }
}

impl Drop for NativeEnumeration {
    fn drop(&mut self) {
        if !self.head.is_null() {
            // SAFETY: `head` came from `hid_enumerate` and is freed only here.
            unsafe { (self.api.free_enumeration)(self.head) };
        }
    }
}

impl Transport for NativeTransport {
    type Device = NativeDevice;
    type Enumeration = NativeEnumeration;

    fn init(&self) -> c_int {
        unsafe { (self.api.init)() }
    }

    fn exit(&self) -> c_int {
        unsafe { (self.api.exit)() }
    }

    fn enumerate(&self, vendor_id: u16, product_id: u16) -> NativeEnumeration {
        let head = unsafe { (self.api.enumerate)(vendor_id, product_id) };
        NativeEnumeration {
            api: Arc::clone(&self.api),
            head,
            cursor: head,
        }
    }

    fn open(
        &self,
        vendor_id: u16,
        product_id: u16,
        serial_number: Option<&WideString>,
    ) -> Option<NativeDevice> {
        let serial = serial_number.map_or(ptr::null(), WideString::as_ptr);
        Self::wrap(unsafe { (self.api.open)(vendor_id, product_id, serial) })
    }

    fn open_path(&self, path: &CStr) -> Option<NativeDevice> {
        Self::wrap(unsafe { (self.api.open_path)(path.as_ptr()) })
    }

    fn close(&self, device: NativeDevice) {
        unsafe { (self.api.close)(device.as_ptr()) }
    }

    fn write(&self, device: &NativeDevice, data: &[u8]) -> c_int {
        unsafe { (self.api.write)(device.as_ptr(), data.as_ptr(), data.len()) }
    }

    fn read(&self, device: &NativeDevice, data: &mut [u8]) -> c_int {
        unsafe { (self.api.read)(device.as_ptr(), data.as_mut_ptr(), data.len()) }
    }

    fn read_timeout(&self, device: &NativeDevice, data: &mut [u8], milliseconds: c_int) -> c_int {
        unsafe {
            (self.api.read_timeout)(device.as_ptr(), data.as_mut_ptr(), data.len(), milliseconds)
        }
    }

    fn set_nonblocking(&self, device: &NativeDevice, nonblocking: bool) -> c_int {
        unsafe { (self.api.set_nonblocking)(device.as_ptr(), nonblocking as c_int) }
    }

    fn send_feature_report(&self, device: &NativeDevice, data: &[u8]) -> c_int {
        unsafe { (self.api.send_feature_report)(device.as_ptr(), data.as_ptr(), data.len()) }
    }

    fn get_feature_report(&self, device: &NativeDevice, data: &mut [u8]) -> c_int {
        unsafe { (self.api.get_feature_report)(device.as_ptr(), data.as_mut_ptr(), data.len()) }
    }

    fn get_input_report(&self, device: &NativeDevice, data: &mut [u8]) -> c_int {
        unsafe { (self.api.get_input_report)(device.as_ptr(), data.as_mut_ptr(), data.len()) }
    }

    fn get_report_descriptor(&self, device: &NativeDevice, data: &mut [u8]) -> c_int {
        unsafe {
            (self.api.get_report_descriptor)(device.as_ptr(), data.as_mut_ptr(), data.len())
        }
    }

    fn get_string(
        &self,
        device: &NativeDevice,
        which: StringDescriptor,
        buffer: &mut [WChar],
    ) -> c_int {
        let (dev, buf, len) = (device.as_ptr(), buffer.as_mut_ptr(), buffer.len());
        unsafe {
            match which {
                StringDescriptor::Manufacturer => (self.api.get_manufacturer_string)(dev, buf, len),
                StringDescriptor::Product => (self.api.get_product_string)(dev, buf, len),
                StringDescriptor::SerialNumber => {
                    (self.api.get_serial_number_string)(dev, buf, len)
                }
                StringDescriptor::Indexed(index) => {
                    (self.api.get_indexed_string)(dev, index, buf, len)
                }
            }
        }
    }

    fn get_device_info(&self, device: &NativeDevice) -> Option<RawDeviceInfo> {
        // The record is owned by the device and stays valid while it is open.
        let info = unsafe { (self.api.get_device_info)(device.as_ptr()) };
        if info.is_null() {
            None
        } else {
            Some(unsafe { raw_info(info) })
        }
    }

    fn error(&self, device: Option<&NativeDevice>) -> Option<WideString> {
        let dev = device.map_or(ptr::null_mut(), NativeDevice::as_ptr);
        let message = unsafe { WideString::from_ptr((self.api.error)(dev)) }?;
        if message.to_string_lossy() == NO_ERROR {
            None
        } else {
            Some(message)
        }
    }

    fn version(&self) -> ApiVersion {
        let version = unsafe { (self.api.version)() };
        if version.is_null() {
            return ApiVersion::default();
        }
        let version = unsafe { &*version };
        ApiVersion {
            major: version.major,
            minor: version.minor,
            patch: version.patch,
        }
    }

    fn version_str(&self) -> String {
        let version = unsafe { (self.api.version_str)() };
        if version.is_null() {
            return String::new();
        }
        unsafe { CStr::from_ptr(version) }.to_string_lossy().into_owned()
    }

    fn supports(&self, capability: Capability) -> bool {
        let api = &self.api;
        match capability {
            Capability::OpenExclusive => {
                api.darwin_set_open_exclusive.is_some()
                    && api.darwin_get_open_exclusive.is_some()
                    && api.darwin_is_device_open_exclusive.is_some()
            }
            Capability::LocationId => api.darwin_get_location_id.is_some(),
            Capability::WrapSysDevice => api.libusb_wrap_sys_device.is_some(),
            Capability::ContainerId => api.winapi_get_container_id.is_some(),
            Capability::ReconstructDescriptor => {
                api.winapi_descriptor_reconstruct_pp_data.is_some()
            }
        }
    }
}
