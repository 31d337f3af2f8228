//! macOS: the IOHIDManager build of hidapi.

use std::ffi::c_int;

use super::{NativeDevice, NativeTransport};
use crate::transport::DarwinTransport;

pub(super) const LIBRARY_NAMES: &[&str] = &[
    "libhidapi.0.dylib",
    "libhidapi.dylib",
    "/opt/homebrew/lib/libhidapi.dylib",
    "/usr/local/lib/libhidapi.dylib",
];

impl DarwinTransport for NativeTransport {
    fn location_id(&self, device: &NativeDevice, location_id: &mut u32) -> c_int {
        match self.api.darwin_get_location_id {
            Some(get) => unsafe { get(device.as_ptr(), location_id) },
            None => -1,
        }
    }

    fn set_open_exclusive(&self, exclusive: bool) {
        if let Some(set) = self.api.darwin_set_open_exclusive {
            unsafe { set(exclusive as c_int) }
        }
    }

    fn open_exclusive(&self) -> bool {
        match self.api.darwin_get_open_exclusive {
            Some(get) => unsafe { get() != 0 },
            None => false,
        }
    }

    fn is_device_open_exclusive(&self, device: &NativeDevice) -> c_int {
        match self.api.darwin_is_device_open_exclusive {
            Some(is_exclusive) => unsafe { is_exclusive(device.as_ptr()) },
            None => -1,
        }
    }
}
