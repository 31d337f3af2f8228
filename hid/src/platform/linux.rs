//! Linux and FreeBSD: hidraw and libusb builds of hidapi.

use std::ffi::c_int;

use super::{NativeDevice, NativeTransport};
use crate::transport::LibusbTransport;

/// hidraw first, it sees Bluetooth and I2C devices as well; libusb only
/// exports `hid_libusb_wrap_sys_device`.
#[cfg(target_os = "linux")]
pub(super) const LIBRARY_NAMES: &[&str] = &[
    "libhidapi-hidraw.so.0",
    "libhidapi-hidraw.so",
    "libhidapi-libusb.so.0",
    "libhidapi-libusb.so",
];

#[cfg(target_os = "freebsd")]
pub(super) const LIBRARY_NAMES: &[&str] = &["libhidapi.so.0", "libhidapi.so"];

impl LibusbTransport for NativeTransport {
    fn wrap_sys_device(&self, sys_dev: isize, interface_num: c_int) -> Option<NativeDevice> {
        let wrap = self.api.libusb_wrap_sys_device?;
        Self::wrap(unsafe { wrap(sys_dev, interface_num) })
    }
}
