//! Device records and open device handles.

use std::cell::Cell;
use std::ffi::c_int;
use std::fmt;
use std::io;
use std::mem::ManuallyDrop;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::context::Shared;
use crate::platform::NativeTransport;
use crate::transport::{RawDeviceInfo, StringDescriptor, Transport};
use crate::wide::{decode, WideString, MAX_STRING_LEN};
use crate::Error;

/// The bus a device is attached through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BusType {
    #[default]
    Unknown,
    Usb,
    Bluetooth,
    I2c,
    Spi,
}

impl From<c_int> for BusType {
    fn from(value: c_int) -> Self {
        match value {
            1 => BusType::Usb,
            2 => BusType::Bluetooth,
            3 => BusType::I2c,
            4 => BusType::Spi,
            _ => BusType::Unknown,
        }
    }
}

impl fmt::Display for BusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BusType::Unknown => "Unknown",
            BusType::Usb => "USB",
            BusType::Bluetooth => "Bluetooth",
            BusType::I2c => "I2C",
            BusType::Spi => "SPI",
        };
        f.write_str(name)
    }
}

/// A HID device attached to the system, as seen at enumeration time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DeviceInfo {
    /// Platform-specific path, accepted by `open_path`.
    pub path: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub serial_number: String,
    /// Device release number in BCD.
    pub release_number: u16,
    pub manufacturer_string: String,
    pub product_string: String,
    pub usage_page: u16,
    pub usage: u16,
    /// USB interface number, `-1` where it does not apply.
    pub interface_number: i32,
    pub bus_type: BusType,
}

impl DeviceInfo {
    pub(crate) fn from_raw(raw: RawDeviceInfo) -> Self {
        Self {
            path: raw.path.to_string_lossy().into_owned(),
            vendor_id: raw.vendor_id,
            product_id: raw.product_id,
            serial_number: decode(raw.serial_number.as_ref()),
            release_number: raw.release_number,
            manufacturer_string: decode(raw.manufacturer_string.as_ref()),
            product_string: decode(raw.product_string.as_ref()),
            usage_page: raw.usage_page,
            usage: raw.usage,
            interface_number: raw.interface_number,
            bus_type: BusType::from(raw.bus_type),
        }
    }

    /// Splits the BCD release number into `(major, minor)`.
    pub fn release(&self) -> (u8, u8) {
        ((self.release_number >> 8) as u8, (self.release_number & 0xff) as u8)
    }

    /// Whether the record passes an enumeration filter; `0` matches any ID.
    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        (vendor_id == 0 || self.vendor_id == vendor_id)
            && (product_id == 0 || self.product_id == product_id)
    }
}

/// An open HID device.
///
/// The handle owns the native device and closes it when dropped or passed to
/// [`DeviceHandle::close`]. It can be moved to another thread but not shared:
/// wrap it in a `Mutex` to issue calls from several threads.
///
/// Report buffers must hold at least one byte. For output and feature reports
/// the first byte is the report ID, `0` for devices with a single unnumbered
/// report.
pub struct DeviceHandle<T: Transport = NativeTransport> {
    shared: Arc<Shared<T>>,
    device: ManuallyDrop<T::Device>,
    nonblocking: Cell<bool>,
}

impl<T: Transport> DeviceHandle<T> {
    pub(crate) fn new(shared: Arc<Shared<T>>, device: T::Device) -> Self {
        let open = shared.handle_opened();
        debug!(open, "opened HID device");
        Self {
            shared,
            device: ManuallyDrop::new(device),
            nonblocking: Cell::new(false),
        }
    }

    pub(crate) fn transport(&self) -> &T {
        &self.shared.transport
    }

    pub(crate) fn raw(&self) -> &T::Device {
        &self.device
    }

    /// Failure on this handle, carrying the transport's message.
    pub(crate) fn failure(&self) -> Error {
        Error::transport(self.last_error())
    }

    pub(crate) fn check_count(&self, res: c_int) -> Result<usize, Error> {
        if res < 0 {
            Err(self.failure())
        } else {
            Ok(res as usize)
        }
    }

    fn check_read(&self, res: c_int) -> Result<usize, Error> {
        match res {
            res if res < 0 => Err(self.failure()),
            0 => Err(Error::Timeout),
            n => Ok(n as usize),
        }
    }

    /// Sends an output report. Data goes over the first OUT endpoint if the
    /// device has one, otherwise over the control endpoint.
    pub fn write(&self, data: &[u8]) -> Result<usize, Error> {
        ensure_not_empty(data)?;
        let res = self.transport().write(&self.device, data);
        trace!(len = data.len(), res, "output report");
        self.check_count(res)
    }

    /// Receives an input report. In non-blocking mode this returns
    /// [`Error::Timeout`] right away when nothing is pending.
    ///
    /// For devices with numbered reports the first byte holds the report ID.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, Error> {
        ensure_not_empty(buf)?;
        let res = self.transport().read(&self.device, buf);
        trace!(len = buf.len(), res, "input report");
        self.check_read(res)
    }

    /// Receives an input report, waiting at most `timeout`. A zero timeout
    /// polls without blocking.
    pub fn read_with_timeout(&self, buf: &mut [u8], timeout: Duration) -> Result<usize, Error> {
        ensure_not_empty(buf)?;
        let milliseconds = timeout_millis(timeout);
        let res = self.transport().read_timeout(&self.device, buf, milliseconds);
        trace!(len = buf.len(), milliseconds, res, "input report");
        self.check_read(res)
    }

    /// Changes how [`DeviceHandle::read`] behaves when no report is pending.
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<(), Error> {
        let res = self.transport().set_nonblocking(&self.device, nonblocking);
        self.check_count(res)?;
        self.nonblocking.set(nonblocking);
        Ok(())
    }

    /// Mode last set with [`DeviceHandle::set_nonblocking`]; blocking when opened.
    pub fn is_nonblocking(&self) -> bool {
        self.nonblocking.get()
    }

    /// Sends a feature report as a Set_Report control transfer. The first
    /// byte selects the report ID.
    pub fn send_feature_report(&self, data: &[u8]) -> Result<usize, Error> {
        ensure_not_empty(data)?;
        let res = self.transport().send_feature_report(&self.device, data);
        trace!(report_id = data[0], len = data.len(), res, "set feature report");
        self.check_count(res)
    }

    /// Receives a feature report. Set the first byte to the report ID before
    /// calling; the count returned includes that byte.
    pub fn get_feature_report(&self, buf: &mut [u8]) -> Result<usize, Error> {
        ensure_not_empty(buf)?;
        let report_id = buf[0];
        let res = self.transport().get_feature_report(&self.device, buf);
        trace!(report_id, len = buf.len(), res, "get feature report");
        self.check_count(res)
    }

    /// Polls an input report over the control endpoint instead of the
    /// interrupt stream.
    pub fn get_input_report(&self, buf: &mut [u8]) -> Result<usize, Error> {
        ensure_not_empty(buf)?;
        let res = self.transport().get_input_report(&self.device, buf);
        self.check_count(res)
    }

    /// Copies the raw report descriptor into `buf`, truncated to its length.
    pub fn get_report_descriptor(&self, buf: &mut [u8]) -> Result<usize, Error> {
        ensure_not_empty(buf)?;
        let res = self.transport().get_report_descriptor(&self.device, buf);
        self.check_count(res)
    }

    /// The manufacturer string. Empty if the device reports none.
    pub fn manufacturer_string(&self) -> Result<String, Error> {
        self.read_string(StringDescriptor::Manufacturer)
    }

    /// The product string. Empty if the device reports none.
    pub fn product_string(&self) -> Result<String, Error> {
        self.read_string(StringDescriptor::Product)
    }

    /// The serial number string. Empty if the device reports none.
    pub fn serial_number(&self) -> Result<String, Error> {
        self.read_string(StringDescriptor::SerialNumber)
    }

    /// Reads a string descriptor by index. Unlike the named accessors, an
    /// index the device does not have is an error.
    pub fn indexed_string(&self, index: i32) -> Result<String, Error> {
        self.read_string(StringDescriptor::Indexed(index))
    }

    fn read_string(&self, which: StringDescriptor) -> Result<String, Error> {
        let mut wide = WideString::zeroed(MAX_STRING_LEN);
        let res = self
            .transport()
            .get_string(&self.device, which, wide.as_mut_buffer());
        self.check_count(res)?;
        wide.as_mut_buffer()[MAX_STRING_LEN] = 0;
        Ok(wide.to_string_lossy())
    }

    /// Re-reads the device record for this handle.
    pub fn device_info(&self) -> Result<DeviceInfo, Error> {
        self.transport()
            .get_device_info(&self.device)
            .map(DeviceInfo::from_raw)
            .ok_or_else(|| self.failure())
    }

    /// The last error reported on this handle, `None` if the last operation
    /// succeeded.
    pub fn last_error(&self) -> Option<String> {
        self.transport()
            .error(Some(&self.device))
            .map(|wide| wide.to_string_lossy())
    }

    /// Closes the device.
    pub fn close(self) {
        drop(self);
    }
}

impl<T: Transport> Drop for DeviceHandle<T> {
    fn drop(&mut self) {
        // SAFETY: `device` is taken exactly once, here, and never touched again.
        let device = unsafe { ManuallyDrop::take(&mut self.device) };
        self.shared.transport.close(device);
        let open = self.shared.handle_closed();
        debug!(open, "closed HID device");
    }
}

impl<T: Transport> fmt::Debug for DeviceHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("nonblocking", &self.nonblocking.get())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> io::Read for DeviceHandle<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        DeviceHandle::read(self, buf).map_err(io::Error::from)
    }
}

impl<T: Transport> io::Write for DeviceHandle<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        DeviceHandle::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn ensure_not_empty(buf: &[u8]) -> Result<(), Error> {
    if buf.is_empty() {
        Err(Error::EmptyBuffer)
    } else {
        Ok(())
    }
}

/// Converts a wait bound to the transport's millisecond argument. Partial
/// milliseconds round up so a non-zero wait never becomes a poll.
pub(crate) fn timeout_millis(timeout: Duration) -> c_int {
    if timeout.is_zero() {
        return 0;
    }
    let millis = timeout.as_nanos().div_ceil(1_000_000);
    millis.min(c_int::MAX as u128) as c_int
}
