//! Platform-specific extensions.
//!
//! Each trait is implemented only for transports providing the matching
//! extension ([`DarwinTransport`], [`LibusbTransport`], [`WinapiTransport`]).
//! The native transport resolves extension symbols when the library is
//! loaded, so a trait being implemented does not guarantee the symbol was
//! found: calls on a build of hidapi without it fail with
//! [`Error::NotSupported`]. Use [`Context::supports`] to check up front.

use std::ffi::c_int;
use std::fmt;

use tracing::debug;

use crate::context::Context;
use crate::device::DeviceHandle;
use crate::transport::{DarwinTransport, Guid, LibusbTransport, Transport, WinapiTransport};
use crate::Error;

/// Matches any USB interface in [`SysDeviceOpen::open_sys_device`].
pub const INTERFACE_ANY: i32 = -1;

/// A platform extension the transport may provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    OpenExclusive,
    LocationId,
    WrapSysDevice,
    ContainerId,
    ReconstructDescriptor,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::OpenExclusive => "exclusive open mode",
            Capability::LocationId => "location ID",
            Capability::WrapSysDevice => "system device wrapping",
            Capability::ContainerId => "container ID",
            Capability::ReconstructDescriptor => "descriptor reconstruction",
        };
        f.write_str(name)
    }
}

fn require<T: Transport>(transport: &T, capability: Capability) -> Result<(), Error> {
    if transport.supports(capability) {
        Ok(())
    } else {
        Err(Error::NotSupported(capability))
    }
}

/// Default open mode for devices opened afterwards (macOS).
pub trait ExclusiveMode {
    /// With `false`, later opens share the device with other processes.
    fn set_open_exclusive(&self, exclusive: bool) -> Result<(), Error>;
    /// The current default; `true` unless changed.
    fn open_exclusive(&self) -> Result<bool, Error>;
}

impl<T: DarwinTransport> ExclusiveMode for Context<T> {
    fn set_open_exclusive(&self, exclusive: bool) -> Result<(), Error> {
        require(self.transport(), Capability::OpenExclusive)?;
        self.transport().set_open_exclusive(exclusive);
        debug!(exclusive, "default open mode changed");
        Ok(())
    }

    fn open_exclusive(&self) -> Result<bool, Error> {
        require(self.transport(), Capability::OpenExclusive)?;
        Ok(self.transport().open_exclusive())
    }
}

/// Whether an open device was opened exclusively (macOS).
pub trait OpenExclusive {
    /// `true` if no other process can open the device meanwhile.
    fn is_open_exclusive(&self) -> Result<bool, Error>;
}

impl<T: DarwinTransport> OpenExclusive for DeviceHandle<T> {
    fn is_open_exclusive(&self) -> Result<bool, Error> {
        require(self.transport(), Capability::OpenExclusive)?;
        match self.transport().is_device_open_exclusive(self.raw()) {
            res if res < 0 => Err(self.failure()),
            0 => Ok(false),
            _ => Ok(true),
        }
    }
}

/// IOKit location ID of an open device (macOS).
pub trait LocationId {
    /// Identifies the port the device is attached to.
    fn location_id(&self) -> Result<u32, Error>;
}

impl<T: DarwinTransport> LocationId for DeviceHandle<T> {
    fn location_id(&self) -> Result<u32, Error> {
        require(self.transport(), Capability::LocationId)?;
        let mut id = 0;
        let res = self.transport().location_id(self.raw(), &mut id);
        self.check_count(res)?;
        Ok(id)
    }
}

/// Opening a device from a descriptor the platform already handed out, such
/// as a file descriptor granted by Android's USB manager (libusb backend).
pub trait SysDeviceOpen {
    type Handle;

    /// Wraps `sys_dev` and opens `interface`, or the first HID interface
    /// with [`INTERFACE_ANY`].
    fn open_sys_device(&self, sys_dev: isize, interface: i32) -> Result<Self::Handle, Error>;
}

impl<T: LibusbTransport> SysDeviceOpen for Context<T> {
    type Handle = DeviceHandle<T>;

    fn open_sys_device(&self, sys_dev: isize, interface: i32) -> Result<DeviceHandle<T>, Error> {
        require(self.transport(), Capability::WrapSysDevice)?;
        let interface = interface as c_int;
        self.open_with(|transport| transport.wrap_sys_device(sys_dev, interface))
    }
}

/// Container ID grouping the device nodes of one physical device (Windows).
pub trait ContainerId {
    /// The container GUID from the device's property store.
    fn container_id(&self) -> Result<Guid, Error>;
}

impl<T: WinapiTransport> ContainerId for DeviceHandle<T> {
    fn container_id(&self) -> Result<Guid, Error> {
        require(self.transport(), Capability::ContainerId)?;
        let mut guid = Guid::default();
        let res = self.transport().container_id(self.raw(), &mut guid);
        self.check_count(res)?;
        Ok(guid)
    }
}

/// Rebuilding a report descriptor from Windows pre-parsed data.
pub trait DescriptorReconstruct {
    /// `pp_data` is an opaque `HIDP_PREPARSED_DATA` blob. Returns the number
    /// of descriptor bytes written to `buf`.
    fn reconstruct_descriptor(&self, pp_data: &[u8], buf: &mut [u8]) -> Result<usize, Error>;
}

impl<T: WinapiTransport> DescriptorReconstruct for Context<T> {
    fn reconstruct_descriptor(&self, pp_data: &[u8], buf: &mut [u8]) -> Result<usize, Error> {
        require(self.transport(), Capability::ReconstructDescriptor)?;
        if pp_data.is_empty() || buf.is_empty() {
            return Err(Error::EmptyBuffer);
        }
        let res = self.transport().reconstruct_descriptor(pp_data, buf);
        if res < 0 {
            return Err(self.shared().global_failure());
        }
        Ok(res as usize)
    }
}

