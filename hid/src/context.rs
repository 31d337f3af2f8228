//! Process-wide lifecycle of the transport, enumeration and opening devices.

use std::ffi::CString;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::capability::Capability;
use crate::config::Config;
use crate::device::{DeviceHandle, DeviceInfo};
use crate::platform::NativeTransport;
use crate::transport::{ApiVersion, Transport};
use crate::wide::encode;
use crate::Error;

#[derive(Debug, Default)]
struct Lifecycle {
    /// Outstanding `init` calls.
    refs: usize,
    /// Whether the transport's own init has run.
    initialized: bool,
}

pub(crate) struct Shared<T: Transport> {
    pub(crate) transport: T,
    lifecycle: Mutex<Lifecycle>,
    open_handles: AtomicUsize,
}

impl<T: Transport> Shared<T> {
    pub(crate) fn handle_opened(&self) -> usize {
        self.open_handles.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn handle_closed(&self) -> usize {
        self.open_handles.fetch_sub(1, Ordering::AcqRel) - 1
    }

    /// Failure not tied to a device, carrying the transport's message.
    pub(crate) fn global_failure(&self) -> Error {
        Error::transport(self.transport.error(None).map(|wide| wide.to_string_lossy()))
    }

    fn ensure_init(&self, state: &mut Lifecycle) -> Result<(), Error> {
        if state.initialized {
            return Ok(());
        }
        if self.transport.init() < 0 {
            return Err(self.global_failure());
        }
        state.initialized = true;
        debug!("HID transport initialized");
        Ok(())
    }
}

/// Owns a transport and guards its init/exit ordering.
///
/// `init` is optional: enumeration and the open calls initialize the transport
/// on first use. Calling it up front avoids racing that lazy initialization
/// when several threads start using the library at once. Each `init` should be
/// balanced by one `shutdown`; the transport is released when the last one
/// runs, which is refused while handles are still open.
///
/// Clones share the same state.
pub struct Context<T: Transport = NativeTransport> {
    shared: Arc<Shared<T>>,
}

impl<T: Transport> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Context<NativeTransport> {
    /// Loads the native hidapi library described by `config`.
    pub fn load(config: &Config) -> Result<Self, Error> {
        NativeTransport::load(config).map(Self::new)
    }
}

impl<T: Transport> Context<T> {
    /// Wraps a transport. Nothing is initialized until first use.
    pub fn new(transport: T) -> Self {
        Self {
            shared: Arc::new(Shared {
                transport,
                lifecycle: Mutex::new(Lifecycle::default()),
                open_handles: AtomicUsize::new(0),
            }),
        }
    }

    /// The transport this context drives.
    pub fn transport(&self) -> &T {
        &self.shared.transport
    }

    pub(crate) fn shared(&self) -> &Arc<Shared<T>> {
        &self.shared
    }

    /// Initializes the transport and takes a reference on it.
    pub fn init(&self) -> Result<(), Error> {
        let mut state = self.shared.lifecycle.lock();
        self.shared.ensure_init(&mut state)?;
        state.refs += 1;
        Ok(())
    }

    /// Drops a reference taken by [`Context::init`]. The last one releases
    /// the transport, including one that was initialized lazily.
    ///
    /// On failure the state is left as it was so the call can be retried.
    pub fn shutdown(&self) -> Result<(), Error> {
        let mut state = self.shared.lifecycle.lock();
        if state.refs > 1 {
            state.refs -= 1;
            return Ok(());
        }
        let open = self.open_handles();
        if open > 0 {
            return Err(Error::HandlesOpen(open));
        }
        if state.initialized {
            if self.shared.transport.exit() < 0 {
                return Err(self.shared.global_failure());
            }
            state.initialized = false;
            debug!("HID transport released");
        }
        state.refs = 0;
        Ok(())
    }

    /// Whether the transport is currently initialized, explicitly or lazily.
    pub fn is_initialized(&self) -> bool {
        self.shared.lifecycle.lock().initialized
    }

    /// Number of handles opened through this context and not yet closed.
    pub fn open_handles(&self) -> usize {
        self.shared.open_handles.load(Ordering::Acquire)
    }

    /// The last error not tied to an open device, such as a failed open.
    /// `None` if the last such operation succeeded.
    pub fn last_error(&self) -> Option<String> {
        self.shared
            .transport
            .error(None)
            .map(|wide| wide.to_string_lossy())
    }

    /// Visits each attached device matching `vendor_id` and `product_id`
    /// (`0` matches any). The first error returned by `visit` stops the walk
    /// and is returned as-is.
    ///
    /// Finding no device is not an error. Failing to initialize the
    /// transport is, and reaches the caller through `E`.
    pub fn enumerate<F, E>(&self, vendor_id: u16, product_id: u16, mut visit: F) -> Result<(), E>
    where
        F: FnMut(&DeviceInfo) -> Result<(), E>,
        E: From<Error>,
    {
        {
            let mut state = self.shared.lifecycle.lock();
            self.shared.ensure_init(&mut state)?;
        }

        let devices = self.shared.transport.enumerate(vendor_id, product_id);
        for raw in devices {
            let info = DeviceInfo::from_raw(raw);
            if !info.matches(vendor_id, product_id) {
                continue;
            }
            visit(&info)?;
        }
        Ok(())
    }

    /// Collects one enumeration pass.
    pub fn devices(&self, vendor_id: u16, product_id: u16) -> Result<Vec<DeviceInfo>, Error> {
        let mut devices = Vec::new();
        self.enumerate(vendor_id, product_id, |info| {
            devices.push(info.clone());
            Ok::<(), Error>(())
        })?;
        Ok(devices)
    }

    /// Opens the device with matching IDs and serial number.
    ///
    /// # Panics
    ///
    /// Panics if `serial_number` contains a NUL character.
    pub fn open(
        &self,
        vendor_id: u16,
        product_id: u16,
        serial_number: &str,
    ) -> Result<DeviceHandle<T>, Error> {
        let serial = encode(serial_number);
        self.open_with(|transport| transport.open(vendor_id, product_id, Some(&serial)))
    }

    /// Opens the first device with matching IDs.
    pub fn open_first(&self, vendor_id: u16, product_id: u16) -> Result<DeviceHandle<T>, Error> {
        self.open_with(|transport| transport.open(vendor_id, product_id, None))
    }

    /// Opens the device at `path`, as reported in [`DeviceInfo::path`].
    pub fn open_path(&self, path: &str) -> Result<DeviceHandle<T>, Error> {
        let path = CString::new(path)
            .map_err(|_| Error::Transport(format!("invalid device path {path:?}")))?;
        self.open_with(|transport| transport.open_path(&path))
    }

    pub(crate) fn open_with<F>(&self, open: F) -> Result<DeviceHandle<T>, Error>
    where
        F: FnOnce(&T) -> Option<T::Device>,
    {
        let mut state = self.shared.lifecycle.lock();
        self.shared.ensure_init(&mut state)?;
        match open(&self.shared.transport) {
            Some(device) => Ok(DeviceHandle::new(Arc::clone(&self.shared), device)),
            None => Err(self.shared.global_failure()),
        }
    }

    /// Version of the transport library, readable before `init`.
    pub fn version(&self) -> ApiVersion {
        self.shared.transport.version()
    }

    /// Version string of the transport library, e.g. `0.14.0`.
    pub fn version_str(&self) -> String {
        self.shared.transport.version_str()
    }

    /// Whether a platform extension is available in the loaded transport.
    pub fn supports(&self, capability: Capability) -> bool {
        self.shared.transport.supports(capability)
    }
}
