//! In-memory transport used by the integration tests.
//!
//! Devices echo output reports back as input reports, keep feature reports
//! per report ID, and record the last error the way hidapi does: cleared on
//! success, set on failure.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::ffi::{c_int, CStr, CString};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hid::{
    ApiVersion, Capability, DarwinTransport, Guid, LibusbTransport, RawDeviceInfo,
    StringDescriptor, Transport, WChar, WideString, WinapiTransport,
};
use parking_lot::Mutex;

pub const VERSION: ApiVersion = ApiVersion {
    major: 0,
    minor: 14,
    patch: 0,
};

/// First bytes of a Windows `HIDP_PREPARSED_DATA` blob.
pub const PP_DATA_MAGIC: &[u8] = b"HidP KDR";

pub const CONTAINER_ID: Guid = Guid {
    data1: 0x6f1d2b61,
    data2: 0xd5a0,
    data3: 0x11cf,
    data4: [0xbf, 0xc7, 0x44, 0x45, 0x53, 0x54, 0x00, 0x00],
};

/// A device the mock can enumerate and open.
#[derive(Debug, Clone)]
pub struct MockDevice {
    pub info: RawDeviceInfo,
    pub strings: HashMap<i32, String>,
    pub descriptor: Vec<u8>,
    pub location_id: u32,
    pub fail_writes: bool,
}

impl MockDevice {
    pub fn new(path: &str, vendor_id: u16, product_id: u16) -> Self {
        Self {
            info: RawDeviceInfo {
                path: CString::new(path).unwrap(),
                vendor_id,
                product_id,
                serial_number: None,
                release_number: 0x0100,
                manufacturer_string: None,
                product_string: None,
                usage_page: 0xff00,
                usage: 0x0001,
                interface_number: 0,
                bus_type: 1,
            },
            strings: HashMap::new(),
            descriptor: vec![0x06, 0x00, 0xff, 0x09, 0x01, 0xa1, 0x01, 0xc0],
            location_id: 0x1410_0000,
            fail_writes: false,
        }
    }

    pub fn serial(mut self, serial: &str) -> Self {
        self.info.serial_number = Some(WideString::new(serial));
        self
    }

    pub fn manufacturer(mut self, name: &str) -> Self {
        self.info.manufacturer_string = Some(WideString::new(name));
        self
    }

    pub fn product(mut self, name: &str) -> Self {
        self.info.product_string = Some(WideString::new(name));
        self
    }

    pub fn string(mut self, index: i32, text: &str) -> Self {
        self.strings.insert(index, text.to_string());
        self
    }

    pub fn release(mut self, bcd: u16) -> Self {
        self.info.release_number = bcd;
        self
    }

    pub fn interface(mut self, number: c_int) -> Self {
        self.info.interface_number = number;
        self
    }

    pub fn bus(mut self, bus_type: c_int) -> Self {
        self.info.bus_type = bus_type;
        self
    }

    pub fn descriptor(mut self, bytes: &[u8]) -> Self {
        self.descriptor = bytes.to_vec();
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }
}

/// Native handle of an open mock device.
#[derive(Debug)]
pub struct MockHandle {
    id: usize,
}

#[derive(Debug)]
struct OpenDevice {
    device: MockDevice,
    input: VecDeque<Vec<u8>>,
    features: HashMap<u8, Vec<u8>>,
    nonblocking: bool,
    exclusive: bool,
    error: Option<String>,
    last_timeout: Option<c_int>,
}

#[derive(Debug, Default)]
struct State {
    devices: Vec<MockDevice>,
    open: HashMap<usize, OpenDevice>,
    next_id: usize,
    global_error: Option<String>,
    fail_init: Option<String>,
    fail_exit: Option<String>,
    ignore_filters: bool,
    open_exclusive: bool,
}

pub struct MockTransport {
    state: Mutex<State>,
    capabilities: HashSet<Capability>,
    init_calls: AtomicUsize,
    exit_calls: AtomicUsize,
    close_calls: AtomicUsize,
    freed_lists: Arc<AtomicUsize>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                open_exclusive: true,
                ..State::default()
            }),
            capabilities: HashSet::new(),
            init_calls: AtomicUsize::new(0),
            exit_calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
            freed_lists: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_device(self, device: MockDevice) -> Self {
        self.state.lock().devices.push(device);
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn with_all_capabilities(self) -> Self {
        [
            Capability::OpenExclusive,
            Capability::LocationId,
            Capability::WrapSysDevice,
            Capability::ContainerId,
            Capability::ReconstructDescriptor,
        ]
        .into_iter()
        .fold(self, Self::with_capability)
    }

    /// Enumeration returns every device regardless of the requested IDs.
    pub fn ignoring_filters(self) -> Self {
        self.state.lock().ignore_filters = true;
        self
    }

    pub fn fail_init(&self, message: Option<&str>) {
        self.state.lock().fail_init = message.map(str::to_string);
    }

    pub fn fail_exit(&self, message: Option<&str>) {
        self.state.lock().fail_exit = message.map(str::to_string);
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn exit_calls(&self) -> usize {
        self.exit_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn freed_lists(&self) -> usize {
        self.freed_lists.load(Ordering::SeqCst)
    }

    /// Queues an input report on every open device with `path`.
    pub fn push_input(&self, path: &str, report: &[u8]) {
        let mut state = self.state.lock();
        for open in state.open.values_mut() {
            if open.device.info.path.to_bytes() == path.as_bytes() {
                open.input.push_back(report.to_vec());
            }
        }
    }

    /// Millisecond argument of the last `read_timeout` on any device.
    pub fn last_timeout(&self) -> Option<c_int> {
        let state = self.state.lock();
        state.open.values().find_map(|open| open.last_timeout)
    }

    fn open_matching<P>(&self, predicate: P, missing: &str) -> Option<MockHandle>
    where
        P: Fn(&MockDevice) -> bool,
    {
        let mut state = self.state.lock();
        let Some(device) = state.devices.iter().find(|&d| predicate(d)).cloned() else {
            state.global_error = Some(missing.to_string());
            return None;
        };
        state.global_error = None;
        let id = state.next_id;
        state.next_id += 1;
        let exclusive = state.open_exclusive;
        state.open.insert(
            id,
            OpenDevice {
                device,
                input: VecDeque::new(),
                features: HashMap::new(),
                nonblocking: false,
                exclusive,
                error: None,
                last_timeout: None,
            },
        );
        Some(MockHandle { id })
    }

    fn with_open<R>(
        &self,
        handle: &MockHandle,
        op: impl FnOnce(&mut OpenDevice) -> Result<R, String>,
    ) -> Result<R, ()> {
        let mut state = self.state.lock();
        let open = state
            .open
            .get_mut(&handle.id)
            .expect("operation on a closed mock device");
        match op(open) {
            Ok(value) => {
                open.error = None;
                Ok(value)
            }
            Err(message) => {
                open.error = Some(message);
                Err(())
            }
        }
    }

    fn count(
        &self,
        handle: &MockHandle,
        op: impl FnOnce(&mut OpenDevice) -> Result<usize, String>,
    ) -> c_int {
        self.with_open(handle, op).map_or(-1, |n| n as c_int)
    }
}

fn copy_into(src: &[u8], dst: &mut [u8]) -> usize {
    let n = src.len().min(dst.len());
    dst[..n].copy_from_slice(&src[..n]);
    n
}

fn copy_wide(text: &str, buffer: &mut [WChar]) {
    let wide = WideString::new(text);
    let units = wide.units();
    let n = units.len().min(buffer.len() - 1);
    buffer[..n].copy_from_slice(&units[..n]);
    buffer[n] = 0;
}

/// One enumeration pass; counts the lists released.
pub struct MockEnumeration {
    items: std::vec::IntoIter<RawDeviceInfo>,
    freed: Arc<AtomicUsize>,
}

impl Iterator for MockEnumeration {
    type Item = RawDeviceInfo;

    fn next(&mut self) -> Option<RawDeviceInfo> {
        self.items.next()
    }
}

impl Drop for MockEnumeration {
    fn drop(&mut self) {
        self.freed.fetch_add(1, Ordering::SeqCst);
    }
}

impl Transport for MockTransport {
    type Device = MockHandle;
    type Enumeration = MockEnumeration;

    fn init(&self) -> c_int {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        match state.fail_init.clone() {
            Some(message) => {
                state.global_error = Some(message).filter(|m| !m.is_empty());
                -1
            }
            None => {
                state.global_error = None;
                0
            }
        }
    }

    fn exit(&self) -> c_int {
        self.exit_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        match state.fail_exit.clone() {
            Some(message) => {
                state.global_error = Some(message).filter(|m| !m.is_empty());
                -1
            }
            None => 0,
        }
    }

    fn enumerate(&self, vendor_id: u16, product_id: u16) -> MockEnumeration {
        let state = self.state.lock();
        let items: Vec<RawDeviceInfo> = state
            .devices
            .iter()
            .map(|d| &d.info)
            .filter(|info| {
                state.ignore_filters
                    || ((vendor_id == 0 || info.vendor_id == vendor_id)
                        && (product_id == 0 || info.product_id == product_id))
            })
            .cloned()
            .collect();
        MockEnumeration {
            items: items.into_iter(),
            freed: Arc::clone(&self.freed_lists),
        }
    }

    fn open(
        &self,
        vendor_id: u16,
        product_id: u16,
        serial_number: Option<&WideString>,
    ) -> Option<MockHandle> {
        self.open_matching(
            |d| {
                (vendor_id == 0 || d.info.vendor_id == vendor_id)
                    && (product_id == 0 || d.info.product_id == product_id)
                    && serial_number.map_or(true, |s| d.info.serial_number.as_ref() == Some(s))
            },
            "unable to open device",
        )
    }

    fn open_path(&self, path: &CStr) -> Option<MockHandle> {
        self.open_matching(|d| d.info.path.as_c_str() == path, "no such device")
    }

    fn close(&self, device: MockHandle) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.state.lock().open.remove(&device.id);
    }

    fn write(&self, device: &MockHandle, data: &[u8]) -> c_int {
        self.count(device, |open| {
            if open.device.fail_writes {
                return Err("write failed: broken pipe".into());
            }
            let payload = if data[0] == 0 { &data[1..] } else { data };
            open.input.push_back(payload.to_vec());
            Ok(data.len())
        })
    }

    fn read(&self, device: &MockHandle, data: &mut [u8]) -> c_int {
        self.count(device, |open| match open.input.pop_front() {
            Some(report) => Ok(copy_into(&report, data)),
            None if open.nonblocking => Ok(0),
            // A blocking read on an empty queue would hang forever.
            None => Err("no input report queued".into()),
        })
    }

    fn read_timeout(&self, device: &MockHandle, data: &mut [u8], milliseconds: c_int) -> c_int {
        self.count(device, |open| {
            open.last_timeout = Some(milliseconds);
            Ok(open
                .input
                .pop_front()
                .map_or(0, |report| copy_into(&report, data)))
        })
    }

    fn set_nonblocking(&self, device: &MockHandle, nonblocking: bool) -> c_int {
        self.count(device, |open| {
            open.nonblocking = nonblocking;
            Ok(0)
        })
    }

    fn send_feature_report(&self, device: &MockHandle, data: &[u8]) -> c_int {
        self.count(device, |open| {
            open.features.insert(data[0], data.to_vec());
            Ok(data.len())
        })
    }

    fn get_feature_report(&self, device: &MockHandle, data: &mut [u8]) -> c_int {
        self.count(device, |open| match open.features.get(&data[0]) {
            Some(report) => Ok(copy_into(report, data)),
            None => Err(format!("feature report {} not set", data[0])),
        })
    }

    fn get_input_report(&self, device: &MockHandle, data: &mut [u8]) -> c_int {
        self.count(device, |open| match open.input.pop_front() {
            Some(report) => {
                let n = copy_into(&report, &mut data[1..]);
                Ok(n + 1)
            }
            None => Err("input report not available".into()),
        })
    }

    fn get_report_descriptor(&self, device: &MockHandle, data: &mut [u8]) -> c_int {
        self.count(device, |open| Ok(copy_into(&open.device.descriptor, data)))
    }

    fn get_string(
        &self,
        device: &MockHandle,
        which: StringDescriptor,
        buffer: &mut [WChar],
    ) -> c_int {
        self.count(device, |open| {
            let info = &open.device.info;
            let text = match which {
                StringDescriptor::Manufacturer => hid::decode(info.manufacturer_string.as_ref()),
                StringDescriptor::Product => hid::decode(info.product_string.as_ref()),
                StringDescriptor::SerialNumber => hid::decode(info.serial_number.as_ref()),
                StringDescriptor::Indexed(index) => match open.device.strings.get(&index) {
                    Some(text) => text.clone(),
                    None => return Err(format!("string index {index} out of range")),
                },
            };
            copy_wide(&text, buffer);
            Ok(0)
        })
    }

    fn get_device_info(&self, device: &MockHandle) -> Option<RawDeviceInfo> {
        self.with_open(device, |open| Ok(open.device.info.clone())).ok()
    }

    fn error(&self, device: Option<&MockHandle>) -> Option<WideString> {
        let state = self.state.lock();
        let message = match device {
            Some(handle) => state.open.get(&handle.id).and_then(|open| open.error.clone()),
            None => state.global_error.clone(),
        };
        message.map(|m| WideString::new(&m))
    }

    fn version(&self) -> ApiVersion {
        VERSION
    }

    fn version_str(&self) -> String {
        VERSION.to_string()
    }

    fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

impl DarwinTransport for MockTransport {
    fn location_id(&self, device: &MockHandle, location_id: &mut u32) -> c_int {
        self.count(device, |open| {
            *location_id = open.device.location_id;
            Ok(0)
        })
    }

    fn set_open_exclusive(&self, exclusive: bool) {
        self.state.lock().open_exclusive = exclusive;
    }

    fn open_exclusive(&self) -> bool {
        self.state.lock().open_exclusive
    }

    fn is_device_open_exclusive(&self, device: &MockHandle) -> c_int {
        self.count(device, |open| Ok(open.exclusive as usize))
    }
}

impl LibusbTransport for MockTransport {
    fn wrap_sys_device(&self, sys_dev: isize, interface_num: c_int) -> Option<MockHandle> {
        if sys_dev < 0 {
            self.state.lock().global_error = Some("invalid file descriptor".into());
            return None;
        }
        self.open_matching(
            |d| interface_num == -1 || d.info.interface_number == interface_num,
            "interface not found",
        )
    }
}

impl WinapiTransport for MockTransport {
    fn container_id(&self, device: &MockHandle, container_id: &mut Guid) -> c_int {
        self.count(device, |_| {
            *container_id = CONTAINER_ID;
            Ok(0)
        })
    }

    fn reconstruct_descriptor(&self, pp_data: &[u8], buffer: &mut [u8]) -> c_int {
        let mut state = self.state.lock();
        if !pp_data.starts_with(PP_DATA_MAGIC) {
            state.global_error = Some("invalid preparsed data".into());
            return -1;
        }
        state.global_error = None;
        copy_into(&pp_data[PP_DATA_MAGIC.len()..], buffer) as c_int
    }
}
