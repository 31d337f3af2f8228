//! Windows: the WinAPI build of hidapi.

use std::ffi::{c_int, c_void};

use windows::core::GUID;

use super::{NativeDevice, NativeTransport};
use crate::transport::{Guid, WinapiTransport};

pub(super) const LIBRARY_NAMES: &[&str] = &["hidapi.dll", "libhidapi-0.dll"];

impl WinapiTransport for NativeTransport {
    fn container_id(&self, device: &NativeDevice, container_id: &mut Guid) -> c_int {
        match self.api.winapi_get_container_id {
            Some(get) => unsafe { get(device.as_ptr(), container_id) },
            None => -1,
        }
    }

    fn reconstruct_descriptor(&self, pp_data: &[u8], buffer: &mut [u8]) -> c_int {
        let Some(reconstruct) = self.api.winapi_descriptor_reconstruct_pp_data else {
            return -1;
        };
        // hidapi only reads through the pre-parsed data pointer.
        let pp_data = pp_data.as_ptr() as *mut c_void;
        unsafe { reconstruct(pp_data, buffer.as_mut_ptr(), buffer.len()) }
    }
}

impl From<Guid> for GUID {
    fn from(guid: Guid) -> Self {
        GUID::from_values(guid.data1, guid.data2, guid.data3, guid.data4)
    }
}

impl From<GUID> for Guid {
    fn from(guid: GUID) -> Self {
        Guid {
            data1: guid.data1,
            data2: guid.data2,
            data3: guid.data3,
            data4: guid.data4,
        }
    }
}
