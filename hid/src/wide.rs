//! Conversion between Rust strings and the `wchar_t` strings used by the
//! transport for descriptor fields and error messages.
//!
//! `wchar_t` is UTF-16 on Windows and UTF-32 everywhere else. Both directions
//! go through Unicode scalar values directly instead of the C locale, which
//! mangles CJK text on Windows code pages.

use std::fmt;
use std::hash::{Hash, Hasher};

/// A single `wchar_t` code unit.
#[cfg(target_os = "windows")]
pub type WChar = u16;

/// A single `wchar_t` code unit.
#[cfg(unix)]
pub type WChar = libc::wchar_t;

/// A single `wchar_t` code unit.
#[cfg(not(any(unix, target_os = "windows")))]
pub type WChar = u32;

/// Maximum length of a string descriptor (`bLength` is a single byte).
pub const MAX_STRING_LEN: usize = u8::MAX as usize;

/// An owned, NUL-terminated `wchar_t` string.
///
/// The buffer always ends in a terminator, so `as_ptr` can be handed to the
/// transport as-is. Out-parameter buffers are created with
/// [`WideString::zeroed`] and read back up to the first NUL.
#[derive(Clone)]
pub struct WideString {
    units: Vec<WChar>,
}

impl WideString {
    /// Encodes `text`.
    ///
    /// # Panics
    ///
    /// Panics if `text` contains an interior NUL, which cannot be represented
    /// in a C wide string.
    pub fn new(text: &str) -> Self {
        assert!(
            !text.contains('\0'),
            "cannot convert string with interior NUL to a wide string: {text:?}"
        );
        let mut units = encode_units(text);
        units.push(0);
        Self { units }
    }

    /// Allocates a buffer able to hold `len` units plus the terminator.
    pub fn zeroed(len: usize) -> Self {
        Self {
            units: vec![0; len + 1],
        }
    }

    /// Copies `units` up to the first NUL (or the end of the slice).
    pub fn from_units(units: &[WChar]) -> Self {
        let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
        let mut owned = Vec::with_capacity(end + 1);
        owned.extend_from_slice(&units[..end]);
        owned.push(0);
        Self { units: owned }
    }

    /// Copies a NUL-terminated string owned by the transport. A null pointer
    /// yields `None`.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point to a readable, NUL-terminated `wchar_t`
    /// string.
    pub unsafe fn from_ptr(ptr: *const WChar) -> Option<Self> {
        if ptr.is_null() {
            return None;
        }
        let mut len = 0;
        while *ptr.add(len) != 0 {
            len += 1;
        }
        Some(Self::from_units(std::slice::from_raw_parts(ptr, len)))
    }

    /// Pointer to the NUL-terminated buffer, valid while `self` lives.
    pub fn as_ptr(&self) -> *const WChar {
        self.units.as_ptr()
    }

    /// The whole backing buffer including the terminator slot, for use as an
    /// out-parameter.
    pub fn as_mut_buffer(&mut self) -> &mut [WChar] {
        &mut self.units
    }

    /// Code units before the first NUL.
    pub fn units(&self) -> &[WChar] {
        let end = self
            .units
            .iter()
            .position(|&u| u == 0)
            .unwrap_or(self.units.len());
        &self.units[..end]
    }

    /// Number of code units before the terminator.
    pub fn len(&self) -> usize {
        self.units().len()
    }

    /// Returns `true` if there are no code units before the terminator.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decodes the string, replacing invalid code units with U+FFFD.
    pub fn to_string_lossy(&self) -> String {
        decode_units(self.units())
    }
}

impl fmt::Debug for WideString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.to_string_lossy(), f)
    }
}

impl PartialEq for WideString {
    fn eq(&self, other: &Self) -> bool {
        self.units() == other.units()
    }
}

impl Eq for WideString {}

impl Hash for WideString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.units().hash(state);
    }
}

impl From<&str> for WideString {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// Converts `text` to a wide string. See [`WideString::new`].
pub fn encode(text: &str) -> WideString {
    WideString::new(text)
}

/// Converts a wide string back to Rust. `None` stands for a field the device
/// did not report and decodes to an empty string.
pub fn decode(wide: Option<&WideString>) -> String {
    wide.map(WideString::to_string_lossy).unwrap_or_default()
}

#[cfg(target_os = "windows")]
fn encode_units(text: &str) -> Vec<WChar> {
    text.encode_utf16().collect()
}

#[cfg(not(target_os = "windows"))]
fn encode_units(text: &str) -> Vec<WChar> {
    text.chars().map(|c| c as u32 as WChar).collect()
}

#[cfg(target_os = "windows")]
fn decode_units(units: &[WChar]) -> String {
    String::from_utf16_lossy(units)
}

#[cfg(not(target_os = "windows"))]
fn decode_units(units: &[WChar]) -> String {
    units
        .iter()
        .map(|&u| char::from_u32(u as u32).unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}
