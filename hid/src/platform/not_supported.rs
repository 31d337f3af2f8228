//! Platforms without a known hidapi build. A library can still be named
//! explicitly through `Config::library`.

pub(super) const LIBRARY_NAMES: &[&str] = &[];
