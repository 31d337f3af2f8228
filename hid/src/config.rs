use std::env;
use std::path::PathBuf;

/// Environment variable naming the hidapi library to load.
pub const LIBRARY_ENV: &str = "HIDAPI_LIBRARY";

/// How the native transport is located.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Explicit library path or name. When unset the platform's usual names
    /// are tried in order.
    pub library: Option<PathBuf>,
}

impl Config {
    /// Tries the platform's default library names.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads [`LIBRARY_ENV`]; an empty value is treated as unset.
    pub fn from_env() -> Self {
        let library = env::var_os(LIBRARY_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        Self { library }
    }

    /// Loads `library` instead of the defaults.
    pub fn with_library(mut self, library: impl Into<PathBuf>) -> Self {
        self.library = Some(library.into());
        self
    }

    /// Candidates to try, most specific first.
    pub(crate) fn candidates(&self, defaults: &[&str]) -> Vec<PathBuf> {
        match &self.library {
            Some(library) => vec![library.clone()],
            None => defaults.iter().map(PathBuf::from).collect(),
        }
    }
}
