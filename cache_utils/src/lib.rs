#![deny(unsafe_op_in_unsafe_fn)]

use core::fmt;

pub mod affinity;
pub mod cache_info;
pub mod report;

#[derive(Debug)]
pub enum Error {
    Cpuid(cpuid::Error),
    #[cfg(target_os = "linux")]
    Affinity(nix::Error),
}

impl From<cpuid::Error> for Error {
    fn from(e: cpuid::Error) -> Self {
        Error::Cpuid(e)
    }
}

#[cfg(target_os = "linux")]
impl From<nix::Error> for Error {
    fn from(e: nix::Error) -> Self {
        Error::Affinity(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Cpuid(e) => write!(f, "{}", e),
            #[cfg(target_os = "linux")]
            Error::Affinity(e) => write!(f, "unable to change cpu affinity: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Cpuid(e) => Some(e),
            #[cfg(target_os = "linux")]
            Error::Affinity(e) => Some(e),
        }
    }
}
