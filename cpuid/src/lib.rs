#![cfg_attr(not(feature = "use_std"), no_std)]

//! Narrow wrapper around the `cpuid` instruction.
//!
//! Everything that decodes processor information goes through [`CpuidSource`],
//! so decoders can be fed synthetic register values in tests and only the
//! binaries ever touch the real instruction.

#[cfg(target_arch = "x86")]
use core::arch::x86 as arch_x86;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64 as arch_x86;
use core::fmt;

/// The four registers written by one execution of `cpuid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawQueryResult {
    pub eax: u32,
    pub ebx: u32,
    pub ecx: u32,
    pub edx: u32,
}

impl RawQueryResult {
    pub const fn new(eax: u32, ebx: u32, ecx: u32, edx: u32) -> RawQueryResult {
        RawQueryResult { eax, ebx, ecx, edx }
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl From<arch_x86::CpuidResult> for RawQueryResult {
    fn from(cr: arch_x86::CpuidResult) -> Self {
        RawQueryResult::new(cr.eax, cr.ebx, cr.ecx, cr.edx)
    }
}

/// Anything that can answer a `cpuid` query for a (leaf, sub-leaf) pair.
///
/// Implementations must be pure: the same pair always yields the same words.
pub trait CpuidSource {
    fn query(&self, leaf: u32, subleaf: u32) -> RawQueryResult;
}

// Lets tests hand a closure over a table of registers to any decoder.
impl<F> CpuidSource for F
where
    F: Fn(u32, u32) -> RawQueryResult,
{
    fn query(&self, leaf: u32, subleaf: u32) -> RawQueryResult {
        self(leaf, subleaf)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The crate was built for an instruction set without `cpuid`.
    UnsupportedPlatform,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnsupportedPlatform => {
                write!(f, "the cpuid instruction is not available on this architecture")
            }
        }
    }
}

#[cfg(feature = "use_std")]
impl std::error::Error for Error {}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
type Token = ();
#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
type Token = core::convert::Infallible;

/// The `cpuid` instruction of the processor the calling thread runs on.
///
/// Results describe whichever core executes the query; callers that need a
/// consistent view across several queries should pin themselves first.
#[derive(Debug, Clone, Copy)]
pub struct NativeCpuid {
    token: Token,
}

impl NativeCpuid {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    pub fn new() -> Result<NativeCpuid, Error> {
        Ok(NativeCpuid { token: () })
    }

    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
    pub fn new() -> Result<NativeCpuid, Error> {
        Err(Error::UnsupportedPlatform)
    }
}

impl CpuidSource for NativeCpuid {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    fn query(&self, leaf: u32, subleaf: u32) -> RawQueryResult {
        let () = self.token;
        // Leaves above the processor's maximum return data for the highest
        // basic leaf; that is the caller's precondition to respect.
        #[allow(unused_unsafe)]
        let cr = unsafe { arch_x86::__cpuid_count(leaf, subleaf) };
        cr.into()
    }

    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
    fn query(&self, _leaf: u32, _subleaf: u32) -> RawQueryResult {
        match self.token {}
    }
}

#[cfg(test)]
mod tests {
    use crate::{CpuidSource, Error, RawQueryResult};

    #[test]
    fn closure_source() {
        let source = |leaf: u32, subleaf: u32| RawQueryResult::new(leaf, subleaf, 0, 0);
        assert_eq!(source.query(4, 2), RawQueryResult::new(4, 2, 0, 0));
        assert_eq!(source.query(0, 0), RawQueryResult::default());
    }

    #[test]
    fn error_display() {
        assert_eq!(
            Error::UnsupportedPlatform.to_string(),
            "the cpuid instruction is not available on this architecture"
        );
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn native_vendor_leaf() {
        use crate::NativeCpuid;

        let native = NativeCpuid::new().unwrap();
        let leaf0 = native.query(0, 0);
        // Every x86_64 processor supports at least leaf 1.
        assert!(leaf0.eax >= 1);
        // The vendor string is never all zeroes.
        assert_ne!((leaf0.ebx, leaf0.ecx, leaf0.edx), (0, 0, 0));
    }
}
