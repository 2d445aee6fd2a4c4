//! Deterministic cache parameters (cpuid leaf 4).
//!
//! Each sub-leaf of leaf 4 describes one cache of the calling core. Sub-leaves
//! are queried in order until the processor reports a null cache type, which
//! marks the end of the list.

use crate::affinity::pin_to_current_core;
use crate::Error;

use bit_field::BitField;
use cpuid::{CpuidSource, NativeCpuid, RawQueryResult};
use itertools::Itertools;
use log::{debug, trace, warn};

/// Register layout of leaf 4, per the Intel SDM volume 2A, cpuid instruction.
pub mod leaf_0x4 {
    pub const LEAF_NUM: u32 = 0x4;

    pub mod eax {
        use core::ops::Range;

        /// Cache type tag, 0 means no more caches.
        pub const CACHE_TYPE_BITRANGE: Range<usize> = 0..2;
        /// Cache level, starting at 1.
        pub const CACHE_LEVEL_BITRANGE: Range<usize> = 5..8;
        pub const SELF_INIT_BITINDEX: usize = 8;
        pub const FULLY_ASSOC_BITINDEX: usize = 9;
        /// Maximum number of addressable IDs for logical processors sharing this cache, minus one.
        pub const MAX_SHARING_IDS_BITRANGE: Range<usize> = 14..26;
        /// Maximum number of addressable IDs for processor cores in the package, minus one.
        pub const MAX_CORE_IDS_BITRANGE: Range<usize> = 26..32;
    }

    pub mod ebx {
        use core::ops::Range;

        // All three fields hold the value minus one.
        pub const LINE_SIZE_BITRANGE: Range<usize> = 0..12;
        pub const PARTITIONS_BITRANGE: Range<usize> = 12..22;
        pub const WAYS_BITRANGE: Range<usize> = 22..32;
    }

    // ecx holds the number of sets minus one, on all 32 bits.

    pub mod edx {
        /// Set when WBINVD/INVD is not guaranteed to act on lower level caches
        /// of non-originating threads sharing this cache.
        pub const WBINVD_SCOPE_BITINDEX: usize = 0;
        pub const INCLUSIVE_BITINDEX: usize = 1;
        pub const COMPLEX_INDEXING_BITINDEX: usize = 2;
    }
}

use leaf_0x4::{eax, ebx, edx};

pub const CACHE_INFO_CPUID_LEAF: u32 = leaf_0x4::LEAF_NUM;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CacheType {
    Null = 0,
    Data = 1,
    Instruction = 2,
    Unified = 3,
}

impl CacheType {
    /// Maps the 2 bit type field. Bits above the field are ignored.
    pub fn from_tag(tag: u32) -> CacheType {
        match tag & 0x3 {
            0 => CacheType::Null,
            1 => CacheType::Data,
            2 => CacheType::Instruction,
            _ => CacheType::Unified,
        }
    }
}

impl core::fmt::Display for CacheType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            CacheType::Null => "Null",
            CacheType::Data => "Data",
            CacheType::Instruction => "Instruction",
            CacheType::Unified => "Unified",
        };
        f.write_str(name)
    }
}

/// One decoded cache, never of type [`CacheType::Null`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheDescriptor {
    pub cache_type: CacheType,
    /// The sub-leaf this descriptor was read from.
    pub level: u32,
    /// The cache level as reported by the hardware (1 for L1, ...).
    pub hierarchy_level: u8,
    pub self_initializing: bool,
    pub fully_associative: bool,
    pub max_sharing_ids: u16,
    pub max_core_ids: u8,
    pub ways: u16,
    pub partitions: u16,
    pub line_size: u16,
    pub sets: u64,
    /// `ways * partitions * line_size * sets`, the field maxima multiply to 2^64.
    pub size_bytes: u128,
    /// Raw scope bit: set means WBINVD/INVD is *not* guaranteed to reach
    /// lower level caches of sibling threads.
    pub write_invalidate_scope: bool,
    pub inclusive_of_lower_levels: bool,
    /// Clear means direct mapped.
    pub complex_indexing: bool,
}

impl CacheDescriptor {
    /// Decodes one leaf 4 result, `None` marks the end of the cache list.
    pub fn from_cpuid_result(cr: &RawQueryResult, level: u32) -> Option<CacheDescriptor> {
        let cache_type = CacheType::from_tag(cr.eax.get_bits(eax::CACHE_TYPE_BITRANGE));
        if cache_type == CacheType::Null {
            trace!("cpuid leaf 4 sub-leaf {}: no more caches", level);
            return None;
        }

        let ways = cr.ebx.get_bits(ebx::WAYS_BITRANGE) as u16 + 1;
        let partitions = cr.ebx.get_bits(ebx::PARTITIONS_BITRANGE) as u16 + 1;
        let line_size = cr.ebx.get_bits(ebx::LINE_SIZE_BITRANGE) as u16 + 1;
        let sets = u64::from(cr.ecx) + 1;
        let size_bytes =
            u128::from(ways) * u128::from(partitions) * u128::from(line_size) * u128::from(sets);

        let descriptor = CacheDescriptor {
            cache_type,
            level,
            hierarchy_level: cr.eax.get_bits(eax::CACHE_LEVEL_BITRANGE) as u8,
            self_initializing: cr.eax.get_bit(eax::SELF_INIT_BITINDEX),
            fully_associative: cr.eax.get_bit(eax::FULLY_ASSOC_BITINDEX),
            max_sharing_ids: cr.eax.get_bits(eax::MAX_SHARING_IDS_BITRANGE) as u16 + 1,
            max_core_ids: cr.eax.get_bits(eax::MAX_CORE_IDS_BITRANGE) as u8 + 1,
            ways,
            partitions,
            line_size,
            sets,
            size_bytes,
            write_invalidate_scope: cr.edx.get_bit(edx::WBINVD_SCOPE_BITINDEX),
            inclusive_of_lower_levels: cr.edx.get_bit(edx::INCLUSIVE_BITINDEX),
            complex_indexing: cr.edx.get_bit(edx::COMPLEX_INDEXING_BITINDEX),
        };
        debug!(
            "cpuid leaf 4 sub-leaf {}: {:#010x} {:#010x} {:#010x} {:#010x} -> L{} {}",
            level, cr.eax, cr.ebx, cr.ecx, cr.edx, descriptor.hierarchy_level, cache_type
        );
        Some(descriptor)
    }
}

/// Queries sub-leaf `index` of leaf 4 and decodes it.
pub fn decode<S: CpuidSource>(source: &S, index: u32) -> Option<CacheDescriptor> {
    let cr = source.query(CACHE_INFO_CPUID_LEAF, index);
    CacheDescriptor::from_cpuid_result(&cr, index)
}

/// All caches reported by `source`, up to (excluding) the first null entry.
pub fn enumerate<S: CpuidSource>(source: &S) -> Vec<CacheDescriptor> {
    (0..=u32::MAX)
        .map(|index| decode(source, index))
        .while_some()
        .collect()
}

/// Caches of the core the calling thread runs on.
///
/// The thread stays pinned to that core for the whole enumeration so that all
/// sub-leaves describe the same core on hybrid processors.
pub fn get_cache_info() -> Result<Vec<CacheDescriptor>, Error> {
    let native = NativeCpuid::new()?;
    let _pin = match pin_to_current_core() {
        Ok(pin) => Some(pin),
        Err(e) => {
            warn!("Could not pin to the current core, results may mix cores: {}", e);
            None
        }
    };
    Ok(enumerate(&native))
}
