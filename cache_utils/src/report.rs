//! Human readable rendering of decoded caches.

use crate::cache_info::CacheDescriptor;
use core::fmt;

const KIB: u128 = 1 << 10;
const MIB: u128 = 1 << 20;

/// Size in whole MiB above 1 MiB, in whole KiB above 1 KiB, `None` otherwise.
pub fn scaled_size(size: u128) -> Option<(u128, &'static str)> {
    if size > MIB {
        Some((size / MIB, "MiB"))
    } else if size > KIB {
        Some((size / KIB, "KiB"))
    } else {
        None
    }
}

pub fn write_invalidate_sentence(wbinvd_no_guarantee: bool) -> &'static str {
    if wbinvd_no_guarantee {
        "WBINVD/INVD is not guaranteed to affect lower level caches of non-originating threads sharing this cache."
    } else {
        "WBINVD/INVD from threads sharing this cache acts upon lower level caches, affecting non-originating threads sharing this cache."
    }
}

pub fn inclusive_sentence(inclusive: bool) -> &'static str {
    if inclusive {
        "This cache is inclusive of lower cache levels."
    } else {
        "This cache is not inclusive of lower cache levels."
    }
}

pub fn mapping_sentence(complex_indexing: bool) -> &'static str {
    if complex_indexing {
        "This is not a direct mapped cache."
    } else {
        "This is a direct mapped cache."
    }
}

impl fmt::Display for CacheDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cache {} - {}", self.level, self.cache_type)?;
        writeln!(f, "\tLevel: {}", self.hierarchy_level)?;
        writeln!(f, "\tWays: {}", self.ways)?;
        writeln!(f, "\tPartitions: {}", self.partitions)?;
        writeln!(f, "\tLine Size: {}", self.line_size)?;
        writeln!(f, "\tSets: {}", self.sets)?;
        write!(f, "\tSize: {}", self.size_bytes)?;
        if let Some((scaled, unit)) = scaled_size(self.size_bytes) {
            write!(f, " ({} {})", scaled, unit)?;
        }
        writeln!(f)?;
        writeln!(f, "{}", write_invalidate_sentence(self.write_invalidate_scope))?;
        writeln!(f, "{}", inclusive_sentence(self.inclusive_of_lower_levels))?;
        writeln!(f, "{}", mapping_sentence(self.complex_indexing))
    }
}

#[cfg(test)]
mod tests {
    use super::scaled_size;
    use crate::cache_info::CacheDescriptor;
    use cpuid::RawQueryResult;

    #[test]
    fn size_units() {
        assert_eq!(scaled_size(64), None);
        assert_eq!(scaled_size(1024), None);
        assert_eq!(scaled_size(1025), Some((1, "KiB")));
        assert_eq!(scaled_size(32 << 10), Some((32, "KiB")));
        assert_eq!(scaled_size(1 << 20), Some((1024, "KiB")));
        assert_eq!(scaled_size((1 << 20) + 1), Some((1, "MiB")));
        assert_eq!(scaled_size(12 << 20), Some((12, "MiB")));
        assert_eq!(scaled_size(1 << 64), Some((1 << 44, "MiB")));
    }

    #[test]
    fn render_l3() {
        let cr = RawQueryResult::new(0x1C03C163, 0x03C0003F, 0x00001FFF, 0x00000006);
        let l3 = CacheDescriptor::from_cpuid_result(&cr, 3).unwrap();
        assert_eq!(
            l3.to_string(),
            "Cache 3 - Unified\n\
             \tLevel: 3\n\
             \tWays: 16\n\
             \tPartitions: 1\n\
             \tLine Size: 64\n\
             \tSets: 8192\n\
             \tSize: 8388608 (8 MiB)\n\
             WBINVD/INVD from threads sharing this cache acts upon lower level caches, affecting non-originating threads sharing this cache.\n\
             This cache is inclusive of lower cache levels.\n\
             This is not a direct mapped cache.\n"
        );
    }

    #[test]
    fn render_small_cache() {
        let cr = RawQueryResult::new(0x21, 0x0000001F, 0x0000000F, 0x00000001);
        let tiny = CacheDescriptor::from_cpuid_result(&cr, 0).unwrap();
        assert_eq!(
            tiny.to_string(),
            "Cache 0 - Data\n\
             \tLevel: 1\n\
             \tWays: 1\n\
             \tPartitions: 1\n\
             \tLine Size: 32\n\
             \tSets: 16\n\
             \tSize: 512\n\
             WBINVD/INVD is not guaranteed to affect lower level caches of non-originating threads sharing this cache.\n\
             This cache is not inclusive of lower cache levels.\n\
             This is a direct mapped cache.\n"
        );
    }
}
