/*!
 * Heap Statistics
 * Allocation accounting for diagnostics builds (feature `mem-stats`)
 */

use super::types::MemoryCategory;
use crate::core::limits::align_up;
use crate::core::types::Size;
use serde::{Deserialize, Serialize};

/// Current and peak byte counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HeapStats {
    /// Arena capacity, `0` in system mode
    pub size: Size,
    /// Bytes handed out to callers, rounded to the alignment unit
    pub allocated_bytes: Size,
    pub peak_allocated_bytes: Size,
    /// Bytes lost to alignment rounding in live blocks
    pub waste_bytes: Size,
    pub peak_waste_bytes: Size,
    pub byte_code_bytes: Size,
    pub peak_byte_code_bytes: Size,
    pub string_bytes: Size,
    pub peak_string_bytes: Size,
    pub object_bytes: Size,
    pub peak_object_bytes: Size,
    pub property_bytes: Size,
    pub peak_property_bytes: Size,
}

impl HeapStats {
    /// Share of the arena currently handed out, `0.0` in system mode
    pub fn usage_percentage(&self) -> f64 {
        if self.size == 0 {
            0.0
        } else {
            (self.allocated_bytes as f64 / self.size as f64) * 100.0
        }
    }
}

impl std::fmt::Display for HeapStats {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "Heap stats:")?;
        if self.size != 0 {
            writeln!(f, "  Heap size = {} bytes", self.size)?;
        }
        writeln!(f, "  Allocated = {} bytes", self.allocated_bytes)?;
        writeln!(f, "  Peak allocated = {} bytes", self.peak_allocated_bytes)?;
        writeln!(f, "  Waste = {} bytes", self.waste_bytes)?;
        writeln!(f, "  Peak waste = {} bytes", self.peak_waste_bytes)?;
        writeln!(f, "  Allocated byte code data = {} bytes", self.byte_code_bytes)?;
        writeln!(f, "  Peak allocated byte code data = {} bytes", self.peak_byte_code_bytes)?;
        writeln!(f, "  Allocated string data = {} bytes", self.string_bytes)?;
        writeln!(f, "  Peak allocated string data = {} bytes", self.peak_string_bytes)?;
        writeln!(f, "  Allocated object data = {} bytes", self.object_bytes)?;
        writeln!(f, "  Peak allocated object data = {} bytes", self.peak_object_bytes)?;
        writeln!(f, "  Allocated property data = {} bytes", self.property_bytes)?;
        write!(f, "  Peak allocated property data = {} bytes", self.peak_property_bytes)
    }
}

/// Updates a [`HeapStats`] as blocks come and go
#[derive(Debug, Default)]
pub(crate) struct StatsCollector {
    stats: HeapStats,
}

impl StatsCollector {
    pub fn new(size: Size) -> Self {
        Self {
            stats: HeapStats {
                size,
                ..HeapStats::default()
            },
        }
    }

    pub fn snapshot(&self) -> HeapStats {
        self.stats.clone()
    }

    /// Account a block of `size` requested bytes
    pub fn record_alloc(&mut self, size: Size) {
        let aligned_size = align_up(size);
        let stats = &mut self.stats;

        stats.allocated_bytes += aligned_size;
        stats.waste_bytes += aligned_size - size;
        stats.peak_allocated_bytes = stats.peak_allocated_bytes.max(stats.allocated_bytes);
        stats.peak_waste_bytes = stats.peak_waste_bytes.max(stats.waste_bytes);
    }

    pub fn record_free(&mut self, size: Size) {
        let aligned_size = align_up(size);
        let stats = &mut self.stats;

        debug_assert!(stats.allocated_bytes >= aligned_size);
        stats.allocated_bytes -= aligned_size;
        stats.waste_bytes -= aligned_size - size;
    }

    pub fn record_category_alloc(&mut self, category: MemoryCategory, size: Size) {
        let (current, peak) = self.category_mut(category);
        *current += size;
        *peak = (*peak).max(*current);
    }

    pub fn record_category_free(&mut self, category: MemoryCategory, size: Size) {
        let (current, _) = self.category_mut(category);
        *current = current.saturating_sub(size);
    }

    fn category_mut(&mut self, category: MemoryCategory) -> (&mut Size, &mut Size) {
        let stats = &mut self.stats;
        match category {
            MemoryCategory::ByteCode => (&mut stats.byte_code_bytes, &mut stats.peak_byte_code_bytes),
            MemoryCategory::String => (&mut stats.string_bytes, &mut stats.peak_string_bytes),
            MemoryCategory::Object => (&mut stats.object_bytes, &mut stats.peak_object_bytes),
            MemoryCategory::Property => (&mut stats.property_bytes, &mut stats.peak_property_bytes),
        }
    }
}
