/*!
 * Heap Configuration
 */

use super::types::{MemoryError, MemoryResult};
use crate::core::limits::{
    ALIGNMENT, DEFAULT_HEAP_SIZE, DEFAULT_POOL_CLASSES, GC_LIMIT_DIVISOR, MAX_GC_LIMIT,
    MAX_HEAP_SIZE, MAX_POOL_CLASSES,
};
use crate::core::types::Size;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Settings for one heap instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeapConfig {
    /// Arena size in bytes. Ignored in system mode.
    pub capacity: Size,
    /// Reclamation budget step. `0` derives it from the capacity.
    pub gc_limit: Size,
    /// Number of pool size classes; class `i` holds `(i + 1) * ALIGNMENT` byte chunks.
    pub pool_classes: usize,
    /// Call the reclaimer at `HIGH` before every allocation.
    pub reclaim_before_each_alloc: bool,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_HEAP_SIZE,
            gc_limit: 0,
            pool_classes: DEFAULT_POOL_CLASSES,
            reclaim_before_each_alloc: false,
        }
    }
}

impl HeapConfig {
    /// Default configuration with a custom arena size (useful for testing)
    pub fn with_capacity(capacity: Size) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn with_gc_limit(mut self, gc_limit: Size) -> Self {
        self.gc_limit = gc_limit;
        self
    }

    pub fn with_pool_classes(mut self, pool_classes: usize) -> Self {
        self.pool_classes = pool_classes;
        self
    }

    pub fn with_reclaim_before_each_alloc(mut self, enabled: bool) -> Self {
        self.reclaim_before_each_alloc = enabled;
        self
    }

    /// Defaults overridden by the environment
    ///
    /// Environment variables:
    /// - HEAP_CAPACITY: arena size in bytes
    /// - HEAP_GC_LIMIT: reclamation budget step in bytes
    /// - HEAP_POOL_CLASSES: number of pool size classes
    /// - HEAP_GC_BEFORE_EACH_ALLOC: "1" or "true" to enable stress mode
    pub fn from_env() -> MemoryResult<Self> {
        let mut config = Self::default();

        if let Some(capacity) = env_var("HEAP_CAPACITY")? {
            config.capacity = capacity;
        }
        if let Some(gc_limit) = env_var("HEAP_GC_LIMIT")? {
            config.gc_limit = gc_limit;
        }
        if let Some(pool_classes) = env_var("HEAP_POOL_CLASSES")? {
            config.pool_classes = pool_classes;
        }
        config.reclaim_before_each_alloc = std::env::var("HEAP_GC_BEFORE_EACH_ALLOC")
            .map(|v| v == "1" || v == "true")
            .unwrap_or(false);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> MemoryResult<()> {
        if self.capacity == 0 || self.capacity % ALIGNMENT != 0 {
            return Err(MemoryError::InvalidConfig(format!(
                "capacity {} must be a non-zero multiple of {}",
                self.capacity, ALIGNMENT
            )));
        }
        if self.capacity > MAX_HEAP_SIZE {
            return Err(MemoryError::InvalidConfig(format!(
                "capacity {} exceeds the compressible maximum {}",
                self.capacity, MAX_HEAP_SIZE
            )));
        }
        if self.pool_classes == 0 || self.pool_classes > MAX_POOL_CLASSES {
            return Err(MemoryError::InvalidConfig(format!(
                "pool_classes {} must be within 1..={}",
                self.pool_classes, MAX_POOL_CLASSES
            )));
        }
        Ok(())
    }

    /// The budget step actually used by the heap
    pub fn effective_gc_limit(&self) -> Size {
        if self.gc_limit != 0 {
            self.gc_limit
        } else {
            (self.capacity / GC_LIMIT_DIVISOR).clamp(ALIGNMENT, MAX_GC_LIMIT)
        }
    }

    /// Largest request served by the pool caches
    pub fn pool_max_size(&self) -> Size {
        self.pool_classes * ALIGNMENT
    }
}

fn env_var<T: FromStr>(name: &str) -> MemoryResult<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| MemoryError::InvalidConfig(format!("{name}={raw} is not a number"))),
        Err(_) => Ok(None),
    }
}
