//! Allocation and configuration handle.
//!
//! A [`Context`] is threaded through every factory in the engine. It carries
//! the limits that bound curve, CLUT and pipeline construction
//! ([`ContextConfig`]) and accounts for the memory those objects allocate.
//!
//! Accounting is arena-style: bytes charged by [`Context::alloc_vec`] are
//! only returned when the context itself is dropped. With no
//! [`allocation_limit`](ContextConfig::allocation_limit) the counter is
//! informational.
//!
//! Evaluation never touches the context.
//!
//! # Example
//!
//! ```rust
//! use cms_core::{Context, ContextConfig};
//!
//! let ctx = Context::new(ContextConfig::default().with_allocation_limit(1024));
//! let table: Vec<u16> = ctx.alloc_vec(256, 0).unwrap();
//! assert_eq!(table.len(), 256);
//! assert!(ctx.alloc_vec::<u16>(1024, 0).is_err());
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::fixed::{align_ptr, align_word};
use crate::{CmsError, CmsResult, MAX_INPUT_DIMENSIONS, MAX_STAGE_CHANNELS};

/// Limits applied while building curves, CLUTs, stages and pipelines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Largest number of CLUT input dimensions.
    pub max_input_dimensions: usize,
    /// Exclusive upper bound on channels per stage or pipeline.
    pub max_stage_channels: usize,
    /// Largest node count along a single CLUT dimension.
    pub max_grid_points: u32,
    /// Largest tabulated tone curve.
    pub max_curve_entries: usize,
    /// Optional budget, in bytes, for everything allocated through the context.
    pub allocation_limit: Option<usize>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_input_dimensions: MAX_INPUT_DIMENSIONS,
            max_stage_channels: MAX_STAGE_CHANNELS,
            max_grid_points: 255,
            max_curve_entries: 65530,
            allocation_limit: None,
        }
    }
}

impl ContextConfig {
    /// Sets the CLUT input dimension limit.
    ///
    /// Values above [`MAX_INPUT_DIMENSIONS`] are capped.
    pub fn with_max_input_dimensions(mut self, dims: usize) -> Self {
        self.max_input_dimensions = dims.min(MAX_INPUT_DIMENSIONS);
        self
    }

    /// Sets the channel limit.
    ///
    /// Values above [`MAX_STAGE_CHANNELS`] are capped.
    pub fn with_max_stage_channels(mut self, channels: usize) -> Self {
        self.max_stage_channels = channels.min(MAX_STAGE_CHANNELS);
        self
    }

    /// Sets the per-dimension grid point limit.
    pub fn with_max_grid_points(mut self, points: u32) -> Self {
        self.max_grid_points = points;
        self
    }

    /// Sets the tabulated curve size limit.
    pub fn with_max_curve_entries(mut self, entries: usize) -> Self {
        self.max_curve_entries = entries;
        self
    }

    /// Sets the allocation budget in bytes.
    pub fn with_allocation_limit(mut self, bytes: usize) -> Self {
        self.allocation_limit = Some(bytes);
        self
    }
}

/// Allocation and configuration handle borrowed by every factory.
#[derive(Debug, Default)]
pub struct Context {
    config: ContextConfig,
    allocated: AtomicUsize,
}

impl Context {
    /// Creates a context with the given limits.
    ///
    /// Limits above the compile-time bounds are capped so evaluation
    /// buffers can stay fixed-size.
    pub fn new(config: ContextConfig) -> Self {
        let config = ContextConfig {
            max_input_dimensions: config.max_input_dimensions.min(MAX_INPUT_DIMENSIONS),
            max_stage_channels: config.max_stage_channels.min(MAX_STAGE_CHANNELS),
            ..config
        };
        Self {
            config,
            allocated: AtomicUsize::new(0),
        }
    }

    /// Returns the active limits.
    #[inline]
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Bytes charged so far.
    #[inline]
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    /// Reserves `bytes` against the budget, pointer-aligned.
    ///
    /// Returns the aligned size charged.
    pub fn charge(&self, bytes: usize) -> CmsResult<usize> {
        let requested = align_ptr(bytes);
        let limit = self.config.allocation_limit;

        let result = self.allocated.fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
            let next = used.checked_add(requested)?;
            match limit {
                Some(max) if next > max => None,
                _ => Some(next),
            }
        });

        match result {
            Ok(_) => Ok(requested),
            Err(used) => {
                warn!(requested, used, ?limit, "context refused allocation");
                Err(CmsError::AllocationFailed { requested, limit })
            }
        }
    }

    /// Allocates a vector of `len` copies of `fill`, charged to this context.
    ///
    /// Fails if the byte size overflows, the budget would be exceeded, or
    /// the allocator cannot satisfy the request.
    pub fn alloc_vec<T: Clone>(&self, len: usize, fill: T) -> CmsResult<Vec<T>> {
        let bytes = len
            .checked_mul(std::mem::size_of::<T>())
            .ok_or_else(|| CmsError::Overflow(format!("{len} elements")))?;
        let charged = self.charge(align_word(bytes))?;

        let mut data = Vec::new();
        if data.try_reserve_exact(len).is_err() {
            warn!(charged, "allocator failed");
            return Err(CmsError::AllocationFailed {
                requested: charged,
                limit: self.config.allocation_limit,
            });
        }
        data.resize(len, fill);
        Ok(data)
    }

    /// Copies `values` into a new vector charged to this context.
    pub fn alloc_from_slice<T: Clone + Default>(&self, values: &[T]) -> CmsResult<Vec<T>> {
        let mut data = self.alloc_vec(values.len(), T::default())?;
        data.clone_from_slice(values);
        Ok(data)
    }
}
