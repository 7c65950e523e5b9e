//! # cms-core
//!
//! Core types for the color management engine.
//!
//! This crate provides the foundation shared by every other `cms-*` crate:
//!
//! - [`fixed`] - Overflow-checked integer power, alignment, 8/16-bit scaling
//!   and 16.16 fixed-point interpolation helpers
//! - [`pcs`] - Profile connection space colorimetry (Lab, XYZ, D50, encodings)
//! - [`Context`] - Explicit allocation and configuration handle
//! - [`CmsError`] - Error type for every construction operation
//!
//! ## Crate Structure
//!
//! ```text
//! cms-core (this crate)
//!    ^
//!    |
//!    +-- cms-curve (tone curves)
//!    +-- cms-lut (multi-dimensional CLUTs)
//!    +-- cms-pipeline (stages and pipelines)
//! ```
//!
//! # Example
//!
//! ```rust
//! use cms_core::fixed::{expand_8_to_16, reduce_16_to_8};
//!
//! assert_eq!(expand_8_to_16(0xFF), 0xFFFF);
//! assert_eq!(reduce_16_to_8(0xFFFF), 0xFF);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod context;
pub mod error;
pub mod fixed;
pub mod pcs;

pub use context::{Context, ContextConfig};
pub use error::{CmsError, CmsResult};

/// Largest number of input dimensions a CLUT can index by default.
pub const MAX_INPUT_DIMENSIONS: usize = 15;

/// Upper bound (exclusive) on channels flowing through a stage or pipeline.
pub const MAX_STAGE_CHANNELS: usize = 128;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::context::{Context, ContextConfig};
    pub use crate::error::{CmsError, CmsResult};
    pub use crate::pcs::{CieLab, CieXyz, D50};
}
