//! # cms-lut
//!
//! Multi-dimensional color lookup tables (CLUTs).
//!
//! A [`Clut`] is a regular grid with one dimension per input channel. Each
//! dimension has its own node count (2 or more), and every node stores one
//! sample of `output_channels` values, either as 16-bit codes or as floats.
//! Lookups interpolate multilinearly between the `2^n` surrounding nodes.
//!
//! # Layout
//!
//! Nodes are stored row-major: the last input dimension varies fastest, and
//! each node's outputs are contiguous.
//!
//! # Usage
//!
//! ```rust
//! use cms_core::Context;
//! use cms_lut::{Clut, SampleMode};
//!
//! let ctx = Context::default();
//! let mut clut = Clut::new_u16(&ctx, &[2, 2, 2], 3, None).unwrap();
//!
//! // Fill with the identity
//! clut.sample_u16(SampleMode::Write, |input, output| {
//!     output.copy_from_slice(input);
//!     true
//! })
//! .unwrap();
//!
//! let mut out = [0.0f32; 3];
//! clut.eval_f32(&[0.25, 0.5, 0.75], &mut out);
//! assert!((out[1] - 0.5).abs() < 1e-6);
//! ```
//!
//! # Dependencies
//!
//! - [`cms-core`] - Context, grid-size arithmetic, errors
//!
//! # Used By
//!
//! - `cms-pipeline` - CLUT stages

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod clut;
mod interp;
mod sample;

pub use clut::{Clut, ClutTable};
pub use sample::{slice_space_f32, slice_space_u16, SampleMode};
