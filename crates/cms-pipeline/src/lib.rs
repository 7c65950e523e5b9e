//! # cms-pipeline
//!
//! Stages and pipelines: the evaluation core of the color management engine.
//!
//! A [`Stage`] is one transform step with fixed input and output channel
//! counts, drawn from a closed set of variants:
//!
//! | Variant | Computes |
//! |---------|----------|
//! | Curve set | one [`ToneCurve`](cms_curve::ToneCurve) per channel |
//! | Matrix | `Out = M * In + Offset` |
//! | CLUT | multilinear lookup in a [`Clut`](cms_lut::Clut) |
//! | Lab to XYZ / XYZ to Lab | closed-form D50 conversion on normalized PCS values |
//! | Clip negatives | `max(v, 0)` per channel |
//!
//! A [`Pipeline`] chains stages whose channel counts line up and evaluates
//! samples through them in float, 16-bit or 8-bit.
//!
//! The [`factory`] module builds the named stages used when assembling
//! transforms: identity curves and CLUTs, PCS conversions, v2/v4 Lab
//! re-encoding and float PCS normalization.
//!
//! # Usage
//!
//! ```rust
//! use cms_core::Context;
//! use cms_pipeline::{factory, Pipeline};
//!
//! let ctx = Context::default();
//! let mut pipeline = Pipeline::new(&ctx, 3, 3).unwrap();
//! pipeline.append_stage(factory::lab_to_xyz(&ctx).unwrap()).unwrap();
//! pipeline.append_stage(factory::xyz_to_lab(&ctx).unwrap()).unwrap();
//!
//! let mut out = [0.0f32; 3];
//! pipeline.eval_f32(&[0.5, 0.5, 0.5], &mut out);
//! assert!((out[0] - 0.5).abs() < 1e-4);
//! ```
//!
//! # Thread Safety
//!
//! Built stages and pipelines are immutable during evaluation and are
//! `Send + Sync`; one pipeline may be evaluated from many threads at once.
//!
//! # Dependencies
//!
//! - [`cms-core`] - Context, numeric helpers, PCS math
//! - [`cms-curve`] - Tone curves
//! - [`cms-lut`] - CLUT tables and sampling

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod factory;
mod pipeline;
mod stage;

pub use cms_lut::SampleMode;
pub use pipeline::{Pipeline, StageLoc};
pub use stage::{Stage, StageData, StageKind, StageSignature};
