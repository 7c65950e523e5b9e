//! # cms-curve
//!
//! One-dimensional tone curves for color management pipelines.
//!
//! A [`ToneCurve`] maps [0, 1] to [0, 1] and is stored either as a table of
//! 16-bit samples or as a parametric formula drawn from a closed catalogue.
//!
//! # Parametric Catalogue
//!
//! | Type | Formula | Params |
//! |------|---------|--------|
//! | 1 | `Y = X^g` | g |
//! | 2 | `Y = (aX + b)^g` for `X >= -b/a`, else 0 (CIE 122-1966) | g a b |
//! | 3 | `Y = (aX + b)^g + c` for `X >= -b/a`, else c (IEC 61966-3) | g a b c |
//! | 4 | `Y = (aX + b)^g` for `X >= d`, else `cX` (IEC 61966-2.1, sRGB) | g a b c d |
//! | 5 | `Y = (aX + b)^g + e` for `X >= d`, else `cX + f` | g a b c d e f |
//! | 6 | `Y = (aX + b)^g + c` | g a b c |
//! | 7 | `Y = a log10(b X^g + c) + d` | g a b c d |
//! | 8 | `Y = a b^(cX + d) + e` | a b c d e |
//! | 108 | `Y = (1 - (1 - X)^(1/g))^(1/g)` | g |
//! | 109 | sigmoid of steepness k | k |
//!
//! Negative identifiers select the analytical inverse of the same formula.
//!
//! # Usage
//!
//! ```rust
//! use cms_core::Context;
//! use cms_curve::ToneCurve;
//!
//! let ctx = Context::default();
//! let curve = ToneCurve::gamma(&ctx, 2.2).unwrap();
//! assert_eq!(curve.eval_f32(0.0), 0.0);
//! assert!((curve.eval_f32(1.0) - 1.0).abs() < 1e-6);
//! ```
//!
//! # Dependencies
//!
//! - [`cms-core`] - Context, fixed-point helpers, errors
//!
//! # Used By
//!
//! - `cms-pipeline` - Curve-set stages

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod parametric;
mod tone_curve;

pub use parametric::{eval_parametric, parameter_count};
pub use tone_curve::{CurveData, ToneCurve, LAB_V2_TO_V4_ENTRIES};
