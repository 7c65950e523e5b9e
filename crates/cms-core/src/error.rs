//! Error types for construction operations.
//!
//! Every factory in the engine (tone curves, CLUTs, stages, pipelines)
//! reports failure through [`CmsError`]. Evaluation never fails: once an
//! object is built, sampling it is infallible.
//!
//! # Categories
//!
//! - **Allocation**: [`AllocationFailed`](CmsError::AllocationFailed)
//! - **Shape**: [`InvalidChannels`](CmsError::InvalidChannels),
//!   [`ChannelMismatch`](CmsError::ChannelMismatch), [`InvalidGrid`](CmsError::InvalidGrid)
//! - **Curves**: [`UnknownParametricType`](CmsError::UnknownParametricType),
//!   [`ParameterArity`](CmsError::ParameterArity), [`InvalidCurve`](CmsError::InvalidCurve)
//! - **Sampling**: [`SamplerFailed`](CmsError::SamplerFailed),
//!   [`TableMismatch`](CmsError::TableMismatch)
//! - **Arithmetic**: [`Overflow`](CmsError::Overflow)
//!
//! # Example
//!
//! ```rust
//! use cms_core::CmsError;
//!
//! let err = CmsError::ChannelMismatch { expected: 3, actual: 4 };
//! assert!(err.to_string().contains("expected 3"));
//! ```

use thiserror::Error;

/// Result type alias using [`CmsError`].
pub type CmsResult<T> = std::result::Result<T, CmsError>;

/// Errors raised while building curves, tables, stages and pipelines.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CmsError {
    /// The context refused an allocation, or the allocator itself failed.
    #[error("allocation of {requested} bytes failed (limit: {limit:?})")]
    AllocationFailed {
        /// Bytes requested (after alignment).
        requested: usize,
        /// Configured byte budget, if any.
        limit: Option<usize>,
    },

    /// A channel count is zero, too large, or otherwise unusable.
    #[error("invalid channel configuration: {0}")]
    InvalidChannels(String),

    /// Adjacent channel counts do not line up.
    #[error("channel mismatch: expected {expected}, got {actual}")]
    ChannelMismatch {
        /// Channel count required by the neighbour.
        expected: usize,
        /// Channel count supplied.
        actual: usize,
    },

    /// Parametric curve type is not part of the catalogue.
    #[error("unknown parametric curve type {0}")]
    UnknownParametricType(i32),

    /// Parametric curve got the wrong number of parameters.
    #[error("parametric curve type {curve_type} takes {expected} parameters, got {actual}")]
    ParameterArity {
        /// Curve type identifier.
        curve_type: i32,
        /// Parameters required by the formula.
        expected: usize,
        /// Parameters supplied.
        actual: usize,
    },

    /// Tabulated curve data is unusable (too few or too many entries).
    #[error("invalid tone curve: {0}")]
    InvalidCurve(String),

    /// CLUT grid description is out of bounds.
    #[error("invalid CLUT grid: {0}")]
    InvalidGrid(String),

    /// Data representation does not match what the operation needs.
    #[error("table mismatch: {0}")]
    TableMismatch(String),

    /// A sampler callback reported failure; the fill was discarded.
    #[error("sampler failed at grid node {node}")]
    SamplerFailed {
        /// Linear index of the node being sampled.
        node: usize,
    },

    /// An integer computation would have overflowed.
    #[error("arithmetic overflow: {0}")]
    Overflow(String),
}
