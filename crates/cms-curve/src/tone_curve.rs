//! Tone curve storage and evaluation.
//!
//! Tabulated curves hold `N >= 2` unsigned 16-bit samples spanning [0, 1] at
//! uniform steps: entry 0 is the output for 0.0, entry `N - 1` the output for
//! 1.0. Parametric curves hold a catalogue type and its parameters.
//!
//! Curves are immutable once built. Tables are reference counted, so
//! stages cloned from a template share their curve data.

use std::borrow::Cow;
use std::sync::Arc;

use cms_core::fixed::{
    fixed_rest_to_int, fixed_to_int, linear_interp_u16, quantize_val, quick_saturate_word,
    to_fixed_domain,
};
use cms_core::{CmsError, CmsResult, Context};
use tracing::{trace, warn};

use crate::parametric::{eval_parametric, parameter_count};

/// Entries in the Lab v2 -> v4 rescale curve.
pub const LAB_V2_TO_V4_ENTRIES: usize = 258;

/// Number of nodes used when a parametric curve is sampled for inspection.
const INSPECTION_NODES: usize = 4096;

/// Sample points used by [`ToneCurve::estimate_gamma`].
const GAMMA_ESTIMATION_NODES: usize = 4097;

/// Payload of a [`ToneCurve`].
#[derive(Debug, Clone, PartialEq)]
pub enum CurveData {
    /// Uniformly spaced 16-bit samples.
    Tabulated(Arc<[u16]>),
    /// Catalogue formula.
    Parametric {
        /// Catalogue identifier; negative for the inverse formula.
        curve_type: i32,
        /// Formula parameters, exactly as many as the type requires.
        params: Arc<[f64]>,
    },
}

/// A one-dimensional response function on [0, 1].
///
/// # Example
///
/// ```rust
/// use cms_core::Context;
/// use cms_curve::ToneCurve;
///
/// let ctx = Context::default();
/// let ramp = ToneCurve::tabulated(&ctx, 2, &[0, 0xFFFF]).unwrap();
/// assert_eq!(ramp.eval_u16(0x1234), 0x1234);
/// assert!(ramp.is_linear());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ToneCurve {
    data: CurveData,
}

impl ToneCurve {
    /// Builds a tabulated curve of `entries` samples.
    ///
    /// An empty `samples` slice yields an all-zero table; otherwise its
    /// length must equal `entries`.
    pub fn tabulated(ctx: &Context, entries: usize, samples: &[u16]) -> CmsResult<Self> {
        Self::check_entries(ctx, entries)?;
        if !samples.is_empty() && samples.len() != entries {
            warn!(entries, supplied = samples.len(), "tone curve sample count mismatch");
            return Err(CmsError::InvalidCurve(format!(
                "expected {} samples, got {}",
                entries,
                samples.len()
            )));
        }

        let mut table = ctx.alloc_vec(entries, 0u16)?;
        if !samples.is_empty() {
            table.copy_from_slice(samples);
        }
        trace!(entries, "tabulated tone curve");
        Ok(Self { data: CurveData::Tabulated(table.into()) })
    }

    /// Builds a tabulated curve, filling entry `i` with `fill(i)`.
    pub fn from_fn<F>(ctx: &Context, entries: usize, mut fill: F) -> CmsResult<Self>
    where
        F: FnMut(usize) -> u16,
    {
        Self::check_entries(ctx, entries)?;
        let mut table = ctx.alloc_vec(entries, 0u16)?;
        for (i, entry) in table.iter_mut().enumerate() {
            *entry = fill(i);
        }
        trace!(entries, "tabulated tone curve");
        Ok(Self { data: CurveData::Tabulated(table.into()) })
    }

    /// Builds a parametric curve from the catalogue.
    ///
    /// Fails on unknown types and on a parameter count that does not match
    /// the formula.
    pub fn parametric(ctx: &Context, curve_type: i32, params: &[f64]) -> CmsResult<Self> {
        let expected = parameter_count(curve_type).ok_or_else(|| {
            warn!(curve_type, "unknown parametric curve type");
            CmsError::UnknownParametricType(curve_type)
        })?;
        if params.len() != expected {
            warn!(curve_type, expected, actual = params.len(), "parametric arity mismatch");
            return Err(CmsError::ParameterArity {
                curve_type,
                expected,
                actual: params.len(),
            });
        }

        let params = ctx.alloc_from_slice(params)?;
        trace!(curve_type, "parametric tone curve");
        Ok(Self {
            data: CurveData::Parametric {
                curve_type,
                params: params.into(),
            },
        })
    }

    /// Builds the power law `Y = X^gamma` (parametric type 1).
    pub fn gamma(ctx: &Context, gamma: f64) -> CmsResult<Self> {
        Self::parametric(ctx, 1, &[gamma])
    }

    /// Builds the 258-entry curve that stretches v2 Lab codes to v4.
    ///
    /// Entries 0..=256 hold `(i * 0xFFFF + 0x80) >> 8`, the 257/256 stretch
    /// that moves full scale from 0xFF00 to 0xFFFF; entry 257 is pinned to
    /// 0xFFFF.
    pub fn lab_v2_to_v4(ctx: &Context) -> CmsResult<Self> {
        Self::from_fn(ctx, LAB_V2_TO_V4_ENTRIES, |i| {
            if i < LAB_V2_TO_V4_ENTRIES - 1 {
                ((i as u32 * 0xFFFF + 0x80) >> 8) as u16
            } else {
                0xFFFF
            }
        })
    }

    fn check_entries(ctx: &Context, entries: usize) -> CmsResult<()> {
        if entries < 2 {
            return Err(CmsError::InvalidCurve(format!(
                "a tabulated curve needs at least 2 entries, got {entries}"
            )));
        }
        let max = ctx.config().max_curve_entries;
        if entries > max {
            return Err(CmsError::InvalidCurve(format!(
                "{entries} entries exceeds the limit of {max}"
            )));
        }
        Ok(())
    }

    /// Returns the curve payload.
    #[inline]
    pub fn data(&self) -> &CurveData {
        &self.data
    }

    /// Returns the sample table of a tabulated curve.
    pub fn table(&self) -> Option<&[u16]> {
        match &self.data {
            CurveData::Tabulated(t) => Some(&t[..]),
            CurveData::Parametric { .. } => None,
        }
    }

    /// Number of samples of a tabulated curve.
    pub fn entry_count(&self) -> Option<usize> {
        self.table().map(<[u16]>::len)
    }

    /// Catalogue type of a parametric curve.
    pub fn parametric_type(&self) -> Option<i32> {
        match &self.data {
            CurveData::Parametric { curve_type, .. } => Some(*curve_type),
            CurveData::Tabulated(_) => None,
        }
    }

    /// Parameters of a parametric curve.
    pub fn params(&self) -> Option<&[f64]> {
        match &self.data {
            CurveData::Parametric { params, .. } => Some(&params[..]),
            CurveData::Tabulated(_) => None,
        }
    }

    /// Evaluates the curve in floating point.
    ///
    /// Tabulated curves clamp `x` to [0, 1] (NaN reads as 0) and interpolate
    /// linearly between the bracketing entries. Parametric curves evaluate
    /// their formula directly and are not clamped.
    pub fn eval_f32(&self, x: f32) -> f32 {
        match &self.data {
            CurveData::Tabulated(table) => {
                let x = if x.is_nan() { 0.0 } else { (x as f64).clamp(0.0, 1.0) };
                let domain = (table.len() - 1) as f64;
                let pos = x * domain;
                let i = (pos.floor() as usize).min(table.len() - 2);
                let frac = pos - i as f64;
                let y0 = table[i] as f64;
                let y1 = table[i + 1] as f64;
                ((y0 + (y1 - y0) * frac) / 65535.0) as f32
            }
            CurveData::Parametric { curve_type, params } => {
                eval_parametric(*curve_type, params, x as f64) as f32
            }
        }
    }

    /// Evaluates the curve on 16-bit codes.
    ///
    /// Tabulated curves interpolate in 16.16 fixed point; parametric curves
    /// are evaluated in double precision and saturated to 0..=0xFFFF.
    pub fn eval_u16(&self, v: u16) -> u16 {
        match &self.data {
            CurveData::Tabulated(table) => {
                let domain = table.len() - 1;
                if v == 0xFFFF {
                    return table[domain];
                }
                let fk = to_fixed_domain(v as i64 * domain as i64);
                let k0 = fixed_to_int(fk) as usize;
                let rk = fixed_rest_to_int(fk);
                let y0 = table[k0] as i32;
                let y1 = table[k0 + 1] as i32;
                linear_interp_u16(rk, y0, y1)
            }
            CurveData::Parametric { curve_type, params } => {
                let y = eval_parametric(*curve_type, params, v as f64 / 65535.0);
                quick_saturate_word(y * 65535.0)
            }
        }
    }

    /// The table itself, or a 4096-node sampling of a parametric formula.
    fn samples16(&self) -> Cow<'_, [u16]> {
        match &self.data {
            CurveData::Tabulated(t) => Cow::Borrowed(&t[..]),
            CurveData::Parametric { .. } => Cow::Owned(
                (0..INSPECTION_NODES)
                    .map(|i| self.eval_u16(quantize_val(i as f64, INSPECTION_NODES as u32)))
                    .collect(),
            ),
        }
    }

    /// True if the curve stays within 0x0F codes of the identity ramp.
    pub fn is_linear(&self) -> bool {
        let samples = self.samples16();
        let n = samples.len() as u32;
        samples.iter().enumerate().all(|(i, &s)| {
            let ideal = quantize_val(i as f64, n) as i32;
            (s as i32 - ideal).abs() <= 0x0F
        })
    }

    /// True if the first sample exceeds the last.
    pub fn is_descending(&self) -> bool {
        let samples = self.samples16();
        samples[0] > samples[samples.len() - 1]
    }

    /// True if the curve never reverses direction by more than 2 codes.
    pub fn is_monotonic(&self) -> bool {
        let samples = self.samples16();
        let ripple_ok = |pair: &[u16]| pair[1] as i32 - pair[0] as i32 <= 2;

        if self.is_descending() {
            samples.windows(2).all(ripple_ok)
        } else {
            samples.windows(2).rev().all(|w| ripple_ok(&[w[1], w[0]]))
        }
    }

    /// Estimates the exponent of a power-law-like curve.
    ///
    /// Fits `log(y) / log(x)` over interior samples above x = 0.07 and
    /// returns the mean, or `None` if too few samples qualify or their
    /// standard deviation exceeds `precision`.
    pub fn estimate_gamma(&self, precision: f64) -> Option<f64> {
        let mut sum = 0.0;
        let mut sum2 = 0.0;
        let mut n = 0.0;

        for i in 1..GAMMA_ESTIMATION_NODES - 1 {
            let x = i as f64 / (GAMMA_ESTIMATION_NODES - 1) as f64;
            let y = self.eval_f32(x as f32) as f64;

            // Skip the bottom 7% where linear toes dominate
            if y > 0.0 && y < 1.0 && x > 0.07 {
                let gamma = y.ln() / x.ln();
                sum += gamma;
                sum2 += gamma * gamma;
                n += 1.0;
            }
        }

        if n <= 1.0 {
            return None;
        }
        let std = ((n * sum2 - sum * sum) / (n * (n - 1.0))).max(0.0).sqrt();
        if std > precision {
            return None;
        }
        Some(sum / n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use cms_core::ContextConfig;

    #[test]
    fn test_tabulated_bounds() {
        let ctx = Context::default();
        assert!(matches!(ToneCurve::tabulated(&ctx, 1, &[]), Err(CmsError::InvalidCurve(_))));
        assert!(matches!(ToneCurve::tabulated(&ctx, 0, &[]), Err(CmsError::InvalidCurve(_))));
        assert!(ToneCurve::tabulated(&ctx, 65531, &[]).is_err());
        assert!(ToneCurve::tabulated(&ctx, 3, &[0, 1]).is_err());
    }

    #[test]
    fn test_tabulated_zero_filled() {
        let ctx = Context::default();
        let curve = ToneCurve::tabulated(&ctx, 16, &[]).unwrap();
        assert_eq!(curve.entry_count(), Some(16));
        assert!(curve.table().unwrap().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_tabulated_interpolation() {
        let ctx = Context::default();
        let curve = ToneCurve::tabulated(&ctx, 3, &[0, 0x8000, 0xFFFF]).unwrap();
        assert_eq!(curve.eval_f32(0.0), 0.0);
        assert_eq!(curve.eval_f32(1.0), 1.0);
        assert_abs_diff_eq!(curve.eval_f32(0.25), 0x4000 as f32 / 65535.0, epsilon = 1e-6);
        // Out of range input clamps
        assert_eq!(curve.eval_f32(-1.0), 0.0);
        assert_eq!(curve.eval_f32(2.0), 1.0);
        assert_eq!(curve.eval_f32(f32::NAN), 0.0);
    }

    #[test]
    fn test_eval_u16_identity() {
        let ctx = Context::default();
        let ramp = ToneCurve::from_fn(&ctx, 4096, |i| quantize_val(i as f64, 4096)).unwrap();
        for v in (0..=0xFFFFu32).step_by(97) {
            let out = ramp.eval_u16(v as u16) as i32;
            assert!((out - v as i32).abs() <= 1, "v={v} out={out}");
        }
        assert_eq!(ramp.eval_u16(0xFFFF), 0xFFFF);
        assert_eq!(ramp.eval_u16(0), 0);
    }

    #[test]
    fn test_eval_u16_largest_table() {
        let ctx = Context::default();
        let n = ctx.config().max_curve_entries;
        let ramp = ToneCurve::from_fn(&ctx, n, |i| quantize_val(i as f64, n as u32)).unwrap();
        for v in [0u16, 1, 0x1234, 0x8000, 0xFFFE, 0xFFFF] {
            assert_eq!(ramp.eval_u16(v), v);
        }
    }

    #[test]
    fn test_parametric_validation() {
        let ctx = Context::default();
        assert_eq!(
            ToneCurve::parametric(&ctx, 12, &[1.0]).unwrap_err(),
            CmsError::UnknownParametricType(12)
        );
        assert_eq!(
            ToneCurve::parametric(&ctx, 4, &[2.4, 1.0]).unwrap_err(),
            CmsError::ParameterArity { curve_type: 4, expected: 5, actual: 2 }
        );
    }

    #[test]
    fn test_gamma_properties() {
        let ctx = Context::default();
        for g in [0.0, 0.5, 1.0, 1.8, 2.2, 4.0] {
            let curve = ToneCurve::gamma(&ctx, g).unwrap();
            assert_eq!(curve.eval_f32(0.0), 0.0);
            assert_abs_diff_eq!(curve.eval_f32(1.0), 1.0, epsilon = 1e-6);
            assert_eq!(curve.eval_u16(0xFFFF), 0xFFFF);
        }
    }

    #[test]
    fn test_lab_v2_to_v4_curve() {
        let ctx = Context::default();
        let curve = ToneCurve::lab_v2_to_v4(&ctx).unwrap();
        let table = curve.table().unwrap();

        assert_eq!(table.len(), 258);
        assert_eq!(table[0], 0);
        assert_eq!(table[1], 0x100);
        assert_eq!(table[128], 0x8000);
        assert_eq!(table[256], 0xFFFF);
        assert_eq!(table[257], 0xFFFF);

        // v2 full scale maps onto v4 full scale
        assert_eq!(curve.eval_u16(0xFF00), 0xFFFF);
        assert_eq!(curve.eval_u16(0x8000), 0x8080);
        assert_eq!(curve.eval_u16(0), 0);
    }

    #[test]
    fn test_is_linear() {
        let ctx = Context::default();
        assert!(ToneCurve::gamma(&ctx, 1.0).unwrap().is_linear());
        assert!(!ToneCurve::gamma(&ctx, 2.2).unwrap().is_linear());
        assert!(ToneCurve::tabulated(&ctx, 2, &[0, 0xFFFF]).unwrap().is_linear());
    }

    #[test]
    fn test_monotonic() {
        let ctx = Context::default();
        assert!(ToneCurve::gamma(&ctx, 2.2).unwrap().is_monotonic());

        let down = ToneCurve::tabulated(&ctx, 3, &[0xFFFF, 0x8000, 0]).unwrap();
        assert!(down.is_descending());
        assert!(down.is_monotonic());

        let bump = ToneCurve::tabulated(&ctx, 4, &[0, 0x9000, 0x8000, 0xFFFF]).unwrap();
        assert!(!bump.is_descending());
        assert!(!bump.is_monotonic());
    }

    #[test]
    fn test_estimate_gamma() {
        let ctx = Context::default();
        let curve = ToneCurve::gamma(&ctx, 2.2).unwrap();
        let g = curve.estimate_gamma(0.01).unwrap();
        assert_abs_diff_eq!(g, 2.2, epsilon = 1e-3);

        let flat = ToneCurve::tabulated(&ctx, 2, &[0x8000, 0x8000]).unwrap();
        assert!(flat.estimate_gamma(0.01).is_none());
    }

    #[test]
    fn test_clone_shares_table() {
        let ctx = Context::default();
        let curve = ToneCurve::tabulated(&ctx, 256, &[]).unwrap();
        let copy = curve.clone();
        match (curve.data(), copy.data()) {
            (CurveData::Tabulated(a), CurveData::Tabulated(b)) => assert!(Arc::ptr_eq(a, b)),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_allocation_budget() {
        let ctx = Context::new(ContextConfig::default().with_allocation_limit(64));
        assert!(matches!(
            ToneCurve::tabulated(&ctx, 4096, &[]),
            Err(CmsError::AllocationFailed { .. })
        ));
        assert!(ToneCurve::gamma(&ctx, 2.2).is_ok());
    }
}
