//! Pipeline stages.
//!
//! A stage is a closed tagged union: its [`StageData`] selects the
//! evaluation kernel, and a separate [`StageSignature`] records which named
//! built-in it was created as (a generic matrix and a v2-to-v4 Lab matrix
//! share a kernel but not a signature).

use cms_core::pcs::{lab_to_xyz, xyz_to_lab, CieLab, CieXyz, D50, MAX_ENCODEABLE_XYZ};
use cms_core::{CmsError, CmsResult, Context};
use cms_curve::ToneCurve;
use cms_lut::{Clut, SampleMode};
use tracing::{trace, warn};

/// Structural variant of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// One tone curve per channel.
    CurveSet,
    /// Dense matrix with optional offset.
    Matrix,
    /// Multi-dimensional lookup table.
    Clut,
    /// Normalized Lab to normalized XYZ.
    LabToXyz,
    /// Normalized XYZ to normalized Lab.
    XyzToLab,
    /// Negative values clamped to zero.
    ClipNegatives,
}

/// Named semantic a stage implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageSignature {
    /// Generic curve set.
    CurveSet,
    /// Generic matrix.
    Matrix,
    /// Generic CLUT.
    Clut,
    /// Pass-through curves or CLUT.
    Identity,
    /// Lab to XYZ conversion.
    LabToXyz,
    /// XYZ to Lab conversion.
    XyzToLab,
    /// v2 Lab encoding to v4 (matrix or curves).
    LabV2ToV4,
    /// v4 Lab encoding to v2.
    LabV4ToV2,
    /// Lab to [0, 1] float PCS.
    LabToFloatPcs,
    /// [0, 1] float PCS to Lab.
    FloatPcsToLab,
    /// XYZ to [0, 1] float PCS.
    XyzToFloatPcs,
    /// [0, 1] float PCS to XYZ.
    FloatPcsToXyz,
    /// Negative clip.
    ClipNegatives,
}

/// Variant payload of a stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageData {
    /// One curve per channel.
    Curves(Vec<ToneCurve>),
    /// Row-major `rows x cols` coefficients and an optional `rows` offset.
    Matrix {
        /// Output count.
        rows: usize,
        /// Input count.
        cols: usize,
        /// Row-major coefficients.
        coefficients: Vec<f64>,
        /// Added after the multiply.
        offset: Option<Vec<f64>>,
    },
    /// Lookup table.
    Clut(Clut),
    /// Closed-form Lab to XYZ.
    LabToXyz,
    /// Closed-form XYZ to Lab.
    XyzToLab,
    /// Per-channel `max(v, 0)`.
    ClipNegatives,
}

/// One transform step with fixed channel counts.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    implements: StageSignature,
    input_channels: usize,
    output_channels: usize,
    data: StageData,
}

fn check_channels(ctx: &Context, what: &str, n: usize) -> CmsResult<()> {
    let max = ctx.config().max_stage_channels;
    if n == 0 || n >= max {
        warn!(channels = n, max, "rejected {what} stage");
        return Err(CmsError::InvalidChannels(format!(
            "{what}: {n} channels (limit {max})"
        )));
    }
    Ok(())
}

impl Stage {
    fn alloc(
        ctx: &Context,
        implements: StageSignature,
        input_channels: usize,
        output_channels: usize,
        data: StageData,
    ) -> CmsResult<Self> {
        ctx.charge(std::mem::size_of::<Self>())?;
        trace!(?implements, input_channels, output_channels, "stage");
        Ok(Self {
            implements,
            input_channels,
            output_channels,
            data,
        })
    }

    /// Creates a curve-set stage, one curve per channel.
    ///
    /// Curves are shared with the caller's copies, not duplicated.
    pub fn curves(ctx: &Context, curves: &[ToneCurve]) -> CmsResult<Self> {
        check_channels(ctx, "curve set", curves.len())?;
        ctx.charge(std::mem::size_of_val(curves))?;
        let n = curves.len();
        Self::alloc(
            ctx,
            StageSignature::CurveSet,
            n,
            n,
            StageData::Curves(curves.to_vec()),
        )
    }

    /// Creates a matrix stage computing `Out = M * In + offset`.
    ///
    /// `coefficients` is row-major with `rows` outputs and `cols` inputs.
    ///
    /// # Errors
    ///
    /// - [`CmsError::InvalidChannels`] if `rows` or `cols` is out of range
    /// - [`CmsError::TableMismatch`] if `coefficients` or `offset` has the
    ///   wrong length
    pub fn matrix(
        ctx: &Context,
        rows: usize,
        cols: usize,
        coefficients: &[f64],
        offset: Option<&[f64]>,
    ) -> CmsResult<Self> {
        check_channels(ctx, "matrix rows", rows)?;
        check_channels(ctx, "matrix cols", cols)?;

        let n = rows
            .checked_mul(cols)
            .ok_or_else(|| CmsError::Overflow(format!("{rows}x{cols} matrix")))?;
        if coefficients.len() != n {
            return Err(CmsError::TableMismatch(format!(
                "{rows}x{cols} matrix needs {n} coefficients, got {}",
                coefficients.len()
            )));
        }
        if let Some(o) = offset {
            if o.len() != rows {
                return Err(CmsError::TableMismatch(format!(
                    "matrix offset needs {rows} values, got {}",
                    o.len()
                )));
            }
        }

        let coefficients = ctx.alloc_from_slice(coefficients)?;
        let offset = offset.map(|o| ctx.alloc_from_slice(o)).transpose()?;

        Self::alloc(
            ctx,
            StageSignature::Matrix,
            cols,
            rows,
            StageData::Matrix {
                rows,
                cols,
                coefficients,
                offset,
            },
        )
    }

    /// Wraps a CLUT built with the same context.
    pub fn from_clut(ctx: &Context, clut: Clut) -> CmsResult<Self> {
        let (inputs, outputs) = (clut.input_channels(), clut.output_channels());
        Self::alloc(ctx, StageSignature::Clut, inputs, outputs, StageData::Clut(clut))
    }

    /// Creates a zeroed 16-bit CLUT stage with `points` nodes per dimension.
    pub fn clut_u16(
        ctx: &Context,
        points: u32,
        input_channels: usize,
        output_channels: usize,
        table: Option<&[u16]>,
    ) -> CmsResult<Self> {
        let clut = Clut::uniform_u16(ctx, points, input_channels, output_channels, table)?;
        Self::from_clut(ctx, clut)
    }

    /// Creates a zeroed float CLUT stage with `points` nodes per dimension.
    pub fn clut_f32(
        ctx: &Context,
        points: u32,
        input_channels: usize,
        output_channels: usize,
        table: Option<&[f32]>,
    ) -> CmsResult<Self> {
        let clut = Clut::uniform_f32(ctx, points, input_channels, output_channels, table)?;
        Self::from_clut(ctx, clut)
    }

    /// Creates a closed-form stage (`LabToXyz`, `XyzToLab` or `ClipNegatives`).
    pub(crate) fn closed_form(
        ctx: &Context,
        implements: StageSignature,
        channels: usize,
        data: StageData,
    ) -> CmsResult<Self> {
        check_channels(ctx, "closed-form", channels)?;
        Self::alloc(ctx, implements, channels, channels, data)
    }

    /// Replaces the signature tag.
    pub(crate) fn with_signature(mut self, implements: StageSignature) -> Self {
        self.implements = implements;
        self
    }

    /// Structural variant.
    pub fn kind(&self) -> StageKind {
        match &self.data {
            StageData::Curves(_) => StageKind::CurveSet,
            StageData::Matrix { .. } => StageKind::Matrix,
            StageData::Clut(_) => StageKind::Clut,
            StageData::LabToXyz => StageKind::LabToXyz,
            StageData::XyzToLab => StageKind::XyzToLab,
            StageData::ClipNegatives => StageKind::ClipNegatives,
        }
    }

    /// Named semantic this stage was built as.
    #[inline]
    pub fn implements(&self) -> StageSignature {
        self.implements
    }

    /// Number of input channels.
    #[inline]
    pub fn input_channels(&self) -> usize {
        self.input_channels
    }

    /// Number of output channels.
    #[inline]
    pub fn output_channels(&self) -> usize {
        self.output_channels
    }

    /// Variant payload.
    #[inline]
    pub fn data(&self) -> &StageData {
        &self.data
    }

    /// Curves of a curve-set stage.
    pub fn curves_ref(&self) -> Option<&[ToneCurve]> {
        match &self.data {
            StageData::Curves(c) => Some(c),
            _ => None,
        }
    }

    /// Table of a CLUT stage.
    pub fn clut(&self) -> Option<&Clut> {
        match &self.data {
            StageData::Clut(c) => Some(c),
            _ => None,
        }
    }

    /// Fills or inspects a 16-bit CLUT stage. See [`Clut::sample_u16`].
    ///
    /// # Errors
    ///
    /// [`CmsError::TableMismatch`] if this is not a 16-bit CLUT stage, plus
    /// the errors of [`Clut::sample_u16`].
    pub fn sample_clut_u16<F>(&mut self, mode: SampleMode, sampler: F) -> CmsResult<()>
    where
        F: FnMut(&[u16], &mut [u16]) -> bool,
    {
        match &mut self.data {
            StageData::Clut(c) => c.sample_u16(mode, sampler),
            _ => Err(CmsError::TableMismatch(format!(
                "{:?} stage has no CLUT",
                self.kind()
            ))),
        }
    }

    /// Fills or inspects a float CLUT stage. See [`Clut::sample_f32`].
    pub fn sample_clut_f32<F>(&mut self, mode: SampleMode, sampler: F) -> CmsResult<()>
    where
        F: FnMut(&[f32], &mut [f32]) -> bool,
    {
        match &mut self.data {
            StageData::Clut(c) => c.sample_f32(mode, sampler),
            _ => Err(CmsError::TableMismatch(format!(
                "{:?} stage has no CLUT",
                self.kind()
            ))),
        }
    }

    /// Evaluates the stage on one sample.
    ///
    /// Reads `input_channels` values and writes `output_channels` values.
    ///
    /// # Panics
    ///
    /// If `input` or `output` is shorter than the stage's channel counts.
    pub fn eval(&self, input: &[f32], output: &mut [f32]) {
        let input = &input[..self.input_channels];
        let output = &mut output[..self.output_channels];

        match &self.data {
            StageData::Curves(curves) => {
                for ((out, &v), curve) in output.iter_mut().zip(input).zip(curves) {
                    *out = curve.eval_f32(v);
                }
            }
            StageData::Matrix {
                cols,
                coefficients,
                offset,
                ..
            } => {
                for (i, out) in output.iter_mut().enumerate() {
                    let row = &coefficients[i * cols..(i + 1) * cols];
                    let mut acc: f64 = row
                        .iter()
                        .zip(input)
                        .map(|(&m, &v)| m * v as f64)
                        .sum();
                    if let Some(o) = offset {
                        acc += o[i];
                    }
                    *out = acc as f32;
                }
            }
            StageData::Clut(clut) => clut.eval_f32(input, output),
            StageData::LabToXyz => {
                let lab = CieLab::new(
                    input[0] as f64 * 100.0,
                    input[1] as f64 * 255.0 - 128.0,
                    input[2] as f64 * 255.0 - 128.0,
                );
                let xyz = lab_to_xyz(&D50, &lab);
                output[0] = (xyz.x / MAX_ENCODEABLE_XYZ) as f32;
                output[1] = (xyz.y / MAX_ENCODEABLE_XYZ) as f32;
                output[2] = (xyz.z / MAX_ENCODEABLE_XYZ) as f32;
            }
            StageData::XyzToLab => {
                let xyz = CieXyz::new(
                    input[0] as f64 * MAX_ENCODEABLE_XYZ,
                    input[1] as f64 * MAX_ENCODEABLE_XYZ,
                    input[2] as f64 * MAX_ENCODEABLE_XYZ,
                );
                let lab = xyz_to_lab(&D50, &xyz);
                output[0] = (lab.l / 100.0) as f32;
                output[1] = ((lab.a + 128.0) / 255.0) as f32;
                output[2] = ((lab.b + 128.0) / 255.0) as f32;
            }
            StageData::ClipNegatives => {
                for (out, &v) in output.iter_mut().zip(input) {
                    *out = if v < 0.0 { 0.0 } else { v };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use cms_core::ContextConfig;

    #[test]
    fn test_curves_stage() {
        let ctx = Context::default();
        let g = ToneCurve::gamma(&ctx, 2.0).unwrap();
        let stage = Stage::curves(&ctx, &[g.clone(), g.clone(), g]).unwrap();
        assert_eq!(stage.kind(), StageKind::CurveSet);
        assert_eq!(stage.implements(), StageSignature::CurveSet);
        assert_eq!(stage.curves_ref().map(<[_]>::len), Some(3));

        let mut out = [0.0f32; 3];
        stage.eval(&[0.5, 0.0, 1.0], &mut out);
        assert_abs_diff_eq!(out[0], 0.25, epsilon = 1e-6);
        assert_eq!(out[1], 0.0);
        assert_abs_diff_eq!(out[2], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_empty_curve_set_rejected() {
        let ctx = Context::default();
        assert!(matches!(
            Stage::curves(&ctx, &[]),
            Err(CmsError::InvalidChannels(_))
        ));
    }

    #[test]
    fn test_matrix_shape() {
        let ctx = Context::default();
        // 2 outputs from 3 inputs
        let m = [1.0, 2.0, 3.0, 0.0, 0.5, 0.0];
        let stage = Stage::matrix(&ctx, 2, 3, &m, Some(&[0.25, -1.0])).unwrap();
        assert_eq!(stage.input_channels(), 3);
        assert_eq!(stage.output_channels(), 2);

        let mut out = [0.0f32; 2];
        stage.eval(&[1.0, 1.0, 1.0], &mut out);
        assert_abs_diff_eq!(out[0], 6.25, epsilon = 1e-6);
        assert_abs_diff_eq!(out[1], -0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_matrix_mismatch() {
        let ctx = Context::default();
        assert!(matches!(
            Stage::matrix(&ctx, 3, 3, &[1.0; 8], None),
            Err(CmsError::TableMismatch(_))
        ));
        assert!(matches!(
            Stage::matrix(&ctx, 3, 3, &[1.0; 9], Some(&[0.0; 2])),
            Err(CmsError::TableMismatch(_))
        ));
        assert!(matches!(
            Stage::matrix(&ctx, 0, 3, &[], None),
            Err(CmsError::InvalidChannels(_))
        ));
    }

    #[test]
    fn test_channel_limit_from_config() {
        let ctx = Context::new(ContextConfig::default().with_max_stage_channels(4));
        assert!(Stage::matrix(&ctx, 3, 3, &[0.0; 9], None).is_ok());
        assert!(Stage::matrix(&ctx, 4, 1, &[0.0; 4], None).is_err());
    }

    #[test]
    fn test_clut_stage_sampling() {
        let ctx = Context::default();
        let mut stage = Stage::clut_f32(&ctx, 3, 2, 1, None).unwrap();
        assert_eq!(stage.kind(), StageKind::Clut);
        stage
            .sample_clut_f32(SampleMode::Write, |i, o| {
                o[0] = i[0] + i[1];
                true
            })
            .unwrap();

        let mut out = [0.0f32];
        stage.eval(&[0.25, 0.5], &mut out);
        assert_abs_diff_eq!(out[0], 0.75, epsilon = 1e-4);

        assert!(matches!(
            stage.sample_clut_u16(SampleMode::Write, |_, _| true),
            Err(CmsError::TableMismatch(_))
        ));
    }

    #[test]
    fn test_sampling_non_clut_stage() {
        let ctx = Context::default();
        let mut stage = Stage::matrix(&ctx, 1, 1, &[1.0], None).unwrap();
        assert!(matches!(
            stage.sample_clut_f32(SampleMode::Inspect, |_, _| true),
            Err(CmsError::TableMismatch(_))
        ));
    }

    #[test]
    fn test_stage_charges_context() {
        let ctx = Context::default();
        let before = ctx.allocated();
        let _stage = Stage::matrix(&ctx, 3, 3, &[0.0; 9], None).unwrap();
        assert!(ctx.allocated() > before);
    }
}
