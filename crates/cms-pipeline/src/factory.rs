//! Named stage factories.
//!
//! Every function returns a fully built stage tagged with the
//! [`StageSignature`] of the semantic it implements, so pipelines can be
//! inspected with [`Pipeline::check_and_retrieve_stages`](crate::Pipeline::check_and_retrieve_stages).
//!
//! # Float PCS
//!
//! Float pipelines carry Lab and XYZ normalized to [0, 1]:
//!
//! | Space | Physical | Normalized |
//! |-------|----------|------------|
//! | Lab | L 0..100, a/b -128..127 | `L/100`, `(a+128)/255` |
//! | XYZ | 0..[`MAX_ENCODEABLE_XYZ`](cms_core::pcs::MAX_ENCODEABLE_XYZ) | `X * 32768/65535` |

use cms_core::{CmsResult, Context};
use cms_curve::ToneCurve;
use cms_lut::SampleMode;

use crate::stage::{Stage, StageData, StageSignature};

/// v2 Lab full scale (0xFF00) relative to v4 (0xFFFF).
const LAB_V2_TO_V4: f64 = 65535.0 / 65280.0;

/// 16-bit XYZ code 0x8000 is 1.0.
const XYZ_TO_FLOAT: f64 = 32768.0 / 65535.0;

fn diagonal(ctx: &Context, diag: [f64; 3], offset: Option<&[f64]>) -> CmsResult<Stage> {
    #[rustfmt::skip]
    let m = [
        diag[0], 0.0, 0.0,
        0.0, diag[1], 0.0,
        0.0, 0.0, diag[2],
    ];
    Stage::matrix(ctx, 3, 3, &m, offset)
}

/// `n` pass-through curves.
pub fn identity_curves(ctx: &Context, n: usize) -> CmsResult<Stage> {
    let curve = ToneCurve::gamma(ctx, 1.0)?;
    let curves = vec![curve; n];
    Ok(Stage::curves(ctx, &curves)?.with_signature(StageSignature::Identity))
}

/// 16-bit CLUT with 2 nodes per dimension that maps each input to itself.
pub fn identity_clut(ctx: &Context, n: usize) -> CmsResult<Stage> {
    let mut stage = Stage::clut_u16(ctx, 2, n, n, None)?;
    stage.sample_clut_u16(SampleMode::Write, |input, output| {
        output.copy_from_slice(input);
        true
    })?;
    Ok(stage.with_signature(StageSignature::Identity))
}

/// Normalized Lab to normalized XYZ, D50 white.
pub fn lab_to_xyz(ctx: &Context) -> CmsResult<Stage> {
    Stage::closed_form(ctx, StageSignature::LabToXyz, 3, StageData::LabToXyz)
}

/// Normalized XYZ to normalized Lab, D50 white.
pub fn xyz_to_lab(ctx: &Context) -> CmsResult<Stage> {
    Stage::closed_form(ctx, StageSignature::XyzToLab, 3, StageData::XyzToLab)
}

/// Clamps negative values to zero on `n` channels.
pub fn clip_negatives(ctx: &Context, n: usize) -> CmsResult<Stage> {
    Stage::closed_form(ctx, StageSignature::ClipNegatives, n, StageData::ClipNegatives)
}

/// Stretches v2 Lab (full scale 0xFF00) to v4 (0xFFFF).
pub fn lab_v2_to_v4(ctx: &Context) -> CmsResult<Stage> {
    Ok(diagonal(ctx, [LAB_V2_TO_V4; 3], None)?.with_signature(StageSignature::LabV2ToV4))
}

/// Shrinks v4 Lab to v2; the exact inverse of [`lab_v2_to_v4`].
pub fn lab_v4_to_v2(ctx: &Context) -> CmsResult<Stage> {
    Ok(diagonal(ctx, [1.0 / LAB_V2_TO_V4; 3], None)?.with_signature(StageSignature::LabV4ToV2))
}

/// v2 to v4 Lab as three 258-entry curves.
///
/// Bit-exact for 16-bit codes whose low byte is zero; see
/// [`ToneCurve::lab_v2_to_v4`].
pub fn lab_v2_to_v4_curves(ctx: &Context) -> CmsResult<Stage> {
    let curve = ToneCurve::lab_v2_to_v4(ctx)?;
    let curves = [curve.clone(), curve.clone(), curve];
    Ok(Stage::curves(ctx, &curves)?.with_signature(StageSignature::LabV2ToV4))
}

/// Physical Lab to [0, 1] float PCS.
pub fn lab_to_float_pcs(ctx: &Context) -> CmsResult<Stage> {
    let offset = [0.0, 128.0 / 255.0, 128.0 / 255.0];
    Ok(
        diagonal(ctx, [1.0 / 100.0, 1.0 / 255.0, 1.0 / 255.0], Some(&offset))?
            .with_signature(StageSignature::LabToFloatPcs),
    )
}

/// [0, 1] float PCS to physical Lab.
pub fn float_pcs_to_lab(ctx: &Context) -> CmsResult<Stage> {
    let offset = [0.0, -128.0, -128.0];
    Ok(diagonal(ctx, [100.0, 255.0, 255.0], Some(&offset))?
        .with_signature(StageSignature::FloatPcsToLab))
}

/// Physical XYZ to [0, 1] float PCS.
pub fn xyz_to_float_pcs(ctx: &Context) -> CmsResult<Stage> {
    Ok(diagonal(ctx, [XYZ_TO_FLOAT; 3], None)?.with_signature(StageSignature::XyzToFloatPcs))
}

/// [0, 1] float PCS to physical XYZ.
pub fn float_pcs_to_xyz(ctx: &Context) -> CmsResult<Stage> {
    Ok(diagonal(ctx, [1.0 / XYZ_TO_FLOAT; 3], None)?
        .with_signature(StageSignature::FloatPcsToXyz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StageKind;
    use approx::assert_abs_diff_eq;
    use cms_core::pcs::{lab_to_xyz as lab_to_xyz_f64, CieLab, D50, MAX_ENCODEABLE_XYZ};
    use cms_core::CmsError;

    fn eval3(stage: &Stage, input: [f32; 3]) -> [f32; 3] {
        let mut out = [0.0f32; 3];
        stage.eval(&input, &mut out);
        out
    }

    #[test]
    fn test_signatures() {
        let ctx = Context::default();
        let cases = [
            (identity_curves(&ctx, 3).unwrap(), StageSignature::Identity, StageKind::CurveSet),
            (identity_clut(&ctx, 3).unwrap(), StageSignature::Identity, StageKind::Clut),
            (lab_to_xyz(&ctx).unwrap(), StageSignature::LabToXyz, StageKind::LabToXyz),
            (xyz_to_lab(&ctx).unwrap(), StageSignature::XyzToLab, StageKind::XyzToLab),
            (lab_v2_to_v4(&ctx).unwrap(), StageSignature::LabV2ToV4, StageKind::Matrix),
            (lab_v4_to_v2(&ctx).unwrap(), StageSignature::LabV4ToV2, StageKind::Matrix),
            (lab_v2_to_v4_curves(&ctx).unwrap(), StageSignature::LabV2ToV4, StageKind::CurveSet),
            (lab_to_float_pcs(&ctx).unwrap(), StageSignature::LabToFloatPcs, StageKind::Matrix),
            (float_pcs_to_lab(&ctx).unwrap(), StageSignature::FloatPcsToLab, StageKind::Matrix),
            (xyz_to_float_pcs(&ctx).unwrap(), StageSignature::XyzToFloatPcs, StageKind::Matrix),
            (float_pcs_to_xyz(&ctx).unwrap(), StageSignature::FloatPcsToXyz, StageKind::Matrix),
            (clip_negatives(&ctx, 4).unwrap(), StageSignature::ClipNegatives, StageKind::ClipNegatives),
        ];
        for (stage, sig, kind) in cases {
            assert_eq!(stage.implements(), sig);
            assert_eq!(stage.kind(), kind);
        }
    }

    #[test]
    fn test_lab_to_xyz_white() {
        let ctx = Context::default();
        // L=100, a=b=0 is the D50 white
        let out = eval3(&lab_to_xyz(&ctx).unwrap(), [1.0, 128.0 / 255.0, 128.0 / 255.0]);
        assert_abs_diff_eq!(out[0] as f64, D50.x / MAX_ENCODEABLE_XYZ, epsilon = 1e-6);
        assert_abs_diff_eq!(out[1] as f64, 1.0 / MAX_ENCODEABLE_XYZ, epsilon = 1e-6);
        assert_abs_diff_eq!(out[2] as f64, D50.z / MAX_ENCODEABLE_XYZ, epsilon = 1e-6);
    }

    #[test]
    fn test_lab_to_xyz_matches_colorimetry() {
        let ctx = Context::default();
        let stage = lab_to_xyz(&ctx).unwrap();
        let lab = CieLab::new(40.0, 20.0, -30.0);
        let xyz = lab_to_xyz_f64(&D50, &lab);

        let input = [
            (lab.l / 100.0) as f32,
            ((lab.a + 128.0) / 255.0) as f32,
            ((lab.b + 128.0) / 255.0) as f32,
        ];
        let out = eval3(&stage, input);
        assert_abs_diff_eq!(out[0] as f64 * MAX_ENCODEABLE_XYZ, xyz.x, epsilon = 1e-5);
        assert_abs_diff_eq!(out[1] as f64 * MAX_ENCODEABLE_XYZ, xyz.y, epsilon = 1e-5);
        assert_abs_diff_eq!(out[2] as f64 * MAX_ENCODEABLE_XYZ, xyz.z, epsilon = 1e-5);
    }

    #[test]
    fn test_float_pcs_lab_roundtrip() {
        let ctx = Context::default();
        let to = lab_to_float_pcs(&ctx).unwrap();
        let from = float_pcs_to_lab(&ctx).unwrap();

        let normalized = eval3(&to, [50.0, -20.0, 64.0]);
        assert_abs_diff_eq!(normalized[0], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(normalized[1], 108.0 / 255.0, epsilon = 1e-6);
        assert_abs_diff_eq!(normalized[2], 192.0 / 255.0, epsilon = 1e-6);

        let back = eval3(&from, normalized);
        assert_abs_diff_eq!(back[0], 50.0, epsilon = 1e-4);
        assert_abs_diff_eq!(back[1], -20.0, epsilon = 1e-4);
        assert_abs_diff_eq!(back[2], 64.0, epsilon = 1e-4);
    }

    #[test]
    fn test_float_pcs_xyz() {
        let ctx = Context::default();
        let out = eval3(&xyz_to_float_pcs(&ctx).unwrap(), [1.0, 0.5, MAX_ENCODEABLE_XYZ as f32]);
        assert_abs_diff_eq!(out[0], 32768.0 / 65535.0, epsilon = 1e-7);
        assert_abs_diff_eq!(out[2], 1.0, epsilon = 1e-6);

        let back = eval3(&float_pcs_to_xyz(&ctx).unwrap(), out);
        assert_abs_diff_eq!(back[1], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_v2_to_v4_curves_full_scale() {
        let ctx = Context::default();
        let stage = lab_v2_to_v4_curves(&ctx).unwrap();
        let curves = stage.curves_ref().unwrap();
        assert_eq!(curves[0].eval_u16(0xFF00), 0xFFFF);
        assert_eq!(curves[1].eval_u16(0), 0);
    }

    #[test]
    fn test_v2_v4_matrices_agree_with_curves() {
        let ctx = Context::default();
        let matrix = lab_v2_to_v4(&ctx).unwrap();
        let curves = lab_v2_to_v4_curves(&ctx).unwrap();

        for code in [0x0000u16, 0x4000, 0x8000, 0xC000, 0xFF00] {
            let v = code as f32 / 65535.0;
            let a = eval3(&matrix, [v; 3]);
            let b = eval3(&curves, [v; 3]);
            assert_abs_diff_eq!(a[0], b[0], epsilon = 1e-5);
        }
    }

    #[test]
    fn test_clip_negatives() {
        let ctx = Context::default();
        let stage = clip_negatives(&ctx, 4).unwrap();
        let mut out = [0.0f32; 4];
        stage.eval(&[-1.0, 0.0, 0.5, 3.0], &mut out);
        assert_eq!(out, [0.0, 0.0, 0.5, 3.0]);

        assert!(matches!(clip_negatives(&ctx, 0), Err(CmsError::InvalidChannels(_))));
    }

    #[test]
    fn test_identity_clut_limits() {
        let ctx = Context::default();
        assert!(identity_clut(&ctx, 0).is_err());
        assert!(identity_clut(&ctx, 16).is_err());
        assert_eq!(identity_clut(&ctx, 15).unwrap().input_channels(), 15);
    }
}
