//! Parametric curve validation against published transfer functions.
//!
//! Each catalogue formula is configured with the constants of a standard
//! transfer function and compared to values computed from that standard's
//! closed form.
//!
//! # Reference Documents
//!
//! - IEC 61966-2-1:1999 (sRGB)
//! - ITU-R BT.709-6 (Rec.709 OETF)
//! - CIE 122-1966

use approx::assert_abs_diff_eq;
use cms_core::Context;
use cms_curve::ToneCurve;

// ============================================================================
// sRGB as parametric type 4
// ============================================================================
//
//   Y = ((X + 0.055) / 1.055)^2.4   if X >= 0.04045
//   Y = X / 12.92                   otherwise

const SRGB_PARAMS: [f64; 5] = [2.4, 1.0 / 1.055, 0.055 / 1.055, 1.0 / 12.92, 0.04045];

const SRGB_REFERENCE: &[(f32, f32)] = &[
    // (encoded, linear)
    (0.0, 0.0),
    (0.02, 0.0015480),
    (0.04045, 0.0031308), // Break point
    (0.1, 0.0100228),
    (0.2, 0.0331048),
    (0.5, 0.2140411),
    (0.8, 0.6038273),
    (1.0, 1.0),
];

/// 16-bit codes of the sRGB EOTF, rounded half up.
const SRGB_REFERENCE_16: &[(u16, u16)] = &[
    (0x0000, 0),
    (0x4000, 3334),
    (0x8000, 14028),
    (0xC000, 34245),
    (0xFFFF, 0xFFFF),
];

// ============================================================================
// Rec.709 OETF as parametric type -4
// ============================================================================
//
// Forward (type 4) is the inverse OETF:
//   Y = ((X + 0.099) / 1.099)^(1/0.45)   if X >= 0.081
//   Y = X / 4.5                          otherwise

const REC709_PARAMS: [f64; 5] = [1.0 / 0.45, 1.0 / 1.099, 0.099 / 1.099, 1.0 / 4.5, 0.081];

const REC709_OETF_REFERENCE: &[(f32, f32)] = &[
    // (linear, encoded)
    (0.0, 0.0),
    (0.01, 0.045),
    (0.018, 0.0812479),
    (0.1, 0.2909399),
    (0.18, 0.4090077),
    (0.5, 0.7055151),
    (1.0, 1.0),
];

// ============================================================================
// CIE 122-1966 as parametric type 2
// ============================================================================

const CIE122_PARAMS: [f64; 3] = [2.6, 1.2, -0.2];

const CIE122_REFERENCE: &[(f32, f32)] = &[
    (0.0, 0.0),
    (0.1, 0.0), // Below -b/a
    (0.2, 0.0002319),
    (0.5, 0.0923328),
    (1.0, 1.0),
];

#[test]
fn srgb_type4_matches_reference() {
    let ctx = Context::default();
    let curve = ToneCurve::parametric(&ctx, 4, &SRGB_PARAMS).unwrap();

    for &(encoded, linear) in SRGB_REFERENCE {
        let result = curve.eval_f32(encoded);
        assert_abs_diff_eq!(result, linear, epsilon = 1e-6);
    }
}

#[test]
fn srgb_type4_16bit_codes() {
    let ctx = Context::default();
    let curve = ToneCurve::parametric(&ctx, 4, &SRGB_PARAMS).unwrap();

    for &(input, expected) in SRGB_REFERENCE_16 {
        assert_eq!(curve.eval_u16(input), expected, "input 0x{input:04X}");
    }
}

#[test]
fn srgb_inverse_roundtrip() {
    let ctx = Context::default();
    let eotf = ToneCurve::parametric(&ctx, 4, &SRGB_PARAMS).unwrap();
    let oetf = ToneCurve::parametric(&ctx, -4, &SRGB_PARAMS).unwrap();

    for i in 0..=100 {
        let v = i as f32 / 100.0;
        let back = oetf.eval_f32(eotf.eval_f32(v));
        assert!((back - v).abs() < 1e-5, "v={v}, back={back}");
    }
}

#[test]
fn rec709_oetf_matches_reference() {
    let ctx = Context::default();
    let oetf = ToneCurve::parametric(&ctx, -4, &REC709_PARAMS).unwrap();

    for &(linear, encoded) in REC709_OETF_REFERENCE {
        let result = oetf.eval_f32(linear);
        assert_abs_diff_eq!(result, encoded, epsilon = 1e-5);
    }
}

#[test]
fn cie122_matches_reference() {
    let ctx = Context::default();
    let curve = ToneCurve::parametric(&ctx, 2, &CIE122_PARAMS).unwrap();

    for &(x, y) in CIE122_REFERENCE {
        assert_abs_diff_eq!(curve.eval_f32(x), y, epsilon = 1e-6);
    }
}

#[test]
fn tabulated_srgb_tracks_parametric() {
    let ctx = Context::default();
    let formula = ToneCurve::parametric(&ctx, 4, &SRGB_PARAMS).unwrap();
    let table = ToneCurve::from_fn(&ctx, 4096, |i| {
        formula.eval_u16(cms_core::fixed::quantize_val(i as f64, 4096))
    })
    .unwrap();

    for i in 0..=200 {
        let x = i as f32 / 200.0;
        assert_abs_diff_eq!(table.eval_f32(x), formula.eval_f32(x), epsilon = 1e-4);
    }
    assert!(table.is_monotonic());
    assert!(!table.is_linear());
}

#[test]
fn estimated_gamma_of_srgb() {
    let ctx = Context::default();
    let curve = ToneCurve::parametric(&ctx, 4, &SRGB_PARAMS).unwrap();

    // The piecewise curve is close to, but not exactly, a 2.2 power law
    let g = curve.estimate_gamma(0.1).unwrap();
    assert!((g - 2.2).abs() < 0.1, "g={g}");
    assert!(curve.estimate_gamma(1e-4).is_none());
}
