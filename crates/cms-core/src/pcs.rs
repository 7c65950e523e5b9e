//! Profile connection space colorimetry.
//!
//! CIE Lab and XYZ values in physical units, the conversions between them
//! relative to a white point, and the 16-bit encodings used by ICC v2 and
//! v4 profiles.
//!
//! # Ranges
//!
//! | Space | Component | Physical range | v4 16-bit code |
//! |-------|-----------|----------------|----------------|
//! | Lab | L* | 0..100 | `L * 655.35` |
//! | Lab | a*, b* | -128..127 | `(a + 128) * 257` |
//! | XYZ | X, Y, Z | 0..[`MAX_ENCODEABLE_XYZ`] | `X * 32768` |
//!
//! # Example
//!
//! ```rust
//! use cms_core::pcs::{lab_to_xyz, xyz_to_lab, CieLab, D50};
//!
//! let lab = CieLab::new(50.0, 10.0, -20.0);
//! let xyz = lab_to_xyz(&D50, &lab);
//! let back = xyz_to_lab(&D50, &xyz);
//! assert!((back.l - lab.l).abs() < 1e-9);
//! ```

use crate::fixed::quick_saturate_word;

/// Largest XYZ component representable in the 1.15 fixed-point encoding.
///
/// Code 0xFFFF maps to this value.
pub const MAX_ENCODEABLE_XYZ: f64 = 1.0 + 32767.0 / 32768.0;

/// CIE XYZ tristimulus values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CieXyz {
    /// X component
    pub x: f64,
    /// Y component (luminance)
    pub y: f64,
    /// Z component
    pub z: f64,
}

impl CieXyz {
    /// Creates an XYZ triple.
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// CIE L*a*b* values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CieLab {
    /// Lightness, 0..100
    pub l: f64,
    /// Green-red axis
    pub a: f64,
    /// Blue-yellow axis
    pub b: f64,
}

impl CieLab {
    /// Creates a Lab triple.
    #[inline]
    pub const fn new(l: f64, a: f64, b: f64) -> Self {
        Self { l, a, b }
    }
}

/// D50 illuminant, the ICC profile connection space white.
pub const D50: CieXyz = CieXyz::new(0.9642, 1.0, 0.8249);

fn f(t: f64) -> f64 {
    const LIMIT: f64 = (24.0 / 116.0) * (24.0 / 116.0) * (24.0 / 116.0);

    if t <= LIMIT {
        (841.0 / 108.0) * t + (16.0 / 116.0)
    } else {
        t.cbrt()
    }
}

fn f_inv(t: f64) -> f64 {
    const LIMIT: f64 = 24.0 / 116.0;

    if t <= LIMIT {
        (108.0 / 841.0) * (t - (16.0 / 116.0))
    } else {
        t * t * t
    }
}

/// Converts Lab to XYZ relative to `white`.
pub fn lab_to_xyz(white: &CieXyz, lab: &CieLab) -> CieXyz {
    let y = (lab.l + 16.0) / 116.0;
    let x = y + 0.002 * lab.a;
    let z = y - 0.005 * lab.b;

    CieXyz::new(
        f_inv(x) * white.x,
        f_inv(y) * white.y,
        f_inv(z) * white.z,
    )
}

/// Converts XYZ to Lab relative to `white`.
pub fn xyz_to_lab(white: &CieXyz, xyz: &CieXyz) -> CieLab {
    let fx = f(xyz.x / white.x);
    let fy = f(xyz.y / white.y);
    let fz = f(xyz.z / white.z);

    CieLab::new(116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz))
}

// ============================================================================
// 16-bit encodings
// ============================================================================

/// Decodes a v4 16-bit Lab triple.
pub fn encoded_to_lab(w: [u16; 3]) -> CieLab {
    CieLab::new(
        w[0] as f64 / 655.35,
        w[1] as f64 / 257.0 - 128.0,
        w[2] as f64 / 257.0 - 128.0,
    )
}

/// Encodes Lab into the v4 16-bit encoding, clamping to the legal range.
pub fn lab_to_encoded(lab: &CieLab) -> [u16; 3] {
    let l = lab.l.clamp(0.0, 100.0);
    let a = lab.a.clamp(-128.0, 127.0);
    let b = lab.b.clamp(-128.0, 127.0);

    [
        quick_saturate_word(l * 655.35),
        quick_saturate_word((a + 128.0) * 257.0),
        quick_saturate_word((b + 128.0) * 257.0),
    ]
}

/// Decodes a v2 16-bit Lab triple (full scale 0xFF00).
pub fn encoded_v2_to_lab(w: [u16; 3]) -> CieLab {
    CieLab::new(
        w[0] as f64 / 652.8,
        w[1] as f64 / 256.0 - 128.0,
        w[2] as f64 / 256.0 - 128.0,
    )
}

/// Encodes Lab into the v2 16-bit encoding, clamping to the legal range.
pub fn lab_to_encoded_v2(lab: &CieLab) -> [u16; 3] {
    let l = lab.l.clamp(0.0, 0xFFFF as f64 * 100.0 / 0xFF00 as f64);
    let ab_max = 65535.0 / 256.0 - 128.0;
    let a = lab.a.clamp(-128.0, ab_max);
    let b = lab.b.clamp(-128.0, ab_max);

    [
        quick_saturate_word(l * 652.8),
        quick_saturate_word((a + 128.0) * 256.0),
        quick_saturate_word((b + 128.0) * 256.0),
    ]
}

/// Decodes a 1.15 fixed-point XYZ triple.
pub fn encoded_to_xyz(w: [u16; 3]) -> CieXyz {
    CieXyz::new(
        w[0] as f64 / 32768.0,
        w[1] as f64 / 32768.0,
        w[2] as f64 / 32768.0,
    )
}

/// Encodes XYZ into 1.15 fixed point.
///
/// Non-positive luminance encodes as black; components are clamped to
/// `0..=MAX_ENCODEABLE_XYZ`.
pub fn xyz_to_encoded(xyz: &CieXyz) -> [u16; 3] {
    if xyz.y <= 0.0 {
        return [0, 0, 0];
    }
    let enc = |v: f64| quick_saturate_word(v.clamp(0.0, MAX_ENCODEABLE_XYZ) * 32768.0);
    [enc(xyz.x), enc(xyz.y), enc(xyz.z)]
}
