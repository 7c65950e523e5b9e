//! Numeric helpers shared by every stage.
//!
//! - [`integer_pow`] / [`cube_size`] - grid sizes without silent overflow
//! - [`align_word`] / [`align_ptr`] - bitmask rounding for buffer layout
//! - [`expand_8_to_16`] / [`reduce_16_to_8`] - exact 8-bit <-> 16-bit scaling
//! - [`quick_saturate_word`] / [`quantize_val`] - float to 16-bit codes
//! - 16.16 fixed-point interpolation ([`to_fixed_domain`], [`linear_interp_u16`])
//!
//! # Example
//!
//! ```rust
//! use cms_core::fixed::{integer_pow, OVERFLOW_SENTINEL};
//!
//! assert_eq!(integer_pow(1, 2, 10), 1024);
//! assert_eq!(integer_pow(2, 2, 32), OVERFLOW_SENTINEL);
//! ```

/// Value returned by [`integer_pow`] when the result does not fit in `u32`.
///
/// A genuine result of `u32::MAX` is indistinguishable from overflow.
pub const OVERFLOW_SENTINEL: u32 = u32::MAX;

/// Computes `n * base^exponent`, saturating to [`OVERFLOW_SENTINEL`].
///
/// Overflow is detected before each multiply by `base`, and the final
/// multiply by `n` is verified by division. Returns 0 when either `n` or
/// `base` is 0.
///
/// Used to size CLUT tables: `integer_pow(outputs, grid_points, inputs)`.
pub fn integer_pow(n: u32, base: u32, exponent: u32) -> u32 {
    if base == 0 || n == 0 {
        return 0;
    }

    let mut partial: u32 = 1;
    for _ in 0..exponent {
        if partial > u32::MAX / base {
            return OVERFLOW_SENTINEL;
        }
        partial *= base;
    }

    let result = partial.wrapping_mul(n);
    if partial != result / n {
        return OVERFLOW_SENTINEL;
    }
    result
}

/// Number of nodes in a grid with the given per-dimension point counts.
///
/// Returns 0 when any dimension has fewer than 2 points or the product
/// would overflow `u32`.
pub fn cube_size(grid_points: &[u32]) -> u32 {
    let mut total: u32 = 1;
    for &dim in grid_points.iter().rev() {
        if dim <= 1 {
            return 0;
        }
        if total > u32::MAX / dim {
            return 0;
        }
        total *= dim;
    }
    total
}

/// Rounds `x` up to the next multiple of 4 bytes.
#[inline]
pub const fn align_word(x: usize) -> usize {
    (x + 3) & !3
}

/// Rounds `x` up to the next multiple of the platform pointer width.
#[inline]
pub const fn align_ptr(x: usize) -> usize {
    const K: usize = std::mem::size_of::<*const ()>();
    (x + (K - 1)) & !(K - 1)
}

/// Replicates an 8-bit intensity into 16 bits: 0 -> 0, 0xFF -> 0xFFFF.
#[inline]
pub const fn expand_8_to_16(v: u8) -> u16 {
    ((v as u16) << 8) | v as u16
}

/// Rounds a 16-bit intensity to 8 bits.
///
/// Exact inverse of [`expand_8_to_16`] on its image, correctly rounded
/// everywhere else.
#[inline]
pub const fn reduce_16_to_8(v: u16) -> u8 {
    (((v as u32 * 65281 + 8388608) >> 24) & 0xFF) as u8
}

/// Rounds a double to the nearest 16-bit code, clamping to `0..=0xFFFF`.
///
/// NaN maps to 0.
#[inline]
pub fn quick_saturate_word(d: f64) -> u16 {
    let d = d + 0.5;
    if d <= 0.0 {
        return 0;
    }
    if d >= 65535.0 {
        return 0xFFFF;
    }
    d.floor() as u16
}

/// Maps node `i` of a `max_samples`-point axis to its 16-bit code.
///
/// `max_samples` must be at least 2.
#[inline]
pub fn quantize_val(i: f64, max_samples: u32) -> u16 {
    let x = (i * 65535.0) / (max_samples - 1) as f64;
    quick_saturate_word(x)
}

/// Converts `a` (an index scaled by 0xFFFF) into the 16.16 fixed domain.
///
/// Widened to `i64` so tables longer than 0x8000 entries cannot overflow.
#[inline]
pub const fn to_fixed_domain(a: i64) -> i64 {
    a + ((a + 0x7fff) / 0xffff)
}

/// Integer part of a 16.16 fixed-point value.
#[inline]
pub const fn fixed_to_int(x: i64) -> i64 {
    x >> 16
}

/// Fractional part of a 16.16 fixed-point value, as 0..=0xFFFF.
#[inline]
pub const fn fixed_rest_to_int(x: i64) -> i64 {
    x & 0xFFFF
}

/// Interpolates between `lo` and `hi` by the 16-bit fraction `a`.
#[inline]
pub fn linear_interp_u16(a: i64, lo: i32, hi: i32) -> u16 {
    let dif = ((hi - lo) as i64 * a + 0x8000) >> 16;
    (dif + lo as i64) as u16
}
