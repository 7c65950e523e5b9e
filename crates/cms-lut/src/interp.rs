//! Multilinear interpolation over a regular grid.

use cms_core::MAX_INPUT_DIMENSIONS;

/// Clamps a sample to [0, 1]; NaN and tiny values read as 0.
#[inline]
pub(crate) fn clamp_unit(v: f32) -> f64 {
    if v.is_nan() || v < 1.0e-9 {
        0.0
    } else if v > 1.0 {
        1.0
    } else {
        v as f64
    }
}

/// Interpolates between the `2^n` nodes surrounding `input`.
///
/// `strides[d]` is the element distance between neighbouring nodes along
/// dimension `d`; `fetch(i)` returns table element `i` as a double.
pub(crate) fn multilinear<F>(
    grid_points: &[u32],
    strides: &[usize],
    input: &[f32],
    output: &mut [f32],
    fetch: F,
) where
    F: Fn(usize) -> f64,
{
    let dims = grid_points.len();
    let mut frac = [0.0f64; MAX_INPUT_DIMENSIONS];
    let mut base = 0usize;

    for d in 0..dims {
        let domain = (grid_points[d] - 1) as f64;
        let pos = clamp_unit(input[d]) * domain;
        let cell = (pos.floor() as usize).min(grid_points[d] as usize - 2);
        frac[d] = pos - cell as f64;
        base += cell * strides[d];
    }

    let mut acc = [0.0f64; cms_core::MAX_STAGE_CHANNELS];
    let acc = &mut acc[..output.len()];

    for corner in 0..(1usize << dims) {
        let mut weight = 1.0;
        let mut offset = base;
        for d in 0..dims {
            if (corner >> d) & 1 == 1 {
                weight *= frac[d];
                offset += strides[d];
            } else {
                weight *= 1.0 - frac[d];
            }
        }
        if weight == 0.0 {
            continue;
        }
        for (o, a) in acc.iter_mut().enumerate() {
            *a += weight * fetch(offset + o);
        }
    }

    for (out, a) in output.iter_mut().zip(acc.iter()) {
        *out = *a as f32;
    }
}
