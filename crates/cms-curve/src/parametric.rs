//! Parametric curve catalogue.
//!
//! Closed set of formulas identified by integer type. Positive identifiers
//! evaluate the forward formula, negative identifiers its inverse. Every
//! formula is evaluated in double precision.
//!
//! Degenerate parameters (a zero slope or exponent where the inverse would
//! divide by it) evaluate to 0 rather than infinity or NaN, except for the
//! inverse of type 1 with a zero exponent.

/// Tolerance below which a parameter is treated as zero.
const DET_TOLERANCE: f64 = 0.0001;

/// Known curve types and their parameter counts.
const CATALOGUE: &[(i32, usize)] = &[
    (1, 1),
    (2, 3),
    (3, 4),
    (4, 5),
    (5, 7),
    (6, 4),
    (7, 5),
    (8, 5),
    (108, 1),
    (109, 1),
];

/// Number of parameters taken by `curve_type`, or `None` if unknown.
///
/// Inverse types share the arity of their forward formula.
///
/// # Example
///
/// ```rust
/// use cms_curve::parameter_count;
///
/// assert_eq!(parameter_count(4), Some(5));
/// assert_eq!(parameter_count(-4), Some(5));
/// assert_eq!(parameter_count(42), None);
/// ```
pub fn parameter_count(curve_type: i32) -> Option<usize> {
    let abs = curve_type.checked_abs()?;
    CATALOGUE
        .iter()
        .find(|(t, _)| *t == abs)
        .map(|&(_, n)| n)
}

#[inline]
fn near_zero(v: f64) -> bool {
    v.abs() < DET_TOLERANCE
}

fn sigmoid_base(k: f64, t: f64) -> f64 {
    (1.0 / (1.0 + (-k * t).exp())) - 0.5
}

fn inverted_sigmoid_base(k: f64, t: f64) -> f64 {
    -((1.0 / (t + 0.5)) - 1.0).ln() / k
}

fn sigmoid(k: f64, t: f64) -> f64 {
    let correction = 0.5 / sigmoid_base(k, 1.0);
    correction * sigmoid_base(k, 2.0 * t - 1.0) + 0.5
}

fn inverse_sigmoid(k: f64, t: f64) -> f64 {
    let correction = 0.5 / sigmoid_base(k, 1.0);
    (inverted_sigmoid_base(k, (t - 0.5) / correction) + 1.0) / 2.0
}

/// Evaluates a catalogue formula at `x`.
///
/// `params` must hold at least [`parameter_count`] values; callers are
/// expected to have validated the type with it. Unknown types evaluate to 0.
#[allow(clippy::many_single_char_names)]
pub fn eval_parametric(curve_type: i32, params: &[f64], x: f64) -> f64 {
    let p = params;

    match curve_type {
        // Y = X ^ g
        1 => {
            if x <= 0.0 {
                if x < 0.0 && near_zero(p[0] - 1.0) { x } else { 0.0 }
            } else {
                x.powf(p[0])
            }
        }
        // X = Y ^ (1/g)
        -1 => {
            if x <= 0.0 {
                if x < 0.0 && near_zero(p[0] - 1.0) { x } else { 0.0 }
            } else if near_zero(p[0]) {
                f64::INFINITY
            } else {
                x.powf(1.0 / p[0])
            }
        }
        2 => {
            if near_zero(p[1]) {
                return 0.0;
            }
            let disc = -p[2] / p[1];
            if x >= disc {
                let e = p[1] * x + p[2];
                if e > 0.0 { e.powf(p[0]) } else { 0.0 }
            } else {
                0.0
            }
        }
        -2 => {
            if near_zero(p[0]) || near_zero(p[1]) || x < 0.0 {
                return 0.0;
            }
            ((x.powf(1.0 / p[0]) - p[2]) / p[1]).max(0.0)
        }
        3 => {
            if near_zero(p[1]) {
                return 0.0;
            }
            let disc = (-p[2] / p[1]).max(0.0);
            if x >= disc {
                let e = p[1] * x + p[2];
                if e > 0.0 { e.powf(p[0]) + p[3] } else { 0.0 }
            } else {
                p[3]
            }
        }
        -3 => {
            if near_zero(p[0]) || near_zero(p[1]) {
                return 0.0;
            }
            if x >= p[3] {
                let e = x - p[3];
                if e > 0.0 { (e.powf(1.0 / p[0]) - p[2]) / p[1] } else { 0.0 }
            } else {
                -p[2] / p[1]
            }
        }
        4 => {
            if x >= p[4] {
                let e = p[1] * x + p[2];
                if e > 0.0 { e.powf(p[0]) } else { 0.0 }
            } else {
                x * p[3]
            }
        }
        -4 => {
            let e = p[1] * p[4] + p[2];
            let disc = if e < 0.0 { 0.0 } else { e.powf(p[0]) };
            if x >= disc {
                if near_zero(p[0]) || near_zero(p[1]) {
                    0.0
                } else {
                    (x.powf(1.0 / p[0]) - p[2]) / p[1]
                }
            } else if near_zero(p[3]) {
                0.0
            } else {
                x / p[3]
            }
        }
        5 => {
            if x >= p[4] {
                let e = p[1] * x + p[2];
                if e > 0.0 { e.powf(p[0]) + p[5] } else { p[5] }
            } else {
                x * p[3] + p[6]
            }
        }
        -5 => {
            let disc = p[3] * p[4] + p[6];
            if x >= disc {
                let e = x - p[5];
                if e < 0.0 || near_zero(p[0]) || near_zero(p[1]) {
                    0.0
                } else {
                    (e.powf(1.0 / p[0]) - p[2]) / p[1]
                }
            } else if near_zero(p[3]) {
                0.0
            } else {
                (x - p[6]) / p[3]
            }
        }
        6 => {
            let e = p[1] * x + p[2];
            // Unit gamma is a plain line, no clamping
            if p[0] == 1.0 {
                e + p[3]
            } else if e < 0.0 {
                p[3]
            } else {
                e.powf(p[0]) + p[3]
            }
        }
        -6 => {
            if near_zero(p[0]) || near_zero(p[1]) {
                return 0.0;
            }
            let e = x - p[3];
            if e < 0.0 { 0.0 } else { (e.powf(1.0 / p[0]) - p[2]) / p[1] }
        }
        7 => {
            let e = p[2] * x.powf(p[0]) + p[3];
            if e <= 0.0 { p[4] } else { p[1] * e.log10() + p[4] }
        }
        -7 => {
            if near_zero(p[0]) || near_zero(p[1]) || near_zero(p[2]) {
                return 0.0;
            }
            ((10f64.powf((x - p[4]) / p[1]) - p[3]) / p[2]).powf(1.0 / p[0])
        }
        8 => p[0] * p[1].powf(p[2] * x + p[3]) + p[4],
        -8 => {
            let disc = x - p[4];
            if disc < 0.0 || near_zero(p[0]) || near_zero(p[2]) {
                return 0.0;
            }
            ((disc / p[0]).ln() / p[1].ln() - p[3]) / p[2]
        }
        108 => {
            if near_zero(p[0]) {
                return 0.0;
            }
            (1.0 - (1.0 - x).powf(1.0 / p[0])).powf(1.0 / p[0])
        }
        -108 => 1.0 - (1.0 - x.powf(p[0])).powf(p[0]),
        109 => sigmoid(p[0], x),
        -109 => inverse_sigmoid(p[0], x),
        _ => 0.0,
    }
}
