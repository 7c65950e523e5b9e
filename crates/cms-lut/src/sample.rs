//! Grid sampling.
//!
//! Visits every node of a grid in storage order (last dimension fastest)
//! and hands a callback the node's input coordinates. With a [`Clut`] the
//! callback also receives the node's current outputs and may rewrite them.
//!
//! # Example
//!
//! ```rust
//! use cms_lut::slice_space_u16;
//!
//! let mut nodes = Vec::new();
//! slice_space_u16(&[2, 3], |input| {
//!     nodes.push(input.to_vec());
//!     true
//! })
//! .unwrap();
//!
//! assert_eq!(nodes[0], vec![0, 0]);
//! assert_eq!(nodes[1], vec![0, 0x8000]);
//! assert_eq!(nodes[5], vec![0xFFFF, 0xFFFF]);
//! ```

use cms_core::fixed::{cube_size, quantize_val};
use cms_core::{CmsError, CmsResult, MAX_INPUT_DIMENSIONS, MAX_STAGE_CHANNELS};
use tracing::{debug, warn};

use crate::clut::{Clut, ClutTable};

/// How a sampler's outputs are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleMode {
    /// Outputs are written back into the table.
    #[default]
    Write,
    /// Outputs are discarded; the table is left untouched.
    Inspect,
}

/// Writes the 16-bit coordinates of `node` into `coords`.
fn node_coordinates(node: usize, grid_points: &[u32], coords: &mut [u16]) {
    let mut rest = node;
    for d in (0..grid_points.len()).rev() {
        let points = grid_points[d] as usize;
        let colorant = rest % points;
        rest /= points;
        coords[d] = quantize_val(colorant as f64, grid_points[d]);
    }
}

fn check_grid(grid_points: &[u32]) -> CmsResult<usize> {
    if grid_points.is_empty() || grid_points.len() > MAX_INPUT_DIMENSIONS {
        return Err(CmsError::InvalidChannels(format!(
            "{} input dimensions",
            grid_points.len()
        )));
    }
    match cube_size(grid_points) {
        0 => Err(CmsError::InvalidGrid(format!("{grid_points:?}"))),
        n => Ok(n as usize),
    }
}

fn sampler_failed(node: usize) -> CmsError {
    warn!(node, "sampler aborted, table left unchanged");
    CmsError::SamplerFailed { node }
}

/// Fills or inspects a table through `sampler`.
///
/// Generic over the node value type; `to_input` turns a 16-bit coordinate
/// into the sampler's input type.
fn sample_table<T, F>(
    grid_points: &[u32],
    outputs: usize,
    table: &mut Vec<T>,
    mode: SampleMode,
    to_input: fn(u16) -> T,
    mut sampler: F,
) -> CmsResult<()>
where
    T: Copy + Default,
    F: FnMut(&[T], &mut [T]) -> bool,
{
    let inputs = grid_points.len();
    let nodes = table.len() / outputs;

    let mut coords = [0u16; MAX_INPUT_DIMENSIONS];
    let mut input = [T::default(); MAX_INPUT_DIMENSIONS];
    let mut output = [T::default(); MAX_STAGE_CHANNELS];

    // Writes land in a scratch copy so a failing sampler leaves the table intact
    let mut scratch = match mode {
        SampleMode::Write => Some(table.clone()),
        SampleMode::Inspect => None,
    };

    for node in 0..nodes {
        node_coordinates(node, grid_points, &mut coords);
        for (dst, &c) in input[..inputs].iter_mut().zip(&coords[..inputs]) {
            *dst = to_input(c);
        }

        let index = node * outputs;
        output[..outputs].copy_from_slice(&table[index..index + outputs]);

        if !sampler(&input[..inputs], &mut output[..outputs]) {
            return Err(sampler_failed(node));
        }

        if let Some(s) = scratch.as_mut() {
            s[index..index + outputs].copy_from_slice(&output[..outputs]);
        }
    }

    if let Some(s) = scratch {
        *table = s;
    }
    debug!(nodes, ?mode, "sampled CLUT");
    Ok(())
}

impl Clut {
    /// Runs `sampler` over every node of a 16-bit table.
    ///
    /// The sampler gets the node's input coordinates as 16-bit codes and its
    /// current outputs, which it may overwrite. In [`SampleMode::Write`] the
    /// outputs are stored; in [`SampleMode::Inspect`] they are dropped.
    ///
    /// # Errors
    ///
    /// - [`CmsError::TableMismatch`] if the table holds floats
    /// - [`CmsError::SamplerFailed`] if `sampler` returns false; nothing is
    ///   written in that case
    pub fn sample_u16<F>(&mut self, mode: SampleMode, sampler: F) -> CmsResult<()>
    where
        F: FnMut(&[u16], &mut [u16]) -> bool,
    {
        let grid = self.grid_points;
        let inputs = self.input_channels;
        let outputs = self.output_channels;
        match &mut self.table {
            ClutTable::U16(t) => sample_table(&grid[..inputs], outputs, t, mode, |c| c, sampler),
            ClutTable::F32(_) => Err(CmsError::TableMismatch(
                "16-bit sampler on a float CLUT".into(),
            )),
        }
    }

    /// Runs `sampler` over every node of a float table.
    ///
    /// Input coordinates are the 16-bit node codes divided by 65535.
    ///
    /// # Errors
    ///
    /// As [`sample_u16`](Self::sample_u16), with the representations swapped.
    pub fn sample_f32<F>(&mut self, mode: SampleMode, sampler: F) -> CmsResult<()>
    where
        F: FnMut(&[f32], &mut [f32]) -> bool,
    {
        let grid = self.grid_points;
        let inputs = self.input_channels;
        let outputs = self.output_channels;
        match &mut self.table {
            ClutTable::F32(t) => sample_table(
                &grid[..inputs],
                outputs,
                t,
                mode,
                |c| (c as f64 / 65535.0) as f32,
                sampler,
            ),
            ClutTable::U16(_) => Err(CmsError::TableMismatch(
                "float sampler on a 16-bit CLUT".into(),
            )),
        }
    }
}

/// Visits every node of a grid without a table.
///
/// # Errors
///
/// - [`CmsError::InvalidChannels`] for 0 or more than 15 dimensions
/// - [`CmsError::InvalidGrid`] for a dimension under 2 points or an
///   overflowing node count
/// - [`CmsError::SamplerFailed`] if `sampler` returns false
pub fn slice_space_u16<F>(grid_points: &[u32], mut sampler: F) -> CmsResult<()>
where
    F: FnMut(&[u16]) -> bool,
{
    let nodes = check_grid(grid_points)?;
    let mut coords = [0u16; MAX_INPUT_DIMENSIONS];
    let inputs = grid_points.len();

    for node in 0..nodes {
        node_coordinates(node, grid_points, &mut coords);
        if !sampler(&coords[..inputs]) {
            return Err(sampler_failed(node));
        }
    }
    Ok(())
}

/// Float variant of [`slice_space_u16`].
pub fn slice_space_f32<F>(grid_points: &[u32], mut sampler: F) -> CmsResult<()>
where
    F: FnMut(&[f32]) -> bool,
{
    let nodes = check_grid(grid_points)?;
    let mut coords = [0u16; MAX_INPUT_DIMENSIONS];
    let mut input = [0.0f32; MAX_INPUT_DIMENSIONS];
    let inputs = grid_points.len();

    for node in 0..nodes {
        node_coordinates(node, grid_points, &mut coords);
        for (dst, &c) in input[..inputs].iter_mut().zip(&coords[..inputs]) {
            *dst = (c as f64 / 65535.0) as f32;
        }
        if !sampler(&input[..inputs]) {
            return Err(sampler_failed(node));
        }
    }
    Ok(())
}
