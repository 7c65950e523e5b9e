//! CLUT storage and evaluation.

use cms_core::fixed::{cube_size, integer_pow, OVERFLOW_SENTINEL};
use cms_core::{CmsError, CmsResult, Context, MAX_INPUT_DIMENSIONS};
use tracing::debug;

use crate::interp::multilinear;

/// Node values, stored as 16-bit codes or floats.
#[derive(Debug, Clone, PartialEq)]
pub enum ClutTable {
    /// 16-bit codes, 0..=0xFFFF maps to 0.0..=1.0.
    U16(Vec<u16>),
    /// Float values, used as-is.
    F32(Vec<f32>),
}

impl ClutTable {
    /// Number of stored values (nodes times outputs).
    pub fn len(&self) -> usize {
        match self {
            Self::U16(t) => t.len(),
            Self::F32(t) => t.len(),
        }
    }

    /// True if the table holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A regular grid lookup table.
///
/// Immutable for evaluation; [`sample_u16`](Clut::sample_u16) and
/// [`sample_f32`](Clut::sample_f32) rewrite the node values in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Clut {
    pub(crate) grid_points: [u32; MAX_INPUT_DIMENSIONS],
    pub(crate) strides: [usize; MAX_INPUT_DIMENSIONS],
    pub(crate) input_channels: usize,
    pub(crate) output_channels: usize,
    pub(crate) table: ClutTable,
}

/// Validated shape: node count and table length.
struct Shape {
    nodes: usize,
    values: usize,
}

fn validate(ctx: &Context, grid_points: &[u32], output_channels: usize) -> CmsResult<Shape> {
    let config = ctx.config();
    let inputs = grid_points.len();

    if inputs == 0 || inputs > config.max_input_dimensions {
        return Err(CmsError::InvalidChannels(format!(
            "{inputs} input dimensions (max {})",
            config.max_input_dimensions
        )));
    }
    if output_channels == 0 || output_channels >= config.max_stage_channels {
        return Err(CmsError::InvalidChannels(format!(
            "{output_channels} output channels (limit {})",
            config.max_stage_channels
        )));
    }
    if let Some(&bad) = grid_points
        .iter()
        .find(|&&p| p < 2 || p > config.max_grid_points)
    {
        return Err(CmsError::InvalidGrid(format!(
            "{bad} grid points (range 2..={})",
            config.max_grid_points
        )));
    }

    let nodes = cube_size(grid_points);
    if nodes == 0 {
        return Err(CmsError::Overflow(format!("grid {grid_points:?}")));
    }
    let values = (nodes as usize)
        .checked_mul(output_channels)
        .ok_or_else(|| CmsError::Overflow(format!("{nodes} nodes x {output_channels}")))?;

    Ok(Shape {
        nodes: nodes as usize,
        values,
    })
}

fn strides_for(grid_points: &[u32], output_channels: usize) -> [usize; MAX_INPUT_DIMENSIONS] {
    let mut strides = [0usize; MAX_INPUT_DIMENSIONS];
    let mut step = output_channels;
    for d in (0..grid_points.len()).rev() {
        strides[d] = step;
        step *= grid_points[d] as usize;
    }
    strides
}

fn uniform_grid(
    ctx: &Context,
    points: u32,
    input_channels: usize,
    output_channels: usize,
) -> CmsResult<Vec<u32>> {
    if input_channels == 0 || input_channels > ctx.config().max_input_dimensions {
        return Err(CmsError::InvalidChannels(format!(
            "{input_channels} input dimensions"
        )));
    }
    let total = integer_pow(output_channels as u32, points, input_channels as u32);
    if total == OVERFLOW_SENTINEL {
        return Err(CmsError::Overflow(format!(
            "{points}^{input_channels} x {output_channels}"
        )));
    }
    Ok(vec![points; input_channels])
}

impl Clut {
    fn with_table(
        grid_points: &[u32],
        output_channels: usize,
        table: ClutTable,
    ) -> Self {
        let mut grid = [0u32; MAX_INPUT_DIMENSIONS];
        grid[..grid_points.len()].copy_from_slice(grid_points);
        Self {
            grid_points: grid,
            strides: strides_for(grid_points, output_channels),
            input_channels: grid_points.len(),
            output_channels,
            table,
        }
    }

    /// Creates a 16-bit CLUT with per-dimension node counts.
    ///
    /// `table`, if given, must hold exactly `nodes * output_channels`
    /// values; otherwise the table starts zeroed.
    ///
    /// # Errors
    ///
    /// - [`CmsError::InvalidChannels`] for 0 or too many dimensions/outputs
    /// - [`CmsError::InvalidGrid`] for a dimension outside `2..=max_grid_points`
    /// - [`CmsError::Overflow`] if the node count overflows
    /// - [`CmsError::TableMismatch`] if `table` has the wrong length
    pub fn new_u16(
        ctx: &Context,
        grid_points: &[u32],
        output_channels: usize,
        table: Option<&[u16]>,
    ) -> CmsResult<Self> {
        let shape = validate(ctx, grid_points, output_channels)?;
        let values = match table {
            Some(t) if t.len() != shape.values => {
                return Err(CmsError::TableMismatch(format!(
                    "expected {} values, got {}",
                    shape.values,
                    t.len()
                )));
            }
            Some(t) => ctx.alloc_from_slice(t)?,
            None => ctx.alloc_vec(shape.values, 0u16)?,
        };
        debug!(grid = ?grid_points, outputs = output_channels, nodes = shape.nodes, "16-bit CLUT");
        Ok(Self::with_table(grid_points, output_channels, ClutTable::U16(values)))
    }

    /// Creates a float CLUT with per-dimension node counts.
    ///
    /// Same rules as [`new_u16`](Self::new_u16).
    pub fn new_f32(
        ctx: &Context,
        grid_points: &[u32],
        output_channels: usize,
        table: Option<&[f32]>,
    ) -> CmsResult<Self> {
        let shape = validate(ctx, grid_points, output_channels)?;
        let values = match table {
            Some(t) if t.len() != shape.values => {
                return Err(CmsError::TableMismatch(format!(
                    "expected {} values, got {}",
                    shape.values,
                    t.len()
                )));
            }
            Some(t) => ctx.alloc_from_slice(t)?,
            None => ctx.alloc_vec(shape.values, 0.0f32)?,
        };
        debug!(grid = ?grid_points, outputs = output_channels, nodes = shape.nodes, "float CLUT");
        Ok(Self::with_table(grid_points, output_channels, ClutTable::F32(values)))
    }

    /// Creates a 16-bit CLUT with the same node count on every dimension.
    pub fn uniform_u16(
        ctx: &Context,
        points: u32,
        input_channels: usize,
        output_channels: usize,
        table: Option<&[u16]>,
    ) -> CmsResult<Self> {
        let grid = uniform_grid(ctx, points, input_channels, output_channels)?;
        Self::new_u16(ctx, &grid, output_channels, table)
    }

    /// Creates a float CLUT with the same node count on every dimension.
    pub fn uniform_f32(
        ctx: &Context,
        points: u32,
        input_channels: usize,
        output_channels: usize,
        table: Option<&[f32]>,
    ) -> CmsResult<Self> {
        let grid = uniform_grid(ctx, points, input_channels, output_channels)?;
        Self::new_f32(ctx, &grid, output_channels, table)
    }

    /// Node count along each input dimension.
    #[inline]
    pub fn grid_points(&self) -> &[u32] {
        &self.grid_points[..self.input_channels]
    }

    /// Number of input dimensions.
    #[inline]
    pub fn input_channels(&self) -> usize {
        self.input_channels
    }

    /// Values stored per node.
    #[inline]
    pub fn output_channels(&self) -> usize {
        self.output_channels
    }

    /// Total number of grid nodes.
    pub fn node_count(&self) -> usize {
        self.table.len() / self.output_channels
    }

    /// Node values.
    #[inline]
    pub fn table(&self) -> &ClutTable {
        &self.table
    }

    /// True if node values are 16-bit codes.
    pub fn is_u16(&self) -> bool {
        matches!(self.table, ClutTable::U16(_))
    }

    /// Multilinear lookup.
    ///
    /// Inputs are clamped to [0, 1] (NaN reads as 0). 16-bit node values are
    /// scaled to [0, 1]; float values are interpolated unscaled.
    pub fn eval_f32(&self, input: &[f32], output: &mut [f32]) {
        let grid = self.grid_points();
        let strides = &self.strides[..self.input_channels];
        let input = &input[..self.input_channels];
        let output = &mut output[..self.output_channels];

        match &self.table {
            ClutTable::U16(t) => {
                multilinear(grid, strides, input, output, |i| t[i] as f64 / 65535.0)
            }
            ClutTable::F32(t) => multilinear(grid, strides, input, output, |i| t[i] as f64),
        }
    }
}
