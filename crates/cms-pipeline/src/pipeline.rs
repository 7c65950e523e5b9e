//! Stage composition and evaluation.
//!
//! A [`Pipeline`] owns an ordered list of [`Stage`]s in which each stage's
//! input count equals its predecessor's output count. The pipeline's own
//! widths follow its first and last stage; the widths given to
//! [`Pipeline::new`] only describe the empty pipeline, and the first stage
//! inserted must accept its input width.
//!
//! Evaluation ping-pongs between two fixed-size stack buffers, so it never
//! allocates and a single pipeline can be shared across threads.
//!
//! # Example
//!
//! ```rust
//! use cms_core::Context;
//! use cms_pipeline::{factory, Pipeline, StageLoc};
//!
//! let ctx = Context::default();
//! let mut p = Pipeline::new(&ctx, 3, 3).unwrap();
//! p.insert_stage(StageLoc::End, factory::lab_v2_to_v4(&ctx).unwrap()).unwrap();
//! p.insert_stage(StageLoc::End, factory::lab_v4_to_v2(&ctx).unwrap()).unwrap();
//!
//! let mut out = [0u16; 3];
//! p.eval_u16(&[0x1234, 0x8000, 0xFF00], &mut out);
//! assert_eq!(out, [0x1234, 0x8000, 0xFF00]);
//! ```

use cms_core::fixed::{expand_8_to_16, quick_saturate_word, reduce_16_to_8};
use cms_core::{CmsError, CmsResult, Context, MAX_STAGE_CHANNELS};
use tracing::{debug, warn};

use crate::stage::{Stage, StageSignature};

/// Insertion or removal point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageLoc {
    /// Before the first stage.
    Begin,
    /// After the last stage.
    End,
}

/// An ordered chain of stages.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    input_channels: usize,
    output_channels: usize,
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    ///
    /// # Errors
    ///
    /// [`CmsError::InvalidChannels`] if either width reaches the context's
    /// channel limit.
    pub fn new(ctx: &Context, input_channels: usize, output_channels: usize) -> CmsResult<Self> {
        let max = ctx.config().max_stage_channels;
        if input_channels >= max || output_channels >= max {
            warn!(input_channels, output_channels, max, "rejected pipeline widths");
            return Err(CmsError::InvalidChannels(format!(
                "pipeline {input_channels} -> {output_channels} (limit {max})"
            )));
        }
        ctx.charge(std::mem::size_of::<Self>())?;
        Ok(Self {
            input_channels,
            output_channels,
            stages: Vec::new(),
        })
    }

    /// Input width.
    #[inline]
    pub fn input_channels(&self) -> usize {
        self.input_channels
    }

    /// Output width.
    #[inline]
    pub fn output_channels(&self) -> usize {
        self.output_channels
    }

    /// Number of stages.
    #[inline]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// True if the pipeline has no stages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stages in evaluation order.
    #[inline]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// First stage, if any.
    pub fn first_stage(&self) -> Option<&Stage> {
        self.stages.first()
    }

    /// Last stage, if any.
    pub fn last_stage(&self) -> Option<&Stage> {
        self.stages.last()
    }

    fn refresh_widths(&mut self) {
        if let (Some(first), Some(last)) = (self.stages.first(), self.stages.last()) {
            self.input_channels = first.input_channels();
            self.output_channels = last.output_channels();
        }
    }

    /// Inserts `stage` at either end.
    ///
    /// # Errors
    ///
    /// [`CmsError::ChannelMismatch`] if the stage does not connect to its
    /// neighbour (or, on an empty pipeline, to the declared input width).
    /// The pipeline is unchanged on error.
    pub fn insert_stage(&mut self, loc: StageLoc, stage: Stage) -> CmsResult<()> {
        let (expected, actual) = match (loc, self.stages.first(), self.stages.last()) {
            (_, None, _) => (self.input_channels, stage.input_channels()),
            (StageLoc::Begin, Some(first), _) => (first.input_channels(), stage.output_channels()),
            (StageLoc::End, _, Some(last)) => (last.output_channels(), stage.input_channels()),
            (StageLoc::End, _, None) => (self.input_channels, stage.input_channels()),
        };
        if expected != actual {
            warn!(?loc, expected, actual, signature = ?stage.implements(), "stage does not connect");
            return Err(CmsError::ChannelMismatch { expected, actual });
        }

        debug!(?loc, signature = ?stage.implements(), "insert stage");
        match loc {
            StageLoc::Begin => self.stages.insert(0, stage),
            StageLoc::End => self.stages.push(stage),
        }
        self.refresh_widths();
        Ok(())
    }

    /// Inserts `stage` after the last stage.
    pub fn append_stage(&mut self, stage: Stage) -> CmsResult<()> {
        self.insert_stage(StageLoc::End, stage)
    }

    /// Inserts `stage` before the first stage.
    pub fn prepend_stage(&mut self, stage: Stage) -> CmsResult<()> {
        self.insert_stage(StageLoc::Begin, stage)
    }

    /// Removes and returns the stage at either end.
    ///
    /// Removing the last remaining stage keeps the current widths.
    pub fn unlink_stage(&mut self, loc: StageLoc) -> Option<Stage> {
        let stage = match loc {
            StageLoc::Begin if !self.stages.is_empty() => Some(self.stages.remove(0)),
            StageLoc::Begin => None,
            StageLoc::End => self.stages.pop(),
        }?;
        self.refresh_widths();
        Some(stage)
    }

    /// Appends copies of every stage of `other`.
    ///
    /// When both pipelines are empty this one takes `other`'s widths; when
    /// only this one is empty it adopts `other`'s stages and widths.
    /// Curve data is shared with `other`; CLUT and matrix data is copied
    /// without being charged to a context.
    ///
    /// # Errors
    ///
    /// [`CmsError::ChannelMismatch`] if `other`'s input does not match this
    /// pipeline's output. The pipeline is unchanged on error.
    pub fn cat(&mut self, other: &Pipeline) -> CmsResult<()> {
        if self.stages.is_empty() {
            self.input_channels = other.input_channels;
            self.output_channels = other.output_channels;
            self.stages = other.stages.clone();
            debug!(stages = other.stages.len(), "cat into empty pipeline");
            return Ok(());
        }
        if other.stages.is_empty() {
            return Ok(());
        }

        if self.output_channels != other.input_channels {
            warn!(
                expected = self.output_channels,
                actual = other.input_channels,
                "pipelines do not connect"
            );
            return Err(CmsError::ChannelMismatch {
                expected: self.output_channels,
                actual: other.input_channels,
            });
        }

        self.stages.extend(other.stages.iter().cloned());
        self.refresh_widths();
        debug!(stages = self.stages.len(), "cat pipelines");
        Ok(())
    }

    /// Returns the stages if they implement exactly `pattern`, in order.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cms_core::Context;
    /// use cms_pipeline::{factory, Pipeline, StageSignature};
    ///
    /// let ctx = Context::default();
    /// let mut p = Pipeline::new(&ctx, 3, 3).unwrap();
    /// p.append_stage(factory::lab_to_xyz(&ctx).unwrap()).unwrap();
    ///
    /// assert!(p.check_and_retrieve_stages(&[StageSignature::LabToXyz]).is_some());
    /// assert!(p.check_and_retrieve_stages(&[StageSignature::XyzToLab]).is_none());
    /// ```
    pub fn check_and_retrieve_stages(&self, pattern: &[StageSignature]) -> Option<&[Stage]> {
        if pattern.len() != self.stages.len() {
            return None;
        }
        self.stages
            .iter()
            .zip(pattern)
            .all(|(stage, &sig)| stage.implements() == sig)
            .then_some(&self.stages[..])
    }

    /// Evaluates one float sample.
    ///
    /// An empty pipeline copies the channels both widths share and zeroes
    /// the rest.
    ///
    /// # Panics
    ///
    /// If `input` is shorter than [`input_channels`](Self::input_channels)
    /// or `output` shorter than [`output_channels`](Self::output_channels).
    pub fn eval_f32(&self, input: &[f32], output: &mut [f32]) {
        let output = &mut output[..self.output_channels];

        if self.stages.is_empty() {
            let shared = self.input_channels.min(self.output_channels);
            output[..shared].copy_from_slice(&input[..shared]);
            output[shared..].fill(0.0);
            return;
        }

        let mut storage = [[0.0f32; MAX_STAGE_CHANNELS]; 2];
        storage[0][..self.input_channels].copy_from_slice(&input[..self.input_channels]);

        let mut phase = 0;
        for stage in &self.stages {
            let [a, b] = &mut storage;
            let (src, dst) = if phase == 0 { (a, b) } else { (b, a) };
            stage.eval(&src[..], &mut dst[..]);
            phase ^= 1;
        }

        output.copy_from_slice(&storage[phase][..self.output_channels]);
    }

    /// Evaluates one 16-bit sample through the float path.
    ///
    /// Codes are scaled by 1/65535 on the way in and rounded with
    /// saturation on the way out.
    pub fn eval_u16(&self, input: &[u16], output: &mut [u16]) {
        let mut fin = [0.0f32; MAX_STAGE_CHANNELS];
        let mut fout = [0.0f32; MAX_STAGE_CHANNELS];

        for (f, &v) in fin.iter_mut().zip(&input[..self.input_channels]) {
            *f = v as f32 / 65535.0;
        }
        self.eval_f32(&fin, &mut fout);
        for (o, &f) in output[..self.output_channels].iter_mut().zip(&fout) {
            *o = quick_saturate_word(f as f64 * 65535.0);
        }
    }

    /// Evaluates one 8-bit sample through the 16-bit path.
    pub fn eval_u8(&self, input: &[u8], output: &mut [u8]) {
        let mut win = [0u16; MAX_STAGE_CHANNELS];
        let mut wout = [0u16; MAX_STAGE_CHANNELS];

        for (w, &v) in win.iter_mut().zip(&input[..self.input_channels]) {
            *w = expand_8_to_16(v);
        }
        self.eval_u16(&win, &mut wout);
        for (o, &w) in output[..self.output_channels].iter_mut().zip(&wout) {
            *o = reduce_16_to_8(w);
        }
    }
}
