use std::sync::OnceLock;

use log::debug;
use rayon::prelude::*;

use crate::block::Block;
use crate::dct::DctBasis;
use crate::error::{Error, Result};
use crate::frame::{Frame, PlaneBand};
use crate::quant::{Quantizer, RoundingPolicy};

/// What a transform pass covered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformStats {
    pub blocks_x: usize,
    pub blocks_y: usize,
    /// Columns at the right edge left untouched (`W mod S`).
    pub skipped_columns: usize,
    /// Rows at the bottom edge left untouched (`H mod S`).
    pub skipped_rows: usize,
}

impl TransformStats {
    #[inline]
    pub fn blocks(&self) -> usize {
        self.blocks_x * self.blocks_y
    }
}

/// Lossy in-place block transform over a [`Frame`].
///
/// The frame is cut into a `floor(W/S)` × `floor(H/S)` grid of `S`×`S`
/// blocks visited in row-major order. Each block is transformed,
/// quantized, inverse transformed, rounded, and written back. Pixels past
/// the last full block column or row are never read or written.
///
/// Blocks never overlap, so the pass can run one band of block rows per
/// worker; the output is the same either way.
///
/// The cosine basis is built on first use, so a block size larger than the
/// frame costs nothing and leaves the frame untouched.
#[derive(Debug, Clone)]
pub struct BlockTransformer {
    block_size: usize,
    basis: OnceLock<DctBasis>,
    quantizer: Quantizer,
    rounding: RoundingPolicy,
    parallel: bool,
}

impl BlockTransformer {
    pub fn new(block_size: usize, quantizer: Quantizer, rounding: RoundingPolicy) -> Result<Self> {
        if block_size == 0 {
            return Err(Error::InvalidBlockSize(block_size));
        }
        Ok(Self {
            block_size,
            basis: OnceLock::new(),
            quantizer,
            rounding,
            parallel: false,
        })
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    fn basis(&self) -> &DctBasis {
        self.basis.get_or_init(|| DctBasis::new(self.block_size))
    }

    /// Block grid dimensions for a `width` × `height` frame.
    pub fn plan(&self, width: usize, height: usize) -> TransformStats {
        let s = self.block_size();
        TransformStats {
            blocks_x: width / s,
            blocks_y: height / s,
            skipped_columns: width % s,
            skipped_rows: height % s,
        }
    }

    /// Run one compression pass over `frame`.
    pub fn run(&self, frame: &mut Frame) -> TransformStats {
        let plan = self.plan(frame.width(), frame.height());
        debug!(
            "transform: {}x{} frame, block {} -> {}x{} blocks ({} cols, {} rows untouched)",
            frame.width(),
            frame.height(),
            self.block_size(),
            plan.blocks_x,
            plan.blocks_y,
            plan.skipped_columns,
            plan.skipped_rows
        );

        if plan.blocks() == 0 {
            return plan;
        }

        let bands = frame.bands_mut(self.block_size());
        let processed: usize = if self.parallel {
            bands
                .into_par_iter()
                .map(|mut band| self.process_band(&mut band, plan.blocks_x))
                .sum()
        } else {
            bands
                .into_iter()
                .map(|mut band| self.process_band(&mut band, plan.blocks_x))
                .sum()
        };
        debug_assert_eq!(processed, plan.blocks());
        debug!("transform: processed {processed} blocks");
        plan
    }

    fn process_band(&self, band: &mut PlaneBand<'_>, blocks_x: usize) -> usize {
        for bx in 0..blocks_x {
            let mut block = Block::load(band, bx, self.block_size());
            self.process_block(&mut block);
            block.store(band);
        }
        blocks_x
    }

    /// Forward, quantize, inverse, round: one block's full cycle.
    pub fn process_block(&self, block: &mut Block) {
        let basis = self.basis();
        block.forward(basis);
        block.quantize(&self.quantizer);
        block.inverse(basis);
        block.round(self.rounding);
    }
}
