use crate::dct::DctBasis;
use crate::frame::{Channel, PlaneBand};
use crate::quant::{Quantizer, RoundingPolicy};

/// Working state for one `S`×`S` block of a frame.
///
/// A block is created for a single pass: it copies its rectangle out of a
/// [`PlaneBand`], goes through forward transform, quantization and inverse
/// transform, and writes the reconstruction back into the same rectangle.
/// The three grids hold spatial samples before [`Block::forward`] and
/// coefficients after it.
pub struct Block {
    size: usize,
    /// Block column within the frame's block grid.
    bx: usize,
    grids: [Vec<f64>; 3],
    scratch: Vec<f64>,
    out: Vec<f64>,
}

impl Block {
    /// Copy block column `bx` out of `band`. The band must be exactly `size` rows tall.
    pub fn load(band: &PlaneBand<'_>, bx: usize, size: usize) -> Self {
        let n = size * size;
        let mut grids = [vec![0.0; n], vec![0.0; n], vec![0.0; n]];
        let x0 = bx * size;
        for ch in Channel::ALL {
            let grid = &mut grids[ch.index()];
            for ly in 0..size {
                for lx in 0..size {
                    grid[ly * size + lx] = band.get(ch, x0 + lx, ly);
                }
            }
        }
        Self {
            size,
            bx,
            grids,
            scratch: vec![0.0; n],
            out: vec![0.0; n],
        }
    }

    /// Build a block straight from three row-major grids.
    pub fn from_grids(size: usize, grids: [Vec<f64>; 3]) -> Self {
        let n = size * size;
        debug_assert!(grids.iter().all(|g| g.len() == n));
        Self {
            size,
            bx: 0,
            grids,
            scratch: vec![0.0; n],
            out: vec![0.0; n],
        }
    }

    #[inline]
    pub fn grid(&self, channel: Channel) -> &[f64] {
        &self.grids[channel.index()]
    }

    pub fn forward(&mut self, basis: &DctBasis) {
        for grid in self.grids.iter_mut() {
            basis.forward(grid.as_slice(), &mut self.out, &mut self.scratch);
            std::mem::swap(grid, &mut self.out);
        }
    }

    pub fn quantize(&mut self, quantizer: &Quantizer) {
        for ch in Channel::ALL {
            quantizer.apply(ch, &mut self.grids[ch.index()]);
        }
    }

    pub fn inverse(&mut self, basis: &DctBasis) {
        for grid in self.grids.iter_mut() {
            basis.inverse(grid.as_slice(), &mut self.out, &mut self.scratch);
            std::mem::swap(grid, &mut self.out);
        }
    }

    pub fn round(&mut self, rounding: RoundingPolicy) {
        for grid in self.grids.iter_mut() {
            grid.iter_mut().for_each(|s| *s = rounding.apply(*s));
        }
    }

    /// Copy the grids back into the block's rectangle of `band`, clamping
    /// every sample.
    pub fn store(&self, band: &mut PlaneBand<'_>) {
        let x0 = self.bx * self.size;
        for ch in Channel::ALL {
            let grid = &self.grids[ch.index()];
            for ly in 0..self.size {
                for lx in 0..self.size {
                    band.set(ch, x0 + lx, ly, grid[ly * self.size + lx]);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;

    #[test]
    fn load_and_store_touch_only_the_block_rectangle() {
        let rgb: Vec<u8> = (0..6 * 2 * 3).map(|i| i as u8).collect();
        let mut frame = Frame::from_rgb8(6, 2, &rgb).unwrap();
        let before = frame.clone();
        {
            let mut bands = frame.bands_mut(2);
            let mut block = Block::load(&bands[0], 1, 2);
            assert_eq!(block.grid(Channel::Red), &[6.0, 9.0, 24.0, 27.0]);
            block.grids = [vec![1.0; 4], vec![2.0; 4], vec![3.0; 4]];
            block.store(&mut bands[0]);
        }
        for y in 0..2 {
            for x in 0..6 {
                let expected = if (2..4).contains(&x) {
                    [1, 2, 3]
                } else {
                    before.pixel_rgb8(x, y).unwrap()
                };
                assert_eq!(frame.pixel_rgb8(x, y).unwrap(), expected, "({x}, {y})");
            }
        }
    }

    #[test]
    fn coefficients_are_visible_after_forward() {
        let basis = DctBasis::new(4);
        let mut block = Block::from_grids(4, [vec![10.0; 16], vec![20.0; 16], vec![0.0; 16]]);
        block.forward(&basis);
        assert!((block.grid(Channel::Red)[0] - 40.0).abs() < 1e-9);
        assert!((block.grid(Channel::Green)[0] - 80.0).abs() < 1e-9);
        assert!(block.grid(Channel::Blue).iter().all(|c| c.abs() < 1e-12));
    }
}
