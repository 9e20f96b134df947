//! Orthonormal type-II DCT over square `S`×`S` blocks.
//!
//! Spatial blocks are row-major: sample `f(x, y)` lives at `y * S + x`.
//! Coefficient grids are indexed by horizontal frequency first:
//! `F(u, v)` (horizontal `u`, vertical `v`) lives at `u * S + v`, so walking
//! a coefficient grid in raster order steps through `v` fastest.
//!
//! The 2D transform is computed as two 1D passes against a precomputed
//! basis, which is O(S³) per block instead of the O(S⁴) direct sum and
//! gives the same result up to floating-point rounding.

use std::f64::consts::PI;

/// Precomputed scaled cosine basis for one block size.
///
/// `basis[k * S + n] = α(k) · cos((2n + 1)kπ / 2S)` with `α(0) = √(1/S)` and
/// `α(k > 0) = √(2/S)`. The matrix is orthogonal, so the inverse transform
/// uses its transpose.
#[derive(Debug, Clone)]
pub struct DctBasis {
    size: usize,
    basis: Vec<f64>,
}

/// Normalization factor α(k) for block size `size`.
#[inline]
pub fn alpha(k: usize, size: usize) -> f64 {
    if k == 0 {
        (1.0 / size as f64).sqrt()
    } else {
        (2.0 / size as f64).sqrt()
    }
}

impl DctBasis {
    pub fn new(size: usize) -> Self {
        let two_s = 2.0 * size as f64;
        let mut basis = vec![0.0; size * size];
        for k in 0..size {
            let a = alpha(k, size);
            for n in 0..size {
                basis[k * size + n] = a * (((2 * n + 1) * k) as f64 * PI / two_s).cos();
            }
        }
        Self { size, basis }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn c(&self, k: usize, n: usize) -> f64 {
        self.basis[k * self.size + n]
    }

    /// Forward transform of `block` into `out`. `scratch` must hold `S * S` values.
    pub fn forward(&self, block: &[f64], out: &mut [f64], scratch: &mut [f64]) {
        let s = self.size;
        debug_assert_eq!(block.len(), s * s);
        debug_assert_eq!(out.len(), s * s);

        // Rows: scratch[y][u] = Σx f[y][x] · C[u][x]
        for y in 0..s {
            let row = &block[y * s..(y + 1) * s];
            for u in 0..s {
                scratch[y * s + u] = row.iter().enumerate().map(|(x, &f)| f * self.c(u, x)).sum();
            }
        }
        // Columns: out[u][v] = Σy C[v][y] · scratch[y][u]
        for u in 0..s {
            for v in 0..s {
                out[u * s + v] = (0..s).map(|y| self.c(v, y) * scratch[y * s + u]).sum();
            }
        }
    }

    /// Inverse transform of `coeffs` into `out`. `scratch` must hold `S * S` values.
    pub fn inverse(&self, coeffs: &[f64], out: &mut [f64], scratch: &mut [f64]) {
        let s = self.size;
        debug_assert_eq!(coeffs.len(), s * s);
        debug_assert_eq!(out.len(), s * s);

        // Rows: scratch[v][x] = Σu F[u][v] · C[u][x]
        for v in 0..s {
            for x in 0..s {
                scratch[v * s + x] = (0..s).map(|u| coeffs[u * s + v] * self.c(u, x)).sum();
            }
        }
        // Columns: out[y][x] = Σv C[v][y] · scratch[v][x]
        for y in 0..s {
            for x in 0..s {
                out[y * s + x] = (0..s).map(|v| self.c(v, y) * scratch[v * s + x]).sum();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Direct four-nested-sum forward transform, used as the reference.
    fn forward_direct(block: &[f64], s: usize) -> Vec<f64> {
        let two_s = 2.0 * s as f64;
        let mut out = vec![0.0; s * s];
        for v in 0..s {
            for u in 0..s {
                let mut sum = 0.0;
                for y in 0..s {
                    for x in 0..s {
                        sum += block[y * s + x]
                            * (((2 * x + 1) * u) as f64 * PI / two_s).cos()
                            * (((2 * y + 1) * v) as f64 * PI / two_s).cos();
                    }
                }
                out[u * s + v] = alpha(u, s) * alpha(v, s) * sum;
            }
        }
        out
    }

    fn lcg_block(s: usize, seed: u64) -> Vec<f64> {
        let mut rng = seed;
        (0..s * s)
            .map(|_| {
                rng = rng
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                (rng >> 56) as f64
            })
            .collect()
    }

    #[test]
    fn separable_matches_direct_sum() {
        for s in [1, 3, 8, 16] {
            let block = lcg_block(s, 7 + s as u64);
            let basis = DctBasis::new(s);
            let mut out = vec![0.0; s * s];
            let mut scratch = vec![0.0; s * s];
            basis.forward(&block, &mut out, &mut scratch);
            let reference = forward_direct(&block, s);
            for (a, b) in out.iter().zip(&reference) {
                assert!((a - b).abs() < 1e-9, "size {s}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn forward_then_inverse_round_trips() {
        for s in [2, 5, 8, 16, 32] {
            let block = lcg_block(s, 0xDEAD_BEEF ^ s as u64);
            let basis = DctBasis::new(s);
            let mut coeffs = vec![0.0; s * s];
            let mut back = vec![0.0; s * s];
            let mut scratch = vec![0.0; s * s];
            basis.forward(&block, &mut coeffs, &mut scratch);
            basis.inverse(&coeffs, &mut back, &mut scratch);
            for (a, b) in block.iter().zip(&back) {
                assert!((a - b).abs() < 1e-9, "size {s}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn flat_block_has_only_dc() {
        let s = 8;
        let basis = DctBasis::new(s);
        let block = vec![128.0; s * s];
        let mut coeffs = vec![0.0; s * s];
        let mut scratch = vec![0.0; s * s];
        basis.forward(&block, &mut coeffs, &mut scratch);
        // DC = α(0)² · Σ f = 128 · S
        assert!((coeffs[0] - 128.0 * s as f64).abs() < 1e-9);
        for &ac in &coeffs[1..] {
            assert!(ac.abs() < 1e-9, "AC = {ac}");
        }
    }

    #[test]
    fn horizontal_ramp_energy_is_in_first_column() {
        let s = 4;
        let basis = DctBasis::new(s);
        let block: Vec<f64> = (0..s * s).map(|i| (i % s) as f64 * 10.0).collect();
        let mut coeffs = vec![0.0; s * s];
        let mut scratch = vec![0.0; s * s];
        basis.forward(&block, &mut coeffs, &mut scratch);
        assert!(coeffs[s].abs() > 1.0, "F(1, 0) should carry the ramp");
        for (i, &c) in coeffs.iter().enumerate() {
            if i % s != 0 {
                assert!(c.abs() < 1e-9, "F({}, {}) = {c}", i / s, i % s);
            }
        }
    }

    #[test]
    fn vertical_ramp_energy_is_in_first_row() {
        let s = 4;
        let basis = DctBasis::new(s);
        let block: Vec<f64> = (0..s * s).map(|i| (i / s) as f64 * 10.0).collect();
        let mut coeffs = vec![0.0; s * s];
        let mut scratch = vec![0.0; s * s];
        basis.forward(&block, &mut coeffs, &mut scratch);
        assert!(coeffs[1].abs() > 1.0, "F(0, 1) should carry the ramp");
        for &c in &coeffs[s..] {
            assert!(c.abs() < 1e-9);
        }
    }
}
