//! Coefficient quantization and the post-inverse rounding strategies.

use crate::frame::{Channel, SAMPLE_MAX};

/// Discard setting that leaves every coefficient untouched.
pub const DISCARD_NONE: u8 = 10;

/// Scale applied to green coefficients inside the discard band. Green stands
/// in for luminance, so it is attenuated rather than removed.
pub const GREEN_ATTENUATION: f64 = 0.5;

/// Removes the high-frequency tail of a block's coefficients.
///
/// With discard parameter `P` (10 = keep everything, lower = more
/// aggressive) the band starts at raster index `floor(S·S·P / 10)` and runs to
/// the last coefficient. Raster index `idx` is horizontal frequency
/// `idx / S` and vertical frequency `idx % S` (see [`crate::dct`]). Inside
/// the band red and blue coefficients are zeroed and green is scaled by
/// [`GREEN_ATTENUATION`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantizer {
    discard: u8,
}

impl Default for Quantizer {
    fn default() -> Self {
        Self::new(DISCARD_NONE)
    }
}

impl Quantizer {
    /// Values above [`DISCARD_NONE`] behave like it.
    pub fn new(discard: u8) -> Self {
        Self {
            discard: discard.min(DISCARD_NONE),
        }
    }

    #[inline]
    pub fn discard(&self) -> u8 {
        self.discard
    }

    /// First raster index of the discard band for block size `size`.
    /// Equal to `size * size` when the band is empty.
    pub fn first_frequency(&self, size: usize) -> usize {
        self.band_start(size * size)
    }

    /// Apply the band to one channel's coefficients in place.
    pub fn apply(&self, channel: Channel, coeffs: &mut [f64]) {
        let first = self.band_start(coeffs.len());
        let band = &mut coeffs[first..];
        match channel {
            Channel::Red | Channel::Blue => band.iter_mut().for_each(|c| *c = 0.0),
            Channel::Green => band.iter_mut().for_each(|c| *c *= GREEN_ATTENUATION),
        }
    }

    fn band_start(&self, len: usize) -> usize {
        len * self.discard as usize / DISCARD_NONE as usize
    }
}

/// How a reconstructed sample is rounded before it is written back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoundingPolicy {
    /// Round `|v|` half-to-even, then snap by the mod-7 rule: residues of
    /// 2..=6 go up to the next multiple of 7 (capped at 255); residues of
    /// 0 or 1 go down by `7 - residue` when the value is 0 or 1 mod 4
    /// (floored at 0), and are otherwise kept.
    #[default]
    SnapToSeven,
    /// Round half-to-even only.
    Nearest,
    /// Leave the value as reconstructed; only the write clamp applies.
    None,
}

impl RoundingPolicy {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            RoundingPolicy::SnapToSeven => snap_to_seven(value),
            RoundingPolicy::Nearest => value.round_ties_even(),
            RoundingPolicy::None => value,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RoundingPolicy::SnapToSeven => "snap7",
            RoundingPolicy::Nearest => "nearest",
            RoundingPolicy::None => "none",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "snap7" | "snap-to-seven" => Some(RoundingPolicy::SnapToSeven),
            "nearest" | "round" => Some(RoundingPolicy::Nearest),
            "none" | "off" => Some(RoundingPolicy::None),
            _ => None,
        }
    }
}

const SNAP_STEP: f64 = 7.0;

fn snap_to_seven(value: f64) -> f64 {
    let mut v = value.abs().round_ties_even();
    let residue = v % SNAP_STEP;
    if residue >= 2.0 {
        v += SNAP_STEP - residue;
        if v > SAMPLE_MAX {
            v = SAMPLE_MAX;
        }
    } else if v % 4.0 < 2.0 {
        v -= SNAP_STEP - residue;
        if v < 0.0 {
            v = 0.0;
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_nonzero(coeffs: &[f64]) -> usize {
        coeffs.iter().filter(|c| **c != 0.0).count()
    }

    #[test]
    fn band_start() {
        assert_eq!(Quantizer::new(10).first_frequency(16), 256);
        assert_eq!(Quantizer::new(9).first_frequency(16), 230);
        assert_eq!(Quantizer::new(5).first_frequency(8), 32);
        assert_eq!(Quantizer::new(0).first_frequency(8), 0);
        assert_eq!(Quantizer::new(200).discard(), 10);
    }

    #[test]
    fn no_discard_leaves_coefficients_alone() {
        let original: Vec<f64> = (1..=64).map(|i| i as f64).collect();
        for ch in Channel::ALL {
            let mut c = original.clone();
            Quantizer::new(DISCARD_NONE).apply(ch, &mut c);
            assert_eq!(c, original);
        }
    }

    #[test]
    fn band_zeroes_chroma_and_halves_green() {
        let q = Quantizer::new(5);
        let original: Vec<f64> = (1..=16).map(|i| i as f64).collect();

        let mut red = original.clone();
        q.apply(Channel::Red, &mut red);
        assert_eq!(&red[..8], &original[..8]);
        assert!(red[8..].iter().all(|c| *c == 0.0));

        let mut blue = original.clone();
        q.apply(Channel::Blue, &mut blue);
        assert_eq!(blue, red);

        let mut green = original.clone();
        q.apply(Channel::Green, &mut green);
        assert_eq!(&green[..8], &original[..8]);
        for (g, o) in green[8..].iter().zip(&original[8..]) {
            assert_eq!(*g, o * 0.5);
        }
    }

    #[test]
    fn more_aggressive_discard_never_keeps_more() {
        let original: Vec<f64> = (0..256).map(|i| ((i * 37) % 11) as f64 - 5.0).collect();
        let mut previous = usize::MAX;
        for p in (0..=10u8).rev() {
            let q = Quantizer::new(p);
            let kept: usize = Channel::ALL
                .iter()
                .map(|&ch| {
                    let mut c = original.clone();
                    q.apply(ch, &mut c);
                    count_nonzero(&c)
                })
                .sum();
            assert!(kept <= previous, "P={p} kept {kept} > {previous}");
            previous = kept;
        }
    }

    #[test]
    fn snap_rounds_up_from_residue_two() {
        // 128 = 18·7 + 2
        assert_eq!(snap_to_seven(128.0), 133.0);
        assert_eq!(snap_to_seven(13.0), 14.0);
        assert_eq!(snap_to_seven(254.0), 255.0);
    }

    #[test]
    fn snap_down_depends_on_mod_four() {
        // 21: residue 0, 21 % 4 = 1 -> 14
        assert_eq!(snap_to_seven(21.0), 14.0);
        // 14: residue 0, 14 % 4 = 2 -> kept
        assert_eq!(snap_to_seven(14.0), 14.0);
        // 8: residue 1, 8 % 4 = 0 -> 2
        assert_eq!(snap_to_seven(8.0), 2.0);
        // 1: residue 1, 1 % 4 = 1 -> floored at 0
        assert_eq!(snap_to_seven(1.0), 0.0);
        assert_eq!(snap_to_seven(0.0), 0.0);
    }

    #[test]
    fn snap_takes_magnitude_and_rounds_half_to_even() {
        assert_eq!(snap_to_seven(-128.0), 133.0);
        // 20.5 rounds to 20 (residue 6) -> 21
        assert_eq!(snap_to_seven(20.5), 21.0);
    }

    #[test]
    fn policy_names_round_trip() {
        for p in [RoundingPolicy::SnapToSeven, RoundingPolicy::Nearest, RoundingPolicy::None] {
            assert_eq!(RoundingPolicy::from_name(p.name()), Some(p));
        }
        assert_eq!(RoundingPolicy::from_name("bogus"), None);
        assert_eq!(RoundingPolicy::Nearest.apply(127.5), 128.0);
        assert_eq!(RoundingPolicy::None.apply(-3.25), -3.25);
    }
}
