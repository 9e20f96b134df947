use crate::error::Result;
use crate::format::{PhysicalPixels, DEFAULT_BLOCK_SIZE};
use crate::quant::{Quantizer, RoundingPolicy, DISCARD_NONE};
use crate::transformer::BlockTransformer;

/// What goes into the 4-byte trailer after the compressed scanlines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrailerPolicy {
    /// Adler-32 of the uncompressed scanlines, as zlib specifies.
    #[default]
    Adler32,
    /// Four zero bytes. Matches files written by earlier encoders; strict
    /// decoders may reject them.
    ZeroFilled,
}

impl TrailerPolicy {
    pub fn name(self) -> &'static str {
        match self {
            TrailerPolicy::Adler32 => "adler32",
            TrailerPolicy::ZeroFilled => "zero",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "adler32" | "adler" => Some(TrailerPolicy::Adler32),
            "zero" | "zeros" | "legacy" => Some(TrailerPolicy::ZeroFilled),
            _ => None,
        }
    }
}

/// Settings for one encode: transform, quantization and container options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Edge length of the square transform blocks, in pixels.
    pub block_size: usize,
    /// Discard parameter, 10 = keep every coefficient, 0 = drop the most.
    pub discard: u8,
    pub rounding: RoundingPolicy,
    pub trailer: TrailerPolicy,
    pub physical: PhysicalPixels,
    /// Process block rows on the rayon pool.
    pub parallel: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            discard: DISCARD_NONE,
            rounding: RoundingPolicy::default(),
            trailer: TrailerPolicy::default(),
            physical: PhysicalPixels::default(),
            parallel: false,
        }
    }
}

impl EncoderConfig {
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_discard(mut self, discard: u8) -> Self {
        self.discard = discard;
        self
    }

    pub fn with_rounding(mut self, rounding: RoundingPolicy) -> Self {
        self.rounding = rounding;
        self
    }

    pub fn with_trailer(mut self, trailer: TrailerPolicy) -> Self {
        self.trailer = trailer;
        self
    }

    pub fn with_physical(mut self, physical: PhysicalPixels) -> Self {
        self.physical = physical;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn transformer(&self) -> Result<BlockTransformer> {
        Ok(
            BlockTransformer::new(self.block_size, Quantizer::new(self.discard), self.rounding)?
                .with_parallel(self.parallel),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = EncoderConfig::default();
        assert_eq!(c.block_size, 16);
        assert_eq!(c.discard, 10);
        assert_eq!(c.rounding, RoundingPolicy::SnapToSeven);
        assert_eq!(c.trailer, TrailerPolicy::Adler32);
        assert_eq!(c.physical.ppu_x, 2835);
        assert!(!c.parallel);
    }

    #[test]
    fn transformer_validates_block_size() {
        assert!(EncoderConfig::default().with_block_size(0).transformer().is_err());
        let t = EncoderConfig::default().with_block_size(8).transformer().unwrap();
        assert_eq!(t.block_size(), 8);
    }

    #[test]
    fn trailer_names() {
        assert_eq!(TrailerPolicy::from_name("zero"), Some(TrailerPolicy::ZeroFilled));
        assert_eq!(TrailerPolicy::from_name(TrailerPolicy::Adler32.name()), Some(TrailerPolicy::Adler32));
        assert_eq!(TrailerPolicy::from_name("crc"), None);
    }
}
