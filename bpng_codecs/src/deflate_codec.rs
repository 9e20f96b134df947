use std::io::{Read, Write};

use bpng_core::Compressor;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

/// Raw DEFLATE via flate2.
///
/// Defaults to level 9, the highest compression level, which is what the
/// image-data chunk is written with unless the caller asks otherwise.
pub struct DeflateCompressor {
    /// Compression level (0 = store only, 9 = slowest / smallest).
    pub level: u32,
}

impl Default for DeflateCompressor {
    fn default() -> Self {
        Self { level: 9 }
    }
}

impl DeflateCompressor {
    pub fn new(level: u32) -> Self {
        Self { level: level.min(9) }
    }
}

impl Compressor for DeflateCompressor {
    fn name(&self) -> &'static str {
        "deflate"
    }

    fn compress(&self, raw: &[u8]) -> anyhow::Result<Vec<u8>> {
        let mut enc = DeflateEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::new(self.level));
        enc.write_all(raw)?;
        Ok(enc.finish()?)
    }

    fn decompress(&self, compressed: &[u8]) -> anyhow::Result<Vec<u8>> {
        let mut raw = Vec::new();
        DeflateDecoder::new(compressed).read_to_end(&mut raw)?;
        Ok(raw)
    }
}
