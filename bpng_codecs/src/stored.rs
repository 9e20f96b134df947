use std::io::Read;

use bpng_core::Compressor;
use flate2::read::DeflateDecoder;

/// Largest payload a single stored block can carry.
const MAX_STORED_BLOCK: usize = 65_535;

/// DEFLATE made only of stored (uncompressed) blocks.
///
/// Output is valid DEFLATE that any decoder accepts, byte-predictable, and
/// costs 5 bytes per 64 KiB of input. Useful when inspecting payloads by
/// eye or when encode speed matters more than size.
pub struct StoredCompressor;

impl Compressor for StoredCompressor {
    fn name(&self) -> &'static str {
        "stored"
    }

    fn compress(&self, raw: &[u8]) -> anyhow::Result<Vec<u8>> {
        let blocks = raw.len().div_ceil(MAX_STORED_BLOCK).max(1);
        let mut out = Vec::with_capacity(raw.len() + 5 * blocks);
        let mut chunks = raw.chunks(MAX_STORED_BLOCK).peekable();
        if chunks.peek().is_none() {
            // A single empty final block.
            out.extend_from_slice(&[0x01, 0x00, 0x00, 0xFF, 0xFF]);
            return Ok(out);
        }
        while let Some(chunk) = chunks.next() {
            let bfinal = u8::from(chunks.peek().is_none());
            let len = chunk.len() as u16;
            out.push(bfinal); // BTYPE = 00
            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(&(!len).to_le_bytes());
            out.extend_from_slice(chunk);
        }
        Ok(out)
    }

    fn decompress(&self, compressed: &[u8]) -> anyhow::Result<Vec<u8>> {
        let mut raw = Vec::new();
        DeflateDecoder::new(compressed).read_to_end(&mut raw)?;
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_block_layout() {
        let packed = StoredCompressor.compress(b"hi").unwrap();
        assert_eq!(packed, [0x01, 0x02, 0x00, 0xFD, 0xFF, b'h', b'i']);
    }

    #[test]
    fn multi_block_round_trip() {
        let data: Vec<u8> = (0..150_000u32).map(|i| (i * 31 % 251) as u8).collect();
        let packed = StoredCompressor.compress(&data).unwrap();
        assert_eq!(packed.len(), data.len() + 3 * 5);
        assert_eq!(packed[0], 0x00);
        assert_eq!(StoredCompressor.decompress(&packed).unwrap(), data);
    }

    #[test]
    fn empty_input_round_trips() {
        let packed = StoredCompressor.compress(&[]).unwrap();
        assert!(StoredCompressor.decompress(&packed).unwrap().is_empty());
    }
}
