use std::fmt;

use crate::error::{Error, Result};

/// Fixed 8-byte signature that opens every file.
pub const SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";

/// Size of the chunk length and checksum fields, in bytes.
pub const CHUNK_FIELD_SIZE: usize = 4;

/// Length prefix + type tag + checksum around a chunk payload.
pub const CHUNK_OVERHEAD: usize = 3 * CHUNK_FIELD_SIZE;

pub const HEADER_PAYLOAD_SIZE: usize = 13;
pub const PHYSICAL_PAYLOAD_SIZE: usize = 9;

/// Default block edge in pixels.
pub const DEFAULT_BLOCK_SIZE: usize = 16;

/// 2835 pixels per metre, i.e. 72 DPI.
pub const DEFAULT_PIXELS_PER_UNIT: u64 = 2835;

// ── zlib stream framing ────────────────────────────────────────────────────

/// CMF byte: deflate, 32 KiB window.
pub const ZLIB_CMF: u8 = 0x78;

/// FLG byte: maximum-compression level hint, no preset dictionary.
/// `(CMF << 8 | FLG)` is a multiple of 31 as zlib requires.
pub const ZLIB_FLG: u8 = 0xDA;

pub const ZLIB_TRAILER_SIZE: usize = 4;

// ── Header field values ────────────────────────────────────────────────────

pub const BIT_DEPTH_8: u8 = 8;
pub const BIT_DEPTH_16: u8 = 16;
pub const COLOR_TYPE_RGB: u8 = 2;
pub const FILTER_TYPE_NONE: u8 = 0;

// ── Chunk tags ─────────────────────────────────────────────────────────────

/// Four-byte chunk type tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkTag(pub [u8; 4]);

impl ChunkTag {
    pub const HEADER: ChunkTag = ChunkTag(*b"IHDR");
    pub const PHYSICAL: ChunkTag = ChunkTag(*b"pHYs");
    pub const IMAGE_DATA: ChunkTag = ChunkTag(*b"IDAT");
    pub const END: ChunkTag = ChunkTag(*b"IEND");

    #[inline]
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkTag({self})")
    }
}

// ── Fixed-width integers ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

/// Encode `value` into exactly `width` bytes.
///
/// Fails with [`Error::EncodeRange`] when `value` needs more than `width`
/// bytes. Widths above 8 are zero-padded.
pub fn encode_uint(value: u64, width: usize, endian: Endian) -> Result<Vec<u8>> {
    let fits = width >= 8 || value >> (8 * width) == 0;
    if !fits {
        return Err(Error::EncodeRange { value, width });
    }
    let mut out = vec![0u8; width];
    let be = value.to_be_bytes();
    let n = width.min(8);
    out[width - n..].copy_from_slice(&be[8 - n..]);
    if endian == Endian::Little {
        out.reverse();
    }
    Ok(out)
}

/// Shorthand for the 4-byte big-endian fields the container is built from.
#[inline]
pub fn encode_u32_be(value: u64) -> Result<[u8; 4]> {
    let bytes = encode_uint(value, 4, Endian::Big)?;
    Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn read_u32_be(buf: &[u8]) -> u32 {
    u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]])
}

// ── Header ─────────────────────────────────────────────────────────────────

/// Decoded form of the 13-byte header payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHeader {
    pub width: u64,
    pub height: u64,
    pub bit_depth: u8,
    pub color_type: u8,
    pub compression: u8,
    pub filter: u8,
    pub interlace: u8,
}

impl ImageHeader {
    /// 8-bit truecolor header with method fields all zero.
    pub fn rgb8(width: u64, height: u64) -> Self {
        Self {
            width,
            height,
            bit_depth: BIT_DEPTH_8,
            color_type: COLOR_TYPE_RGB,
            compression: 0,
            filter: 0,
            interlace: 0,
        }
    }

    pub fn to_bytes(&self) -> Result<[u8; HEADER_PAYLOAD_SIZE]> {
        if self.bit_depth != BIT_DEPTH_8 && self.bit_depth != BIT_DEPTH_16 {
            return Err(Error::InvalidHeader(format!(
                "bit depth {} (expected 8 or 16)",
                self.bit_depth
            )));
        }
        let mut buf = [0u8; HEADER_PAYLOAD_SIZE];
        buf[0..4].copy_from_slice(&encode_u32_be(self.width)?);
        buf[4..8].copy_from_slice(&encode_u32_be(self.height)?);
        buf[8] = self.bit_depth;
        buf[9] = self.color_type;
        buf[10] = self.compression;
        buf[11] = self.filter;
        buf[12] = self.interlace;
        Ok(buf)
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() != HEADER_PAYLOAD_SIZE {
            return Err(Error::InvalidHeader(format!(
                "header payload is {} bytes, expected {HEADER_PAYLOAD_SIZE}",
                buf.len()
            )));
        }
        Ok(Self {
            width: read_u32_be(&buf[0..4]) as u64,
            height: read_u32_be(&buf[4..8]) as u64,
            bit_depth: buf[8],
            color_type: buf[9],
            compression: buf[10],
            filter: buf[11],
            interlace: buf[12],
        })
    }

    /// Bytes in one filtered scanline: the filter byte plus 3 samples per pixel.
    pub fn scanline_len(&self) -> usize {
        1 + 3 * self.width as usize
    }
}

// ── Physical pixel dimensions ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PixelUnit {
    /// Only the aspect ratio is meaningful.
    #[default]
    Unknown,
    Metre,
}

impl PixelUnit {
    pub fn to_byte(self) -> u8 {
        match self {
            PixelUnit::Unknown => 0,
            PixelUnit::Metre => 1,
        }
    }

    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            0 => Ok(PixelUnit::Unknown),
            1 => Ok(PixelUnit::Metre),
            other => Err(Error::Format(format!("unknown pixel unit specifier {other}"))),
        }
    }
}

/// Decoded form of the 9-byte physical-pixel payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalPixels {
    pub ppu_x: u64,
    pub ppu_y: u64,
    pub unit: PixelUnit,
}

impl Default for PhysicalPixels {
    fn default() -> Self {
        Self {
            ppu_x: DEFAULT_PIXELS_PER_UNIT,
            ppu_y: DEFAULT_PIXELS_PER_UNIT,
            unit: PixelUnit::Unknown,
        }
    }
}

impl PhysicalPixels {
    pub fn to_bytes(&self) -> Result<[u8; PHYSICAL_PAYLOAD_SIZE]> {
        let mut buf = [0u8; PHYSICAL_PAYLOAD_SIZE];
        buf[0..4].copy_from_slice(&encode_u32_be(self.ppu_x)?);
        buf[4..8].copy_from_slice(&encode_u32_be(self.ppu_y)?);
        buf[8] = self.unit.to_byte();
        Ok(buf)
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() != PHYSICAL_PAYLOAD_SIZE {
            return Err(Error::Format(format!(
                "physical-pixel payload is {} bytes, expected {PHYSICAL_PAYLOAD_SIZE}",
                buf.len()
            )));
        }
        Ok(Self {
            ppu_x: read_u32_be(&buf[0..4]) as u64,
            ppu_y: read_u32_be(&buf[4..8]) as u64,
            unit: PixelUnit::from_byte(buf[8])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zlib_header_check_bits() {
        assert_eq!(((ZLIB_CMF as u16) << 8 | ZLIB_FLG as u16) % 31, 0);
        assert_eq!(ZLIB_CMF & 0x0F, 8);
    }

    #[test]
    fn encode_uint_big_and_little() {
        assert_eq!(encode_uint(0x0102_0304, 4, Endian::Big).unwrap(), [1, 2, 3, 4]);
        assert_eq!(encode_uint(0x0102_0304, 4, Endian::Little).unwrap(), [4, 3, 2, 1]);
        assert_eq!(encode_uint(255, 1, Endian::Big).unwrap(), [255]);
        assert_eq!(encode_uint(7, 10, Endian::Big).unwrap(), [0, 0, 0, 0, 0, 0, 0, 0, 0, 7]);
        assert_eq!(encode_uint(0, 0, Endian::Big).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn encode_uint_rejects_values_that_do_not_fit() {
        assert!(matches!(
            encode_uint(256, 1, Endian::Big),
            Err(Error::EncodeRange { value: 256, width: 1 })
        ));
        assert!(encode_uint(1 << 32, 4, Endian::Big).is_err());
        assert!(encode_uint(1, 0, Endian::Little).is_err());
        assert!(encode_uint(u32::MAX as u64, 4, Endian::Big).is_ok());
    }

    #[test]
    fn header_layout() {
        let bytes = ImageHeader::rgb8(16, 300).to_bytes().unwrap();
        assert_eq!(bytes, [0, 0, 0, 16, 0, 0, 1, 44, 8, 2, 0, 0, 0]);
        assert_eq!(ImageHeader::from_bytes(&bytes).unwrap(), ImageHeader::rgb8(16, 300));
    }

    #[test]
    fn header_rejects_bad_bit_depth_and_oversized_width() {
        let mut h = ImageHeader::rgb8(1, 1);
        h.bit_depth = 4;
        assert!(matches!(h.to_bytes(), Err(Error::InvalidHeader(_))));
        assert!(matches!(
            ImageHeader::rgb8(1 << 32, 1).to_bytes(),
            Err(Error::EncodeRange { width: 4, .. })
        ));
    }

    #[test]
    fn physical_layout() {
        let bytes = PhysicalPixels::default().to_bytes().unwrap();
        assert_eq!(bytes, [0, 0, 0x0B, 0x13, 0, 0, 0x0B, 0x13, 0]);
        assert_eq!(PhysicalPixels::from_bytes(&bytes).unwrap(), PhysicalPixels::default());
    }

    #[test]
    fn tag_display() {
        assert_eq!(ChunkTag::PHYSICAL.to_string(), "pHYs");
        assert_eq!(ChunkTag([b'A', 0, b'B', b'C']).to_string(), "A\\x00BC");
    }
}
