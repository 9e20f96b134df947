use log::warn;

use crate::checksum::{adler32, Crc32};
use crate::codec::Compressor;
use crate::error::{Error, Result};
use crate::format::{
    ChunkTag, ImageHeader, PhysicalPixels, BIT_DEPTH_8, CHUNK_FIELD_SIZE, COLOR_TYPE_RGB,
    FILTER_TYPE_NONE, SIGNATURE, ZLIB_TRAILER_SIZE,
};
use crate::frame::Frame;

/// One chunk as it sits in the byte stream.
#[derive(Debug, Clone, Copy)]
pub struct RawChunk<'b> {
    pub tag: ChunkTag,
    pub data: &'b [u8],
    pub declared_crc: u32,
    /// Byte offset of the chunk's length field from the start of the file.
    pub offset: usize,
}

impl RawChunk<'_> {
    pub fn computed_crc(&self) -> u32 {
        let mut crc = Crc32::new();
        crc.update(self.tag.as_bytes());
        crc.update(self.data);
        crc.finalize()
    }

    pub fn verify(&self) -> Result<()> {
        let actual = self.computed_crc();
        if actual != self.declared_crc {
            return Err(Error::ChecksumMismatch {
                tag: self.tag.to_string(),
                expected: self.declared_crc,
                actual,
            });
        }
        Ok(())
    }
}

/// Walks the chunks that follow the signature.
///
/// Yields an error and stops if a chunk runs past the end of the buffer.
pub struct ChunkIter<'b> {
    bytes: &'b [u8],
    pos: usize,
    failed: bool,
}

impl<'b> ChunkIter<'b> {
    /// `bytes` is the full file, signature included.
    pub fn new(bytes: &'b [u8]) -> Self {
        Self {
            bytes,
            pos: SIGNATURE.len().min(bytes.len()),
            failed: false,
        }
    }

    fn take(&mut self, n: usize) -> Option<&'b [u8]> {
        let end = self.pos.checked_add(n)?;
        let slice = self.bytes.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }
}

impl<'b> Iterator for ChunkIter<'b> {
    type Item = Result<RawChunk<'b>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.bytes.len() {
            return None;
        }
        let offset = self.pos;
        let chunk = (|| {
            let len = u32::from_be_bytes(self.take(CHUNK_FIELD_SIZE)?.try_into().ok()?) as usize;
            let tag = ChunkTag(self.take(CHUNK_FIELD_SIZE)?.try_into().ok()?);
            let data = self.take(len)?;
            let declared_crc = u32::from_be_bytes(self.take(CHUNK_FIELD_SIZE)?.try_into().ok()?);
            Some(RawChunk {
                tag,
                data,
                declared_crc,
                offset,
            })
        })();
        match chunk {
            Some(c) => Some(Ok(c)),
            None => {
                self.failed = true;
                Some(Err(Error::Format(format!("truncated chunk at byte offset {offset}"))))
            }
        }
    }
}

/// State of the 4-byte trailer at the end of the zlib stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailerStatus {
    Valid,
    /// All four bytes are zero, as older encoders wrote them.
    ZeroFilled,
    Mismatch { stored: u32, computed: u32 },
}

/// A parsed, checksum-verified container.
///
/// # Open sequence
/// 1. Check the 8-byte signature.
/// 2. Walk every chunk and verify its CRC over `tag || payload`.
/// 3. Decode the header and the optional physical-pixel chunk, concatenate
///    all image-data payloads, and require the end marker to come last.
///
/// Inflating the pixel data is a separate step ([`Container::decode_scanlines`])
/// because it needs a [`Compressor`].
#[derive(Debug, Clone)]
pub struct Container<'b> {
    pub header: ImageHeader,
    pub physical: Option<PhysicalPixels>,
    chunks: Vec<RawChunk<'b>>,
    image_data: Vec<u8>,
}

impl<'b> Container<'b> {
    pub fn parse(bytes: &'b [u8]) -> Result<Self> {
        if bytes.len() < SIGNATURE.len() || &bytes[..SIGNATURE.len()] != SIGNATURE {
            return Err(Error::Format("missing signature".into()));
        }

        let chunks = ChunkIter::new(bytes).collect::<Result<Vec<_>>>()?;
        for chunk in &chunks {
            chunk.verify()?;
        }

        let first = chunks
            .first()
            .ok_or_else(|| Error::Format("no chunks after signature".into()))?;
        if first.tag != ChunkTag::HEADER {
            return Err(Error::Format(format!("first chunk is {}, expected IHDR", first.tag)));
        }
        let header = ImageHeader::from_bytes(first.data)?;

        match chunks.last() {
            Some(last) if last.tag == ChunkTag::END => {}
            _ => return Err(Error::Format("missing IEND chunk".into())),
        }

        let mut physical = None;
        let mut image_data = Vec::new();
        for chunk in &chunks {
            if chunk.tag == ChunkTag::PHYSICAL {
                physical = Some(PhysicalPixels::from_bytes(chunk.data)?);
            } else if chunk.tag == ChunkTag::IMAGE_DATA {
                image_data.extend_from_slice(chunk.data);
            }
        }

        Ok(Self {
            header,
            physical,
            chunks,
            image_data,
        })
    }

    pub fn chunks(&self) -> &[RawChunk<'b>] {
        &self.chunks
    }

    /// The concatenated image-data payloads: the full zlib stream.
    pub fn image_data(&self) -> &[u8] {
        &self.image_data
    }

    fn split_stream(&self) -> Result<(&[u8], u32)> {
        let stream = &self.image_data;
        if stream.len() < 2 + ZLIB_TRAILER_SIZE {
            return Err(Error::Format(format!("zlib stream too short ({} bytes)", stream.len())));
        }
        let (cmf, flg) = (stream[0], stream[1]);
        if cmf & 0x0F != 8 || ((cmf as u16) << 8 | flg as u16) % 31 != 0 {
            return Err(Error::Format(format!("bad zlib header {cmf:02x} {flg:02x}")));
        }
        let body_end = stream.len() - ZLIB_TRAILER_SIZE;
        let trailer = u32::from_be_bytes([
            stream[body_end],
            stream[body_end + 1],
            stream[body_end + 2],
            stream[body_end + 3],
        ]);
        Ok((&stream[2..body_end], trailer))
    }

    /// Inflate the filtered scanlines and check the trailer against them.
    pub fn decode_scanlines(&self, compressor: &dyn Compressor) -> Result<(Vec<u8>, TrailerStatus)> {
        let (body, stored) = self.split_stream()?;
        let raw = compressor
            .decompress(body)
            .map_err(|e| Error::Compress(format!("{e:#}")))?;

        let expected = self.header.height as usize * self.header.scanline_len();
        if raw.len() != expected {
            return Err(Error::Format(format!(
                "scanlines inflate to {} bytes, header implies {expected}",
                raw.len()
            )));
        }

        let computed = adler32(&raw);
        let status = if stored == computed {
            TrailerStatus::Valid
        } else if stored == 0 {
            warn!("zlib trailer is zero-filled; strict decoders will reject this file");
            TrailerStatus::ZeroFilled
        } else {
            TrailerStatus::Mismatch { stored, computed }
        };
        Ok((raw, status))
    }

    /// Rebuild a [`Frame`] from the pixel data. Only 8-bit RGB with filter
    /// type 0 on every row is accepted.
    pub fn to_frame(&self, compressor: &dyn Compressor) -> Result<Frame> {
        if self.header.bit_depth != BIT_DEPTH_8 || self.header.color_type != COLOR_TYPE_RGB {
            return Err(Error::InvalidHeader(format!(
                "bit depth {} / color type {} (only 8-bit RGB is supported)",
                self.header.bit_depth, self.header.color_type
            )));
        }
        let (raw, _) = self.decode_scanlines(compressor)?;
        let (w, h) = (self.header.width as usize, self.header.height as usize);
        let mut rgb = Vec::with_capacity(w * h * 3);
        for (y, line) in raw.chunks_exact(self.header.scanline_len()).enumerate() {
            if line[0] != FILTER_TYPE_NONE {
                return Err(Error::Format(format!("row {y} uses filter type {}", line[0])));
            }
            rgb.extend_from_slice(&line[1..]);
        }
        Frame::from_rgb8(w, h, &rgb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::encode_chunk;

    fn minimal(chunks: &[(ChunkTag, &[u8])]) -> Vec<u8> {
        let mut out = SIGNATURE.to_vec();
        for (tag, payload) in chunks {
            out.extend(encode_chunk(*tag, payload).unwrap());
        }
        out
    }

    #[test]
    fn rejects_missing_signature() {
        assert!(matches!(Container::parse(b"nope"), Err(Error::Format(_))));
    }

    #[test]
    fn walks_chunks_in_order() {
        let header = ImageHeader::rgb8(4, 4).to_bytes().unwrap();
        let bytes = minimal(&[(ChunkTag::HEADER, &header), (ChunkTag::END, &[])]);
        let tags: Vec<_> = ChunkIter::new(&bytes).map(|c| c.unwrap().tag).collect();
        assert_eq!(tags, [ChunkTag::HEADER, ChunkTag::END]);
        let c = Container::parse(&bytes).unwrap();
        assert_eq!(c.header.width, 4);
        assert!(c.physical.is_none());
        assert_eq!(c.chunks()[1].offset, 8 + 13 + 12);
    }

    #[test]
    fn detects_corrupted_payload() {
        let header = ImageHeader::rgb8(4, 4).to_bytes().unwrap();
        let mut bytes = minimal(&[(ChunkTag::HEADER, &header), (ChunkTag::END, &[])]);
        bytes[8 + 8 + 3] ^= 0x01; // width byte
        match Container::parse(&bytes) {
            Err(Error::ChecksumMismatch { tag, .. }) => assert_eq!(tag, "IHDR"),
            other => panic!("expected checksum mismatch, got {other:?}"),
        }
    }

    #[test]
    fn detects_truncation() {
        let header = ImageHeader::rgb8(4, 4).to_bytes().unwrap();
        let bytes = minimal(&[(ChunkTag::HEADER, &header), (ChunkTag::END, &[])]);
        let cut = &bytes[..bytes.len() - 2];
        let results: Vec<_> = ChunkIter::new(cut).collect();
        assert_eq!(results.len(), 2);
        assert!(results[1].is_err());
        assert!(matches!(Container::parse(cut), Err(Error::Format(_))));
    }

    #[test]
    fn requires_end_marker_last() {
        let header = ImageHeader::rgb8(1, 1).to_bytes().unwrap();
        let bytes = minimal(&[(ChunkTag::HEADER, &header)]);
        assert!(matches!(Container::parse(&bytes), Err(Error::Format(m)) if m.contains("IEND")));
    }
}
