use std::io::Write;
use std::path::Path;

use log::debug;
use tempfile::NamedTempFile;

use crate::checksum::{adler32, Crc32};
use crate::codec::Compressor;
use crate::config::TrailerPolicy;
use crate::error::{Error, Result};
use crate::format::{
    encode_u32_be, ChunkTag, ImageHeader, PhysicalPixels, PixelUnit, CHUNK_OVERHEAD,
    FILTER_TYPE_NONE, SIGNATURE, ZLIB_CMF, ZLIB_FLG, ZLIB_TRAILER_SIZE,
};
use crate::frame::{sample_to_u8, Channel, Frame};

/// Frame a payload as one chunk:
/// `[len: u32 BE][tag: 4][payload][crc32(tag || payload): u32 BE]`.
pub fn encode_chunk(tag: ChunkTag, payload: &[u8]) -> Result<Vec<u8>> {
    let len = encode_u32_be(payload.len() as u64)?;
    let mut crc = Crc32::new();
    crc.update(tag.as_bytes());
    crc.update(payload);

    let mut out = Vec::with_capacity(payload.len() + CHUNK_OVERHEAD);
    out.extend_from_slice(&len);
    out.extend_from_slice(tag.as_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(&crc.finalize().to_be_bytes());
    Ok(out)
}

/// Lay the frame out as filtered scanlines: each row is a filter-type byte
/// (always 0) followed by interleaved R, G, B bytes.
pub fn serialize_scanlines(frame: &Frame) -> Vec<u8> {
    let (w, h) = (frame.width(), frame.height());
    let planes = Channel::ALL.map(|ch| frame.plane(ch));
    let mut raw = Vec::with_capacity(h * (1 + 3 * w));
    for y in 0..h {
        raw.push(FILTER_TYPE_NONE);
        for i in y * w..(y + 1) * w {
            raw.extend(planes.iter().map(|p| sample_to_u8(p[i])));
        }
    }
    raw
}

/// Single-pass serializer from a [`Frame`] to container bytes.
///
/// # Layout written
/// ```text
/// [signature: 8]
/// [header chunk]            13-byte payload
/// [physical-pixel chunk]    9-byte payload
/// [image-data chunk]        zlib header + DEFLATE(scanlines) + trailer
/// [end-marker chunk]        empty payload
/// ```
///
/// Nothing is written anywhere until the whole buffer has been built, so
/// a failure at any stage leaves no partial output behind.
pub struct ContainerWriter {
    compressor: Box<dyn Compressor>,
    trailer: TrailerPolicy,
    physical: PhysicalPixels,
}

impl ContainerWriter {
    pub fn new(compressor: Box<dyn Compressor>) -> Self {
        Self {
            compressor,
            trailer: TrailerPolicy::default(),
            physical: PhysicalPixels::default(),
        }
    }

    pub fn with_trailer(mut self, trailer: TrailerPolicy) -> Self {
        self.trailer = trailer;
        self
    }

    pub fn with_physical(mut self, physical: PhysicalPixels) -> Self {
        self.physical = physical;
        self
    }

    pub fn build_header_chunk(
        &self,
        width: u64,
        height: u64,
        bit_depth: u8,
        color_type: u8,
    ) -> Result<Vec<u8>> {
        let header = ImageHeader {
            bit_depth,
            color_type,
            ..ImageHeader::rgb8(width, height)
        };
        encode_chunk(ChunkTag::HEADER, &header.to_bytes()?)
    }

    pub fn build_physical_pixel_chunk(&self, ppu_x: u64, ppu_y: u64, unit: PixelUnit) -> Result<Vec<u8>> {
        let physical = PhysicalPixels { ppu_x, ppu_y, unit };
        encode_chunk(ChunkTag::PHYSICAL, &physical.to_bytes()?)
    }

    /// Compress `raw` and wrap it as a zlib stream:
    /// `[CMF][FLG][DEFLATE data][trailer: 4]`.
    pub fn zlib_stream(&self, raw: &[u8]) -> Result<Vec<u8>> {
        let deflated = self
            .compressor
            .compress(raw)
            .map_err(|e| Error::Compress(format!("{e:#}")))?;
        let trailer = match self.trailer {
            TrailerPolicy::Adler32 => adler32(raw).to_be_bytes(),
            TrailerPolicy::ZeroFilled => [0u8; ZLIB_TRAILER_SIZE],
        };

        let mut stream = Vec::with_capacity(2 + deflated.len() + ZLIB_TRAILER_SIZE);
        stream.push(ZLIB_CMF);
        stream.push(ZLIB_FLG);
        stream.extend_from_slice(&deflated);
        stream.extend_from_slice(&trailer);
        Ok(stream)
    }

    pub fn build_image_data_chunk(&self, frame: &Frame) -> Result<Vec<u8>> {
        let raw = serialize_scanlines(frame);
        let stream = self.zlib_stream(&raw)?;
        debug!(
            "image data: {} scanline bytes -> {} stream bytes ({}, trailer {})",
            raw.len(),
            stream.len(),
            self.compressor.name(),
            self.trailer.name()
        );
        encode_chunk(ChunkTag::IMAGE_DATA, &stream)
    }

    pub fn build_end_chunk(&self) -> Result<Vec<u8>> {
        encode_chunk(ChunkTag::END, &[])
    }

    /// Serialize `frame` into a complete container.
    pub fn encode_to_bytes(&self, frame: &Frame) -> Result<Vec<u8>> {
        let header = self.build_header_chunk(
            frame.width() as u64,
            frame.height() as u64,
            crate::format::BIT_DEPTH_8,
            crate::format::COLOR_TYPE_RGB,
        )?;
        let physical =
            self.build_physical_pixel_chunk(self.physical.ppu_x, self.physical.ppu_y, self.physical.unit)?;
        let data = self.build_image_data_chunk(frame)?;
        let end = self.build_end_chunk()?;

        let mut out =
            Vec::with_capacity(SIGNATURE.len() + header.len() + physical.len() + data.len() + end.len());
        out.extend_from_slice(SIGNATURE);
        out.extend_from_slice(&header);
        out.extend_from_slice(&physical);
        out.extend_from_slice(&data);
        out.extend_from_slice(&end);
        debug!("container: {} bytes for {}x{} frame", out.len(), frame.width(), frame.height());
        Ok(out)
    }

    /// Encode `frame` and store it at `path`.
    ///
    /// The bytes go to a temporary file next to `path` which is then renamed
    /// into place. With `overwrite == false` an existing file at `path` is an
    /// error and is left untouched. Returns the number of bytes written.
    pub fn write_to_path(&self, frame: &Frame, path: impl AsRef<Path>, overwrite: bool) -> Result<u64> {
        let path = path.as_ref();
        let bytes = self.encode_to_bytes(frame)?;

        let write_err = |source: std::io::Error| Error::Write {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(&bytes).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        if overwrite {
            tmp.persist(path).map_err(|e| write_err(e.error))?;
        } else {
            tmp.persist_noclobber(path).map_err(|e| write_err(e.error))?;
        }
        Ok(bytes.len() as u64)
    }
}
