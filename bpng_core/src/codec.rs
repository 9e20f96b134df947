/// The compression collaborator behind the image-data chunk.
///
/// Implementations produce a raw DEFLATE stream (no zlib header or
/// trailer; the writer frames it). Any conforming DEFLATE decoder must be
/// able to read the output. Calls are blocking and stateless, so one
/// compressor can serve any number of encodes.
pub trait Compressor: Send + Sync {
    /// Human-readable name for CLI display.
    fn name(&self) -> &'static str;

    /// Compress `raw` into a DEFLATE stream.
    fn compress(&self, raw: &[u8]) -> anyhow::Result<Vec<u8>>;

    /// Inflate a DEFLATE stream produced by any conforming encoder.
    fn decompress(&self, compressed: &[u8]) -> anyhow::Result<Vec<u8>>;
}
