pub mod block;
pub mod checksum;
pub mod codec;
pub mod config;
pub mod dct;
pub mod error;
pub mod format;
pub mod frame;
pub mod quant;
pub mod reader;
pub mod transformer;
pub mod writer;

pub use codec::Compressor;
pub use config::{EncoderConfig, TrailerPolicy};
pub use error::{Error, Result};
pub use format::{ImageHeader, PhysicalPixels, PixelUnit, SIGNATURE};
pub use frame::{Channel, Frame};
pub use quant::{Quantizer, RoundingPolicy};
pub use reader::{Container, TrailerStatus};
pub use transformer::{BlockTransformer, TransformStats};
pub use writer::ContainerWriter;

/// Run the whole pipeline on `frame`: block transform in place, then
/// serialize to container bytes.
///
/// The frame is left holding the lossy reconstruction.
pub fn encode_frame(
    frame: &mut Frame,
    config: &EncoderConfig,
    compressor: Box<dyn Compressor>,
) -> Result<(Vec<u8>, TransformStats)> {
    let stats = config.transformer()?.run(frame);
    let bytes = ContainerWriter::new(compressor)
        .with_trailer(config.trailer)
        .with_physical(config.physical)
        .encode_to_bytes(frame)?;
    Ok((bytes, stats))
}
